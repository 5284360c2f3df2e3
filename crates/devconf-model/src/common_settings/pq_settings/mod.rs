//! `common_settings.pq_settings` – picture-quality knobs backed by the sensor.
//!
//! Scalars and structured objects are pushed to the [`SensorStream`] during
//! Apply and stored only when the sensor accepts them.  A rejected property
//! does not stop the remaining ones; the last rejection is the section's
//! outcome.  Apply order is scalars, then `register_access`, then the
//! structured objects.

mod exposure;
mod image;
mod object;
mod register_access;
mod white_balance;

use std::collections::BTreeMap;

use devconf_sensor::{
    AutoExposure, AutoExposureMetering, AutoWhiteBalance, FrameRate, ImageCrop, ImageFlip,
    ImageSize, ManualExposure, ManualWhiteBalancePreset, PropertyKey, RegisterAccess,
    SensorProperty, SensorStream,
};
use devconf_types::{ConfigError, JsonKind};
use serde_json::{json, Map, Value};
use tracing::debug;

pub use object::{PqObject, PqValue};
pub use register_access::{RegisterAccessList, MAX_ENTRIES as MAX_REGISTER_ACCESS};

use crate::node::{
    apply_children, compose, field_f64, float_value, verify_object, ApplyContext, Child,
    ChildMut, DocumentNode,
};
use crate::validation::{Constraint, Validation};

/// Scalar properties: `(document name, sensor slot, failure message)`.
const SCALARS: [(&str, PropertyKey, &str); 6] = [
    (
        "digital_zoom",
        PropertyKey::DigitalZoom,
        "Digital zoom property failed to be set.",
    ),
    (
        "exposure_mode",
        PropertyKey::ExposureMode,
        "Exposure mode property failed to be set.",
    ),
    (
        "ev_compensation",
        PropertyKey::EvCompensation,
        "Ev compensation property failed to be set.",
    ),
    (
        "ae_anti_flicker_mode",
        PropertyKey::AntiFlickerMode,
        "Anti flicker mode property failed to be set.",
    ),
    (
        "white_balance_mode",
        PropertyKey::WhiteBalanceMode,
        "White balance mode property failed to be set.",
    ),
    (
        "image_rotation",
        PropertyKey::ImageRotation,
        "Image rotation property failed to be set.",
    ),
];

fn scalar_property(key: PropertyKey, value: f64) -> Option<SensorProperty> {
    let property = match key {
        PropertyKey::DigitalZoom => SensorProperty::DigitalZoom(value as f32),
        PropertyKey::ExposureMode => SensorProperty::ExposureMode(value as u32),
        PropertyKey::EvCompensation => SensorProperty::EvCompensation(value as f32),
        PropertyKey::AntiFlickerMode => SensorProperty::AntiFlickerMode(value as u32),
        PropertyKey::WhiteBalanceMode => SensorProperty::WhiteBalanceMode(value as u32),
        PropertyKey::ImageRotation => SensorProperty::ImageRotation(value as u32),
        _ => return None,
    };
    Some(property)
}

fn scalar_json(property: &SensorProperty) -> Value {
    match *property {
        SensorProperty::DigitalZoom(v) | SensorProperty::EvCompensation(v) => float_value(v),
        SensorProperty::ExposureMode(v)
        | SensorProperty::AntiFlickerMode(v)
        | SensorProperty::WhiteBalanceMode(v)
        | SensorProperty::ImageRotation(v) => json!(v),
        _ => Value::Null,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PqSettings {
    scalars: BTreeMap<&'static str, SensorProperty>,
    camera_image_size: PqObject<ImageSize>,
    camera_image_flip: PqObject<ImageFlip>,
    auto_exposure: PqObject<AutoExposure>,
    manual_exposure: PqObject<ManualExposure>,
    frame_rate: PqObject<FrameRate>,
    image_cropping: PqObject<ImageCrop>,
    auto_exposure_metering: PqObject<AutoExposureMetering>,
    auto_white_balance: PqObject<AutoWhiteBalance>,
    manual_white_balance_preset: PqObject<ManualWhiteBalancePreset>,
    register_access: RegisterAccessList,
}

impl PqSettings {
    /// Last accepted value of the scalar `name`.
    pub fn scalar(&self, name: &str) -> Option<SensorProperty> {
        self.scalars.get(name).copied()
    }

    pub fn camera_image_size(&self) -> Option<ImageSize> {
        self.camera_image_size.current()
    }

    pub fn auto_exposure(&self) -> Option<AutoExposure> {
        self.auto_exposure.current()
    }

    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.frame_rate.current()
    }

    pub fn image_cropping(&self) -> Option<ImageCrop> {
        self.image_cropping.current()
    }

    pub fn auto_exposure_metering(&self) -> Option<AutoExposureMetering> {
        self.auto_exposure_metering.current()
    }

    pub fn auto_white_balance(&self) -> Option<AutoWhiteBalance> {
        self.auto_white_balance.current()
    }

    pub fn manual_white_balance_preset(&self) -> Option<ManualWhiteBalancePreset> {
        self.manual_white_balance_preset.current()
    }

    pub fn register_access(&self) -> &[RegisterAccess] {
        self.register_access.entries()
    }

    /// Load every value the sensor currently reports.
    pub fn initialize(&mut self, sensor: &dyn SensorStream) {
        for (name, key, _) in SCALARS {
            match sensor.get_property(key) {
                Some(property) => {
                    self.scalars.insert(name, property);
                }
                None => {
                    self.scalars.remove(name);
                }
            }
        }
        self.camera_image_size.initialize(sensor);
        self.camera_image_flip.initialize(sensor);
        self.auto_exposure.initialize(sensor);
        self.manual_exposure.initialize(sensor);
        self.frame_rate.initialize(sensor);
        self.image_cropping.initialize(sensor);
        self.auto_exposure_metering.initialize(sensor);
        self.auto_white_balance.initialize(sensor);
        self.manual_white_balance_preset.initialize(sensor);
    }
}

impl DocumentNode for PqSettings {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[
            Validation::new("digital_zoom", Constraint::Kind(JsonKind::Number)),
            Validation::new("exposure_mode", Constraint::Kind(JsonKind::Number)),
            Validation::new("exposure_mode", Constraint::Ge(0.0)),
            Validation::new("exposure_mode", Constraint::Le(3.0)),
            Validation::new("exposure_mode", Constraint::Ne(1.0)),
            Validation::new("exposure_mode", Constraint::Ne(2.0)),
            Validation::new("ev_compensation", Constraint::Kind(JsonKind::Number)),
            Validation::new("ae_anti_flicker_mode", Constraint::Kind(JsonKind::Number)),
            Validation::new("ae_anti_flicker_mode", Constraint::Ge(0.0)),
            Validation::new("ae_anti_flicker_mode", Constraint::Le(3.0)),
            Validation::new("white_balance_mode", Constraint::Kind(JsonKind::Number)),
            Validation::new("white_balance_mode", Constraint::Ge(0.0)),
            Validation::new("white_balance_mode", Constraint::Le(1.0)),
            Validation::new("image_rotation", Constraint::Kind(JsonKind::Number)),
            Validation::new("image_rotation", Constraint::Ge(0.0)),
            Validation::new("image_rotation", Constraint::Le(3.0)),
            Validation::new("camera_image_size", Constraint::Kind(JsonKind::Object)),
            Validation::new("camera_image_flip", Constraint::Kind(JsonKind::Object)),
            Validation::new("auto_exposure", Constraint::Kind(JsonKind::Object)),
            Validation::new("manual_exposure", Constraint::Kind(JsonKind::Object)),
            Validation::new("frame_rate", Constraint::Kind(JsonKind::Object)),
            Validation::new("image_cropping", Constraint::Kind(JsonKind::Object)),
            Validation::new("auto_exposure_metering", Constraint::Kind(JsonKind::Object)),
            Validation::new("auto_white_balance", Constraint::Kind(JsonKind::Object)),
            Validation::new(
                "manual_white_balance_preset",
                Constraint::Kind(JsonKind::Object),
            ),
            Validation::new("register_access", Constraint::Kind(JsonKind::Array)),
        ];
        RULES
    }

    fn children(&self) -> Vec<Child<'_>> {
        vec![
            ("camera_image_size", &self.camera_image_size),
            ("camera_image_flip", &self.camera_image_flip),
            ("auto_exposure", &self.auto_exposure),
            ("manual_exposure", &self.manual_exposure),
            ("frame_rate", &self.frame_rate),
            ("image_cropping", &self.image_cropping),
            ("auto_exposure_metering", &self.auto_exposure_metering),
            ("auto_white_balance", &self.auto_white_balance),
            ("manual_white_balance_preset", &self.manual_white_balance_preset),
        ]
    }

    fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        vec![
            ("camera_image_size", &mut self.camera_image_size),
            ("camera_image_flip", &mut self.camera_image_flip),
            ("auto_exposure", &mut self.auto_exposure),
            ("manual_exposure", &mut self.manual_exposure),
            ("frame_rate", &mut self.frame_rate),
            ("image_cropping", &mut self.image_cropping),
            ("auto_exposure_metering", &mut self.auto_exposure_metering),
            ("auto_white_balance", &mut self.auto_white_balance),
            (
                "manual_white_balance_preset",
                &mut self.manual_white_balance_preset,
            ),
        ]
    }

    fn verify(&self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        verify_object(self.validations(), &self.children(), candidate)?;
        if let Some(Value::Array(entries)) = candidate.get("register_access") {
            self.register_access.verify(entries)?;
        }
        Ok(())
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        let mut outcome = Ok(());
        for (name, key, failure) in SCALARS {
            let Some(property) = field_f64(candidate, name).and_then(|v| scalar_property(key, v))
            else {
                continue;
            };
            match cx.push_property(property, failure) {
                Ok(()) => {
                    if self.scalars.get(name) != Some(&property) {
                        debug!(property = name, "stored");
                        self.scalars.insert(name, property);
                        cx.notify();
                    }
                }
                Err(err) => outcome = Err(err),
            }
        }
        if let Some(Value::Array(entries)) = candidate.get("register_access")
            && let Err(err) = self.register_access.apply(entries, cx)
        {
            outcome = Err(err);
        }
        if let Err(err) = apply_children(&mut self.children_mut(), candidate, cx) {
            outcome = Err(err);
        }
        outcome
    }

    fn to_value(&self) -> Value {
        let mut fields = Map::new();
        for (name, _, _) in SCALARS {
            let value = self.scalars.get(name).map_or(Value::Null, scalar_json);
            fields.insert(name.to_string(), value);
        }
        fields.insert("register_access".to_string(), self.register_access.to_value());
        compose(fields, &self.children())
    }
}
