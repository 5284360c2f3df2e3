//! Exposure and frame timing properties.

use devconf_sensor::{
    AutoExposure, AutoExposureMetering, FrameRate, ManualExposure, PropertyKey, SensorProperty,
};
use devconf_types::{ConfigError, JsonKind};
use serde_json::{json, Map, Value};

use super::object::PqValue;
use crate::node::{field_f64, field_u32, float_value};
use crate::validation::{Constraint, Validation};

impl PqValue for AutoExposure {
    const KEY: PropertyKey = PropertyKey::AutoExposure;
    const FAILURE: &'static str = "Auto exposure property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("max_exposure_time", Constraint::Kind(JsonKind::Number)),
        Validation::new("max_exposure_time", Constraint::Ge(0.0)),
        Validation::new("min_exposure_time", Constraint::Kind(JsonKind::Number)),
        Validation::new("min_exposure_time", Constraint::Ge(0.0)),
        Validation::new("max_gain", Constraint::Kind(JsonKind::Number)),
        Validation::new("convergence_speed", Constraint::Kind(JsonKind::Number)),
        Validation::new("convergence_speed", Constraint::Ge(0.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "max_exposure_time") {
            self.max_exposure_time = v;
        }
        if let Some(v) = field_u32(candidate, "min_exposure_time") {
            self.min_exposure_time = v;
        }
        if let Some(v) = field_f64(candidate, "max_gain") {
            self.max_gain = v as f32;
        }
        if let Some(v) = field_u32(candidate, "convergence_speed") {
            self.convergence_speed = v;
        }
    }

    fn check_merged(&self) -> Result<(), ConfigError> {
        if self.min_exposure_time > self.max_exposure_time {
            return Err(ConfigError::invalid(
                "Parameter min_exposure_time can not be greater than max_exposure_time",
            ));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        json!({
            "max_exposure_time": self.max_exposure_time,
            "min_exposure_time": self.min_exposure_time,
            "max_gain": float_value(self.max_gain),
            "convergence_speed": self.convergence_speed,
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::AutoExposure(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::AutoExposure(value) => Some(value),
            _ => None,
        }
    }
}

impl PqValue for ManualExposure {
    const KEY: PropertyKey = PropertyKey::ManualExposure;
    const FAILURE: &'static str = "Manual exposure property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("exposure_time", Constraint::Kind(JsonKind::Number)),
        Validation::new("exposure_time", Constraint::Ge(0.0)),
        Validation::new("gain", Constraint::Kind(JsonKind::Number)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "exposure_time") {
            self.exposure_time = v;
        }
        if let Some(v) = field_f64(candidate, "gain") {
            self.gain = v as f32;
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "exposure_time": self.exposure_time,
            "gain": float_value(self.gain),
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::ManualExposure(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::ManualExposure(value) => Some(value),
            _ => None,
        }
    }
}

impl PqValue for FrameRate {
    const KEY: PropertyKey = PropertyKey::FrameRate;
    const FAILURE: &'static str = "Frame rate property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("num", Constraint::Kind(JsonKind::Number)),
        Validation::new("num", Constraint::Ge(0.0)),
        Validation::new("denom", Constraint::Kind(JsonKind::Number)),
        Validation::new("denom", Constraint::Ge(0.0)),
    ];

    fn check_candidate(candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        for (name, label) in [("num", "Num"), ("denom", "Denom")] {
            if let Some(v) = field_f64(candidate, name)
                && v.fract() != 0.0
            {
                return Err(ConfigError::invalid(format!(
                    "{label} property has to be an integer"
                )));
            }
        }
        Ok(())
    }

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "num") {
            self.num = v;
        }
        if let Some(v) = field_u32(candidate, "denom") {
            self.denom = v;
        }
    }

    fn to_json(&self) -> Value {
        json!({ "num": self.num, "denom": self.denom })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::FrameRate(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::FrameRate(value) => Some(value),
            _ => None,
        }
    }
}

impl PqValue for AutoExposureMetering {
    const KEY: PropertyKey = PropertyKey::AutoExposureMetering;
    const FAILURE: &'static str = "Auto Exposure Metering property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("metering_mode", Constraint::Kind(JsonKind::Number)),
        Validation::new("metering_mode", Constraint::Ge(0.0)),
        Validation::new("metering_mode", Constraint::Le(1.0)),
        Validation::new("top", Constraint::Kind(JsonKind::Number)),
        Validation::new("top", Constraint::Ge(0.0)),
        Validation::new("left", Constraint::Kind(JsonKind::Number)),
        Validation::new("left", Constraint::Ge(0.0)),
        Validation::new("bottom", Constraint::Kind(JsonKind::Number)),
        Validation::new("bottom", Constraint::Ge(0.0)),
        Validation::new("right", Constraint::Kind(JsonKind::Number)),
        Validation::new("right", Constraint::Ge(0.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "metering_mode") {
            self.mode = v;
        }
        if let Some(v) = field_u32(candidate, "top") {
            self.top = v;
        }
        if let Some(v) = field_u32(candidate, "left") {
            self.left = v;
        }
        if let Some(v) = field_u32(candidate, "bottom") {
            self.bottom = v;
        }
        if let Some(v) = field_u32(candidate, "right") {
            self.right = v;
        }
    }

    /// The window only matters outside full-screen metering (mode 0).
    fn check_merged(&self) -> Result<(), ConfigError> {
        if self.mode == 0 {
            return Ok(());
        }
        if self.top >= self.bottom {
            return Err(ConfigError::invalid("top not top < bottom"));
        }
        if self.left >= self.right {
            return Err(ConfigError::invalid("left not left < right"));
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        json!({
            "metering_mode": self.mode,
            "top": self.top,
            "left": self.left,
            "bottom": self.bottom,
            "right": self.right,
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::AutoExposureMetering(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::AutoExposureMetering(value) => Some(value),
            _ => None,
        }
    }
}
