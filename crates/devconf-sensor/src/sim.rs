//! In-process sensor simulation for tests and headless runs.
//!
//! [`SimSensor`] stores every accepted property in memory, records the
//! write history, and can be told to reject a given property slot so that
//! failure paths are reachable without hardware.
//!
//! # Example
//!
//! ```rust
//! use devconf_sensor::sim::SimSensor;
//! use devconf_sensor::{FrameRate, PropertyKey, SensorProperty, SensorStream};
//!
//! let mut sensor = SimSensor::new().with_defaults();
//! sensor
//!     .set_property(&SensorProperty::FrameRate(FrameRate { num: 15, denom: 1 }))
//!     .expect("sim frame rate must succeed");
//! assert_eq!(
//!     sensor.get_property(PropertyKey::FrameRate),
//!     Some(SensorProperty::FrameRate(FrameRate { num: 15, denom: 1 }))
//! );
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::property::{
    AutoExposure, AutoExposureMetering, AutoWhiteBalance, FrameRate, ImageCrop, ImageFlip,
    ImageSize, InputDataType, ManualExposure, ManualWhiteBalancePreset, PropertyKey,
    SensorProperty,
};
use crate::stream::{SensorError, SensorErrorCause, SensorStream};

/// Simulated sensor stream.
#[derive(Debug, Default)]
pub struct SimSensor {
    properties: HashMap<PropertyKey, SensorProperty>,
    rejected: HashMap<PropertyKey, SensorErrorCause>,
    history: Vec<SensorProperty>,
}

impl SimSensor {
    /// An empty sensor: every read returns `None` until a write succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the sensor with plausible power-on values.
    pub fn with_defaults(mut self) -> Self {
        let defaults = [
            SensorProperty::CameraImageSize(ImageSize {
                width: 2028,
                height: 1520,
                scaling_policy: 1,
            }),
            SensorProperty::CameraImageFlip(ImageFlip::default()),
            SensorProperty::DigitalZoom(1.0),
            SensorProperty::ExposureMode(0),
            SensorProperty::AutoExposure(AutoExposure {
                max_exposure_time: 20_000,
                min_exposure_time: 33,
                max_gain: 24.0,
                convergence_speed: 3,
            }),
            SensorProperty::ManualExposure(ManualExposure {
                exposure_time: 10_000,
                gain: 1.0,
            }),
            SensorProperty::FrameRate(FrameRate { num: 30, denom: 1 }),
            SensorProperty::ImageCrop(ImageCrop {
                left: 0,
                top: 0,
                width: 4056,
                height: 3040,
            }),
            SensorProperty::EvCompensation(0.0),
            SensorProperty::AntiFlickerMode(1),
            SensorProperty::WhiteBalanceMode(0),
            SensorProperty::ImageRotation(0),
            SensorProperty::InputDataType(InputDataType {
                metadata: true,
                input_tensor: false,
            }),
            SensorProperty::AutoExposureMetering(AutoExposureMetering::default()),
            SensorProperty::AutoWhiteBalance(AutoWhiteBalance {
                convergence_speed: 3,
            }),
            SensorProperty::ManualWhiteBalancePreset(ManualWhiteBalancePreset {
                color_temperature: 3200,
            }),
        ];
        for prop in defaults {
            self.properties.insert(prop.key(), prop);
        }
        self
    }

    /// Make every subsequent write to `key` fail with `cause`.
    pub fn reject(&mut self, key: PropertyKey, cause: SensorErrorCause) {
        self.rejected.insert(key, cause);
    }

    /// Stop rejecting writes to `key`.
    pub fn accept(&mut self, key: PropertyKey) {
        self.rejected.remove(&key);
    }

    /// Every successful write, oldest first.
    pub fn history(&self) -> &[SensorProperty] {
        &self.history
    }

    fn check(property: &SensorProperty) -> Result<(), SensorError> {
        match property {
            SensorProperty::FrameRate(FrameRate { denom: 0, .. }) => Err(SensorError::new(
                SensorErrorCause::OutOfRange,
                "frame rate denominator must be non-zero",
            )),
            SensorProperty::ImageCrop(crop) if crop.width == 0 || crop.height == 0 => {
                Err(SensorError::new(
                    SensorErrorCause::OutOfRange,
                    "crop area must be non-empty",
                ))
            }
            SensorProperty::ManualWhiteBalancePreset(preset)
                if ![3200, 4300, 5600, 6500].contains(&preset.color_temperature) =>
            {
                Err(SensorError::new(
                    SensorErrorCause::InvalidArgument,
                    "unsupported colour temperature",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl SensorStream for SimSensor {
    fn set_property(&mut self, property: &SensorProperty) -> Result<(), SensorError> {
        let key = property.key();
        if let Some(cause) = self.rejected.get(&key) {
            return Err(SensorError::new(*cause, format!("{key:?} rejected")));
        }
        Self::check(property)?;
        debug!(?key, "sim sensor property set");
        self.properties.insert(key, *property);
        self.history.push(*property);
        Ok(())
    }

    fn get_property(&self, key: PropertyKey) -> Option<SensorProperty> {
        self.properties.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sensor_has_no_properties() {
        let sensor = SimSensor::new();
        assert!(sensor.get_property(PropertyKey::FrameRate).is_none());
    }

    #[test]
    fn defaults_cover_every_key() {
        let sensor = SimSensor::new().with_defaults();
        for key in [
            PropertyKey::CameraImageSize,
            PropertyKey::AutoExposure,
            PropertyKey::ImageRotation,
            PropertyKey::InputDataType,
            PropertyKey::AutoWhiteBalance,
            PropertyKey::ManualWhiteBalancePreset,
        ] {
            assert!(sensor.get_property(key).is_some(), "{key:?} missing");
        }
    }

    #[test]
    fn write_is_recorded() {
        let mut sensor = SimSensor::new();
        sensor
            .set_property(&SensorProperty::DigitalZoom(2.0))
            .unwrap();
        assert_eq!(sensor.history().len(), 1);
        assert_eq!(
            sensor.get_property(PropertyKey::DigitalZoom),
            Some(SensorProperty::DigitalZoom(2.0))
        );
    }

    #[test]
    fn rejected_key_fails_and_keeps_old_value() {
        let mut sensor = SimSensor::new().with_defaults();
        sensor.reject(PropertyKey::ExposureMode, SensorErrorCause::InvalidArgument);
        let err = sensor
            .set_property(&SensorProperty::ExposureMode(3))
            .unwrap_err();
        assert_eq!(err.cause, SensorErrorCause::InvalidArgument);
        assert_eq!(
            sensor.get_property(PropertyKey::ExposureMode),
            Some(SensorProperty::ExposureMode(0))
        );

        sensor.accept(PropertyKey::ExposureMode);
        assert!(sensor.set_property(&SensorProperty::ExposureMode(3)).is_ok());
    }

    #[test]
    fn zero_denominator_is_out_of_range() {
        let mut sensor = SimSensor::new();
        let err = sensor
            .set_property(&SensorProperty::FrameRate(FrameRate { num: 30, denom: 0 }))
            .unwrap_err();
        assert_eq!(err.code(), devconf_types::ResponseCode::OutOfRange);
        assert!(sensor.history().is_empty());
    }

    #[test]
    fn unknown_colour_temperature_is_refused() {
        let mut sensor = SimSensor::new().with_defaults();
        let err = sensor
            .set_property(&SensorProperty::ManualWhiteBalancePreset(
                ManualWhiteBalancePreset {
                    color_temperature: 4000,
                },
            ))
            .unwrap_err();
        assert_eq!(err.cause, SensorErrorCause::InvalidArgument);
        assert!(sensor.history().is_empty());
    }
}
