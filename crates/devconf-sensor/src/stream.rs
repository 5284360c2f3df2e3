//! The [`SensorStream`] trait – boundary to the camera/sensor property API.

use std::fmt;

use devconf_types::ResponseCode;

use crate::property::{PropertyKey, SensorProperty};

/// Why the sensor rejected a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorErrorCause {
    InvalidArgument,
    OutOfRange,
    NotAvailable,
}

/// Error reported by a [`SensorStream`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorError {
    pub cause: SensorErrorCause,
    pub message: String,
}

impl SensorError {
    pub fn new(cause: SensorErrorCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    /// Response code reported to the cloud for this failure.
    ///
    /// Only an out-of-range cause is distinguished; everything else is an
    /// invalid argument.
    pub fn code(&self) -> ResponseCode {
        match self.cause {
            SensorErrorCause::OutOfRange => ResponseCode::OutOfRange,
            _ => ResponseCode::InvalidArgument,
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.cause, self.message)
    }
}

impl std::error::Error for SensorError {}

/// A sensor stream whose properties can be read and written.
///
/// Implementations wrap the vendor sensor API; [`SimSensor`][crate::sim::SimSensor]
/// is the in-process stand-in used by tests and headless runs.
pub trait SensorStream: Send {
    /// Push `property` to the device.
    ///
    /// # Errors
    ///
    /// Returns a [`SensorError`] when the device rejects the value.
    fn set_property(&mut self, property: &SensorProperty) -> Result<(), SensorError>;

    /// Read the current value of `key`, or `None` when the device has none.
    fn get_property(&self, key: PropertyKey) -> Option<SensorProperty>;
}
