//! `devconf-sensor` – sensor property boundary.
//!
//! The configuration engine never talks to camera hardware directly.  It
//! pushes typed [`SensorProperty`] values through the [`SensorStream`]
//! trait and reads them back when initialising the document.
//!
//! # Modules
//!
//! - [`property`] – [`PropertyKey`] and the typed [`SensorProperty`] values.
//! - [`stream`] – the [`SensorStream`] trait and [`SensorError`].
//! - [`sim`] – [`SimSensor`][sim::SimSensor], an in-memory implementation
//!   with failure injection for tests and headless runs.

pub mod property;
pub mod sim;
pub mod stream;

pub use property::{
    AutoExposure, AutoExposureMetering, AutoWhiteBalance, FrameRate, ImageCrop, ImageFlip,
    ImageSize, InputDataType, ManualExposure, ManualWhiteBalancePreset, PropertyKey,
    RegisterAccess, RegisterBitLength, SensorProperty,
};
pub use sim::SimSensor;
pub use stream::{SensorError, SensorErrorCause, SensorStream};
