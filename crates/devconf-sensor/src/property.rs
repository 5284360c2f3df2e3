//! Typed sensor property values exchanged with a [`SensorStream`][crate::SensorStream].

use serde::{Deserialize, Serialize};

/// Identifies one property slot on a sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    CameraImageSize,
    CameraImageFlip,
    DigitalZoom,
    ExposureMode,
    AutoExposure,
    ManualExposure,
    FrameRate,
    ImageCrop,
    EvCompensation,
    AntiFlickerMode,
    WhiteBalanceMode,
    ImageRotation,
    InputDataType,
    AutoExposureMetering,
    AutoWhiteBalance,
    ManualWhiteBalancePreset,
    RegisterAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    pub scaling_policy: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageFlip {
    pub flip_horizontal: u32,
    pub flip_vertical: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoExposure {
    pub max_exposure_time: u32,
    pub min_exposure_time: u32,
    pub max_gain: f32,
    pub convergence_speed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualExposure {
    pub exposure_time: u32,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub denom: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageCrop {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Window the auto exposure meters over.
///
/// `mode` 0 meters the full screen and ignores the window; 1 uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoExposureMetering {
    pub mode: u32,
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutoWhiteBalance {
    pub convergence_speed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualWhiteBalancePreset {
    /// Colour temperature in kelvin.
    pub color_temperature: u32,
}

impl Default for ManualWhiteBalancePreset {
    fn default() -> Self {
        Self {
            color_temperature: 3200,
        }
    }
}

/// Width of a raw register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegisterBitLength {
    #[default]
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

impl RegisterBitLength {
    /// Map the document value (0 to 3) to a width.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(RegisterBitLength::Bits8),
            1 => Some(RegisterBitLength::Bits16),
            2 => Some(RegisterBitLength::Bits32),
            3 => Some(RegisterBitLength::Bits64),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            RegisterBitLength::Bits8 => 0,
            RegisterBitLength::Bits16 => 1,
            RegisterBitLength::Bits32 => 2,
            RegisterBitLength::Bits64 => 3,
        }
    }

    /// `data` cut down to this width.
    pub fn truncate(self, data: u64) -> u64 {
        match self {
            RegisterBitLength::Bits8 => data & 0xFF,
            RegisterBitLength::Bits16 => data & 0xFFFF,
            RegisterBitLength::Bits32 => data & 0xFFFF_FFFF,
            RegisterBitLength::Bits64 => data,
        }
    }
}

/// One raw register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterAccess {
    pub bit_length: RegisterBitLength,
    pub id: u32,
    pub address: u64,
    pub data: u64,
}

/// Which output channels the stream delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputDataType {
    /// Inference output (metadata) channel.
    pub metadata: bool,
    /// Raw input tensor (image) channel.
    pub input_tensor: bool,
}

/// A property value, tagged with its slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum SensorProperty {
    CameraImageSize(ImageSize),
    CameraImageFlip(ImageFlip),
    DigitalZoom(f32),
    ExposureMode(u32),
    AutoExposure(AutoExposure),
    ManualExposure(ManualExposure),
    FrameRate(FrameRate),
    ImageCrop(ImageCrop),
    EvCompensation(f32),
    AntiFlickerMode(u32),
    WhiteBalanceMode(u32),
    ImageRotation(u32),
    InputDataType(InputDataType),
    AutoExposureMetering(AutoExposureMetering),
    AutoWhiteBalance(AutoWhiteBalance),
    ManualWhiteBalancePreset(ManualWhiteBalancePreset),
    RegisterAccess(RegisterAccess),
}

impl SensorProperty {
    /// The slot this value belongs to.
    pub fn key(&self) -> PropertyKey {
        match self {
            SensorProperty::CameraImageSize(_) => PropertyKey::CameraImageSize,
            SensorProperty::CameraImageFlip(_) => PropertyKey::CameraImageFlip,
            SensorProperty::DigitalZoom(_) => PropertyKey::DigitalZoom,
            SensorProperty::ExposureMode(_) => PropertyKey::ExposureMode,
            SensorProperty::AutoExposure(_) => PropertyKey::AutoExposure,
            SensorProperty::ManualExposure(_) => PropertyKey::ManualExposure,
            SensorProperty::FrameRate(_) => PropertyKey::FrameRate,
            SensorProperty::ImageCrop(_) => PropertyKey::ImageCrop,
            SensorProperty::EvCompensation(_) => PropertyKey::EvCompensation,
            SensorProperty::AntiFlickerMode(_) => PropertyKey::AntiFlickerMode,
            SensorProperty::WhiteBalanceMode(_) => PropertyKey::WhiteBalanceMode,
            SensorProperty::ImageRotation(_) => PropertyKey::ImageRotation,
            SensorProperty::InputDataType(_) => PropertyKey::InputDataType,
            SensorProperty::AutoExposureMetering(_) => PropertyKey::AutoExposureMetering,
            SensorProperty::AutoWhiteBalance(_) => PropertyKey::AutoWhiteBalance,
            SensorProperty::ManualWhiteBalancePreset(_) => PropertyKey::ManualWhiteBalancePreset,
            SensorProperty::RegisterAccess(_) => PropertyKey::RegisterAccess,
        }
    }
}
