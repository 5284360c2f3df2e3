//! Geometry properties: output size, flip and sensor crop.

use devconf_sensor::{ImageCrop, ImageFlip, ImageSize, PropertyKey, SensorProperty};
use devconf_types::JsonKind;
use serde_json::{json, Map, Value};

use super::object::PqValue;
use crate::node::field_u32;
use crate::validation::{Constraint, Validation};

impl PqValue for ImageSize {
    const KEY: PropertyKey = PropertyKey::CameraImageSize;
    const FAILURE: &'static str = "Camera image size property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("width", Constraint::Kind(JsonKind::Number)),
        Validation::new("width", Constraint::Ge(0.0)),
        Validation::new("height", Constraint::Kind(JsonKind::Number)),
        Validation::new("height", Constraint::Ge(0.0)),
        Validation::new("scaling_policy", Constraint::Kind(JsonKind::Number)),
        Validation::new("scaling_policy", Constraint::Ge(1.0)),
        Validation::new("scaling_policy", Constraint::Le(2.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        for (name, slot) in [
            ("width", &mut self.width),
            ("height", &mut self.height),
            ("scaling_policy", &mut self.scaling_policy),
        ] {
            if let Some(v) = field_u32(candidate, name) {
                *slot = v;
            }
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "width": self.width,
            "height": self.height,
            "scaling_policy": self.scaling_policy,
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::CameraImageSize(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::CameraImageSize(size) => Some(size),
            _ => None,
        }
    }
}

impl PqValue for ImageFlip {
    const KEY: PropertyKey = PropertyKey::CameraImageFlip;
    const FAILURE: &'static str = "Camera image flip property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("flip_horizontal", Constraint::Kind(JsonKind::Number)),
        Validation::new("flip_horizontal", Constraint::Ge(0.0)),
        Validation::new("flip_horizontal", Constraint::Le(1.0)),
        Validation::new("flip_vertical", Constraint::Kind(JsonKind::Number)),
        Validation::new("flip_vertical", Constraint::Ge(0.0)),
        Validation::new("flip_vertical", Constraint::Le(1.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "flip_horizontal") {
            self.flip_horizontal = v;
        }
        if let Some(v) = field_u32(candidate, "flip_vertical") {
            self.flip_vertical = v;
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "flip_horizontal": self.flip_horizontal,
            "flip_vertical": self.flip_vertical,
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::CameraImageFlip(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::CameraImageFlip(flip) => Some(flip),
            _ => None,
        }
    }
}

impl PqValue for ImageCrop {
    const KEY: PropertyKey = PropertyKey::ImageCrop;
    const FAILURE: &'static str = "Image cropping property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("left", Constraint::Kind(JsonKind::Number)),
        Validation::new("left", Constraint::Ge(0.0)),
        Validation::new("top", Constraint::Kind(JsonKind::Number)),
        Validation::new("top", Constraint::Ge(0.0)),
        Validation::new("width", Constraint::Kind(JsonKind::Number)),
        Validation::new("width", Constraint::Ge(0.0)),
        Validation::new("height", Constraint::Kind(JsonKind::Number)),
        Validation::new("height", Constraint::Ge(0.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        for (name, slot) in [
            ("left", &mut self.left),
            ("top", &mut self.top),
            ("width", &mut self.width),
            ("height", &mut self.height),
        ] {
            if let Some(v) = field_u32(candidate, name) {
                *slot = v;
            }
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "left": self.left,
            "top": self.top,
            "width": self.width,
            "height": self.height,
        })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::ImageCrop(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::ImageCrop(crop) => Some(crop),
            _ => None,
        }
    }
}
