//! White balance properties.
//!
//! The preset is addressed by index in the document (0 to 3) and by
//! colour temperature on the sensor.

use devconf_sensor::{AutoWhiteBalance, ManualWhiteBalancePreset, PropertyKey, SensorProperty};
use devconf_types::JsonKind;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::object::PqValue;
use crate::node::field_u32;
use crate::validation::{Constraint, Validation};

/// Colour temperatures in kelvin, indexed by the document value.
const PRESET_KELVIN: [u32; 4] = [3200, 4300, 5600, 6500];

impl PqValue for AutoWhiteBalance {
    const KEY: PropertyKey = PropertyKey::AutoWhiteBalance;
    const FAILURE: &'static str = "Auto White Balance property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("convergence_speed", Constraint::Kind(JsonKind::Number)),
        Validation::new("convergence_speed", Constraint::Ge(0.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(v) = field_u32(candidate, "convergence_speed") {
            self.convergence_speed = v;
        }
    }

    fn to_json(&self) -> Value {
        json!({ "convergence_speed": self.convergence_speed })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::AutoWhiteBalance(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::AutoWhiteBalance(value) => Some(value),
            _ => None,
        }
    }
}

impl PqValue for ManualWhiteBalancePreset {
    const KEY: PropertyKey = PropertyKey::ManualWhiteBalancePreset;
    const FAILURE: &'static str = "Manual White Balance property failed to be set.";
    const RULES: &'static [Validation] = &[
        Validation::new("color_temperature", Constraint::Kind(JsonKind::Number)),
        Validation::new("color_temperature", Constraint::Ge(0.0)),
        Validation::new("color_temperature", Constraint::Le(3.0)),
    ];

    fn merge(&mut self, candidate: &Map<String, Value>) {
        if let Some(index) = field_u32(candidate, "color_temperature") {
            self.color_temperature = PRESET_KELVIN
                .get(index as usize)
                .copied()
                .unwrap_or(PRESET_KELVIN[0]);
        }
    }

    fn to_json(&self) -> Value {
        let index = PRESET_KELVIN
            .iter()
            .position(|&kelvin| kelvin == self.color_temperature)
            .unwrap_or_else(|| {
                warn!(kelvin = self.color_temperature, "unknown preset, reporting 3200K");
                0
            });
        json!({ "color_temperature": index })
    }

    fn into_property(self) -> SensorProperty {
        SensorProperty::ManualWhiteBalancePreset(self)
    }

    fn from_property(property: SensorProperty) -> Option<Self> {
        match property {
            SensorProperty::ManualWhiteBalancePreset(value) => Some(value),
            _ => None,
        }
    }
}
