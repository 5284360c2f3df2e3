//! `common_settings.port_settings` – output channel routing.
//!
//! Two [`PortSetting`]s, `metadata` (inference output) and `input_tensor`
//! (raw image).  Whenever either changes, at least one must remain enabled
//! and the enabled pair is pushed to the sensor as its input data type.
//! Candidates are merged over the stored ports during Verify, so a pair
//! with nothing enabled is rejected before anything is stored.

use devconf_sensor::{InputDataType, SensorProperty};
use devconf_types::{ConfigError, JsonKind};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::node::{
    compose, field_bool, field_str, field_u32, number_or_null, verify_object, ApplyContext, Child,
    DocumentNode,
};
use crate::validation::{Constraint, Validation};

const METADATA: &str = "metadata";
const INPUT_TENSOR: &str = "input_tensor";

/// Destination of one output channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSetting {
    pub method: Option<u32>,
    pub storage_name: Option<String>,
    pub endpoint: Option<String>,
    pub path: Option<String>,
    pub enabled: Option<bool>,
}

impl PortSetting {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    /// This port with the fields present in `candidate` overwritten.
    pub fn merged(&self, candidate: &Map<String, Value>) -> PortSetting {
        let mut next = self.clone();
        if let Some(method) = field_u32(candidate, "method") {
            next.method = Some(method);
        }
        for (name, slot) in [
            ("storage_name", &mut next.storage_name),
            ("endpoint", &mut next.endpoint),
            ("path", &mut next.path),
        ] {
            if let Some(text) = field_str(candidate, name) {
                *slot = Some(text.to_string());
            }
        }
        if let Some(enabled) = field_bool(candidate, "enabled") {
            next.enabled = Some(enabled);
        }
        next
    }
}

impl DocumentNode for PortSetting {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[
            Validation::new("method", Constraint::Kind(JsonKind::Number)),
            Validation::new("method", Constraint::Ge(0.0)),
            Validation::new("storage_name", Constraint::Kind(JsonKind::String)),
            Validation::new("endpoint", Constraint::Kind(JsonKind::String)),
            Validation::new("path", Constraint::Kind(JsonKind::String)),
            Validation::new("enabled", Constraint::Kind(JsonKind::Boolean)),
        ];
        RULES
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        _cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        *self = self.merged(candidate);
        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut fields = Map::new();
        if self.method.is_some() {
            fields.insert("method".into(), number_or_null(self.method));
        }
        for (name, slot) in [
            ("storage_name", &self.storage_name),
            ("endpoint", &self.endpoint),
            ("path", &self.path),
        ] {
            if let Some(text) = slot {
                fields.insert(name.into(), Value::String(text.clone()));
            }
        }
        if let Some(enabled) = self.enabled {
            fields.insert("enabled".into(), Value::Bool(enabled));
        }
        Value::Object(fields)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSettings {
    metadata: PortSetting,
    input_tensor: PortSetting,
}

impl PortSettings {
    pub fn metadata(&self) -> &PortSetting {
        &self.metadata
    }

    pub fn input_tensor(&self) -> &PortSetting {
        &self.input_tensor
    }

    /// Both ports with `candidate` merged over them.
    fn merged(&self, candidate: &Map<String, Value>) -> PortSettings {
        let merge = |port: &PortSetting, name: &str| match candidate.get(name) {
            Some(Value::Object(fragment)) => port.merged(fragment),
            _ => port.clone(),
        };
        PortSettings {
            metadata: merge(&self.metadata, METADATA),
            input_tensor: merge(&self.input_tensor, INPUT_TENSOR),
        }
    }

    fn input_data_type(&self) -> InputDataType {
        InputDataType {
            metadata: self.metadata.is_enabled(),
            input_tensor: self.input_tensor.is_enabled(),
        }
    }
}

impl DocumentNode for PortSettings {
    fn children(&self) -> Vec<Child<'_>> {
        vec![(METADATA, &self.metadata), (INPUT_TENSOR, &self.input_tensor)]
    }

    fn verify(&self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        verify_object(self.validations(), &self.children(), candidate)?;
        let next = self.merged(candidate);
        if next != *self && !next.metadata.is_enabled() && !next.input_tensor.is_enabled() {
            return Err(ConfigError::invalid(
                "Neither input tensor or metadata are enabled",
            ));
        }
        Ok(())
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        let next = self.merged(candidate);
        if next == *self {
            return Ok(());
        }
        debug!(?next, "port settings changed");

        let data_type = next.input_data_type();
        info!(?data_type, "pushing input data type");
        cx.push_property(
            SensorProperty::InputDataType(data_type),
            "Input Data Type property failed to be set.",
        )?;
        *self = next;
        cx.notify();
        Ok(())
    }

    fn to_value(&self) -> Value {
        compose(Map::new(), &self.children())
    }
}
