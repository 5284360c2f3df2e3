//! `custom_settings` – application-defined settings.
//!
//! The engine does not interpret this section.  When it changes, a copy is
//! stored, stamped with a `res_info` block correlated to the request, and
//! handed to the application's [`ConfigureHandler`].

use devconf_types::{ConfigError, ResInfoRecord, ResponseCode};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::node::{ApplyContext, DocumentNode};

pub const CUSTOM_SETTINGS: &str = "custom_settings";
const RES_INFO: &str = "res_info";

/// Application hook invoked with the serialized custom settings.
pub trait ConfigureHandler: Send {
    /// Configure the application from `settings` (a JSON object as text).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configure`] when the application rejects the
    /// settings; the error becomes the section's Apply outcome.
    fn on_configure(&mut self, topic: &str, settings: &str) -> Result<(), ConfigError>;
}

/// Handler that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConfigure;

impl ConfigureHandler for NoopConfigure {
    fn on_configure(&mut self, topic: &str, _settings: &str) -> Result<(), ConfigError> {
        debug!(topic, "configure ignored");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomSettings {
    value: Map<String, Value>,
}

impl CustomSettings {
    pub fn value(&self) -> &Map<String, Value> {
        &self.value
    }

    /// Replace the stored settings with the application's own view.
    ///
    /// Text that is not a JSON object is logged and ignored.
    pub fn store(&mut self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(value)) => self.value = value,
            Ok(_) => warn!("custom settings must be an object"),
            Err(err) => warn!(%err, "unable to parse custom settings"),
        }
    }

    fn stamp(&mut self, record: ResInfoRecord) -> Result<(), ConfigError> {
        let stamp =
            serde_json::to_value(record).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        self.value.insert(RES_INFO.to_string(), stamp);
        Ok(())
    }
}

fn without_res_info(value: &Map<String, Value>) -> Map<String, Value> {
    let mut value = value.clone();
    value.remove(RES_INFO);
    value
}

impl DocumentNode for CustomSettings {
    fn verify(&self, _candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        Ok(())
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        if without_res_info(&self.value) == without_res_info(candidate) {
            info!("custom settings unchanged");
            return Ok(());
        }

        self.value = candidate.clone();
        self.stamp(ResInfoRecord {
            res_id: cx.req_id.to_string(),
            code: ResponseCode::Ok.as_u32(),
            detail_msg: String::new(),
        })?;
        cx.notify();

        let settings = Value::Object(self.value.clone()).to_string();
        if let Err(err) = cx.configure.on_configure(CUSTOM_SETTINGS, &settings) {
            warn!(%err, "application rejected custom settings");
            self.stamp(ResInfoRecord {
                res_id: cx.req_id.to_string(),
                code: err.code().as_u32(),
                detail_msg: err.to_string(),
            })?;
            return Err(err);
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Object(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_replaces_value() {
        let mut settings = CustomSettings::default();
        settings.store(r#"{"ai_models": {}}"#);
        assert!(settings.value().contains_key("ai_models"));
    }

    #[test]
    fn store_ignores_bad_text() {
        let mut settings = CustomSettings::default();
        settings.store(r#"{"a": 1}"#);
        settings.store("not json");
        settings.store("[1, 2]");
        assert_eq!(settings.to_value(), serde_json::json!({"a": 1}));
    }

    #[test]
    fn fresh_settings_are_empty_object() {
        assert_eq!(CustomSettings::default().to_value(), serde_json::json!({}));
    }
}
