//! [`ConfigurationDocument`] – the root of the configuration tree.
//!
//! # Update protocol
//!
//! 1. Parse the text.  A parse failure leaves the document untouched.
//! 2. Reset `res_info`.
//! 3. Verify the whole candidate.  `req_info` is applied during this step and
//!    its id copied to `res_info.res_id` whatever the verdict, so a rejected
//!    request is still correlated.
//! 4. On a failed verify, write the error into `res_info` and stop.
//! 5. Apply `common_settings`, then `custom_settings`.  A failing section is
//!    logged and recorded in `res_info` but does not stop the next one; the
//!    result of the last attempted section is returned.

use devconf_sensor::SensorStream;
use devconf_types::{ConfigError, JsonKind, ProcessState};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::common_settings::CommonSettings;
use crate::custom_settings::{ConfigureHandler, CustomSettings, CUSTOM_SETTINGS};
use crate::node::{verify_object, ApplyContext, Child, DocumentNode, LifecycleRequests};
use crate::notifier::Notifier;
use crate::req_info::ReqInfo;
use crate::res_info::ResInfo;
use crate::serialize::{serialize_bounded, SerializedState};
use crate::validation::{Constraint, Validation};

pub const REQ_INFO: &str = "req_info";
pub const RES_INFO: &str = "res_info";
pub const COMMON_SETTINGS: &str = "common_settings";

const ROOT_RULES: &[Validation] = &[
    Validation::new(REQ_INFO, Constraint::Kind(JsonKind::Object)),
    Validation::new(COMMON_SETTINGS, Constraint::Kind(JsonKind::Object)),
    Validation::new(CUSTOM_SETTINGS, Constraint::Kind(JsonKind::Object)),
];

/// External collaborators an Update needs.
pub struct Collaborators<'a> {
    pub sensor: &'a mut dyn SensorStream,
    pub configure: &'a mut dyn ConfigureHandler,
    /// Process state the request is applied in.
    pub process_state: ProcessState,
}

#[derive(Debug, Clone)]
pub struct ConfigurationDocument {
    req_info: ReqInfo,
    res_info: ResInfo,
    common_settings: CommonSettings,
    custom_settings: CustomSettings,
    notifier: Notifier,
    requests: LifecycleRequests,
}

impl ConfigurationDocument {
    /// A fresh document whose `res_info` raises `notifier`.
    pub fn new(notifier: Notifier) -> Self {
        Self {
            req_info: ReqInfo::default(),
            res_info: ResInfo::new(notifier.clone()),
            common_settings: CommonSettings::default(),
            custom_settings: CustomSettings::default(),
            notifier,
            requests: LifecycleRequests::default(),
        }
    }

    pub fn req_info(&self) -> &ReqInfo {
        &self.req_info
    }

    pub fn res_info(&self) -> &ResInfo {
        &self.res_info
    }

    pub fn res_info_mut(&mut self) -> &mut ResInfo {
        &mut self.res_info
    }

    pub fn common_settings(&self) -> &CommonSettings {
        &self.common_settings
    }

    pub fn common_settings_mut(&mut self) -> &mut CommonSettings {
        &mut self.common_settings
    }

    pub fn custom_settings(&self) -> &CustomSettings {
        &self.custom_settings
    }

    pub fn custom_settings_mut(&mut self) -> &mut CustomSettings {
        &mut self.custom_settings
    }

    /// Lifecycle requests recorded since the last call.
    pub fn take_requests(&mut self) -> LifecycleRequests {
        std::mem::take(&mut self.requests)
    }

    /// Load sensor-backed values without notifying.
    pub fn initialize_values(&mut self, sensor: &dyn SensorStream) {
        self.common_settings.initialize(sensor);
    }

    /// Run the full parse / verify / apply cycle on `text`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] or [`ConfigError::NotAnObject`] if `text` is
    ///   not a JSON object; nothing is modified.
    /// - The verify error if the candidate is rejected.
    /// - Otherwise the outcome of the last applied section.
    pub fn update(
        &mut self,
        text: &str,
        collaborators: &mut Collaborators<'_>,
    ) -> Result<(), ConfigError> {
        let parsed: Value = serde_json::from_str(text).map_err(|e| {
            error!(err = %e, "unable to parse configuration");
            ConfigError::Parse(e.to_string())
        })?;
        let Value::Object(candidate) = parsed else {
            error!("configuration is not an object");
            return Err(ConfigError::NotAnObject);
        };

        self.res_info.reset();

        if let Err(err) = self.verify(&candidate) {
            warn!(req_id = self.req_info.req_id(), %err, "configuration rejected");
            self.res_info.record_error(&err);
            return Err(err);
        }

        info!(req_id = self.req_info.req_id(), "applying configuration");
        self.apply(&candidate, collaborators)
    }

    /// Verify `candidate`; `req_info` is applied eagerly.
    pub fn verify(&mut self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        if let Some(Value::Object(req)) = candidate.get(REQ_INFO) {
            self.req_info.apply_request(req);
        }
        let req_id = self.req_info.req_id().to_string();
        self.res_info.set_res_id(req_id);

        verify_object(ROOT_RULES, &self.children(), candidate)
    }

    /// Apply a verified `candidate`.
    ///
    /// Both sections are attempted.  The returned outcome is that of the
    /// last section present, so an earlier failure may be masked; it is
    /// still visible in `res_info`.
    pub fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        collaborators: &mut Collaborators<'_>,
    ) -> Result<(), ConfigError> {
        let Self {
            req_info,
            res_info,
            common_settings,
            custom_settings,
            notifier,
            requests,
        } = self;
        let mut cx = ApplyContext {
            res_info,
            sensor: &mut *collaborators.sensor,
            configure: &mut *collaborators.configure,
            notifier,
            process_state: collaborators.process_state,
            req_id: req_info.req_id(),
            requests,
        };

        let sections: [(&str, &mut dyn DocumentNode); 2] = [
            (COMMON_SETTINGS, common_settings),
            (CUSTOM_SETTINGS, custom_settings),
        ];
        let mut outcome = Ok(());
        for (name, section) in sections {
            let Some(Value::Object(fragment)) = candidate.get(name) else {
                continue;
            };
            debug!(section = name, "applying section");
            outcome = section.apply(fragment, &mut cx);
            if let Err(err) = &outcome {
                error!(section = name, %err, "section apply failed");
                cx.res_info.record_error(err);
            }
        }
        outcome
    }

    fn children(&self) -> Vec<Child<'_>> {
        vec![
            (REQ_INFO, &self.req_info),
            (RES_INFO, &self.res_info),
            (COMMON_SETTINGS, &self.common_settings),
            (CUSTOM_SETTINGS, &self.custom_settings),
        ]
    }

    /// The whole tree as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for (name, child) in self.children() {
            root.insert(name.to_string(), child.to_value());
        }
        Value::Object(root)
    }

    /// Serialize the whole tree as a NUL-terminated document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialization`] when the output does not fit the
    /// estimated bound.
    pub fn serialize(&self) -> Result<SerializedState, ConfigError> {
        serialize_bounded(&self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_settings::NoopConfigure;
    use devconf_sensor::SimSensor;
    use devconf_types::ResponseCode;

    fn update(doc: &mut ConfigurationDocument, text: &str) -> Result<(), ConfigError> {
        let mut sensor = SimSensor::new().with_defaults();
        let mut configure = NoopConfigure;
        doc.update(
            text,
            &mut Collaborators {
                sensor: &mut sensor,
                configure: &mut configure,
                process_state: ProcessState::Idle,
            },
        )
    }

    #[test]
    fn parse_failure_leaves_document_untouched() {
        let notifier = Notifier::new();
        let mut doc = ConfigurationDocument::new(notifier.clone());
        update(&mut doc, r#"{"req_info": {"req_id": "1"}}"#).unwrap();
        let before = doc.to_value();

        let err = update(&mut doc, "{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(doc.to_value(), before);

        assert_eq!(update(&mut doc, "[1]").unwrap_err(), ConfigError::NotAnObject);
        assert_eq!(doc.to_value(), before);
    }

    #[test]
    fn missing_req_id_is_rejected() {
        let mut doc = ConfigurationDocument::new(Notifier::new());
        let err = update(&mut doc, r#"{"req_info": {}}"#).unwrap_err();
        assert_eq!(err, ConfigError::MissingField("req_id".into()));
        assert_eq!(doc.res_info().detail_msg(), "req_id missing");
        assert_eq!(doc.res_info().code(), ResponseCode::InvalidArgument);
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let mut doc = ConfigurationDocument::new(Notifier::new());
        update(&mut doc, r#"{"req_info": {"req_id": "x"}, "future": [1, 2]}"#).unwrap();
        assert!(doc.to_value().get("future").is_none());
        assert_eq!(doc.res_info().res_id(), "x");
    }

    #[test]
    fn section_of_wrong_kind_is_rejected() {
        let mut doc = ConfigurationDocument::new(Notifier::new());
        let err = update(&mut doc, r#"{"common_settings": 3}"#).unwrap_err();
        assert_eq!(err.to_string(), "common_settings not of type object");
    }

    #[test]
    fn fresh_document_shape() {
        let doc = ConfigurationDocument::new(Notifier::new());
        let value = doc.to_value();
        assert_eq!(value["req_info"]["req_id"], "");
        assert_eq!(value["res_info"]["code"], 0);
        assert_eq!(value["common_settings"]["process_state"], 1);
        assert_eq!(value["common_settings"]["log_level"], 2);
        assert_eq!(value["custom_settings"], serde_json::json!({}));
    }
}
