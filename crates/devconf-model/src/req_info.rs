//! `req_info` – the request's correlation id.

use devconf_types::{ConfigError, JsonKind};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::node::{field_str, ApplyContext, DocumentNode};
use crate::validation::{Constraint, Validation};

pub const REQ_ID: &str = "req_id";

/// Request section: `{ "req_id": string }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReqInfo {
    req_id: String,
}

impl ReqInfo {
    pub fn req_id(&self) -> &str {
        &self.req_id
    }

    /// Take the correlation id from `candidate`.
    ///
    /// A candidate without a string `req_id` leaves the previous id in place.
    pub fn apply_request(&mut self, candidate: &Map<String, Value>) {
        if let Some(id) = field_str(candidate, REQ_ID) {
            debug!(req_id = id, "request id");
            self.req_id = id.to_string();
        }
    }
}

impl DocumentNode for ReqInfo {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[Validation::new(REQ_ID, Constraint::Kind(JsonKind::String))];
        RULES
    }

    fn verify(&self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        if !candidate.contains_key(REQ_ID) {
            return Err(ConfigError::MissingField(REQ_ID.to_string()));
        }
        crate::validation::validate(self.validations(), candidate)
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        _cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        self.apply_request(candidate);
        Ok(())
    }

    fn to_value(&self) -> Value {
        json!({ REQ_ID: self.req_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(ReqInfo::default().to_value(), json!({"req_id": ""}));
    }

    #[test]
    fn apply_request_takes_id() {
        let mut info = ReqInfo::default();
        info.apply_request(&object(json!({"req_id": "abc"})));
        assert_eq!(info.req_id(), "abc");

        info.apply_request(&object(json!({})));
        assert_eq!(info.req_id(), "abc");
    }

    #[test]
    fn verify_requires_string_id() {
        let info = ReqInfo::default();
        assert_eq!(
            info.verify(&object(json!({}))).unwrap_err().to_string(),
            "req_id missing"
        );
        assert_eq!(
            info.verify(&object(json!({"req_id": 4}))).unwrap_err().to_string(),
            "req_id not of type string"
        );
        assert!(info.verify(&object(json!({"req_id": "1"}))).is_ok());
    }
}
