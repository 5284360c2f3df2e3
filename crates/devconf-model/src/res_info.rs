//! `res_info` – the response echoed back for every request.

use devconf_types::{ConfigError, ResInfoRecord, ResponseCode};
use serde_json::{json, Map, Value};

use crate::node::{ApplyContext, DocumentNode};
use crate::notifier::Notifier;

/// Response section: `{ "res_id": string, "code": u32, "detail_msg": string }`.
///
/// Every setter raises the shared pending-notification flag, including when
/// the new value equals the old one.  [`ResInfo::reset`] does not.
#[derive(Debug, Clone)]
pub struct ResInfo {
    res_id: String,
    code: ResponseCode,
    detail_msg: String,
    notifier: Notifier,
}

impl ResInfo {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            res_id: String::new(),
            code: ResponseCode::Ok,
            detail_msg: String::new(),
            notifier,
        }
    }

    pub fn res_id(&self) -> &str {
        &self.res_id
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn detail_msg(&self) -> &str {
        &self.detail_msg
    }

    pub fn set_res_id(&mut self, res_id: impl Into<String>) {
        self.res_id = res_id.into();
        self.notifier.enable();
    }

    pub fn set_code(&mut self, code: ResponseCode) {
        self.code = code;
        self.notifier.enable();
    }

    pub fn set_detail_msg(&mut self, detail_msg: impl Into<String>) {
        self.detail_msg = detail_msg.into();
        self.notifier.enable();
    }

    /// Write `err` as this response's verdict.
    pub fn record_error(&mut self, err: &ConfigError) {
        self.set_detail_msg(err.to_string());
        self.set_code(err.code());
    }

    /// Restore code 0, empty id and empty message.
    pub fn reset(&mut self) {
        self.res_id.clear();
        self.code = ResponseCode::Ok;
        self.detail_msg.clear();
    }

    pub fn record(&self) -> ResInfoRecord {
        ResInfoRecord {
            res_id: self.res_id.clone(),
            code: self.code.as_u32(),
            detail_msg: self.detail_msg.clone(),
        }
    }
}

impl DocumentNode for ResInfo {
    /// Inbound `res_info` is informational only.
    fn apply(
        &mut self,
        _candidate: &Map<String, Value>,
        _cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        Ok(())
    }

    fn to_value(&self) -> Value {
        json!({
            "res_id": self.res_id,
            "code": self.code.as_u32(),
            "detail_msg": self.detail_msg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_setter_raises_the_flag() {
        let notifier = Notifier::new();
        let mut info = ResInfo::new(notifier.clone());

        info.set_code(ResponseCode::Ok);
        assert!(notifier.is_pending());
        notifier.clear();

        info.set_detail_msg("");
        assert!(notifier.is_pending());
        notifier.clear();

        info.set_res_id("");
        assert!(notifier.is_pending());
    }

    #[test]
    fn reset_restores_defaults_without_notifying() {
        let notifier = Notifier::new();
        let mut info = ResInfo::new(notifier.clone());
        info.record_error(&ConfigError::invalid("bad"));
        info.set_res_id("7");
        notifier.clear();

        info.reset();
        assert_eq!(info.code(), ResponseCode::Ok);
        assert_eq!(info.res_id(), "");
        assert_eq!(info.detail_msg(), "");
        assert!(!notifier.is_pending());
    }

    #[test]
    fn serializes_wire_shape() {
        let mut info = ResInfo::new(Notifier::new());
        info.set_res_id("r");
        info.set_code(ResponseCode::FailedPrecondition);
        assert_eq!(
            info.to_value(),
            json!({"res_id": "r", "code": 9, "detail_msg": ""})
        );
        assert_eq!(info.record().code, 9);
    }
}
