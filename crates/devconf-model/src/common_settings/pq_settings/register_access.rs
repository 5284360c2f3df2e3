//! `pq_settings.register_access` – raw sensor register writes.
//!
//! The document holds an array of at most [`MAX_ENTRIES`] writes.  Every
//! Apply replaces the whole list: each entry is pushed to the sensor in
//! order, and only the accepted ones are kept.

use devconf_sensor::{RegisterAccess, RegisterBitLength, SensorProperty};
use devconf_types::{ConfigError, JsonKind};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::node::{field_str, field_u32, ApplyContext};
use crate::validation::{validate, Constraint, Validation};

pub const MAX_ENTRIES: usize = 4;

const FIELDS: [&str; 4] = ["bit_length", "id", "address", "data"];

const RULES: &[Validation] = &[
    Validation::new("bit_length", Constraint::Kind(JsonKind::Number)),
    Validation::new("bit_length", Constraint::Ge(0.0)),
    Validation::new("bit_length", Constraint::Le(3.0)),
    Validation::new("id", Constraint::Ge(0.0)),
    Validation::new("id", Constraint::Le(4_294_967_295.0)),
    Validation::new("id", Constraint::Kind(JsonKind::Number)),
    Validation::new("address", Constraint::Kind(JsonKind::String)),
    Validation::new("data", Constraint::Kind(JsonKind::String)),
];

const MISSING: &str = "Some register access property missing. Please set valid values for bit_length, id, address and data.";

const FAILURE: &str = "Register access property failed to be set. Please use valid values for bit_length, id, address and data.";

fn parse_address(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

/// Decode one verified entry.
fn decode(entry: &Map<String, Value>) -> Option<RegisterAccess> {
    let bit_length = field_u32(entry, "bit_length").and_then(RegisterBitLength::from_index)?;
    let data: u64 = field_str(entry, "data")?.parse().ok()?;
    Some(RegisterAccess {
        bit_length,
        id: field_u32(entry, "id")?,
        address: field_str(entry, "address").and_then(parse_address)?,
        data: bit_length.truncate(data),
    })
}

fn verify_entry(entry: &Value) -> Result<(), ConfigError> {
    let Value::Object(entry) = entry else {
        return Err(ConfigError::invalid(MISSING));
    };
    validate(RULES, entry)?;
    if FIELDS.iter().any(|name| !entry.contains_key(*name)) {
        return Err(ConfigError::invalid(MISSING));
    }
    if field_str(entry, "address").and_then(parse_address).is_none() {
        return Err(ConfigError::invalid("address not a hexadecimal string"));
    }
    if field_str(entry, "data").and_then(|s| s.parse::<u64>().ok()).is_none() {
        return Err(ConfigError::invalid("data not a decimal string"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterAccessList {
    entries: Vec<RegisterAccess>,
}

impl RegisterAccessList {
    /// Writes the sensor accepted on the last Apply.
    pub fn entries(&self) -> &[RegisterAccess] {
        &self.entries
    }

    pub fn verify(&self, candidate: &[Value]) -> Result<(), ConfigError> {
        if candidate.len() > MAX_ENTRIES {
            return Err(ConfigError::invalid(format!(
                "register_access array ({}) over max length ({MAX_ENTRIES}).",
                candidate.len()
            )));
        }
        for (index, entry) in candidate.iter().enumerate() {
            verify_entry(entry).inspect_err(|err| {
                debug!(index, %err, "register_access entry rejected");
            })?;
        }
        Ok(())
    }

    /// Replace the list; the last sensor rejection is the outcome.
    pub fn apply(
        &mut self,
        candidate: &[Value],
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        let mut outcome = Ok(());
        let mut accepted = Vec::with_capacity(MAX_ENTRIES);
        for (index, entry) in candidate.iter().take(MAX_ENTRIES).enumerate() {
            let Some(access) = entry.as_object().and_then(decode) else {
                outcome = Err(ConfigError::invalid(FAILURE));
                continue;
            };
            match cx.push_property(SensorProperty::RegisterAccess(access), FAILURE) {
                Ok(()) => accepted.push(access),
                Err(err) => {
                    warn!(index, %err, "register write failed");
                    outcome = Err(err);
                }
            }
        }
        if accepted != self.entries {
            debug!(count = accepted.len(), "stored");
            cx.notify();
        }
        self.entries = accepted;
        outcome
    }

    pub fn to_value(&self) -> Value {
        let entries = self
            .entries
            .iter()
            .map(|access| {
                json!({
                    "bit_length": access.bit_length.index(),
                    "id": access.id,
                    "address": format!("{:016X}", access.address),
                    "data": access.data.to_string(),
                })
            })
            .collect();
        Value::Array(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_without_data_is_missing_fields() {
        let list = RegisterAccessList::default();
        let err = list
            .verify(&[json!({ "bit_length": 0, "id": 1, "address": "10" })])
            .unwrap_err();
        assert_eq!(err.to_string(), MISSING);
    }

    #[test]
    fn bad_bit_length_hits_range_rule() {
        let list = RegisterAccessList::default();
        let err = list
            .verify(&[json!({ "bit_length": 4, "id": 1, "address": "10", "data": "1" })])
            .unwrap_err();
        assert_eq!(err.to_string(), "bit_length not <= 3.000000");
    }

    #[test]
    fn non_hex_address_is_rejected() {
        let list = RegisterAccessList::default();
        let err = list
            .verify(&[json!({ "bit_length": 0, "id": 1, "address": "zz", "data": "1" })])
            .unwrap_err();
        assert_eq!(err.to_string(), "address not a hexadecimal string");
    }

    #[test]
    fn decode_truncates_to_width() {
        let entry = json!({ "bit_length": 0, "id": 7, "address": "0x1F", "data": "511" });
        let access = decode(entry.as_object().unwrap()).unwrap();
        assert_eq!(access.address, 0x1F);
        assert_eq!(access.data, 0xFF);
        assert_eq!(access.id, 7);
    }
}
