//! Field validation rules evaluated during Verify.
//!
//! Every node may carry a static table of [`Validation`]s.  For each key of
//! a candidate object, the rules registered for that key are evaluated in
//! table order; the first violation rejects the candidate with an
//! `INVALID_ARGUMENT` [`ConfigError`].
//!
//! Numeric constraints only look at numeric values.  A value of another kind
//! is left to the [`Constraint::Kind`] rule for the same property, if any.

use devconf_types::{ConfigError, JsonKind};
use serde_json::{Map, Value};

// ────────────────────────────────────────────────────────────────────────────
// Constraint
// ────────────────────────────────────────────────────────────────────────────

/// A single condition a field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    Ne(f64),
    /// The value must be of this JSON kind.
    Kind(JsonKind),
}

impl Constraint {
    fn operator(&self) -> &'static str {
        match self {
            Constraint::Gt(_) => ">",
            Constraint::Ge(_) => ">=",
            Constraint::Lt(_) => "<",
            Constraint::Le(_) => "<=",
            Constraint::Ne(_) => "!=",
            Constraint::Kind(_) => "of type",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Binds a [`Constraint`] to a property name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validation {
    pub property: &'static str,
    pub constraint: Constraint,
}

impl Validation {
    pub const fn new(property: &'static str, constraint: Constraint) -> Self {
        Self {
            property,
            constraint,
        }
    }

    /// Check `value` (the candidate's value for [`Validation::property`]).
    pub fn check(&self, value: &Value) -> Result<(), ConfigError> {
        let name = self.property;
        match self.constraint {
            Constraint::Kind(kind) => {
                if JsonKind::of(value) != kind {
                    return Err(ConfigError::invalid(format!("{name} not of type {kind}")));
                }
            }
            bound => {
                let Some(number) = value.as_f64() else {
                    return Ok(());
                };
                let violated = match bound {
                    Constraint::Gt(limit) => number <= limit,
                    Constraint::Ge(limit) => number < limit,
                    Constraint::Lt(limit) => number >= limit,
                    Constraint::Le(limit) => number > limit,
                    Constraint::Ne(limit) => number == limit,
                    Constraint::Kind(_) => false,
                };
                if violated {
                    let limit = match bound {
                        Constraint::Gt(v)
                        | Constraint::Ge(v)
                        | Constraint::Lt(v)
                        | Constraint::Le(v)
                        | Constraint::Ne(v) => v,
                        Constraint::Kind(_) => 0.0,
                    };
                    tracing::debug!(property = name, value = number, "validation failed");
                    return Err(ConfigError::invalid(format!(
                        "{name} not {} {limit:.6}",
                        bound.operator()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Run every rule in `rules` against the keys of `candidate`.
///
/// Keys are visited in the candidate's order; for each key the matching rules
/// run in table order.  Keys without rules are accepted as-is.
pub fn validate(rules: &[Validation], candidate: &Map<String, Value>) -> Result<(), ConfigError> {
    for (name, value) in candidate {
        for rule in rules.iter().filter(|rule| rule.property == name.as_str()) {
            rule.check(value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    const RULES: &[Validation] = &[
        Validation::new("width", Constraint::Ge(0.0)),
        Validation::new("width", Constraint::Kind(JsonKind::Number)),
        Validation::new("policy", Constraint::Ge(1.0)),
        Validation::new("policy", Constraint::Le(2.0)),
        Validation::new("mode", Constraint::Ne(1.0)),
        Validation::new("name", Constraint::Kind(JsonKind::String)),
    ];

    #[test]
    fn accepts_values_in_domain() {
        let candidate = object(json!({"width": 640, "policy": 2, "mode": 0, "name": "x"}));
        assert!(validate(RULES, &candidate).is_ok());
    }

    #[test]
    fn negative_value_violates_ge() {
        let candidate = object(json!({"width": -1}));
        let err = validate(RULES, &candidate).unwrap_err();
        assert_eq!(err.to_string(), "width not >= 0.000000");
        assert_eq!(err.code(), devconf_types::ResponseCode::InvalidArgument);
    }

    #[test]
    fn upper_bound_and_not_equal() {
        let err = validate(RULES, &object(json!({"policy": 3}))).unwrap_err();
        assert_eq!(err.to_string(), "policy not <= 2.000000");

        let err = validate(RULES, &object(json!({"mode": 1}))).unwrap_err();
        assert_eq!(err.to_string(), "mode not != 1.000000");
    }

    #[test]
    fn wrong_kind_is_reported() {
        let err = validate(RULES, &object(json!({"width": "wide"}))).unwrap_err();
        assert_eq!(err.to_string(), "width not of type number");

        let err = validate(RULES, &object(json!({"name": 5}))).unwrap_err();
        assert_eq!(err.to_string(), "name not of type string");
    }

    #[test]
    fn numeric_rule_ignores_non_numbers() {
        let rule = Validation::new("policy", Constraint::Ge(1.0));
        assert!(rule.check(&json!("one")).is_ok());
    }

    #[test]
    fn unknown_keys_pass() {
        assert!(validate(RULES, &object(json!({"other": -5}))).is_ok());
    }
}
