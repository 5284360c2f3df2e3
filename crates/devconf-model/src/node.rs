//! The [`DocumentNode`] trait and the [`ApplyContext`] threaded through Apply.
//!
//! A node owns its own typed values.  A composite node additionally exposes
//! its registered children through [`DocumentNode::children`] and
//! [`DocumentNode::children_mut`]; that registration is the only link
//! between parent and child.  The document value of a composite is built
//! from its own fields plus the values of its children, so the tree read
//! back by [`DocumentNode::to_value`] always reflects the children's state.
//!
//! Verify never mutates.  Apply is only invoked on a candidate that passed
//! Verify and may report a failure after committing part of the candidate.

use devconf_sensor::{SensorProperty, SensorStream};
use devconf_types::{ConfigError, LogLevel, ProcessState};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::custom_settings::ConfigureHandler;
use crate::notifier::Notifier;
use crate::res_info::ResInfo;
use crate::validation::{validate, Validation};

/// Child registration: `(name in the parent object, child node)`.
pub type Child<'a> = (&'static str, &'a dyn DocumentNode);
/// Mutable child registration used during Apply.
pub type ChildMut<'a> = (&'static str, &'a mut dyn DocumentNode);

// ────────────────────────────────────────────────────────────────────────────
// DocumentNode
// ────────────────────────────────────────────────────────────────────────────

/// A unit of the configuration property tree.
pub trait DocumentNode {
    /// Field rules checked by the default [`DocumentNode::verify`].
    fn validations(&self) -> &'static [Validation] {
        &[]
    }

    /// Registered children, in registration order.
    fn children(&self) -> Vec<Child<'_>> {
        Vec::new()
    }

    fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        Vec::new()
    }

    /// Check `candidate` without mutating anything.
    ///
    /// The default recurses into every registered child whose candidate value
    /// is an object, then runs [`DocumentNode::validations`].
    fn verify(&self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        verify_object(self.validations(), &self.children(), candidate)
    }

    /// Commit a verified `candidate`.
    ///
    /// The default applies every registered child present in the candidate.
    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        apply_children(&mut self.children_mut(), candidate, cx)
    }

    /// Current document value of this node.
    fn to_value(&self) -> Value;
}

/// Verify `candidate` against `children` and then `validations`.
///
/// Keys are visited in candidate order; the first failure wins.
pub fn verify_object(
    validations: &[Validation],
    children: &[Child<'_>],
    candidate: &Map<String, Value>,
) -> Result<(), ConfigError> {
    for (name, value) in candidate {
        if let Value::Object(fragment) = value {
            let matching = children
                .iter()
                .filter(|(child_name, _)| *child_name == name.as_str());
            for (_, child) in matching {
                child.verify(fragment)?;
            }
        }
    }
    validate(validations, candidate)
}

/// Apply every child of `children` that has an object in `candidate`.
///
/// A failing child does not stop its siblings; the last failure is returned.
pub fn apply_children(
    children: &mut [ChildMut<'_>],
    candidate: &Map<String, Value>,
    cx: &mut ApplyContext<'_>,
) -> Result<(), ConfigError> {
    let mut outcome = Ok(());
    for (name, child) in children.iter_mut() {
        let Some(Value::Object(fragment)) = candidate.get(*name) else {
            continue;
        };
        debug!(section = *name, "applying");
        if let Err(err) = child.apply(fragment, cx) {
            warn!(section = *name, %err, "apply failed");
            outcome = Err(err);
        }
    }
    outcome
}

/// Build a composite value: `fields` followed by every child's value.
pub fn compose(mut fields: Map<String, Value>, children: &[Child<'_>]) -> Value {
    for (name, child) in children {
        fields.insert((*name).to_string(), child.to_value());
    }
    Value::Object(fields)
}

// ────────────────────────────────────────────────────────────────────────────
// Apply context
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle changes requested by an applied document.
///
/// The model records them; acting on them belongs to the lifecycle layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleRequests {
    pub process_state: Option<ProcessState>,
    pub log_level: Option<LogLevel>,
}

/// Collaborators and request-scoped state available to every Apply.
pub struct ApplyContext<'a> {
    pub res_info: &'a mut ResInfo,
    pub sensor: &'a mut dyn SensorStream,
    pub configure: &'a mut dyn ConfigureHandler,
    pub notifier: &'a Notifier,
    /// Process state at the time the request arrived.
    pub process_state: ProcessState,
    /// Correlation id of the request being applied.
    pub req_id: &'a str,
    pub requests: &'a mut LifecycleRequests,
}

impl ApplyContext<'_> {
    /// Push `property` to the sensor, mapping a rejection to
    /// [`ConfigError::Sensor`] carrying `message`.
    pub fn push_property(
        &mut self,
        property: SensorProperty,
        message: &str,
    ) -> Result<(), ConfigError> {
        self.sensor.set_property(&property).map_err(|err| {
            error!(key = ?property.key(), %err, "sensor rejected property");
            ConfigError::Sensor {
                code: err.code(),
                message: message.to_string(),
            }
        })
    }

    pub fn notify(&self) {
        self.notifier.enable();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field access
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn field_f64(candidate: &Map<String, Value>, name: &str) -> Option<f64> {
    candidate.get(name).and_then(Value::as_f64)
}

/// Numeric field as `u32`; verified candidates never carry negatives.
pub(crate) fn field_u32(candidate: &Map<String, Value>, name: &str) -> Option<u32> {
    field_f64(candidate, name).map(|v| v as u32)
}

pub(crate) fn field_str<'c>(candidate: &'c Map<String, Value>, name: &str) -> Option<&'c str> {
    candidate.get(name).and_then(Value::as_str)
}

pub(crate) fn field_bool(candidate: &Map<String, Value>, name: &str) -> Option<bool> {
    candidate.get(name).and_then(Value::as_bool)
}

/// `Some(v)` as a JSON number, `None` as `null`.
pub(crate) fn number_or_null<T: Into<serde_json::Number>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, |v| Value::Number(v.into()))
}

/// A float as a JSON number; non-finite values become `null`.
pub(crate) fn float_value(value: f32) -> Value {
    serde_json::Number::from_f64(f64::from(value)).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Constraint;
    use serde_json::json;

    struct Leaf {
        value: u32,
    }

    impl DocumentNode for Leaf {
        fn validations(&self) -> &'static [Validation] {
            const RULES: &[Validation] = &[Validation::new("value", Constraint::Ge(0.0))];
            RULES
        }

        fn to_value(&self) -> Value {
            json!({ "value": self.value })
        }
    }

    struct Pair {
        left: Leaf,
        right: Leaf,
    }

    impl DocumentNode for Pair {
        fn children(&self) -> Vec<Child<'_>> {
            vec![("left", &self.left), ("right", &self.right)]
        }

        fn to_value(&self) -> Value {
            compose(Map::new(), &self.children())
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn composite_value_reflects_children() {
        let mut pair = Pair {
            left: Leaf { value: 1 },
            right: Leaf { value: 2 },
        };
        assert_eq!(
            pair.to_value(),
            json!({"left": {"value": 1}, "right": {"value": 2}})
        );
        pair.right.value = 7;
        assert_eq!(pair.to_value()["right"]["value"], 7);
    }

    #[test]
    fn verify_recurses_into_children() {
        let pair = Pair {
            left: Leaf { value: 1 },
            right: Leaf { value: 2 },
        };
        assert!(pair.verify(&object(json!({"left": {"value": 3}}))).is_ok());
        let err = pair
            .verify(&object(json!({"right": {"value": -3}})))
            .unwrap_err();
        assert_eq!(err.to_string(), "value not >= 0.000000");
    }

    #[test]
    fn verify_skips_non_object_child_values() {
        let pair = Pair {
            left: Leaf { value: 1 },
            right: Leaf { value: 2 },
        };
        assert!(pair.verify(&object(json!({"left": 5}))).is_ok());
    }

    #[test]
    fn numeric_helpers() {
        let candidate = object(json!({"n": 4, "s": "x", "b": true}));
        assert_eq!(field_u32(&candidate, "n"), Some(4));
        assert_eq!(field_str(&candidate, "s"), Some("x"));
        assert_eq!(field_bool(&candidate, "b"), Some(true));
        assert_eq!(field_f64(&candidate, "s"), None);
        assert_eq!(number_or_null::<u32>(None), Value::Null);
        assert_eq!(number_or_null(Some(3u32)), json!(3));
    }
}
