//! Generic node for structured picture-quality properties.
//!
//! A [`PqObject`] remembers the last value the sensor accepted.  A partial
//! candidate is merged over that value, the merged property is pushed to the
//! sensor, and it is stored only if the sensor accepts it.  Until a value is
//! known the node serializes as `{}`.

use devconf_sensor::{PropertyKey, SensorProperty, SensorStream};
use devconf_types::ConfigError;
use serde_json::{Map, Value};
use tracing::debug;

use crate::node::{ApplyContext, DocumentNode};
use crate::validation::{validate, Validation};

/// A sensor property value that maps onto one document object.
pub trait PqValue: Copy + Default + PartialEq + std::fmt::Debug {
    const KEY: PropertyKey;
    /// `detail_msg` written when the sensor rejects the value.
    const FAILURE: &'static str;
    const RULES: &'static [Validation];

    /// Overlay the fields present in `candidate`.
    fn merge(&mut self, candidate: &Map<String, Value>);

    fn to_json(&self) -> Value;

    fn into_property(self) -> SensorProperty;

    fn from_property(property: SensorProperty) -> Option<Self>;

    /// Checks on the raw candidate beyond [`PqValue::RULES`].
    fn check_candidate(_candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Cross-field checks on the merged value.
    fn check_merged(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PqObject<P> {
    current: Option<P>,
}

impl<P: PqValue> PqObject<P> {
    pub fn current(&self) -> Option<P> {
        self.current
    }

    /// Read the sensor's value without notifying.
    pub fn initialize(&mut self, sensor: &dyn SensorStream) {
        self.current = sensor.get_property(P::KEY).and_then(P::from_property);
    }

    fn merged(&self, candidate: &Map<String, Value>) -> P {
        let mut value = self.current.unwrap_or_default();
        value.merge(candidate);
        value
    }
}

impl<P: PqValue> DocumentNode for PqObject<P> {
    fn validations(&self) -> &'static [Validation] {
        P::RULES
    }

    fn verify(&self, candidate: &Map<String, Value>) -> Result<(), ConfigError> {
        validate(P::RULES, candidate)?;
        P::check_candidate(candidate)?;
        self.merged(candidate).check_merged()
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        let value = self.merged(candidate);
        cx.push_property(value.into_property(), P::FAILURE)?;
        if self.current != Some(value) {
            debug!(key = ?P::KEY, ?value, "stored");
            self.current = Some(value);
            cx.notify();
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        self.current
            .map_or_else(|| Value::Object(Map::new()), |value| value.to_json())
    }
}
