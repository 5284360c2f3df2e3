//! `common_settings.inference_settings`.

use devconf_types::{ConfigError, JsonKind};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::node::{field_u32, ApplyContext, DocumentNode};
use crate::validation::{Constraint, Validation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceSettings {
    number_of_iterations: u32,
}

impl InferenceSettings {
    pub fn number_of_iterations(&self) -> u32 {
        self.number_of_iterations
    }
}

impl DocumentNode for InferenceSettings {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[
            Validation::new("number_of_iterations", Constraint::Kind(JsonKind::Number)),
            Validation::new("number_of_iterations", Constraint::Ge(0.0)),
        ];
        RULES
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        if let Some(iterations) = field_u32(candidate, "number_of_iterations")
            && iterations != self.number_of_iterations
        {
            info!(iterations, "number of iterations changed");
            self.number_of_iterations = iterations;
            cx.notify();
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        json!({ "number_of_iterations": self.number_of_iterations })
    }
}
