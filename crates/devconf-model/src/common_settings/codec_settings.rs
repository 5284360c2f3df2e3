//! `common_settings.codec_settings`.

use devconf_types::{ConfigError, JsonKind};
use serde_json::{Map, Value};
use tracing::info;

use crate::node::{field_u32, number_or_null, ApplyContext, DocumentNode};
use crate::validation::{Constraint, Validation};

/// Image codec selection for the input tensor channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecSettings {
    format: Option<u32>,
}

impl CodecSettings {
    pub fn format(&self) -> Option<u32> {
        self.format
    }
}

impl DocumentNode for CodecSettings {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[Validation::new("format", Constraint::Kind(JsonKind::Number))];
        RULES
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        if let Some(format) = field_u32(candidate, "format")
            && self.format != Some(format)
        {
            info!(format, "codec format changed");
            self.format = Some(format);
            cx.notify();
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut fields = Map::new();
        if self.format.is_some() {
            fields.insert("format".to_string(), number_or_null(self.format));
        }
        Value::Object(fields)
    }
}
