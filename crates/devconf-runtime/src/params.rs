//! Parameters shared between the control path and the analysis path.
//!
//! [`ParamCell`] guards one value with a single mutex.  The writer holds the
//! lock only while copying a new value in; readers only while copying a
//! snapshot out.  Analysis runs on the snapshot, never under the lock.

use std::sync::Arc;

use devconf_model::ConfigureHandler;
use devconf_types::{ConfigError, ResInfoRecord, ResponseCode, ResponseEnvelope};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

/// Mutex-guarded parameter value, copied in and out by value.
#[derive(Debug, Default)]
pub struct ParamCell<T> {
    inner: Mutex<T>,
}

impl<T: Clone> ParamCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn store(&self, value: T) {
        *self.inner.lock() = value;
    }

    /// A copy of the current value.
    pub fn snapshot(&self) -> T {
        self.inner.lock().clone()
    }

    /// Run `f` on the value while holding the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

/// Reads one field group out of a model's `parameters` object.
pub type Extractor<T> = Box<dyn Fn(&Map<String, Value>, &mut T) -> Result<(), String> + Send>;

/// [`ConfigureHandler`] that fills a [`ParamCell`] from custom settings.
///
/// Parameters are read from `ai_models.<model>.parameters`.  Registered
/// extractors run in order on a snapshot of the current value, outside the
/// cell's lock; the snapshot is stored back only if every extractor
/// succeeds.
pub struct ParameterExtractor<T> {
    model: String,
    cell: Arc<ParamCell<T>>,
    extractors: Vec<(&'static str, Extractor<T>)>,
    last_error: Option<ResponseEnvelope>,
}

impl<T: Clone + Send> ParameterExtractor<T> {
    pub fn new(model: impl Into<String>, cell: Arc<ParamCell<T>>) -> Self {
        Self {
            model: model.into(),
            cell,
            extractors: Vec::new(),
            last_error: None,
        }
    }

    /// Register `extractor` under `name` (used in log output).
    pub fn with_extractor(
        mut self,
        name: &'static str,
        extractor: impl Fn(&Map<String, Value>, &mut T) -> Result<(), String> + Send + 'static,
    ) -> Self {
        self.extractors.push((name, Box::new(extractor)));
        self
    }

    /// The error response produced by the last rejected configuration.
    pub fn last_error(&self) -> Option<&ResponseEnvelope> {
        self.last_error.as_ref()
    }

    /// The last error response as JSON text.
    pub fn error_json(&self) -> Option<String> {
        self.last_error
            .as_ref()
            .and_then(|envelope| serde_json::to_string(envelope).ok())
    }

    fn reject(&mut self, res_id: &str, message: &str) -> ConfigError {
        let envelope = ResponseEnvelope {
            res_info: ResInfoRecord {
                res_id: res_id.to_string(),
                code: ResponseCode::InvalidArgument.as_u32(),
                detail_msg: message.to_string(),
            },
        };
        error!(
            error_json = %serde_json::to_string(&envelope).unwrap_or_default(),
            "configure rejected"
        );
        self.last_error = Some(envelope);
        ConfigError::Configure {
            code: ResponseCode::InvalidArgument,
            message: message.to_string(),
        }
    }

    fn run_extractors(&self, parameters: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.cell.snapshot();
        for (name, extractor) in &self.extractors {
            extractor(parameters, &mut next).map_err(|e| {
                debug!(extractor = *name, %e, "extractor failed");
                e
            })?;
        }
        self.cell.store(next);
        Ok(())
    }
}

impl<T: Clone + Send> ConfigureHandler for ParameterExtractor<T> {
    fn on_configure(&mut self, topic: &str, settings: &str) -> Result<(), ConfigError> {
        let settings: Value = match serde_json::from_str(settings) {
            Ok(value) => value,
            Err(e) => {
                debug!(%e, "custom settings parse failed");
                return Err(self.reject("", "Error parsing custom settings JSON"));
            }
        };
        let res_id = settings
            .pointer("/res_info/res_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let pointer = format!("/ai_models/{}/parameters", self.model);
        let Some(parameters) = settings.pointer(&pointer).and_then(Value::as_object) else {
            return Err(self.reject(
                &res_id,
                "Error accessing AI model parameters in JSON object",
            ));
        };

        if let Err(message) = self.run_extractors(parameters) {
            return Err(self.reject(&res_id, &message));
        }
        self.last_error = None;
        info!(topic, model = %self.model, "parameters updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Thresholds {
        max_detections: u32,
        threshold: f64,
    }

    fn extractor(cell: Arc<ParamCell<Thresholds>>) -> ParameterExtractor<Thresholds> {
        ParameterExtractor::new("detection", cell)
            .with_extractor("max_detections", |params, out| {
                let value = params
                    .get("max_detections")
                    .and_then(Value::as_u64)
                    .ok_or("max_detections missing")?;
                out.max_detections = value as u32;
                Ok(())
            })
            .with_extractor("threshold", |params, out| {
                let value = params
                    .get("threshold")
                    .and_then(Value::as_f64)
                    .ok_or("threshold missing")?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(format!("threshold {value} out of range"));
                }
                out.threshold = value;
                Ok(())
            })
    }

    fn settings(params: Value) -> String {
        json!({
            "ai_models": {"detection": {"parameters": params}},
            "res_info": {"res_id": "7", "code": 0, "detail_msg": ""}
        })
        .to_string()
    }

    #[test]
    fn extractors_run_without_holding_the_lock() {
        let cell = Arc::new(ParamCell::new(Thresholds::default()));
        let watched = Arc::clone(&cell);
        let mut handler = extractor(Arc::clone(&cell)).with_extractor("lock", move |_, _| {
            if watched.inner.try_lock().is_none() {
                return Err("parameter cell locked during extraction".to_string());
            }
            Ok(())
        });

        handler
            .on_configure(
                "custom_settings",
                &settings(json!({"max_detections": 3, "threshold": 0.5})),
            )
            .unwrap();
        assert_eq!(cell.snapshot().max_detections, 3);
    }

    #[test]
    fn cell_snapshot_is_a_copy() {
        let cell = ParamCell::new(vec![1, 2]);
        let mut snap = cell.snapshot();
        snap.push(3);
        assert_eq!(cell.snapshot(), vec![1, 2]);
        cell.store(vec![9]);
        assert_eq!(cell.snapshot(), vec![9]);
    }

    #[test]
    fn parameters_are_extracted() {
        let cell = Arc::new(ParamCell::new(Thresholds::default()));
        let mut handler = extractor(Arc::clone(&cell));
        handler
            .on_configure(
                "custom_settings",
                &settings(json!({"max_detections": 5, "threshold": 0.3})),
            )
            .unwrap();
        assert_eq!(
            cell.snapshot(),
            Thresholds {
                max_detections: 5,
                threshold: 0.3
            }
        );
        assert!(handler.last_error().is_none());
    }

    #[test]
    fn failing_extractor_keeps_previous_value() {
        let initial = Thresholds {
            max_detections: 2,
            threshold: 0.5,
        };
        let cell = Arc::new(ParamCell::new(initial.clone()));
        let mut handler = extractor(Arc::clone(&cell));

        let err = handler
            .on_configure(
                "custom_settings",
                &settings(json!({"max_detections": 9, "threshold": 3.0})),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "threshold 3 out of range");
        assert_eq!(cell.snapshot(), initial);

        let error: Value = serde_json::from_str(&handler.error_json().unwrap()).unwrap();
        assert_eq!(
            error,
            json!({"res_info": {"res_id": "7", "code": 3, "detail_msg": "threshold 3 out of range"}})
        );
    }

    #[test]
    fn missing_model_is_reported() {
        let cell = Arc::new(ParamCell::new(Thresholds::default()));
        let mut handler = extractor(cell);
        let err = handler
            .on_configure("custom_settings", r#"{"ai_models": {}}"#)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error accessing AI model parameters in JSON object"
        );

        let err = handler.on_configure("custom_settings", "{").unwrap_err();
        assert_eq!(err.to_string(), "Error parsing custom settings JSON");
        assert_eq!(handler.last_error().unwrap().res_info.res_id, "");
    }
}
