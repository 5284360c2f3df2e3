//! `common_settings` – vendor-defined knobs shared by every application.
//!
//! # Sections
//!
//! - [`inference_settings`] – iteration count of the inference loop.
//! - [`pq_settings`] – picture-quality properties pushed to the sensor.
//! - [`port_settings`] – metadata / input tensor output routing.
//! - [`codec_settings`] – input tensor encoding.
//!
//! `process_state` and `log_level` are not acted on here; a change is
//! recorded in [`LifecycleRequests`][crate::LifecycleRequests] for the
//! lifecycle layer.  While the device is running, changes to the stream
//! sections are refused with `FAILED_PRECONDITION` and the rest of the
//! section is still applied.

pub mod codec_settings;
pub mod inference_settings;
pub mod port_settings;
pub mod pq_settings;

use devconf_sensor::SensorStream;
use devconf_types::{ConfigError, JsonKind, LogLevel, ProcessState, ResponseCode};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::node::{
    apply_children, compose, field_u32, ApplyContext, Child, ChildMut, DocumentNode,
};
use crate::validation::{Constraint, Validation};

pub use codec_settings::CodecSettings;
pub use inference_settings::InferenceSettings;
pub use port_settings::{PortSetting, PortSettings};
pub use pq_settings::PqSettings;

pub const PROCESS_STATE: &str = "process_state";
pub const LOG_LEVEL: &str = "log_level";
pub const INFERENCE_PER_MESSAGE: &str = "number_of_inference_per_message";
pub const INFERENCE_SETTINGS: &str = "inference_settings";
pub const PQ_SETTINGS: &str = "pq_settings";
pub const PORT_SETTINGS: &str = "port_settings";
pub const CODEC_SETTINGS: &str = "codec_settings";

/// Detail message set when stream changes arrive while running.
pub const RUNNING_REFUSAL: &str = "Ignoring Port Settings and Pq Settings since state is Running.";

#[derive(Debug, Clone, PartialEq)]
pub struct CommonSettings {
    process_state: u32,
    log_level: u32,
    number_of_inference_per_message: Option<u32>,
    inference_settings: InferenceSettings,
    pq_settings: PqSettings,
    port_settings: PortSettings,
    codec_settings: CodecSettings,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            process_state: ProcessState::Idle.as_u32(),
            log_level: LogLevel::default().as_u32(),
            number_of_inference_per_message: None,
            inference_settings: InferenceSettings::default(),
            pq_settings: PqSettings::default(),
            port_settings: PortSettings::default(),
            codec_settings: CodecSettings::default(),
        }
    }
}

impl CommonSettings {
    pub fn process_state(&self) -> u32 {
        self.process_state
    }

    /// Mirror the lifecycle's state; only idle and running are reported.
    pub fn set_process_state(&mut self, state: ProcessState) {
        if matches!(state, ProcessState::Idle | ProcessState::Running) {
            self.process_state = state.as_u32();
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u32(self.log_level)
    }

    pub fn number_of_inference_per_message(&self) -> Option<u32> {
        self.number_of_inference_per_message
    }

    pub fn inference_settings(&self) -> &InferenceSettings {
        &self.inference_settings
    }

    pub fn pq_settings(&self) -> &PqSettings {
        &self.pq_settings
    }

    pub fn port_settings(&self) -> &PortSettings {
        &self.port_settings
    }

    pub fn codec_settings(&self) -> &CodecSettings {
        &self.codec_settings
    }

    pub fn initialize(&mut self, sensor: &dyn SensorStream) {
        self.pq_settings.initialize(sensor);
    }

    /// Whether `candidate` would change anything the running stream owns.
    fn changes_stream(&self, candidate: &Map<String, Value>) -> bool {
        let sections: [(&str, &dyn DocumentNode); 3] = [
            (PQ_SETTINGS, &self.pq_settings),
            (PORT_SETTINGS, &self.port_settings),
            (CODEC_SETTINGS, &self.codec_settings),
        ];
        let section_changed = sections.iter().any(|(name, node)| {
            candidate
                .get(*name)
                .is_some_and(|value| *value != node.to_value())
        });
        let inference_changed = field_u32(candidate, INFERENCE_PER_MESSAGE)
            .is_some_and(|n| Some(n) != self.number_of_inference_per_message);
        section_changed || inference_changed
    }
}

impl DocumentNode for CommonSettings {
    fn validations(&self) -> &'static [Validation] {
        const RULES: &[Validation] = &[
            Validation::new(PROCESS_STATE, Constraint::Kind(JsonKind::Number)),
            Validation::new(PROCESS_STATE, Constraint::Ge(1.0)),
            Validation::new(PROCESS_STATE, Constraint::Le(2.0)),
            Validation::new(LOG_LEVEL, Constraint::Kind(JsonKind::Number)),
            Validation::new(LOG_LEVEL, Constraint::Ge(0.0)),
            Validation::new(LOG_LEVEL, Constraint::Le(5.0)),
            Validation::new(INFERENCE_PER_MESSAGE, Constraint::Kind(JsonKind::Number)),
            Validation::new(INFERENCE_PER_MESSAGE, Constraint::Ge(0.0)),
            Validation::new(INFERENCE_SETTINGS, Constraint::Kind(JsonKind::Object)),
            Validation::new(PQ_SETTINGS, Constraint::Kind(JsonKind::Object)),
            Validation::new(PORT_SETTINGS, Constraint::Kind(JsonKind::Object)),
            Validation::new(CODEC_SETTINGS, Constraint::Kind(JsonKind::Object)),
        ];
        RULES
    }

    fn children(&self) -> Vec<Child<'_>> {
        vec![
            (INFERENCE_SETTINGS, &self.inference_settings),
            (PQ_SETTINGS, &self.pq_settings),
            (PORT_SETTINGS, &self.port_settings),
            (CODEC_SETTINGS, &self.codec_settings),
        ]
    }

    fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        vec![
            (INFERENCE_SETTINGS, &mut self.inference_settings),
            (PQ_SETTINGS, &mut self.pq_settings),
            (PORT_SETTINGS, &mut self.port_settings),
            (CODEC_SETTINGS, &mut self.codec_settings),
        ]
    }

    fn apply(
        &mut self,
        candidate: &Map<String, Value>,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ConfigError> {
        if let Some(state) = field_u32(candidate, PROCESS_STATE) {
            let requested = ProcessState::from_document(state);
            info!(%requested, "process state requested");
            cx.requests.process_state = Some(requested);
        }

        if let Some(level) = field_u32(candidate, LOG_LEVEL)
            && level != self.log_level
        {
            info!(level, "log level changed");
            self.log_level = level;
            cx.requests.log_level = Some(LogLevel::from_u32(level));
            cx.notify();
        }

        let mut candidate = candidate.clone();
        if cx.process_state == ProcessState::Running {
            if self.changes_stream(&candidate) {
                warn!("{}", RUNNING_REFUSAL);
                cx.res_info.set_detail_msg(RUNNING_REFUSAL);
                cx.res_info.set_code(ResponseCode::FailedPrecondition);
            }
            for name in [PQ_SETTINGS, PORT_SETTINGS, CODEC_SETTINGS, INFERENCE_PER_MESSAGE] {
                candidate.remove(name);
            }
        }

        if let Some(n) = field_u32(&candidate, INFERENCE_PER_MESSAGE)
            && Some(n) != self.number_of_inference_per_message
        {
            info!(n, "inferences per message changed");
            self.number_of_inference_per_message = Some(n);
            cx.notify();
        }

        apply_children(&mut self.children_mut(), &candidate, cx)
    }

    fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert(PROCESS_STATE.into(), json!(self.process_state));
        fields.insert(LOG_LEVEL.into(), json!(self.log_level));
        if let Some(n) = self.number_of_inference_per_message {
            fields.insert(INFERENCE_PER_MESSAGE.into(), json!(n));
        }
        compose(fields, &self.children())
    }
}
