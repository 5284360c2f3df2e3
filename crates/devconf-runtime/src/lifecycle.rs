//! The device lifecycle driving a [`DeviceContext`].
//!
//! Inbound configuration text is queued by [`Lifecycle::on_configuration`]
//! and applied by [`Lifecycle::process_pending`].  After every apply the
//! outbound state is dispatched to the [`StateSink`] if the context's
//! notification flag is set, and the flag is cleared.

use devconf_model::{DeviceContext, LifecycleRequests, SerializedState};
use devconf_types::{ConfigError, ProcessState};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::telemetry::LogLevelHandle;
use crate::RuntimeError;

/// Receiver of the outbound state document.
pub trait StateSink: Send {
    /// Deliver `state` on `topic`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Dispatch`] when delivery fails; the notification stays
    /// pending.
    fn send_state(&mut self, topic: &str, state: &SerializedState) -> Result<(), RuntimeError>;
}

/// Result of one [`Lifecycle::process_pending`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// No configuration was pending.
    Nothing,
    Applied,
    /// The configuration was rejected or failed to apply; the error is also
    /// in the dispatched `res_info`.
    Rejected(ConfigError),
}

pub struct Lifecycle<S> {
    context: DeviceContext,
    sink: S,
    topic: String,
    log_level: LogLevelHandle,
}

impl<S: StateSink> Lifecycle<S> {
    pub fn new(
        context: DeviceContext,
        sink: S,
        topic: impl Into<String>,
        log_level: LogLevelHandle,
    ) -> Self {
        Self {
            context,
            sink,
            topic: topic.into(),
            log_level,
        }
    }

    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DeviceContext {
        &mut self.context
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Load sensor values and enter `initial` (idle unless told otherwise).
    pub fn start(&mut self, initial: ProcessState) {
        self.context.initialize_values();
        self.context.set_current_state(initial);
        info!(state = %initial, "lifecycle started");
    }

    /// Queue inbound configuration `text`.
    ///
    /// Returns `false` when the text is ignored: it is not a JSON object, it
    /// has no `req_info.req_id`, or that id was already applied.
    pub fn on_configuration(&mut self, text: &str) -> bool {
        let Ok(Value::Object(root)) = serde_json::from_str::<Value>(text) else {
            warn!("ignoring configuration that is not a JSON object");
            return false;
        };
        let Some(req_id) = root
            .get("req_info")
            .and_then(|info| info.get("req_id"))
            .and_then(Value::as_str)
        else {
            warn!("ignoring configuration without req_info.req_id");
            return false;
        };
        if req_id == self.context.document().req_info().req_id() {
            info!(req_id, "ignoring configuration with an already applied req_id");
            return false;
        }
        debug!(req_id, "configuration queued");
        self.context.set_pending_configuration(text);
        true
    }

    /// Apply the pending configuration, if any, then dispatch the state.
    ///
    /// A configuration that is rejected or fails to apply drops the device
    /// back to idle.
    ///
    /// # Errors
    ///
    /// Only dispatch failures are errors here; a rejected configuration is
    /// reported as [`Processed::Rejected`].
    pub fn process_pending(&mut self) -> Result<Processed, RuntimeError> {
        let Some(text) = self.context.take_pending_configuration() else {
            return Ok(Processed::Nothing);
        };
        let (outcome, requests) = self.context.update(&text);
        if let Err(err) = self.apply_requests(requests) {
            warn!(%err, "lifecycle request not applied");
        }
        if outcome.is_err() {
            self.context.set_next_state(ProcessState::Idle);
            self.transition();
            self.context.enable_notification();
        }
        self.dispatch_notification()?;

        Ok(match outcome {
            Ok(()) => Processed::Applied,
            Err(err) => {
                warn!(%err, "configuration not applied");
                Processed::Rejected(err)
            }
        })
    }

    fn apply_requests(&mut self, requests: LifecycleRequests) -> Result<(), RuntimeError> {
        if let Some(level) = requests.log_level {
            self.log_level.set_level(level)?;
        }
        if let Some(state) = requests.process_state
            && state != self.context.current_state()
        {
            self.context.set_next_state(state);
            self.transition();
        }
        Ok(())
    }

    /// Move to the requested next state.
    pub fn transition(&mut self) {
        let next = self.context.next_state();
        if next != self.context.current_state() {
            info!(from = %self.context.current_state(), to = %next, "transition");
            self.context.set_current_state(next);
        }
    }

    /// Send the outbound state if a notification is pending.
    ///
    /// Returns whether anything was sent.
    pub fn dispatch_notification(&mut self) -> Result<bool, RuntimeError> {
        if !self.context.is_pending_notification() {
            return Ok(false);
        }
        let state = self.context.serialize()?;
        self.sink.send_state(&self.topic, &state)?;
        self.context.clear_notification();
        debug!(topic = %self.topic, bytes = state.len(), "state dispatched");
        Ok(true)
    }

    /// Enter the destroying state; later requests cannot leave it.
    pub fn shutdown(&mut self) {
        self.context.set_next_state(ProcessState::Destroying);
        self.transition();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct VecSink {
        sent: Vec<(String, String)>,
    }

    impl StateSink for VecSink {
        fn send_state(
            &mut self,
            topic: &str,
            state: &SerializedState,
        ) -> Result<(), RuntimeError> {
            self.sent.push((topic.to_string(), state.as_str().to_string()));
            Ok(())
        }
    }

    fn lifecycle() -> Lifecycle<VecSink> {
        let mut lc = Lifecycle::new(
            DeviceContext::new(),
            VecSink::default(),
            "state",
            LogLevelHandle::detached(),
        );
        lc.start(ProcessState::Idle);
        lc
    }

    #[test]
    fn malformed_or_unidentified_text_is_ignored() {
        let mut lc = lifecycle();
        assert!(!lc.on_configuration("nope"));
        assert!(!lc.on_configuration("[]"));
        assert!(!lc.on_configuration(r#"{"req_info": {}}"#));
        assert!(!lc.context().has_pending_configuration());
    }

    #[test]
    fn nothing_pending_is_a_no_op() {
        let mut lc = lifecycle();
        assert_eq!(lc.process_pending().unwrap(), Processed::Nothing);
        assert!(lc.sink().sent.is_empty());
    }

    #[test]
    fn failed_log_level_change_still_dispatches() {
        let (layer, handle) = tracing_subscriber::reload::Layer::<
            tracing_subscriber::EnvFilter,
            tracing_subscriber::Registry,
        >::new(tracing_subscriber::EnvFilter::new("warn"));
        drop(layer);
        let mut lc = Lifecycle::new(
            DeviceContext::new(),
            VecSink::default(),
            "state",
            LogLevelHandle::attached(handle),
        );
        lc.start(ProcessState::Idle);

        lc.on_configuration(r#"{"req_info": {"req_id": "lvl"}, "common_settings": {"log_level": 4}}"#);
        assert_eq!(lc.process_pending().unwrap(), Processed::Applied);
        assert_eq!(lc.sink().sent.len(), 1);
        assert!(lc.sink().sent[0].1.contains(r#""res_id":"lvl""#));
        assert!(!lc.context().is_pending_notification());
    }

    #[test]
    fn shutdown_is_final() {
        let mut lc = lifecycle();
        lc.shutdown();
        assert_eq!(lc.context().current_state(), ProcessState::Destroying);
        lc.context_mut().set_next_state(ProcessState::Running);
        lc.transition();
        assert_eq!(lc.context().current_state(), ProcessState::Destroying);
    }
}
