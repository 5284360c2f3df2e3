//! [`DeviceContext`] – the device-wide state the lifecycle layer drives.
//!
//! A context owns one [`ConfigurationDocument`], the shared pending
//! notification flag, the sensor stream and the application configure hook.
//! It is passed explicitly to whoever needs it; [`ContextHost`] gives the
//! create-on-first-use / explicit-delete lifecycle.

use devconf_sensor::{SensorStream, SimSensor};
use devconf_types::{ConfigError, ProcessState};
use tracing::{debug, info};

use crate::custom_settings::{ConfigureHandler, NoopConfigure};
use crate::document::{Collaborators, ConfigurationDocument};
use crate::node::LifecycleRequests;
use crate::notifier::Notifier;
use crate::serialize::SerializedState;

pub struct DeviceContext {
    document: ConfigurationDocument,
    notifier: Notifier,
    sensor: Box<dyn SensorStream>,
    configure: Box<dyn ConfigureHandler>,
    current_state: ProcessState,
    next_state: ProcessState,
    pending_configuration: Option<String>,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceContext {
    /// A context backed by a [`SimSensor`] with power-on defaults.
    pub fn new() -> Self {
        Self::with_collaborators(
            Box::new(SimSensor::new().with_defaults()),
            Box::new(NoopConfigure),
        )
    }

    pub fn with_collaborators(
        sensor: Box<dyn SensorStream>,
        configure: Box<dyn ConfigureHandler>,
    ) -> Self {
        let notifier = Notifier::new();
        Self {
            document: ConfigurationDocument::new(notifier.clone()),
            notifier,
            sensor,
            configure,
            current_state: ProcessState::Creating,
            next_state: ProcessState::Creating,
            pending_configuration: None,
        }
    }

    pub fn document(&self) -> &ConfigurationDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ConfigurationDocument {
        &mut self.document
    }

    pub fn sensor(&self) -> &dyn SensorStream {
        self.sensor.as_ref()
    }

    pub fn sensor_mut(&mut self) -> &mut dyn SensorStream {
        self.sensor.as_mut()
    }

    /// Another handle on this context's notification flag.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub fn enable_notification(&self) {
        self.notifier.enable();
    }

    pub fn is_pending_notification(&self) -> bool {
        self.notifier.is_pending()
    }

    pub fn clear_notification(&self) {
        self.notifier.clear();
    }

    pub fn current_state(&self) -> ProcessState {
        self.current_state
    }

    pub fn next_state(&self) -> ProcessState {
        self.next_state
    }

    /// Enter `state`; idle and running are mirrored into the document.
    pub fn set_current_state(&mut self, state: ProcessState) {
        debug!(from = %self.current_state, to = %state, "state change");
        self.current_state = state;
        if self.next_state != ProcessState::Destroying {
            self.next_state = state;
        }
        self.document.common_settings_mut().set_process_state(state);
    }

    /// Request a transition to `state`; destroying is sticky.
    pub fn set_next_state(&mut self, state: ProcessState) {
        if self.next_state == ProcessState::Destroying {
            return;
        }
        self.next_state = state;
    }

    pub fn set_pending_configuration(&mut self, text: impl Into<String>) {
        self.pending_configuration = Some(text.into());
    }

    pub fn take_pending_configuration(&mut self) -> Option<String> {
        self.pending_configuration.take()
    }

    pub fn clear_pending_configuration(&mut self) {
        self.pending_configuration = None;
    }

    pub fn has_pending_configuration(&self) -> bool {
        self.pending_configuration.is_some()
    }

    /// Load sensor-backed values into the document.
    pub fn initialize_values(&mut self) {
        self.document.initialize_values(self.sensor.as_ref());
    }

    /// Feed `text` through [`ConfigurationDocument::update`].
    ///
    /// Lifecycle requests recorded by the update are returned whatever the
    /// outcome.
    pub fn update(&mut self, text: &str) -> (Result<(), ConfigError>, LifecycleRequests) {
        let mut collaborators = Collaborators {
            sensor: self.sensor.as_mut(),
            configure: self.configure.as_mut(),
            process_state: self.current_state,
        };
        let outcome = self.document.update(text, &mut collaborators);
        (outcome, self.document.take_requests())
    }

    pub fn serialize(&self) -> Result<SerializedState, ConfigError> {
        self.document.serialize()
    }
}

type Factory = Box<dyn Fn() -> DeviceContext + Send>;

/// Owner of at most one [`DeviceContext`].
///
/// [`ContextHost::get_instance`] creates the context on first use;
/// [`ContextHost::delete`] drops it so the next call starts fresh.
pub struct ContextHost {
    slot: Option<DeviceContext>,
    factory: Factory,
}

impl Default for ContextHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextHost {
    pub fn new() -> Self {
        Self::with_factory(DeviceContext::new)
    }

    /// Build contexts with `factory` instead of the sim-backed default.
    pub fn with_factory(factory: impl Fn() -> DeviceContext + Send + 'static) -> Self {
        Self {
            slot: None,
            factory: Box::new(factory),
        }
    }

    pub fn get_instance(&mut self) -> &mut DeviceContext {
        let factory = &self.factory;
        self.slot.get_or_insert_with(|| {
            info!("creating device context");
            factory()
        })
    }

    pub fn delete(&mut self) {
        if self.slot.take().is_some() {
            info!("device context deleted");
        }
    }

    pub fn is_alive(&self) -> bool {
        self.slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroying_is_sticky() {
        let mut ctx = DeviceContext::new();
        ctx.set_next_state(ProcessState::Destroying);
        ctx.set_next_state(ProcessState::Running);
        assert_eq!(ctx.next_state(), ProcessState::Destroying);
        ctx.set_current_state(ProcessState::Idle);
        assert_eq!(ctx.next_state(), ProcessState::Destroying);
    }

    #[test]
    fn current_state_is_mirrored() {
        let mut ctx = DeviceContext::new();
        ctx.set_current_state(ProcessState::Running);
        assert_eq!(ctx.document().common_settings().process_state(), 2);
        ctx.set_current_state(ProcessState::Destroying);
        assert_eq!(ctx.document().common_settings().process_state(), 2);
    }

    #[test]
    fn pending_configuration_slot() {
        let mut ctx = DeviceContext::new();
        assert!(!ctx.has_pending_configuration());
        ctx.set_pending_configuration("{}");
        assert_eq!(ctx.take_pending_configuration().as_deref(), Some("{}"));
        assert!(ctx.take_pending_configuration().is_none());
        ctx.set_pending_configuration("{}");
        ctx.clear_pending_configuration();
        assert!(!ctx.has_pending_configuration());
    }

    #[test]
    fn host_recreates_after_delete() {
        let mut host = ContextHost::new();
        host.get_instance().enable_notification();
        host.get_instance().set_pending_configuration("{}");
        assert!(host.get_instance().is_pending_notification());

        host.delete();
        assert!(!host.is_alive());
        let ctx = host.get_instance();
        assert!(!ctx.is_pending_notification());
        assert!(!ctx.has_pending_configuration());
        assert_eq!(ctx.document().res_info().res_id(), "");
    }
}
