use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use devconf_model::{DeviceContext, SerializedState};
use devconf_runtime::{
    AnalysisWorker, Lifecycle, LogLevelHandle, ParamCell, ParameterExtractor, Processed,
    RuntimeError, StateSink,
};
use devconf_sensor::SimSensor;
use devconf_types::{ProcessState, ResponseCode};
use serde_json::{json, Value};

// ---- helpers ----------------------------------------------------------------

#[derive(Clone, Default)]
struct SharedSink {
    sent: Arc<Mutex<Vec<Value>>>,
    fail: Arc<Mutex<bool>>,
}

impl SharedSink {
    fn last(&self) -> Value {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl StateSink for SharedSink {
    fn send_state(&mut self, topic: &str, state: &SerializedState) -> Result<(), RuntimeError> {
        assert_eq!(topic, "edge_app");
        if *self.fail.lock().unwrap() {
            return Err(RuntimeError::Dispatch("link down".to_string()));
        }
        let value = serde_json::from_str(state.as_str()).unwrap();
        self.sent.lock().unwrap().push(value);
        Ok(())
    }
}

fn lifecycle(sink: SharedSink) -> Lifecycle<SharedSink> {
    let mut lc = Lifecycle::new(
        DeviceContext::new(),
        sink,
        "edge_app",
        LogLevelHandle::detached(),
    );
    lc.start(ProcessState::Idle);
    lc
}

// ---- tests ----------------------------------------------------------------------

#[test]
fn applied_configuration_is_dispatched_once() {
    let sink = SharedSink::default();
    let mut lc = lifecycle(sink.clone());

    let doc = json!({"req_info": {"req_id": "a1"}, "common_settings": {"log_level": 4}});
    assert!(lc.on_configuration(&doc.to_string()));
    assert_eq!(lc.process_pending().unwrap(), Processed::Applied);

    assert_eq!(sink.count(), 1);
    assert_eq!(sink.last()["res_info"]["res_id"], "a1");
    assert_eq!(sink.last()["common_settings"]["log_level"], 4);
    assert!(!lc.context().is_pending_notification());

    assert!(!lc.dispatch_notification().unwrap());
    assert_eq!(sink.count(), 1);
}

#[test]
fn repeated_req_id_is_ignored() {
    let mut lc = lifecycle(SharedSink::default());
    let doc = json!({"req_info": {"req_id": "same"}}).to_string();
    assert!(lc.on_configuration(&doc));
    lc.process_pending().unwrap();
    assert!(!lc.on_configuration(&doc));
    assert_eq!(lc.process_pending().unwrap(), Processed::Nothing);
}

#[test]
fn rejected_configuration_is_still_reported() {
    let sink = SharedSink::default();
    let mut lc = lifecycle(sink.clone());
    lc.on_configuration(
        &json!({
            "req_info": {"req_id": "bad"},
            "common_settings": {"pq_settings": {"image_rotation": 9}}
        })
        .to_string(),
    );

    let Processed::Rejected(err) = lc.process_pending().unwrap() else {
        panic!("expected rejection");
    };
    assert_eq!(err.code(), ResponseCode::InvalidArgument);
    let res_info = &sink.last()["res_info"];
    assert_eq!(res_info["res_id"], "bad");
    assert_eq!(res_info["code"], 3);
    assert_eq!(res_info["detail_msg"], "image_rotation not <= 3.000000");
}

#[test]
fn process_state_request_moves_the_lifecycle() {
    let sink = SharedSink::default();
    let mut lc = lifecycle(sink.clone());
    lc.on_configuration(
        &json!({"req_info": {"req_id": "run"}, "common_settings": {"process_state": 2}})
            .to_string(),
    );
    lc.process_pending().unwrap();
    assert_eq!(lc.context().current_state(), ProcessState::Running);
    assert_eq!(sink.last()["common_settings"]["process_state"], 2);

    lc.on_configuration(
        &json!({
            "req_info": {"req_id": "zoom"},
            "common_settings": {"pq_settings": {"digital_zoom": 3.0}}
        })
        .to_string(),
    );
    assert_eq!(lc.process_pending().unwrap(), Processed::Applied);
    assert_eq!(sink.last()["res_info"]["code"], 9);
}

#[test]
fn rejected_configuration_drops_back_to_idle() {
    let sink = SharedSink::default();
    let mut lc = Lifecycle::new(
        DeviceContext::new(),
        sink.clone(),
        "edge_app",
        LogLevelHandle::detached(),
    );
    lc.start(ProcessState::Running);

    lc.on_configuration(
        &json!({"req_info": {"req_id": "x"}, "common_settings": {"process_state": 9}})
            .to_string(),
    );
    let Processed::Rejected(err) = lc.process_pending().unwrap() else {
        panic!("expected rejection");
    };
    assert_eq!(err.to_string(), "process_state not <= 2.000000");
    assert_eq!(lc.context().current_state(), ProcessState::Idle);
    assert_eq!(sink.count(), 1);
    assert_eq!(sink.last()["res_info"]["res_id"], "x");
    assert_eq!(sink.last()["common_settings"]["process_state"], 1);
    assert!(!lc.context().is_pending_notification());
}

#[test]
fn failed_dispatch_keeps_notification_pending() {
    let sink = SharedSink::default();
    let mut lc = lifecycle(sink.clone());
    *sink.fail.lock().unwrap() = true;

    lc.on_configuration(&json!({"req_info": {"req_id": "x"}}).to_string());
    assert!(matches!(
        lc.process_pending(),
        Err(RuntimeError::Dispatch(_))
    ));
    assert!(lc.context().is_pending_notification());

    *sink.fail.lock().unwrap() = false;
    assert!(lc.dispatch_notification().unwrap());
    assert_eq!(sink.last()["res_info"]["res_id"], "x");
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DetectionParams {
    max_detections: u64,
}

#[test]
fn custom_settings_reach_the_worker() {
    let cell = Arc::new(ParamCell::new(DetectionParams::default()));
    let extractor = ParameterExtractor::new("detection", Arc::clone(&cell)).with_extractor(
        "max_detections",
        |params, out: &mut DetectionParams| {
            out.max_detections = params
                .get("max_detections")
                .and_then(Value::as_u64)
                .ok_or("max_detections missing")?;
            Ok(())
        },
    );
    let context = DeviceContext::with_collaborators(
        Box::new(SimSensor::new().with_defaults()),
        Box::new(extractor),
    );
    let sink = SharedSink::default();
    let mut lc = Lifecycle::new(context, sink.clone(), "edge_app", LogLevelHandle::detached());
    lc.start(ProcessState::Idle);

    let (tx, rx) = mpsc::channel();
    let mut worker = AnalysisWorker::spawn(Arc::clone(&cell), Duration::from_millis(1), move |p| {
        let _ = tx.send(p);
    })
    .unwrap();

    lc.on_configuration(
        &json!({
            "req_info": {"req_id": "m1"},
            "custom_settings": {"ai_models": {"detection": {"parameters": {"max_detections": 7}}}}
        })
        .to_string(),
    );
    assert_eq!(lc.process_pending().unwrap(), Processed::Applied);

    let seen = rx
        .iter()
        .find(|p: &DetectionParams| p.max_detections == 7)
        .unwrap();
    assert_eq!(seen.max_detections, 7);
    worker.stop();

    assert_eq!(
        sink.last()["custom_settings"]["res_info"],
        json!({"res_id": "m1", "code": 0, "detail_msg": ""})
    );
}

#[test]
fn bad_custom_parameters_are_rejected() {
    let cell = Arc::new(ParamCell::new(DetectionParams::default()));
    let extractor = ParameterExtractor::new("detection", Arc::clone(&cell));
    let context =
        DeviceContext::with_collaborators(Box::new(SimSensor::new()), Box::new(extractor));
    let sink = SharedSink::default();
    let mut lc = Lifecycle::new(context, sink.clone(), "edge_app", LogLevelHandle::detached());

    lc.on_configuration(
        &json!({"req_info": {"req_id": "c1"}, "custom_settings": {"ai_models": {}}}).to_string(),
    );
    assert!(matches!(
        lc.process_pending().unwrap(),
        Processed::Rejected(_)
    ));
    let out = sink.last();
    assert_eq!(
        out["res_info"]["detail_msg"],
        "Error accessing AI model parameters in JSON object"
    );
    assert_eq!(out["custom_settings"]["res_info"]["code"], 3);
    assert_eq!(cell.snapshot(), DetectionParams::default());
}
