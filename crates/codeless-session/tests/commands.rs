// crates/codeless-session/tests/commands.rs
//
// Units of work driven directly through a CommandContext, with an mpsc
// channel standing in for the socket writer.

use std::sync::{mpsc as std_mpsc, Arc, Mutex};

use codeless_core::{
    ActionError, ClearRequest, CodelessBinding, DeviceInfo, HostEvent, InboundMessage,
    OutboundMessage, Payload, RecordingHost, StatusResponse, TransformerRegistry, TweakRequest,
    TweakValue, VariantAction, VariantTweak, ViewHost, STATUS_ERROR,
};
use codeless_protocol::{decode_envelope, Envelope, MessageType};
use codeless_session::commands::{schedule_change_request, CommandContext};
use codeless_session::connection::{ConnectionHandle, ConnectionTable};
use codeless_session::types::{Outbound, OutboundRx};
use codeless_session::ui::UiHandle;
use serde_json::{json, Value};
use tokio::sync::mpsc;

struct Harness {
    table: ConnectionTable,
    handle: ConnectionHandle,
    ctx: CommandContext,
    rx: OutboundRx,
    events: Arc<Mutex<Vec<HostEvent>>>,
}

async fn harness_with(host: RecordingHost, concurrency: usize) -> Harness {
    let events = host.events();
    let ui = UiHandle::spawn("test-ui", Box::new(host)).expect("spawn UI thread");
    let table = ConnectionTable::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = table.register(tx).await;
    let ctx = CommandContext::new(
        handle.clone(),
        ui,
        Arc::new(TransformerRegistry::with_defaults()),
        concurrency,
    );
    Harness { table, handle, ctx, rx, events }
}

async fn harness() -> Harness {
    harness_with(RecordingHost::new(), 1).await
}

fn payload(value: Value) -> Payload {
    value.as_object().expect("object").clone()
}

fn change(actions: Value) -> Option<Payload> {
    Some(payload(json!({ "actions": actions })))
}

fn applied_names(events: &Arc<Mutex<Vec<HostEvent>>>) -> Vec<String> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            HostEvent::Applied { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn expect_status(frame: Outbound) -> StatusResponse {
    match frame {
        Outbound::Message(OutboundMessage::ChangeResponse(r))
        | Outbound::Message(OutboundMessage::TweakResponse(r))
        | Outbound::Message(OutboundMessage::ClearResponse(r))
        | Outbound::Message(OutboundMessage::BindingResponse(r)) => r,
        other => panic!("expected a status response, got {:?}", other),
    }
}

#[tokio::test]
async fn change_request_without_payload_schedules_nothing() {
    let mut h = harness().await;

    assert!(schedule_change_request(None, &h.ctx).is_none());

    assert!(h.rx.try_recv().is_err());
    let conn = h.handle.resolve().await.expect("connection registered");
    assert!(conn.session().variant().is_none());
}

#[tokio::test]
async fn change_request_applies_then_responds_ok() {
    let mut h = harness().await;

    let task = schedule_change_request(
        change(json!([
            {"name": "a", "path": "/UIView/UIButton", "selector": "setTitle:", "args": ["Buy"]},
            {"name": "b", "path": "/UIView/UILabel", "selector": "setText:", "args": ["hi"]},
        ])),
        &h.ctx,
    )
    .expect("scheduled");

    let frame = h.rx.recv().await.expect("response");
    // Effects are already visible when the response is queued.
    assert_eq!(applied_names(&h.events), vec!["a", "b"]);
    let response = expect_status(frame);
    assert!(response.is_ok());
    assert!(response.errors().is_empty());

    task.await.unwrap();
    assert!(h.rx.try_recv().is_err());

    let conn = h.handle.resolve().await.unwrap();
    let variant = conn.session().variant().expect("session variant created");
    let variant = variant.lock().unwrap();
    let names: Vec<&str> = variant.actions().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn change_response_encodes_with_ok_status() {
    let mut h = harness().await;

    schedule_change_request(change(json!([])), &h.ctx)
        .expect("scheduled")
        .await
        .unwrap();

    let msg = match h.rx.recv().await {
        Some(Outbound::Message(msg)) => msg,
        other => panic!("unexpected {:?}", other),
    };
    let bytes = codeless_protocol::encode_outbound(&msg).unwrap();
    let envelope: Envelope = decode_envelope(&bytes).unwrap();
    assert_eq!(envelope.message_type(), MessageType::ChangeResponse);
    assert_eq!(envelope.payload().unwrap().get("status"), Some(&json!("OK")));
}

#[tokio::test]
async fn change_request_with_failing_action_reports_error() {
    let mut h = harness_with(RecordingHost::new().failing_on("explode:"), 1).await;

    schedule_change_request(
        change(json!([
            {"name": "good", "path": "/UIView", "selector": "setAlpha:", "args": [0.5]},
            {"name": "bad", "path": "/UIView", "selector": "explode:", "args": []},
            {"name": "broken"},
        ])),
        &h.ctx,
    )
    .expect("scheduled")
    .await
    .unwrap();

    let response = expect_status(h.rx.recv().await.unwrap());
    assert_eq!(response.status(), Some(STATUS_ERROR));
    assert_eq!(response.errors().len(), 2);
    assert_eq!(applied_names(&h.events), vec!["good"]);

    let conn = h.handle.resolve().await.unwrap();
    let variant = conn.session().variant().unwrap();
    assert_eq!(variant.lock().unwrap().actions().len(), 1);
}

#[tokio::test]
async fn work_for_a_torn_down_connection_does_nothing() {
    let mut h = harness().await;

    // Hold the only slot so the request cannot start before teardown.
    let permit = Arc::clone(h.ctx.permits()).acquire_owned().await.unwrap();
    let task = schedule_change_request(
        change(json!([{"name": "a", "path": "/UIView", "selector": "setHidden:", "args": [true]}])),
        &h.ctx,
    )
    .expect("scheduled");

    assert!(h.handle.teardown().await);
    drop(permit);
    task.await.unwrap();

    // Teardown closes the socket; nothing else is sent.
    assert_eq!(h.rx.recv().await, Some(Outbound::Close));
    assert!(h.rx.try_recv().is_err());
    assert!(applied_names(&h.events).is_empty());
    assert!(h.table.is_empty().await);
}

/// Blocks inside `apply_action` until the test lets it continue.
struct GatedHost {
    inner: RecordingHost,
    started: mpsc::UnboundedSender<()>,
    release: std_mpsc::Receiver<()>,
}

impl ViewHost for GatedHost {
    fn apply_action(&mut self, action: &VariantAction, args: &[Value]) -> Result<(), ActionError> {
        let _ = self.started.send(());
        let _ = self.release.recv();
        self.inner.apply_action(action, args)
    }

    fn revert_action(&mut self, action: &VariantAction) {
        self.inner.revert_action(action)
    }

    fn apply_tweak(&mut self, tweak: &VariantTweak) -> Result<(), ActionError> {
        self.inner.apply_tweak(tweak)
    }

    fn revert_tweak(&mut self, tweak: &VariantTweak) {
        self.inner.revert_tweak(tweak)
    }

    fn bind(&mut self, binding: &CodelessBinding) -> Result<(), ActionError> {
        self.inner.bind(binding)
    }

    fn unbind(&mut self, binding: &CodelessBinding) {
        self.inner.unbind(binding)
    }

    fn device_info(&self) -> DeviceInfo {
        self.inner.device_info()
    }
}

#[tokio::test]
async fn teardown_during_a_running_effect_drops_the_response() {
    let (started_tx, mut started_rx) = mpsc::unbounded_channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let inner = RecordingHost::new();
    let events = inner.events();
    let host = GatedHost { inner, started: started_tx, release: release_rx };
    let ui = UiHandle::spawn("gated-ui", Box::new(host)).expect("spawn UI thread");

    let table = ConnectionTable::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = table.register(tx).await;
    let ctx = CommandContext::new(
        handle.clone(),
        ui,
        Arc::new(TransformerRegistry::with_defaults()),
        1,
    );
    let conn = handle.resolve().await.expect("connection registered");

    let task = schedule_change_request(
        change(json!([{"name": "a", "path": "/UIView", "selector": "setHidden:", "args": [true]}])),
        &ctx,
    )
    .expect("scheduled");

    started_rx.recv().await.expect("effect started");
    assert!(handle.teardown().await);
    release_tx.send(()).unwrap();
    task.await.unwrap();

    // The effect finished, but its response went nowhere.
    assert_eq!(applied_names(&events), vec!["a"]);
    assert_eq!(rx.recv().await, Some(Outbound::Close));
    assert!(rx.try_recv().is_err());
    assert!(!conn.is_open());
    assert!(!conn.send(OutboundMessage::ChangeResponse(StatusResponse::ok())));
    assert!(table.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_change_requests_share_one_variant() {
    let mut h = harness_with(RecordingHost::new(), 4).await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let actions = json!([
            {"name": format!("action-{}", i), "path": "/UIView", "selector": "setTag:", "args": [i]}
        ]);
        tasks.push(schedule_change_request(change(actions), &h.ctx).expect("scheduled"));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for _ in 0..8 {
        assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());
    }

    let conn = h.handle.resolve().await.unwrap();
    let variant = conn.session().variant().expect("exactly one variant");
    let variant = variant.lock().unwrap();
    assert_eq!(variant.actions().len(), 8);
    for i in 0..8 {
        assert!(variant.action(&format!("action-{}", i)).is_some());
    }
}

#[tokio::test]
async fn requests_are_processed_in_arrival_order_by_default() {
    let mut h = harness().await;

    let first = h.ctx.dispatch(InboundMessage::Change(
        codeless_core::ChangeRequest::from_payload(change(json!([
            {"name": "x", "path": "/UIView", "selector": "setTag:", "args": [1]}
        ])))
        .unwrap(),
    ));
    let second = h.ctx.dispatch(InboundMessage::Change(
        codeless_core::ChangeRequest::from_payload(change(json!([
            {"name": "x", "path": "/UIView", "selector": "setTag:", "args": [2]}
        ])))
        .unwrap(),
    ));
    first.await.unwrap();
    second.await.unwrap();

    let events = h.events.lock().unwrap().clone();
    let tags: Vec<Value> = events
        .into_iter()
        .filter_map(|e| match e {
            HostEvent::Applied { args, .. } => args.into_iter().next(),
            _ => None,
        })
        .collect();
    assert_eq!(tags, vec![json!(1), json!(2)]);
    assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());
    assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());
}

#[tokio::test]
async fn tweak_request_applies_tweaks() {
    let mut h = harness().await;

    let req = TweakRequest::from_payload(Some(payload(json!({
        "tweaks": [{"name": "show_banner", "encoding": "c", "value": true}]
    }))))
    .unwrap();
    h.ctx.dispatch(InboundMessage::Tweak(req)).await.unwrap();

    match h.rx.recv().await.unwrap() {
        Outbound::Message(OutboundMessage::TweakResponse(r)) => assert!(r.is_ok()),
        other => panic!("unexpected {:?}", other),
    }
    let events = h.events.lock().unwrap();
    assert!(events.contains(&HostEvent::TweakApplied {
        name: "show_banner".to_string(),
        value: Some(TweakValue::Bool(true)),
    }));
}

#[tokio::test]
async fn clear_request_reverts_named_actions() {
    let mut h = harness().await;

    schedule_change_request(
        change(json!([
            {"name": "keep", "path": "/UIView", "selector": "setTag:", "args": [1]},
            {"name": "drop", "path": "/UIView", "selector": "setTag:", "args": [2]},
        ])),
        &h.ctx,
    )
    .unwrap()
    .await
    .unwrap();
    assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());

    let req =
        ClearRequest::from_payload(Some(payload(json!({"actions": ["drop", "missing"]})))).unwrap();
    h.ctx.dispatch(InboundMessage::Clear(req)).await.unwrap();

    match h.rx.recv().await.unwrap() {
        Outbound::Message(OutboundMessage::ClearResponse(r)) => assert!(r.is_ok()),
        other => panic!("unexpected {:?}", other),
    }
    assert!(h
        .events
        .lock()
        .unwrap()
        .contains(&HostEvent::Reverted { name: "drop".to_string() }));

    let conn = h.handle.resolve().await.unwrap();
    let variant = conn.session().variant().unwrap();
    let variant = variant.lock().unwrap();
    assert!(variant.action("keep").is_some());
    assert!(variant.action("drop").is_none());
}

#[tokio::test]
async fn clear_request_without_variant_still_responds() {
    let mut h = harness().await;

    let req = ClearRequest::from_payload(Some(payload(json!({"actions": ["a"]})))).unwrap();
    h.ctx.dispatch(InboundMessage::Clear(req)).await.unwrap();

    assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());
}

#[tokio::test]
async fn binding_request_binds_events() {
    let mut h = harness().await;

    let env = decode_envelope(
        json!({"type": "event_binding_request", "payload": {"events": [
            {
                "name": "tap",
                "event_type": "ui_control",
                "path": "/UIView/UIButton",
                "event_name": "Tapped"
            },
            {"name": "bad", "event_type": "ui_gesture", "path": "/UIView", "event_name": "x"}
        ]}})
        .to_string()
        .as_bytes(),
    )
    .unwrap();
    h.ctx.dispatch_envelope(env).expect("scheduled").await.unwrap();

    let response = expect_status(h.rx.recv().await.unwrap());
    assert_eq!(response.status(), Some(STATUS_ERROR));
    assert_eq!(response.errors().len(), 1);
    assert!(h.events.lock().unwrap().contains(&HostEvent::Bound {
        name: "tap".to_string(),
        event_name: "Tapped".to_string(),
    }));

    let conn = h.handle.resolve().await.unwrap();
    let bindings = conn.session().bindings().expect("bindings stored");
    assert_eq!(bindings.lock().unwrap().bindings().len(), 1);
}

#[tokio::test]
async fn device_info_request_reports_host_description() {
    let mut h = harness().await;

    h.ctx.dispatch(InboundMessage::DeviceInfo).await.unwrap();

    match h.rx.recv().await.unwrap() {
        Outbound::Message(OutboundMessage::DeviceInfoResponse(info)) => {
            assert_eq!(info.lib_language, "Rust");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn snapshot_requests_are_dropped() {
    let mut h = harness().await;

    let env = decode_envelope(br#"{"type":"snapshot_request","payload":{}}"#).unwrap();
    assert!(h.ctx.dispatch_envelope(env).is_none());
    assert!(h.rx.try_recv().is_err());
}

#[tokio::test]
async fn disconnect_stops_effects_and_closes() {
    let mut h = harness().await;

    schedule_change_request(
        change(json!([{"name": "a", "path": "/UIView", "selector": "setTag:", "args": [1]}])),
        &h.ctx,
    )
    .unwrap()
    .await
    .unwrap();
    assert!(expect_status(h.rx.recv().await.unwrap()).is_ok());
    let conn = h.handle.resolve().await.unwrap();
    assert!(!conn.is_released());

    h.ctx.dispatch(InboundMessage::Disconnect).await.unwrap();

    assert!(conn.is_released());

    assert_eq!(h.rx.recv().await, Some(Outbound::Close));
    assert!(h
        .events
        .lock()
        .unwrap()
        .contains(&HostEvent::Reverted { name: "a".to_string() }));
    assert!(h.table.is_empty().await);
    assert!(h.handle.resolve().await.is_none());
}

#[tokio::test]
async fn reapply_replays_recorded_actions() {
    let mut h = harness().await;

    assert!(h.ctx.reapply_session_variant().await.is_none());

    schedule_change_request(
        change(json!([{"name": "a", "path": "/UIView", "selector": "setTag:", "args": [1]}])),
        &h.ctx,
    )
    .unwrap()
    .await
    .unwrap();
    let _ = h.rx.recv().await;

    let report = h.ctx.reapply_session_variant().await.expect("variant exists");
    assert!(report.is_ok());
    assert_eq!(applied_names(&h.events), vec!["a", "a"]);
}
