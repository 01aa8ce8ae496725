// crates/codeless-core/tests/bindings.rs
use codeless_core::{BindingCollection, BindingKind, HostEvent, Payload, RecordingHost};
use serde_json::json;

fn descriptors(value: serde_json::Value) -> Vec<Payload> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

#[test]
fn update_replaces_previous_bindings() {
    let mut host = RecordingHost::new();
    let mut collection = BindingCollection::new();

    let errors = collection.update(
        &descriptors(json!([
            {
                "name": "buy",
                "path": "/UIButton",
                "event_name": "Buy tapped",
                "event_type": "ui_control"
            },
        ])),
        &mut host,
    );
    assert!(errors.is_empty());
    assert_eq!(collection.bindings()[0].kind, BindingKind::Control);

    let errors = collection.update(
        &descriptors(json!([
            {
                "name": "row",
                "path": "/UITableView",
                "event_name": "Row picked",
                "event_type": "ui_table_view"
            },
            {"name": "bad", "path": "/X", "event_name": "?", "event_type": "ui_slider"},
        ])),
        &mut host,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(collection.bindings().len(), 1);
    assert_eq!(collection.bindings()[0].name, "row");

    let events = host.events();
    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            HostEvent::Bound { name: "buy".into(), event_name: "Buy tapped".into() },
            HostEvent::Unbound { name: "buy".into() },
            HostEvent::Bound { name: "row".into(), event_name: "Row picked".into() },
        ]
    );
}

#[test]
fn cleanup_unbinds_everything() {
    let mut host = RecordingHost::new();
    let mut collection = BindingCollection::new();
    collection.update(
        &descriptors(json!([
            {"path": "/UIButton", "event_name": "Tap", "event_type": "ui_control"},
        ])),
        &mut host,
    );

    collection.cleanup(&mut host);
    assert!(collection.bindings().is_empty());
    assert_eq!(host.events().lock().unwrap().len(), 2);
}
