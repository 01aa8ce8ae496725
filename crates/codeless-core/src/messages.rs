//! Message types exchanged with the editor.
//!
//! These are **transport-agnostic** logical messages:
//! - [`InboundMessage`]: what the editor asks the application to do.
//! - [`OutboundMessage`]: what the application answers.
//!
//! Raw payload maps only exist at the envelope boundary; each request
//! type extracts its fields once, at construction. Encoders live in the
//! `codeless-protocol` crate.

use serde_json::{Map, Value};

use crate::host::DeviceInfo;
use crate::variant::ApplyReport;

/// Free-form keyed payload as found on the wire.
pub type Payload = Map<String, Value>;

/// Status value of a fully successful request.
pub const STATUS_OK: &str = "OK";

/// Status value when at least one descriptor failed.
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Apply UI actions to the session variant.
    Change(ChangeRequest),

    /// Apply tweak values to the session variant.
    Tweak(TweakRequest),

    /// Remove named actions from the session variant.
    Clear(ClearRequest),

    /// Replace the session's event bindings.
    Binding(BindingRequest),

    /// Describe the device and application.
    DeviceInfo,

    /// The editor is going away; stop everything and close.
    Disconnect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    ChangeResponse(StatusResponse),
    TweakResponse(StatusResponse),
    ClearResponse(StatusResponse),
    BindingResponse(StatusResponse),
    DeviceInfoResponse(DeviceInfo),
}

/// Change request (inbound).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    actions: Option<Vec<Payload>>,
}

impl ChangeRequest {
    /// Build a request from an optional payload. No payload, no request.
    pub fn from_payload(payload: Option<Payload>) -> Option<Self> {
        let payload = payload?;
        Some(ChangeRequest {
            actions: object_array(&payload, "actions"),
        })
    }

    /// Action descriptors, when `actions` is an array of objects.
    pub fn actions(&self) -> Option<&[Payload]> {
        self.actions.as_deref()
    }
}

/// Tweak request (inbound).
#[derive(Debug, Clone, PartialEq)]
pub struct TweakRequest {
    tweaks: Option<Vec<Payload>>,
}

impl TweakRequest {
    pub fn from_payload(payload: Option<Payload>) -> Option<Self> {
        let payload = payload?;
        Some(TweakRequest {
            tweaks: object_array(&payload, "tweaks"),
        })
    }

    pub fn tweaks(&self) -> Option<&[Payload]> {
        self.tweaks.as_deref()
    }
}

/// Clear request (inbound): `{ "actions": ["name", ...] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearRequest {
    action_names: Option<Vec<String>>,
}

impl ClearRequest {
    pub fn from_payload(payload: Option<Payload>) -> Option<Self> {
        let payload = payload?;
        let action_names = payload
            .get("actions")
            .and_then(Value::as_array)
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            });
        Some(ClearRequest { action_names })
    }

    pub fn action_names(&self) -> Option<&[String]> {
        self.action_names.as_deref()
    }
}

/// Event binding request (inbound): `{ "events": [...] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRequest {
    events: Option<Vec<Payload>>,
}

impl BindingRequest {
    pub fn from_payload(payload: Option<Payload>) -> Option<Self> {
        let payload = payload?;
        Some(BindingRequest {
            events: object_array(&payload, "events"),
        })
    }

    pub fn events(&self) -> Option<&[Payload]> {
        self.events.as_deref()
    }
}

/// Response carrying a `status` and optional per-descriptor diagnostics.
///
/// Starts out empty; the handler sets the status before sending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusResponse {
    status: Option<String>,
    errors: Vec<String>,
}

impl StatusResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok() -> Self {
        let mut response = Self::new();
        response.set_status(STATUS_OK);
        response
    }

    /// `"OK"` when every descriptor succeeded, otherwise `"ERROR"` with
    /// one diagnostic per failure.
    pub fn from_report(report: &ApplyReport) -> Self {
        if report.is_ok() {
            return Self::ok();
        }
        let mut response = Self::new();
        response.set_status(STATUS_ERROR);
        response.errors = report.diagnostics();
        response
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn set_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
    }

    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some(STATUS_OK)
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// `payload[key]` as a list of objects. Any non-object element makes the
/// whole field count as absent.
fn object_array(payload: &Payload, key: &str) -> Option<Vec<Payload>> {
    payload
        .get(key)?
        .as_array()?
        .iter()
        .map(|item| item.as_object().cloned())
        .collect()
}
