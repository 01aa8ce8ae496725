//! JSON encoding/decoding for live-edit messages.
//!
//! Two layers:
//!
//! 1. bytes <-> [`Envelope`]: discriminator-agnostic. Any known `type`
//!    decodes, whatever its payload holds.
//! 2. [`Envelope`] <-> typed message: here the discriminator selects the
//!    concrete type. Requests whose payload is required but absent yield
//!    no message at all.
//!
//! ```text
//! { "type": "change_request", "payload": { "actions": [ {..}, .. ] } }
//! { "type": 11,               "payload": { "status": "OK" } }
//! ```
//!
//! `type` is written as the wire name and read as either the wire name or
//! the integer code. A missing or `null` payload decodes as no payload and
//! is written as `{}`.

use codeless_core::{
    BindingRequest, ChangeRequest, ClearRequest, InboundMessage, OutboundMessage, Payload,
    StatusResponse, TweakRequest,
};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::wire_types::MessageType;

/// Errors that can arise when encoding/decoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("badly formed socket message, expected a JSON object")]
    NotAnObject,

    #[error("message has no `type`")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// A typed message was missing a field its subtype requires.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

// ============================================================================
// bytes <-> envelope
// ============================================================================

/// Decode one frame into an envelope.
pub fn decode_envelope(buf: &[u8]) -> Result<Envelope, ProtocolError> {
    let root: Value = serde_json::from_slice(buf)?;
    let mut object = match root {
        Value::Object(map) => map,
        _ => return Err(ProtocolError::NotAnObject),
    };

    let message_type = match object.get("type") {
        Some(Value::String(name)) => {
            MessageType::from_name(name)
                .ok_or_else(|| ProtocolError::UnknownMessageType(name.clone()))?
        }
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(MessageType::from_code)
            .ok_or_else(|| ProtocolError::UnknownMessageType(n.to_string()))?,
        Some(_) => return Err(ProtocolError::InvalidField("type")),
        None => return Err(ProtocolError::MissingType),
    };

    let payload = match object.remove("payload") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(ProtocolError::InvalidField("payload")),
    };

    Ok(match payload {
        Some(payload) => Envelope::with_payload(message_type, payload),
        None => Envelope::new(message_type),
    })
}

/// Encode an envelope into one frame. `type` is written as the wire name,
/// never the integer code.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
    let mut root = Payload::new();
    root.insert(
        "type".to_string(),
        Value::String(envelope.message_type().as_str().to_string()),
    );
    root.insert(
        "payload".to_string(),
        Value::Object(envelope.payload().cloned().unwrap_or_default()),
    );
    Ok(serde_json::to_vec(&Value::Object(root))?)
}

// ============================================================================
// envelope <-> typed message
// ============================================================================

/// Turn an envelope into the request it carries.
///
/// Returns `None` for responses, for snapshot requests (not served), and
/// for requests whose required payload is missing.
pub fn inbound_from_envelope(envelope: Envelope) -> Option<InboundMessage> {
    let message_type = envelope.message_type();
    let payload = envelope.into_payload();

    match message_type {
        MessageType::ChangeRequest => {
            ChangeRequest::from_payload(payload).map(InboundMessage::Change)
        }
        MessageType::TweakRequest => TweakRequest::from_payload(payload).map(InboundMessage::Tweak),
        MessageType::ClearRequest => ClearRequest::from_payload(payload).map(InboundMessage::Clear),
        MessageType::BindingRequest => {
            BindingRequest::from_payload(payload).map(InboundMessage::Binding)
        }
        MessageType::DeviceInfoRequest => Some(InboundMessage::DeviceInfo),
        MessageType::Disconnect => Some(InboundMessage::Disconnect),
        MessageType::SnapshotRequest
        | MessageType::SnapshotResponse
        | MessageType::ChangeResponse
        | MessageType::DeviceInfoResponse
        | MessageType::TweakResponse
        | MessageType::ClearResponse
        | MessageType::BindingResponse => None,
    }
}

/// Build the envelope for a response.
pub fn outbound_to_envelope(msg: &OutboundMessage) -> Result<Envelope, ProtocolError> {
    match msg {
        OutboundMessage::ChangeResponse(r) => status_envelope(MessageType::ChangeResponse, r),
        OutboundMessage::TweakResponse(r) => status_envelope(MessageType::TweakResponse, r),
        OutboundMessage::ClearResponse(r) => status_envelope(MessageType::ClearResponse, r),
        OutboundMessage::BindingResponse(r) => status_envelope(MessageType::BindingResponse, r),
        OutboundMessage::DeviceInfoResponse(info) => match serde_json::to_value(info)? {
            Value::Object(payload) => Ok(Envelope::with_payload(
                MessageType::DeviceInfoResponse,
                payload,
            )),
            _ => Err(ProtocolError::NotAnObject),
        },
    }
}

/// Decode a frame straight into a request. `Ok(None)` means the frame was
/// well formed but carries nothing to act on.
pub fn decode_inbound(buf: &[u8]) -> Result<Option<InboundMessage>, ProtocolError> {
    decode_envelope(buf).map(inbound_from_envelope)
}

/// Encode a response straight into a frame.
pub fn encode_outbound(msg: &OutboundMessage) -> Result<Vec<u8>, ProtocolError> {
    encode_envelope(&outbound_to_envelope(msg)?)
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn status_envelope(
    message_type: MessageType,
    response: &StatusResponse,
) -> Result<Envelope, ProtocolError> {
    let status = response.status().ok_or(ProtocolError::MissingField("status"))?;

    let mut envelope = Envelope::new(message_type);
    let payload = envelope.payload_mut();
    payload.insert("status".to_string(), Value::String(status.to_string()));
    if !response.errors().is_empty() {
        payload.insert(
            "errors".to_string(),
            Value::Array(response.errors().iter().cloned().map(Value::String).collect()),
        );
    }
    Ok(envelope)
}
