//! The structure shared by every protocol message.

use codeless_core::Payload;

use crate::wire_types::MessageType;

/// `{ "type": .., "payload": { .. } }`
///
/// The type is fixed at construction. The payload is a raw map; typed
/// access belongs to the concrete message types in `codeless-core`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    message_type: MessageType,
    payload: Option<Payload>,
}

impl Envelope {
    pub fn new(message_type: MessageType) -> Self {
        Envelope {
            message_type,
            payload: None,
        }
    }

    pub fn with_payload(message_type: MessageType, payload: Payload) -> Self {
        Envelope {
            message_type,
            payload: Some(payload),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Mutable payload, created empty on first access.
    pub fn payload_mut(&mut self) -> &mut Payload {
        self.payload.get_or_insert_with(Payload::new)
    }

    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }
}
