//! codeless-protocol
//!
//! Wire-level encoding/decoding for the live-edit channel.
//!
//! This crate turns logical messages (`codeless_core::InboundMessage` /
//! `OutboundMessage`) into JSON frames and back again.
//!
//! - [`wire_types`] : message type discriminators
//! - [`envelope`]   : the `{type, payload}` structure shared by all messages
//! - [`json_codec`] : bytes <-> envelope <-> typed message

pub mod envelope;
pub mod json_codec;
pub mod wire_types;

pub use envelope::Envelope;
pub use json_codec::{
    decode_envelope,
    decode_inbound,
    encode_envelope,
    encode_outbound,
    inbound_from_envelope,
    outbound_to_envelope,
    ProtocolError,
};
pub use wire_types::MessageType;
