//! Shared types for the session runtime.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for a live editor connection
//! - the outbound frame type and channel aliases between handlers and the
//!   socket writer

use std::fmt;

use codeless_core::OutboundMessage;
use tokio::sync::mpsc;

/// Identifier for an editor connection.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the socket writer is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(OutboundMessage),
    /// Send a close frame and stop writing.
    Close,
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;
