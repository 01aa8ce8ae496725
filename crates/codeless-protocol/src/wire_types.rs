//! Message type discriminators.
//!
//! Every message kind has a stable wire name and a stable integer code.
//! Requests use codes below 10, responses 10 and up.
//!
//! Outgoing frames always carry the name in `type`, which is what the
//! editor expects. Incoming frames may carry either the name or the
//! integer code.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    SnapshotRequest,
    ChangeRequest,
    DeviceInfoRequest,
    TweakRequest,
    ClearRequest,
    BindingRequest,
    Disconnect,

    SnapshotResponse,
    ChangeResponse,
    DeviceInfoResponse,
    TweakResponse,
    ClearResponse,
    BindingResponse,
}

impl MessageType {
    pub const ALL: [MessageType; 13] = [
        MessageType::SnapshotRequest,
        MessageType::ChangeRequest,
        MessageType::DeviceInfoRequest,
        MessageType::TweakRequest,
        MessageType::ClearRequest,
        MessageType::BindingRequest,
        MessageType::Disconnect,
        MessageType::SnapshotResponse,
        MessageType::ChangeResponse,
        MessageType::DeviceInfoResponse,
        MessageType::TweakResponse,
        MessageType::ClearResponse,
        MessageType::BindingResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::SnapshotRequest => "snapshot_request",
            MessageType::ChangeRequest => "change_request",
            MessageType::DeviceInfoRequest => "device_info_request",
            MessageType::TweakRequest => "tweak_request",
            MessageType::ClearRequest => "clear_request",
            MessageType::BindingRequest => "event_binding_request",
            MessageType::Disconnect => "disconnect",
            MessageType::SnapshotResponse => "snapshot_response",
            MessageType::ChangeResponse => "change_response",
            MessageType::DeviceInfoResponse => "device_info_response",
            MessageType::TweakResponse => "tweak_response",
            MessageType::ClearResponse => "clear_response",
            MessageType::BindingResponse => "event_binding_response",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            MessageType::SnapshotRequest => 0,
            MessageType::ChangeRequest => 1,
            MessageType::DeviceInfoRequest => 2,
            MessageType::TweakRequest => 3,
            MessageType::ClearRequest => 4,
            MessageType::BindingRequest => 5,
            MessageType::Disconnect => 6,
            MessageType::SnapshotResponse => 10,
            MessageType::ChangeResponse => 11,
            MessageType::DeviceInfoResponse => 12,
            MessageType::TweakResponse => 13,
            MessageType::ClearResponse => 14,
            MessageType::BindingResponse => 15,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| u64::from(t.code()) == code)
    }

    /// True for messages the editor sends to the application.
    pub fn is_request(self) -> bool {
        self.code() < 10
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
