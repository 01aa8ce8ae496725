//! codeless-core
//!
//! Pure live-edit logic:
//! - typed inbound/outbound messages
//! - variants (recorded UI actions and tweaks)
//! - per-connection session store
//! - the `ViewHost` seam the UI side implements
//! - value transformers used when resolving action arguments

pub mod action;
pub mod binding;
pub mod error;
pub mod host;
pub mod messages;
pub mod session;
pub mod transformer;
pub mod tweak;
pub mod variant;

pub use action::VariantAction;
pub use binding::{BindingCollection, BindingKind, CodelessBinding};
pub use error::ActionError;
pub use host::{DeviceInfo, FontFamily, HostEvent, RecordingHost, TweakInfo, ViewHost};
pub use messages::{
    BindingRequest,
    ChangeRequest,
    ClearRequest,
    InboundMessage,
    OutboundMessage,
    Payload,
    StatusResponse,
    TweakRequest,
    STATUS_ERROR,
    STATUS_OK,
};
pub use session::{SessionObject, SessionStore, EVENT_BINDINGS_KEY, SESSION_VARIANT_KEY};
pub use transformer::{IdentityTransformer, TransformerRegistry, ValueTransformer};
pub use tweak::{TweakValue, VariantTweak};
pub use variant::{ActionFailure, ApplyReport, SharedVariant, Variant};
