//! Error types for the live-edit core.
//!
//! None of these escape a message handler: they are folded into the
//! `status` of the response sent back to the editor.

use thiserror::Error;

/// Why a single action, tweak or binding descriptor could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// A required descriptor field is missing or has the wrong shape.
    #[error("invalid descriptor: missing or malformed `{0}`")]
    InvalidDescriptor(&'static str),

    /// An argument named a transformer that is not registered.
    #[error("unknown value transformer `{0}`")]
    UnknownTransformer(String),

    /// The transformer rejected the argument value.
    #[error("transformer `{name}` rejected value: {reason}")]
    Transform { name: String, reason: String },

    /// The UI side could not apply the effect.
    #[error("view host failed: {0}")]
    Host(String),
}
