//! A single recorded UI mutation.
//!
//! Descriptor shape (as sent by the editor):
//!
//! ```text
//! {
//!   "name":          "optional, defaults to a fresh UUID",
//!   "path":          "/UIView/UIButton",            (required)
//!   "selector":      "setTitle:forState:",          (required)
//!   "args":          [["Buy", "IdentityTransformer"], 0],  (required)
//!   "original":      [...],                         (optional)
//!   "cacheOriginal": false                          (optional)
//! }
//! ```
//!
//! An argument shaped `[value, name]` where `name` is registered in the
//! [`TransformerRegistry`] is run through that transformer. Anything else,
//! including `[value, "NSString"]` type pairs and plain string lists, is
//! passed to the host unchanged.

use serde_json::Value;
use uuid::Uuid;

use crate::error::ActionError;
use crate::messages::Payload;
use crate::transformer::TransformerRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct VariantAction {
    /// Identity of the action within a variant.
    pub name: String,

    /// Selector path of the view(s) the action targets.
    pub path: String,

    /// Name of the mutation to invoke on matching views.
    pub selector: String,

    /// Raw arguments, unresolved.
    pub args: Vec<Value>,

    /// Arguments that restore the original state when the action stops.
    pub original: Option<Vec<Value>>,

    /// Whether the view host should cache the original value before applying.
    pub cache_original: bool,
}

impl VariantAction {
    /// Parse an action from an editor descriptor.
    pub fn from_descriptor(descriptor: &Payload) -> Result<Self, ActionError> {
        let path = descriptor
            .get("path")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("path"))?;

        let selector = descriptor
            .get("selector")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("selector"))?;

        let args = descriptor
            .get("args")
            .and_then(Value::as_array)
            .ok_or(ActionError::InvalidDescriptor("args"))?;

        // The editor sends "cacheOriginal" as the inverse of what we store.
        let cache_original = descriptor
            .get("cacheOriginal")
            .and_then(Value::as_bool)
            .map(|flag| !flag)
            .unwrap_or(false);

        let original = descriptor
            .get("original")
            .and_then(Value::as_array)
            .cloned();

        let name = descriptor
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(VariantAction {
            name,
            path: path.to_string(),
            selector: selector.to_string(),
            args: args.clone(),
            original,
            cache_original,
        })
    }

    /// Resolve every argument, running `[value, transformer]` pairs through
    /// the registry. Fails on the first argument a transformer rejects.
    pub fn resolve_args(
        &self,
        transformers: &TransformerRegistry,
    ) -> Result<Vec<Value>, ActionError> {
        self.args
            .iter()
            .map(|arg| resolve_arg(arg, transformers))
            .collect()
    }
}

fn resolve_arg(arg: &Value, transformers: &TransformerRegistry) -> Result<Value, ActionError> {
    match arg.as_array().map(Vec::as_slice) {
        Some([value, Value::String(name)]) => match transformers.get(name) {
            Some(transformer) => transformer.transform(value.clone()),
            None => Ok(arg.clone()),
        },
        _ => Ok(arg.clone()),
    }
}
