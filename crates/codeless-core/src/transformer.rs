//! Value transformers.
//!
//! A data-binding layer converts argument values through named
//! transformers before handing them to the UI. Transformers are
//! registered explicitly into a [`TransformerRegistry`] which is passed
//! to the runtime at startup; there is no process-wide registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ActionError;

/// One-way or two-way conversion of untyped values.
pub trait ValueTransformer: Send + Sync {
    /// Forward conversion.
    fn transform(&self, value: Value) -> Result<Value, ActionError>;

    /// Whether [`reverse_transform`](Self::reverse_transform) is supported.
    fn allows_reverse(&self) -> bool {
        false
    }

    /// Reverse conversion. Only meaningful when `allows_reverse` is true.
    fn reverse_transform(&self, _value: Value) -> Option<Value> {
        None
    }
}

/// Returns its input unchanged. Declared one-directional and untyped.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransformer;

impl IdentityTransformer {
    /// Name under which [`TransformerRegistry::with_defaults`] registers it.
    pub const NAME: &'static str = "IdentityTransformer";
}

impl ValueTransformer for IdentityTransformer {
    fn transform(&self, value: Value) -> Result<Value, ActionError> {
        Ok(value)
    }
}

/// Named transformers available to action argument resolution.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn ValueTransformer>>,
}

impl TransformerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in transformers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IdentityTransformer::NAME, Arc::new(IdentityTransformer));
        registry
    }

    /// Register (or replace) a transformer under `name`.
    pub fn register(&mut self, name: impl Into<String>, transformer: Arc<dyn ValueTransformer>) {
        self.transformers.insert(name.into(), transformer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ValueTransformer>> {
        self.transformers.get(name).cloned()
    }

    /// Run `value` through the transformer registered as `name`.
    pub fn transform(&self, name: &str, value: Value) -> Result<Value, ActionError> {
        let transformer = self
            .transformers
            .get(name)
            .ok_or_else(|| ActionError::UnknownTransformer(name.to_string()))?;
        transformer.transform(value)
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("TransformerRegistry")
            .field("transformers", &names)
            .finish()
    }
}
