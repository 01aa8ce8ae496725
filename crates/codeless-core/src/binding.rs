//! Event bindings: "emit event X when the view at path P is used".

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::ActionError;
use crate::host::ViewHost;
use crate::messages::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// A control firing its action (`"ui_control"`).
    Control,
    /// A table view row selection (`"ui_table_view"`).
    TableView,
}

impl BindingKind {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ui_control" => Some(BindingKind::Control),
            "ui_table_view" => Some(BindingKind::TableView),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodelessBinding {
    pub name: String,
    pub path: String,
    pub event_name: String,
    pub kind: BindingKind,
}

impl CodelessBinding {
    pub fn from_descriptor(descriptor: &Payload) -> Result<Self, ActionError> {
        let kind = descriptor
            .get("event_type")
            .and_then(Value::as_str)
            .and_then(BindingKind::from_wire)
            .ok_or(ActionError::InvalidDescriptor("event_type"))?;

        let path = descriptor
            .get("path")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("path"))?;

        let event_name = descriptor
            .get("event_name")
            .and_then(Value::as_str)
            .ok_or(ActionError::InvalidDescriptor("event_name"))?;

        let name = descriptor
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(CodelessBinding {
            name,
            path: path.to_string(),
            event_name: event_name.to_string(),
            kind,
        })
    }
}

/// The set of bindings currently live for a session.
#[derive(Debug, Default)]
pub struct BindingCollection {
    bindings: Vec<CodelessBinding>,
}

impl BindingCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &[CodelessBinding] {
        &self.bindings
    }

    /// Replace every binding with the ones described in `descriptors`.
    ///
    /// Old bindings are unbound before new ones are bound. Descriptors
    /// that fail to parse or bind are skipped and reported.
    pub fn update(&mut self, descriptors: &[Payload], host: &mut dyn ViewHost) -> Vec<ActionError> {
        let mut errors = Vec::new();
        let mut next = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match CodelessBinding::from_descriptor(descriptor) {
                Ok(binding) => next.push(binding),
                Err(e) => errors.push(e),
            }
        }

        for old in self.bindings.drain(..) {
            host.unbind(&old);
        }

        for binding in next {
            match host.bind(&binding) {
                Ok(()) => self.bindings.push(binding),
                Err(e) => errors.push(e),
            }
        }

        debug!(count = self.bindings.len(), "event bindings updated");
        errors
    }

    /// Unbind everything.
    pub fn cleanup(&mut self, host: &mut dyn ViewHost) {
        for old in self.bindings.drain(..) {
            host.unbind(&old);
        }
    }
}
