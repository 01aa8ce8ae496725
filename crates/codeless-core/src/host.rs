//! The UI side of the live-edit channel.
//!
//! [`ViewHost`] is implemented by whatever owns the real views. All of its
//! methods are only ever called from the single UI execution context, so
//! implementations need `Send` (to move onto that context) but not `Sync`.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::action::VariantAction;
use crate::binding::CodelessBinding;
use crate::error::ActionError;
use crate::tweak::{TweakValue, VariantTweak};

pub trait ViewHost: Send {
    /// Apply `action` to every live view its path matches. `args` are
    /// already resolved through the transformer registry.
    fn apply_action(&mut self, action: &VariantAction, args: &[Value]) -> Result<(), ActionError>;

    /// Undo a previously applied action.
    fn revert_action(&mut self, action: &VariantAction);

    fn apply_tweak(&mut self, tweak: &VariantTweak) -> Result<(), ActionError>;

    fn revert_tweak(&mut self, tweak: &VariantTweak);

    /// Start emitting the binding's event.
    fn bind(&mut self, binding: &CodelessBinding) -> Result<(), ActionError>;

    fn unbind(&mut self, binding: &CodelessBinding);

    fn device_info(&self) -> DeviceInfo;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontFamily {
    pub family: String,
    pub font_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweakInfo {
    pub name: String,
    pub encoding: String,
    pub value: TweakValue,
    pub default: TweakValue,
    pub minimum: TweakValue,
    pub maximum: TweakValue,
}

/// Device and application description reported to the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub system_name: String,
    pub system_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_release: Option<String>,
    pub device_name: String,
    pub device_model: String,
    pub lib_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_version: Option<String>,
    pub available_font_families: Vec<FontFamily>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_bundle_identifier: Option<String>,
    pub tweaks: Vec<TweakInfo>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            system_name: std::env::consts::OS.to_string(),
            system_version: "unknown".to_string(),
            app_version: None,
            app_release: None,
            device_name: "headless".to_string(),
            device_model: std::env::consts::ARCH.to_string(),
            lib_language: "Rust".to_string(),
            lib_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            available_font_families: Vec::new(),
            main_bundle_identifier: None,
            tweaks: Vec::new(),
        }
    }
}

/// One observable effect performed by a [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Applied { name: String, selector: String, args: Vec<Value> },
    Reverted { name: String },
    TweakApplied { name: String, value: Option<TweakValue> },
    TweakReverted { name: String },
    Bound { name: String, event_name: String },
    Unbound { name: String },
}

/// A headless host that records every effect instead of touching views.
///
/// Used by the `codeless-session` binary when no real UI is attached, and
/// by tests to observe what was applied and in which order.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
    failing_selectors: HashSet<String>,
    tweaks: BTreeMap<String, (String, Option<TweakValue>)>,
    device: DeviceInfo,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every action with `selector` fail, simulating a view that
    /// does not respond to it.
    pub fn failing_on(mut self, selector: impl Into<String>) -> Self {
        self.failing_selectors.insert(selector.into());
        self
    }

    pub fn with_device_info(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }

    /// Shared view of the event log; stays valid after the host is moved
    /// onto the UI context.
    pub fn events(&self) -> Arc<Mutex<Vec<HostEvent>>> {
        Arc::clone(&self.events)
    }

    fn record(&self, event: HostEvent) {
        debug!(?event, "view host effect");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ViewHost for RecordingHost {
    fn apply_action(&mut self, action: &VariantAction, args: &[Value]) -> Result<(), ActionError> {
        if self.failing_selectors.contains(&action.selector) {
            return Err(ActionError::Host(format!(
                "no view at {} responds to {}",
                action.path, action.selector
            )));
        }
        info!(
            name = %action.name,
            path = %action.path,
            selector = %action.selector,
            "applying action"
        );
        self.record(HostEvent::Applied {
            name: action.name.clone(),
            selector: action.selector.clone(),
            args: args.to_vec(),
        });
        Ok(())
    }

    fn revert_action(&mut self, action: &VariantAction) {
        self.record(HostEvent::Reverted { name: action.name.clone() });
    }

    fn apply_tweak(&mut self, tweak: &VariantTweak) -> Result<(), ActionError> {
        let value = match &tweak.value {
            Some(v) => Some(v.clone()),
            None => self.tweaks.get(&tweak.name).and_then(|(_, v)| v.clone()),
        };
        self.tweaks
            .insert(tweak.name.clone(), (tweak.encoding.clone(), value.clone()));
        self.record(HostEvent::TweakApplied { name: tweak.name.clone(), value });
        Ok(())
    }

    fn revert_tweak(&mut self, tweak: &VariantTweak) {
        self.tweaks.remove(&tweak.name);
        self.record(HostEvent::TweakReverted { name: tweak.name.clone() });
    }

    fn bind(&mut self, binding: &CodelessBinding) -> Result<(), ActionError> {
        self.record(HostEvent::Bound {
            name: binding.name.clone(),
            event_name: binding.event_name.clone(),
        });
        Ok(())
    }

    fn unbind(&mut self, binding: &CodelessBinding) {
        self.record(HostEvent::Unbound { name: binding.name.clone() });
    }

    fn device_info(&self) -> DeviceInfo {
        let mut info = self.device.clone();
        info.tweaks = self
            .tweaks
            .iter()
            .filter_map(|(name, (encoding, value))| {
                let value = value.clone()?;
                Some(TweakInfo {
                    name: name.clone(),
                    encoding: encoding.clone(),
                    default: value.clone(),
                    minimum: value.clone(),
                    maximum: value.clone(),
                    value,
                })
            })
            .collect();
        info
    }
}
