//! Variants: a coherent bundle of recorded UI actions and tweaks.
//!
//! The live-edit session keeps exactly one variant (id 0, experiment 0)
//! in its session store. Every change request appends to it; the recorded
//! actions are replayed whenever the UI is rebuilt.
//!
//! A `Variant` is only ever mutated from the UI execution context. The
//! `SharedVariant` mutex exists so the session store can hand out a
//! reference; it is never contended by two mutators.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::action::VariantAction;
use crate::error::ActionError;
use crate::host::ViewHost;
use crate::messages::Payload;
use crate::transformer::TransformerRegistry;
use crate::tweak::VariantTweak;

pub type SharedVariant = Arc<Mutex<Variant>>;

/// One descriptor that could not be recorded or applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFailure {
    /// Position of the descriptor in the request.
    pub index: usize,
    /// Descriptor name, when it carried one.
    pub name: Option<String>,
    pub error: ActionError,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "#{} ({}): {}", self.index, name, self.error),
            None => write!(f, "#{}: {}", self.index, self.error),
        }
    }
}

/// Outcome of applying a batch of descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: usize,
    pub failures: Vec<ActionFailure>,
}

impl ApplyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    fn merge(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.failures.extend(other.failures);
    }
}

#[derive(Debug)]
pub struct Variant {
    id: u64,
    experiment_id: u64,
    /// Ordered by insertion; names are unique.
    actions: Vec<VariantAction>,
    tweaks: Vec<VariantTweak>,
    running: bool,
    finished: bool,
}

impl Variant {
    pub fn new(id: u64, experiment_id: u64) -> Self {
        Variant {
            id,
            experiment_id,
            actions: Vec::new(),
            tweaks: Vec::new(),
            running: false,
            finished: false,
        }
    }

    pub fn into_shared(self) -> SharedVariant {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn experiment_id(&self) -> u64 {
        self.experiment_id
    }

    pub fn actions(&self) -> &[VariantAction] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&VariantAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn tweaks(&self) -> &[VariantTweak] {
        &self.tweaks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record the actions described by `descriptors`, in order.
    ///
    /// With `execute`, each action is also applied to the live UI right
    /// away. A descriptor that fails to parse or apply is skipped and
    /// reported; the rest are still processed. An action whose name is
    /// already recorded replaces the old one and moves to the end.
    pub fn add_actions(
        &mut self,
        descriptors: &[Payload],
        execute: bool,
        host: &mut dyn ViewHost,
        transformers: &TransformerRegistry,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let outcome = VariantAction::from_descriptor(descriptor).and_then(|action| {
                if execute {
                    apply_action(&action, host, transformers)?;
                }
                Ok(action)
            });

            match outcome {
                Ok(action) => {
                    self.actions.retain(|existing| existing.name != action.name);
                    self.actions.push(action);
                    report.applied += 1;
                }
                Err(error) => {
                    let name = descriptor.get("name").and_then(Value::as_str).map(str::to_string);
                    warn!(index, ?name, %error, "skipping action");
                    report.failures.push(ActionFailure { index, name, error });
                }
            }
        }

        debug!(
            variant = self.id,
            recorded = self.actions.len(),
            applied = report.applied,
            failed = report.failures.len(),
            "actions added"
        );
        report
    }

    /// Stop and forget the action called `name`. Returns whether it existed.
    pub fn remove_action(&mut self, name: &str, host: &mut dyn ViewHost) -> bool {
        match self.actions.iter().position(|a| a.name == name) {
            Some(pos) => {
                let action = self.actions.remove(pos);
                host.revert_action(&action);
                true
            }
            None => false,
        }
    }

    /// Record the tweaks described by `descriptors`, applying them when
    /// `execute` is set. Same failure isolation as [`add_actions`](Self::add_actions).
    pub fn add_tweaks(
        &mut self,
        descriptors: &[Payload],
        execute: bool,
        host: &mut dyn ViewHost,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let outcome = VariantTweak::from_descriptor(descriptor).and_then(|tweak| {
                if execute {
                    host.apply_tweak(&tweak)?;
                }
                Ok(tweak)
            });

            match outcome {
                Ok(tweak) => {
                    self.tweaks.push(tweak);
                    report.applied += 1;
                }
                Err(error) => {
                    let name = descriptor.get("name").and_then(Value::as_str).map(str::to_string);
                    warn!(index, ?name, %error, "skipping tweak");
                    report.failures.push(ActionFailure { index, name, error });
                }
            }
        }
        report
    }

    /// Apply every recorded tweak and action once. No-op when already
    /// running or finished.
    pub fn execute(
        &mut self,
        host: &mut dyn ViewHost,
        transformers: &TransformerRegistry,
    ) -> ApplyReport {
        if self.running || self.finished {
            return ApplyReport::default();
        }
        let mut report = self.apply_tweaks(host);
        report.merge(self.apply_actions(host, transformers));
        self.running = true;
        report
    }

    /// Re-apply the recorded actions after the UI has been rebuilt (for
    /// example when a screen re-appears). Order matches recording order.
    pub fn reapply(
        &self,
        host: &mut dyn ViewHost,
        transformers: &TransformerRegistry,
    ) -> ApplyReport {
        if self.finished {
            return ApplyReport::default();
        }
        self.apply_actions(host, transformers)
    }

    /// Revert every action and tweak.
    pub fn stop(&mut self, host: &mut dyn ViewHost) {
        for action in &self.actions {
            host.revert_action(action);
        }
        for tweak in &self.tweaks {
            host.revert_tweak(tweak);
        }
        self.running = false;
    }

    /// Stop for good; later `execute` calls do nothing.
    pub fn finish(&mut self, host: &mut dyn ViewHost) {
        self.stop(host);
        self.finished = true;
    }

    fn apply_actions(
        &self,
        host: &mut dyn ViewHost,
        transformers: &TransformerRegistry,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (index, action) in self.actions.iter().enumerate() {
            match apply_action(action, host, transformers) {
                Ok(()) => report.applied += 1,
                Err(error) => report.failures.push(ActionFailure {
                    index,
                    name: Some(action.name.clone()),
                    error,
                }),
            }
        }
        report
    }

    fn apply_tweaks(&self, host: &mut dyn ViewHost) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (index, tweak) in self.tweaks.iter().enumerate() {
            match host.apply_tweak(tweak) {
                Ok(()) => report.applied += 1,
                Err(error) => report.failures.push(ActionFailure {
                    index,
                    name: Some(tweak.name.clone()),
                    error,
                }),
            }
        }
        report
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

fn apply_action(
    action: &VariantAction,
    host: &mut dyn ViewHost,
    transformers: &TransformerRegistry,
) -> Result<(), ActionError> {
    let args = action.resolve_args(transformers)?;
    host.apply_action(action, &args)
}
