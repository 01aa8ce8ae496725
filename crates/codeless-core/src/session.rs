//! Per-connection session store.
//!
//! A small synchronized map from well-known keys to session-scoped
//! objects. Every read and write of a key goes through the store's mutex,
//! so lazy creation via [`SessionStore::get_or_insert_with`] is
//! linearizable: of two racing creators exactly one wins and the other
//! observes its value.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::binding::BindingCollection;
use crate::variant::{SharedVariant, Variant};

/// Key of the live-edit variant.
pub const SESSION_VARIANT_KEY: &str = "session_variant";

/// Key of the event binding collection.
pub const EVENT_BINDINGS_KEY: &str = "event_bindings";

/// A value held in the session store.
#[derive(Debug, Clone)]
pub enum SessionObject {
    Variant(SharedVariant),
    Bindings(Arc<Mutex<BindingCollection>>),
}

impl SessionObject {
    pub fn as_variant(&self) -> Option<&SharedVariant> {
        match self {
            SessionObject::Variant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bindings(&self) -> Option<&Arc<Mutex<BindingCollection>>> {
        match self {
            SessionObject::Bindings(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    objects: Mutex<HashMap<String, SessionObject>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<SessionObject> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: SessionObject) {
        self.lock().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<SessionObject> {
        self.lock().remove(key)
    }

    /// Return the value under `key`, creating it with `make` if absent.
    ///
    /// The boolean is `true` when this call created the value. The check
    /// and the insert happen under one lock acquisition.
    pub fn get_or_insert_with<F>(&self, key: &str, make: F) -> (SessionObject, bool)
    where
        F: FnOnce() -> SessionObject,
    {
        let mut guard = self.lock();
        if let Some(existing) = guard.get(key) {
            return (existing.clone(), false);
        }
        let value = make();
        guard.insert(key.to_string(), value.clone());
        (value, true)
    }

    /// The session variant, if one has been created.
    pub fn variant(&self) -> Option<SharedVariant> {
        self.get(SESSION_VARIANT_KEY)
            .and_then(|obj| obj.as_variant().cloned())
    }

    /// The session variant, creating `Variant::new(0, 0)` on first use.
    pub fn variant_or_create(&self) -> (SharedVariant, bool) {
        let mut guard = self.lock();
        if let Some(variant) = guard.get(SESSION_VARIANT_KEY).and_then(SessionObject::as_variant) {
            return (Arc::clone(variant), false);
        }
        if guard.contains_key(SESSION_VARIANT_KEY) {
            warn!(key = SESSION_VARIANT_KEY, "replacing session object of the wrong kind");
        }
        let variant = Variant::new(0, 0).into_shared();
        guard.insert(
            SESSION_VARIANT_KEY.to_string(),
            SessionObject::Variant(Arc::clone(&variant)),
        );
        debug!("created session variant");
        (variant, true)
    }

    /// The event binding collection, creating an empty one on first use.
    pub fn bindings_or_create(&self) -> Arc<Mutex<BindingCollection>> {
        let mut guard = self.lock();
        if let Some(bindings) = guard.get(EVENT_BINDINGS_KEY).and_then(SessionObject::as_bindings) {
            return Arc::clone(bindings);
        }
        let bindings = Arc::new(Mutex::new(BindingCollection::new()));
        guard.insert(
            EVENT_BINDINGS_KEY.to_string(),
            SessionObject::Bindings(Arc::clone(&bindings)),
        );
        bindings
    }

    pub fn bindings(&self) -> Option<Arc<Mutex<BindingCollection>>> {
        self.get(EVENT_BINDINGS_KEY)
            .and_then(|obj| obj.as_bindings().cloned())
    }

    /// Drop every session object. Called when the connection ends.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
