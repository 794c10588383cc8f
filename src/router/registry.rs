//! Concurrent store of routing key to handler associations.
//!
//! Readers load an immutable [`RegistrySnapshot`] through `ArcSwap` and never
//! block. Writers serialize on a mutex, copy the current snapshot, apply their
//! change and publish the new snapshot atomically, so a reader sees either all
//! three indices before a registration or all three after it.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::key::RoutingKey;
use crate::error::MappingError;
use crate::handler::{DefaultNamingStrategy, HandlerDescriptor, HandlerNamingStrategy};

/// A registered key/handler pair. Created once and never mutated.
#[derive(Debug)]
pub struct MappingRegistration {
    key: RoutingKey,
    handler: HandlerDescriptor,
    direct_paths: Vec<String>,
    name: Option<String>,
    sequence: u64,
}

impl MappingRegistration {
    #[must_use]
    pub fn key(&self) -> &RoutingKey {
        &self.key
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerDescriptor {
        &self.handler
    }

    #[must_use]
    pub fn direct_paths(&self) -> &[String] {
        &self.direct_paths
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Position in registration order; lower registered earlier.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// One published generation of the registry.
#[derive(Debug, Default, Clone)]
pub struct RegistrySnapshot {
    registrations: Vec<Arc<MappingRegistration>>,
    by_key: HashMap<RoutingKey, Arc<MappingRegistration>>,
    path_lookup: HashMap<String, Vec<RoutingKey>>,
    name_lookup: HashMap<String, Vec<HandlerDescriptor>>,
    handler_names: HashMap<HandlerDescriptor, Vec<String>>,
}

impl RegistrySnapshot {
    /// All registrations in registration order.
    #[must_use]
    pub fn registrations(&self) -> &[Arc<MappingRegistration>] {
        &self.registrations
    }

    #[must_use]
    pub fn get(&self, key: &RoutingKey) -> Option<&Arc<MappingRegistration>> {
        self.by_key.get(key)
    }

    /// Keys registered under an exact literal path, in insertion order.
    #[must_use]
    pub fn direct(&self, path: &str) -> &[RoutingKey] {
        self.path_lookup.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn handlers_for_name(&self, name: &str) -> &[HandlerDescriptor] {
        self.name_lookup.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names the handler is registered under, first registration first.
    #[must_use]
    pub fn names_of(&self, handler: &HandlerDescriptor) -> &[String] {
        self.handler_names.get(handler).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn insert(&mut self, registration: Arc<MappingRegistration>) {
        for path in &registration.direct_paths {
            self.path_lookup
                .entry(path.clone())
                .or_default()
                .push(registration.key.clone());
        }
        if let Some(name) = &registration.name {
            let handlers = self.name_lookup.entry(name.clone()).or_default();
            if !handlers.contains(&registration.handler) {
                handlers.push(registration.handler.clone());
            }
            let names = self
                .handler_names
                .entry(registration.handler.clone())
                .or_default();
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        self.by_key
            .insert(registration.key.clone(), Arc::clone(&registration));
        self.registrations.push(registration);
    }

    fn remove(&mut self, key: &RoutingKey) -> Option<Arc<MappingRegistration>> {
        let removed = self.by_key.remove(key)?;
        self.registrations.retain(|r| !Arc::ptr_eq(r, &removed));
        for path in &removed.direct_paths {
            if let Some(keys) = self.path_lookup.get_mut(path) {
                keys.retain(|k| k != key);
                if keys.is_empty() {
                    self.path_lookup.remove(path);
                }
            }
        }
        if let Some(name) = &removed.name {
            let still_used = self
                .registrations
                .iter()
                .any(|r| r.name.as_ref() == Some(name) && r.handler == removed.handler);
            if !still_used {
                if let Some(handlers) = self.name_lookup.get_mut(name) {
                    handlers.retain(|h| h != &removed.handler);
                    if handlers.is_empty() {
                        self.name_lookup.remove(name);
                    }
                }
                if let Some(names) = self.handler_names.get_mut(&removed.handler) {
                    names.retain(|n| n != name);
                    if names.is_empty() {
                        self.handler_names.remove(&removed.handler);
                    }
                }
            }
        }
        Some(removed)
    }
}

/// The mapping registry.
pub struct MappingRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    writer: Mutex<u64>,
    naming: Arc<dyn HandlerNamingStrategy>,
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_naming_strategy(Arc::new(DefaultNamingStrategy))
    }

    #[must_use]
    pub fn with_naming_strategy(naming: Arc<dyn HandlerNamingStrategy>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            writer: Mutex::new(0),
            naming,
        }
    }

    /// Register a key/handler pair.
    ///
    /// Returns `Ok(false)` when the identical pair is already registered.
    ///
    /// # Errors
    ///
    /// [`MappingError::AmbiguousMapping`] when an equal key maps to a different
    /// handler. The registry is left unchanged.
    pub fn register(&self, key: RoutingKey, handler: HandlerDescriptor) -> Result<bool, MappingError> {
        let mut sequence = self.writer.lock();
        let current = self.snapshot.load_full();
        if let Some(existing) = current.get(&key) {
            if existing.handler == handler {
                debug!(key = %key, handler = %handler, "Mapping already registered");
                return Ok(false);
            }
            warn!(
                key = %key,
                handler = %handler,
                existing = %existing.handler,
                "Ambiguous mapping rejected"
            );
            return Err(MappingError::AmbiguousMapping {
                key: key.to_string(),
                new_handler: handler.to_string(),
                existing_handler: existing.handler.to_string(),
            });
        }

        let name = Some(self.naming.name(&handler, &key));
        let registration = Arc::new(MappingRegistration {
            direct_paths: key.direct_paths(),
            key,
            handler,
            name,
            sequence: *sequence,
        });
        *sequence += 1;

        let mut next = RegistrySnapshot::clone(&current);
        next.insert(Arc::clone(&registration));
        self.snapshot.store(Arc::new(next));
        debug!(
            key = %registration.key,
            handler = %registration.handler,
            name = ?registration.name,
            direct_paths = ?registration.direct_paths,
            "Mapped handler"
        );
        Ok(true)
    }

    /// Remove a key. Returns the registration that was removed, if any.
    pub fn unregister(&self, key: &RoutingKey) -> Option<Arc<MappingRegistration>> {
        let _guard = self.writer.lock();
        let mut next = RegistrySnapshot::clone(&self.snapshot.load());
        let removed = next.remove(key)?;
        self.snapshot.store(Arc::new(next));
        debug!(key = %key, handler = %removed.handler, "Unmapped handler");
        Some(removed)
    }

    /// The current snapshot. Holding it does not block writers.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Keys registered under an exact literal path.
    #[must_use]
    pub fn lookup_by_direct_path(&self, path: &str) -> Vec<RoutingKey> {
        self.snapshot.load().direct(path).to_vec()
    }

    /// Every registered key, in registration order.
    #[must_use]
    pub fn all_keys(&self) -> Vec<RoutingKey> {
        self.snapshot
            .load()
            .registrations()
            .iter()
            .map(|r| r.key.clone())
            .collect()
    }

    /// Every registration, in registration order.
    #[must_use]
    pub fn all_registrations(&self) -> Vec<Arc<MappingRegistration>> {
        self.snapshot.load().registrations().to_vec()
    }

    #[must_use]
    pub fn registration(&self, key: &RoutingKey) -> Option<Arc<MappingRegistration>> {
        self.snapshot.load().get(key).cloned()
    }

    /// Names under which the handler is registered.
    #[must_use]
    pub fn name_of(&self, handler: &HandlerDescriptor) -> Vec<String> {
        self.snapshot.load().names_of(handler).to_vec()
    }

    #[must_use]
    pub fn handlers_for_name(&self, name: &str) -> Vec<HandlerDescriptor> {
        self.snapshot.load().handlers_for_name(name).to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}
