//! Backend Registry module.
//!
//! Provides thread-safe in-memory storage of judge backends and the
//! capability used to reach each of them.

mod descriptor;
mod error;

pub use descriptor::*;
pub use error::*;

use crate::judge::Judge;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A registered backend: its descriptor plus the judge that reaches it.
#[derive(Clone)]
pub struct RegisteredBackend {
    pub descriptor: BackendDescriptor,
    pub judge: Arc<dyn Judge>,
}

impl fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl AsRef<BackendDescriptor> for RegisteredBackend {
    fn as_ref(&self) -> &BackendDescriptor {
        &self.descriptor
    }
}

/// The Backend Registry stores all known judge backends.
///
/// Reads are lock-free across entries (DashMap shards); enable, disable, and
/// configure take the write lock of a single entry only. The registry performs
/// no network calls.
///
/// # Examples
///
/// ```
/// use verdict::judge::StaticJudge;
/// use verdict::registry::{BackendDescriptor, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// registry
///     .register(
///         BackendDescriptor::new("judge-a", "local"),
///         Arc::new(StaticJudge::new(0.2, 0.9)),
///     )
///     .unwrap();
///
/// registry.disable("judge-a").unwrap();
/// assert_eq!(registry.backend_count(), 1);
/// assert!(registry.list(true).is_empty());
/// ```
pub struct Registry {
    backends: DashMap<String, RegisteredBackend>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    /// Register a new backend.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateBackend` if a backend with the same ID
    /// already exists, or `RegistryError::InvalidDescriptor` if the descriptor
    /// fails validation.
    pub fn register(
        &self,
        descriptor: BackendDescriptor,
        judge: Arc<dyn Judge>,
    ) -> Result<(), RegistryError> {
        descriptor.validate()?;

        match self.backends.entry(descriptor.id.clone()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateBackend(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    backend_id = %descriptor.id,
                    provider = %descriptor.provider_name,
                    "Registered backend"
                );
                entry.insert(RegisteredBackend { descriptor, judge });
                Ok(())
            }
        }
    }

    /// Register a backend, replacing any existing entry with the same ID.
    ///
    /// Returns the replaced descriptor, if there was one. Performance history
    /// lives outside the registry and is kept across replacement.
    pub fn register_replacing(
        &self,
        descriptor: BackendDescriptor,
        judge: Arc<dyn Judge>,
    ) -> Result<Option<BackendDescriptor>, RegistryError> {
        descriptor.validate()?;

        let id = descriptor.id.clone();
        let previous = self
            .backends
            .insert(id.clone(), RegisteredBackend { descriptor, judge })
            .map(|old| old.descriptor);

        if previous.is_some() {
            tracing::info!(backend_id = %id, "Replaced registered backend");
        }
        Ok(previous)
    }

    /// Include the backend in future dispatch selection.
    pub fn enable(&self, id: &str) -> Result<(), RegistryError> {
        self.set_enabled(id, true)
    }

    /// Exclude the backend from future dispatch selection.
    ///
    /// The backend stays registered and its performance history is untouched.
    pub fn disable(&self, id: &str) -> Result<(), RegistryError> {
        self.set_enabled(id, false)
    }

    /// Set the enabled flag of a backend.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut entry = self
            .backends
            .get_mut(id)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))?;

        if entry.descriptor.enabled != enabled {
            entry.descriptor.enabled = enabled;
            tracing::info!(backend_id = %id, enabled, "Backend enablement changed");
        }
        Ok(())
    }

    /// Update the static attributes of a backend.
    ///
    /// The patched descriptor is validated before it replaces the current one;
    /// on error the registry is left unchanged.
    pub fn configure(&self, id: &str, patch: &DescriptorPatch) -> Result<(), RegistryError> {
        let mut entry = self
            .backends
            .get_mut(id)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))?;

        let patched = entry.descriptor.patched(patch);
        patched.validate()?;
        entry.descriptor = patched;
        Ok(())
    }

    /// Get a copy of a backend's descriptor.
    pub fn get(&self, id: &str) -> Option<BackendDescriptor> {
        self.backends.get(id).map(|entry| entry.descriptor.clone())
    }

    /// Get a backend's descriptor together with its judge.
    pub fn get_entry(&self, id: &str) -> Option<RegisteredBackend> {
        self.backends.get(id).map(|entry| entry.value().clone())
    }

    /// List descriptors sorted by ID, optionally only enabled ones.
    pub fn list(&self, enabled_only: bool) -> Vec<BackendDescriptor> {
        self.entries(enabled_only)
            .into_iter()
            .map(|entry| entry.descriptor)
            .collect()
    }

    /// List registered backends sorted by ID, optionally only enabled ones.
    pub fn entries(&self, enabled_only: bool) -> Vec<RegisteredBackend> {
        let mut entries: Vec<RegisteredBackend> = self
            .backends
            .iter()
            .filter(|entry| !enabled_only || entry.descriptor.enabled)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.descriptor.id.cmp(&b.descriptor.id));
        entries
    }

    /// Check whether a backend is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    /// Get the number of registered backends, enabled or not.
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
