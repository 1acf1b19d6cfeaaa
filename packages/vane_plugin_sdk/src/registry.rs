// SPDX-License-Identifier: MIT
//! Shared parent-context registry.
//!
//! One measure per logical group computes data the others read. The group
//! is identified by (skin, name): skins are independent sessions, so the
//! same name under two skins must never resolve to the same context.
//! Exactly one measure — the owner — registers and later unregisters the
//! entry; dependents hold non-owning `Arc` references.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::SkinHandle;

struct Entry<T> {
    skin: SkinHandle,
    name: String,
    shared: Arc<T>,
}

/// Process-wide registry of shared parent contexts, keyed by
/// (skin handle, case-insensitive name).
///
/// Const-constructible so a plugin library can hold one in a static.
pub struct SharedRegistry<T> {
    entries: Mutex<Vec<Entry<T>>>,
}

impl<T> SharedRegistry<T> {
    pub const fn new() -> Self {
        SharedRegistry {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `shared` under (skin, name), replacing any previous entry
    /// with the same identity (a reloading owner re-registers in place).
    pub fn register(&self, skin: SkinHandle, name: &str, shared: Arc<T>) {
        let mut entries = self.lock();
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.skin == skin && e.name.eq_ignore_ascii_case(name))
        {
            entry.shared = shared;
            return;
        }
        entries.push(Entry {
            skin,
            name: name.to_owned(),
            shared,
        });
    }

    /// Find the context registered under (skin, name). Name matching is
    /// case-insensitive; the skin must match exactly.
    pub fn lookup(&self, skin: SkinHandle, name: &str) -> Option<Arc<T>> {
        self.lock()
            .iter()
            .find(|e| e.skin == skin && e.name.eq_ignore_ascii_case(name))
            .map(|e| Arc::clone(&e.shared))
    }

    /// Remove the entry for (skin, name). Only the owning measure calls
    /// this, during its teardown.
    pub fn unregister(&self, skin: SkinHandle, name: &str) -> Option<Arc<T>> {
        let mut entries = self.lock();
        let index = entries
            .iter()
            .position(|e| e.skin == skin && e.name.eq_ignore_ascii_case(name))?;
        Some(entries.swap_remove(index).shared)
    }

    /// Number of registered contexts.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for SharedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
