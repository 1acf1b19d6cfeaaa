// SPDX-License-Identifier: MIT
//! Opaque-handle table for measure instances.
//!
//! The host holds an opaque capability per instance; this table exchanges
//! it for the owned, strongly-typed measure on every call — explicit
//! create/lookup/release instead of casting raw pointers across the
//! boundary. Handles are slot indices offset by one so a null handle is
//! never issued.

use std::sync::{Mutex, MutexGuard, PoisonError};

use core::ffi::c_void;

use vane_plugin_abi::VaneContext;

struct Slot<M> {
    measure: M,
    /// Latest host context seen for this instance. Update, string-query,
    /// command, and inline calls receive only the data handle, so the
    /// context captured at create/reload is reached through here.
    ctx: *mut VaneContext,
}

/// Process-wide table mapping issued handles to owned instances.
///
/// Const-constructible so the `vane_plugin!` macro can place one in a
/// static per plugin library.
pub struct InstanceTable<M> {
    slots: Mutex<Vec<Option<Slot<M>>>>,
}

// SAFETY: the raw context pointer in each slot is only dereferenced on
// the host's driving thread, inside a lifecycle call for that instance.
// The table itself serializes all access through its mutex.
unsafe impl<M: Send> Send for InstanceTable<M> {}
unsafe impl<M: Send> Sync for InstanceTable<M> {}

impl<M> InstanceTable<M> {
    pub const fn new() -> Self {
        InstanceTable {
            slots: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<Slot<M>>>> {
        // A panic inside a lifecycle call is caught at the export; the
        // table stays usable afterwards.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a measure and issue its opaque handle.
    pub fn insert(&self, measure: M, ctx: *mut VaneContext) -> *mut c_void {
        let mut slots = self.lock();
        let slot = Slot { measure, ctx };
        let index = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = Some(slot);
                free
            }
            None => {
                slots.push(Some(slot));
                slots.len() - 1
            }
        };
        (index + 1) as *mut c_void
    }

    /// Refresh the stored context pointer (each reload hands us the
    /// current one).
    pub fn update_ctx(&self, handle: *mut c_void, ctx: *mut VaneContext) {
        let mut slots = self.lock();
        if let Some(slot) = Self::slot_mut(&mut slots, handle) {
            slot.ctx = ctx;
        }
    }

    /// The context most recently stored for this instance.
    pub fn ctx_of(&self, handle: *mut c_void) -> Option<*mut VaneContext> {
        let mut slots = self.lock();
        Self::slot_mut(&mut slots, handle).map(|slot| slot.ctx)
    }

    /// Run `f` with exclusive access to the instance behind `handle`.
    /// Returns `None` for unknown or already-released handles.
    pub fn with<R>(
        &self,
        handle: *mut c_void,
        f: impl FnOnce(&mut M, *mut VaneContext) -> R,
    ) -> Option<R> {
        let mut slots = self.lock();
        let slot = Self::slot_mut(&mut slots, handle)?;
        Some(f(&mut slot.measure, slot.ctx))
    }

    /// Release a handle, returning the owned measure for teardown.
    pub fn remove(&self, handle: *mut c_void) -> Option<M> {
        let mut slots = self.lock();
        let index = Self::index(handle)?;
        match slots.get_mut(index) {
            Some(slot) => slot.take().map(|s| s.measure),
            None => None,
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.lock().iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn index(handle: *mut c_void) -> Option<usize> {
        (handle as usize).checked_sub(1)
    }

    fn slot_mut<'a>(
        slots: &'a mut Vec<Option<Slot<M>>>,
        handle: *mut c_void,
    ) -> Option<&'a mut Slot<M>> {
        let index = Self::index(handle)?;
        slots.get_mut(index)?.as_mut()
    }
}

impl<M> Default for InstanceTable<M> {
    fn default() -> Self {
        Self::new()
    }
}
