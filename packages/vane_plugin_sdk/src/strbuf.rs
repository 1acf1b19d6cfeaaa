// SPDX-License-Identifier: MIT
//! Process-wide return-string buffer.
//!
//! Strings cross the module boundary through one single-slot buffer so
//! the host never touches the plugin's allocator. The buffer belongs to
//! whichever instance most recently published; a published pointer is
//! valid only until the next publish. Producers serialize on the internal
//! lock, and the host's single driving loop guarantees no instance reads
//! a pointer after another instance has published over it within the same
//! call.

use std::sync::{Mutex, MutexGuard, PoisonError};

use core::ffi::c_char;

/// Single-slot buffer handing string values back to the host.
pub struct ReturnBuffer {
    bytes: Mutex<Vec<u8>>,
}

/// The buffer used by the generated string-query and inline-function
/// exports. One per loaded plugin library.
pub static RETURN_BUFFER: ReturnBuffer = ReturnBuffer::new();

impl ReturnBuffer {
    pub const fn new() -> Self {
        ReturnBuffer {
            bytes: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `value` into the buffer and return a NUL-terminated pointer.
    ///
    /// The pointer is valid until the next `publish` on this buffer.
    /// Interior NUL bytes are replaced with spaces — the boundary is a C
    /// string.
    pub fn publish(&self, value: &str) -> *const c_char {
        let mut bytes = self.lock();
        bytes.clear();
        bytes.extend(value.bytes().map(|b| if b == 0 { b' ' } else { b }));
        bytes.push(0);
        bytes.as_ptr() as *const c_char
    }
}

impl Default for ReturnBuffer {
    fn default() -> Self {
        Self::new()
    }
}
