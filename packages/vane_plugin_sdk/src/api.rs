// SPDX-License-Identifier: MIT
//! Safe wrapper over the raw per-measure host context.
//!
//! Every method degrades to the caller-supplied default when the context
//! is null or the host predates an optional callback — option reads never
//! fail, they fall back (the host log is the only error channel).

use std::ffi::{CStr, CString};
use std::path::PathBuf;

use core::ffi::{c_char, c_void};

use vane_plugin_abi::{LogLevel, VaneContext, READ_SUBSTITUTE_VARIABLES};

/// Opaque identity of a skin (one host session). The same measure name
/// can recur across skins, so shared state must be keyed by skin + name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinHandle(usize);

impl SkinHandle {
    /// The null skin, returned when no host context is available.
    pub const NULL: SkinHandle = SkinHandle(0);

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        SkinHandle(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Safe handle to the host callback surface for one measure.
///
/// Valid from `create` until `finalize` begins. Copyable; a copy is just
/// another view of the same host context.
#[derive(Clone, Copy)]
pub struct HostApi {
    raw: *mut VaneContext,
}

impl HostApi {
    /// Wrap a raw context pointer received from the host.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a [`VaneContext`] that stays valid for the
    /// lifetime of this wrapper and every copy of it.
    pub unsafe fn from_raw(raw: *mut VaneContext) -> Self {
        HostApi { raw }
    }

    /// The underlying raw context pointer.
    pub fn raw(&self) -> *mut VaneContext {
        self.raw
    }

    fn ctx(&self) -> Option<&VaneContext> {
        unsafe { self.raw.as_ref() }
    }

    // ─── Option reads ────────────────────────────────────────────────────

    /// Read a string option with `#Variable#` substitution applied.
    pub fn read_string(&self, key: &str, default: &str) -> String {
        self.read_string_flags(key, default, READ_SUBSTITUTE_VARIABLES)
    }

    /// Read a string option verbatim, without variable substitution.
    /// Use this for command-argument options that are evaluated later.
    pub fn read_string_raw(&self, key: &str, default: &str) -> String {
        self.read_string_flags(key, default, 0)
    }

    fn read_string_flags(&self, key: &str, default: &str, flags: u32) -> String {
        let Some(ctx) = self.ctx() else {
            return default.to_owned();
        };
        let key = c_string(key);
        let def = c_string(default);
        let ptr = unsafe { (ctx.read_string)(self.raw, key.as_ptr(), def.as_ptr(), flags) };
        host_string(ptr).unwrap_or_else(|| default.to_owned())
    }

    /// Read an integer option. Absent or malformed values yield `default`
    /// (the host logs the malformed case).
    pub fn read_int(&self, key: &str, default: i64) -> i64 {
        let Some(ctx) = self.ctx() else {
            return default;
        };
        let key = c_string(key);
        unsafe { (ctx.read_int)(self.raw, key.as_ptr(), default) }
    }

    /// Read a numeric option with host-side formula evaluation.
    pub fn read_formula(&self, key: &str, default: f64) -> f64 {
        let Some(ctx) = self.ctx() else {
            return default;
        };
        let key = c_string(key);
        unsafe { (ctx.read_formula)(self.raw, key.as_ptr(), default) }
    }

    /// Read a path option, resolved by the host to an absolute path.
    pub fn read_path(&self, key: &str, default: &str) -> PathBuf {
        let Some(ctx) = self.ctx() else {
            return PathBuf::from(default);
        };
        let key = c_string(key);
        let def = c_string(default);
        let ptr = unsafe { (ctx.read_path)(self.raw, key.as_ptr(), def.as_ptr()) };
        PathBuf::from(host_string(ptr).unwrap_or_else(|| default.to_owned()))
    }

    // ─── Section-scoped reads (v1.1 hosts) ───────────────────────────────

    /// Read a string option from another named section of the same skin.
    /// Hosts older than v1.1 do not carry this callback; the default is
    /// returned then.
    pub fn read_string_from_section(&self, section: &str, key: &str, default: &str) -> String {
        let Some(ctx) = self.ctx() else {
            return default.to_owned();
        };
        let Some(read) = ctx.read_string_from_section else {
            return default.to_owned();
        };
        let section = c_string(section);
        let key = c_string(key);
        let def = c_string(default);
        let ptr = unsafe {
            read(
                self.raw,
                section.as_ptr(),
                key.as_ptr(),
                def.as_ptr(),
                READ_SUBSTITUTE_VARIABLES,
            )
        };
        host_string(ptr).unwrap_or_else(|| default.to_owned())
    }

    /// Section-scoped [`HostApi::read_int`]; default on pre-v1.1 hosts.
    pub fn read_int_from_section(&self, section: &str, key: &str, default: i64) -> i64 {
        let Some(ctx) = self.ctx() else {
            return default;
        };
        let Some(read) = ctx.read_int_from_section else {
            return default;
        };
        let section = c_string(section);
        let key = c_string(key);
        unsafe { read(self.raw, section.as_ptr(), key.as_ptr(), default) }
    }

    /// Section-scoped [`HostApi::read_formula`]; default on pre-v1.1 hosts.
    pub fn read_formula_from_section(&self, section: &str, key: &str, default: f64) -> f64 {
        let Some(ctx) = self.ctx() else {
            return default;
        };
        let Some(read) = ctx.read_formula_from_section else {
            return default;
        };
        let section = c_string(section);
        let key = c_string(key);
        unsafe { read(self.raw, section.as_ptr(), key.as_ptr(), default) }
    }

    // ─── Identity & environment ──────────────────────────────────────────

    /// Substitute `#Variable#` references in an arbitrary string.
    pub fn replace_variables(&self, input: &str) -> String {
        let Some(ctx) = self.ctx() else {
            return input.to_owned();
        };
        let c_input = c_string(input);
        let ptr = unsafe { (ctx.replace_variables)(self.raw, c_input.as_ptr()) };
        host_string(ptr).unwrap_or_else(|| input.to_owned())
    }

    /// Name of this measure instance as declared in the skin.
    pub fn measure_name(&self) -> String {
        let Some(ctx) = self.ctx() else {
            return String::new();
        };
        let ptr = unsafe { (ctx.measure_name)(self.raw) };
        host_string(ptr).unwrap_or_default()
    }

    /// Opaque handle of the skin containing this measure.
    pub fn skin(&self) -> SkinHandle {
        let Some(ctx) = self.ctx() else {
            return SkinHandle::NULL;
        };
        SkinHandle::from_ptr(unsafe { (ctx.skin)(self.raw) })
    }

    /// Display name of the skin containing this measure.
    pub fn skin_name(&self) -> String {
        let Some(ctx) = self.ctx() else {
            return String::new();
        };
        let ptr = unsafe { (ctx.skin_name)(self.raw) };
        host_string(ptr).unwrap_or_default()
    }

    /// Native window handle of the skin. Null when the host has no window
    /// for it (e.g. during tests).
    pub fn skin_window(&self) -> *mut c_void {
        let Some(ctx) = self.ctx() else {
            return std::ptr::null_mut();
        };
        unsafe { (ctx.skin_window)(self.raw) }
    }

    /// Path to the host-managed persistent settings file, or `None` when
    /// the host does not provide one.
    pub fn settings_file(&self) -> Option<PathBuf> {
        let ctx = self.ctx()?;
        let ptr = unsafe { (ctx.settings_file)(self.raw) };
        let path = host_string(ptr)?;
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }

    // ─── Commands & diagnostics ──────────────────────────────────────────

    /// Queue a command string into the given skin. Fire-and-forget.
    pub fn execute(&self, skin: SkinHandle, command: &str) {
        let Some(ctx) = self.ctx() else {
            return;
        };
        let command = c_string(command);
        unsafe { (ctx.execute)(self.raw, skin.as_ptr(), command.as_ptr()) };
    }

    /// Write a diagnostic to the host log.
    pub fn log(&self, level: LogLevel, msg: &str) {
        let Some(ctx) = self.ctx() else {
            return;
        };
        let msg = c_string(msg);
        unsafe { (ctx.log)(self.raw, level, msg.as_ptr()) };
    }

    pub fn log_error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    pub fn log_warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg);
    }

    pub fn log_notice(&self, msg: &str) {
        self.log(LogLevel::Notice, msg);
    }

    pub fn log_debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }
}

/// Copy a host-returned string immediately; the pointer is only valid
/// until the next callback on the same context.
fn host_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Build a C string; an embedded NUL is replaced rather than erroring.
fn c_string(s: &str) -> CString {
    CString::new(s)
        .unwrap_or_else(|_| CString::new(s.replace('\0', " ")).unwrap_or_default())
}
