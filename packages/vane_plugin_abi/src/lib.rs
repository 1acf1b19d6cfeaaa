// SPDX-License-Identifier: MIT
//! # `vane_plugin_abi` — Stable C ABI for Vane Measure Plugins
//!
//! This crate defines the **stable** C ABI between the Vane host and its
//! dynamically-loaded measure plugins. The ABI is declared STABLE at v1.0.0
//! — no breaking changes will be made without a major version bump and a
//! compatibility shim.
//!
//! ## The contract in one paragraph
//!
//! The host dlopens a plugin binary and resolves the exports listed in
//! [`exports`] by name. For each measure instance it calls
//! `vane_plugin_create` with a per-measure [`VaneContext`], then
//! `vane_plugin_reload` at least once (and again whenever the measure's
//! options may have changed), then `vane_plugin_update` once per tick,
//! optionally `vane_plugin_get_string` / `vane_plugin_command`, and finally
//! `vane_plugin_finalize` exactly once. The plugin calls back into the host
//! through the function pointers carried by the context.
//!
//! ## ABI stability guarantee (v1.0.0)
//!
//! - All structs in this crate are `#[repr(C)]`.
//! - Function pointer signatures will not change in minor releases.
//! - New optional host callbacks may be added via reserved fields; plugins
//!   must treat null optional callbacks as "host too old" and degrade.
//! - The `vane_plugin_abi_version` export lets the host reject
//!   incompatible plugins at load time.

#[cfg(feature = "serde-support")]
pub mod manifest;

use core::ffi::{c_char, c_int, c_void};

/// ABI version baked into this crate. Plugins built against a different
/// major version will be rejected at load time.
pub const VANE_PLUGIN_ABI_VERSION: u32 = 1;

// ─── Log severities ──────────────────────────────────────────────────────────

/// Severity of a diagnostic sent through [`VaneContext::log`].
///
/// `Debug` messages are only written when the host runs with debug
/// logging enabled.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error = 1,
    Warning = 2,
    Notice = 3,
    Debug = 4,
}

// ─── Read flags ──────────────────────────────────────────────────────────────

/// Substitute `#Variable#` references in the value before returning it.
///
/// Pass `0` instead to read the raw option text — needed when a command
/// argument string must be kept unsubstituted for deferred evaluation.
pub const READ_SUBSTITUTE_VARIABLES: u32 = 1 << 0;

// ─── Per-measure host context ────────────────────────────────────────────────

/// Opaque per-measure handle the host passes to `vane_plugin_create` and
/// `vane_plugin_reload`.
///
/// The pointer stays valid from the create call until the finalize call
/// begins; it must not be used during or after finalize. Strings returned
/// by the callbacks are host-owned and valid only until the next callback
/// on the same context — copy them immediately.
#[repr(C)]
pub struct VaneContext {
    /// Pointer to internal host state. Treat as opaque.
    pub _inner: *mut c_void,

    /// Read a string option of the current measure.
    ///
    /// `flags` — see [`READ_SUBSTITUTE_VARIABLES`].
    /// Returns `default_value` (possibly the very same pointer) when the
    /// option is absent.
    pub read_string: unsafe extern "C" fn(
        ctx: *mut VaneContext,
        key: *const c_char,
        default_value: *const c_char,
        flags: u32,
    ) -> *const c_char,

    /// Read an integer option. A present but malformed value logs a
    /// warning on the host side and yields `default_value`.
    pub read_int:
        unsafe extern "C" fn(ctx: *mut VaneContext, key: *const c_char, default_value: i64) -> i64,

    /// Read a numeric option with host-side formula evaluation.
    pub read_formula:
        unsafe extern "C" fn(ctx: *mut VaneContext, key: *const c_char, default_value: f64) -> f64,

    /// Read a path option, resolved by the host to an absolute path.
    pub read_path: unsafe extern "C" fn(
        ctx: *mut VaneContext,
        key: *const c_char,
        default_value: *const c_char,
    ) -> *const c_char,

    /// Substitute `#Variable#` references in an arbitrary string.
    pub replace_variables:
        unsafe extern "C" fn(ctx: *mut VaneContext, input: *const c_char) -> *const c_char,

    /// Name of the current measure instance.
    pub measure_name: unsafe extern "C" fn(ctx: *mut VaneContext) -> *const c_char,

    /// Opaque handle of the skin (session) containing this measure.
    /// Needed for [`VaneContext::execute`] and for keying shared state —
    /// the same measure name can recur across independent skins.
    pub skin: unsafe extern "C" fn(ctx: *mut VaneContext) -> *mut c_void,

    /// Display name of the skin containing this measure.
    pub skin_name: unsafe extern "C" fn(ctx: *mut VaneContext) -> *const c_char,

    /// Native window handle of the skin, for plugins that draw or attach.
    pub skin_window: unsafe extern "C" fn(ctx: *mut VaneContext) -> *mut c_void,

    /// Path to the host-managed persistent key/value settings file.
    pub settings_file: unsafe extern "C" fn(ctx: *mut VaneContext) -> *const c_char,

    /// Queue a command string into the given skin. Fire-and-forget: no
    /// return value and no ordering guarantee relative to the measure's
    /// own subsequent ticks.
    pub execute:
        unsafe extern "C" fn(ctx: *mut VaneContext, skin: *mut c_void, command: *const c_char),

    /// Write a diagnostic to the host log.
    pub log: unsafe extern "C" fn(ctx: *mut VaneContext, level: LogLevel, msg: *const c_char),

    /// Read a string option from another named section of the same skin.
    /// Null on hosts older than v1.1 — degrade to the default.
    pub read_string_from_section: Option<
        unsafe extern "C" fn(
            ctx: *mut VaneContext,
            section: *const c_char,
            key: *const c_char,
            default_value: *const c_char,
            flags: u32,
        ) -> *const c_char,
    >,

    /// Section-scoped [`VaneContext::read_int`]. Null on hosts older than v1.1.
    pub read_int_from_section: Option<
        unsafe extern "C" fn(
            ctx: *mut VaneContext,
            section: *const c_char,
            key: *const c_char,
            default_value: i64,
        ) -> i64,
    >,

    /// Section-scoped [`VaneContext::read_formula`]. Null on hosts older than v1.1.
    pub read_formula_from_section: Option<
        unsafe extern "C" fn(
            ctx: *mut VaneContext,
            section: *const c_char,
            key: *const c_char,
            default_value: f64,
        ) -> f64,
    >,

    /// Reserved for future host functions. Must be set to null.
    pub _reserved: [*mut c_void; 8],
}

// ─── Plugin exports ──────────────────────────────────────────────────────────

/// `vane_plugin_abi_version() -> u32` — must return [`VANE_PLUGIN_ABI_VERSION`].
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// `vane_plugin_create(data, ctx)` — allocate instance state and write an
/// opaque instance handle through `data`. Must not read options.
pub type CreateFn = unsafe extern "C" fn(data: *mut *mut c_void, ctx: *mut VaneContext);

/// `vane_plugin_reload(data, ctx, max_value)` — (re)read options. Called at
/// least once after create, possibly every tick. Writing a value > 0
/// through `max_value` reports a derived upper bound for the measure.
pub type ReloadFn =
    unsafe extern "C" fn(data: *mut c_void, ctx: *mut VaneContext, max_value: *mut f64);

/// `vane_plugin_update(data) -> f64` — compute the tick value.
pub type UpdateFn = unsafe extern "C" fn(data: *mut c_void) -> f64;

/// `vane_plugin_get_string(data) -> *const c_char` — optional. Returns the
/// string computed by the preceding update, or null for "no string". The
/// pointer is valid until the plugin next produces a string.
pub type GetStringFn = unsafe extern "C" fn(data: *mut c_void) -> *const c_char;

/// `vane_plugin_command(data, args)` — optional. A skin- or user-issued
/// command addressed to this measure.
pub type CommandFn = unsafe extern "C" fn(data: *mut c_void, args: *const c_char);

/// `vane_plugin_finalize(data)` — release the instance. The context pointer
/// from create/reload is no longer valid here.
pub type FinalizeFn = unsafe extern "C" fn(data: *mut c_void);

/// Signature of plugin-chosen inline function exports, invoked when skin
/// text references the function by name with an argument list. The
/// returned pointer must stay valid until the next inline call.
pub type InlineFn = unsafe extern "C" fn(
    data: *mut c_void,
    argc: c_int,
    argv: *const *const c_char,
) -> *const c_char;

/// Export names the host resolves after loading a plugin binary.
pub mod exports {
    /// Required.
    pub const ABI_VERSION: &[u8] = b"vane_plugin_abi_version\0";
    /// Required.
    pub const CREATE: &[u8] = b"vane_plugin_create\0";
    /// Required.
    pub const RELOAD: &[u8] = b"vane_plugin_reload\0";
    /// Required.
    pub const UPDATE: &[u8] = b"vane_plugin_update\0";
    /// Optional — absent means the measure has no string value.
    pub const GET_STRING: &[u8] = b"vane_plugin_get_string\0";
    /// Optional — absent means the measure accepts no commands.
    pub const COMMAND: &[u8] = b"vane_plugin_command\0";
    /// Required.
    pub const FINALIZE: &[u8] = b"vane_plugin_finalize\0";
}
