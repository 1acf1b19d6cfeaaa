// SPDX-License-Identifier: MIT
//! # `vane_host_harness` — In-process scripted Vane host
//!
//! Tests drive plugin export tables against this harness instead of a
//! running host. It builds real [`VaneContext`] vtables over an in-memory
//! skin model: option maps per section, `#Variable#` substitution,
//! formula evaluation with malformed-value diagnostics, a tempdir-backed
//! settings file, and capture of everything the plugin logs or executes.
//!
//! ```ignore
//! let mut host = TestHost::new();
//! let skin = host.add_skin("DeckA");
//! let m = host.add_measure(skin, "MyCounter", &[("StartValue", "5")]);
//!
//! let mut data = std::ptr::null_mut();
//! unsafe {
//!     vane_plugin_create(&mut data, host.context(m));
//!     let mut max = 0.0;
//!     vane_plugin_reload(data, host.context(m), &mut max);
//!     assert_eq!(vane_plugin_update(data), 5.0);
//!     vane_plugin_finalize(data);
//! }
//! ```
//!
//! The harness mimics the host's single driving loop: it never calls a
//! plugin itself, it only answers callbacks, so tests control the exact
//! lifecycle sequence.

pub mod formula;

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core::ffi::{c_char, c_void};

use once_cell::sync::Lazy;
use regex::Regex;

use vane_plugin_abi::READ_SUBSTITUTE_VARIABLES;

pub use vane_plugin_abi::{LogLevel, VaneContext};

static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([A-Za-z_][A-Za-z0-9_]*)#").expect("variable regex"));

// ─── Identities ──────────────────────────────────────────────────────────────

/// Identity of a scripted skin. Its pointer form is what plugins see from
/// the `skin` callback and pass back to `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinId(usize);

impl SkinId {
    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// Identity of a scripted measure inside the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureId(usize);

// ─── Host model ──────────────────────────────────────────────────────────────

struct Skin {
    name: String,
    window: usize,
    /// Variable name (lowercased) → value.
    variables: HashMap<String, String>,
    /// Section name (lowercased) → option key (lowercased) → value.
    sections: HashMap<String, HashMap<String, String>>,
}

struct HostState {
    skins: HashMap<usize, Skin>,
    logs: Vec<(LogLevel, String)>,
    commands: Vec<(SkinId, String)>,
    settings_file: PathBuf,
    base_dir: PathBuf,
}

impl HostState {
    fn lookup_option(&self, skin: usize, section: &str, key: &str) -> Option<String> {
        self.skins
            .get(&skin)?
            .sections
            .get(&section.to_lowercase())?
            .get(&key.to_lowercase())
            .cloned()
    }

    fn substitute(&self, skin: usize, input: &str) -> String {
        let Some(skin) = self.skins.get(&skin) else {
            return input.to_owned();
        };
        VARIABLE_RE
            .replace_all(input, |caps: &regex::Captures<'_>| {
                match skin.variables.get(&caps[1].to_lowercase()) {
                    Some(value) => value.clone(),
                    // Unknown variable: leave the reference untouched.
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }

    fn log(&mut self, level: LogLevel, msg: String) {
        match level {
            LogLevel::Error => tracing::error!(target: "vane_host", "{msg}"),
            LogLevel::Warning => tracing::warn!(target: "vane_host", "{msg}"),
            LogLevel::Notice => tracing::info!(target: "vane_host", "{msg}"),
            LogLevel::Debug => tracing::debug!(target: "vane_host", "{msg}"),
        }
        self.logs.push((level, msg));
    }
}

/// Per-measure host-side state reached through `VaneContext::_inner`.
struct MeasureInner {
    shared: Arc<Mutex<HostState>>,
    skin: usize,
    name: String,
    /// Keeps the most recently returned string alive. Matches the ABI
    /// contract: a returned pointer is valid only until the next callback
    /// on the same context.
    stash: Mutex<CString>,
}

impl MeasureInner {
    fn state(&self) -> MutexGuard<'_, HostState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stash(&self, value: String) -> *const c_char {
        let c = CString::new(value.replace('\0', " ")).unwrap_or_default();
        let mut slot = self.stash.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = c;
        slot.as_ptr()
    }
}

struct MeasureSlot {
    ctx: VaneContext,
    inner: MeasureInner,
}

// ─── Callbacks ───────────────────────────────────────────────────────────────

unsafe fn inner_of<'a>(ctx: *mut VaneContext) -> &'a MeasureInner {
    &*((*ctx)._inner as *const MeasureInner)
}

unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

/// Numeric parse shared by the int and formula reads: substitute, then
/// evaluate. A present but unparsable value logs a warning and yields
/// `None` so the caller falls back to its default.
fn numeric_option(inner: &MeasureInner, section: &str, key: &str) -> Option<Option<f64>> {
    let mut state = inner.state();
    let raw = state.lookup_option(inner.skin, section, key)?;
    let substituted = state.substitute(inner.skin, &raw);
    match formula::eval(&substituted) {
        Some(value) => Some(Some(value)),
        None => {
            state.log(
                LogLevel::Warning,
                format!("{section}: option '{key}' is not a valid number: '{substituted}'"),
            );
            Some(None)
        }
    }
}

unsafe extern "C" fn cb_read_string(
    ctx: *mut VaneContext,
    key: *const c_char,
    default_value: *const c_char,
    flags: u32,
) -> *const c_char {
    let inner = inner_of(ctx);
    let Some(key) = c_str(key) else {
        return default_value;
    };
    let state = inner.state();
    match state.lookup_option(inner.skin, &inner.name, key) {
        Some(value) => {
            let value = if flags & READ_SUBSTITUTE_VARIABLES != 0 {
                state.substitute(inner.skin, &value)
            } else {
                value
            };
            drop(state);
            inner.stash(value)
        }
        None => default_value,
    }
}

unsafe extern "C" fn cb_read_int(
    ctx: *mut VaneContext,
    key: *const c_char,
    default_value: i64,
) -> i64 {
    let inner = inner_of(ctx);
    let Some(key) = c_str(key) else {
        return default_value;
    };
    let name = inner.name.clone();
    match numeric_option(inner, &name, key) {
        Some(Some(value)) => value as i64,
        _ => default_value,
    }
}

unsafe extern "C" fn cb_read_formula(
    ctx: *mut VaneContext,
    key: *const c_char,
    default_value: f64,
) -> f64 {
    let inner = inner_of(ctx);
    let Some(key) = c_str(key) else {
        return default_value;
    };
    let name = inner.name.clone();
    match numeric_option(inner, &name, key) {
        Some(Some(value)) => value,
        _ => default_value,
    }
}

unsafe extern "C" fn cb_read_path(
    ctx: *mut VaneContext,
    key: *const c_char,
    default_value: *const c_char,
) -> *const c_char {
    let inner = inner_of(ctx);
    let Some(key) = c_str(key) else {
        return default_value;
    };
    let state = inner.state();
    match state.lookup_option(inner.skin, &inner.name, key) {
        Some(value) => {
            let value = state.substitute(inner.skin, &value);
            let resolved = if Path::new(&value).is_absolute() {
                PathBuf::from(value)
            } else {
                state.base_dir.join(value)
            };
            drop(state);
            inner.stash(resolved.to_string_lossy().into_owned())
        }
        None => default_value,
    }
}

unsafe extern "C" fn cb_replace_variables(
    ctx: *mut VaneContext,
    input: *const c_char,
) -> *const c_char {
    let inner = inner_of(ctx);
    let Some(input) = c_str(input) else {
        return std::ptr::null();
    };
    let substituted = inner.state().substitute(inner.skin, input);
    inner.stash(substituted)
}

unsafe extern "C" fn cb_measure_name(ctx: *mut VaneContext) -> *const c_char {
    let inner = inner_of(ctx);
    inner.stash(inner.name.clone())
}

unsafe extern "C" fn cb_skin(ctx: *mut VaneContext) -> *mut c_void {
    let inner = inner_of(ctx);
    inner.skin as *mut c_void
}

unsafe extern "C" fn cb_skin_name(ctx: *mut VaneContext) -> *const c_char {
    let inner = inner_of(ctx);
    let name = inner
        .state()
        .skins
        .get(&inner.skin)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    inner.stash(name)
}

unsafe extern "C" fn cb_skin_window(ctx: *mut VaneContext) -> *mut c_void {
    let inner = inner_of(ctx);
    let window = inner
        .state()
        .skins
        .get(&inner.skin)
        .map(|s| s.window)
        .unwrap_or(0);
    window as *mut c_void
}

unsafe extern "C" fn cb_settings_file(ctx: *mut VaneContext) -> *const c_char {
    let inner = inner_of(ctx);
    let path = inner.state().settings_file.to_string_lossy().into_owned();
    inner.stash(path)
}

unsafe extern "C" fn cb_execute(ctx: *mut VaneContext, skin: *mut c_void, command: *const c_char) {
    let inner = inner_of(ctx);
    let Some(command) = c_str(command) else {
        return;
    };
    inner
        .state()
        .commands
        .push((SkinId(skin as usize), command.to_owned()));
}

unsafe extern "C" fn cb_log(ctx: *mut VaneContext, level: LogLevel, msg: *const c_char) {
    let inner = inner_of(ctx);
    let msg = c_str(msg).unwrap_or("<invalid log message>").to_owned();
    inner.state().log(level, msg);
}

unsafe extern "C" fn cb_read_string_from_section(
    ctx: *mut VaneContext,
    section: *const c_char,
    key: *const c_char,
    default_value: *const c_char,
    flags: u32,
) -> *const c_char {
    let inner = inner_of(ctx);
    let (Some(section), Some(key)) = (c_str(section), c_str(key)) else {
        return default_value;
    };
    let state = inner.state();
    match state.lookup_option(inner.skin, section, key) {
        Some(value) => {
            let value = if flags & READ_SUBSTITUTE_VARIABLES != 0 {
                state.substitute(inner.skin, &value)
            } else {
                value
            };
            drop(state);
            inner.stash(value)
        }
        None => default_value,
    }
}

unsafe extern "C" fn cb_read_int_from_section(
    ctx: *mut VaneContext,
    section: *const c_char,
    key: *const c_char,
    default_value: i64,
) -> i64 {
    let inner = inner_of(ctx);
    let (Some(section), Some(key)) = (c_str(section), c_str(key)) else {
        return default_value;
    };
    match numeric_option(inner, section, key) {
        Some(Some(value)) => value as i64,
        _ => default_value,
    }
}

unsafe extern "C" fn cb_read_formula_from_section(
    ctx: *mut VaneContext,
    section: *const c_char,
    key: *const c_char,
    default_value: f64,
) -> f64 {
    let inner = inner_of(ctx);
    let (Some(section), Some(key)) = (c_str(section), c_str(key)) else {
        return default_value;
    };
    match numeric_option(inner, section, key) {
        Some(Some(value)) => value,
        _ => default_value,
    }
}

// ─── TestHost ────────────────────────────────────────────────────────────────

/// A scripted host instance. One per test.
pub struct TestHost {
    shared: Arc<Mutex<HostState>>,
    slots: Vec<*mut MeasureSlot>,
    next_skin: usize,
    /// When false, built contexts leave the v1.1 section-scoped read
    /// callbacks null, imitating an older host.
    section_reads: bool,
    _tmp: tempfile::TempDir,
}

impl TestHost {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create harness temp dir");
        let state = HostState {
            skins: HashMap::new(),
            logs: Vec::new(),
            commands: Vec::new(),
            settings_file: tmp.path().join("vane-settings.ini"),
            base_dir: tmp.path().to_path_buf(),
        };
        TestHost {
            shared: Arc::new(Mutex::new(state)),
            slots: Vec::new(),
            next_skin: 0,
            section_reads: true,
            _tmp: tmp,
        }
    }

    /// Imitate a host older than v1.1: no section-scoped reads. Applies
    /// to measures added afterwards.
    pub fn without_section_reads(mut self) -> Self {
        self.section_reads = false;
        self
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a skin. Each skin gets a distinct non-null handle and window.
    pub fn add_skin(&mut self, name: &str) -> SkinId {
        self.next_skin += 1;
        let id = 0x5000 + self.next_skin * 0x10;
        self.state().skins.insert(
            id,
            Skin {
                name: name.to_owned(),
                window: id + 1,
                variables: HashMap::new(),
                sections: HashMap::new(),
            },
        );
        SkinId(id)
    }

    /// Define or overwrite a `#Variable#` of a skin.
    pub fn set_variable(&mut self, skin: SkinId, name: &str, value: &str) {
        if let Some(skin) = self.state().skins.get_mut(&skin.0) {
            skin.variables
                .insert(name.to_lowercase(), value.to_owned());
        }
    }

    /// Add a plain named section (readable via the section-scoped reads).
    pub fn add_section(&mut self, skin: SkinId, section: &str, options: &[(&str, &str)]) {
        if let Some(skin) = self.state().skins.get_mut(&skin.0) {
            let entries = skin.sections.entry(section.to_lowercase()).or_default();
            for (key, value) in options {
                entries.insert(key.to_lowercase(), (*value).to_owned());
            }
        }
    }

    /// Add a measure section and build its host context.
    pub fn add_measure(
        &mut self,
        skin: SkinId,
        name: &str,
        options: &[(&str, &str)],
    ) -> MeasureId {
        self.add_section(skin, name, options);

        let inner = MeasureInner {
            shared: Arc::clone(&self.shared),
            skin: skin.0,
            name: name.to_owned(),
            stash: Mutex::new(CString::default()),
        };
        let ctx = VaneContext {
            _inner: std::ptr::null_mut(),
            read_string: cb_read_string,
            read_int: cb_read_int,
            read_formula: cb_read_formula,
            read_path: cb_read_path,
            replace_variables: cb_replace_variables,
            measure_name: cb_measure_name,
            skin: cb_skin,
            skin_name: cb_skin_name,
            skin_window: cb_skin_window,
            settings_file: cb_settings_file,
            execute: cb_execute,
            log: cb_log,
            read_string_from_section: self
                .section_reads
                .then_some(cb_read_string_from_section as _),
            read_int_from_section: self.section_reads.then_some(cb_read_int_from_section as _),
            read_formula_from_section: self
                .section_reads
                .then_some(cb_read_formula_from_section as _),
            _reserved: [std::ptr::null_mut(); 8],
        };

        let mut slot = Box::new(MeasureSlot { ctx, inner });
        slot.ctx._inner = (&mut slot.inner as *mut MeasureInner).cast();
        let raw = Box::into_raw(slot);
        self.slots.push(raw);
        MeasureId(self.slots.len() - 1)
    }

    /// Change one option of a section (measure sections included) — the
    /// value a subsequent reload will see.
    pub fn set_option(&mut self, skin: SkinId, section: &str, key: &str, value: &str) {
        self.add_section(skin, section, &[(key, value)]);
    }

    /// Remove an option entirely, making it read as absent.
    pub fn remove_option(&mut self, skin: SkinId, section: &str, key: &str) {
        if let Some(skin) = self.state().skins.get_mut(&skin.0) {
            if let Some(entries) = skin.sections.get_mut(&section.to_lowercase()) {
                entries.remove(&key.to_lowercase());
            }
        }
    }

    /// The context pointer to pass to the plugin's create/reload exports.
    /// Stays valid for the lifetime of the harness.
    pub fn context(&self, measure: MeasureId) -> *mut VaneContext {
        let slot = self.slots[measure.0];
        unsafe { std::ptr::addr_of_mut!((*slot).ctx) }
    }

    /// Path of the host-managed settings file (inside the harness tempdir).
    pub fn settings_file(&self) -> PathBuf {
        self.state().settings_file.clone()
    }

    /// Everything logged through the host so far.
    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.state().logs.clone()
    }

    /// Messages logged at one severity.
    pub fn logs_at(&self, level: LogLevel) -> Vec<String> {
        self.state()
            .logs
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear_logs(&self) {
        self.state().logs.clear();
    }

    /// Commands the plugin issued via the `execute` callback.
    pub fn executed_commands(&self) -> Vec<(SkinId, String)> {
        self.state().commands.clone()
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            drop(unsafe { Box::from_raw(slot) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_string(host: &TestHost, m: MeasureId, key: &str, default: &str, flags: u32) -> String {
        let ctx = host.context(m);
        let key = CString::new(key).unwrap();
        let def = CString::new(default).unwrap();
        let ptr =
            unsafe { ((*ctx).read_string)(ctx, key.as_ptr(), def.as_ptr(), flags) };
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn option_read_with_substitution() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        host.set_variable(skin, "Unit", "ms");
        let m = host.add_measure(skin, "M", &[("Label", "lat #Unit#")]);

        assert_eq!(
            read_string(&host, m, "Label", "", READ_SUBSTITUTE_VARIABLES),
            "lat ms"
        );
        // Raw read keeps the reference for deferred evaluation.
        assert_eq!(read_string(&host, m, "Label", "", 0), "lat #Unit#");
        // Absent option falls back to the default.
        assert_eq!(read_string(&host, m, "Missing", "dft", 0), "dft");
    }

    #[test]
    fn malformed_number_logs_warning_and_defaults() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        let m = host.add_measure(skin, "M", &[("Count", "banana")]);

        let ctx = host.context(m);
        let key = CString::new("Count").unwrap();
        let got = unsafe { ((*ctx).read_int)(ctx, key.as_ptr(), 7) };
        assert_eq!(got, 7);
        let warnings = host.logs_at(LogLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Count"));
        assert!(warnings[0].contains("banana"));
    }

    #[test]
    fn formula_read_evaluates_arithmetic() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        host.set_variable(skin, "Base", "10");
        let m = host.add_measure(skin, "M", &[("Step", "(#Base# + 2) * 2")]);

        let ctx = host.context(m);
        let key = CString::new("Step").unwrap();
        let got = unsafe { ((*ctx).read_formula)(ctx, key.as_ptr(), 0.0) };
        assert_eq!(got, 24.0);
    }

    #[test]
    fn identity_callbacks() {
        let mut host = TestHost::new();
        let a = host.add_skin("DeckA");
        let b = host.add_skin("DeckB");
        let ma = host.add_measure(a, "M", &[]);
        let mb = host.add_measure(b, "M", &[]);

        let ctx_a = host.context(ma);
        let ctx_b = host.context(mb);
        unsafe {
            assert_eq!(((*ctx_a).skin)(ctx_a), a.as_ptr());
            assert_eq!(((*ctx_b).skin)(ctx_b), b.as_ptr());
            assert_ne!(((*ctx_a).skin)(ctx_a), ((*ctx_b).skin)(ctx_b));

            let name = CStr::from_ptr(((*ctx_a).measure_name)(ctx_a));
            assert_eq!(name.to_str().unwrap(), "M");
            let skin_name = CStr::from_ptr(((*ctx_a).skin_name)(ctx_a));
            assert_eq!(skin_name.to_str().unwrap(), "DeckA");
            assert!(!((*ctx_a).skin_window)(ctx_a).is_null());
        }
    }

    #[test]
    fn execute_and_log_are_captured() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        let m = host.add_measure(skin, "M", &[]);

        let ctx = host.context(m);
        let cmd = CString::new("!Refresh").unwrap();
        let msg = CString::new("hello").unwrap();
        unsafe {
            ((*ctx).execute)(ctx, skin.as_ptr(), cmd.as_ptr());
            ((*ctx).log)(ctx, LogLevel::Notice, msg.as_ptr());
        }
        assert_eq!(
            host.executed_commands(),
            vec![(skin, "!Refresh".to_owned())]
        );
        assert_eq!(host.logs_at(LogLevel::Notice), vec!["hello".to_owned()]);
    }

    #[test]
    fn context_is_reachable_through_a_shared_reference() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        let m = host.add_measure(skin, "M", &[]);
        let n = host.add_measure(skin, "N", &[]);

        // Context lookup must not need &mut: plugins hold the pointer
        // while the test keeps only a shared borrow of the harness.
        let host = &host;
        assert!(!host.context(m).is_null());
        assert_eq!(host.context(m), host.context(m));
        assert_ne!(host.context(m), host.context(n));
    }

    #[test]
    fn legacy_host_nulls_section_reads() {
        let mut host = TestHost::new().without_section_reads();
        let skin = host.add_skin("DeckA");
        let m = host.add_measure(skin, "M", &[]);
        let ctx = host.context(m);
        unsafe {
            assert!((*ctx).read_string_from_section.is_none());
            assert!((*ctx).read_int_from_section.is_none());
            assert!((*ctx).read_formula_from_section.is_none());
        }
    }

    #[test]
    fn section_scoped_reads_see_other_sections() {
        let mut host = TestHost::new();
        let skin = host.add_skin("DeckA");
        host.add_section(skin, "Shared", &[("Color", "red")]);
        let m = host.add_measure(skin, "M", &[]);

        let ctx = host.context(m);
        let section = CString::new("Shared").unwrap();
        let key = CString::new("Color").unwrap();
        let def = CString::new("none").unwrap();
        let read = unsafe { (*ctx).read_string_from_section }.unwrap();
        let ptr = unsafe { read(ctx, section.as_ptr(), key.as_ptr(), def.as_ptr(), 0) };
        let got = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        assert_eq!(got, "red");
    }
}
