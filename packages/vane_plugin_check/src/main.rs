// SPDX-License-Identifier: MIT
//! `vane-plugin-check` — load-check a plugin binary before shipping it.
//!
//! Verifies, in order:
//! 1. the binary dlopens,
//! 2. the required exports resolve by name,
//! 3. the reported ABI version matches this tool's,
//! 4. the manifest (if found) parses and is compatible,
//! 5. with `--smoke`, a full create/reload/update/get_string/finalize
//!    pass against a scripted host context survives.

use std::ffi::CStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use libloading::Library;
use tracing::{debug, info, warn};

use vane_host_harness::TestHost;
use vane_plugin_abi::manifest::PluginManifest;
use vane_plugin_abi::{
    exports, AbiVersionFn, CommandFn, CreateFn, FinalizeFn, GetStringFn, ReloadFn, UpdateFn,
    VANE_PLUGIN_ABI_VERSION,
};

#[derive(Parser)]
#[command(
    name = "vane-plugin-check",
    about = "Load-check a Vane plugin binary",
    version
)]
struct Args {
    /// Plugin binary (`.so` / `.dylib` / `.dll`) to check
    binary: PathBuf,

    /// Manifest to validate (default: vane-plugin.json next to the binary,
    /// when present)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Drive a full measure lifecycle against a scripted host context
    #[arg(long)]
    smoke: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VANE_LOG", default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log.clone())
        .compact()
        .init();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let plugin = CheckedPlugin::load(&args.binary)?;
    info!("required exports and ABI version ok");

    match args.manifest.clone().or_else(|| sibling_manifest(&args.binary)) {
        Some(path) => check_manifest(&path, &args.binary)?,
        None => debug!("no manifest found, skipping manifest checks"),
    }

    if args.smoke {
        smoke(&plugin)?;
        info!("smoke lifecycle ok");
    }

    println!("OK: {}", args.binary.display());
    Ok(())
}

/// A plugin binary with its required exports resolved. The function
/// pointers stay valid for as long as `_lib` is held.
struct CheckedPlugin {
    _lib: Library,
    create: CreateFn,
    reload: ReloadFn,
    update: UpdateFn,
    get_string: Option<GetStringFn>,
    finalize: FinalizeFn,
}

impl CheckedPlugin {
    fn load(binary: &Path) -> Result<Self> {
        // SAFETY: loading arbitrary native code is the point of this tool;
        // run it only on binaries you are about to ship.
        let lib = unsafe {
            Library::new(binary)
                .with_context(|| format!("failed to open plugin: {}", binary.display()))?
        };

        let abi_version: AbiVersionFn = *unsafe {
            lib.get(exports::ABI_VERSION)
                .context("plugin missing required `vane_plugin_abi_version` export")?
        };
        let reported = unsafe { abi_version() };
        if reported != VANE_PLUGIN_ABI_VERSION {
            bail!(
                "plugin ABI version mismatch: expected {}, got {}",
                VANE_PLUGIN_ABI_VERSION,
                reported
            );
        }

        let create: CreateFn = *unsafe {
            lib.get(exports::CREATE)
                .context("plugin missing required `vane_plugin_create` export")?
        };
        let reload: ReloadFn = *unsafe {
            lib.get(exports::RELOAD)
                .context("plugin missing required `vane_plugin_reload` export")?
        };
        let update: UpdateFn = *unsafe {
            lib.get(exports::UPDATE)
                .context("plugin missing required `vane_plugin_update` export")?
        };
        let finalize: FinalizeFn = *unsafe {
            lib.get(exports::FINALIZE)
                .context("plugin missing required `vane_plugin_finalize` export")?
        };

        let get_string = unsafe { lib.get::<GetStringFn>(exports::GET_STRING) }
            .ok()
            .map(|s| *s);
        if get_string.is_none() {
            debug!("no get_string export: measure is numeric-only");
        }
        if unsafe { lib.get::<CommandFn>(exports::COMMAND) }.is_err() {
            debug!("no command export: measure accepts no commands");
        }

        Ok(Self {
            _lib: lib,
            create,
            reload,
            update,
            get_string,
            finalize,
        })
    }
}

/// `vane-plugin.json` next to the binary, when it exists.
fn sibling_manifest(binary: &Path) -> Option<PathBuf> {
    let path = binary.parent()?.join("vane-plugin.json");
    path.exists().then_some(path)
}

fn check_manifest(path: &Path, binary: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest = PluginManifest::from_json(&json)
        .with_context(|| format!("invalid manifest: {}", path.display()))?;

    if !manifest.is_compatible(VANE_PLUGIN_ABI_VERSION) {
        bail!(
            "manifest requires ABI >= {}, this host speaks {}",
            manifest.min_abi,
            VANE_PLUGIN_ABI_VERSION
        );
    }
    if !entry_matches(&manifest.entry, binary) {
        warn!(
            entry = %manifest.entry,
            binary = %binary.display(),
            "manifest entry does not name this binary"
        );
    }

    info!(name = %manifest.name, version = %manifest.version, "manifest ok");
    Ok(())
}

/// True when the manifest's `entry` names the binary under check.
fn entry_matches(entry: &str, binary: &Path) -> bool {
    binary
        .file_name()
        .map(|name| name.to_string_lossy() == entry)
        .unwrap_or(false)
}

/// Drive one full measure lifecycle with a scripted host context. Any
/// crash here is the plugin's bug, found before a real skin loads it.
fn smoke(plugin: &CheckedPlugin) -> Result<()> {
    let mut host = TestHost::new();
    let skin = host.add_skin("CheckSkin");
    let m = host.add_measure(skin, "CheckMeasure", &[]);

    let mut data = ptr::null_mut();
    unsafe { (plugin.create)(&mut data, host.context(m)) };
    if data.is_null() {
        bail!("create wrote a null instance handle");
    }

    let mut max = 0.0;
    unsafe { (plugin.reload)(data, host.context(m), &mut max) };
    let first = unsafe { (plugin.update)(data) };
    let second = unsafe { (plugin.update)(data) };
    info!(first, second, max, "update ticks survived");

    if let Some(get_string) = plugin.get_string {
        let value = unsafe { get_string(data) };
        if value.is_null() {
            debug!("measure reports no string value");
        } else {
            let value = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();
            info!(value = %value, "string value");
        }
    }
    unsafe { (plugin.finalize)(data) };

    for (level, msg) in host.logs() {
        debug!(?level, msg, "plugin diagnostic during smoke run");
    }
    Ok(())
}
