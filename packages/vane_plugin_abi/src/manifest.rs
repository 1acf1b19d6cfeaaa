// SPDX-License-Identifier: MIT
//! Plugin manifest format — `vane-plugin.json`.
//!
//! Every distributed plugin pack includes a `vane-plugin.json` manifest
//! next to the binary. The host reads this before loading the plugin.

use serde::{Deserialize, Serialize};

use crate::VANE_PLUGIN_ABI_VERSION;

/// Contents of a `vane-plugin.json` manifest file.
///
/// # Example
///
/// ```json
/// {
///   "name": "counter",
///   "version": "1.0.0",
///   "description": "Counts upward once per update tick",
///   "author": "Vane Contributors",
///   "entry": "libcounter.so",
///   "min_abi": 1
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin display name (e.g. `"counter"`).
    pub name: String,

    /// Semver version string (e.g. `"1.0.0"`).
    pub version: String,

    /// Plugin description shown in the host UI.
    #[serde(default)]
    pub description: String,

    /// Author or publisher identifier.
    #[serde(default)]
    pub author: String,

    /// Relative path to the plugin binary inside the pack.
    pub entry: String,

    /// Lowest host ABI version this plugin works with.
    #[serde(default = "default_min_abi")]
    pub min_abi: u32,
}

fn default_min_abi() -> u32 {
    VANE_PLUGIN_ABI_VERSION
}

impl PluginManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the manifest to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns true if a host speaking `host_abi` can load this plugin.
    pub fn is_compatible(&self, host_abi: u32) -> bool {
        self.min_abi <= host_abi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_manifest() {
        let json = r#"{
            "name": "counter",
            "version": "1.0.0",
            "entry": "libcounter.so"
        }"#;
        let m = PluginManifest::from_json(json).unwrap();
        assert_eq!(m.name, "counter");
        assert_eq!(m.min_abi, VANE_PLUGIN_ABI_VERSION);
        assert!(m.is_compatible(VANE_PLUGIN_ABI_VERSION));
    }

    #[test]
    fn future_min_abi_is_incompatible() {
        let json = r#"{
            "name": "counter",
            "version": "1.0.0",
            "entry": "libcounter.so",
            "min_abi": 99
        }"#;
        let m = PluginManifest::from_json(json).unwrap();
        assert!(!m.is_compatible(VANE_PLUGIN_ABI_VERSION));
    }

    #[test]
    fn roundtrip_serialization() {
        let m = PluginManifest {
            name: "parent-child".into(),
            version: "1.0.0".into(),
            description: "Shared parent context demo".into(),
            author: "Vane Contributors".into(),
            entry: "libparent_child.so".into(),
            min_abi: 1,
        };
        let json = m.to_json().unwrap();
        let m2 = PluginManifest::from_json(&json).unwrap();
        assert_eq!(m.name, m2.name);
        assert_eq!(m.min_abi, m2.min_abi);
    }
}
