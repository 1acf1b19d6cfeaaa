// SPDX-License-Identifier: MIT
//! `HostApi` against the scripted host: substitution, section reads,
//! identity, commands and the pre-v1.1 host fallback.

use vane_host_harness::{MeasureId, TestHost};
use vane_plugin_abi::LogLevel;
use vane_plugin_sdk::HostApi;

fn api(host: &TestHost, m: MeasureId) -> HostApi {
    unsafe { HostApi::from_raw(host.context(m)) }
}

#[test]
fn string_reads_substitute_variables() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    host.set_variable(skin, "user", "casey");
    let m = host.add_measure(skin, "Greeter", &[("Greeting", "hi #user#")]);

    let api = api(&host, m);
    assert_eq!(api.read_string("Greeting", ""), "hi casey");
    assert_eq!(api.read_string_raw("Greeting", ""), "hi #user#");
    assert_eq!(api.replace_variables("bye #user#"), "bye casey");
}

#[test]
fn absent_options_read_as_defaults() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Empty", &[]);

    let api = api(&host, m);
    assert_eq!(api.read_string("Missing", "fallback"), "fallback");
    assert_eq!(api.read_int("Missing", 42), 42);
    assert_eq!(api.read_formula("Missing", 2.5), 2.5);
}

#[test]
fn malformed_numbers_default_and_warn() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "M", &[("Count", "elephant")]);

    let api = api(&host, m);
    assert_eq!(api.read_int("Count", 3), 3);
    assert!(host
        .logs_at(LogLevel::Warning)
        .iter()
        .any(|w| w.contains("Count") && w.contains("elephant")));
}

#[test]
fn formula_options_are_evaluated() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    host.set_variable(skin, "base", "10");
    let m = host.add_measure(skin, "M", &[("Scale", "(#base#+2)*2")]);

    let api = api(&host, m);
    assert_eq!(api.read_formula("Scale", 0.0), 24.0);
}

#[test]
fn section_reads_reach_sibling_sections() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    host.add_section(skin, "Defaults", &[("Threshold", "70"), ("Color", "red")]);
    let m = host.add_measure(skin, "M", &[]);

    let api = api(&host, m);
    assert_eq!(api.read_int_from_section("Defaults", "Threshold", 0), 70);
    assert_eq!(api.read_formula_from_section("Defaults", "Threshold", 0.0), 70.0);
    assert_eq!(api.read_string_from_section("Defaults", "Color", ""), "red");
    assert_eq!(api.read_string_from_section("Nowhere", "Color", "none"), "none");
}

#[test]
fn legacy_host_without_section_reads_falls_back() {
    let mut host = TestHost::new().without_section_reads();
    let skin = host.add_skin("DeckA");
    host.add_section(skin, "Defaults", &[("Threshold", "70")]);
    let m = host.add_measure(skin, "M", &[]);

    let api = api(&host, m);
    assert_eq!(api.read_int_from_section("Defaults", "Threshold", -1), -1);
    assert_eq!(api.read_string_from_section("Defaults", "Threshold", "x"), "x");
}

#[test]
fn relative_paths_resolve_under_the_host_base() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "M", &[("File", "data.txt")]);

    let api = api(&host, m);
    let path = api.read_path("File", "");
    assert!(path.is_absolute(), "{path:?}");
    assert!(path.ends_with("data.txt"), "{path:?}");
}

#[test]
fn identity_matches_the_scripted_skin() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Probe", &[]);
    let other = host.add_measure(skin, "Probe2", &[]);

    let api_a = api(&host, m);
    let api_b = api(&host, other);
    assert_eq!(api_a.measure_name(), "Probe");
    assert_eq!(api_a.skin_name(), "DeckA");
    // Same skin, two measures: one handle.
    assert_eq!(api_a.skin(), api_b.skin());
    assert!(!api_a.skin().is_null());
    assert!(!api_a.skin_window().is_null());
}

#[test]
fn execute_queues_into_the_named_skin() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "M", &[]);

    let api = api(&host, m);
    api.execute(api.skin(), "!Refresh");

    let commands = host.executed_commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, skin);
    assert_eq!(commands[0].1, "!Refresh");
}

#[test]
fn log_levels_arrive_with_severity() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "M", &[]);

    let api = api(&host, m);
    api.log_error("broken");
    api.log_warning("iffy");
    api.log_notice("fyi");
    api.log_debug("detail");

    assert_eq!(host.logs_at(LogLevel::Error), vec!["broken".to_owned()]);
    assert_eq!(host.logs_at(LogLevel::Warning), vec!["iffy".to_owned()]);
    assert_eq!(host.logs_at(LogLevel::Notice), vec!["fyi".to_owned()]);
    assert_eq!(host.logs_at(LogLevel::Debug), vec!["detail".to_owned()]);
}

#[test]
fn settings_file_points_into_the_harness_dir() {
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "M", &[]);

    let api = api(&host, m);
    assert_eq!(api.settings_file(), Some(host.settings_file()));
}
