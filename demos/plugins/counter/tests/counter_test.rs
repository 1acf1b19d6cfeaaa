// SPDX-License-Identifier: MIT
//! Counter plugin driven end to end through its C exports by the
//! scripted host.

use std::ffi::CStr;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use core::ffi::c_void;

use vane_counter::{
    vane_plugin_command, vane_plugin_create, vane_plugin_finalize, vane_plugin_get_string,
    vane_plugin_reload, vane_plugin_update,
};
use vane_host_harness::{LogLevel, MeasureId, TestHost};
use vane_plugin_sdk::profile;

/// String queries share the process-wide return buffer; serialize the
/// tests the way the host's single driving loop would.
static HOST_LOOP: Mutex<()> = Mutex::new(());

fn host_loop() -> MutexGuard<'static, ()> {
    HOST_LOOP.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Counter {
    data: *mut c_void,
}

impl Counter {
    fn create(host: &TestHost, m: MeasureId) -> Counter {
        let mut data = ptr::null_mut();
        unsafe { vane_plugin_create(&mut data, host.context(m)) };
        assert!(!data.is_null());
        Counter { data }
    }

    fn reload(&self, host: &TestHost, m: MeasureId) -> f64 {
        let mut max = 0.0;
        unsafe { vane_plugin_reload(self.data, host.context(m), &mut max) };
        max
    }

    fn update(&self) -> f64 {
        unsafe { vane_plugin_update(self.data) }
    }

    fn string(&self) -> String {
        let ptr = unsafe { vane_plugin_get_string(self.data) };
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    fn command(&self, args: &str) {
        let args = std::ffi::CString::new(args).unwrap();
        unsafe { vane_plugin_command(self.data, args.as_ptr()) };
    }

    fn finalize(&self) {
        unsafe { vane_plugin_finalize(self.data) };
    }
}

#[test]
fn start_value_seeds_the_count() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(
        skin,
        "Counter",
        &[("StartValue", "5"), ("Label", "hits:"), ("MaxValue", "100")],
    );

    let counter = Counter::create(&host, m);
    assert_eq!(counter.reload(&host, m), 100.0);

    assert_eq!(counter.update(), 5.0);
    assert_eq!(counter.string(), "hits:5");
    assert_eq!(counter.update(), 6.0);
    assert_eq!(counter.update(), 7.0);
    assert_eq!(counter.string(), "hits:7");

    counter.finalize();
}

#[test]
fn persisted_value_resumes_without_start_value() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[]);

    profile::write_value(&host.settings_file(), "Plugin_Counter", "DeckA.Counter", "9").unwrap();

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);

    assert_eq!(counter.update(), 9.0);
    assert_eq!(counter.update(), 10.0);
    assert_eq!(counter.update(), 11.0);

    counter.finalize();
}

#[test]
fn explicit_start_value_beats_the_persisted_one() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "0")]);

    profile::write_value(&host.settings_file(), "Plugin_Counter", "DeckA.Counter", "9").unwrap();

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    assert_eq!(counter.update(), 0.0);

    counter.finalize();
}

#[test]
fn reset_and_set_commands() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "5")]);

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    counter.update();
    counter.update();

    counter.command("Reset");
    assert_eq!(counter.update(), 0.0);

    counter.command("Set 40");
    assert_eq!(counter.update(), 40.0);

    counter.command("Set banana");
    assert!(host
        .logs_at(LogLevel::Warning)
        .iter()
        .any(|w| w.contains("numeric")));
    assert_eq!(counter.update(), 41.0);

    counter.finalize();
}

#[test]
fn pause_freezes_and_resume_continues() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "3")]);

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    assert_eq!(counter.update(), 3.0);

    counter.command("Pause");
    assert_eq!(counter.update(), 4.0);
    assert_eq!(counter.update(), 4.0);

    counter.command("Resume");
    assert_eq!(counter.update(), 4.0);
    assert_eq!(counter.update(), 5.0);

    counter.finalize();
}

#[test]
fn reload_with_unchanged_options_keeps_counting() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "5")]);

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    counter.update();
    counter.update();

    counter.reload(&host, m);
    assert_eq!(counter.update(), 7.0);

    counter.finalize();
}

#[test]
fn changed_start_value_reseeds_on_reload() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "5")]);

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    counter.update();
    counter.update();

    host.set_option(skin, "Counter", "StartValue", "100");
    counter.reload(&host, m);
    assert_eq!(counter.update(), 100.0);

    counter.finalize();
}

#[test]
fn malformed_increment_warns_and_defaults() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(
        skin,
        "Counter",
        &[("StartValue", "1"), ("Increment", "banana")],
    );

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);

    assert!(host
        .logs_at(LogLevel::Warning)
        .iter()
        .any(|w| w.contains("Increment")));
    assert_eq!(counter.update(), 1.0);
    assert_eq!(counter.update(), 2.0);

    counter.finalize();
}

#[test]
fn finalize_persists_the_next_value() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(skin, "Counter", &[("StartValue", "5")]);

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    counter.update();
    counter.update();
    counter.finalize();

    let stored = profile::read_value(&host.settings_file(), "Plugin_Counter", "DeckA.Counter")
        .unwrap();
    assert_eq!(stored.as_deref(), Some("7"));
}

#[test]
fn persist_zero_writes_nothing() {
    let _host_loop = host_loop();
    let mut host = TestHost::new();
    let skin = host.add_skin("DeckA");
    let m = host.add_measure(
        skin,
        "Counter",
        &[("StartValue", "5"), ("Persist", "0")],
    );

    let counter = Counter::create(&host, m);
    counter.reload(&host, m);
    counter.update();
    counter.finalize();

    let stored = profile::read_value(&host.settings_file(), "Plugin_Counter", "DeckA.Counter")
        .unwrap();
    assert_eq!(stored, None);
}
