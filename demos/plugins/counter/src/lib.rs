// SPDX-License-Identifier: MIT
//! Counter measure: counts up by a configurable increment, survives
//! skin unloads through the host settings file, and answers `Reset`,
//! `Set`, `Pause` and `Resume` commands.
//!
//! Skin usage:
//!
//! ```ini
//! [MeasureHits]
//! Measure=Plugin
//! Plugin=Counter
//! StartValue=5
//! Increment=2
//! MaxValue=100
//! Label=hits:
//! ```

use std::path::PathBuf;

use vane_plugin_sdk::{profile, vane_plugin, Command, HostApi, Measure};

/// Section in the host settings file shared by every counter instance;
/// keys inside are `SkinName.MeasureName`.
const SETTINGS_SECTION: &str = "Plugin_Counter";

pub struct CounterMeasure {
    /// The value the next update will report.
    value: f64,
    increment: f64,
    paused: bool,
    label: String,
    persist: bool,
    /// `StartValue` as configured at the last reload, absent option
    /// included. Re-seeding happens only when this changes.
    start: Option<f64>,
    seeded: bool,
    display: String,
    persist_path: Option<PathBuf>,
    persist_key: String,
}

impl CounterMeasure {
    fn persisted_value(&self) -> Option<f64> {
        let path = self.persist_path.as_deref()?;
        profile::read_value(path, SETTINGS_SECTION, &self.persist_key)
            .ok()
            .flatten()?
            .parse()
            .ok()
    }
}

impl Measure for CounterMeasure {
    fn create(_api: &HostApi) -> Self {
        CounterMeasure {
            value: 0.0,
            increment: 1.0,
            paused: false,
            label: String::new(),
            persist: true,
            start: None,
            seeded: false,
            display: String::new(),
            persist_path: None,
            persist_key: String::new(),
        }
    }

    fn reload(&mut self, api: &HostApi, max_value: &mut f64) {
        self.increment = api.read_formula("Increment", 1.0);
        self.label = api.read_string("Label", "");
        self.persist = api.read_int("Persist", 1) != 0;

        let max = api.read_formula("MaxValue", 0.0);
        if max > 0.0 {
            *max_value = max;
        }

        // The host is unreachable from finalize, so capture the
        // persistence identity now.
        self.persist_key = format!("{}.{}", api.skin_name(), api.measure_name());
        self.persist_path = api.settings_file();

        // Absent and `StartValue=0` must read differently: absent means
        // "resume from the persisted value".
        let start = (!api.read_string_raw("StartValue", "").is_empty())
            .then(|| api.read_int("StartValue", 0) as f64);
        if !self.seeded {
            self.value = start
                .or_else(|| self.persisted_value())
                .unwrap_or(0.0);
            self.seeded = true;
        } else if start.is_some() && start != self.start {
            self.value = start.unwrap_or(0.0);
        }
        self.start = start;
    }

    fn update(&mut self, _api: &HostApi) -> f64 {
        let current = self.value;
        if !self.paused {
            self.value += self.increment;
        }
        self.display = format!("{}{}", self.label, format_value(current));
        current
    }

    fn string_value(&self) -> Option<&str> {
        Some(&self.display)
    }

    fn on_command(&mut self, api: &HostApi, command: Command<'_>) {
        if command.is("Reset") {
            self.value = 0.0;
        } else if command.is("Set") {
            match command.payload().trim().parse() {
                Ok(value) => self.value = value,
                Err(_) => api.log_warning("Set needs a numeric argument"),
            }
        } else if command.is("Pause") {
            self.paused = true;
        } else if command.is("Resume") {
            self.paused = false;
        } else {
            api.log_warning(&format!("unknown counter command: {}", command.raw()));
        }
    }

    fn finalize(&mut self) {
        if !self.persist {
            return;
        }
        if let Some(path) = &self.persist_path {
            let _ = profile::write_value(
                path,
                SETTINGS_SECTION,
                &self.persist_key,
                &format_value(self.value),
            );
        }
    }
}

/// Whole counts print without a trailing `.0`; fractional increments
/// keep their decimals.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

vane_plugin!(CounterMeasure);

#[cfg(test)]
mod tests {
    use super::format_value;

    #[test]
    fn whole_values_drop_the_decimal_point() {
        assert_eq!(format_value(7.0), "7");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(2.5), "2.5");
    }
}
