// SPDX-License-Identifier: MIT
//! Parent/child measure pattern: one measure per skin computes a set of
//! values, sibling measures reference it by name and pick one out.
//!
//! Skin usage:
//!
//! ```ini
//! [MeasureStats]            ; the parent: computes ValueA/B/C
//! Measure=Plugin
//! Plugin=ParentChild
//! ValueA=10
//! ValueB=20
//! ValueC=30
//!
//! [MeasureStatsB]           ; a child: reads one of the parent's values
//! Measure=Plugin
//! Plugin=ParentChild
//! Parent=MeasureStats
//! Source=B
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vane_plugin_sdk::{vane_plugin, HostApi, Measure, SharedRegistry, SkinHandle};

/// Parents across every skin that loaded this library. Keyed by the
/// owning measure's (skin, name).
static PARENTS: SharedRegistry<Mutex<ParentValues>> = SharedRegistry::new();

#[derive(Default)]
struct ParentValues {
    a: f64,
    b: f64,
    c: f64,
}

fn lock_values(shared: &Mutex<ParentValues>) -> MutexGuard<'_, ParentValues> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Source {
    A,
    B,
    C,
}

impl Source {
    fn parse(value: &str) -> Option<Source> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("A") => Some(Source::A),
            v if v.eq_ignore_ascii_case("B") => Some(Source::B),
            v if v.eq_ignore_ascii_case("C") => Some(Source::C),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Source::A => "A",
            Source::B => "B",
            Source::C => "C",
        }
    }

    fn pick(self, values: &ParentValues) -> f64 {
        match self {
            Source::A => values.a,
            Source::B => values.b,
            Source::C => values.c,
        }
    }
}

enum Role {
    /// Computes the values and owns the registry entry.
    Owner {
        shared: Arc<Mutex<ParentValues>>,
        skin: SkinHandle,
        name: String,
    },
    /// Reads through a resolved parent; `None` after a failed lookup.
    Child(Option<Arc<Mutex<ParentValues>>>),
}

pub struct ParentChildMeasure {
    role: Role,
    source: Source,
    display: String,
}

impl Measure for ParentChildMeasure {
    fn create(_api: &HostApi) -> Self {
        ParentChildMeasure {
            role: Role::Child(None),
            source: Source::A,
            display: String::new(),
        }
    }

    fn reload(&mut self, api: &HostApi, _max_value: &mut f64) {
        let source = api.read_string("Source", "A");
        self.source = match Source::parse(&source) {
            Some(source) => source,
            None => {
                api.log_warning(&format!("Source must be A, B or C, not '{source}'"));
                Source::A
            }
        };

        let parent = api.read_string("Parent", "");
        if parent.is_empty() {
            let shared = match &self.role {
                // Already the owner: refresh the shared values in place so
                // children keep their Arc across our reloads.
                Role::Owner { shared, .. } => Arc::clone(shared),
                Role::Child(_) => {
                    let shared = Arc::new(Mutex::new(ParentValues::default()));
                    PARENTS.register(api.skin(), &api.measure_name(), Arc::clone(&shared));
                    shared
                }
            };
            {
                let mut values = lock_values(&shared);
                values.a = api.read_formula("ValueA", 0.0);
                values.b = api.read_formula("ValueB", 0.0);
                values.c = api.read_formula("ValueC", 0.0);
            }
            self.role = Role::Owner {
                shared,
                skin: api.skin(),
                name: api.measure_name(),
            };
        } else {
            if let Role::Owner { shared: _, skin, name } = &self.role {
                // Reconfigured from owner to child: release the entry.
                PARENTS.unregister(*skin, name);
            }
            let resolved = PARENTS.lookup(api.skin(), &parent);
            if resolved.is_none() {
                api.log_error(&format!("parent measure '{parent}' not found in this skin"));
            }
            self.role = Role::Child(resolved);
        }
    }

    fn update(&mut self, _api: &HostApi) -> f64 {
        let value = match &self.role {
            Role::Owner { shared, .. } => self.source.pick(&lock_values(shared)),
            Role::Child(Some(shared)) => self.source.pick(&lock_values(shared)),
            Role::Child(None) => 0.0,
        };
        self.display = value.to_string();
        value
    }

    fn string_value(&self) -> Option<&str> {
        Some(&self.display)
    }

    fn finalize(&mut self) {
        if let Role::Owner { skin, name, .. } = &self.role {
            PARENTS.unregister(*skin, name);
        }
    }
}

impl ParentChildMeasure {
    /// Inline function export: the source this measure reads from.
    fn source_name(&mut self, _api: &HostApi, _args: &[String]) -> String {
        self.source.name().to_owned()
    }
}

vane_plugin!(ParentChildMeasure, inline {
    parent_child_source => source_name,
});
