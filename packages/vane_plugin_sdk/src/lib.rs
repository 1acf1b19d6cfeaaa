// SPDX-License-Identifier: MIT
//! # `vane_plugin_sdk` — Safe plugin-side SDK for the Vane widget host
//!
//! Implement the [`Measure`] trait, invoke [`vane_plugin!`], and the SDK
//! generates the C export table the host resolves after loading your
//! binary. The SDK owns all the unsafe marshaling: opaque instance
//! handles, host callback wrapping, the process-wide return-string
//! buffer, and panic containment at every boundary function.
//!
//! ```ignore
//! use vane_plugin_sdk::{vane_plugin, HostApi, Measure};
//!
//! struct Tick { value: f64, step: f64 }
//!
//! impl Measure for Tick {
//!     fn create(_api: &HostApi) -> Self {
//!         Tick { value: 0.0, step: 1.0 }
//!     }
//!     fn reload(&mut self, api: &HostApi, _max_value: &mut f64) {
//!         self.step = api.read_formula("Step", 1.0);
//!     }
//!     fn update(&mut self, _api: &HostApi) -> f64 {
//!         self.value += self.step;
//!         self.value
//!     }
//! }
//!
//! vane_plugin!(Tick);
//! ```
//!
//! ## Lifecycle rules the SDK enforces or expects
//!
//! - `create` runs before any option is readable; capture identity, do
//!   not read options there.
//! - `reload` may run again at any time, including every tick; it must be
//!   idempotent.
//! - `update` must not read options and must return quickly — it runs on
//!   the host's single driving loop. Offload slow work with [`Worker`].
//! - `string_value` hands back what `update` precomputed; it never
//!   recomputes.
//! - `finalize` must not call back into the host; the context is gone.
//! - A panic anywhere is caught at the export, logged through the host at
//!   error severity, and converted into the neutral default.

pub mod api;
pub mod command;
pub mod exports;
pub mod instances;
pub mod measure;
pub mod profile;
pub mod registry;
pub mod strbuf;
pub mod worker;

/// Re-export of the raw ABI crate, used by the generated export table.
pub use vane_plugin_abi as abi;

pub use abi::LogLevel;
pub use api::{HostApi, SkinHandle};
pub use command::Command;
pub use instances::InstanceTable;
pub use measure::Measure;
pub use registry::SharedRegistry;
pub use strbuf::ReturnBuffer;
pub use worker::{StopToken, Worker};
