// SPDX-License-Identifier: MIT
//! The measure lifecycle trait.

use crate::api::HostApi;
use crate::command::Command;

/// One measure instance. The host drives every method sequentially for a
/// given instance; different instances may interleave in any order within
/// a tick.
///
/// `Send` is required because instances live in a process-wide table; the
/// host still never calls two lifecycle methods of the same instance
/// concurrently.
pub trait Measure: Send + Sized + 'static {
    /// Called once per instance. Allocate state and capture identity
    /// handles (measure name, skin) — do not read options here and do no
    /// expensive work.
    fn create(api: &HostApi) -> Self;

    /// Read and validate every option this instance needs. Called at
    /// least once after [`Measure::create`] and possibly again at any
    /// time — even every tick — so it must be idempotent. Write a value
    /// greater than zero through `max_value` to report a derived upper
    /// bound for the measure's numeric output.
    fn reload(&mut self, api: &HostApi, max_value: &mut f64);

    /// Compute the tick value. No option reads here (they are only fresh
    /// in [`Measure::reload`]) and no unbounded blocking — a slow update
    /// stalls the host's whole update cycle. Precompute the string value
    /// here as well; [`Measure::string_value`] only hands it back.
    fn update(&mut self, api: &HostApi) -> f64;

    /// The string form of the last update, or `None` for "no string".
    /// Side-effect-free and idempotent; may be called several times per
    /// tick, or never.
    fn string_value(&self) -> Option<&str> {
        None
    }

    /// A skin- or user-issued command addressed to this measure. May
    /// arrive between any two updates.
    fn on_command(&mut self, api: &HostApi, command: Command<'_>) {
        let _ = (api, command);
    }

    /// Release everything this instance owns, including a shared parent
    /// context if this instance is the owner. The host context is no
    /// longer valid — no host callbacks from here.
    fn finalize(&mut self) {}
}
