// SPDX-License-Identifier: MIT
//! Boundary glue behind the generated export table.
//!
//! Each function here backs one C export produced by [`vane_plugin!`]:
//! it exchanges the opaque handle for the typed instance, runs the trait
//! method under `catch_unwind`, and converts any panic into a logged
//! error-severity diagnostic plus the neutral default. Nothing unwinds
//! across the ABI.

use std::ffi::CStr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use core::ffi::{c_char, c_int, c_void};

use vane_plugin_abi::VaneContext;

use crate::api::HostApi;
use crate::command::Command;
use crate::instances::InstanceTable;
use crate::measure::Measure;
use crate::strbuf::RETURN_BUFFER;

/// Create an instance and issue its handle. Returns null (an inert
/// instance, from the host's point of view) when creation panics.
///
/// # Safety
///
/// `ctx` must be null or a valid host context that outlives the instance.
pub unsafe fn create<M: Measure>(table: &InstanceTable<M>, ctx: *mut VaneContext) -> *mut c_void {
    let api = HostApi::from_raw(ctx);
    match catch_unwind(AssertUnwindSafe(|| M::create(&api))) {
        Ok(measure) => table.insert(measure, ctx),
        Err(_) => {
            api.log_error("plugin panicked during create; measure disabled");
            ptr::null_mut()
        }
    }
}

/// Re-read options. Also refreshes the stored context pointer, since the
/// host hands the current one to every reload.
///
/// # Safety
///
/// `ctx` as in [`create`]; `max_value` must be null or writable.
pub unsafe fn reload<M: Measure>(
    table: &InstanceTable<M>,
    data: *mut c_void,
    ctx: *mut VaneContext,
    max_value: *mut f64,
) {
    table.update_ctx(data, ctx);
    let api = HostApi::from_raw(ctx);
    let result = catch_unwind(AssertUnwindSafe(|| {
        table.with(data, |measure, _| {
            let mut max = if max_value.is_null() { 0.0 } else { *max_value };
            measure.reload(&api, &mut max);
            max
        })
    }));
    match result {
        Ok(Some(max)) => {
            if !max_value.is_null() {
                *max_value = max;
            }
        }
        Ok(None) => {}
        Err(_) => api.log_error("plugin panicked during reload; options unchanged"),
    }
}

/// Compute the tick value; 0.0 on panic or unknown handle.
///
/// # Safety
///
/// `data` must be a handle issued by [`create`] (or null).
pub unsafe fn update<M: Measure>(table: &InstanceTable<M>, data: *mut c_void) -> f64 {
    let result = catch_unwind(AssertUnwindSafe(|| {
        table.with(data, |measure, ctx| {
            let api = HostApi::from_raw(ctx);
            measure.update(&api)
        })
    }));
    match result {
        Ok(Some(value)) => value,
        Ok(None) => 0.0,
        Err(_) => {
            log_panic(table, data, "plugin panicked during update");
            0.0
        }
    }
}

/// Copy the precomputed string value into the return buffer; null means
/// "no string".
///
/// # Safety
///
/// `data` as in [`update`].
pub unsafe fn get_string<M: Measure>(
    table: &InstanceTable<M>,
    data: *mut c_void,
) -> *const c_char {
    let result = catch_unwind(AssertUnwindSafe(|| {
        table.with(data, |measure, _| {
            measure.string_value().map(|s| RETURN_BUFFER.publish(s))
        })
    }));
    match result {
        Ok(Some(Some(ptr))) => ptr,
        Ok(_) => ptr::null(),
        Err(_) => {
            log_panic(table, data, "plugin panicked during string query");
            ptr::null()
        }
    }
}

/// Parse the raw command argument once and dispatch it.
///
/// # Safety
///
/// `data` as in [`update`]; `args` must be null or NUL-terminated.
pub unsafe fn command<M: Measure>(table: &InstanceTable<M>, data: *mut c_void, args: *const c_char) {
    if args.is_null() {
        return;
    }
    let raw = CStr::from_ptr(args).to_string_lossy().into_owned();
    let result = catch_unwind(AssertUnwindSafe(|| {
        table.with(data, |measure, ctx| {
            let api = HostApi::from_raw(ctx);
            measure.on_command(&api, Command::parse(&raw));
        })
    }));
    if result.is_err() {
        log_panic(table, data, "plugin panicked during command");
    }
}

/// Release the instance. The host context is assumed gone, so a panic in
/// teardown has nowhere to be logged — it is swallowed, never unwound.
///
/// # Safety
///
/// `data` as in [`update`]; the handle is dead afterwards.
pub unsafe fn finalize<M: Measure>(table: &InstanceTable<M>, data: *mut c_void) {
    if let Some(mut measure) = table.remove(data) {
        let _ = catch_unwind(AssertUnwindSafe(move || {
            measure.finalize();
            drop(measure);
        }));
    }
}

/// Back an inline function export: marshal argv, run the mapped method,
/// publish its string. The returned pointer is valid until the next
/// publish, i.e. until the next inline or string-query call.
///
/// # Safety
///
/// `data` as in [`update`]; `argv` must point to `argc` NUL-terminated
/// strings (or be null with `argc == 0`).
pub unsafe fn inline_call<M: Measure>(
    table: &InstanceTable<M>,
    data: *mut c_void,
    argc: c_int,
    argv: *const *const c_char,
    f: fn(&mut M, &HostApi, &[String]) -> String,
) -> *const c_char {
    let args = collect_args(argc, argv);
    let result = catch_unwind(AssertUnwindSafe(|| {
        table.with(data, |measure, ctx| {
            let api = HostApi::from_raw(ctx);
            RETURN_BUFFER.publish(&f(measure, &api, &args))
        })
    }));
    match result {
        Ok(Some(ptr)) => ptr,
        Ok(None) => RETURN_BUFFER.publish(""),
        Err(_) => {
            log_panic(table, data, "plugin panicked during inline call");
            RETURN_BUFFER.publish("")
        }
    }
}

unsafe fn collect_args(argc: c_int, argv: *const *const c_char) -> Vec<String> {
    if argv.is_null() || argc <= 0 {
        return Vec::new();
    }
    (0..argc as usize)
        .map(|i| {
            let arg = *argv.add(i);
            if arg.is_null() {
                String::new()
            } else {
                CStr::from_ptr(arg).to_string_lossy().into_owned()
            }
        })
        .collect()
}

fn log_panic<M: Measure>(table: &InstanceTable<M>, data: *mut c_void, msg: &str) {
    if let Some(ctx) = table.ctx_of(data) {
        let api = unsafe { HostApi::from_raw(ctx) };
        api.log_error(msg);
    }
}

/// Generate the C export table for one measure type.
///
/// Plain form:
///
/// ```ignore
/// vane_plugin!(MyMeasure);
/// ```
///
/// With inline function exports (host-resolvable name → measure method of
/// signature `fn(&mut Self, &HostApi, &[String]) -> String`):
///
/// ```ignore
/// vane_plugin!(MyMeasure, inline {
///     my_plugin_status => status,
/// });
/// ```
///
/// One invocation per plugin library; it owns the instance table the
/// exports share.
#[macro_export]
macro_rules! vane_plugin {
    ($measure:ty) => {
        $crate::vane_plugin!($measure, inline {});
    };
    ($measure:ty, inline { $($export:ident => $method:ident),* $(,)? }) => {
        #[doc(hidden)]
        static __VANE_PLUGIN_INSTANCES: $crate::InstanceTable<$measure> =
            $crate::InstanceTable::new();

        #[no_mangle]
        pub extern "C" fn vane_plugin_abi_version() -> u32 {
            $crate::abi::VANE_PLUGIN_ABI_VERSION
        }

        /// # Safety
        /// Called by the Vane host with a valid per-measure context.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_create(
            data: *mut *mut ::core::ffi::c_void,
            ctx: *mut $crate::abi::VaneContext,
        ) {
            let handle = $crate::exports::create::<$measure>(&__VANE_PLUGIN_INSTANCES, ctx);
            if !data.is_null() {
                *data = handle;
            }
        }

        /// # Safety
        /// Called by the Vane host with a handle issued by create.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_reload(
            data: *mut ::core::ffi::c_void,
            ctx: *mut $crate::abi::VaneContext,
            max_value: *mut f64,
        ) {
            $crate::exports::reload::<$measure>(&__VANE_PLUGIN_INSTANCES, data, ctx, max_value);
        }

        /// # Safety
        /// Called by the Vane host with a handle issued by create.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_update(data: *mut ::core::ffi::c_void) -> f64 {
            $crate::exports::update::<$measure>(&__VANE_PLUGIN_INSTANCES, data)
        }

        /// # Safety
        /// Called by the Vane host with a handle issued by create.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_get_string(
            data: *mut ::core::ffi::c_void,
        ) -> *const ::core::ffi::c_char {
            $crate::exports::get_string::<$measure>(&__VANE_PLUGIN_INSTANCES, data)
        }

        /// # Safety
        /// Called by the Vane host with a handle issued by create and a
        /// NUL-terminated argument string.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_command(
            data: *mut ::core::ffi::c_void,
            args: *const ::core::ffi::c_char,
        ) {
            $crate::exports::command::<$measure>(&__VANE_PLUGIN_INSTANCES, data, args);
        }

        /// # Safety
        /// Called by the Vane host exactly once per instance; the handle
        /// is dead afterwards.
        #[no_mangle]
        pub unsafe extern "C" fn vane_plugin_finalize(data: *mut ::core::ffi::c_void) {
            $crate::exports::finalize::<$measure>(&__VANE_PLUGIN_INSTANCES, data);
        }

        $(
            /// # Safety
            /// Called by the Vane host with a handle issued by create and
            /// `argc` NUL-terminated argument strings.
            #[no_mangle]
            pub unsafe extern "C" fn $export(
                data: *mut ::core::ffi::c_void,
                argc: ::core::ffi::c_int,
                argv: *const *const ::core::ffi::c_char,
            ) -> *const ::core::ffi::c_char {
                $crate::exports::inline_call::<$measure>(
                    &__VANE_PLUGIN_INSTANCES,
                    data,
                    argc,
                    argv,
                    <$measure>::$method,
                )
            }
        )*
    };
}
