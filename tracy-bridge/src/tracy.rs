// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Backend over the in-process Tracy client.

use std::ffi::CStr;
use std::os::raw::c_int;

use tracy_client_sys as sys;

use crate::backend::{ProfilerBackend, ZoneHandle};
use crate::location::InternedLocation;

/// Bridges backend calls to the native Tracy client compiled into this
/// process. Stateless: the client library keeps its own global state and
/// is safe to call from any thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracyBackend;

fn pack(ctx: sys::TracyCZoneCtx) -> ZoneHandle {
    ZoneHandle::from_bits(u64::from(ctx.id) | (u64::from(ctx.active as u32) << 32))
}

fn unpack(handle: ZoneHandle) -> sys::TracyCZoneCtx {
    let bits = handle.into_bits();
    sys::TracyCZoneCtx {
        id: bits as u32,
        active: (bits >> 32) as u32 as c_int,
    }
}

impl ProfilerBackend for TracyBackend {
    fn set_thread_name(&self, name: &CStr) {
        // SAFETY: nul-terminated buffer owned by the caller's thread state;
        // Tracy may retain the pointer, and the buffer outlives the thread's
        // profiling session.
        unsafe { sys::___tracy_set_thread_name(name.as_ptr()) }
    }

    fn is_connected(&self) -> bool {
        // SAFETY: no preconditions.
        unsafe { sys::___tracy_connected() != 0 }
    }

    fn intern_location(
        &self,
        _line: u32,
        _name: &CStr,
        _function: &CStr,
        _source_file: &CStr,
    ) -> u64 {
        // Tracy consumes a srcloc allocation per zone begin, so the
        // reusable record is the C-string set itself; the per-begin
        // allocation happens in `zone_begin` from those cached buffers.
        0
    }

    fn zone_begin(&self, location: &InternedLocation) -> ZoneHandle {
        let name = location.name();
        let function = location.function();
        let source_file = location.source_file();
        // SAFETY: all pointers are nul-terminated buffers owned by the
        // caller's interning cache; lengths exclude the terminator. Tracy
        // copies them into the srcloc message before returning.
        let srcloc = unsafe {
            sys::___tracy_alloc_srcloc_name(
                location.line(),
                source_file.as_ptr(),
                source_file.to_bytes().len(),
                function.as_ptr(),
                function.to_bytes().len(),
                name.as_ptr(),
                name.to_bytes().len(),
                0,
            )
        };
        // SAFETY: the srcloc id was allocated above and is consumed exactly
        // once here.
        let ctx = unsafe { sys::___tracy_emit_zone_begin_alloc(srcloc, 1) };
        pack(ctx)
    }

    fn zone_end(&self, handle: ZoneHandle) {
        // SAFETY: the handle carries a context obtained from a zone begin
        // on this thread and is consumed exactly once.
        unsafe { sys::___tracy_emit_zone_end(unpack(handle)) }
    }

    fn zone_color(&self, handle: ZoneHandle, color: u32) {
        // SAFETY: the handle carries a context for a zone still open on
        // this thread.
        unsafe { sys::___tracy_emit_zone_color(unpack(handle), color) }
    }

    fn frame_mark(&self, name: Option<&CStr>) {
        let ptr = name.map_or(std::ptr::null(), CStr::as_ptr);
        // SAFETY: null marks the unnamed main frame; a non-null label is
        // interned by the caller and lives for the rest of the thread.
        unsafe { sys::___tracy_emit_frame_mark(ptr) }
    }

    fn frame_mark_start(&self, name: &CStr) {
        // SAFETY: label interned by the caller, valid for the thread's life.
        unsafe { sys::___tracy_emit_frame_mark_start(name.as_ptr()) }
    }

    fn frame_mark_end(&self, name: &CStr) {
        // SAFETY: label interned by the caller, valid for the thread's life.
        unsafe { sys::___tracy_emit_frame_mark_end(name.as_ptr()) }
    }
}
