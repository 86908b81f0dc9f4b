// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The contract this bridge consumes from the native profiler.

use std::ffi::CStr;

use crate::location::InternedLocation;

/// Connection state of the external viewer, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Opaque per-zone token handed out by the backend when a zone begins and
/// consumed exactly once when it ends.
///
/// The bit pattern has meaning only to the backend that produced it, which
/// is why the type is deliberately not comparable or orderable. It is
/// `Copy` because the native ABI returns a plain-old-data context.
#[derive(Debug, Clone, Copy)]
pub struct ZoneHandle(u64);

impl ZoneHandle {
    /// Wraps a backend-defined bit pattern.
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Unwraps the backend-defined bit pattern.
    pub fn into_bits(self) -> u64 {
        self.0
    }
}

/// Everything the bridge asks of the native profiler.
///
/// Implementations must be callable from any thread; the bridge itself
/// never shares one instance between threads, it only relies on the
/// backend's own process-wide state being thread safe.
pub trait ProfilerBackend {
    /// Sets the calling thread's display label. The buffer is owned by the
    /// caller's thread state and stays valid until the thread exits; the
    /// backend may retain the pointer instead of copying.
    fn set_thread_name(&self, name: &CStr);

    /// Whether a viewer is currently attached and receiving the stream.
    fn is_connected(&self) -> bool;

    /// Creates a reusable location record for a call site and returns an
    /// opaque token for it. Called at most once per distinct zone identity
    /// per thread; the string buffers live in the caller's interning cache
    /// for the rest of the thread and may be retained by reference.
    fn intern_location(&self, line: u32, name: &CStr, function: &CStr, source_file: &CStr)
        -> u64;

    /// Begins a timed zone at a previously interned location.
    fn zone_begin(&self, location: &InternedLocation) -> ZoneHandle;

    /// Ends the zone the handle was issued for. Consumes the handle's one
    /// use; calling it twice with the same bits is a caller bug.
    fn zone_end(&self, handle: ZoneHandle);

    /// Overrides the display color of a live zone.
    fn zone_color(&self, handle: ZoneHandle, color: u32);

    /// Emits a frame boundary marker; `None` marks the unnamed main frame.
    fn frame_mark(&self, name: Option<&CStr>);

    /// Marks the start of a named discontinuous frame.
    fn frame_mark_start(&self, name: &CStr);

    /// Marks the end of a named discontinuous frame.
    fn frame_mark_end(&self, name: &CStr);
}

/// Backend with no viewer and no wire: always disconnected, drops every
/// call. Installed by `init_thread` when the `tracy` feature is off, and
/// handy for shipping instrumented code with profiling compiled out.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl ProfilerBackend for NoopBackend {
    fn set_thread_name(&self, _name: &CStr) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn intern_location(
        &self,
        _line: u32,
        _name: &CStr,
        _function: &CStr,
        _source_file: &CStr,
    ) -> u64 {
        0
    }

    fn zone_begin(&self, _location: &InternedLocation) -> ZoneHandle {
        ZoneHandle::from_bits(0)
    }

    fn zone_end(&self, _handle: ZoneHandle) {}

    fn zone_color(&self, _handle: ZoneHandle, _color: u32) {}

    fn frame_mark(&self, _name: Option<&CStr>) {}

    fn frame_mark_start(&self, _name: &CStr) {}

    fn frame_mark_end(&self, _name: &CStr) {}
}

#[cfg(feature = "tracy")]
pub(crate) fn default_backend() -> Box<dyn ProfilerBackend> {
    Box::new(crate::tracy::TracyBackend)
}

#[cfg(not(feature = "tracy"))]
pub(crate) fn default_backend() -> Box<dyn ProfilerBackend> {
    Box::new(NoopBackend)
}
