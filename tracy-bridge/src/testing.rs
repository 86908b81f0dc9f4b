// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory backend double for exercising the bridge without a native
//! profiler. Compiled for this crate's tests and behind the `test-utils`
//! feature for downstream ones.

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{ProfilerBackend, ZoneHandle};
use crate::location::InternedLocation;

/// Everything the bridge asked the backend to do, in call order. Zone
/// events carry the interning token of the zone's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    ThreadName(String),
    ZoneBegin(u64),
    ZoneEnd(u64),
    ZoneColor(u64, u32),
    FrameMark(Option<String>),
    FrameMarkStart(String),
    FrameMarkEnd(String),
}

/// Records every call and lets tests flip the viewer-connected flag.
/// Starts disconnected.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    connected: AtomicBool,
    next_token: AtomicU64,
    events: Mutex<Vec<BackendEvent>>,
    interned: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// All recorded calls, in order.
    pub fn events(&self) -> Vec<BackendEvent> {
        lock(&self.events).clone()
    }

    /// Zone names passed to `intern_location`, in interning order; the
    /// index of a name is the token zone events carry.
    pub fn interned(&self) -> Vec<String> {
        lock(&self.interned).clone()
    }

    pub fn intern_count(&self) -> usize {
        lock(&self.interned).len()
    }

    fn record(&self, event: BackendEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn text(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

impl ProfilerBackend for RecordingBackend {
    fn set_thread_name(&self, name: &CStr) {
        self.record(BackendEvent::ThreadName(text(name)));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn intern_location(
        &self,
        _line: u32,
        name: &CStr,
        _function: &CStr,
        _source_file: &CStr,
    ) -> u64 {
        lock(&self.interned).push(text(name));
        self.next_token.fetch_add(1, Ordering::SeqCst)
    }

    fn zone_begin(&self, location: &InternedLocation) -> ZoneHandle {
        self.record(BackendEvent::ZoneBegin(location.token()));
        ZoneHandle::from_bits(location.token())
    }

    fn zone_end(&self, handle: ZoneHandle) {
        self.record(BackendEvent::ZoneEnd(handle.into_bits()));
    }

    fn zone_color(&self, handle: ZoneHandle, color: u32) {
        self.record(BackendEvent::ZoneColor(handle.into_bits(), color));
    }

    fn frame_mark(&self, name: Option<&CStr>) {
        self.record(BackendEvent::FrameMark(name.map(text)));
    }

    fn frame_mark_start(&self, name: &CStr) {
        self.record(BackendEvent::FrameMarkStart(text(name)));
    }

    fn frame_mark_end(&self, name: &CStr) {
        self.record(BackendEvent::FrameMarkEnd(text(name)));
    }
}

impl ProfilerBackend for Arc<RecordingBackend> {
    fn set_thread_name(&self, name: &CStr) {
        (**self).set_thread_name(name);
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn intern_location(
        &self,
        line: u32,
        name: &CStr,
        function: &CStr,
        source_file: &CStr,
    ) -> u64 {
        (**self).intern_location(line, name, function, source_file)
    }

    fn zone_begin(&self, location: &InternedLocation) -> ZoneHandle {
        (**self).zone_begin(location)
    }

    fn zone_end(&self, handle: ZoneHandle) {
        (**self).zone_end(handle);
    }

    fn zone_color(&self, handle: ZoneHandle, color: u32) {
        (**self).zone_color(handle, color);
    }

    fn frame_mark(&self, name: Option<&CStr>) {
        (**self).frame_mark(name);
    }

    fn frame_mark_start(&self, name: &CStr) {
        (**self).frame_mark_start(name);
    }

    fn frame_mark_end(&self, name: &CStr) {
        (**self).frame_mark_end(name);
    }
}
