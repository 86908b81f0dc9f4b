// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-thread zone stack, interning cache, and connection gating.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::hash::BuildHasherDefault;
use std::thread;
use std::time::Duration;

use hashbrown::hash_map::EntryRef;
use tracing::debug;

use crate::backend::{default_backend, ConnectionStatus, ProfilerBackend, ZoneHandle};
use crate::error::ProfilerError;
use crate::location::{CallSite, InternedLocation, ZoneIdentity, ZoneIdentityRef};

type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<rustc_hash::FxHasher>>;

/// How often `sleep_until_connected` probes the backend.
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One entry per currently open zone. The connection decision made at push
/// time is recorded in the entry itself, so pop never has to consult the
/// (possibly since-changed) cached status.
enum OpenZone {
    Begun(ZoneHandle),
    Placeholder,
}

/// Profiling state owned by exactly one thread.
///
/// Usually managed through the thread registry ([`init_thread`] and the
/// module-level calls), but can also be constructed and passed around
/// explicitly. All state is thread-local by construction: no sharing, no
/// locking.
pub struct ThreadProfiler {
    backend: Box<dyn ProfilerBackend>,
    stack: Vec<OpenZone>,
    cache: FxHashMap<ZoneIdentity, InternedLocation>,
    frame_labels: FxHashMap<String, CString>,
    enabled: bool,
    connection: ConnectionStatus,
    // Owned for the life of the thread; the backend may retain the pointer.
    thread_name: CString,
}

impl ThreadProfiler {
    /// Fresh state over the default backend (Tracy when the `tracy` feature
    /// is on, otherwise a permanently disconnected no-op).
    pub fn new(thread_name: Option<&str>) -> Result<Self, ProfilerError> {
        Self::with_backend(default_backend(), thread_name)
    }

    /// Fresh state over an explicit backend.
    ///
    /// The display label falls back to the runtime thread name, then to a
    /// synthesized `Thread_<os id>`.
    pub fn with_backend(
        backend: Box<dyn ProfilerBackend>,
        thread_name: Option<&str>,
    ) -> Result<Self, ProfilerError> {
        let label = match thread_name {
            Some(name) => name.to_owned(),
            None => thread::current()
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Thread_{}", crate::threading::current_thread_id())),
        };
        let thread_name = CString::new(label)?;
        backend.set_thread_name(&thread_name);
        debug!(thread = ?thread_name, "profiler thread state initialised");
        Ok(Self {
            backend,
            stack: Vec::new(),
            cache: FxHashMap::default(),
            frame_labels: FxHashMap::default(),
            enabled: true,
            connection: ConnectionStatus::Disconnected,
            thread_name,
        })
    }

    /// The display label handed to the backend.
    pub fn thread_label(&self) -> &CStr {
        &self.thread_name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Number of currently open zones on this thread.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Connection status as of the last empty-stack refresh.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    /// Toggles profiling for this thread.
    ///
    /// Disabling with zones still open would orphan them, so it errors and
    /// leaves the enabled state unchanged.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ProfilerError> {
        if !enabled && !self.stack.is_empty() {
            return Err(ProfilerError::ZonesStillOpen(self.stack.len()));
        }
        if self.enabled != enabled {
            debug!(enabled, "profiler toggled");
        }
        self.enabled = enabled;
        Ok(())
    }

    /// Opens a zone. No-op while disabled.
    ///
    /// The cached connection status is refreshed only when the stack is
    /// empty, so a viewer attaching halfway through a nested region never
    /// produces partially instrumented nesting. While disconnected the push
    /// costs one `Vec` push and touches neither the cache nor the backend.
    pub fn push_zone(
        &mut self,
        name: &str,
        color: Option<u32>,
        site: CallSite<'_>,
    ) -> Result<(), ProfilerError> {
        if !self.enabled {
            return Ok(());
        }

        if self.stack.is_empty() {
            self.connection = if self.backend.is_connected() {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            };
        }

        match self.connection {
            ConnectionStatus::Connected => {
                let key = ZoneIdentityRef {
                    name,
                    line: site.line,
                    function: site.function,
                    source_file: site.source_file,
                };
                let location = match self.cache.entry_ref(&key) {
                    EntryRef::Occupied(entry) => entry.into_mut(),
                    EntryRef::Vacant(entry) => {
                        let interned =
                            InternedLocation::derive(self.backend.as_ref(), name, site)?;
                        entry.insert(interned)
                    }
                };
                let handle = self.backend.zone_begin(location);
                if let Some(color) = color {
                    self.backend.zone_color(handle, color);
                }
                self.stack.push(OpenZone::Begun(handle));
            }
            ConnectionStatus::Disconnected => {
                self.stack.push(OpenZone::Placeholder);
            }
        }
        Ok(())
    }

    /// Closes the most recently opened zone. No-op while disabled.
    pub fn pop_zone(&mut self) -> Result<(), ProfilerError> {
        if !self.enabled {
            return Ok(());
        }
        match self.stack.pop() {
            Some(OpenZone::Begun(handle)) => {
                self.backend.zone_end(handle);
                Ok(())
            }
            Some(OpenZone::Placeholder) => Ok(()),
            None => Err(ProfilerError::UnbalancedPop),
        }
    }

    /// Marks the unnamed main-frame boundary. No-op while disabled; does
    /// not touch the zone stack.
    pub fn heartbeat(&self) {
        if !self.enabled {
            return;
        }
        self.backend.frame_mark(None);
    }

    /// Marks a named frame boundary.
    pub fn heartbeat_named(&mut self, name: &str) -> Result<(), ProfilerError> {
        if !self.enabled {
            return Ok(());
        }
        let label = frame_label(&mut self.frame_labels, name)?;
        self.backend.frame_mark(Some(label));
        Ok(())
    }

    /// Marks the start of a named discontinuous frame.
    pub fn heartbeat_start(&mut self, name: &str) -> Result<(), ProfilerError> {
        if !self.enabled {
            return Ok(());
        }
        let label = frame_label(&mut self.frame_labels, name)?;
        self.backend.frame_mark_start(label);
        Ok(())
    }

    /// Marks the end of a named discontinuous frame.
    pub fn heartbeat_end(&mut self, name: &str) -> Result<(), ProfilerError> {
        if !self.enabled {
            return Ok(());
        }
        let label = frame_label(&mut self.frame_labels, name)?;
        self.backend.frame_mark_end(label);
        Ok(())
    }

    /// Blocks the calling thread until a viewer attaches, probing the
    /// backend every few milliseconds. Intended for startup synchronization
    /// in development builds.
    pub fn sleep_until_connected(&mut self) {
        while !self.backend.is_connected() {
            thread::sleep(CONNECT_POLL_INTERVAL);
        }
        // The mid-stack no-refresh rule still applies; with zones open the
        // new status is picked up at the next empty-stack push.
        if self.stack.is_empty() {
            self.connection = ConnectionStatus::Connected;
        }
    }
}

/// Frame labels are interned for the life of the thread: the backend may
/// keep the pointer, so a transient buffer per heartbeat would dangle.
fn frame_label<'a>(
    labels: &'a mut FxHashMap<String, CString>,
    name: &str,
) -> Result<&'a CStr, ProfilerError> {
    match labels.entry_ref(name) {
        EntryRef::Occupied(entry) => Ok(entry.into_mut()),
        EntryRef::Vacant(entry) => Ok(entry.insert(CString::new(name)?)),
    }
}

thread_local! {
    static ACTIVE_PROFILER: RefCell<Option<ThreadProfiler>> = const { RefCell::new(None) };
}

fn with_active<T>(
    op: impl FnOnce(&mut ThreadProfiler) -> Result<T, ProfilerError>,
) -> Result<T, ProfilerError> {
    ACTIVE_PROFILER.with(|slot| match &mut *slot.borrow_mut() {
        Some(profiler) => op(profiler),
        None => Err(ProfilerError::ThreadNotInitialized),
    })
}

/// Initialises (or resets) this thread's profiling state over the default
/// backend. Must be called once per thread before any other call here;
/// there is no implicit default. State is dropped when the thread exits.
pub fn init_thread(thread_name: Option<&str>) -> Result<(), ProfilerError> {
    init_thread_with_backend(default_backend(), thread_name)
}

/// Initialises (or resets) this thread's profiling state over an explicit
/// backend.
pub fn init_thread_with_backend(
    backend: Box<dyn ProfilerBackend>,
    thread_name: Option<&str>,
) -> Result<(), ProfilerError> {
    let profiler = ThreadProfiler::with_backend(backend, thread_name)?;
    ACTIVE_PROFILER.with(|slot| {
        *slot.borrow_mut() = Some(profiler);
    });
    Ok(())
}

/// Toggles profiling for the current thread; see
/// [`ThreadProfiler::set_enabled`].
pub fn set_enabled(enabled: bool) -> Result<(), ProfilerError> {
    with_active(|profiler| profiler.set_enabled(enabled))
}

pub fn is_enabled() -> Result<bool, ProfilerError> {
    with_active(|profiler| Ok(profiler.enabled()))
}

/// Number of currently open zones on the current thread.
pub fn zone_depth() -> Result<usize, ProfilerError> {
    with_active(|profiler| Ok(profiler.depth()))
}

/// Opens a zone on the current thread; see [`ThreadProfiler::push_zone`].
pub fn push_zone(
    name: &str,
    color: Option<u32>,
    site: CallSite<'_>,
) -> Result<(), ProfilerError> {
    with_active(|profiler| profiler.push_zone(name, color, site))
}

/// Closes the most recently opened zone on the current thread.
pub fn pop_zone() -> Result<(), ProfilerError> {
    with_active(ThreadProfiler::pop_zone)
}

/// Marks the unnamed main-frame boundary.
pub fn heartbeat() -> Result<(), ProfilerError> {
    with_active(|profiler| {
        profiler.heartbeat();
        Ok(())
    })
}

/// Marks a named frame boundary.
pub fn heartbeat_named(name: &str) -> Result<(), ProfilerError> {
    with_active(|profiler| profiler.heartbeat_named(name))
}

/// Marks the start of a named discontinuous frame.
pub fn heartbeat_start(name: &str) -> Result<(), ProfilerError> {
    with_active(|profiler| profiler.heartbeat_start(name))
}

/// Marks the end of a named discontinuous frame.
pub fn heartbeat_end(name: &str) -> Result<(), ProfilerError> {
    with_active(|profiler| profiler.heartbeat_end(name))
}

/// Blocks until a viewer attaches; see
/// [`ThreadProfiler::sleep_until_connected`].
pub fn sleep_until_connected() -> Result<(), ProfilerError> {
    with_active(|profiler| {
        profiler.sleep_until_connected();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendEvent, RecordingBackend};
    use proptest::prelude::*;
    use std::sync::Arc;

    const SITE: CallSite<'static> = CallSite {
        line: 10,
        function: "engine::tick",
        source_file: "engine.rs",
    };

    fn profiler_over(backend: &Arc<RecordingBackend>) -> ThreadProfiler {
        ThreadProfiler::with_backend(Box::new(Arc::clone(backend)), Some("test-thread")).unwrap()
    }

    fn connected_profiler() -> (Arc<RecordingBackend>, ThreadProfiler) {
        let backend = Arc::new(RecordingBackend::default());
        backend.set_connected(true);
        let profiler = profiler_over(&backend);
        (backend, profiler)
    }

    fn zone_events(backend: &RecordingBackend) -> Vec<BackendEvent> {
        backend
            .events()
            .into_iter()
            .filter(|event| !matches!(event, BackendEvent::ThreadName(_)))
            .collect()
    }

    proptest! {
        #[test]
        fn balanced_blocks_restore_depth(blocks in proptest::collection::vec(1usize..6, 0..6)) {
            let (_backend, mut profiler) = connected_profiler();
            for &block in &blocks {
                let before = profiler.depth();
                for _ in 0..block {
                    profiler.push_zone("block", None, crate::call_site!()).unwrap();
                }
                prop_assert_eq!(profiler.depth(), before + block);
                for _ in 0..block {
                    profiler.pop_zone().unwrap();
                }
                prop_assert_eq!(profiler.depth(), before);
            }
            prop_assert_eq!(profiler.depth(), 0);
        }
    }

    #[test]
    fn pop_on_empty_stack_is_a_misuse_error() {
        let (_backend, mut profiler) = connected_profiler();
        assert!(matches!(
            profiler.pop_zone(),
            Err(ProfilerError::UnbalancedPop)
        ));
    }

    #[test]
    fn disable_with_open_zones_is_rejected() {
        let (_backend, mut profiler) = connected_profiler();
        profiler.push_zone("outer", None, SITE).unwrap();
        let err = profiler.set_enabled(false).unwrap_err();
        assert!(matches!(err, ProfilerError::ZonesStillOpen(1)));
        assert!(profiler.enabled());
        profiler.pop_zone().unwrap();
        profiler.set_enabled(false).unwrap();
    }

    #[test]
    fn identical_call_sites_intern_once() {
        let (backend, mut profiler) = connected_profiler();
        for _ in 0..2 {
            profiler.push_zone("step", None, SITE).unwrap();
            profiler.pop_zone().unwrap();
        }
        assert_eq!(backend.intern_count(), 1);
        let begins = backend
            .events()
            .iter()
            .filter(|event| matches!(event, BackendEvent::ZoneBegin(_)))
            .count();
        assert_eq!(begins, 2);
    }

    #[test]
    fn each_identity_field_gets_its_own_cache_entry() {
        let (backend, mut profiler) = connected_profiler();
        let variations = [
            ("step", SITE),
            ("solve", SITE),
            ("step", CallSite { line: 11, ..SITE }),
            ("step", CallSite { function: "engine::draw", ..SITE }),
            ("step", CallSite { source_file: "render.rs", ..SITE }),
        ];
        for (name, site) in variations {
            profiler.push_zone(name, None, site).unwrap();
            profiler.pop_zone().unwrap();
        }
        assert_eq!(backend.intern_count(), 5);
    }

    #[test]
    fn disconnected_pushes_are_free_but_counted() {
        let backend = Arc::new(RecordingBackend::default());
        let mut profiler = profiler_over(&backend);
        for _ in 0..3 {
            profiler.push_zone("quiet", None, SITE).unwrap();
        }
        assert_eq!(profiler.depth(), 3);
        for _ in 0..3 {
            profiler.pop_zone().unwrap();
        }
        assert_eq!(profiler.depth(), 0);
        assert_eq!(backend.intern_count(), 0);
        assert!(zone_events(&backend).is_empty());
    }

    #[test]
    fn nested_zones_end_in_reverse_order() {
        let (backend, mut profiler) = connected_profiler();
        profiler
            .push_zone("A", None, CallSite { line: 1, ..SITE })
            .unwrap();
        profiler
            .push_zone("B", None, CallSite { line: 2, ..SITE })
            .unwrap();
        profiler.pop_zone().unwrap();
        profiler.pop_zone().unwrap();
        assert_eq!(profiler.depth(), 0);

        assert_eq!(backend.interned(), ["A", "B"]);
        assert_eq!(
            zone_events(&backend),
            [
                BackendEvent::ZoneBegin(0),
                BackendEvent::ZoneBegin(1),
                BackendEvent::ZoneEnd(1),
                BackendEvent::ZoneEnd(0),
            ]
        );
    }

    #[test]
    fn disabled_profiler_ignores_zone_traffic() {
        let (backend, mut profiler) = connected_profiler();
        profiler.set_enabled(false).unwrap();
        profiler.push_zone("ghost", None, SITE).unwrap();
        assert_eq!(profiler.depth(), 0);
        profiler.pop_zone().unwrap();
        profiler.heartbeat();
        assert!(zone_events(&backend).is_empty());

        profiler.set_enabled(true).unwrap();
        profiler.push_zone("real", None, SITE).unwrap();
        assert_eq!(profiler.depth(), 1);
        profiler.pop_zone().unwrap();
        assert_eq!(zone_events(&backend).len(), 2);
    }

    #[test]
    fn default_color_never_reaches_the_backend() {
        let (backend, mut profiler) = connected_profiler();
        profiler.push_zone("plain", None, SITE).unwrap();
        profiler.pop_zone().unwrap();
        profiler.push_zone("black", Some(0), SITE).unwrap();
        profiler.pop_zone().unwrap();
        profiler
            .push_zone("tinted", Some(crate::colors::TOMATO), SITE)
            .unwrap();
        profiler.pop_zone().unwrap();

        let colors: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|event| match event {
                BackendEvent::ZoneColor(_, color) => Some(color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, [0, crate::colors::TOMATO]);
    }

    #[test]
    fn connection_is_not_refreshed_mid_stack() {
        let backend = Arc::new(RecordingBackend::default());
        let mut profiler = profiler_over(&backend);

        profiler.push_zone("outer", None, SITE).unwrap();
        backend.set_connected(true);
        profiler.push_zone("inner", None, SITE).unwrap();
        assert!(zone_events(&backend).is_empty());

        profiler.pop_zone().unwrap();
        profiler.pop_zone().unwrap();
        assert!(zone_events(&backend).is_empty());

        // First empty-stack push picks the new status up.
        profiler.push_zone("seen", None, SITE).unwrap();
        profiler.pop_zone().unwrap();
        assert_eq!(zone_events(&backend).len(), 2);
    }

    #[test]
    fn heartbeats_forward_frame_marks() {
        let (backend, mut profiler) = connected_profiler();
        profiler.heartbeat();
        profiler.heartbeat_named("sim").unwrap();
        profiler.heartbeat_start("io").unwrap();
        profiler.heartbeat_end("io").unwrap();
        assert_eq!(
            zone_events(&backend),
            [
                BackendEvent::FrameMark(None),
                BackendEvent::FrameMark(Some("sim".to_owned())),
                BackendEvent::FrameMarkStart("io".to_owned()),
                BackendEvent::FrameMarkEnd("io".to_owned()),
            ]
        );
        assert_eq!(profiler.depth(), 0);
    }

    #[test]
    fn interior_nul_names_are_rejected_without_state_damage() {
        let (_backend, mut profiler) = connected_profiler();
        let err = profiler.push_zone("bad\0zone", None, SITE).unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidString(_)));
        assert_eq!(profiler.depth(), 0);
        assert!(matches!(
            profiler.heartbeat_named("bad\0frame"),
            Err(ProfilerError::InvalidString(_))
        ));
    }

    #[test]
    fn explicit_thread_label_is_forwarded() {
        let backend = Arc::new(RecordingBackend::default());
        let profiler = profiler_over(&backend);
        assert_eq!(profiler.thread_label(), c"test-thread");
        assert_eq!(
            backend.events(),
            [BackendEvent::ThreadName("test-thread".to_owned())]
        );
    }

    #[test]
    fn unnamed_threads_get_a_synthesized_label() {
        let label = std::thread::spawn(|| {
            let backend = Arc::new(RecordingBackend::default());
            let profiler =
                ThreadProfiler::with_backend(Box::new(Arc::clone(&backend)), None).unwrap();
            profiler.thread_label().to_str().unwrap().to_owned()
        })
        .join()
        .unwrap();
        assert!(label.starts_with("Thread_"), "label was {label}");
    }

    #[test]
    fn sleep_until_connected_returns_once_viewer_attaches() {
        let backend = Arc::new(RecordingBackend::default());
        let mut profiler = profiler_over(&backend);
        let flipper = {
            let backend = Arc::clone(&backend);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                backend.set_connected(true);
            })
        };
        profiler.sleep_until_connected();
        assert_eq!(profiler.connection_status(), ConnectionStatus::Connected);
        flipper.join().unwrap();
    }

    #[test]
    fn registry_rejects_uninitialised_threads() {
        std::thread::spawn(|| {
            assert!(matches!(
                pop_zone(),
                Err(ProfilerError::ThreadNotInitialized)
            ));
            assert!(matches!(
                set_enabled(false),
                Err(ProfilerError::ThreadNotInitialized)
            ));
            assert!(matches!(
                zone_depth(),
                Err(ProfilerError::ThreadNotInitialized)
            ));
            assert!(matches!(
                heartbeat(),
                Err(ProfilerError::ThreadNotInitialized)
            ));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn registry_round_trip_and_reinit() {
        std::thread::spawn(|| {
            let backend = Arc::new(RecordingBackend::default());
            backend.set_connected(true);
            init_thread_with_backend(Box::new(Arc::clone(&backend)), Some("worker")).unwrap();

            push_zone("outer", None, crate::call_site!()).unwrap();
            assert_eq!(zone_depth().unwrap(), 1);
            pop_zone().unwrap();
            heartbeat().unwrap();
            assert!(is_enabled().unwrap());

            // Re-initialising resets stack and cache.
            push_zone("outer", None, crate::call_site!()).unwrap();
            init_thread_with_backend(Box::new(Arc::clone(&backend)), Some("worker")).unwrap();
            assert_eq!(zone_depth().unwrap(), 0);
        })
        .join()
        .unwrap();
    }
}
