// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::marker::PhantomData;

use crate::location::CallSite;

/// Guard that binds a zone to a lexical scope: opens it on construction,
/// closes it on drop, on every exit path including unwinding. That
/// guarantee is the whole reason this type exists instead of manual
/// push/pop pairing.
///
/// Operates on the current thread's registry state and must be dropped on
/// the thread that created it, so it is deliberately not `Send`.
pub struct ProfileScope {
    _not_send: PhantomData<*const ()>,
}

impl ProfileScope {
    /// Opens a zone with the given name, optional color override, and call
    /// site (see [`zone!`](macro@crate::zone) for the capture-the-call-site
    /// spelling).
    ///
    /// # Panics
    ///
    /// Panics when the thread was never initialised or the name cannot
    /// cross the C boundary; both are caller bugs, matching the fallible
    /// [`push_zone`](crate::push_zone) reporting them as errors.
    pub fn new(name: &str, color: Option<u32>, site: CallSite<'_>) -> Self {
        if let Err(err) = crate::profiler::push_zone(name, color, site) {
            panic!("failed to open profiling zone {name:?}: {err}");
        }
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if let Err(err) = crate::profiler::pop_zone() {
            // A second panic while unwinding would abort; report instead.
            if std::thread::panicking() {
                tracing::error!(error = %err, "profiling zone leaked during unwind");
            } else {
                panic!("failed to close profiling zone: {err}");
            }
        }
    }
}
