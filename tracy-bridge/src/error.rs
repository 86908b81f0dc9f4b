// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors reported by the bridge.
///
/// Every variant is a caller bug caught at the call site and reported
/// immediately; none of them is retried. A detached viewer is a normal
/// operating mode, not an error.
#[derive(Debug, Error)]
pub enum ProfilerError {
    /// An operation ran on a thread that never called `init_thread`.
    #[error("profiler state was never initialised on this thread; call init_thread first")]
    ThreadNotInitialized,

    /// `set_enabled(false)` while zones are still open would orphan them.
    #[error("cannot disable the profiler while {0} zone(s) are still open")]
    ZonesStillOpen(usize),

    /// A pop with no matching push, usually a mismatched guard lifetime.
    #[error("zone stack is empty; pop has no matching push")]
    UnbalancedPop,

    /// A name handed to the profiler contains an interior nul byte and
    /// cannot cross the C boundary.
    #[error("string passed to the profiler contains an interior nul byte")]
    InvalidString(#[from] std::ffi::NulError),
}
