// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Thread-local scoped instrumentation bridge for the Tracy profiler.
//!
//! All timing capture, transport, and visualization live in the native
//! profiler; this crate only brackets calls around it: a per-thread zone
//! stack, a call-site interning cache, and connection-state gating so
//! instrumentation is close to free when no viewer is attached.
//!
//! Each thread initialises its own state explicitly, then opens zones with
//! the [`zone!`] guard or the manual [`push_zone`]/[`pop_zone`] pair:
//!
//! ```
//! use tracy_bridge::zone;
//!
//! # fn main() -> Result<(), tracy_bridge::ProfilerError> {
//! tracy_bridge::init_thread(Some("main"))?;
//! {
//!     let _zone = zone!("update");
//!     // work timed as "update"
//! }
//! tracy_bridge::heartbeat()?;
//! # Ok(())
//! # }
//! ```
//!
//! The native client is compiled in by the `tracy` cargo feature; without
//! it the default backend reports disconnected and every zone takes the
//! free placeholder path, so instrumented code keeps building and running
//! without a C++ toolchain.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod backend;
pub mod colors;
mod error;
mod location;
mod macros;
mod profiler;
mod scope;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
mod threading;
#[cfg(feature = "tracy")]
pub mod tracy;

pub use backend::{ConnectionStatus, NoopBackend, ProfilerBackend, ZoneHandle};
pub use error::ProfilerError;
pub use location::{CallSite, InternedLocation};
pub use profiler::{
    heartbeat, heartbeat_end, heartbeat_named, heartbeat_start, init_thread,
    init_thread_with_backend, is_enabled, pop_zone, push_zone, set_enabled,
    sleep_until_connected, zone_depth, ThreadProfiler,
};
pub use scope::ProfileScope;
