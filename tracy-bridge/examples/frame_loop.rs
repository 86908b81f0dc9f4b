// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Instrumented frame loop. Build with `--features tracy` and attach a
//! Tracy viewer to watch it; set `WAIT_FOR_VIEWER=1` to block at startup
//! until one connects. Without the feature it still runs, on the free
//! disconnected path.

use std::time::Duration;

use tracy_bridge::{colors, zone};

fn main() -> Result<(), tracy_bridge::ProfilerError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracy_bridge::init_thread(Some("frame-loop"))?;
    if std::env::var_os("WAIT_FOR_VIEWER").is_some() {
        tracing::info!("waiting for a profiler viewer");
        tracy_bridge::sleep_until_connected()?;
    }

    let loader = std::thread::spawn(|| -> Result<(), tracy_bridge::ProfilerError> {
        tracy_bridge::init_thread(Some("asset-loader"))?;
        for _ in 0..20 {
            tracy_bridge::heartbeat_start("asset-batch")?;
            {
                let _zone = zone!("load_batch", colors::FOREST_GREEN);
                std::thread::sleep(Duration::from_millis(15));
            }
            tracy_bridge::heartbeat_end("asset-batch")?;
        }
        Ok(())
    });

    for frame in 0u32..300 {
        {
            let _frame = zone!("frame", colors::STEEL_BLUE);
            {
                let _update = zone!("update");
                std::thread::sleep(Duration::from_millis(2));
            }
            {
                let _render = zone!("render", colors::TOMATO);
                std::thread::sleep(Duration::from_millis(4));
            }
        }
        tracy_bridge::heartbeat()?;
        if frame % 100 == 0 {
            tracing::debug!(frame, "frame checkpoint");
        }
    }

    loader.join().expect("asset loader panicked")
}
