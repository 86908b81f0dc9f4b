// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Predefined zone colors, `0xRRGGBB`.
//!
//! Pass as `Some(colors::STEEL_BLUE)`; `None` leaves the viewer's default.
//! `BLACK` is a valid override: an explicit zero is black to the backend,
//! not "no color".

pub const BLACK: u32 = 0x00_0000;
pub const WHITE: u32 = 0xFF_FFFF;
pub const GRAY: u32 = 0x80_8080;
pub const SLATE_GRAY: u32 = 0x70_8090;
pub const RED: u32 = 0xFF_0000;
pub const CRIMSON: u32 = 0xDC_143C;
pub const TOMATO: u32 = 0xFF_6347;
pub const ORANGE: u32 = 0xFF_A500;
pub const GOLD: u32 = 0xFF_D700;
pub const YELLOW: u32 = 0xFF_FF00;
pub const GREEN: u32 = 0x00_8000;
pub const FOREST_GREEN: u32 = 0x22_8B22;
pub const LIME: u32 = 0x00_FF00;
pub const CYAN: u32 = 0x00_FFFF;
pub const STEEL_BLUE: u32 = 0x46_82B4;
pub const DODGER_BLUE: u32 = 0x1E_90FF;
pub const BLUE: u32 = 0x00_00FF;
pub const ORCHID: u32 = 0xDA_70D6;
pub const MAGENTA: u32 = 0xFF_00FF;
