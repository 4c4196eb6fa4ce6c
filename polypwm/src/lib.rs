/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! polypwm – software-timed polyphase PWM generator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – YAML generator configuration + ConfigError
//! ├── waveform        – 360-entry duty tables, built-in shapes
//! ├── resolution      – phase resolution / true frequency arithmetic
//! ├── timing          – (division, sub_slot) on/off tables
//! ├── plan            – config → resolved parameters + phase channels
//! ├── gpio/           – LineGroup trait, cdev (Linux) and simulated backends
//! └── scheduler/      – absolute-deadline tick loop, edge-only writes
//! ```

pub mod config;
pub mod gpio;
pub mod plan;
pub mod resolution;
pub mod scheduler;
pub mod timing;
pub mod waveform;
