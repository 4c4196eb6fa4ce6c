/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured errors for assembling a [`Scheduler`](super::Scheduler).
//!
//! These are all raised by [`Scheduler::new`](super::Scheduler::new), before
//! the first tick.  Once the loop runs, nothing it does can fail: GPIO write
//! errors are absorbed per channel and only counted.

use thiserror::Error;

use crate::gpio::LineOffset;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No phase channels were supplied.
    #[error("no phase channels: at least one line must be driven")]
    NoChannels,

    /// A channel's timing table has different dimensions from the first
    /// channel's.  All phases share one `(division, sub_slot)` counter pair,
    /// so every table must be the same shape.
    #[error(
        "timing table for line {line} is {divisions}x{sub_slots}, \
         expected {expected_divisions}x{expected_sub_slots}"
    )]
    TableShapeMismatch {
        line: LineOffset,
        divisions: usize,
        sub_slots: usize,
        expected_divisions: usize,
        expected_sub_slots: usize,
    },

    /// A channel targets a line that the acquired line group does not own.
    #[error("line {line} is not part of the acquired line group")]
    UnassignedLine { line: LineOffset },

    /// Two channels target the same line.
    #[error("line {line} is driven by more than one phase channel")]
    DuplicateChannel { line: LineOffset },

    /// The tick interval is zero, which would turn the loop into a busy spin.
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
}
