/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured configuration errors.
//!
//! Every variant is detected before the scheduler loop starts and is fatal:
//! `main` logs it and exits with a non-zero status.  Each message names the
//! offending parameter so the operator can fix the YAML file or the command
//! line without reading source code.
//!
//! **Do not** replace these with `anyhow::Error` in library code: callers
//! (and tests) match on the variants.

use thiserror::Error;

use crate::gpio::LineOffset;

/// Reasons a generator configuration cannot be turned into timing tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `tick_rate_hz` was zero.
    #[error("tick_rate_hz must be greater than zero (got {value})")]
    InvalidTickRate { value: u32 },

    /// `tick_rate_hz` is so high that one tick rounds to zero nanoseconds.
    #[error("tick_rate_hz {value} is too high: the tick interval rounds to 0ns")]
    TickRateTooHigh { value: u32 },

    /// `temporal_resolution` was zero.
    #[error("temporal_resolution must be at least 1 (got {value})")]
    InvalidTemporalResolution { value: usize },

    /// A timing table was requested with zero divisions.
    #[error("phase_resolution must be at least 1 (got {value})")]
    InvalidPhaseResolution { value: usize },

    /// `target_frequency_hz` was zero, negative, NaN or infinite.
    #[error("target_frequency_hz must be a finite value above 0 (got {value})")]
    InvalidTargetFrequency { value: f64 },

    /// The target frequency rounds to zero divisions per waveform period.
    ///
    /// `ceiling_hz` is the frequency obtained with a single division, which is
    /// the fastest waveform this tick rate / temporal resolution can produce.
    #[error(
        "target_frequency_hz {target_hz} is unreachable with tick_rate_hz {tick_rate_hz} \
         and temporal_resolution {temporal_resolution} (fastest achievable output is {ceiling_hz} Hz)"
    )]
    TargetUnreachable {
        target_hz: f64,
        tick_rate_hz: u32,
        temporal_resolution: usize,
        ceiling_hz: f64,
    },

    /// The timing table would need more cells than [`MAX_TABLE_CELLS`].
    ///
    /// [`MAX_TABLE_CELLS`]: crate::resolution::MAX_TABLE_CELLS
    #[error(
        "timing table of {phase_resolution} divisions x {temporal_resolution} sub-slots \
         exceeds the limit of {limit} cells (target_frequency_hz too low?)"
    )]
    TableTooLarge {
        phase_resolution: u64,
        temporal_resolution: usize,
        limit: usize,
    },

    /// The `lines` list was empty.
    #[error("no GPIO lines configured: 'lines' must name at least one line offset")]
    NoLines,

    /// `lines` and `phase_offsets_degrees` differ in length.
    #[error(
        "'lines' has {lines} entries but 'phase_offsets_degrees' has {offsets}; \
         every line needs exactly one phase offset"
    )]
    PhaseCountMismatch { lines: usize, offsets: usize },

    /// The same line offset appears twice in `lines`.
    #[error("line {line} appears more than once in 'lines'")]
    DuplicateLine { line: LineOffset },

    /// A phase offset was NaN or infinite.
    #[error("phase_offsets_degrees[{index}] must be finite (got {value})")]
    InvalidPhaseOffset { index: usize, value: f64 },

    /// The consumer tag was empty.
    #[error("'consumer' must not be empty, it identifies this process as the line owner")]
    EmptyConsumer,
}
