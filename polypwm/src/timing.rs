/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timing-table compiler.
//!
//! Turns a [`WaveformTable`] into a [`TimingTable`]: a
//! `phase_resolution x temporal_resolution` grid of booleans answering "is
//! this line high during sub-slot S of division D?".
//!
//! ```text
//!            sub-slot →   0  1  2  3          duty   high slots
//!   division 0          [ .  .  .  . ]        0.00      0
//!   division 1          [ #  .  .  . ]        0.25      1
//!   division 2          [ #  #  .  . ]        0.50      2
//!   division 3          [ #  #  #  . ]        0.75      3
//!   division 4          [ #  #  #  # ]        1.00      4
//! ```
//!
//! Storage is a single flat `Vec<bool>` with stride `temporal_resolution`,
//! because `phase_resolution` is only known after the startup calculation.

use clap::ValueEnum;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::resolution::MAX_TABLE_CELLS;
use crate::waveform::{WaveformTable, TABLE_LEN};

// ── Pulse placement ───────────────────────────────────────────────────────────

/// Where the high sub-slots sit inside a division.
///
/// The high-slot *count* per division is identical for every policy; only
/// its position moves.  All phases of one generator share the same policy,
/// so relative phase alignment is preserved either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PulsePlacement {
    /// High slots fill the row from sub-slot 0 (edge-aligned pulses).
    #[default]
    LeadingEdge,
    /// High slots are centred in the row; odd leftovers go after the pulse.
    Centered,
}

impl PulsePlacement {
    /// First high sub-slot for a row with `high` of `temporal_resolution`
    /// slots set.
    fn first_slot(self, high: usize, temporal_resolution: usize) -> usize {
        match self {
            PulsePlacement::LeadingEdge => 0,
            PulsePlacement::Centered => (temporal_resolution - high) / 2,
        }
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Waveform angle (integer degree) sampled by `division`.
///
/// `round(division * 360 / phase_resolution)`, wrapped into `0..360`: with
/// more than 720 divisions the last one rounds up to 360, which is the same
/// point of the period as 0.
pub fn division_angle(division: usize, phase_resolution: usize) -> usize {
    let angle = (division as f64 * TABLE_LEN as f64 / phase_resolution as f64).round();
    angle as usize % TABLE_LEN
}

/// Number of high sub-slots for `duty`: `round(duty * temporal_resolution)`
/// clamped to `[0, temporal_resolution]`.
pub fn high_slots(duty: f64, temporal_resolution: usize) -> usize {
    let slots = (duty * temporal_resolution as f64).round();
    if slots.is_nan() || slots <= 0.0 {
        0
    } else {
        (slots as usize).min(temporal_resolution)
    }
}

fn check_dimensions(phase_resolution: usize, temporal_resolution: usize) -> Result<(), ConfigError> {
    if phase_resolution == 0 {
        return Err(ConfigError::InvalidPhaseResolution {
            value: phase_resolution,
        });
    }
    if temporal_resolution == 0 {
        return Err(ConfigError::InvalidTemporalResolution {
            value: temporal_resolution,
        });
    }
    match phase_resolution.checked_mul(temporal_resolution) {
        Some(cells) if cells <= MAX_TABLE_CELLS => Ok(()),
        _ => Err(ConfigError::TableTooLarge {
            phase_resolution: phase_resolution as u64,
            temporal_resolution,
            limit: MAX_TABLE_CELLS,
        }),
    }
}

// ── TimingTable ───────────────────────────────────────────────────────────────

/// Per-phase on/off schedule indexed by `(division, sub_slot)`.
///
/// Built once before the scheduler starts and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingTable {
    phase_resolution: usize,
    temporal_resolution: usize,
    /// Row-major: cell `(d, s)` lives at `d * temporal_resolution + s`.
    cells: Vec<bool>,
}

impl TimingTable {
    /// Compile `waveform` into a table of `phase_resolution` divisions, each
    /// split into `temporal_resolution` sub-slots.
    ///
    /// # Errors
    /// [`ConfigError::InvalidPhaseResolution`] /
    /// [`ConfigError::InvalidTemporalResolution`] for a zero dimension and
    /// [`ConfigError::TableTooLarge`] above [`MAX_TABLE_CELLS`], all checked
    /// before anything is allocated.
    pub fn compile(
        waveform: &WaveformTable,
        phase_resolution: usize,
        temporal_resolution: usize,
        placement: PulsePlacement,
    ) -> Result<Self, ConfigError> {
        check_dimensions(phase_resolution, temporal_resolution)?;

        let duties: Vec<f64> = (0..phase_resolution)
            .map(|d| waveform.duty_at(division_angle(d, phase_resolution)))
            .collect();

        Self::from_duties(&duties, temporal_resolution, placement)
    }

    /// Build a table directly from one duty value per division.
    ///
    /// `duties.len()` becomes the phase resolution.
    pub fn from_duties(
        duties: &[f64],
        temporal_resolution: usize,
        placement: PulsePlacement,
    ) -> Result<Self, ConfigError> {
        check_dimensions(duties.len(), temporal_resolution)?;

        let mut cells = vec![false; duties.len() * temporal_resolution];
        for (row, &duty) in cells.chunks_exact_mut(temporal_resolution).zip(duties) {
            let high = high_slots(duty, temporal_resolution);
            let start = placement.first_slot(high, temporal_resolution);
            row[start..start + high].fill(true);
        }

        Ok(Self {
            phase_resolution: duties.len(),
            temporal_resolution,
            cells,
        })
    }

    /// `true` if the line is high during `(division, sub_slot)`.
    ///
    /// # Panics
    /// If either index is outside the table.  The scheduler's counters wrap
    /// at exactly these bounds, so this only fires on a programming error.
    pub fn get(&self, division: usize, sub_slot: usize) -> bool {
        assert!(
            sub_slot < self.temporal_resolution,
            "sub_slot {sub_slot} out of range (temporal_resolution {})",
            self.temporal_resolution
        );
        self.cells[division * self.temporal_resolution + sub_slot]
    }

    /// All sub-slots of `division`.
    pub fn row(&self, division: usize) -> &[bool] {
        let start = division * self.temporal_resolution;
        &self.cells[start..start + self.temporal_resolution]
    }

    /// Iterate rows in division order.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.cells.chunks_exact(self.temporal_resolution)
    }

    /// Number of high sub-slots in `division`.
    pub fn high_slots(&self, division: usize) -> usize {
        self.row(division).iter().filter(|&&high| high).count()
    }

    pub fn phase_resolution(&self) -> usize {
        self.phase_resolution
    }

    pub fn temporal_resolution(&self) -> usize {
        self.temporal_resolution
    }

    /// Logical transitions in one full row-major sweep, starting from a low
    /// line.
    ///
    /// This is exactly the number of GPIO writes the scheduler issues for
    /// this phase during its first waveform period.
    pub fn transitions(&self) -> usize {
        let mut level = false;
        let mut count = 0;
        for &cell in &self.cells {
            if cell != level {
                count += 1;
                level = cell;
            }
        }
        count
    }

    /// Average duty cycle across all divisions (fraction of high cells).
    pub fn mean_duty(&self) -> f64 {
        let high = self.cells.iter().filter(|&&c| c).count();
        high as f64 / self.cells.len() as f64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
