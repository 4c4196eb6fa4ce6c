/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory line group for running without hardware.
//!
//! Backs the `--simulate` CLI flag and the scheduler tests.  Lines start
//! inactive; every accepted write updates the level and, when recording is
//! enabled, is appended to a journal.  Faults can be injected per line or for
//! the next N writes.
//!
//! The state lives behind an `Arc<Mutex<_>>` so a [`LineProbe`] can keep
//! observing the lines after the group itself has been moved into (and
//! dropped by) the scheduler.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::{GpioError, LineGroup, LineLevel, LineOffset};

#[derive(Debug, Default)]
struct SimState {
    levels: BTreeMap<LineOffset, LineLevel>,
    journal: Option<Vec<(LineOffset, LineLevel)>>,
    write_count: u64,
    failed_count: u64,
    failing_lines: BTreeSet<LineOffset>,
    fail_next: usize,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // A panicking test thread must not hide the journal from the next assertion
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── SimulatedLineGroup ────────────────────────────────────────────────────────

/// Simulated output lines.
#[derive(Debug)]
pub struct SimulatedLineGroup {
    offsets: Vec<LineOffset>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLineGroup {
    /// "Acquire" `lines`, all inactive.  Writes are counted but not kept.
    pub fn request(lines: &[LineOffset]) -> Self {
        let levels = lines.iter().map(|&l| (l, LineLevel::Inactive)).collect();
        Self {
            offsets: lines.to_vec(),
            state: Arc::new(Mutex::new(SimState {
                levels,
                ..SimState::default()
            })),
        }
    }

    /// Like [`request`](Self::request), but every accepted write is kept in
    /// a journal readable through [`LineProbe::writes`].
    pub fn recording(lines: &[LineOffset]) -> Self {
        let group = Self::request(lines);
        lock(&group.state).journal = Some(Vec::new());
        group
    }

    /// Observer handle that outlives the group.
    pub fn probe(&self) -> LineProbe {
        LineProbe {
            state: Arc::clone(&self.state),
        }
    }

    /// Make every write to `line` fail from now on.
    pub fn fail_line(&self, line: LineOffset) {
        lock(&self.state).failing_lines.insert(line);
    }

    /// Let writes to `line` succeed again.
    pub fn heal_line(&self, line: LineOffset) {
        lock(&self.state).failing_lines.remove(&line);
    }

    /// Make the next `count` writes fail, whatever line they target.
    pub fn fail_next_writes(&self, count: usize) {
        lock(&self.state).fail_next = count;
    }
}

impl LineGroup for SimulatedLineGroup {
    fn lines(&self) -> &[LineOffset] {
        &self.offsets
    }

    fn set_level(&mut self, line: LineOffset, level: LineLevel) -> Result<(), GpioError> {
        let mut state = lock(&self.state);

        if !state.levels.contains_key(&line) {
            return Err(GpioError::UnknownLine { line });
        }
        if state.fail_next > 0 || state.failing_lines.contains(&line) {
            state.fail_next = state.fail_next.saturating_sub(1);
            state.failed_count += 1;
            return Err(GpioError::Injected { line });
        }

        state.levels.insert(line, level);
        state.write_count += 1;
        if let Some(journal) = state.journal.as_mut() {
            journal.push((line, level));
        }
        trace!(line, level = ?level, "simulated write");
        Ok(())
    }

    fn level(&self, line: LineOffset) -> Result<LineLevel, GpioError> {
        lock(&self.state)
            .levels
            .get(&line)
            .copied()
            .ok_or(GpioError::UnknownLine { line })
    }
}

// ── LineProbe ─────────────────────────────────────────────────────────────────

/// Read-only view of a [`SimulatedLineGroup`]'s state.
#[derive(Debug, Clone)]
pub struct LineProbe {
    state: Arc<Mutex<SimState>>,
}

impl LineProbe {
    /// Current level of `line`, or `None` if it was never requested.
    pub fn level(&self, line: LineOffset) -> Option<LineLevel> {
        lock(&self.state).levels.get(&line).copied()
    }

    /// Every accepted write in order.  Empty unless the group was created
    /// with [`SimulatedLineGroup::recording`].
    pub fn writes(&self) -> Vec<(LineOffset, LineLevel)> {
        lock(&self.state).journal.clone().unwrap_or_default()
    }

    /// Accepted writes to `line` (recording groups only).
    pub fn writes_to(&self, line: LineOffset) -> Vec<LineLevel> {
        lock(&self.state)
            .journal
            .iter()
            .flatten()
            .filter(|(l, _)| *l == line)
            .map(|(_, level)| *level)
            .collect()
    }

    /// Total accepted writes across all lines.
    pub fn write_count(&self) -> u64 {
        lock(&self.state).write_count
    }

    /// Total writes rejected by fault injection.
    pub fn failed_count(&self) -> u64 {
        lock(&self.state).failed_count
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
