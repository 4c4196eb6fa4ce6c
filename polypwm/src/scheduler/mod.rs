/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Real-time polyphase PWM scheduler.
//!
//! [`Scheduler`] owns everything the control loop touches: the acquired
//! [`LineGroup`], one [`PhaseChannel`] per output line, the single
//! [`SchedulerState`] and the [`Clock`].  Nothing is shared, so the loop
//! needs no locks.
//!
//! # One tick
//! ```text
//!  ┌─ for each channel ─────────────────────────────────────────┐
//!  │  want = table[division][sub_slot]                          │
//!  │  want != is_high  →  write line, is_high = want            │
//!  │  want == is_high  →  nothing (edge-only writes)            │
//!  └────────────────────────────────────────────────────────────┘
//!  sub_slot += 1  (wrap at temporal_resolution → division += 1)
//!  division       (wrap at phase_resolution    → one period done)
//!  next_deadline += tick_interval          ← from the previous deadline
//!  sleep until next_deadline               ← absolute, never "sleep for"
//! ```
//!
//! All phase writes of a tick finish before the next deadline is computed,
//! so phases never drift apart relative to each other.
//!
//! # Write failures
//! A failed write is **dropped, not retried**: the channel's `is_high` takes
//! the attempted state, so the line is only written again at its next
//! logical edge.  Retrying inside the tick could push the tick past its
//! deadline.  No read-back is performed, so after a failure `is_high`
//! reflects the intended level, not a confirmed hardware level.
//!
//! # Shutdown
//! The loop has no terminal state of its own.  [`Scheduler::run`] polls a
//! shutdown flag once per tick, and dropping the scheduler drives every line
//! inactive before the line group is released.

pub mod clock;
pub mod error;

pub use clock::{Clock, MonotonicClock};
pub use error::SchedulerError;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::gpio::{LineGroup, LineLevel, LineOffset};
use crate::timing::TimingTable;

// ── Constants ─────────────────────────────────────────────────────────────────

/// After the first failure on a channel, only every N-th further failure is
/// logged.  At tens of kHz a dead line would otherwise flood the log.
pub const FAILURE_LOG_EVERY: u64 = 1_000;

// ── PhaseChannel ──────────────────────────────────────────────────────────────

/// One output line and the timing table that drives it.
#[derive(Debug, Clone)]
pub struct PhaseChannel {
    line: LineOffset,
    table: TimingTable,
    /// Last level *written* (or attempted), never read back from hardware.
    is_high: bool,
    writes: u64,
    write_failures: u64,
}

impl PhaseChannel {
    /// A channel starts low, matching the inactive level lines are requested
    /// with.
    pub fn new(line: LineOffset, table: TimingTable) -> Self {
        Self {
            line,
            table,
            is_high: false,
            writes: 0,
            write_failures: 0,
        }
    }

    pub fn line(&self) -> LineOffset {
        self.line
    }

    pub fn table(&self) -> &TimingTable {
        &self.table
    }

    pub fn is_high(&self) -> bool {
        self.is_high
    }

    /// Successful writes issued for this channel.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Writes that failed and were dropped.
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }
}

// ── SchedulerState / TickStats ────────────────────────────────────────────────

/// Position inside the waveform plus the next absolute wake-up time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    pub division: usize,
    pub sub_slot: usize,
    pub next_deadline: Instant,
}

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks evaluated.
    pub ticks: u64,
    /// Completed waveform periods (division counter wrapped to 0).
    pub periods: u64,
    /// GPIO writes that succeeded.
    pub writes: u64,
    /// GPIO writes that failed and were dropped.
    pub write_failures: u64,
    /// Ticks whose work finished after their next deadline had passed.
    pub overruns: u64,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// The single-threaded PWM control loop.
pub struct Scheduler<G: LineGroup, C: Clock = MonotonicClock> {
    lines: G,
    channels: Vec<PhaseChannel>,
    state: SchedulerState,
    phase_resolution: usize,
    temporal_resolution: usize,
    tick_interval: Duration,
    clock: C,
    stats: TickStats,
}

impl<G: LineGroup, C: Clock> Scheduler<G, C> {
    /// Assemble a scheduler.  The state starts at division 0, sub-slot 0,
    /// with the first deadline at `clock.now()`.
    ///
    /// # Errors
    /// * [`SchedulerError::NoChannels`] – `channels` is empty.
    /// * [`SchedulerError::TableShapeMismatch`] – tables differ in shape.
    /// * [`SchedulerError::UnassignedLine`] – a channel's line is not in
    ///   `lines`.
    /// * [`SchedulerError::DuplicateChannel`] – two channels share a line.
    /// * [`SchedulerError::ZeroTickInterval`] – `tick_interval` is zero.
    pub fn new(
        lines: G,
        channels: Vec<PhaseChannel>,
        tick_interval: Duration,
        clock: C,
    ) -> Result<Self, SchedulerError> {
        let first = channels.first().ok_or(SchedulerError::NoChannels)?;
        let phase_resolution = first.table.phase_resolution();
        let temporal_resolution = first.table.temporal_resolution();

        if tick_interval.is_zero() {
            return Err(SchedulerError::ZeroTickInterval);
        }

        let mut seen = BTreeSet::new();
        for channel in &channels {
            let table = &channel.table;
            if table.phase_resolution() != phase_resolution
                || table.temporal_resolution() != temporal_resolution
            {
                return Err(SchedulerError::TableShapeMismatch {
                    line: channel.line,
                    divisions: table.phase_resolution(),
                    sub_slots: table.temporal_resolution(),
                    expected_divisions: phase_resolution,
                    expected_sub_slots: temporal_resolution,
                });
            }
            if !lines.contains(channel.line) {
                return Err(SchedulerError::UnassignedLine { line: channel.line });
            }
            if !seen.insert(channel.line) {
                return Err(SchedulerError::DuplicateChannel { line: channel.line });
            }
        }

        let state = SchedulerState {
            division: 0,
            sub_slot: 0,
            next_deadline: clock.now(),
        };

        debug!(
            channels = channels.len(),
            phase_resolution,
            temporal_resolution,
            tick_interval_ns = tick_interval.as_nanos() as u64,
            "Scheduler assembled"
        );

        Ok(Self {
            lines,
            channels,
            state,
            phase_resolution,
            temporal_resolution,
            tick_interval,
            clock,
            stats: TickStats::default(),
        })
    }

    // ── Per-tick work ─────────────────────────────────────────────────────────

    /// Evaluate every channel at the current position, write the edges and
    /// advance `(division, sub_slot)`.  Does not touch the deadline or sleep.
    pub fn step(&mut self) {
        let SchedulerState {
            division, sub_slot, ..
        } = self.state;

        for channel in &mut self.channels {
            let want_high = channel.table.get(division, sub_slot);
            if want_high == channel.is_high {
                continue;
            }

            // Record the attempted state before the write: a failed edge is
            // dropped, not retried on the next tick.
            channel.is_high = want_high;

            match self.lines.set_level(channel.line, LineLevel::from_high(want_high)) {
                Ok(()) => {
                    channel.writes += 1;
                    self.stats.writes += 1;
                }
                Err(e) => {
                    channel.write_failures += 1;
                    self.stats.write_failures += 1;
                    if channel.write_failures == 1
                        || channel.write_failures % FAILURE_LOG_EVERY == 0
                    {
                        warn!(
                            line     = channel.line,
                            division,
                            sub_slot,
                            failures = channel.write_failures,
                            error    = %e,
                            "GPIO write failed, edge dropped"
                        );
                    }
                }
            }
        }

        self.stats.ticks += 1;
        self.advance_position();
    }

    /// One full tick: [`step`](Self::step), advance the deadline by exactly
    /// one interval from its previous value, then sleep until it.
    pub fn tick(&mut self) {
        self.step();

        self.state.next_deadline += self.tick_interval;
        if self.clock.now() > self.state.next_deadline {
            // Behind schedule: the sleep returns at once and later ticks
            // catch up.  The deadline itself is never re-based.
            self.stats.overruns += 1;
        }
        self.clock.sleep_until(self.state.next_deadline);
    }

    fn advance_position(&mut self) {
        self.state.sub_slot += 1;
        if self.state.sub_slot == self.temporal_resolution {
            self.state.sub_slot = 0;
            self.state.division += 1;
            if self.state.division == self.phase_resolution {
                self.state.division = 0;
                self.stats.periods += 1;
            }
        }
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    /// Tick until `shutdown` is raised.  The flag is checked once per tick,
    /// after the tick's sleep.
    pub fn run(&mut self, shutdown: &AtomicBool) -> TickStats {
        self.log_start(None);
        while !shutdown.load(Ordering::Relaxed) {
            self.tick();
        }
        self.log_stop();
        self.stats
    }

    /// Tick `ticks` times, or until `shutdown` is raised if that comes first.
    pub fn run_for(&mut self, ticks: u64, shutdown: &AtomicBool) -> TickStats {
        self.log_start(Some(ticks));
        for _ in 0..ticks {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.tick();
        }
        self.log_stop();
        self.stats
    }

    fn log_start(&self, limit: Option<u64>) {
        info!(
            channels            = self.channels.len(),
            phase_resolution    = self.phase_resolution,
            temporal_resolution = self.temporal_resolution,
            tick_interval_ns    = self.tick_interval.as_nanos() as u64,
            tick_limit          = ?limit,
            "=== PWM loop running ==="
        );
    }

    fn log_stop(&self) {
        info!(
            ticks          = self.stats.ticks,
            periods        = self.stats.periods,
            writes         = self.stats.writes,
            write_failures = self.stats.write_failures,
            overruns       = self.stats.overruns,
            "=== PWM loop stopped ==="
        );
        for channel in &self.channels {
            debug!(
                line     = channel.line,
                writes   = channel.writes,
                failures = channel.write_failures,
                "channel summary"
            );
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn channels(&self) -> &[PhaseChannel] {
        &self.channels
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn lines(&self) -> &G {
        &self.lines
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn phase_resolution(&self) -> usize {
        self.phase_resolution
    }

    pub fn temporal_resolution(&self) -> usize {
        self.temporal_resolution
    }

    /// Ticks in one full waveform period.
    pub fn ticks_per_period(&self) -> u64 {
        (self.phase_resolution * self.temporal_resolution) as u64
    }
}

impl<G: LineGroup, C: Clock> Drop for Scheduler<G, C> {
    fn drop(&mut self) {
        match self.lines.set_all_inactive() {
            Ok(()) => debug!("All lines driven inactive"),
            Err(e) => warn!(error = %e, "Failed to drive every line inactive on shutdown"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
