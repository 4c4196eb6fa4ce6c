/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Absolute-deadline clock.

use std::time::Instant;

/// Monotonic time source with a sleep-until-deadline primitive.
///
/// The scheduler never sleeps *for* a duration; it sleeps *until* a
/// deadline it advanced itself, so the cost of the loop body does not
/// accumulate into frequency drift.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block until `now() >= deadline`.  Returns immediately for a deadline
    /// that has already passed.
    fn sleep_until(&mut self, deadline: Instant);
}

/// [`Clock`] backed by `std::time::Instant` (`CLOCK_MONOTONIC` on Linux).
///
/// The remaining time is recomputed from the absolute deadline on every
/// call, so a late wake-up shortens the next sleep instead of pushing every
/// later tick back.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&mut self, deadline: Instant) {
        if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(remaining);
        }
    }
}
