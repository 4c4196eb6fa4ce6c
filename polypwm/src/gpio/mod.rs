/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! GPIO line-group abstraction.
//!
//! The scheduler only needs four things from the hardware: which lines it
//! owns, set a line's level, read it back, and park every line at a safe
//! level.  [`LineGroup`] captures exactly that; two backends implement it:
//!
//! | Backend | Module | Used for |
//! |---|---|---|
//! | Linux GPIO character device (`/dev/gpiochipN`) | [`cdev`] | Real hardware |
//! | In-memory lines with fault injection | [`sim`] | `--simulate`, tests |

#[cfg(target_os = "linux")]
pub mod cdev;
pub mod sim;

use thiserror::Error;

/// Line offset within a GPIO chip (the kernel's line number).
pub type LineOffset = u32;

/// Boxed backend error carried as the `source` of a [`GpioError`].
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── LineLevel ─────────────────────────────────────────────────────────────────

/// Logical level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineLevel {
    /// Logical 0, the safe resting level.
    #[default]
    Inactive,
    /// Logical 1.
    Active,
}

impl LineLevel {
    pub fn from_high(high: bool) -> Self {
        if high {
            LineLevel::Active
        } else {
            LineLevel::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == LineLevel::Active
    }

    /// Raw value used by the kernel line-handle API.
    pub fn as_raw(self) -> u8 {
        match self {
            LineLevel::Inactive => 0,
            LineLevel::Active => 1,
        }
    }

    pub fn from_raw(value: u8) -> Self {
        Self::from_high(value != 0)
    }
}

// ── GpioError ─────────────────────────────────────────────────────────────────

/// Failures reported by a [`LineGroup`] backend.
///
/// `OpenChip` and `RequestLine` happen during acquisition and are fatal.
/// `Write` / `Injected` happen inside the tick loop and are absorbed by the
/// scheduler (counted, logged, edge dropped).
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("cannot open GPIO chip '{chip}'")]
    OpenChip {
        chip: String,
        #[source]
        source: BackendError,
    },

    #[error("cannot request line {line} on '{chip}' as an output")]
    RequestLine {
        chip: String,
        line: LineOffset,
        #[source]
        source: BackendError,
    },

    #[error("line {line} is not part of this line group")]
    UnknownLine { line: LineOffset },

    #[error("write to line {line} failed")]
    Write {
        line: LineOffset,
        #[source]
        source: BackendError,
    },

    #[error("read of line {line} failed")]
    Read {
        line: LineOffset,
        #[source]
        source: BackendError,
    },

    /// Fault injected by the simulated backend.
    #[error("simulated write failure on line {line}")]
    Injected { line: LineOffset },
}

// ── LineGroup ─────────────────────────────────────────────────────────────────

/// An acquired group of output lines, exclusively owned by one writer.
///
/// Dropping the group releases the lines.  Callers that need the lines
/// parked first (the scheduler does) call [`set_all_inactive`] before the
/// drop.
///
/// [`set_all_inactive`]: LineGroup::set_all_inactive
pub trait LineGroup {
    /// Offsets of every line in the group, in request order.
    fn lines(&self) -> &[LineOffset];

    /// Drive `line` to `level`.
    fn set_level(&mut self, line: LineOffset, level: LineLevel) -> Result<(), GpioError>;

    /// Current level of `line` as reported by the backend.
    fn level(&self, line: LineOffset) -> Result<LineLevel, GpioError>;

    /// Drive every line inactive.
    ///
    /// Keeps going after a failure so one bad line does not leave the others
    /// high; the first error is returned.
    fn set_all_inactive(&mut self) -> Result<(), GpioError> {
        let lines = self.lines().to_vec();
        let mut first_err = None;
        for line in lines {
            if let Err(e) = self.set_level(line, LineLevel::Inactive) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn contains(&self, line: LineOffset) -> bool {
        self.lines().contains(&line)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
