/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Linux GPIO character-device backend (`/dev/gpiochipN`).
//!
//! Every line is requested individually as an output, initially inactive,
//! tagged with the consumer string so `gpioinfo` shows who owns it.  The
//! request is all-or-nothing: if any line cannot be acquired the handles
//! obtained so far are dropped (released) and the error names the chip and
//! the failing line.

use std::path::Path;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::{debug, info};

use super::{GpioError, LineGroup, LineLevel, LineOffset};

/// Output lines acquired from one GPIO chip.
///
/// Line handles are closed when this value is dropped; the kernel then
/// keeps the last written level, so owners should park the lines with
/// [`LineGroup::set_all_inactive`] first.
pub struct CdevLineGroup {
    chip: String,
    offsets: Vec<LineOffset>,
    handles: Vec<LineHandle>,
}

impl CdevLineGroup {
    /// Open `chip_path` and request `lines` as outputs driven inactive.
    ///
    /// # Errors
    /// * [`GpioError::OpenChip`] – the chip device cannot be opened.
    /// * [`GpioError::RequestLine`] – a line does not exist or is busy.
    pub fn request(
        chip_path: &Path,
        lines: &[LineOffset],
        consumer: &str,
    ) -> Result<Self, GpioError> {
        let chip_name = chip_path.display().to_string();

        let mut chip = Chip::new(chip_path).map_err(|e| GpioError::OpenChip {
            chip: chip_name.clone(),
            source: Box::new(e),
        })?;

        info!(
            chip      = %chip_name,
            label     = %chip.label(),
            num_lines = chip.num_lines(),
            "Opened GPIO chip"
        );

        let mut handles = Vec::with_capacity(lines.len());
        for &offset in lines {
            let handle = chip
                .get_line(offset)
                .and_then(|line| {
                    line.request(
                        LineRequestFlags::OUTPUT,
                        LineLevel::Inactive.as_raw(),
                        consumer,
                    )
                })
                .map_err(|e| GpioError::RequestLine {
                    chip: chip_name.clone(),
                    line: offset,
                    source: Box::new(e),
                })?;

            debug!(chip = %chip_name, line = offset, consumer, "line requested as output");
            handles.push(handle);
        }

        info!(
            chip  = %chip_name,
            lines = ?lines,
            consumer,
            "Acquired {} output line(s)",
            handles.len()
        );

        Ok(Self {
            chip: chip_name,
            offsets: lines.to_vec(),
            handles,
        })
    }

    pub fn chip(&self) -> &str {
        &self.chip
    }

    fn handle(&self, line: LineOffset) -> Result<&LineHandle, GpioError> {
        self.offsets
            .iter()
            .position(|&o| o == line)
            .map(|i| &self.handles[i])
            .ok_or(GpioError::UnknownLine { line })
    }
}

impl std::fmt::Debug for CdevLineGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdevLineGroup")
            .field("chip", &self.chip)
            .field("offsets", &self.offsets)
            .finish_non_exhaustive()
    }
}

impl LineGroup for CdevLineGroup {
    fn lines(&self) -> &[LineOffset] {
        &self.offsets
    }

    fn set_level(&mut self, line: LineOffset, level: LineLevel) -> Result<(), GpioError> {
        self.handle(line)?
            .set_value(level.as_raw())
            .map_err(|e| GpioError::Write {
                line,
                source: Box::new(e),
            })
    }

    fn level(&self, line: LineOffset) -> Result<LineLevel, GpioError> {
        self.handle(line)?
            .get_value()
            .map(LineLevel::from_raw)
            .map_err(|e| GpioError::Read {
                line,
                source: Box::new(e),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
