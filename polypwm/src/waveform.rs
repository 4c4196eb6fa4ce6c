/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Waveform sampling: one duty-cycle value per integer degree of phase.
//!
//! A [`WaveformTable`] is the input of the timing-table compiler.  Each output
//! phase gets its own table, sampled from the same generating function
//! shifted by that phase's offset:
//!
//! ```text
//! phase 0  ── sample(f,   0°) ──►  [f(0),   f(1),   …, f(359)]
//! phase 1  ── sample(f, 120°) ──►  [f(120), f(121), …, f(119)]
//! phase 2  ── sample(f, 240°) ──►  [f(240), f(241), …, f(239)]
//! ```

use clap::ValueEnum;
use serde::Deserialize;

/// Number of entries in a [`WaveformTable`] (one per degree).
pub const TABLE_LEN: usize = 360;

const FULL_TURN_DEGREES: f64 = 360.0;

// ── WaveformTable ─────────────────────────────────────────────────────────────

/// Desired duty cycle (`0.0..=1.0`) for each integer angle in `0..360`.
///
/// Immutable once built.  Every constructor normalises its samples, so a
/// table never holds a value outside `[0, 1]` or a NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformTable {
    samples: [f64; TABLE_LEN],
}

impl WaveformTable {
    /// Build a table by evaluating `f` at every integer degree.
    pub fn from_fn(mut f: impl FnMut(usize) -> f64) -> Self {
        let mut samples = [0.0; TABLE_LEN];
        for (degree, slot) in samples.iter_mut().enumerate() {
            *slot = normalize(f(degree));
        }
        Self { samples }
    }

    /// Build a table from 360 precomputed samples.
    pub fn from_samples(samples: [f64; TABLE_LEN]) -> Self {
        Self::from_fn(|degree| samples[degree])
    }

    /// Duty cycle at `degree`.  Angles of 360 and above wrap around, since
    /// the waveform is periodic.
    pub fn duty_at(&self, degree: usize) -> f64 {
        self.samples[degree % TABLE_LEN]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }
}

/// Sample the periodic function `f` (degrees → duty) over one full period,
/// starting `offset_degrees` into it.
///
/// `table[i] = f(i + offset_degrees)`, with the angle reduced into
/// `[0, 360)` before `f` sees it.  Results are clamped to `[0, 1]`; a NaN
/// becomes `0.0` (line held low).
pub fn sample(f: impl Fn(f64) -> f64, offset_degrees: f64) -> WaveformTable {
    WaveformTable::from_fn(|degree| {
        let angle = (degree as f64 + offset_degrees).rem_euclid(FULL_TURN_DEGREES);
        f(angle)
    })
}

fn normalize(duty: f64) -> f64 {
    if duty.is_nan() {
        0.0
    } else {
        duty.clamp(0.0, 1.0)
    }
}

// ── Built-in shapes ───────────────────────────────────────────────────────────

/// Built-in generating functions.
///
/// All of them are phase-aligned with the sine: they cross 50 % rising at 0°
/// (or, for `Square` and `Sawtooth`, switch/restart there).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// `sin(θ) * 0.5 + 0.5`, the classic three-phase inverter reference.
    #[default]
    Sine,
    /// High for `[0°, 180°)`, low for `[180°, 360°)`.
    Square,
    /// Linear ramps between 0 % at 270° and 100 % at 90°.
    Triangle,
    /// Linear ramp from 0 % at 0° to 100 % just before 360°.
    Sawtooth,
}

impl Waveform {
    /// Duty cycle at `angle_degrees` (any real angle; reduced modulo 360).
    pub fn duty(self, angle_degrees: f64) -> f64 {
        let a = angle_degrees.rem_euclid(FULL_TURN_DEGREES);
        match self {
            Waveform::Sine => a.to_radians().sin() * 0.5 + 0.5,
            Waveform::Square => {
                if a < 180.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Waveform::Triangle => {
                // -1..1 triangle aligned with sin(): 0 at 0°, 1 at 90°, -1 at 270°
                let tri = if a < 90.0 {
                    a / 90.0
                } else if a < 270.0 {
                    (180.0 - a) / 90.0
                } else {
                    (a - 360.0) / 90.0
                };
                tri * 0.5 + 0.5
            }
            Waveform::Sawtooth => a / FULL_TURN_DEGREES,
        }
    }

    /// Sampled table for one phase, `offset_degrees` into the period.
    pub fn table(self, offset_degrees: f64) -> WaveformTable {
        sample(|angle| self.duty(angle), offset_degrees)
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        };
        f.write_str(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn sine_duty(degrees: f64) -> f64 {
        degrees.to_radians().sin() * 0.5 + 0.5
    }

    // ── sample ────────────────────────────────────────────────────────────────

    #[test]
    fn sample_without_offset_evaluates_each_degree() {
        let table = sample(|a| a / 1_000.0, 0.0);
        assert_eq!(table.as_slice().len(), TABLE_LEN);
        assert!((table.duty_at(0) - 0.0).abs() < EPS);
        assert!((table.duty_at(359) - 0.359).abs() < EPS);
    }

    #[test]
    fn three_phase_offsets_shift_the_sine() {
        let p0 = Waveform::Sine.table(0.0);
        let p1 = Waveform::Sine.table(120.0);
        let p2 = Waveform::Sine.table(240.0);

        assert!((p0.duty_at(0) - 0.5).abs() < EPS);
        assert!((p1.duty_at(0) - sine_duty(120.0)).abs() < EPS);
        assert!((p2.duty_at(0) - sine_duty(240.0)).abs() < EPS);
        // ≈ 0.933 and ≈ 0.067
        assert!(p1.duty_at(0) > 0.93 && p2.duty_at(0) < 0.07);

        // Each table is the same function seen 120° later
        assert!((p1.duty_at(10) - p0.duty_at(130)).abs() < EPS);
        assert!((p2.duty_at(200) - p0.duty_at(80)).abs() < EPS);
    }

    #[test]
    fn negative_offset_wraps_like_its_positive_equivalent() {
        let a = Waveform::Sine.table(-120.0);
        let b = Waveform::Sine.table(240.0);
        for degree in 0..TABLE_LEN {
            assert!((a.duty_at(degree) - b.duty_at(degree)).abs() < 1e-9);
        }
    }

    #[test]
    fn offset_angle_is_reduced_before_calling_f() {
        let table = sample(
            |a| {
                assert!((0.0..360.0).contains(&a), "angle {a} not reduced");
                0.5
            },
            725.0,
        );
        assert_eq!(table.duty_at(0), 0.5);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let table = sample(|a| if a < 180.0 { 1.7 } else { -0.3 }, 0.0);
        assert_eq!(table.duty_at(10), 1.0);
        assert_eq!(table.duty_at(200), 0.0);
    }

    #[test]
    fn nan_samples_become_zero() {
        let table = sample(|_| f64::NAN, 0.0);
        assert!(table.as_slice().iter().all(|&d| d == 0.0));
    }

    // ── WaveformTable ─────────────────────────────────────────────────────────

    #[test]
    fn duty_at_wraps_past_360() {
        let table = WaveformTable::from_fn(|d| d as f64 / 360.0);
        assert_eq!(table.duty_at(360), table.duty_at(0));
        assert_eq!(table.duty_at(361), table.duty_at(1));
    }

    #[test]
    fn from_samples_keeps_values() {
        let mut samples = [0.0; TABLE_LEN];
        samples[72] = 0.25;
        samples[144] = 2.0;
        let table = WaveformTable::from_samples(samples);
        assert_eq!(table.duty_at(72), 0.25);
        assert_eq!(table.duty_at(144), 1.0);
    }

    // ── Built-in shapes ───────────────────────────────────────────────────────

    #[test]
    fn sine_hits_expected_extremes() {
        assert!((Waveform::Sine.duty(90.0) - 1.0).abs() < EPS);
        assert!((Waveform::Sine.duty(270.0) - 0.0).abs() < EPS);
    }

    #[test]
    fn square_is_high_for_first_half_period() {
        assert_eq!(Waveform::Square.duty(0.0), 1.0);
        assert_eq!(Waveform::Square.duty(179.0), 1.0);
        assert_eq!(Waveform::Square.duty(180.0), 0.0);
        assert_eq!(Waveform::Square.duty(359.0), 0.0);
    }

    #[test]
    fn triangle_is_aligned_with_sine() {
        assert!((Waveform::Triangle.duty(0.0) - 0.5).abs() < EPS);
        assert!((Waveform::Triangle.duty(90.0) - 1.0).abs() < EPS);
        assert!((Waveform::Triangle.duty(180.0) - 0.5).abs() < EPS);
        assert!((Waveform::Triangle.duty(270.0) - 0.0).abs() < EPS);
        assert!((Waveform::Triangle.duty(315.0) - 0.25).abs() < EPS);
    }

    #[test]
    fn sawtooth_ramps_over_the_period() {
        assert_eq!(Waveform::Sawtooth.duty(0.0), 0.0);
        assert!((Waveform::Sawtooth.duty(180.0) - 0.5).abs() < EPS);
        assert_eq!(Waveform::Sawtooth.duty(360.0), 0.0);
    }

    #[test]
    fn every_shape_stays_in_unit_range() {
        for shape in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::Sawtooth,
        ] {
            let table = shape.table(33.0);
            assert!(
                table.as_slice().iter().all(|d| (0.0..=1.0).contains(d)),
                "{shape} left the unit range"
            );
        }
    }
}
