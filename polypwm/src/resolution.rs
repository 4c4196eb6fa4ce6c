/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resolution arithmetic: divisions per waveform period, achieved frequency
//! and tick interval.
//!
//! These are free functions rather than methods so they can be used and tested
//! independently of the scheduler.
//!
//! ```text
//!   tick_rate_hz                       one tick = one sub-slot
//!   ─────────────────── = ticks per waveform period
//!   target_frequency_hz
//!
//!   ticks per period / temporal_resolution  →  round  →  phase_resolution
//! ```
//!
//! Because `phase_resolution` is an integer the achieved ("true") frequency
//! generally differs from the target.  It is only reported, never fed back
//! into the tick cadence.

use std::time::Duration;

use crate::config::ConfigError;

/// Upper bound on `phase_resolution * temporal_resolution`.
///
/// 16 Mi cells is ~9 minutes of waveform at 30 kHz, far beyond any useful
/// output frequency, but small enough to keep a typo (`0.0003` instead of
/// `300`) from allocating gigabytes.
pub const MAX_TABLE_CELLS: usize = 1 << 24;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Number of divisions per waveform period for `target_frequency_hz`.
///
/// Computed as `round((tick_rate_hz / target_frequency_hz) / temporal_resolution)`.
///
/// # Errors
/// * [`ConfigError::InvalidTickRate`] – `tick_rate_hz == 0`.
/// * [`ConfigError::InvalidTemporalResolution`] – `temporal_resolution == 0`.
/// * [`ConfigError::InvalidTargetFrequency`] – target is not finite and > 0.
/// * [`ConfigError::TargetUnreachable`] – the result rounds to zero.  This is
///   never clamped to 1: the operator asked for a frequency the generator
///   cannot produce.
/// * [`ConfigError::TableTooLarge`] – the resulting table exceeds
///   [`MAX_TABLE_CELLS`].
pub fn phase_resolution(
    tick_rate_hz: u32,
    target_frequency_hz: f64,
    temporal_resolution: usize,
) -> Result<usize, ConfigError> {
    if tick_rate_hz == 0 {
        return Err(ConfigError::InvalidTickRate {
            value: tick_rate_hz,
        });
    }
    if temporal_resolution == 0 {
        return Err(ConfigError::InvalidTemporalResolution {
            value: temporal_resolution,
        });
    }
    if !target_frequency_hz.is_finite() || target_frequency_hz <= 0.0 {
        return Err(ConfigError::InvalidTargetFrequency {
            value: target_frequency_hz,
        });
    }

    let ticks_per_period = f64::from(tick_rate_hz) / target_frequency_hz;
    let divisions = (ticks_per_period / temporal_resolution as f64).round();

    if divisions < 1.0 {
        return Err(ConfigError::TargetUnreachable {
            target_hz: target_frequency_hz,
            tick_rate_hz,
            temporal_resolution,
            ceiling_hz: true_frequency(tick_rate_hz, 1, temporal_resolution),
        });
    }

    if divisions * temporal_resolution as f64 > MAX_TABLE_CELLS as f64 {
        return Err(ConfigError::TableTooLarge {
            // `as` saturates, so an absurd value still prints sensibly
            phase_resolution: divisions as u64,
            temporal_resolution,
            limit: MAX_TABLE_CELLS,
        });
    }

    Ok(divisions as usize)
}

/// Output frequency actually produced by `phase_resolution` divisions.
///
/// `tick_rate_hz / (phase_resolution * temporal_resolution)`.
///
/// Returns `0.0` when either resolution is zero to avoid division by zero;
/// such values never get past [`phase_resolution`] in practice.
pub fn true_frequency(tick_rate_hz: u32, phase_resolution: usize, temporal_resolution: usize) -> f64 {
    let ticks_per_period = phase_resolution as f64 * temporal_resolution as f64;
    if ticks_per_period == 0.0 {
        0.0
    } else {
        f64::from(tick_rate_hz) / ticks_per_period
    }
}

/// Fixed interval between two scheduler ticks, rounded to whole nanoseconds.
///
/// # Errors
/// * [`ConfigError::InvalidTickRate`] – `tick_rate_hz == 0`.
/// * [`ConfigError::TickRateTooHigh`] – the interval rounds to 0ns.
pub fn tick_interval(tick_rate_hz: u32) -> Result<Duration, ConfigError> {
    if tick_rate_hz == 0 {
        return Err(ConfigError::InvalidTickRate {
            value: tick_rate_hz,
        });
    }

    let nanos = (NANOS_PER_SECOND / f64::from(tick_rate_hz)).round() as u64;
    if nanos == 0 {
        return Err(ConfigError::TickRateTooHigh {
            value: tick_rate_hz,
        });
    }
    Ok(Duration::from_nanos(nanos))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── phase_resolution ──────────────────────────────────────────────────────

    #[test]
    fn phase_resolution_exact_division() {
        // 30 kHz / 300 Hz = 100 ticks per period, 4 sub-slots → 25 divisions
        assert_eq!(phase_resolution(30_000, 300.0, 4).unwrap(), 25);
    }

    #[test]
    fn phase_resolution_rounds_to_nearest() {
        // 30000 / 290 / 4 = 25.86 → 26
        assert_eq!(phase_resolution(30_000, 290.0, 4).unwrap(), 26);
        // 30000 / 310 / 4 = 24.19 → 24
        assert_eq!(phase_resolution(30_000, 310.0, 4).unwrap(), 24);
    }

    #[test]
    fn phase_resolution_one_division_at_half_ceiling() {
        // 1000 / 4 = 250 Hz ceiling; 400 Hz → 0.625 → rounds up to 1
        assert_eq!(phase_resolution(1_000, 400.0, 4).unwrap(), 1);
    }

    #[test]
    fn phase_resolution_unreachable_target_is_an_error() {
        // 1000 / 4 / 600 = 0.42 → rounds to 0
        let err = phase_resolution(1_000, 600.0, 4).unwrap_err();
        match err {
            ConfigError::TargetUnreachable {
                target_hz,
                ceiling_hz,
                ..
            } => {
                assert_eq!(target_hz, 600.0);
                assert_eq!(ceiling_hz, 250.0);
            }
            other => panic!("expected TargetUnreachable, got {other:?}"),
        }
    }

    #[test]
    fn phase_resolution_rejects_zero_inputs() {
        assert_eq!(
            phase_resolution(0, 300.0, 4),
            Err(ConfigError::InvalidTickRate { value: 0 })
        );
        assert_eq!(
            phase_resolution(30_000, 300.0, 0),
            Err(ConfigError::InvalidTemporalResolution { value: 0 })
        );
    }

    #[test]
    fn phase_resolution_rejects_bad_target() {
        for bad in [0.0, -50.0, f64::INFINITY] {
            assert!(matches!(
                phase_resolution(30_000, bad, 4),
                Err(ConfigError::InvalidTargetFrequency { .. })
            ));
        }
        assert!(matches!(
            phase_resolution(30_000, f64::NAN, 4),
            Err(ConfigError::InvalidTargetFrequency { .. })
        ));
    }

    #[test]
    fn phase_resolution_rejects_oversized_table() {
        let result = phase_resolution(30_000, 0.000_1, 4);
        assert!(matches!(
            result,
            Err(ConfigError::TableTooLarge {
                limit: MAX_TABLE_CELLS,
                ..
            })
        ));
    }

    // ── true_frequency ────────────────────────────────────────────────────────

    #[test]
    fn true_frequency_matches_formula() {
        assert_eq!(true_frequency(30_000, 25, 4), 300.0);
        let f = true_frequency(30_000, 26, 4);
        assert!((f - 288.461_538).abs() < 1e-5, "got {f}");
    }

    #[test]
    fn true_frequency_zero_resolution_returns_zero() {
        assert_eq!(true_frequency(30_000, 0, 4), 0.0);
        assert_eq!(true_frequency(30_000, 25, 0), 0.0);
    }

    #[test]
    fn true_frequency_is_within_one_division_of_target() {
        // |true - target| ≤ target / phase_resolution across a realistic range
        for tick_rate_hz in [1_000_u32, 20_000, 30_000, 100_000, 250_000] {
            for temporal_resolution in [1_usize, 2, 4, 8, 16] {
                for target in [1.0, 17.5, 50.0, 60.0, 300.0, 1_234.5] {
                    let Ok(p) = phase_resolution(tick_rate_hz, target, temporal_resolution)
                    else {
                        continue;
                    };
                    let achieved = true_frequency(tick_rate_hz, p, temporal_resolution);
                    assert!(
                        (achieved - target).abs() <= target / p as f64 + 1e-9,
                        "tick={tick_rate_hz} T={temporal_resolution} target={target}: \
                         p={p} achieved={achieved}"
                    );
                }
            }
        }
    }

    // ── tick_interval ─────────────────────────────────────────────────────────

    #[test]
    fn tick_interval_rounds_to_nanoseconds() {
        // 1e9 / 30000 = 33333.33 → 33333ns
        assert_eq!(tick_interval(30_000).unwrap(), Duration::from_nanos(33_333));
        assert_eq!(tick_interval(1_000).unwrap(), Duration::from_millis(1));
    }

    #[test]
    fn tick_interval_rejects_zero_and_sub_nanosecond_rates() {
        assert_eq!(
            tick_interval(0),
            Err(ConfigError::InvalidTickRate { value: 0 })
        );
        assert_eq!(
            tick_interval(u32::MAX),
            Err(ConfigError::TickRateTooHigh { value: u32::MAX })
        );
    }
}
