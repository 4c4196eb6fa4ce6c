/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resolved generator parameters.
//!
//! A [`GeneratorPlan`] is what is left of a [`GeneratorConfig`] once every
//! derived quantity has been computed and checked: the tick interval, the
//! phase resolution and the frequency it actually yields.  Building a plan
//! touches no hardware, so every configuration error surfaces before a GPIO
//! line is requested.

use std::time::Duration;

use tracing::debug;

use crate::config::{ConfigError, GeneratorConfig};
use crate::gpio::LineOffset;
use crate::resolution;
use crate::scheduler::PhaseChannel;
use crate::timing::{PulsePlacement, TimingTable};
use crate::waveform::Waveform;

/// One output line and its phase offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSpec {
    pub line: LineOffset,
    pub offset_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorPlan {
    pub tick_rate_hz: u32,
    pub tick_interval: Duration,
    pub temporal_resolution: usize,
    pub phase_resolution: usize,
    pub target_frequency_hz: f64,
    /// `tick_rate_hz / (phase_resolution * temporal_resolution)`.
    pub true_frequency_hz: f64,
    pub waveform: Waveform,
    pub placement: PulsePlacement,
    pub phases: Vec<PhaseSpec>,
}

impl GeneratorPlan {
    /// Validate `config` and derive every timing quantity from it.
    ///
    /// # Errors
    /// Any [`ConfigError`] from [`GeneratorConfig::validate`],
    /// [`resolution::phase_resolution`] or [`resolution::tick_interval`].
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let tick_interval = resolution::tick_interval(config.tick_rate_hz)?;
        let phase_resolution = resolution::phase_resolution(
            config.tick_rate_hz,
            config.target_frequency_hz,
            config.temporal_resolution,
        )?;
        let true_frequency_hz = resolution::true_frequency(
            config.tick_rate_hz,
            phase_resolution,
            config.temporal_resolution,
        );

        let phases = config
            .lines
            .iter()
            .zip(&config.phase_offsets_degrees)
            .map(|(&line, &offset_degrees)| PhaseSpec {
                line,
                offset_degrees,
            })
            .collect();

        debug!(
            phase_resolution,
            true_frequency_hz,
            tick_interval_ns = tick_interval.as_nanos() as u64,
            "Generator plan resolved"
        );

        Ok(Self {
            tick_rate_hz: config.tick_rate_hz,
            tick_interval,
            temporal_resolution: config.temporal_resolution,
            phase_resolution,
            target_frequency_hz: config.target_frequency_hz,
            true_frequency_hz,
            waveform: config.waveform,
            placement: config.pulse_placement,
            phases,
        })
    }

    /// Line offsets in phase order, ready for a line-group request.
    pub fn line_offsets(&self) -> Vec<LineOffset> {
        self.phases.iter().map(|p| p.line).collect()
    }

    pub fn ticks_per_period(&self) -> u64 {
        (self.phase_resolution * self.temporal_resolution) as u64
    }

    /// Sample the waveform once per phase and compile each into a timing
    /// table.
    pub fn compile_channels(&self) -> Result<Vec<PhaseChannel>, ConfigError> {
        self.phases
            .iter()
            .map(|phase| {
                let samples = self.waveform.table(phase.offset_degrees);
                let table = TimingTable::compile(
                    &samples,
                    self.phase_resolution,
                    self.temporal_resolution,
                    self.placement,
                )?;
                debug!(
                    line = phase.line,
                    offset_degrees = phase.offset_degrees,
                    mean_duty = table.mean_duty(),
                    transitions = table.transitions(),
                    "Compiled timing table"
                );
                Ok(PhaseChannel::new(phase.line, table))
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_to_25_divisions() {
        let plan = GeneratorPlan::from_config(&GeneratorConfig::default()).unwrap();
        assert_eq!(plan.phase_resolution, 25);
        assert_eq!(plan.temporal_resolution, 4);
        assert_eq!(plan.ticks_per_period(), 100);
        assert!((plan.true_frequency_hz - 300.0).abs() < 1e-9);
        assert_eq!(plan.tick_interval, Duration::from_nanos(33_333));
        assert_eq!(plan.line_offsets(), vec![203, 11, 12]);
    }

    #[test]
    fn rounding_reports_the_true_frequency() {
        let config = GeneratorConfig {
            target_frequency_hz: 7.0,
            ..Default::default()
        };
        let plan = GeneratorPlan::from_config(&config).unwrap();
        // 30000 / 7 / 4 = 1071.43 -> 1071
        assert_eq!(plan.phase_resolution, 1071);
        assert!((plan.true_frequency_hz - 30_000.0 / 4284.0).abs() < 1e-9);
        assert!((plan.true_frequency_hz - 7.0).abs() <= 7.0 / 1071.0);
    }

    #[test]
    fn unreachable_target_fails_before_compiling() {
        let config = GeneratorConfig {
            target_frequency_hz: 20_000.0,
            ..Default::default()
        };
        assert!(matches!(
            GeneratorPlan::from_config(&config),
            Err(ConfigError::TargetUnreachable { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GeneratorConfig {
            lines: vec![1, 2],
            ..Default::default()
        };
        assert!(matches!(
            GeneratorPlan::from_config(&config),
            Err(ConfigError::PhaseCountMismatch { .. })
        ));
    }

    #[test]
    fn three_phase_channels_are_shifted_copies() {
        let plan = GeneratorPlan::from_config(&GeneratorConfig::default()).unwrap();
        let channels = plan.compile_channels().unwrap();
        assert_eq!(channels.len(), 3);

        // 120 degrees of 25 divisions is not a whole division count, so
        // compare mean duty instead of exact rows.
        for channel in &channels {
            assert_eq!(channel.table().phase_resolution(), 25);
            assert_eq!(channel.table().temporal_resolution(), 4);
            assert!(!channel.is_high());
        }
        assert_eq!(
            channels.iter().map(|c| c.line()).collect::<Vec<_>>(),
            vec![203, 11, 12]
        );
        let first = channels[0].table().mean_duty();
        for channel in &channels[1..] {
            assert!((channel.table().mean_duty() - first).abs() < 0.1);
        }
    }

    #[test]
    fn half_period_offset_inverts_a_square_wave() {
        let config = GeneratorConfig {
            // 30000 / 750 / 4 = 10 divisions
            target_frequency_hz: 750.0,
            waveform: Waveform::Square,
            lines: vec![1, 2],
            phase_offsets_degrees: vec![0.0, 180.0],
            ..Default::default()
        };
        let plan = GeneratorPlan::from_config(&config).unwrap();
        assert_eq!(plan.phase_resolution, 10);

        let channels = plan.compile_channels().unwrap();
        let a = channels[0].table();
        let b = channels[1].table();
        for d in 0..10 {
            assert_eq!(a.get(d, 0), !b.get(d, 0), "division {d}");
        }
    }
}
