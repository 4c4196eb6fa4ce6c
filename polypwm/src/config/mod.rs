//! Generator configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! generator:
//!   tick_rate_hz: 30000
//!   temporal_resolution: 4
//!   target_frequency_hz: 300.0
//!   waveform: sine                 # sine | square | triangle | sawtooth
//!   pulse_placement: leading_edge  # leading_edge | centered
//! gpio:
//!   chip: /dev/gpiochip1
//!   consumer: polypwm
//!   lines: [203, 11, 12]
//!   phase_offsets_degrees: [0.0, 120.0, 240.0]
//! ```
//!
//! Every field is optional; anything missing falls back to
//! [`GeneratorConfig::default`].  Command-line flags are applied on top with
//! [`GeneratorConfig::apply_overrides`], then [`GeneratorConfig::validate`]
//! checks everything that can be checked without touching hardware.

mod error;

pub use error::ConfigError;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::gpio::LineOffset;
use crate::timing::PulsePlacement;
use crate::waveform::Waveform;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Ticks per second.  Software toggling gets unstable above ~25-30 kHz on
/// small SBCs.
pub const DEFAULT_TICK_RATE_HZ: u32 = 30_000;
/// Sub-slots per division; 4 gives five duty levels (0, 25, 50, 75, 100 %).
pub const DEFAULT_TEMPORAL_RESOLUTION: usize = 4;
pub const DEFAULT_TARGET_FREQUENCY_HZ: f64 = 300.0;
pub const DEFAULT_CHIP: &str = "/dev/gpiochip1";
pub const DEFAULT_CONSUMER: &str = "polypwm";
pub const DEFAULT_LINES: [LineOffset; 3] = [203, 11, 12];
pub const DEFAULT_PHASE_OFFSETS_DEGREES: [f64; 3] = [0.0, 120.0, 240.0];

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// This is kept private – callers work with [`GeneratorConfig`] instead.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    generator: GeneratorEntry,
    #[serde(default)]
    gpio: GpioEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorEntry {
    tick_rate_hz: Option<u32>,
    temporal_resolution: Option<usize>,
    target_frequency_hz: Option<f64>,
    waveform: Option<Waveform>,
    pulse_placement: Option<PulsePlacement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GpioEntry {
    chip: Option<PathBuf>,
    consumer: Option<String>,
    lines: Option<Vec<LineOffset>>,
    phase_offsets_degrees: Option<Vec<f64>>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Everything the generator needs at startup.  Not reconfigurable while
/// running.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Base tick frequency driving the absolute-sleep cadence.
    pub tick_rate_hz: u32,
    /// Sub-slots per division.
    pub temporal_resolution: usize,
    /// Desired output waveform frequency.
    pub target_frequency_hz: f64,
    pub waveform: Waveform,
    pub pulse_placement: PulsePlacement,
    /// GPIO chip device, e.g. `/dev/gpiochip1`.
    pub chip: PathBuf,
    /// Consumer tag shown by `gpioinfo` for the requested lines.
    pub consumer: String,
    /// Line offsets, one per phase.
    pub lines: Vec<LineOffset>,
    /// Phase offsets in degrees, matching `lines` in count and order.
    pub phase_offsets_degrees: Vec<f64>,
}

impl Default for GeneratorConfig {
    /// Three-phase 300 Hz sine on lines 203/11/12 of `/dev/gpiochip1`.
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            temporal_resolution: DEFAULT_TEMPORAL_RESOLUTION,
            target_frequency_hz: DEFAULT_TARGET_FREQUENCY_HZ,
            waveform: Waveform::default(),
            pulse_placement: PulsePlacement::default(),
            chip: PathBuf::from(DEFAULT_CHIP),
            consumer: DEFAULT_CONSUMER.to_string(),
            lines: DEFAULT_LINES.to_vec(),
            phase_offsets_degrees: DEFAULT_PHASE_OFFSETS_DEGREES.to_vec(),
        }
    }
}

/// Values supplied on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub tick_rate_hz: Option<u32>,
    pub temporal_resolution: Option<usize>,
    pub target_frequency_hz: Option<f64>,
    pub waveform: Option<Waveform>,
    pub pulse_placement: Option<PulsePlacement>,
    pub chip: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Parses `path` into a configuration, filling gaps with defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the YAML is
    /// structurally invalid, or if it contains unknown keys.  Value ranges
    /// are *not* checked here; see [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading generator configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }

    /// Parses a YAML document (same layout as the configuration file).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to `()`, not to a mapping
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("invalid generator configuration")?
        };

        let defaults = Self::default();
        let GeneratorEntry {
            tick_rate_hz,
            temporal_resolution,
            target_frequency_hz,
            waveform,
            pulse_placement,
        } = file.generator;
        let GpioEntry {
            chip,
            consumer,
            lines,
            phase_offsets_degrees,
        } = file.gpio;

        let config = Self {
            tick_rate_hz: tick_rate_hz.unwrap_or(defaults.tick_rate_hz),
            temporal_resolution: temporal_resolution.unwrap_or(defaults.temporal_resolution),
            target_frequency_hz: target_frequency_hz.unwrap_or(defaults.target_frequency_hz),
            waveform: waveform.unwrap_or(defaults.waveform),
            pulse_placement: pulse_placement.unwrap_or(defaults.pulse_placement),
            chip: chip.unwrap_or(defaults.chip),
            consumer: consumer.unwrap_or(defaults.consumer),
            lines: lines.unwrap_or(defaults.lines),
            phase_offsets_degrees: phase_offsets_degrees.unwrap_or(defaults.phase_offsets_degrees),
        };

        debug!(config = ?config, "Parsed generator configuration");
        Ok(config)
    }

    /// Replace every field for which `overrides` carries a value.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.tick_rate_hz {
            self.tick_rate_hz = v;
        }
        if let Some(v) = overrides.temporal_resolution {
            self.temporal_resolution = v;
        }
        if let Some(v) = overrides.target_frequency_hz {
            self.target_frequency_hz = v;
        }
        if let Some(v) = overrides.waveform {
            self.waveform = v;
        }
        if let Some(v) = overrides.pulse_placement {
            self.pulse_placement = v;
        }
        if let Some(v) = &overrides.chip {
            self.chip = v.clone();
        }
    }

    /// Check every value that does not depend on the resolution arithmetic.
    ///
    /// The target frequency's reachability is checked later, by
    /// [`GeneratorPlan::from_config`](crate::plan::GeneratorPlan::from_config),
    /// which needs the phase resolution anyway.
    ///
    /// # Errors
    /// The first [`ConfigError`] found, in field order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::InvalidTickRate {
                value: self.tick_rate_hz,
            });
        }
        if self.temporal_resolution == 0 {
            return Err(ConfigError::InvalidTemporalResolution {
                value: self.temporal_resolution,
            });
        }
        if !self.target_frequency_hz.is_finite() || self.target_frequency_hz <= 0.0 {
            return Err(ConfigError::InvalidTargetFrequency {
                value: self.target_frequency_hz,
            });
        }
        if self.consumer.is_empty() {
            return Err(ConfigError::EmptyConsumer);
        }
        if self.lines.is_empty() {
            return Err(ConfigError::NoLines);
        }
        if self.lines.len() != self.phase_offsets_degrees.len() {
            return Err(ConfigError::PhaseCountMismatch {
                lines: self.lines.len(),
                offsets: self.phase_offsets_degrees.len(),
            });
        }

        let mut seen = BTreeSet::new();
        if let Some(&line) = self.lines.iter().find(|&&line| !seen.insert(line)) {
            return Err(ConfigError::DuplicateLine { line });
        }

        if let Some((index, &value)) = self
            .phase_offsets_degrees
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ConfigError::InvalidPhaseOffset { index, value });
        }

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── GeneratorConfig::default ──────────────────────────────────────────────

    #[test]
    fn default_config_is_three_phase_300hz_sine() {
        let cfg = GeneratorConfig::default();
        assert_eq!(cfg.tick_rate_hz, 30_000);
        assert_eq!(cfg.temporal_resolution, 4);
        assert_eq!(cfg.target_frequency_hz, 300.0);
        assert_eq!(cfg.waveform, Waveform::Sine);
        assert_eq!(cfg.pulse_placement, PulsePlacement::LeadingEdge);
        assert_eq!(cfg.chip, PathBuf::from("/dev/gpiochip1"));
        assert_eq!(cfg.lines, vec![203, 11, 12]);
        assert_eq!(cfg.phase_offsets_degrees, vec![0.0, 120.0, 240.0]);
        assert!(cfg.validate().is_ok());
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
generator:
  tick_rate_hz: 20000
  temporal_resolution: 8
  target_frequency_hz: 50.0
  waveform: triangle
  pulse_placement: centered
gpio:
  chip: /dev/gpiochip0
  consumer: "inverter-test"
  lines: [17, 27]
  phase_offsets_degrees: [0.0, 180.0]
"#;
        let f = yaml_tempfile(yaml);
        let cfg = GeneratorConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.tick_rate_hz, 20_000);
        assert_eq!(cfg.temporal_resolution, 8);
        assert_eq!(cfg.target_frequency_hz, 50.0);
        assert_eq!(cfg.waveform, Waveform::Triangle);
        assert_eq!(cfg.pulse_placement, PulsePlacement::Centered);
        assert_eq!(cfg.chip, PathBuf::from("/dev/gpiochip0"));
        assert_eq!(cfg.consumer, "inverter-test");
        assert_eq!(cfg.lines, vec![17, 27]);
        assert_eq!(cfg.phase_offsets_degrees, vec![0.0, 180.0]);
    }

    #[test]
    fn bundled_three_phase_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/three_phase.yaml");
        let cfg = GeneratorConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg, GeneratorConfig::default());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let yaml = r#"
generator:
  target_frequency_hz: 60.0
"#;
        let f = yaml_tempfile(yaml);
        let cfg = GeneratorConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.target_frequency_hz, 60.0);
        assert_eq!(cfg.tick_rate_hz, DEFAULT_TICK_RATE_HZ);
        assert_eq!(cfg.lines, DEFAULT_LINES.to_vec());
        assert_eq!(cfg.consumer, DEFAULT_CONSUMER);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let f = yaml_tempfile("");
        let cfg = GeneratorConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg, GeneratorConfig::default());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = GeneratorConfig::load_from_file(Path::new("/nonexistent/path/pwm.yaml"));
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("Cannot open configuration file"), "got: {msg}");
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(GeneratorConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "generator:\n  tick_rate: 30000\n";
        let err = GeneratorConfig::from_yaml_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("tick_rate"), "got: {err:#}");
    }

    #[test]
    fn unknown_waveform_is_rejected() {
        let yaml = "generator:\n  waveform: cosine\n";
        assert!(GeneratorConfig::from_yaml_str(yaml).is_err());
    }

    // ── apply_overrides ───────────────────────────────────────────────────────

    #[test]
    fn overrides_replace_only_supplied_fields() {
        let mut cfg = GeneratorConfig::default();
        cfg.apply_overrides(&ConfigOverrides {
            target_frequency_hz: Some(50.0),
            chip: Some(PathBuf::from("/dev/gpiochip3")),
            waveform: Some(Waveform::Square),
            ..Default::default()
        });

        assert_eq!(cfg.target_frequency_hz, 50.0);
        assert_eq!(cfg.chip, PathBuf::from("/dev/gpiochip3"));
        assert_eq!(cfg.waveform, Waveform::Square);
        assert_eq!(cfg.tick_rate_hz, DEFAULT_TICK_RATE_HZ);
        assert_eq!(cfg.temporal_resolution, DEFAULT_TEMPORAL_RESOLUTION);
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn validate_rejects_zero_resolutions() {
        let cfg = GeneratorConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidTickRate { value: 0 }));

        let cfg = GeneratorConfig {
            temporal_resolution: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidTemporalResolution { value: 0 })
        );
    }

    #[test]
    fn validate_rejects_bad_target_frequency() {
        let cfg = GeneratorConfig {
            target_frequency_hz: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTargetFrequency { .. })
        ));
    }

    #[test]
    fn validate_rejects_mismatched_phase_count() {
        let cfg = GeneratorConfig {
            lines: vec![1, 2, 3],
            phase_offsets_degrees: vec![0.0, 180.0],
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PhaseCountMismatch {
                lines: 3,
                offsets: 2
            })
        );
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_lines() {
        let cfg = GeneratorConfig {
            lines: vec![],
            phase_offsets_degrees: vec![],
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoLines));

        let cfg = GeneratorConfig {
            lines: vec![5, 6, 5],
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicateLine { line: 5 }));
    }

    #[test]
    fn validate_rejects_non_finite_offsets() {
        let cfg = GeneratorConfig {
            phase_offsets_degrees: vec![0.0, f64::INFINITY, 240.0],
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPhaseOffset { index: 1, .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_consumer() {
        let cfg = GeneratorConfig {
            consumer: String::new(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyConsumer));
    }

    #[test]
    fn error_messages_name_the_parameter() {
        let cfg = GeneratorConfig {
            lines: vec![1],
            ..Default::default()
        };
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("phase_offsets_degrees"), "got: {msg}");
    }
}
