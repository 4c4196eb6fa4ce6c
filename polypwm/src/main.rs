/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use polypwm::config::{ConfigOverrides, GeneratorConfig};
use polypwm::gpio::sim::SimulatedLineGroup;
use polypwm::gpio::{LineGroup, LineOffset};
use polypwm::plan::GeneratorPlan;
use polypwm::scheduler::{MonotonicClock, Scheduler, TickStats};
use polypwm::timing::PulsePlacement;
use polypwm::waveform::Waveform;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Software-timed polyphase PWM generator.
///
/// Example:
///   polypwm -c pwm.yaml -f 50 --waveform triangle
///   polypwm --simulate --periods 300
#[derive(Debug, Parser)]
#[command(
    name = "polypwm",
    about = "Software-timed polyphase PWM generator for Linux GPIO lines",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML generator configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Base tick rate in Hz.
    #[arg(short = 't', long = "tick-rate")]
    tick_rate: Option<u32>,

    /// Target output waveform frequency in Hz.
    #[arg(short = 'f', long = "frequency")]
    frequency: Option<f64>,

    /// Sub-slots per division (duty levels = value + 1).
    #[arg(short = 'r', long = "temporal-resolution")]
    temporal_resolution: Option<usize>,

    /// Output waveform shape.
    #[arg(short = 'w', long = "waveform", value_enum)]
    waveform: Option<Waveform>,

    /// Position of the high sub-slots inside a division.
    #[arg(long = "placement", value_enum)]
    placement: Option<PulsePlacement>,

    /// GPIO chip device, e.g. /dev/gpiochip0.
    #[arg(long = "chip")]
    chip: Option<PathBuf>,

    /// Drive simulated lines instead of hardware.
    #[arg(long = "simulate", default_value_t = false)]
    simulate: bool,

    /// Stop after this many waveform periods instead of running until signaled.
    #[arg(long = "periods")]
    periods: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            tick_rate_hz: self.tick_rate,
            temporal_resolution: self.temporal_resolution,
            target_frequency_hz: self.frequency,
            waveform: self.waveform,
            pulse_placement: self.placement,
            chip: self.chip.clone(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("polypwm starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => match GeneratorConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load generator configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using default generator settings");
            GeneratorConfig::default()
        }
    };
    config.apply_overrides(&cli.overrides());

    // ── Validate and resolve ──────────────────────────────────────────────────
    let plan = match GeneratorPlan::from_config(&config) {
        Ok(plan) => plan,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    info!(
        chip      = %config.chip.display(),
        lines     = ?plan.line_offsets(),
        offsets   = ?config.phase_offsets_degrees,
        waveform  = %plan.waveform,
        placement = ?plan.placement,
        simulate  = cli.simulate,
        "Configuration"
    );

    // ── Acquire lines and run ─────────────────────────────────────────────────
    let lines = plan.line_offsets();

    let stats = if cli.simulate {
        run_generator(SimulatedLineGroup::request(&lines), &plan, cli.periods).await
    } else {
        run_hardware(&config, &lines, &plan, cli.periods).await
    };

    match stats {
        Ok(stats) => {
            info!(
                ticks          = stats.ticks,
                periods        = stats.periods,
                writes         = stats.writes,
                write_failures = stats.write_failures,
                overruns       = stats.overruns,
                "polypwm stopped"
            );
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

#[cfg(target_os = "linux")]
async fn run_hardware(
    config: &GeneratorConfig,
    lines: &[LineOffset],
    plan: &GeneratorPlan,
    periods: Option<u64>,
) -> anyhow::Result<TickStats> {
    use anyhow::Context;
    use polypwm::gpio::cdev::CdevLineGroup;

    let group = CdevLineGroup::request(&config.chip, lines, &config.consumer)
        .context("Failed to acquire GPIO lines")?;
    run_generator(group, plan, periods).await
}

#[cfg(not(target_os = "linux"))]
async fn run_hardware(
    _config: &GeneratorConfig,
    _lines: &[LineOffset],
    _plan: &GeneratorPlan,
    _periods: Option<u64>,
) -> anyhow::Result<TickStats> {
    anyhow::bail!("GPIO character devices are only available on Linux; use --simulate")
}

/// Compile the tables, then run the scheduler on a blocking thread until it
/// finishes or a shutdown signal arrives.
async fn run_generator<G>(
    group: G,
    plan: &GeneratorPlan,
    periods: Option<u64>,
) -> anyhow::Result<TickStats>
where
    G: LineGroup + Send + 'static,
{
    let channels = plan.compile_channels()?;

    info!(
        target_frequency_hz = plan.target_frequency_hz,
        true_frequency_hz   = plan.true_frequency_hz,
        phase_resolution    = plan.phase_resolution,
        temporal_resolution = plan.temporal_resolution,
        tick_interval_ns    = plan.tick_interval.as_nanos() as u64,
        "Timing tables compiled"
    );

    let tick_limit = periods.map(|p| p.saturating_mul(plan.ticks_per_period()));
    let tick_interval = plan.tick_interval;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);

    // The scheduler is built on the worker thread so its first deadline is
    // taken right before the first tick.
    let mut worker = tokio::task::spawn_blocking(move || {
        let mut scheduler = Scheduler::new(group, channels, tick_interval, MonotonicClock)?;
        let stats = match tick_limit {
            Some(ticks) => scheduler.run_for(ticks, &flag),
            None => scheduler.run(&flag),
        };
        anyhow::Ok(stats)
    });

    let joined = tokio::select! {
        res = &mut worker => res,
        () = shutdown_signal() => {
            info!("Shutdown signal received, stopping PWM loop");
            shutdown.store(true, Ordering::Relaxed);
            worker.await
        }
    };

    joined?
}

/// Resolves on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
