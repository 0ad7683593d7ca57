//! ch9329-host entry point.
//!
//! Drives a CH9329 serial-to-USB-HID adapter from an event script, so a
//! second machine can be controlled as if a keyboard and mouse were plugged
//! into it.
//!
//! # Usage
//!
//! ```text
//! ch9329-host [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --port <PORT>          Serial port of the adapter (e.g. COM5, /dev/ttyUSB0)
//!   --baud <BAUD>          Baud rate [default: 57600]
//!   --script <PATH>        Event script to replay; `-` reads stdin [default: -]
//!   --dry-run              Log frames instead of opening a serial port
//!   --keep-awake <MODE>    off | while-inactive | always
//! ```
//!
//! CLI flags take precedence over the config file.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, apply CLI overrides
//!  └─ open SerialSink (or DryRunSink)
//!  └─ RemoteSession around HidEncoder
//!       ├─ keep-awake task        (Tokio task)
//!       └─ event pump             (blocking thread, fed by the script source)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use ch9329_core::{HidEncoder, TransportSink};
use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ch9329_host::application::event_pump::pump_events;
use ch9329_host::application::keep_awake::{run_keep_awake, KeepAwakeMode};
use ch9329_host::application::session::RemoteSession;
use ch9329_host::infrastructure::input_capture::script::ScriptInputSource;
use ch9329_host::infrastructure::input_capture::InputSource;
use ch9329_host::infrastructure::serial::{DryRunSink, SerialSink};
use ch9329_host::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drives a CH9329 HID-over-serial adapter from an event script.
#[derive(Debug, Parser)]
#[command(
    name = "ch9329-host",
    about = "Send keyboard, mouse and media input to a CH9329 USB HID adapter",
    version
)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, env = "CH9329_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port the adapter is attached to.
    #[arg(long, env = "CH9329_PORT")]
    port: Option<String>,

    /// Serial baud rate; must match the adapter's configuration.
    #[arg(long)]
    baud: Option<u32>,

    /// Event script to replay.  `-` streams commands from stdin.
    #[arg(long, default_value = "-")]
    script: String,

    /// Log frames instead of writing them to a serial port.
    #[arg(long)]
    dry_run: bool,

    /// Keep-awake mode, overriding the config file.
    #[arg(long, value_enum)]
    keep_awake: Option<KeepAwakeMode>,
}

impl Cli {
    /// Loads the config file named by `--config`, or the platform default.
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load config")?,
        };
        Ok(cfg)
    }

    /// Applies the CLI overrides on top of `cfg`.
    fn apply_overrides(&self, mut cfg: AppConfig) -> anyhow::Result<AppConfig> {
        if let Some(port) = &self.port {
            cfg.serial.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            cfg.serial.baud_rate = baud;
        }
        if let Some(mode) = self.keep_awake {
            cfg.keep_awake.mode = mode;
        }
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    fn input_source(&self) -> anyhow::Result<ScriptInputSource> {
        if self.script == "-" {
            return Ok(ScriptInputSource::stdin());
        }
        ScriptInputSource::from_file(&self.script)
            .with_context(|| format!("failed to load input script {}", self.script))
    }
}

fn open_sink(cfg: &AppConfig, dry_run: bool) -> anyhow::Result<Arc<dyn TransportSink>> {
    if dry_run {
        info!("dry run: frames are logged, not sent");
        return Ok(Arc::new(DryRunSink::new()));
    }
    let settings = cfg
        .serial_settings()
        .context("no serial port configured; pass --port or set [serial] port")?;
    let sink = SerialSink::open(&settings)
        .with_context(|| format!("failed to open serial port {}", settings.port))?;
    info!(port = %sink.name(), baud = settings.baud_rate, "serial port open");
    Ok(Arc::new(sink))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.apply_overrides(cli.load_config()?)?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.host.log_level)),
        )
        .init();

    info!("ch9329-host starting");

    let sink = open_sink(&cfg, cli.dry_run)?;
    let encoder = HidEncoder::with_timing(sink, cfg.encoder_timing());
    let session = Arc::new(Mutex::new(RemoteSession::new(encoder)));

    // ── Keep-awake ────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let keep_awake = tokio::spawn(run_keep_awake(
        Arc::clone(&session),
        cfg.keep_awake_settings(),
        shutdown_rx,
    ));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let source = Arc::new(cli.input_source()?);
    {
        let running = Arc::clone(&running);
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C, shutting down");
                    running.store(false, Ordering::Relaxed);
                    source.stop();
                }
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    // ── Event pump ────────────────────────────────────────────────────────────
    let events = source.start().context("failed to start input source")?;
    let pump_session = Arc::clone(&session);
    let pump_running = Arc::clone(&running);
    let stats = tokio::task::spawn_blocking(move || {
        pump_events(&events, &pump_session, &pump_running)
    })
    .await
    .context("event pump panicked")?;

    info!(
        events = stats.events,
        forwarded = stats.forwarded,
        suppressed = stats.suppressed,
        errors = stats.errors,
        "input finished"
    );

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let _ = shutdown_tx.send(true);
    if let Err(e) = keep_awake.await {
        warn!("keep-awake task failed: {e}");
    }

    let shutdown_session = Arc::clone(&session);
    tokio::task::spawn_blocking(move || shutdown_session.lock().shutdown())
        .await
        .context("shutdown task panicked")?
        .context("failed to release keys and buttons on the target")?;

    info!("ch9329-host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
