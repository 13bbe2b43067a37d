mod cli;
mod error_fmt;
mod generate;
mod inspect;
mod upload;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use jetgrid_config::{Config, Logging};
use jetgrid_core::GenError;
use serde_json::json;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn file_layer(logging: &Logging) -> Option<BoxedLayer> {
    let path = Path::new(logging.file.as_deref()?);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name()?;
    let appender = match logging.rotation.as_deref() {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if let Ok(mut slot) = FILE_GUARD.lock() {
        *slot = Some(guard);
    }
    let level = logging.level.as_deref().unwrap_or("info");
    Some(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(level))
            .boxed(),
    )
}

/// Console output goes to stderr so stdout stays machine-readable.
fn init_tracing(cli: &Cli, logging: Option<&Logging>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let console: BoxedLayer = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };
    let mut layers = vec![console];
    layers.extend(logging.and_then(file_layer));
    let _ = Registry::default().with(layers).try_init();
}

fn load_config(path: &Path) -> Result<Config> {
    jetgrid_config::load_file(path).wrap_err(GenError::Config(path.display().to_string()))
}

fn emit(json_mode: bool, value: serde_json::Value, human: String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{human}");
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = match cli.cmd {
        Commands::Generate { .. } => Some(load_config(&cli.config)),
        _ => None,
    }
    .transpose();
    // Tracing comes up before config errors are reported so they reach the log too
    init_tracing(cli, cfg.as_ref().ok().and_then(|c| c.as_ref()).map(|c| &c.logging));
    let cfg = cfg?;

    match &cli.cmd {
        Commands::Generate {
            out,
            frames,
            workers,
            stats,
        } => {
            let cfg = cfg.ok_or_else(|| GenError::Invariant("config not loaded".into()))?;
            let s = generate::run_generate(&cfg, out, *frames, *workers, stats.as_deref())?;
            let human = format!(
                "wrote {} and {} ({} frames, {} bytes, mean transparency {:.3})",
                s.header.display(),
                s.binary.display(),
                s.frames,
                s.bytes,
                s.mean_transparency
            );
            emit(cli.json, serde_json::to_value(&s)?, human);
        }
        Commands::Inspect { file, min_run } => {
            let r = inspect::run_inspect(file, *min_run)?;
            let shortest = r
                .shortest_interior_run
                .map_or_else(|| "n/a".to_string(), |n| n.to_string());
            let human = format!(
                "{} frames, {} ms total, open valves {}..{}, mean transparency {:.3}, shortest interior run {shortest}",
                r.frames, r.total_duration_ms, r.min_open, r.max_open, r.mean_transparency
            );
            emit(cli.json, serde_json::to_value(&r)?, human);
        }
        Commands::Upload {
            file,
            port,
            name,
            sim,
            baud,
            reply_timeout,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
                tracing::warn!(error = %e, "could not install Ctrl-C handler");
            }
            let r = upload::run_upload(
                file,
                port.as_deref(),
                name.as_deref(),
                *sim,
                *baud,
                *reply_timeout,
                &shutdown,
            )?;
            let human = format!(
                "Success! uploaded {} frames ({} bytes) as {}",
                r.frames_sent, r.bytes_sent, r.device_name
            );
            let value = json!({
                "status": "Success",
                "frames": r.frames_sent,
                "bytes": r.bytes_sent,
                "name": r.device_name,
            });
            emit(cli.json, value, human);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };

    // process::exit skips destructors; flush the file writer first
    if let Ok(mut slot) = FILE_GUARD.lock() {
        slot.take();
    }
    std::process::exit(code);
}
