// src/lib.rs

pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Event, Supervisor};
use crate::fs::RealFileSystem;
use crate::report::{StatusBoard, print_events};

/// Capacity of the event stream between the supervisor and the console.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the supervisor (one watcher + runner per command)
/// - the console reporter
/// - Ctrl-C handling and the exit summary
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let specs = cfg.command_specs();
    let mut board = StatusBoard::new(specs.iter().map(|s| s.name.clone()));

    let (events_tx, events_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAPACITY);
    let supervisor = Supervisor::start(
        specs,
        cfg.watch_options(),
        Arc::new(RealFileSystem),
        events_tx,
    )?;

    {
        let mut stdout = std::io::stdout();
        let printer = print_events(events_rx, &mut board, &mut stdout);
        tokio::pin!(printer);

        let stream_ended = tokio::select! {
            printed = &mut printer => {
                printed?;
                true
            }
            _ = wait_for_ctrl_c() => {
                info!("Ctrl-C received; shutting down");
                false
            }
        };

        if stream_ended {
            supervisor.shutdown().await;
        } else {
            // Keep printing while the units drain, so the final events show up.
            let ((), printed) = tokio::join!(supervisor.shutdown(), printer);
            printed?;
        }
    }

    println!();
    print!("{}", board.render_summary());
    Ok(())
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Simple dry-run output: print settings and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("rorsch dry-run");
    println!("  settings.debounce_ms = {}", cfg.settings.debounce_ms);
    println!("  settings.cooldown_ms = {}", cfg.settings.cooldown_ms);
    println!("  settings.rescan_secs = {}", cfg.settings.rescan_secs);
    println!();

    println!("commands ({}):", cfg.commands.len());
    for command in &cfg.commands {
        println!("  - {}", command.name);
        println!("      exec: {}", command.exec);
        println!("      glob: {}", command.glob);
        if let Some(ref cwd) = command.cwd {
            println!("      cwd: {}", cwd.display());
        }
    }

    debug!("dry-run complete (no execution)");
}
