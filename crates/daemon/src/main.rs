// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! `relayd`: the claude-relay daemon binary.
//!
//! Loads configuration, acquires a single-instance lock, wires together
//! the Session Index, Multiplexer Manager, and Terminal Bridge, and
//! serves the HTTP + WebSocket API until a termination signal arrives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fs2::FileExt;
use relay_adapters::{watch_log_root, TmuxMultiplexerAdapter};
use relay_core::{MultiplexerStatus, SessionId};
use relay_daemon::bridge::{BridgeConfig, NativePtySpawner, TerminalBridge};
use relay_daemon::http::{self, AppState};
use relay_daemon::manager::{ManagerConfig, MultiplexerManager};
use relay_daemon::{Config, ConfigError, SessionIndex};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Full rescan cadence.
const RESCAN_INTERVAL: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("relayd {}", env!("CARGO_PKG_VERSION"));
                println!("claude-relay daemon: exposes local CLI sessions over HTTP + WebSocket.");
                println!();
                println!("USAGE:");
                println!("    relayd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: relayd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("relayd: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    let lock_file = match acquire_lock(&config.lock_path) {
        Ok(file) => file,
        Err(_) => {
            let pid = fs::read_to_string(&config.lock_path).unwrap_or_default();
            eprintln!("relayd is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            drop(log_guard);
            std::process::exit(1);
        }
    };

    info!(port = config.port, host = %config.host, "starting relayd");

    let mut index = SessionIndex::new(config.claude_session_dir.clone(), config.cache_path.clone());
    index.load_cache();
    index.rescan(Utc::now());

    let bridge = TerminalBridge::new(Arc::new(NativePtySpawner), BridgeConfig {
        heartbeat_interval: Duration::from_secs(config.ws_heartbeat_secs),
        max_missed_pongs: config.ws_max_missed_pongs,
        ..BridgeConfig::default()
    });

    let manager = MultiplexerManager::new(
        TmuxMultiplexerAdapter::new(),
        {
            let bridge = bridge.clone();
            Arc::new(move |id: &SessionId| bridge.has_active(id))
        },
        ManagerConfig {
            tab_prefix: relay_core::DEFAULT_TAB_PREFIX.to_string(),
            cli_binary: config.claude_binary.clone(),
            default_cols: config.tmux_default_cols,
            default_rows: config.tmux_default_rows,
            max_sessions: config.claude_max_sessions,
        },
    );

    match manager.reconcile().await {
        Ok(ids) => {
            for id in ids {
                index.set_multiplexer_status(&id, MultiplexerStatus::Detached);
            }
        }
        Err(e) => warn!(error = %e, "reconcile at startup failed"),
    }

    let tab_prefix = relay_core::DEFAULT_TAB_PREFIX.to_string();
    let state = Arc::new(AppState::new(index, manager, bridge.clone(), config.clone(), tab_prefix));

    bridge.start();
    spawn_watcher(state.clone());
    spawn_rescan_timer(state.clone());

    let app = http::router(state.clone());
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %addr, error = %e, "failed to bind listen address");
            drop(lock_file);
            return Err(e.into());
        }
    };
    info!(address = %addr, "listening");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "server exited with an error");
            }
        }
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    bridge.stop().await;
    if let Err(e) = state.index.lock().save_cache() {
        warn!(error = %e, "failed to persist session cache on shutdown");
    }
    drop(lock_file);
    info!("relayd stopped");
    Ok(())
}

fn spawn_watcher<A: relay_adapters::MultiplexerAdapter>(state: Arc<AppState<A>>) {
    let root = state.index.lock().root().to_path_buf();
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    match watch_log_root(&root, tx) {
        Ok(watcher) => {
            tokio::spawn(async move {
                let _watcher = watcher;
                while let Some(event) = rx.recv().await {
                    state.index.lock().apply_event(event, Utc::now());
                }
            });
        }
        Err(e) => warn!(error = %e, "failed to start log-root watcher"),
    }
}

fn spawn_rescan_timer<A: relay_adapters::MultiplexerAdapter>(state: Arc<AppState<A>>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RESCAN_INTERVAL);
        loop {
            ticker.tick().await;
            state.index.lock().rescan(Utc::now());
            if let Err(e) = state.index.lock().save_cache() {
                warn!(error = %e, "failed to persist session cache after rescan");
            }
        }
    });
}

fn acquire_lock(lock_path: &Path) -> std::io::Result<fs::File> {
    let lock_file = OpenOptions::new().write(true).create(true).truncate(false).open(lock_path)?;
    lock_file.try_lock_exclusive()?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log if it exceeds [`MAX_LOG_SIZE`]. Best-effort.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = fs::rename(&from, &to);
    }
    let _ = fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- relayd: starting (pid: ";

fn write_startup_marker(config: &Config) -> std::io::Result<()> {
    if let Some(parent) = config.log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, ConfigError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io { path: parent.to_path_buf(), source })?;
    }

    let parent = config.log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = config.log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("claude-relay.log"));
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
