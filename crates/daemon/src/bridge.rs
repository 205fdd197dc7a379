// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! Terminal Bridge: owns the bidirectional byte stream
//! between one remote socket and one PTY running the multiplexer's
//! attach command, and guarantees PTY teardown.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use relay_core::SessionId;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::batch::OutputBatcher;

pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_BACKPRESSURE_THRESHOLD: usize = 64 * 1024;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_MISSED_PONGS: u32 = 3;
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SIGKILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub batch_interval: Duration,
    pub backpressure_threshold: usize,
    pub heartbeat_interval: Duration,
    pub max_missed_pongs: u32,
    pub reaper_interval: Duration,
    pub sigkill_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            batch_interval: DEFAULT_BATCH_INTERVAL,
            backpressure_threshold: DEFAULT_BACKPRESSURE_THRESHOLD,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_missed_pongs: DEFAULT_MAX_MISSED_PONGS,
            reaper_interval: DEFAULT_REAPER_INTERVAL,
            sigkill_grace: DEFAULT_SIGKILL_GRACE,
        }
    }
}

/// One end of a spawned PTY running a multiplexer attach command.
/// Abstracted from `portable_pty` directly so bridge logic can be
/// exercised against a fake in tests.
pub trait PtySession: Send {
    fn write_input(&mut self, data: &[u8]) -> io::Result<()>;
    fn resize(&self, cols: u16, rows: u16) -> io::Result<()>;
    fn try_clone_reader(&self) -> io::Result<Box<dyn Read + Send>>;
    /// Ask the child to exit (SIGTERM on unix).
    fn terminate(&mut self) -> io::Result<()>;
    /// Force the child to exit immediately (SIGKILL on unix).
    fn force_kill(&mut self) -> io::Result<()>;
    fn is_alive(&mut self) -> bool;
}

pub trait PtySpawner: Send + Sync + 'static {
    fn spawn(&self, command: &str, cols: u16, rows: u16) -> io::Result<Box<dyn PtySession>>;
}

fn to_io_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

struct NativePtySession {
    master: Box<dyn portable_pty::MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
}

impl PtySession for NativePtySession {
    fn write_input(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)
    }

    fn resize(&self, cols: u16, rows: u16) -> io::Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(to_io_error)
    }

    fn try_clone_reader(&self) -> io::Result<Box<dyn Read + Send>> {
        self.master.try_clone_reader().map_err(to_io_error)
    }

    fn terminate(&mut self) -> io::Result<()> {
        match self.child.process_id() {
            Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(to_io_error),
            None => self.child.kill(),
        }
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Spawns PTYs running real multiplexer attach commands via `portable_pty`.
pub struct NativePtySpawner;

impl PtySpawner for NativePtySpawner {
    fn spawn(&self, command: &str, cols: u16, rows: u16) -> io::Result<Box<dyn PtySession>> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(to_io_error)?;

        let mut cmd = CommandBuilder::new("/bin/sh");
        cmd.arg("-c");
        cmd.arg(command);
        match dirs::home_dir() {
            Some(home) => cmd.cwd(home),
            None => cmd.cwd("/"),
        }

        let child = pair.slave.spawn_command(cmd).map_err(to_io_error)?;
        let writer = pair.master.take_writer().map_err(to_io_error)?;
        Ok(Box::new(NativePtySession {
            master: pair.master,
            writer,
            child,
        }))
    }
}

/// The remote end of a terminal connection. Implemented over an axum
/// WebSocket in the http layer; abstracted here so bridge logic doesn't
/// depend on axum.
#[async_trait]
pub trait TerminalSocket: Send + Sync {
    async fn send_binary(&self, data: Vec<u8>);
    async fn send_ping(&self);
    async fn close(&self, code: u16, reason: String);
    /// Bytes currently queued for send but not yet flushed to the peer.
    fn pending_write_bytes(&self) -> usize;
    fn is_open(&self) -> bool;
}

struct BridgeEntry {
    cleaned_up: AtomicBool,
    pty: Mutex<Box<dyn PtySession>>,
    socket: Arc<dyn TerminalSocket>,
    created_at: Instant,
    missed_pongs: AtomicU32,
    batch: Mutex<OutputBatcher>,
}

/// Owns every active terminal connection. One bridge per daemon.
pub struct TerminalBridge {
    config: BridgeConfig,
    spawner: Arc<dyn PtySpawner>,
    entries: Mutex<HashMap<SessionId, Arc<BridgeEntry>>>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalBridge {
    pub fn new(spawner: Arc<dyn PtySpawner>, config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            spawner,
            entries: Mutex::new(HashMap::new()),
            reaper: Mutex::new(None),
        })
    }

    /// Whether a live connection is already bridged for `id`. The single
    /// source of truth the Manager's attach op consults.
    pub fn has_active(&self, id: &SessionId) -> bool {
        self.entries
            .lock()
            .get(id)
            .map(|entry| !entry.cleaned_up.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Install the periodic reaper that catches bridges whose socket
    /// closed without running teardown.
    pub fn start(self: &Arc<Self>) {
        let bridge = self.clone();
        let mut reaper = self.reaper.lock();
        if reaper.is_some() {
            return;
        }
        *reaper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(bridge.config.reaper_interval);
            loop {
                ticker.tick().await;
                bridge.reap().await;
            }
        }));
    }

    async fn reap(self: &Arc<Self>) {
        let snapshot: Vec<(SessionId, Arc<BridgeEntry>)> = self
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        for (id, entry) in snapshot {
            if !entry.socket.is_open() {
                self.teardown(&id, &entry, 1000, "Terminal session ended").await;
            }
        }
    }

    /// Tear down every bridge, for daemon shutdown. Completes before
    /// returning.
    pub async fn stop(self: &Arc<Self>) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
        }
        let snapshot: Vec<(SessionId, Arc<BridgeEntry>)> = self
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        for (id, entry) in snapshot {
            self.teardown(&id, &entry, 1000, "Terminal session ended").await;
        }
    }

    /// Attach `socket` to a PTY running `tmux attach-session -t
    /// <tab_name>`. Closes `socket` with `4409` instead if a bridge is
    /// already active for `id`.
    pub async fn attach(
        self: &Arc<Self>,
        id: SessionId,
        tab_name: &str,
        socket: Arc<dyn TerminalSocket>,
        cols: u16,
        rows: u16,
    ) {
        if self.has_active(&id) {
            socket
                .close(4409, "Session already has an active terminal connection".to_string())
                .await;
            return;
        }

        let command = format!("tmux attach-session -t {tab_name}");
        let pty = match self.spawner.spawn(&command, cols, rows) {
            Ok(pty) => pty,
            Err(error) => {
                tracing::warn!(session_id = %id, %error, "failed to spawn terminal pty");
                socket.close(4500, "failed to start terminal".to_string()).await;
                return;
            }
        };

        let reader = pty.try_clone_reader().ok();
        let entry = Arc::new(BridgeEntry {
            cleaned_up: AtomicBool::new(false),
            pty: Mutex::new(pty),
            socket: socket.clone(),
            created_at: Instant::now(),
            missed_pongs: AtomicU32::new(0),
            batch: Mutex::new(OutputBatcher::new()),
        });

        // Claim the slot and insert under a single lock acquisition, so a
        // concurrent attach for the same id can't also observe an empty
        // slot between its own check and insert. Losing this race means
        // someone else's bridge is already active; tear down the PTY we
        // just spawned rather than leaking it.
        let won = {
            let mut entries = self.entries.lock();
            let already_active = entries.get(&id).is_some_and(|e| !e.cleaned_up.load(Ordering::SeqCst));
            if already_active {
                false
            } else {
                entries.insert(id.clone(), entry.clone());
                true
            }
        };

        if !won {
            let mut pty = entry.pty.lock();
            let _ = pty.terminate();
            let _ = pty.force_kill();
            drop(pty);
            socket.close(4409, "Session already has an active terminal connection".to_string()).await;
            return;
        }

        self.spawn_io_tasks(id, entry, reader);
    }

    /// Resize the PTY for `id`. A malformed or absent bridge is a no-op.
    pub fn resize(&self, id: &SessionId, cols: u16, rows: u16) {
        if cols == 0 || rows == 0 {
            return;
        }
        if let Some(entry) = self.entries.lock().get(id) {
            let _ = entry.pty.lock().resize(cols, rows);
        }
    }

    /// Forward a decoded input chunk from the socket to the PTY.
    pub fn write_input(&self, id: &SessionId, data: &[u8]) {
        if let Some(entry) = self.entries.lock().get(id) {
            let _ = entry.pty.lock().write_input(data);
        }
    }

    /// Reset the missed-pong counter; call on receipt of any pong frame.
    pub fn on_pong(&self, id: &SessionId) {
        if let Some(entry) = self.entries.lock().get(id) {
            entry.missed_pongs.store(0, Ordering::SeqCst);
        }
    }

    /// Tear down the bridge for `id` in response to the socket closing
    /// or erroring.
    pub async fn close(self: &Arc<Self>, id: &SessionId) {
        let entry = self.entries.lock().get(id).cloned();
        if let Some(entry) = entry {
            self.teardown(id, &entry, 1000, "Terminal session ended").await;
        }
    }

    fn spawn_io_tasks(self: &Arc<Self>, id: SessionId, entry: Arc<BridgeEntry>, reader: Option<Box<dyn Read + Send>>) {
        let (output_tx, mut output_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(256);
        if let Some(mut reader) = reader {
            let thread_name = format!("pty-reader-{}", id.as_str());
            let _ = std::thread::Builder::new().name(thread_name).spawn(move || {
                let mut buf = [0u8; 8192];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if output_tx.blocking_send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        let (exit_tx, exit_rx) = oneshot::channel::<()>();
        {
            let entry = entry.clone();
            let thread_name = format!("pty-wait-{}", id.as_str());
            let _ = std::thread::Builder::new().name(thread_name).spawn(move || {
                loop {
                    if !entry.pty.lock().is_alive() {
                        let _ = exit_tx.send(());
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(200));
                }
            });
        }

        let bridge = self.clone();
        tokio::spawn(async move {
            let mut batch_timer = tokio::time::interval(bridge.config.batch_interval);
            let mut heartbeat_timer = tokio::time::interval(bridge.config.heartbeat_interval);
            let mut exit_rx = exit_rx;
            loop {
                tokio::select! {
                    chunk = output_rx.recv() => {
                        match chunk {
                            Some(bytes) => entry.batch.lock().push(&bytes),
                            None => break,
                        }
                    }
                    _ = batch_timer.tick() => {
                        let pending = entry.batch.lock().take();
                        if !pending.is_empty() {
                            if entry.socket.pending_write_bytes() <= bridge.config.backpressure_threshold {
                                entry.socket.send_binary(pending).await;
                            } else {
                                entry.batch.lock().restore(pending);
                            }
                        }
                    }
                    _ = heartbeat_timer.tick() => {
                        if !entry.socket.is_open() {
                            break;
                        }
                        let missed = entry.missed_pongs.fetch_add(1, Ordering::SeqCst) + 1;
                        if missed > bridge.config.max_missed_pongs {
                            entry.socket.close(4500, "terminal connection unresponsive".to_string()).await;
                            break;
                        }
                        entry.socket.send_ping().await;
                    }
                    _ = &mut exit_rx => break,
                }
            }
            bridge.teardown(&id, &entry, 1000, "Terminal session ended").await;
        });
    }

    /// Idempotent: a second call for the same entry is a no-op, and a
    /// call after a newer bridge has taken over `id` is a no-op too.
    async fn teardown(self: &Arc<Self>, id: &SessionId, entry: &Arc<BridgeEntry>, close_code: u16, reason: &str) {
        if entry.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut entries = self.entries.lock();
            if let Some(current) = entries.get(id) {
                if Arc::ptr_eq(current, entry) {
                    entries.remove(id);
                }
            }
        }

        let _ = entry.pty.lock().terminate();

        let grace = self.config.sigkill_grace;
        let entry_for_grace = entry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut pty = entry_for_grace.pty.lock();
            if pty.is_alive() {
                let _ = pty.force_kill();
            }
        });

        if entry.socket.is_open() {
            entry.socket.close(close_code, reason.to_string()).await;
        }
    }

    /// Number of bridges currently installed, active or mid-teardown.
    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    fn entry_age(&self, id: &SessionId) -> Option<Duration> {
        self.entries.lock().get(id).map(|e| e.created_at.elapsed())
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
