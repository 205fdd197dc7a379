use std::collections::HashSet;
use std::io::{self, Read};
use std::sync::Arc;

use chrono::Utc;
use relay_adapters::FakeMultiplexerAdapter;
use relay_core::{MultiplexerStatus, SessionId};

use super::*;
use crate::bridge::{BridgeConfig, PtySession, PtySpawner, TerminalBridge};
use crate::manager::{ManagerConfig, MultiplexerManager};

/// A `PtySpawner` that hands out inert sessions doing no real I/O, so
/// tests exercising `TerminalBridge::attach` never touch a real process.
struct InertPtySpawner;

struct InertPtySession;

impl PtySession for InertPtySession {
    fn write_input(&mut self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn resize(&self, _cols: u16, _rows: u16) -> io::Result<()> {
        Ok(())
    }

    fn try_clone_reader(&self) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(io::ErrorKind::Other, "no reader on a test double"))
    }

    fn terminate(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        true
    }
}

impl PtySpawner for InertPtySpawner {
    fn spawn(&self, _command: &str, _cols: u16, _rows: u16) -> io::Result<Box<dyn PtySession>> {
        Ok(Box::new(InertPtySession))
    }
}

#[test]
fn constant_time_eq_rejects_different_lengths_without_comparing_bytes() {
    assert!(!constant_time_eq(b"short", b"much longer value"));
}

#[test]
fn constant_time_eq_accepts_equal_byte_strings() {
    assert!(constant_time_eq(b"same-secret", b"same-secret"));
}

#[test]
fn constant_time_eq_rejects_same_length_different_content() {
    assert!(!constant_time_eq(b"aaaaaaaa", b"aaaaaaab"));
}

#[test]
fn extract_bearer_reads_the_token_after_the_scheme() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
    assert_eq!(extract_bearer(&headers), Some("abc123".to_string()));
}

#[test]
fn extract_bearer_rejects_a_missing_or_malformed_header() {
    let headers = HeaderMap::new();
    assert_eq!(extract_bearer(&headers), None);

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
    assert_eq!(extract_bearer(&basic), None);
}

fn test_state() -> AppState<FakeMultiplexerAdapter> {
    let bridge = TerminalBridge::new(Arc::new(InertPtySpawner), BridgeConfig::default());
    let manager = MultiplexerManager::new(
        FakeMultiplexerAdapter::new(),
        {
            let bridge = bridge.clone();
            Arc::new(move |id: &SessionId| bridge.has_active(id))
        },
        ManagerConfig {
            tab_prefix: "claude".to_string(),
            cli_binary: "claude".to_string(),
            default_cols: 120,
            default_rows: 40,
            max_sessions: 5,
        },
    );
    let index = SessionIndex::new(std::path::PathBuf::from("/tmp/does-not-matter"), std::path::PathBuf::from("/tmp/cache.json"));
    AppState::new(
        index,
        manager,
        bridge,
        Config {
            host: "0.0.0.0".to_string(),
            port: 7860,
            auth_psk: "secret".to_string(),
            tmux_default_cols: 120,
            tmux_default_rows: 40,
            tmux_scrollback_lines: 10_000,
            claude_binary: "claude".to_string(),
            claude_session_dir: std::path::PathBuf::from("/tmp"),
            claude_max_sessions: 5,
            ws_heartbeat_secs: 30,
            ws_max_missed_pongs: 3,
            config_dir: std::path::PathBuf::from("/tmp"),
            config_path: std::path::PathBuf::from("/tmp/config.yaml"),
            cache_path: std::path::PathBuf::from("/tmp/session-cache.json"),
            log_path: std::path::PathBuf::from("/tmp/claude-relay.log"),
            lock_path: std::path::PathBuf::from("/tmp/claude-relay.lock"),
        },
        "claude".to_string(),
    )
}

#[test]
fn compute_status_reports_none_when_no_tab_exists() {
    let state = test_state();
    let id = SessionId::new("11111111-1111-1111-1111-111111111111");
    let tabs = HashSet::new();
    assert_eq!(compute_status(&id, &tabs, &state), MultiplexerStatus::None);
}

#[test]
fn compute_status_reports_detached_when_a_tab_exists_but_no_bridge_is_active() {
    let state = test_state();
    let id = SessionId::new("22222222-2222-2222-2222-222222222222");
    let mut tabs = HashSet::new();
    tabs.insert(tab_name(&state.tab_prefix, &id));
    assert_eq!(compute_status(&id, &tabs, &state), MultiplexerStatus::Detached);
}

#[tokio::test]
async fn compute_status_reports_active_when_the_bridge_has_the_session_regardless_of_tab_list() {
    let state = test_state();
    let id = SessionId::new("33333333-3333-3333-3333-333333333333");
    let tabs = HashSet::new();

    // drive a fake bridge entry into the active state the same way attach does
    struct NoopSocket;
    #[async_trait::async_trait]
    impl crate::bridge::TerminalSocket for NoopSocket {
        async fn send_binary(&self, _data: Vec<u8>) {}
        async fn send_ping(&self) {}
        async fn close(&self, _code: u16, _reason: String) {}
        fn pending_write_bytes(&self) -> usize {
            0
        }
        fn is_open(&self) -> bool {
            true
        }
    }

    state
        .bridge
        .attach(id.clone(), "claude-33333333", Arc::new(NoopSocket), 80, 24)
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(compute_status(&id, &tabs, &state), MultiplexerStatus::Active);
    let _ = Utc::now();
}
