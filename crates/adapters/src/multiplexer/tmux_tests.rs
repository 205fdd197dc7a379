use super::*;
use serial_test::serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("relayt{:04x}", nanos & 0xFFFF)
});
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! skip_if_no_tmux {
    () => {
        if !tmux_available() {
            eprintln!("skipping: tmux not available");
            return;
        }
    };
}

#[test]
fn parses_a_well_formed_list_sessions_line() {
    let tab = parse_tab_line("claude-abc\t1\t1700000000").unwrap();
    assert_eq!(tab.name, "claude-abc");
    assert!(tab.attached);
    assert_eq!(tab.created.timestamp(), 1700000000);
}

#[test]
fn parses_detached_tab() {
    let tab = parse_tab_line("claude-xyz\t0\t1700000000").unwrap();
    assert!(!tab.attached);
}

#[test]
fn rejects_malformed_lines() {
    assert!(parse_tab_line("").is_none());
    assert!(parse_tab_line("claude-abc\t1").is_none());
    assert!(parse_tab_line("claude-abc\tmaybe\t1700000000").is_none());
    assert!(parse_tab_line("claude-abc\t1\tnotanumber").is_none());
}

#[tokio::test]
#[serial(tmux)]
async fn create_exists_kill_round_trip() {
    skip_if_no_tmux!();
    let adapter = TmuxMultiplexerAdapter::new();
    let name = unique_name("roundtrip");

    assert!(!adapter.exists(&name).await.unwrap());
    adapter.create(&name, 80, 24, "sleep 60").await.unwrap();
    assert!(adapter.exists(&name).await.unwrap());

    let tabs = adapter.list_all().await.unwrap();
    assert!(tabs.iter().any(|t| t.name == name));

    adapter.kill(&name).await.unwrap();
    assert!(!adapter.exists(&name).await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn kill_of_nonexistent_tab_is_not_an_error() {
    skip_if_no_tmux!();
    let adapter = TmuxMultiplexerAdapter::new();
    adapter.kill(&unique_name("ghost")).await.unwrap();
}

#[tokio::test]
async fn process_conflict_is_false_for_a_pattern_nothing_matches() {
    let adapter = TmuxMultiplexerAdapter::new();
    let conflict = adapter
        .process_conflict("definitely-not-a-running-process-xyz123")
        .await
        .unwrap();
    assert!(!conflict);
}
