use super::*;
use tempfile::tempdir;

fn test_config(dir: &Path) -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 7860,
        auth_psk: "secret".to_string(),
        tmux_default_cols: 120,
        tmux_default_rows: 40,
        tmux_scrollback_lines: 10_000,
        claude_binary: "claude".to_string(),
        claude_session_dir: dir.join("projects"),
        claude_max_sessions: 5,
        ws_heartbeat_secs: 30,
        ws_max_missed_pongs: 3,
        config_dir: dir.to_path_buf(),
        config_path: dir.join("config.yaml"),
        cache_path: dir.join("session-cache.json"),
        log_path: dir.join("claude-relay.log"),
        lock_path: dir.join("claude-relay.lock"),
    }
}

#[test]
fn rotate_log_if_needed_leaves_small_files_alone() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("claude-relay.log");
    fs::write(&log_path, b"small").unwrap();

    rotate_log_if_needed(&log_path);

    assert_eq!(fs::read_to_string(&log_path).unwrap(), "small");
    assert!(!dir.path().join("claude-relay.log.1").exists());
}

#[test]
fn rotate_log_if_needed_rotates_an_oversized_file() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("claude-relay.log");
    fs::write(&log_path, vec![b'x'; (MAX_LOG_SIZE + 1) as usize]).unwrap();

    rotate_log_if_needed(&log_path);

    assert!(!log_path.exists());
    assert!(dir.path().join("claude-relay.log.1").exists());
}

#[test]
fn rotate_log_if_needed_shifts_existing_rotations_before_overwriting() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("claude-relay.log");
    fs::write(&log_path, vec![b'y'; (MAX_LOG_SIZE + 1) as usize]).unwrap();
    fs::write(dir.path().join("claude-relay.log.1"), b"oldest-becomes-2").unwrap();

    rotate_log_if_needed(&log_path);

    assert_eq!(fs::read_to_string(dir.path().join("claude-relay.log.2")).unwrap(), "oldest-becomes-2");
}

#[test]
fn write_startup_marker_creates_the_log_dir_and_appends_the_pid() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir.path().join("nested"));

    write_startup_marker(&config).unwrap();

    let contents = fs::read_to_string(&config.log_path).unwrap();
    assert!(contents.contains(STARTUP_MARKER_PREFIX));
    assert!(contents.contains(&std::process::id().to_string()));
}

#[test]
fn acquire_lock_fails_while_a_prior_lock_is_held() {
    let dir = tempdir().unwrap();
    let lock_path = dir.path().join("claude-relay.lock");

    let _first = acquire_lock(&lock_path).unwrap();
    let second = acquire_lock(&lock_path);

    assert!(second.is_err());
    assert_eq!(fs::read_to_string(&lock_path).unwrap().trim(), std::process::id().to_string());
}
