use super::*;
use relay_core::{MessageRole, SessionId};

fn sample_entry(id: &str, status: MultiplexerStatus) -> SessionMetadata {
    SessionMetadata {
        id: SessionId::new(id),
        project_path: "/Users/x/app".to_string(),
        project_hash: String::new(),
        last_message_preview: "hello".to_string(),
        last_message_role: MessageRole::User,
        timestamp: Utc::now(),
        cli_version: "2.1.37".to_string(),
        multiplexer_status: status,
    }
}

#[test]
fn round_trip_resets_multiplexer_status_to_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session-cache.json");

    let entries = vec![
        sample_entry("a", MultiplexerStatus::Active),
        sample_entry("b", MultiplexerStatus::Detached),
    ];
    let doc = CacheDocument::new(entries.clone(), Utc::now());
    doc.save(&path).unwrap();

    let loaded = CacheDocument::load(&path).unwrap();
    assert_eq!(loaded.entries.len(), 2);
    for (original, reloaded) in entries.iter().zip(loaded.entries.iter()) {
        assert_eq!(reloaded.id, original.id);
        assert_eq!(reloaded.project_path, original.project_path);
        assert_eq!(reloaded.last_message_preview, original.last_message_preview);
        assert_eq!(reloaded.multiplexer_status, MultiplexerStatus::None);
    }
}

#[test]
fn missing_file_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.json");
    assert!(CacheDocument::load(&path).is_none());
}

#[test]
fn corrupt_file_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session-cache.json");
    fs::write(&path, b"not json").unwrap();
    assert!(CacheDocument::load(&path).is_none());
}

#[test]
fn version_mismatch_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session-cache.json");
    fs::write(
        &path,
        format!(
            r#"{{"version":{},"entries":[],"last_full_scan":"2026-01-01T00:00:00Z"}}"#,
            CACHE_VERSION + 1
        ),
    )
    .unwrap();
    assert!(CacheDocument::load(&path).is_none());
}

#[cfg(unix)]
#[test]
fn save_sets_restrictive_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session-cache.json");
    let doc = CacheDocument::new(Vec::new(), Utc::now());
    doc.save(&path).unwrap();

    let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600);
    let dir_mode = fs::metadata(path.parent().unwrap())
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
    assert_eq!(dir_mode, 0o700);
}
