use super::*;
use relay_core::MessageRole;
use std::io::Write as _;

fn write_session(root: &Path, project: &str, id: &str, lines: &[&str]) -> PathBuf {
    let dir = root.join(project);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{id}.jsonl"));
    let mut file = fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

#[test]
fn rescan_discovers_sessions_two_levels_deep() {
    let root = tempfile::tempdir().unwrap();
    write_session(
        root.path(),
        "proj-a",
        "11111111-1111-1111-1111-111111111111",
        &[
            r#"{"cwd":"/Users/x/app","version":"2.1.37"}"#,
            r#"{"type":"user","message":{"content":"hello"}}"#,
        ],
    );

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.rescan(Utc::now());

    assert_eq!(index.len(), 1);
    let id = SessionId::new("11111111-1111-1111-1111-111111111111");
    let metadata = index.get(&id).unwrap();
    assert_eq!(metadata.project_path, "/Users/x/app");
    assert_eq!(metadata.last_message_role, MessageRole::User);
}

#[test]
fn rescan_removes_entries_for_deleted_files() {
    let root = tempfile::tempdir().unwrap();
    let path = write_session(
        root.path(),
        "proj-a",
        "22222222-2222-2222-2222-222222222222",
        &[r#"{"type":"user","message":{"content":"hi"}}"#],
    );

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.rescan(Utc::now());
    assert_eq!(index.len(), 1);

    fs::remove_file(&path).unwrap();
    index.rescan(Utc::now());
    assert_eq!(index.len(), 0);
}

#[test]
fn unchanged_mtime_skips_reparse_and_preserves_multiplexer_status() {
    let root = tempfile::tempdir().unwrap();
    write_session(
        root.path(),
        "proj-a",
        "33333333-3333-3333-3333-333333333333",
        &[r#"{"type":"user","message":{"content":"hi"}}"#],
    );

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.rescan(Utc::now());

    let id = SessionId::new("33333333-3333-3333-3333-333333333333");
    index.set_multiplexer_status(&id, MultiplexerStatus::Active);

    // A second rescan without touching the file must not reset the
    // advisory status back to `none`.
    index.rescan(Utc::now());
    assert_eq!(index.get(&id).unwrap().multiplexer_status, MultiplexerStatus::Active);
}

#[test]
fn changed_mtime_triggers_reparse_but_keeps_multiplexer_status() {
    let root = tempfile::tempdir().unwrap();
    let path = write_session(
        root.path(),
        "proj-a",
        "44444444-4444-4444-4444-444444444444",
        &[r#"{"type":"user","message":{"content":"first"}}"#],
    );

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.rescan(Utc::now());
    let id = SessionId::new("44444444-4444-4444-4444-444444444444");
    index.set_multiplexer_status(&id, MultiplexerStatus::Detached);

    // Force a distinguishable mtime.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, r#"{{"type":"assistant","message":{{"content":"second"}}}}"#).unwrap();

    index.rescan(Utc::now());
    let metadata = index.get(&id).unwrap();
    assert_eq!(metadata.last_message_preview, "second");
    assert_eq!(metadata.multiplexer_status, MultiplexerStatus::Detached);
}

#[test]
fn apply_event_add_and_remove_mirrors_rescan_contract() {
    let root = tempfile::tempdir().unwrap();
    let path = write_session(
        root.path(),
        "proj-a",
        "55555555-5555-5555-5555-555555555555",
        &[r#"{"type":"user","message":{"content":"hi"}}"#],
    );

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.apply_event(FsEvent::Added(path.clone()), Utc::now());
    assert_eq!(index.len(), 1);

    index.apply_event(FsEvent::Removed(path), Utc::now());
    assert_eq!(index.len(), 0);
}

#[test]
fn rescan_after_mutations_converges_to_a_from_scratch_scan() {
    let root = tempfile::tempdir().unwrap();
    write_session(root.path(), "proj-a", "66666666-6666-6666-6666-666666666666", &[r#"{"type":"user","message":{"content":"a"}}"#]);
    write_session(root.path(), "proj-b", "77777777-7777-7777-7777-777777777777", &[r#"{"type":"user","message":{"content":"b"}}"#]);

    let mut incremental = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache-1.json"));
    incremental.rescan(Utc::now());

    // Mutate: remove one session, add another.
    fs::remove_dir_all(root.path().join("proj-a")).unwrap();
    write_session(root.path(), "proj-c", "88888888-8888-8888-8888-888888888888", &[r#"{"type":"user","message":{"content":"c"}}"#]);
    incremental.rescan(Utc::now());

    let mut from_scratch = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache-2.json"));
    from_scratch.rescan(Utc::now());

    let mut a: Vec<_> = incremental.all();
    let mut b: Vec<_> = from_scratch.all();
    a.sort_by(|x, y| x.id.as_str().cmp(y.id.as_str()));
    b.sort_by(|x, y| x.id.as_str().cmp(y.id.as_str()));
    assert_eq!(a, b);
}

#[test]
fn cache_round_trip_preserves_entries_across_a_restart() {
    let root = tempfile::tempdir().unwrap();
    write_session(
        root.path(),
        "proj-a",
        "99999999-9999-9999-9999-999999999999",
        &[
            r#"{"cwd":"/Users/x/app","version":"1.2.3"}"#,
            r#"{"type":"assistant","message":{"content":"ready"}}"#,
        ],
    );
    let cache_path = root.path().join("cache.json");

    let mut first = SessionIndex::new(root.path().to_path_buf(), cache_path.clone());
    first.rescan(Utc::now());
    first.save_cache().unwrap();

    let mut second = SessionIndex::new(root.path().to_path_buf(), cache_path);
    second.load_cache();
    let id = SessionId::new("99999999-9999-9999-9999-999999999999");
    assert_eq!(second.get(&id).unwrap().last_message_preview, "ready");
}

#[test]
fn by_project_groups_and_sorts_by_latest_timestamp_descending() {
    let root = tempfile::tempdir().unwrap();
    write_session(root.path(), "proj-a", "aaaaaaaa-1111-1111-1111-111111111111", &[r#"{"cwd":"/a","message":"x"}"#]);
    write_session(root.path(), "proj-a", "aaaaaaaa-2222-2222-2222-222222222222", &[r#"{"cwd":"/a","message":"x"}"#]);
    write_session(root.path(), "proj-b", "bbbbbbbb-1111-1111-1111-111111111111", &[r#"{"cwd":"/b","message":"x"}"#]);

    let mut index = SessionIndex::new(root.path().to_path_buf(), root.path().join("cache.json"));
    index.rescan(Utc::now());

    let summaries = index.by_project();
    assert_eq!(summaries.len(), 2);
    let total: usize = summaries.iter().map(|s| s.session_count).sum();
    assert_eq!(total, 3);
}
