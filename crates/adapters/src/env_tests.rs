use super::*;

#[test]
fn default_debounce_is_500ms() {
    std::env::remove_var("CLAUDE_RELAY_WATCH_DEBOUNCE_MS");
    assert_eq!(watch_debounce(), Duration::from_millis(500));
}
