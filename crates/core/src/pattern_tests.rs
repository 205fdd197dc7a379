use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "abc-123", "abc-123" },
    dots = { "a.b+c", "a\\.b\\+c" },
    brackets = { "[x](y)", "\\[x\\]\\(y\\)" },
    no_special = { "hello", "hello" },
)]
fn escapes_special_chars(input: &str, expected: &str) {
    assert_eq!(regex_escape(input), expected);
}

#[test]
fn builds_process_match_pattern() {
    let id = "11111111-1111-1111-1111-111111111111";
    assert_eq!(
        process_match_pattern("claude", id),
        format!("claude.*--resume.*{id}")
    );
}

#[test]
fn escapes_id_within_pattern() {
    let pattern = process_match_pattern("claude", "a.b");
    assert_eq!(pattern, "claude.*--resume.*a\\.b");
}
