//! Tests for log redaction.

use crate::runner::{REDACTED, Redactor};
use rstest::rstest;

#[rstest]
#[case("key sk-proj-abcdef123456 rejected", "key [REDACTED] rejected")]
#[case("token ghp_0123456789abcdefABCD", "token [REDACTED]")]
#[case("pat github_pat_11AAAAAAA0123456789_abc", "pat [REDACTED]")]
#[case("Authorization: Bearer abc.def-ghi", "Authorization: [REDACTED]")]
#[case("task-1234567890 finished", "task-1234567890 finished")]
fn redacts_token_shapes(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(Redactor::default().redact(input), expected);
}

#[test]
fn redacts_known_secrets_longest_first() {
    let redactor = Redactor::new(["abc".to_owned(), "abcdef".to_owned(), String::new()]);

    assert_eq!(redactor.redact("value=abcdef"), format!("value={REDACTED}"));
    assert_eq!(redactor.redact("value=abc"), format!("value={REDACTED}"));
    assert_eq!(redactor.redact("nothing here"), "nothing here");
}
