//! Extraction of mentioned user ids from raw message text.

use std::sync::LazyLock;

use regex::Regex;

/// Structured at-mention code, e.g. `[CQ:at,qq=123456]`.
#[allow(clippy::expect_used)]
static AT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[CQ:at,qq=(\d+)\]").expect("valid at-code pattern"));

/// Bare `@digits` mention.
#[allow(clippy::expect_used)]
static BARE_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\d+)").expect("valid bare mention pattern"));

/// Returns the id of the first user mentioned in `text`.
///
/// The structured at-code form takes precedence over a bare `@digits`
/// token anywhere in the message.
#[must_use]
pub fn extract_mentioned_id(text: &str) -> Option<String> {
    [&*AT_CODE, &*BARE_AT]
        .into_iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_code_mention() {
        assert_eq!(
            extract_mentioned_id("/extend 30 [CQ:at,qq=123456]"),
            Some("123456".to_owned())
        );
    }

    #[test]
    fn test_bare_mention() {
        assert_eq!(extract_mentioned_id("/extend 30 @98765"), Some("98765".to_owned()));
    }

    #[test]
    fn test_at_code_wins_over_earlier_bare_mention() {
        assert_eq!(
            extract_mentioned_id("@111 hello [CQ:at,qq=222]"),
            Some("222".to_owned())
        );
    }

    #[test]
    fn test_first_bare_mention_wins() {
        assert_eq!(extract_mentioned_id("@111 and @222"), Some("111".to_owned()));
    }

    #[test]
    fn test_no_mention() {
        assert_eq!(extract_mentioned_id("/extend 30"), None);
        assert_eq!(extract_mentioned_id("@alice"), None);
        assert_eq!(extract_mentioned_id("[CQ:at,qq=all]"), None);
    }
}
