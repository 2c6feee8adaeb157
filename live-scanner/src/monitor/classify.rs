//! Classification of free-text extraction tool output.
//!
//! The tool reports most conditions only through its stdout/stderr text, so
//! failures are classified by keyword patterns. The pattern lists are policy
//! and can be replaced wholesale.

use regex::RegexSet;

use crate::{Error, Result};

/// Default patterns indicating the source is refusing automated access.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    r"sign in to confirm",
    r"not a bot",
    r"http error 429",
    r"too many requests",
    r"captcha",
    r"unusual traffic",
];

/// Default patterns indicating a network or tool timeout.
pub const DEFAULT_TIMEOUT_PATTERNS: &[&str] = &[r"timed out", r"\btimeout\b"];

/// Default patterns indicating a broadcast scheduled for later.
pub const DEFAULT_UPCOMING_PATTERNS: &[&str] = &[
    r"will begin in",
    r"premieres? in",
    r"is_upcoming",
    r"scheduled to start",
];

/// Default patterns indicating the channel is simply not live.
pub const DEFAULT_NOT_LIVE_PATTERNS: &[&str] = &[r"not currently live", r"is not live"];

/// Classification of a block of tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    Blocked,
    Timeout,
    Upcoming,
    NotLive,
    Generic,
}

/// Keyword policy for classifying tool output. Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    blocked: RegexSet,
    timeout: RegexSet,
    upcoming: RegexSet,
    not_live: RegexSet,
}

fn compile(patterns: &[&str]) -> Result<RegexSet> {
    RegexSet::new(patterns.iter().map(|p| format!("(?i){p}")))
        .map_err(|e| Error::config(format!("invalid classifier pattern: {e}")))
}

impl OutputClassifier {
    pub fn new(
        blocked: &[&str],
        timeout: &[&str],
        upcoming: &[&str],
        not_live: &[&str],
    ) -> Result<Self> {
        Ok(Self {
            blocked: compile(blocked)?,
            timeout: compile(timeout)?,
            upcoming: compile(upcoming)?,
            not_live: compile(not_live)?,
        })
    }

    /// Classify output text.
    ///
    /// Blocking wins over everything else so that a block is never retried
    /// as an ordinary failure.
    pub fn classify(&self, text: &str) -> OutputClass {
        if self.blocked.is_match(text) {
            OutputClass::Blocked
        } else if self.upcoming.is_match(text) {
            OutputClass::Upcoming
        } else if self.not_live.is_match(text) {
            OutputClass::NotLive
        } else if self.timeout.is_match(text) {
            OutputClass::Timeout
        } else {
            OutputClass::Generic
        }
    }
}

impl Default for OutputClassifier {
    fn default() -> Self {
        Self {
            blocked: default_set(DEFAULT_BLOCKED_PATTERNS),
            timeout: default_set(DEFAULT_TIMEOUT_PATTERNS),
            upcoming: default_set(DEFAULT_UPCOMING_PATTERNS),
            not_live: default_set(DEFAULT_NOT_LIVE_PATTERNS),
        }
    }
}

fn default_set(patterns: &[&str]) -> RegexSet {
    // The built-in patterns are known to compile; fall back to an empty set
    // rather than panicking.
    compile(patterns).unwrap_or_else(|_| RegexSet::empty())
}

/// Truncate a message to at most `max_chars` characters on a char boundary.
pub fn truncate_message(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_blocked() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify("ERROR: [youtube] abc: Sign in to confirm you're not a bot"),
            OutputClass::Blocked
        );
        assert_eq!(
            classifier.classify("ERROR: HTTP Error 429: Too Many Requests"),
            OutputClass::Blocked
        );
    }

    #[test]
    fn test_classify_upcoming_and_not_live() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify("ERROR: [youtube] abc: This live event will begin in 3 hours."),
            OutputClass::Upcoming
        );
        assert_eq!(
            classifier.classify("ERROR: [youtube:tab] UCx: The channel is not currently live"),
            OutputClass::NotLive
        );
    }

    #[test]
    fn test_classify_timeout_and_generic() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify("ERROR: Unable to download webpage: The read operation timed out"),
            OutputClass::Timeout
        );
        assert_eq!(
            classifier.classify("ERROR: Unsupported URL"),
            OutputClass::Generic
        );
    }

    #[test]
    fn test_blocked_wins_over_timeout() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify("timed out; then: sign in to confirm"),
            OutputClass::Blocked
        );
    }

    #[test]
    fn test_custom_policy() {
        let classifier =
            OutputClassifier::new(&["forbidden"], &["slow"], &["soon"], &["offline"]).unwrap();
        assert_eq!(classifier.classify("403 Forbidden"), OutputClass::Blocked);
        assert_eq!(classifier.classify("sign in to confirm"), OutputClass::Generic);
        assert!(OutputClassifier::new(&["("], &[], &[], &[]).is_err());
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("  short  ", 10), "short");
        assert_eq!(truncate_message("abcdef", 3), "abc...");
        assert_eq!(truncate_message("ééééé", 2), "éé...");
    }
}
