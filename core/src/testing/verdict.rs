use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::lexer::Lexeme;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
pub enum Verdict {
    OK,
    WA,
    RE,
    TL,
    IE,
}

impl Verdict {
    pub fn is_ok(self) -> bool {
        self == Verdict::OK
    }
}

/// Extra information kept for a test whose program actually produced output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub exit_code: i32,
    pub stderr: String,
    /// Positions (0-based lexeme indices) where the output disagrees with the answer.
    pub mismatches: Vec<usize>,
}

/// Everything a pipeline learned about one test. Handed to the test-end callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub verdict: Verdict,
    pub time: Duration,
    pub rich_answer: Option<Vec<Lexeme>>,
    pub rich_out: Option<Vec<Lexeme>>,
    pub diagnostics: Option<Diagnostics>,
}

impl TestReport {
    pub fn time_limit(limit: Duration) -> Self {
        Self {
            verdict: Verdict::TL,
            time: limit,
            rich_answer: None,
            rich_out: None,
            diagnostics: None,
        }
    }

    pub fn internal_error(elapsed: Duration, rich_answer: Vec<Lexeme>) -> Self {
        Self {
            verdict: Verdict::IE,
            time: elapsed,
            rich_answer: Some(rich_answer),
            rich_out: Some(Vec::new()),
            diagnostics: None,
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn verdict_display_and_parse_agree() {
        for v in Verdict::iter() {
            assert_eq!(Verdict::from_str(&v.to_string()).unwrap(), v);
        }
        assert_eq!(Verdict::TL.to_string(), "TL");
        assert!(Verdict::from_str("TLE").is_err());
    }

    #[test]
    fn only_ok_is_ok() {
        let ok: Vec<_> = Verdict::iter().filter(|v| v.is_ok()).collect();
        assert_eq!(ok, [Verdict::OK]);
    }
}
