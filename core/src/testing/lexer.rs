use std::collections::HashMap;

use serde::Serialize;

/// Number of decimal digits two numbers must agree on when `prec` is not configured.
pub const DEFAULT_PRECISION: u32 = 6;

/// Config key holding the precision of numeric comparison.
pub const PRECISION_KEY: &str = "prec";

/// A whitespace-delimited token or a line break, together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lexeme {
    pub text: String,
    /// Byte offset in the source text.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in chars.
    pub col: usize,
}

impl Lexeme {
    pub const LINE_BREAK: &str = "\n";

    pub fn is_line_break(&self) -> bool {
        self.text == Self::LINE_BREAK
    }
}

/// Lazy iterator over the lexemes of a text. Cloning it restarts from the clone point.
///
/// Runs of spaces, tabs and `\r` only separate tokens; every `\n` is a lexeme of its own.
#[derive(Debug, Clone)]
pub struct Lexemes<'s> {
    text: &'s str,
    offset: usize,
    line: usize,
    col: usize,
}

pub fn lexemes(text: &str) -> Lexemes<'_> {
    Lexemes {
        text,
        offset: 0,
        line: 1,
        col: 1,
    }
}

fn is_separator(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

impl<'s> Iterator for Lexemes<'s> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        let rest = &text[self.offset..];
        let Some(skipped) = rest.find(|c: char| !is_separator(c)) else {
            self.offset = text.len();
            return None
        };
        self.col += rest[..skipped].chars().count();

        let start = self.offset + skipped;
        let body = &text[start..];
        let len = if body.starts_with('\n') {
            1
        } else {
            body.find(char::is_whitespace).unwrap_or(body.len())
        };
        let word = &body[..len];

        let lexeme = Lexeme {
            text: word.to_owned(),
            offset: start,
            line: self.line,
            col: self.col,
        };
        if word == Lexeme::LINE_BREAK {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += word.chars().count();
        }
        self.offset = start + len;
        Some(lexeme)
    }
}

impl<'s> std::iter::FusedIterator for Lexemes<'s> {}

/// Outcome of comparing an expected answer with a program output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    pub expected: Vec<Lexeme>,
    pub actual: Vec<Lexeme>,
    /// Indices where the two sequences disagree, including every index past the shorter one.
    pub mismatches: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexer {
    pub precision: u32,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

impl Lexer {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Reads the `prec` key; falls back to [`DEFAULT_PRECISION`] when it is absent or malformed.
    pub fn from_config(config: &HashMap<String, String>) -> Self {
        let Some(raw) = config.get(PRECISION_KEY) else {
            return Self::default()
        };
        match raw.trim().parse::<u32>() {
            Ok(precision) => Self::new(precision),
            Err(e) => {
                log::warn!(
                    "Invalid {} '{}' ({}), using default precision {}",
                    PRECISION_KEY,
                    raw,
                    e,
                    DEFAULT_PRECISION
                );
                Self::default()
            }
        }
    }

    pub fn tolerance(&self) -> f64 {
        10f64.powf(-(self.precision as f64))
    }

    pub fn lexemes_equal(&self, expected: &str, actual: &str) -> bool {
        if expected == actual {
            return true;
        }
        match (parse_decimal(expected), parse_decimal(actual)) {
            (Some(a), Some(b)) => numbers_match(a, b, self.tolerance()),
            _ => false,
        }
    }

    pub fn compare(&self, expected: &str, actual: &str) -> Comparison {
        let expected: Vec<_> = lexemes(expected).collect();
        let actual: Vec<_> = lexemes(actual).collect();

        let common = expected.len().min(actual.len());
        let longest = expected.len().max(actual.len());
        let mismatches: Vec<_> = (0..longest)
            .filter(|&i| i >= common || !self.lexemes_equal(&expected[i].text, &actual[i].text))
            .collect();

        Comparison {
            equal: mismatches.is_empty(),
            expected,
            actual,
            mismatches,
        }
    }
}

/// Accepts `[+-]digits[.digits]` (either side of the dot may be empty, not both).
fn parse_decimal(s: &str) -> Option<f64> {
    let unsigned = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
        return None;
    }
    s.parse().ok()
}

// The slack absorbs binary representation error, e.g. |1.0 - 1.1| > 0.1 in f64.
fn numbers_match(a: f64, b: f64, tolerance: f64) -> bool {
    let diff = (a - b).abs();
    let slack = f64::EPSILON * a.abs().max(b.abs()).max(1.0);
    diff <= tolerance || diff - tolerance <= slack
}
