use colored::{Color, ColoredString, Colorize};

use crate::testing::Verdict;

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                OK => Color::Green,
                WA => Color::Yellow,
                RE => Color::Magenta,
                TL => Color::Red,
                IE => Color::BrightBlack,
            };
        }

        match self {
            OK => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            TL => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            IE => Color::TrueColor {
                r: 110,
                g: 110,
                b: 120,
            },
        }
    }
}

/// Verdict badge, e.g. ` WA ` on a yellow background.
pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightWhite
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_verdict_has_distinct_color() {
        let colors: Vec<Color> = Verdict::iter().map(|v| v.color()).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn icon_contains_verdict_name() {
        colored::control::set_override(false);
        assert_eq!(verdict_icon(Verdict::TL).to_string(), " TL ");
        colored::control::unset_override();
    }
}
