use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::Duration,
};

use colored::{Color, Colorize};
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};
use judgebox_core::{
    style::{verdict_icon, ColorTheme},
    testing::{Lexeme, Test, TestReport, TestingBatch, Verdict},
};
use serde::Serialize;

/// Spinner shown while the batch runs; prints one line per finished test.
pub struct Progress {
    bar: ProgressBar,
    names: Arc<[String]>,
}

impl Progress {
    pub fn new(names: &[String], visible: bool) -> Self {
        let bar = if visible {
            let style = ProgressStyle::default_bar()
                .template("{spinner} {pos}/{len} tests finished")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            let bar = ProgressBar::new(names.len() as u64).with_style(style);
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            names: names.into(),
        }
    }

    pub fn callback(&self) -> impl Fn(&Test, usize, &TestReport) + Send + Sync + 'static {
        let bar = self.bar.clone();
        let names = self.names.clone();
        move |_, id, report| {
            bar.println(test_line(name_of(&names, id), report));
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn name_of(names: &[String], id: usize) -> &str {
    id.checked_sub(1)
        .and_then(|i| names.get(i))
        .map_or("?", String::as_str)
}

fn test_line(name: &str, report: &TestReport) -> String {
    format!(
        "{} {} {}",
        format!("Testcase {} ...", name).cyan(),
        verdict_icon(report.verdict),
        format!("[{}ms]", report.time.as_millis()).cyan(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSummary<'a> {
    pub id: usize,
    pub name: &'a str,
    pub verdict: Verdict,
    pub time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "is_empty")]
    pub mismatches: &'a [usize],
}

fn is_empty(s: &&[usize]) -> bool {
    s.is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary<'a> {
    pub total: usize,
    pub passed: usize,
    pub counts: BTreeMap<Verdict, usize>,
    pub tests: Vec<TestSummary<'a>>,
}

impl<'a> BatchSummary<'a> {
    pub fn new(names: &'a [String], batch: &'a TestingBatch) -> Self {
        let tests: Vec<_> = (1..=batch.tests.len())
            .map(|id| {
                let diag = batch.diagnostics.get(&id);
                TestSummary {
                    id,
                    name: name_of(names, id),
                    // Every test has a verdict once the batch has run.
                    verdict: batch.verdicts.get(&id).copied().unwrap_or(Verdict::IE),
                    time_ms: batch.times.get(&id).map_or(0, Duration::as_millis),
                    exit_code: diag.map(|d| d.exit_code),
                    mismatches: diag.map(|d| d.mismatches.as_slice()).unwrap_or_default(),
                }
            })
            .collect();

        let counts = tests.iter().fold(BTreeMap::new(), |mut count, t| {
            *count.entry(t.verdict).or_default() += 1;
            count
        });

        Self {
            total: tests.len(),
            passed: counts.get(&Verdict::OK).copied().unwrap_or(0),
            counts,
            tests,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

pub fn print_summary(summary: &BatchSummary) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let total = summary.total;
    if summary.all_passed() {
        let msg = format!("All {} tests passed ✨", total);
        print!("{}", msg.green());
    } else {
        let failed = total - summary.passed;
        let summary_msg = if summary.passed > 0 {
            format!("{}/{} tests failed 💣", failed, total)
        } else {
            format!("All {} tests failed 💀", total)
        };

        let detail_msg = summary
            .counts
            .iter()
            .filter(|(verdict, _)| !verdict.is_ok())
            .map(|(&verdict, &cnt)| {
                format!(
                    "{}{}{}",
                    verdict_icon(verdict),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(" {}", bar);
}

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

/// Prints a block per failed test, in test-id order.
pub fn print_details(names: &[String], batch: &TestingBatch) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;

    for id in 1..=batch.tests.len() {
        let Some(&verdict) = batch.verdicts.get(&id) else {
            continue
        };
        if verdict.is_ok() {
            continue;
        }
        print_detail(name_of(names, id), id, verdict, batch, cols);
    }
}

fn print_detail(name: &str, id: usize, verdict: Verdict, batch: &TestingBatch, cols: usize) {
    let bold_bar = BOLD_LINE.repeat(cols).color(verdict.color()).bold();
    let time = batch.times.get(&id).copied().unwrap_or_default();

    println!(
        "\n{}: {} [{}ms]\n{}",
        name.bright_yellow().bold(),
        verdict_icon(verdict),
        time.as_millis(),
        bold_bar,
    );

    if verdict == Verdict::TL {
        println!("{}", "Time limit exceeded, output was not judged".dimmed());
        println!("{}", bold_bar);
        return;
    }

    let diag = batch.diagnostics.get(&id);
    let mismatches: HashSet<usize> = diag
        .map(|d| d.mismatches.iter().copied().collect())
        .unwrap_or_default();
    let none = Vec::new();

    print_sub_title("[answer]", cols);
    for line in render_lexemes(batch.rich_answers.get(&id).unwrap_or(&none), &mismatches) {
        println!("{}", line);
    }

    print_sub_title("[stdout]", cols);
    for line in render_lexemes(batch.rich_outs.get(&id).unwrap_or(&none), &mismatches) {
        println!("{}", line);
    }

    if let Some(diag) = diag {
        if diag.exit_code != 0 {
            print_sub_title("[exitcode]", cols);
            println!("{}", diag.exit_code.to_string().bright_red().bold());
        }
        if !diag.stderr.is_empty() {
            print_sub_title("[stderr]", cols);
            print!("{}", diag.stderr);
            if !diag.stderr.ends_with('\n') {
                println!();
            }
        }
    } else if verdict == Verdict::IE {
        println!("{}", "The program could not be run, see the log".dimmed());
    }

    println!("{}", bold_bar);
}

fn print_sub_title(s: &str, cols: usize) {
    println!(
        "{}{}",
        s.cyan().bold(),
        THIN_LINE
            .repeat(cols.saturating_sub(s.len() + 1))
            .bright_black(),
    )
}

/// Lays lexemes out on their original lines, highlighting the ones at `mismatches`.
/// A mismatching line break shows up as a highlighted `↵`.
fn render_lexemes(lexemes: &[Lexeme], mismatches: &HashSet<usize>) -> Vec<String> {
    if lexemes.is_empty() {
        return vec!["<EMPTY>".magenta().dimmed().to_string()];
    }

    fn highlight(s: &str) -> String {
        s.on_color(Color::Red).bright_white().bold().to_string()
    }

    let mut lines = Vec::new();
    let mut cur = String::new();
    for (i, lexeme) in lexemes.iter().enumerate() {
        let mismatched = mismatches.contains(&i);
        if lexeme.is_line_break() {
            if mismatched {
                if !cur.is_empty() {
                    cur.push(' ');
                }
                cur.push_str(&highlight("↵"));
            }
            lines.push(std::mem::take(&mut cur));
            continue;
        }

        if !cur.is_empty() {
            cur.push(' ');
        }
        if mismatched {
            cur.push_str(&highlight(&lexeme.text));
        } else {
            cur.push_str(&lexeme.text);
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}
