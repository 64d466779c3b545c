use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use judgebox_core::{
    config::Config,
    testing::{
        load_inputs, ConfigurableStopwatch, ShellRunner, TestingBatch, WorkerPool, PRECISION_KEY,
    },
};

use crate::{report, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Directory containing in_<name>.txt / out_<name>.txt [default: test.testcase_dir]
    #[arg()] // positional argument
    pub testcase_dir: Option<PathBuf>,

    /// Time limit per test in milliseconds (0 disables it)
    #[arg(long = "tl-ms")]
    pub time_limit_ms: Option<u64>,

    /// Number of tests run at the same time
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Decimal digits compared for numbers
    #[arg(long)]
    pub prec: Option<u32>,

    /// Skip the compile command
    #[arg(long)]
    pub no_compile: bool,

    /// Print a JSON summary instead of the colored report
    #[arg(long)]
    pub json: bool,
}

pub async fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = Config::from_file_finding_in_ancestors_or_default(util::current_dir())?;

    let mut test_cfg = cfg.test.clone();
    if let Some(ms) = args.time_limit_ms {
        test_cfg.time_limit_ms = ms;
    }
    if let Some(jobs) = args.jobs {
        test_cfg.jobs = jobs;
    }

    let mut judge_options = cfg.judge_options();
    if let Some(prec) = args.prec {
        judge_options.insert(PRECISION_KEY.to_owned(), prec.to_string());
    }

    let testcase_dir = match &args.testcase_dir {
        Some(dir) => dir.clone(),
        None => util::relative_to_config(
            &test_cfg.testcase_dir,
            cfg.source_config_file.as_deref(),
        ),
    };
    let (names, inputs) =
        load_inputs(&testcase_dir, judge_options).context("Failed to load testcases")?;

    let runner = ShellRunner::new(test_cfg.test_command()).shell(test_cfg.shell.clone());
    if !args.no_compile {
        if let Some(cmd) = &runner.get_command().compile {
            log::info!("Compiling: {}", cmd);
            runner.compile().await?;
        }
    }

    log::info!("Running: {}", runner.get_command().run);

    let progress = report::Progress::new(&names, !args.json);
    let mut batch = TestingBatch::new(
        inputs,
        Arc::new(runner),
        Arc::new(ConfigurableStopwatch::new(test_cfg.time_limit())),
        Arc::new(WorkerPool::new(test_cfg.jobs)),
    )
    .on_test_end(progress.callback());

    batch.run().await;
    progress.finish();

    let summary = report::BatchSummary::new(&names, &batch);
    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
        println!("{}", json);
    } else {
        report::print_details(&names, &batch);
        report::print_summary(&summary);
    }

    Ok(ExitCode::from(exit_status(&summary)))
}

/// 0 only when every test passed.
fn exit_status(summary: &report::BatchSummary) -> u8 {
    if summary.all_passed() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use judgebox_core::testing::Verdict;

    use super::*;
    use crate::report::BatchSummary;

    fn summary(counts: BTreeMap<Verdict, usize>) -> BatchSummary<'static> {
        BatchSummary {
            total: counts.values().sum(),
            passed: counts.get(&Verdict::OK).copied().unwrap_or(0),
            counts,
            tests: Vec::new(),
        }
    }

    #[test]
    fn exit_status_is_zero_only_if_all_passed() {
        assert_eq!(exit_status(&summary(BTreeMap::from([(Verdict::OK, 3)]))), 0);
        assert_eq!(
            exit_status(&summary(BTreeMap::from([(Verdict::OK, 2), (Verdict::TL, 1)]))),
            1
        );
        assert_eq!(exit_status(&summary(BTreeMap::from([(Verdict::IE, 1)]))), 1);
    }
}
