use std::{
    collections::HashMap,
    io::Cursor,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::{JoinError, JoinHandle, JoinSet},
    time::Instant,
};

use super::{
    lexer::{lexemes, Lexeme, Lexer},
    pool::ThreadPool,
    process::{cancel_pair, ProcessResult, ProcessRunner, RunnerError},
    stopwatch::Stopwatch,
    testcase::{Inputs, Test},
    verdict::{Diagnostics, TestReport, Verdict},
};

/// Called once per test as soon as its verdict is known, in completion order.
///
/// Receives the test, its id and its [`TestReport`]; the report stands in for the batch, whose
/// result maps are only handed out once [`TestingBatch::run`] returns.
pub type TestEndCallback = Arc<dyn Fn(&Test, usize, &TestReport) + Send + Sync>;

/// `None` when the worker saw the cancellation before starting the process.
type WorkerOutcome = Option<Result<ProcessResult, RunnerError>>;

#[derive(Debug, Default)]
struct Results {
    verdicts: HashMap<usize, Verdict>,
    times: HashMap<usize, Duration>,
    rich_answers: HashMap<usize, Vec<Lexeme>>,
    rich_outs: HashMap<usize, Vec<Lexeme>>,
    diagnostics: HashMap<usize, Diagnostics>,
}

impl Results {
    fn record(&mut self, id: usize, report: &TestReport) {
        self.verdicts.insert(id, report.verdict);
        self.times.insert(id, report.time);
        if let Some(answer) = &report.rich_answer {
            self.rich_answers.insert(id, answer.clone());
        }
        if let Some(out) = &report.rich_out {
            self.rich_outs.insert(id, out.clone());
        }
        if let Some(diag) = &report.diagnostics {
            self.diagnostics.insert(id, diag.clone());
        }
    }
}

/// Runs a program against a list of tests and judges every run.
///
/// Test ids are 1-based and follow the order of [`Inputs::tests`].
pub struct TestingBatch {
    pub lexer: Lexer,
    pub tests: Vec<Test>,

    pub verdicts: HashMap<usize, Verdict>,
    pub times: HashMap<usize, Duration>,
    pub rich_answers: HashMap<usize, Vec<Lexeme>>,
    pub rich_outs: HashMap<usize, Vec<Lexeme>>,
    pub diagnostics: HashMap<usize, Diagnostics>,

    pub test_end_callback: Option<TestEndCallback>,

    runner: Arc<dyn ProcessRunner>,
    stopwatch: Arc<dyn Stopwatch>,
    pool: Arc<dyn ThreadPool>,
}

/// State shared by the pipelines of one run.
struct Pipelines {
    lexer: Lexer,
    runner: Arc<dyn ProcessRunner>,
    stopwatch: Arc<dyn Stopwatch>,
    pool: Arc<dyn ThreadPool>,
    callback: Option<TestEndCallback>,
    results: Mutex<Results>,
}

impl TestingBatch {
    pub fn new(
        inputs: Inputs,
        runner: Arc<dyn ProcessRunner>,
        stopwatch: Arc<dyn Stopwatch>,
        pool: Arc<dyn ThreadPool>,
    ) -> Self {
        Self {
            lexer: Lexer::from_config(&inputs.config),
            tests: inputs.tests,
            verdicts: HashMap::new(),
            times: HashMap::new(),
            rich_answers: HashMap::new(),
            rich_outs: HashMap::new(),
            diagnostics: HashMap::new(),
            test_end_callback: None,
            runner,
            stopwatch,
            pool,
        }
    }

    pub fn on_test_end(
        mut self,
        callback: impl Fn(&Test, usize, &TestReport) + Send + Sync + 'static,
    ) -> Self {
        self.test_end_callback = Some(Arc::new(callback));
        self
    }

    /// Runs every test and returns once all of them have a verdict.
    ///
    /// Runners still working on a timed out test are not waited for; their results are dropped.
    pub async fn run(&mut self) {
        let shared = Arc::new(Pipelines {
            lexer: self.lexer,
            runner: self.runner.clone(),
            stopwatch: self.stopwatch.clone(),
            pool: self.pool.clone(),
            callback: self.test_end_callback.clone(),
            results: Mutex::new(Results::default()),
        });

        log::info!(
            "Running {} tests on {} workers",
            self.tests.len(),
            self.pool.capacity()
        );

        let mut pipelines = JoinSet::new();
        for (i, test) in self.tests.iter().enumerate() {
            let shared = shared.clone();
            let test = test.clone();
            pipelines.spawn(async move { shared.launch(i + 1, test).await });
        }

        while let Some(joined) = pipelines.join_next().await {
            if let Err(e) = joined {
                log::error!("Testing pipeline aborted: {}", e);
            }
        }

        let results = std::mem::take(
            &mut *shared
                .results
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        self.verdicts = results.verdicts;
        self.times = results.times;
        self.rich_answers = results.rich_answers;
        self.rich_outs = results.rich_outs;
        self.diagnostics = results.diagnostics;
    }
}

impl Pipelines {
    /// Drives one test from dispatch to verdict. The slot is held until the verdict is recorded.
    async fn launch(self: Arc<Self>, id: usize, test: Test) {
        let slot = self.pool.acquire().await;
        log::debug!("Test #{} dispatched to worker {}", id, slot.id());

        let time_limit = self.stopwatch.arm();
        let (cancel, token) = cancel_pair();
        let started_at = Instant::now();

        let runner = self.runner.clone();
        let input = Cursor::new(test.input.clone().into_bytes());
        let mut worker = tokio::spawn(async move {
            if token.is_cancelled() {
                return None;
            }
            Some(runner.run(token, Box::new(input)).await)
        });

        let report = tokio::select! {
            biased;

            _ = time_limit => {
                cancel.cancel();
                log::debug!("Test #{} hit the time limit, cancelling", id);
                tokio::spawn(Self::drain(id, worker));
                TestReport::time_limit(self.stopwatch.limit())
            }
            joined = &mut worker => self.judge(id, &test, joined, started_at.elapsed()),
        };

        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(id, &report);
        log::info!(
            "Test #{}: {} [{}ms]",
            id,
            report.verdict,
            report.time.as_millis()
        );

        if let Some(callback) = &self.callback {
            callback(&test, id, &report);
        }
        drop(slot);
    }

    /// Logs whatever a timed out worker ends with. Nobody waits for it.
    async fn drain(id: usize, worker: JoinHandle<WorkerOutcome>) {
        match worker.await {
            Ok(Some(Ok(res))) => log::debug!(
                "Test #{}: ignored result of a timed out process (exitcode={})",
                id,
                res.exit_code
            ),
            Ok(_) => {}
            Err(e) => log::warn!("Test #{}: timed out process runner crashed: {}", id, e),
        }
    }

    fn judge(
        &self,
        id: usize,
        test: &Test,
        joined: Result<WorkerOutcome, JoinError>,
        elapsed: Duration,
    ) -> TestReport {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Test #{}: process runner crashed: {}", id, e);
                return TestReport::internal_error(elapsed, lexemes(&test.output).collect());
            }
        };

        let res = match outcome {
            None | Some(Err(RunnerError::Cancelled)) => {
                return TestReport::time_limit(self.stopwatch.limit())
            }
            Some(Err(e)) => {
                log::error!("Test #{}: {:#}", id, e);
                return TestReport::internal_error(elapsed, lexemes(&test.output).collect());
            }
            Some(Ok(res)) => res,
        };

        let cmp = self.lexer.compare(&test.output, &res.stdout);
        let verdict = match (res.exit_code, cmp.equal) {
            (0, true) => Verdict::OK,
            (0, false) => Verdict::WA,
            _ => Verdict::RE,
        };

        TestReport {
            verdict,
            time: elapsed,
            rich_answer: Some(cmp.expected),
            rich_out: Some(cmp.actual),
            diagnostics: Some(Diagnostics {
                exit_code: res.exit_code,
                stderr: res.stderr,
                mismatches: cmp.mismatches,
            }),
        }
    }
}
