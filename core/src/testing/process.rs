use std::{
    future::{self, Future},
    io,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::{io::AsyncRead, sync::watch};

/// Stdin of a process invocation.
pub type InputStream = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The runner observed cancellation and stopped the process.
    #[error("Process was cancelled")]
    Cancelled,

    #[error("Failed to spawn '{shell} -c {command}': {source}")]
    Spawn {
        shell: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open {0} of subprocess")]
    Pipe(&'static str),

    #[error("Failed to communicate with subprocess: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Runs the program under test once.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, cancel: CancelToken, input: InputStream)
        -> Result<ProcessResult, RunnerError>;
}

/// Creates a connected cancel handle and token.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // No receiver left means nobody is waiting for it.
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is requested. Never completes if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                future::pending::<()>().await;
            }
        }
    }
}

/// Adapts an async closure into a [`ProcessRunner`].
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunnerFn<F>(pub F);

#[async_trait]
impl<F, Fut> ProcessRunner for ProcessRunnerFn<F>
where
    F: Fn(CancelToken, InputStream) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProcessResult, RunnerError>> + Send + 'static,
{
    async fn run(
        &self,
        cancel: CancelToken,
        input: InputStream,
    ) -> Result<ProcessResult, RunnerError> {
        (self.0)(cancel, input).await
    }
}

/// Counts invocations of the wrapped runner.
#[derive(Debug)]
pub struct SpyProcessRunner<P> {
    inner: P,
    calls: AtomicUsize,
}

impl<P> SpyProcessRunner<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P> ProcessRunner for SpyProcessRunner<P>
where
    P: ProcessRunner,
{
    async fn run(
        &self,
        cancel: CancelToken,
        input: InputStream,
    ) -> Result<ProcessResult, RunnerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(cancel, input).await
    }
}
