use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::{
    io::AsyncReadExt,
    process::Command,
};

use super::process::{CancelToken, InputStream, ProcessResult, ProcessRunner, RunnerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub compile: Option<String>,
    pub run: String,
}

/// Runs `<shell> -c <command>` for every test.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    cmd: TestCommand,
    shell: PathBuf,
}

impl ShellRunner {
    const DEFAULT_SHELL: &str = "/bin/sh";

    pub fn new(cmd: TestCommand) -> Self {
        Self {
            cmd,
            shell: Self::DEFAULT_SHELL.into(),
        }
    }

    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn get_shell(&self) -> &Path {
        &self.shell
    }

    pub fn get_command(&self) -> &TestCommand {
        &self.cmd
    }

    pub fn is_compile_cmd_defined(&self) -> bool {
        self.cmd.compile.is_some()
    }

    pub async fn compile(&self) -> anyhow::Result<()> {
        let Some(cmd) = &self.cmd.compile else {
            bail!("Undefined compile command")
        };

        let status = Command::new(&self.shell)
            .args(["-c", cmd])
            .status()
            .await
            .with_context(|| {
                format!(
                    "Failed to spawn '{} -c {}'",
                    self.shell.to_string_lossy(),
                    cmd
                )
            })?;

        match status.code() {
            Some(0) => Ok(()),
            Some(code) => bail!("Compile error: exitcode={}", code),
            None => bail!("Failed to compile: process terminated by signal"),
        }
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(
        &self,
        cancel: CancelToken,
        mut input: InputStream,
    ) -> Result<ProcessResult, RunnerError> {
        let cmd = &self.cmd.run;
        let mut proc = Command::new(&self.shell)
            .args(["-c", cmd])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                shell: self.shell.to_string_lossy().into_owned(),
                command: cmd.to_owned(),
                source,
            })?;
        let mut stdin = proc.stdin.take().ok_or(RunnerError::Pipe("stdin"))?;
        let mut stdout = proc.stdout.take().ok_or(RunnerError::Pipe("stdout"))?;
        let mut stderr = proc.stderr.take().ok_or(RunnerError::Pipe("stderr"))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let feed_stdin = async move {
            let res = match tokio::io::copy(&mut input, &mut stdin).await {
                // The program may exit without reading all of its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                res => res.map(drop),
            };
            // Dropping stdin sends EOF
            drop(stdin);
            res
        };

        let communicated = tokio::select! {
            res = async {
                tokio::try_join!(
                    feed_stdin,
                    stdout.read_to_end(&mut stdout_buf),
                    stderr.read_to_end(&mut stderr_buf),
                    proc.wait(),
                )
            } => Some(res),
            _ = cancel.cancelled() => None,
        };

        let Some(res) = communicated else {
            proc.kill()
                .await
                .unwrap_or_else(|e| log::warn!("Failed to kill cancelled process: {:#}", e));
            return Err(RunnerError::Cancelled);
        };
        let (_, _, _, exit_status) = res?;

        Ok(ProcessResult {
            // Killed by a signal
            exit_code: exit_status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout_buf).into(),
            stderr: String::from_utf8_lossy(&stderr_buf).into(),
        })
    }
}
