// src/server/process.rs
use crate::error::{Error, Result};
use crate::log::LogSink;
use crate::server::CommandSpec;
use async_process::{Child, Command, Stdio};
use std::io::{BufRead, BufReader, PipeReader, Read};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit information of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessResult {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<ExitStatus> for ProcessResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code(),
        }
    }
}

/// How a process run is supervised
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Forward merged stdout/stderr to the sink line by line before waiting
    /// for exit. When false the output goes to the null device.
    pub stream_output: bool,
    /// Kill the process if it has not finished within this duration
    pub deadline: Option<Duration>,
    /// Kill the process when this token is cancelled
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    /// Stream output and wait without a deadline
    pub fn streaming() -> Self {
        Self {
            stream_output: true,
            ..Self::default()
        }
    }

    /// Discard output and wait only for exit
    pub fn detached() -> Self {
        Self::default()
    }

    /// Set a deadline for the run
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation token to the run
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Launches control script invocations and waits for them.
pub struct ProcessRunner {
    sink: Arc<dyn LogSink>,
}

impl ProcessRunner {
    /// Runner forwarding streamed output to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Run `spec` to completion.
    ///
    /// With `stream_output` every output line is passed to the sink at info
    /// level, in order, until the output stream closes; only then is the exit
    /// status collected. Without it the call returns as soon as the process
    /// exits, even if a process it forked still holds its output open.
    ///
    /// On Unix the process leads its own process group. A deadline or
    /// cancellation kills the whole group, so background processes it
    /// forked go down with it and release the output pipe.
    ///
    /// # Errors
    ///
    /// * [`Error::ProcessLaunchFailed`] if the program cannot be started
    /// * [`Error::Timeout`] / [`Error::Cancelled`] if the run was cut short;
    ///   the process is killed first
    /// * [`Error::Process`] if output or exit status cannot be collected
    #[tracing::instrument(skip(self, spec, options), fields(program = %spec.program, args = ?spec.args))]
    pub async fn run(&self, spec: &CommandSpec, options: &RunOptions) -> Result<ProcessResult> {
        let (mut child, output) = spawn(spec, options.stream_output)?;
        tracing::debug!(pid = child.id(), streaming = options.stream_output, "Process launched");

        let status = tokio::select! {
            status = drain_and_wait(&mut child, output, Arc::clone(&self.sink)) => status,
            _ = cancelled(options.cancel.as_ref()) => {
                tracing::warn!("Process run cancelled, killing process");
                terminate(&mut child).await;
                Err(Error::Cancelled)
            }
            _ = expired(options.deadline) => {
                let deadline = options.deadline.unwrap_or_default();
                tracing::error!(?deadline, "Process did not exit in time, killing process");
                terminate(&mut child).await;
                Err(Error::Timeout(deadline))
            }
        }?;

        let result = ProcessResult::from(status);
        tracing::debug!(exit_code = ?result.exit_code, "Process exited");
        Ok(result)
    }
}

fn spawn(spec: &CommandSpec, stream_output: bool) -> Result<(Child, Option<PipeReader>)> {
    let launch_failed = |source: std::io::Error| Error::ProcessLaunchFailed {
        program: spec.program.clone(),
        source,
    };

    let mut command = std::process::Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .envs(&spec.env);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    // stdio must be set on the async command, it resets unset streams to inherit
    let mut command = Command::from(command);
    command.stdin(Stdio::null());

    // stdout and stderr share one pipe so lines keep their relative order
    let output = if stream_output {
        let (reader, writer) = std::io::pipe().map_err(launch_failed)?;
        let stderr = writer.try_clone().map_err(launch_failed)?;
        command.stdout(writer).stderr(stderr);
        Some(reader)
    } else {
        command.stdout(Stdio::null()).stderr(Stdio::null());
        None
    };

    let child = command.spawn().map_err(launch_failed)?;
    // `command` still owns the write ends; dropping it lets the reader see EOF
    drop(command);
    Ok((child, output))
}

async fn drain_and_wait(
    child: &mut Child,
    output: Option<PipeReader>,
    sink: Arc<dyn LogSink>,
) -> Result<ExitStatus> {
    if let Some(reader) = output {
        // The reader runs on its own thread, outside the runtime's blocking
        // pool, and stops once nobody receives its lines.
        let (line_tx, mut lines) = tokio::sync::mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("process-output".to_string())
            .spawn(move || {
                if let Err(e) = forward_lines(reader, |line| line_tx.send(Ok(line)).is_ok()) {
                    let _ = line_tx.send(Err(e));
                }
            })
            .map_err(|e| Error::Process(format!("Failed to start output reader: {}", e)))?;

        while let Some(line) = lines.recv().await {
            let line =
                line.map_err(|e| Error::Process(format!("Failed to read process output: {}", e)))?;
            sink.info(&line);
        }
    }

    child
        .status()
        .await
        .map_err(|e| Error::Process(format!("Failed to wait for process: {}", e)))
}

/// Pass each output line to `emit` until EOF or until `emit` returns false
fn forward_lines(reader: impl Read, mut emit: impl FnMut(String) -> bool) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buffer);
        if !emit(line.trim_end_matches(['\r', '\n']).to_string()) {
            return Ok(());
        }
    }
}

async fn terminate(child: &mut Child) {
    kill_process_group(child);
    let _ = child.status().await;
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // the child was spawned as leader of its own group, so its pid is the pgid
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) with a negative pid only signals that process group
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == -1 {
        let e = std::io::Error::last_os_error();
        tracing::warn!(error = %e, pgid, "Failed to kill process group");
        if let Err(e) = child.kill() {
            tracing::warn!(error = %e, "Failed to kill process");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(error = %e, "Failed to kill process");
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn expired(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}
