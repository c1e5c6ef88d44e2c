#![deny(clippy::all, warnings)]

use std::{
    fmt,
    io::{self, Read, Write},
    path::Path,
    process::{Child, Command, Stdio},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

const TRUNCATION_MARKER: &str = "\n[...truncated...]\n";

/// How long to wait for pipes to drain once the process group is killed.
const READER_GRACE: Duration = Duration::from_secs(2);

type ReaderResult = io::Result<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives raw output chunks while a child is running.
pub trait EchoSink: Send + Sync {
    fn echo(&self, stream: OutputStream, chunk: &[u8]);
}

/// Forwards child output to this process's own stdout and stderr.
pub struct StdioEcho;

impl EchoSink for StdioEcho {
    fn echo(&self, stream: OutputStream, chunk: &[u8]) {
        let result = match stream {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(chunk).and_then(|()| out.flush())
            }
            OutputStream::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(chunk).and_then(|()| err.flush())
            }
        };
        if let Err(err) = result {
            debug!(%err, "failed to echo child output");
        }
    }
}

#[derive(Clone)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub max_capture_bytes: usize,
    pub echo: Option<Arc<dyn EchoSink>>,
}

impl RunOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_echo(mut self, echo: Arc<dyn EchoSink>) -> Self {
        self.echo = Some(echo);
        self
    }

    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.echo = None;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
            echo: None,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("timeout", &self.timeout)
            .field("max_capture_bytes", &self.max_capture_bytes)
            .field("echo", &self.echo.is_some())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for {program}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture output of {program}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} timed out after {}s", timeout.as_secs())]
    TimedOut {
        program: String,
        pid: u32,
        timeout: Duration,
        partial: RunOutput,
    },
}

impl ProcessError {
    /// The program itself could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::TimedOut { .. })
    }
}

/// Execute a program and capture stdout/stderr.
///
/// The child runs in its own process group so that a timeout takes down
/// everything it spawned. A nonzero exit is not an error; check
/// [`RunOutput::success`].
///
/// # Errors
///
/// Returns an error when the program cannot be spawned, its streams cannot be
/// read, or it outlives `options.timeout`.
pub fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
    options: &RunOptions,
) -> Result<RunOutput, ProcessError> {
    let mut command = configured_command(program, args, envs, cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let capture_error = |source| ProcessError::Capture {
        program: program.to_string(),
        source,
    };
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| capture_error(io::Error::other("stdout missing")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| capture_error(io::Error::other("stderr missing")))?;

    let limit = options.max_capture_bytes;
    let stdout_rx = spawn_reader(stdout, limit, OutputStream::Stdout, options.echo.clone());
    let stderr_rx = spawn_reader(stderr, limit, OutputStream::Stderr, options.echo.clone());

    let wait_error = |source| ProcessError::Wait {
        program: program.to_string(),
        source,
    };
    let pid = child.id();
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let status = match options.timeout {
        Some(timeout) => match child.wait_timeout(timeout).map_err(wait_error)? {
            Some(status) => status,
            None => {
                warn!(
                    program,
                    pid,
                    timeout_secs = timeout.as_secs(),
                    "killing timed out process"
                );
                kill_tree(&mut child);
                child.wait().map_err(wait_error)?;
                return Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    pid,
                    timeout,
                    partial: RunOutput {
                        code: -1,
                        stdout: drain_after_kill(None, &stdout_rx),
                        stderr: drain_after_kill(None, &stderr_rx),
                    },
                });
            }
        },
        None => child.wait().map_err(wait_error)?,
    };

    // Background descendants can hold the pipes open after the child exits;
    // the deadline still applies to them.
    let stdout = collect_reader(&stdout_rx, deadline);
    let stderr = collect_reader(&stderr_rx, deadline);
    if let (Some(timeout), true) = (options.timeout, stdout.is_none() || stderr.is_none()) {
        warn!(
            program,
            pid,
            timeout_secs = timeout.as_secs(),
            "killing descendants still holding output pipes"
        );
        kill_group(pid);
        return Err(ProcessError::TimedOut {
            program: program.to_string(),
            pid,
            timeout,
            partial: RunOutput {
                code: -1,
                stdout: drain_after_kill(stdout, &stdout_rx),
                stderr: drain_after_kill(stderr, &stderr_rx),
            },
        });
    }

    let code = status.code().unwrap_or(-1);
    let pipe_open = || io::Error::other("output pipe left open");
    let stdout = stdout.unwrap_or_else(|| Err(pipe_open())).map_err(capture_error)?;
    let stderr = stderr.unwrap_or_else(|| Err(pipe_open())).map_err(capture_error)?;
    debug!(program, code, "command finished");
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    limit: usize,
    stream: OutputStream,
    echo: Option<Arc<dyn EchoSink>>,
) -> Receiver<ReaderResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_to_string_limited(reader, limit, stream, echo.as_deref()));
    });
    rx
}

/// Waits for a reader to hit end of stream. `None` means `deadline` passed
/// with the pipe still open.
fn collect_reader(rx: &Receiver<ReaderResult>, deadline: Option<Instant>) -> Option<ReaderResult> {
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(result) => Some(result),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => {
            Some(Err(io::Error::other("output reader thread panicked")))
        }
    }
}

/// Whatever a reader captured, given a short grace period after the group
/// was killed.
fn drain_after_kill(collected: Option<ReaderResult>, rx: &Receiver<ReaderResult>) -> String {
    collected
        .or_else(|| rx.recv_timeout(READER_GRACE).ok())
        .and_then(Result::ok)
        .unwrap_or_default()
}

fn configured_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    cwd: &Path,
) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.current_dir(cwd);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

fn kill_tree(child: &mut Child) {
    if !kill_group(child.id()) {
        let _ = child.kill();
    }
}

/// Kills every process in the group led by `pid`. The group outlives its
/// leader, so this also works after the leader has been reaped.
#[cfg(unix)]
fn kill_group(pid: u32) -> bool {
    i32::try_from(pid).is_ok_and(|pgid| {
        // SAFETY: `pgid` names the group created for the child in `configured_command`.
        unsafe { libc::killpg(pgid, libc::SIGKILL) == 0 }
    })
}

#[cfg(windows)]
fn kill_group(pid: u32) -> bool {
    let status = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    matches!(status, Ok(status) if status.success())
}

fn read_to_string_limited(
    mut reader: impl Read,
    limit: usize,
    stream: OutputStream,
    echo: Option<&dyn EchoSink>,
) -> io::Result<String> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        if let Some(echo) = echo {
            echo.echo(stream, &chunk[..read]);
        }
        append_limited(&mut buffer, &chunk[..read], limit, &mut truncated);
    }
    let mut text = String::from_utf8_lossy(&buffer).to_string();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    Ok(text)
}

/// Keeps the most recent `limit` bytes.
fn append_limited(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize, truncated: &mut bool) {
    if limit == 0 {
        return;
    }
    if buffer.len().saturating_add(chunk.len()) <= limit {
        buffer.extend_from_slice(chunk);
        return;
    }
    *truncated = true;
    let old_len = buffer.len();
    let excess = old_len.saturating_add(chunk.len()).saturating_sub(limit);
    if excess >= old_len {
        buffer.clear();
        let drop_from_chunk = excess.saturating_sub(old_len).min(chunk.len());
        buffer.extend_from_slice(&chunk[drop_from_chunk..]);
    } else {
        buffer.drain(0..excess);
        buffer.extend_from_slice(chunk);
    }
}
