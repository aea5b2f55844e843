//! Shell execution with combined capture
//!
//! Runs a command line through `sh -c`, drains stdout and stderr on
//! reader threads, and enforces an optional wall-clock deadline with
//! `try_wait`. Environment entries are injected into the child process
//! only; the caller's environment is never touched.

use std::collections::HashMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often the deadline loop re-checks the child
const POLL_STEP: Duration = Duration::from_millis(50);

/// Outcome of a finished command
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Captured text; standard error is appended after standard output
    pub output: String,
    /// OS exit code; -1 when the process died to a signal
    pub code: i32,
}

/// Execution errors
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("command did not finish within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("I/O error while waiting for command: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `command` through the shell and capture its combined output.
///
/// A `timeout` that elapses before the child exits yields
/// [`ExecError::Timeout`]; the child is killed best-effort, but
/// termination is not guaranteed by this contract.
pub fn execute(
    command: &str,
    timeout: Option<Duration>,
    env: Option<&HashMap<String, String>>,
) -> Result<ExecOutcome, ExecError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(vars) = env {
        cmd.envs(vars);
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if let Some(limit) = timeout {
                    if started.elapsed() >= limit {
                        let _ = child.kill();
                        return Err(ExecError::Timeout {
                            seconds: limit.as_secs(),
                        });
                    }
                }
                thread::sleep(POLL_STEP);
            }
        }
    };

    let mut output = collect(stdout);
    output.push_str(&collect(stderr));

    Ok(ExecOutcome {
        output,
        code: status.code().unwrap_or(-1),
    })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<thread::JoinHandle<String>> {
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
