//! Running external commands with an optional deadline.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command.
#[derive(Debug)]
pub struct Output {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout and stderr joined, for error classification
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Run `command` to completion, capturing its output.
///
/// With a timeout, the child is killed once the deadline passes and
/// [`Error::Timeout`] is returned.
pub fn run(command: &mut Command, timeout: Option<Duration>) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    log::debug!("Running {command:?}");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::CommandFailed {
            message: format!("failed to execute {program}: {e}"),
            output: String::new(),
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if Instant::now() >= deadline {
                    log::warn!("{program} exceeded {}s, killing it", limit.as_secs());
                    // The child may have exited between the two calls
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout { after: limit });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    Ok(Output {
        status,
        stdout: stdout.map(join).unwrap_or_default(),
        stderr: stderr.map(join).unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_output() {
        let output = run(
            Command::new("sh").args(["-c", "echo out; echo err >&2"]),
            None,
        )
        .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[test]
    fn test_run_reports_failure_status() {
        let output = run(Command::new("sh").args(["-c", "exit 3"]), None).unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_run_kills_on_timeout() {
        let started = Instant::now();
        let err = run(
            Command::new("sh").args(["-c", "sleep 5"]),
            Some(Duration::from_millis(200)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let err = run(&mut Command::new("distkit-no-such-program"), None).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }
}
