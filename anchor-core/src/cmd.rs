//! Subprocess execution.
//!
//! Everything the toolchain does ends up as an external command: podman,
//! kubectl, helm, systemctl. The [`CommandRunner`] trait is the single seam
//! between the decision layers and the operating system, so the resolution
//! logic can be exercised against a scripted runner in tests.

use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// Captured result of one subprocess run.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Execution {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout as trimmed UTF-8, lossy.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr as trimmed UTF-8, lossy.
    pub fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Executes external programs on behalf of the resolution and connection
/// layers. One subprocess per call, blocking until it finishes.
pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr.
    fn output(&self, program: &str, args: &[&str]) -> io::Result<Execution>;

    /// Run to completion with stdout/stderr mapped through to the caller's
    /// terminal. The returned [`Execution`] carries only the exit code.
    fn stream(&self, program: &str, args: &[&str]) -> io::Result<Execution>;

    /// Like [`CommandRunner::output`], but kill the process and fail with
    /// [`io::ErrorKind::TimedOut`] if it has not finished within `deadline`.
    fn output_within(
        &self,
        program: &str,
        args: &[&str],
        deadline: Duration,
    ) -> io::Result<Execution>;

    /// Check whether `program` can be found on the PATH.
    fn installed(&self, program: &str) -> bool;
}

/// Production [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        debug!(command = %render(program, args), "running");
        let output = Command::new(program).args(args).output()?;
        Ok(Execution {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn stream(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        debug!(command = %render(program, args), "running (streamed)");
        let argv: Vec<OsString> = args.iter().map(OsString::from).collect();
        let output = duct::cmd(program, argv).unchecked().run()?;
        Ok(Execution {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn output_within(
        &self,
        program: &str,
        args: &[&str],
        deadline: Duration,
    ) -> io::Result<Execution> {
        debug!(command = %render(program, args), ?deadline, "running (bounded)");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                let mut stdout = Vec::new();
                let mut stderr = Vec::new();
                if let Some(mut pipe) = child.stdout.take() {
                    pipe.read_to_end(&mut stdout)?;
                }
                if let Some(mut pipe) = child.stderr.take() {
                    pipe.read_to_end(&mut stderr)?;
                }
                return Ok(Execution {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                });
            }
            if started.elapsed() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{program} did not answer within {deadline:?}"),
                ));
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    fn installed(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Run `program` with `args` and return captured stdout, mapping a spawn
/// failure or a non-zero exit to the matching typed error.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<Vec<u8>> {
    let run = runner.output(program, args).map_err(|source| Error::Execution {
        command: render(program, args),
        source,
    })?;
    if !run.success() {
        return Err(Error::CommandFailed {
            command: render(program, args),
            code: run.exit_code.unwrap_or(-1),
            stderr: run.stderr_trimmed(),
        });
    }
    Ok(run.stdout)
}

/// Like [`run_checked`] but with stdout/stderr mapped through to the
/// terminal, for commands whose output belongs to the user.
pub fn stream_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<()> {
    let run = runner.stream(program, args).map_err(|source| Error::Execution {
        command: render(program, args),
        source,
    })?;
    if !run.success() {
        return Err(Error::CommandFailed {
            command: render(program, args),
            code: run.exit_code.unwrap_or(-1),
            stderr: run.stderr_trimmed(),
        });
    }
    Ok(())
}

fn render(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}
