//! PowerShell process backend.
//!
//! Scripts are written to the standard input of a configured command line,
//! which is either PowerShell itself (when running on the Hyper-V host) or
//! a transport such as `ssh admin@hv01 powershell -Command -`.

use crate::backend::Executor;
use crate::error::{Error, Result};
use psscript::Script;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Interval between checks on a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit code ssh uses for its own connection failures.
pub const SSH_CONNECTION_FAILED: i32 = 255;

/// How to launch the PowerShell command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Program to run
    pub program: String,
    /// Arguments; the script arrives on standard input
    pub args: Vec<String>,
    /// Maximum time a script may run
    pub timeout: Duration,
    /// Exit codes that mean the channel failed rather than the script
    pub transport_exit_codes: Vec<i32>,
}

impl Default for ShellCommand {
    fn default() -> Self {
        Self {
            program: "powershell".to_string(),
            args: ["-NoProfile", "-NonInteractive", "-Command", "-"]
                .map(String::from)
                .to_vec(),
            timeout: Duration::from_secs(30 * 60),
            transport_exit_codes: vec![SSH_CONNECTION_FAILED],
        }
    }
}

/// Backend that runs scripts through a PowerShell process.
pub struct PowerShellBackend {
    command: ShellCommand,
}

/// Captured result of one process run.
#[derive(Debug)]
struct ProcessOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl PowerShellBackend {
    /// Create a backend for the given command line.
    pub fn new(command: ShellCommand) -> Self {
        Self { command }
    }

    fn describe(&self) -> String {
        let mut line = self.command.program.clone();
        for arg in &self.command.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run a script and check its exit status.
    fn run(&self, script: &Script) -> Result<String> {
        log::debug!("Running {} via {}", script.template(), self.describe());

        let output = self.spawn_and_wait(&wrap_for_stdin(script.body()))?;
        let code = output.status.code();

        match code {
            Some(0) => Ok(output.stdout),
            Some(code) if self.command.transport_exit_codes.contains(&code) => {
                Err(Error::transport(format!(
                    "{} exited with {code}: {}",
                    self.command.program,
                    output.stderr.trim()
                )))
            }
            Some(code) => {
                log::warn!("{} failed with exit code {code}", script.template());
                let first_line = output.stderr.lines().find(|l| !l.trim().is_empty());
                Err(Error::RemoteScript {
                    message: match first_line {
                        Some(line) => {
                            format!("{} exited with code {code}: {}", script.template(), line.trim())
                        }
                        None => format!("{} exited with code {code}", script.template()),
                    },
                    exit_code: Some(code),
                    stderr: output.stderr.trim().to_string(),
                })
            }
            None => Err(Error::transport(format!(
                "{} was terminated by a signal",
                self.command.program
            ))),
        }
    }

    fn spawn_and_wait(&self, input: &str) -> Result<ProcessOutput> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::transport(format!("failed to start {}: {e}", self.describe()))
            })?;

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            // a closed pipe surfaces through the exit status below
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                log::debug!("Writing script to {} failed: {e}", self.command.program);
            }
        }

        let status = self.wait(&mut child)?;

        Ok(ProcessOutput {
            status,
            stdout: join(stdout),
            stderr: join(stderr),
        })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.command.timeout;
        loop {
            let polled = child
                .try_wait()
                .map_err(|e| Error::transport(format!("failed to wait for script: {e}")))?;
            if let Some(status) = polled {
                return Ok(status);
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::transport(format!(
                    "script timed out after {}s",
                    self.command.timeout.as_secs()
                )));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Executor for PowerShellBackend {
    fn name(&self) -> &str {
        &self.command.program
    }

    fn run_fire_and_forget(&self, script: &Script) -> Result<()> {
        self.run(script).map(drop)
    }

    fn run_with_result(&self, script: &Script) -> Result<String> {
        self.run(script)
    }
}

/// Wrap a script body for `-Command -`.
///
/// PowerShell reads stdin like an interactive console: a blank line submits
/// whatever has been typed so far, even inside an open block. Blank lines are
/// therefore dropped from the body, which runs as a single script block.
///
/// A terminating error is written to stderr and turned into exit code 1.
/// Exit code 0 is only reached once the block has run to the end, so a
/// wrapper that fails to parse exits 1 as well.
pub fn wrap_for_stdin(body: &str) -> String {
    let mut block = String::with_capacity(body.len());
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        block.push_str(line);
        block.push('\n');
    }

    format!(
        "$ProgressPreference = 'SilentlyContinue'\n\
         $hvfilesCompleted = $false\n\
         try {{\n& {{\n{block}}}\n$hvfilesCompleted = $true\n}}\n\
         catch {{\n[Console]::Error.WriteLine($_.Exception.Message)\nexit 1\n}}\n\
         if ($hvfilesCompleted) {{ exit 0 }} else {{ exit 1 }}\n\n"
    )
}

fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
