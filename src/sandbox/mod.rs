use crate::tools::ToolError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Extra time allowed for pipes to drain after the interpreter exits, for
/// output still in flight when the deadline is already close.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Runs scripts through an interpreter with a hard wall-clock limit.
///
/// The interpreter leads its own process group. When it exits or times out,
/// the whole group is killed, so nothing the script started in the
/// background outlives the call or holds its output pipes open.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(interpreter: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn run(
        &self,
        working_dir: &Path,
        script: &Path,
        args: &[String],
    ) -> Result<ProcessResult, ToolError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            interpreter = %self.interpreter.display(),
            script = %script.display(),
            ?args,
            "spawning script"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| ToolError::Spawn(e.to_string()))?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                // Background jobs of the script die with it.
                kill_process_group(&child);
                let deadline = (started + self.timeout).max(Instant::now() + DRAIN_GRACE);
                Ok(ProcessResult {
                    stdout: collect(stdout, deadline),
                    stderr: collect(stderr, deadline),
                    exit_code: status.code().unwrap_or(-1),
                    timed_out: false,
                })
            }
            Ok(None) => {
                terminate(&mut child);
                tracing::warn!(
                    script = %script.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "script timed out and was killed"
                );
                Ok(ProcessResult {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: -1,
                    timed_out: true,
                })
            }
            Err(e) => {
                terminate(&mut child);
                Err(ToolError::Spawn(format!("failed to wait for script: {}", e)))
            }
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// Kill the child's whole process group, then reap the child itself.
fn terminate(child: &mut Child) {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions; the group was created
    // by process_group(0) at spawn, so its id equals the child's pid.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<Receiver<Vec<u8>>> {
    source.map(|mut reader| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Wait for a reader until `deadline`; a pipe still held open past it yields nothing.
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    rx.and_then(|rx| {
        rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .ok()
    })
    .map(|buf| String::from_utf8_lossy(&buf).into_owned())
    .unwrap_or_default()
}
