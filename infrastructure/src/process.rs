//! Child process supervision shared by the shell tool and the sandbox runner.
//!
//! Every child runs in its own process group. On timeout or cancellation the
//! whole group gets SIGTERM, then SIGKILL if it is still alive after
//! [`KILL_GRACE`].

use nova_domain::ToolError;
use serde_json::{Map, Value};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Time between SIGTERM and SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// How long to wait for output pipes to drain once the child is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Captured output of a finished child.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Either stream hit the capture limit
    pub truncated: bool,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Exit code, or `128 + signal` for a child killed by a signal.
    pub fn exit_code(&self) -> i32 {
        if let Some(code) = self.status.code() {
            return code;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = self.status.signal() {
                return 128 + signal;
            }
        }
        -1
    }

    /// `NonZeroExit` carrying `{exit_code, stdout, stderr, terminated_by_signal, signal?}`.
    ///
    /// Exit codes above 128 are reported as death by signal `code - 128`.
    pub fn exit_failure(&self) -> ToolError {
        let exit_code = self.exit_code();
        let terminated_by_signal = exit_code > 128;

        let mut metadata = Map::new();
        metadata.insert("exit_code".to_string(), Value::from(exit_code));
        metadata.insert("stdout".to_string(), Value::String(self.stdout_lossy()));
        metadata.insert("stderr".to_string(), Value::String(self.stderr_lossy()));
        metadata.insert(
            "terminated_by_signal".to_string(),
            Value::Bool(terminated_by_signal),
        );
        if self.truncated {
            metadata.insert("truncated".to_string(), Value::Bool(true));
        }

        let message = if terminated_by_signal {
            metadata.insert("signal".to_string(), Value::from(exit_code - 128));
            format!("command terminated by signal {}", exit_code - 128)
        } else {
            format!("command exited with code {}", exit_code)
        };
        ToolError::non_zero_exit(message).with_metadata(metadata)
    }
}

/// How a supervised child ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    Completed(ProcessOutput),
    TimedOut,
    Cancelled,
}

/// Spawn `command` and wait for it, bounded by `timeout` and `cancel`.
///
/// Stdout and stderr are each captured up to `max_output` bytes; the rest is
/// drained and discarded so the child never blocks on a full pipe.
pub async fn run_supervised(
    mut command: Command,
    timeout: Duration,
    cancel: &CancellationToken,
    max_output: usize,
) -> std::io::Result<ProcessOutcome> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn()?;
    let stdout = tokio::spawn(read_capped(child.stdout.take(), max_output));
    let stderr = tokio::spawn(read_capped(child.stderr.take(), max_output));

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = tokio::time::sleep(timeout) => None,
        _ = cancel.cancelled() => None,
    };

    let Some(status) = status else {
        let timed_out = !cancel.is_cancelled();
        terminate(&mut child).await;
        stdout.abort();
        stderr.abort();
        return Ok(if timed_out {
            ProcessOutcome::TimedOut
        } else {
            ProcessOutcome::Cancelled
        });
    };

    let (stdout, stdout_truncated) = join_reader(stdout).await;
    let (stderr, stderr_truncated) = join_reader(stderr).await;

    Ok(ProcessOutcome::Completed(ProcessOutput {
        status,
        stdout,
        stderr,
        truncated: stdout_truncated || stderr_truncated,
    }))
}

/// SIGTERM the child's process group, escalating to SIGKILL after the grace.
///
/// The leader exiting is not enough: any group member still alive when the
/// grace runs out is killed too.
pub async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };

    tracing::debug!(pid, "Terminating process group");
    signal_group(pid, Signal::Term);
    #[cfg(not(unix))]
    let _ = child.start_kill();

    let deadline = tokio::time::Instant::now() + KILL_GRACE;
    let leader_exited = tokio::time::timeout_at(deadline, child.wait()).await.is_ok();
    if leader_exited {
        while group_alive(pid) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(GROUP_POLL_INTERVAL).await;
        }
        if !group_alive(pid) {
            return;
        }
    }

    tracing::debug!(pid, "Process group ignored SIGTERM, killing");
    signal_group(pid, Signal::Kill);
    if !leader_exited {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

/// How often a group whose leader is gone is checked for stragglers
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(unix)]
fn group_alive(pid: u32) -> bool {
    // SAFETY: signal 0 only checks for existence and permission.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn group_alive(_pid: u32) -> bool {
    false
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    let sig = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: killpg only sends a signal; the group id comes from a child we
    // spawned into its own group and have not reaped yet.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, sig) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: the whole group is already gone.
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::trace!(pid, "killpg failed: {}", err);
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: Signal) {}

async fn read_capped<R>(reader: Option<R>, max: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };

    let mut kept = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = max.saturating_sub(kept.len());
                if n > room {
                    truncated = true;
                }
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    (kept, truncated)
}

async fn join_reader(handle: tokio::task::JoinHandle<(Vec<u8>, bool)>) -> (Vec<u8>, bool) {
    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(captured)) => captured,
        // A grandchild still holds the pipe open, or the reader died.
        _ => (Vec::new(), false),
    }
}
