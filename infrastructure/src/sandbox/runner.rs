//! Container-backed sandbox session.
//!
//! Drives a container CLI (`docker` by default, anything with a compatible
//! `run` / `exec` / `rm` surface works) through `tokio::process`:
//!
//! ```text
//! start        <runtime> run -d --rm <image> tail -f /dev/null   → container id
//! run_command  <runtime> exec <id> sh -c <wrapper> nova-exec <pidfile> <command>
//! stop         <runtime> rm -f <id>
//! ```
//!
//! The exec wrapper starts the command in its own session (via `setsid` when
//! the image has it) and writes its pid to a file inside the container, so a
//! timeout or cancellation can signal the in-container process group rather
//! than just the local CLI client.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nova_application::ports::sandbox::SandboxPort;
use nova_domain::{SandboxState, ToolConfig, ToolError, ToolResult};

use crate::process::{self, KILL_GRACE, ProcessOutcome};

/// Maximum captured bytes per stream for in-container commands.
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Image pulls can be slow; this bounds `start()`.
const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(120);

/// Bound for `rm -f` and for the in-container kill helper.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// `$1` = pidfile, `$2` = command.
const EXEC_WRAPPER: &str = r#"if command -v setsid >/dev/null 2>&1; then setsid sh -c "$2" & else sh -c "$2" & fi
P=$!
echo "$P" > "$1"
wait "$P"
rc=$?
rm -f "$1"
exit "$rc""#;

/// `$1` = pidfile. TERM the group, wait up to 2 s, then KILL.
const KILL_HELPER: &str = r#"P=$(cat "$1" 2>/dev/null) || exit 0
kill -TERM -"$P" 2>/dev/null || kill -TERM "$P" 2>/dev/null || exit 0
i=0
while kill -0 "$P" 2>/dev/null && [ "$i" -lt 20 ]; do sleep 0.1; i=$((i+1)); done
kill -KILL -"$P" 2>/dev/null || kill -KILL "$P" 2>/dev/null
rm -f "$1"
exit 0"#;

static EXEC_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Container CLI invocation prefix, e.g. `docker` or `podman --remote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRuntime {
    program: String,
    base_args: Vec<String>,
}

impl SandboxRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a config value such as `"docker"` or `"podman --remote"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd
    }
}

/// One container lifetime. Reset replaces it wholesale.
#[derive(Debug)]
struct Session {
    state: SandboxState,
    container_id: Option<String>,
}

impl Session {
    fn fresh() -> Self {
        Self {
            state: SandboxState::Uninitialized,
            container_id: None,
        }
    }

    fn transition(&mut self, next: SandboxState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal sandbox transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Sandbox state change");
        self.state = next;
    }
}

pub struct ContainerSandbox {
    runtime: SandboxRuntime,
    image: String,
    start_timeout: Duration,
    session: Session,
}

impl ContainerSandbox {
    pub fn new(runtime: SandboxRuntime, image: impl Into<String>) -> Self {
        Self {
            runtime,
            image: image.into(),
            start_timeout: DEFAULT_START_TIMEOUT,
            session: Session::fresh(),
        }
    }

    /// Build from the config snapshot (`sandbox_runtime`, `sandbox_image`).
    pub fn from_config(config: &ToolConfig) -> Self {
        let runtime = SandboxRuntime::parse(config.sandbox_runtime())
            .unwrap_or_else(|| SandboxRuntime::new(nova_domain::config::DEFAULT_SANDBOX_RUNTIME));
        Self::new(runtime, config.sandbox_image())
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn container_id(&self) -> Option<&str> {
        self.session.container_id.as_deref()
    }

    async fn launch(&self) -> Result<String, ToolError> {
        if which::which(self.runtime.program()).is_err() {
            return Err(ToolError::sandbox_unavailable(format!(
                "container runtime '{}' not found",
                self.runtime.program()
            )));
        }

        let mut cmd = self.runtime.command();
        cmd.args(["run", "-d", "--rm", &self.image, "tail", "-f", "/dev/null"]);

        let outcome = process::run_supervised(
            cmd,
            self.start_timeout,
            &CancellationToken::new(),
            64 * 1024,
        )
        .await
        .map_err(|e| {
            ToolError::sandbox_unavailable(format!("failed to run container runtime: {}", e))
        })?;

        match outcome {
            ProcessOutcome::Completed(output) if output.status.success() => {
                let stdout = output.stdout_lossy();
                match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
                    Some(id) => Ok(id.to_string()),
                    None => Err(ToolError::sandbox_unavailable(
                        "container runtime returned no container id",
                    )),
                }
            }
            ProcessOutcome::Completed(output) => Err(ToolError::sandbox_unavailable(format!(
                "failed to start container from '{}': {}",
                self.image,
                output.stderr_lossy().trim()
            ))),
            ProcessOutcome::TimedOut | ProcessOutcome::Cancelled => {
                Err(ToolError::sandbox_unavailable(format!(
                    "timed out starting container from '{}'",
                    self.image
                )))
            }
        }
    }

    async fn kill_in_container(&self, container_id: &str, pidfile: &str) {
        let mut cmd = self.runtime.command();
        cmd.args([
            "exec",
            container_id,
            "sh",
            "-c",
            KILL_HELPER,
            "nova-kill",
            pidfile,
        ]);
        let limit = KILL_GRACE + CONTROL_TIMEOUT;
        match process::run_supervised(cmd, limit, &CancellationToken::new(), 4096).await {
            Ok(ProcessOutcome::Completed(_)) => {}
            Ok(_) => warn!(container = %container_id, "Timed out signalling sandbox process"),
            Err(e) => warn!(container = %container_id, "Could not signal sandbox process: {}", e),
        }
    }

    async fn remove_container(&self, container_id: &str) {
        let mut cmd = self.runtime.command();
        cmd.args(["rm", "-f", container_id]);
        match process::run_supervised(cmd, CONTROL_TIMEOUT, &CancellationToken::new(), 4096).await
        {
            Ok(ProcessOutcome::Completed(output)) if output.status.success() => {}
            Ok(ProcessOutcome::Completed(output)) => warn!(
                container = %container_id,
                "Container removal failed: {}",
                output.stderr_lossy().trim()
            ),
            Ok(_) => warn!(container = %container_id, "Timed out removing container"),
            Err(e) => warn!(container = %container_id, "Could not remove container: {}", e),
        }
    }
}

#[async_trait]
impl SandboxPort for ContainerSandbox {
    fn state(&self) -> SandboxState {
        self.session.state
    }

    async fn start(&mut self) -> Result<(), ToolError> {
        match self.session.state {
            SandboxState::Running => return Ok(()),
            SandboxState::Uninitialized => {}
            other => {
                return Err(ToolError::sandbox_unavailable(format!(
                    "sandbox is {}",
                    other
                )));
            }
        }

        self.session.transition(SandboxState::Starting);
        info!(image = %self.image, runtime = %self.runtime.program(), "Starting sandbox");

        match self.launch().await {
            Ok(id) => {
                info!(container = %id, "Sandbox running");
                self.session.container_id = Some(id);
                self.session.transition(SandboxState::Running);
                Ok(())
            }
            Err(e) => {
                warn!("Sandbox unavailable: {}", e.message);
                self.session.transition(SandboxState::Failed);
                Err(e)
            }
        }
    }

    async fn run_command(
        &self,
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let (SandboxState::Running, Some(container_id)) =
            (self.session.state, self.session.container_id.as_deref())
        else {
            return ToolResult::failure(ToolError::sandbox_unavailable(format!(
                "sandbox is {}",
                self.session.state
            )));
        };

        let pidfile = format!(
            "/tmp/nova-exec-{}-{}.pid",
            std::process::id(),
            EXEC_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        let mut cmd = self.runtime.command();
        cmd.args([
            "exec",
            container_id,
            "sh",
            "-c",
            EXEC_WRAPPER,
            "nova-exec",
            &pidfile,
            command,
        ]);

        debug!(container = %container_id, command = %command, "Sandbox exec");
        let outcome = match process::run_supervised(cmd, timeout, cancel, MAX_OUTPUT_SIZE).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return ToolResult::failure(ToolError::sandbox_unavailable(format!(
                    "failed to run container runtime: {}",
                    e
                )));
            }
        };

        match outcome {
            ProcessOutcome::Completed(output) => exec_result(&output),
            ProcessOutcome::TimedOut => {
                self.kill_in_container(container_id, &pidfile).await;
                ToolResult::failure(ToolError::timeout(format!(
                    "sandbox command after {}s",
                    timeout.as_secs_f64()
                )))
            }
            ProcessOutcome::Cancelled => {
                self.kill_in_container(container_id, &pidfile).await;
                ToolResult::failure(ToolError::cancelled("sandbox command"))
            }
        }
    }

    async fn stop(&mut self) {
        match self.session.state {
            SandboxState::Running => {
                if let Some(id) = self.session.container_id.take() {
                    info!(container = %id, "Stopping sandbox");
                    self.remove_container(&id).await;
                }
                self.session.transition(SandboxState::Stopped);
            }
            SandboxState::Uninitialized => self.session.transition(SandboxState::Stopped),
            _ => {}
        }
    }

    async fn reset(&mut self) {
        self.stop().await;
        info!("Sandbox reset");
        self.session = Session::fresh();
    }
}

impl Drop for ContainerSandbox {
    fn drop(&mut self) {
        // Best effort for callers that never called stop(); don't wait.
        if let Some(id) = self.session.container_id.take() {
            let _ = std::process::Command::new(&self.runtime.program)
                .args(&self.runtime.base_args)
                .args(["rm", "-f", &id])
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .spawn();
        }
    }
}

fn exec_result(output: &process::ProcessOutput) -> ToolResult {
    if output.exit_code() != 0 {
        return ToolResult::failure(output.exit_failure());
    }

    let mut metadata = Map::new();
    metadata.insert("exit_code".to_string(), Value::from(0));
    metadata.insert("stderr".to_string(), Value::String(output.stderr_lossy()));
    if output.truncated {
        metadata.insert("truncated".to_string(), Value::Bool(true));
    }
    ToolResult::success_with(output.stdout_lossy(), metadata)
}
