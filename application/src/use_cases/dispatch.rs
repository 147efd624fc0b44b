//! Dispatch use case: the single entry point the agent loop calls.
//!
//! ```text
//! invoke(name, raw_args, cancel)
//!   ├─ start timer
//!   ├─ registry lookup        ──▶ UNKNOWN_TOOL
//!   ├─ validate arguments     ──▶ BAD_ARGUMENT
//!   ├─ lazy sandbox start     (sandbox-capable tools only)
//!   ├─ policy gate            ──▶ FORBIDDEN / SANDBOX_UNAVAILABLE
//!   ├─ metrics: tool_invoke
//!   ├─ Tool::execute          (panic ──▶ INTERNAL, cancel ──▶ CANCELLED)
//!   └─ metrics: tool_result   (exactly once, whatever happened above)
//! ```
//!
//! `invoke` takes `&mut self`: one dispatcher never runs two tools at once.
//! Callers that want parallelism build several dispatchers.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nova_domain::{
    ArgumentValidator, Capability, ErrorKind, PolicyGate, ResultEnvelope, SandboxState,
    StrictValidator, ToolCall, ToolConfig, ToolError, ToolResult,
};

use crate::metrics::{MetricsSummary, MetricsTap};
use crate::ports::metrics_sink::MetricsSink;
use crate::ports::path_guard::PathGuard;
use crate::ports::sandbox::SandboxPort;
use crate::ports::tool::ToolContext;
use crate::registry::ToolRegistry;

/// How long a cancelled tool gets to clean up (TERM → KILL escalation plus
/// slack) before the dispatcher stops waiting for it.
pub const CANCEL_GRACE: Duration = Duration::from_secs(3);

/// Outcome of one `invoke`.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool_name: String,
    pub result: ToolResult,
    pub duration_ms: u64,
}

impl Invocation {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Wire shape handed back to the agent loop.
    pub fn into_envelope(self) -> ResultEnvelope {
        self.result.into_envelope(self.duration_ms)
    }
}

pub struct Dispatcher {
    registry: ToolRegistry,
    config: ToolConfig,
    guard: Box<dyn PathGuard>,
    sandbox: Box<dyn SandboxPort>,
    validator: Box<dyn ArgumentValidator>,
    metrics: MetricsTap,
    cancel_grace: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        config: ToolConfig,
        guard: Box<dyn PathGuard>,
        sandbox: Box<dyn SandboxPort>,
    ) -> Self {
        Self {
            registry,
            config,
            guard,
            sandbox,
            validator: Box::new(StrictValidator),
            metrics: MetricsTap::disabled(),
            cancel_grace: CANCEL_GRACE,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = MetricsTap::new(sink);
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn ArgumentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    // ==================== Accessors ====================

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn sandbox_state(&self) -> SandboxState {
        self.sandbox.state()
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    // ==================== Dispatch ====================

    /// Run a tool by name. Never panics and never returns early without a
    /// `tool_result` metrics event.
    pub async fn invoke(
        &mut self,
        name: &str,
        raw_args: &Value,
        cancel: CancellationToken,
    ) -> Invocation {
        let started = Instant::now();
        let result = self.dispatch(name, raw_args, &cancel).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result.error() {
            Some(err) if err.kind == ErrorKind::Internal => {
                warn!(tool = %name, duration_ms, "Tool failed internally: {}", err.message);
            }
            Some(err) => {
                debug!(tool = %name, duration_ms, kind = %err.kind, "Tool failed: {}", err.message);
            }
            None => debug!(tool = %name, duration_ms, "Tool succeeded"),
        }

        self.metrics.record_result(name, &result, duration_ms);
        Invocation {
            tool_name: name.to_string(),
            result,
            duration_ms,
        }
    }

    /// Convenience wrapper for a parsed [`ToolCall`].
    pub async fn invoke_call(&mut self, call: &ToolCall, cancel: CancellationToken) -> Invocation {
        self.invoke(&call.tool_name, &call.raw_arguments(), cancel)
            .await
    }

    async fn dispatch(
        &mut self,
        name: &str,
        raw_args: &Value,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let Some(tool) = self.registry.lookup(name) else {
            return ToolError::unknown_tool(name).into();
        };
        let descriptor = tool.descriptor();

        let args = match self.validator.validate(&descriptor.schema, raw_args) {
            Ok(args) => args,
            Err(e) => return e.into(),
        };

        if descriptor.requires(Capability::Sandbox)
            && self.sandbox.state() == SandboxState::Uninitialized
        {
            debug!(tool = %name, "Starting sandbox on first use");
            if let Err(e) = self.sandbox.start().await {
                warn!(tool = %name, "Sandbox failed to start: {}", e.message);
            }
        }

        if let Err(e) =
            PolicyGate::evaluate(&self.config, descriptor, &args, self.sandbox.state())
        {
            debug!(tool = %name, "Denied by policy: {}", e.message);
            return e.into();
        }

        if cancel.is_cancelled() {
            return ToolError::cancelled(name).into();
        }

        self.metrics.record_invoke(name, &args);

        let ctx = ToolContext {
            config: &self.config,
            workspace: self.guard.as_ref(),
            sandbox: self.sandbox.as_ref(),
            cancel: cancel.clone(),
        };

        let execution = AssertUnwindSafe(tool.execute(&args, &ctx)).catch_unwind();
        tokio::pin!(execution);

        let outcome = tokio::select! {
            biased;
            outcome = &mut execution => outcome,
            _ = cancel.cancelled() => {
                debug!(tool = %name, "Cancellation requested, waiting for tool to stop");
                return match tokio::time::timeout(self.cancel_grace, &mut execution).await {
                    Ok(Ok(ToolResult::Err(err))) if err.kind == ErrorKind::Cancelled => err.into(),
                    _ => ToolError::cancelled(name).into(),
                };
            }
        };

        match outcome {
            Ok(result) => result,
            Err(panic) => ToolError::internal(format!(
                "tool '{}' panicked: {}",
                name,
                panic_message(panic.as_ref())
            ))
            .into(),
        }
    }

    // ==================== Sandbox lifecycle ====================

    /// Stop the sandbox session. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.sandbox.stop().await;
    }

    /// Replace the sandbox session with a fresh one.
    pub async fn reset_sandbox(&mut self) {
        self.sandbox.reset().await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::metrics_sink::{MemoryMetricsSink, MetricsEventType};
    use crate::ports::tool::Tool;
    use async_trait::async_trait;
    use nova_domain::{Arguments, ParamKind, ParamSpec, ToolDescriptor};
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};

    // ==================== Test doubles ====================

    struct RootGuard {
        root: PathBuf,
    }

    impl PathGuard for RootGuard {
        fn root(&self) -> &Path {
            &self.root
        }

        fn resolve(&self, user_path: &str) -> Result<PathBuf, ToolError> {
            if user_path.contains("..") {
                return Err(ToolError::path_escape(user_path));
            }
            Ok(self.root.join(user_path))
        }
    }

    struct ScriptedSandbox {
        state: SandboxState,
        start_succeeds: bool,
        starts: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl SandboxPort for ScriptedSandbox {
        fn state(&self) -> SandboxState {
            self.state
        }

        async fn start(&mut self) -> Result<(), ToolError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            match self.state {
                SandboxState::Running => Ok(()),
                SandboxState::Uninitialized if self.start_succeeds => {
                    self.state = SandboxState::Running;
                    Ok(())
                }
                SandboxState::Uninitialized => {
                    self.state = SandboxState::Failed;
                    Err(ToolError::sandbox_unavailable("runtime not found"))
                }
                _ => Err(ToolError::sandbox_unavailable("sandbox is not startable")),
            }
        }

        async fn run_command(
            &self,
            command: &str,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> ToolResult {
            ToolResult::success(format!("ran {}", command))
        }

        async fn stop(&mut self) {
            if matches!(self.state, SandboxState::Running | SandboxState::Uninitialized) {
                self.state = SandboxState::Stopped;
            }
        }

        async fn reset(&mut self) {
            self.stop().await;
            self.state = SandboxState::Uninitialized;
        }
    }

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor::new("echo", "Echo text")
                    .with_param(ParamSpec::required("text", ParamKind::String, "Text"))
                    .with_capability(Capability::Introspection),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
            match args.require_str("text") {
                Ok(text) => ToolResult::success(text),
                Err(e) => e.into(),
            }
        }
    }

    struct PanicTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for PanicTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
            let lines: Vec<String> = Vec::new();
            ToolResult::success(lines[3].clone())
        }
    }

    /// Waits for cancellation, then reports it after a short cleanup.
    struct CooperativeSleepTool {
        descriptor: ToolDescriptor,
        cleaned_up: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Tool for CooperativeSleepTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(60)) => ToolResult::success("slept"),
                _ = ctx.cancel.cancelled() => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    self.cleaned_up.store(true, Ordering::SeqCst);
                    ToolError::cancelled("sleep (process terminated)").into()
                }
            }
        }
    }

    /// Ignores cancellation entirely.
    struct StubbornTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for StubbornTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: &Arguments, _ctx: &ToolContext<'_>) -> ToolResult {
            tokio::time::sleep(Duration::from_secs(600)).await;
            ToolResult::success("finally")
        }
    }

    struct SandboxEchoTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for SandboxEchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
            let command = args.get_str("command").unwrap_or_default();
            ctx.sandbox
                .run_command(command, Duration::from_secs(5), &ctx.cancel)
                .await
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        sink: Arc<MemoryMetricsSink>,
        starts: Arc<std::sync::atomic::AtomicUsize>,
    }

    fn harness_with(tools: Vec<Arc<dyn Tool>>, sandbox_ok: bool, config: ToolConfig) -> Harness {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register_arc(tool).unwrap();
        }
        let sink = Arc::new(MemoryMetricsSink::new());
        let starts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(
            registry,
            config,
            Box::new(RootGuard {
                root: PathBuf::from("/ws"),
            }),
            Box::new(ScriptedSandbox {
                state: SandboxState::Uninitialized,
                start_succeeds: sandbox_ok,
                starts: starts.clone(),
            }),
        )
        .with_metrics(sink.clone());
        Harness {
            dispatcher,
            sink,
            starts,
        }
    }

    fn default_config() -> ToolConfig {
        ToolConfig::builder("/ws").build().unwrap()
    }

    fn harness() -> Harness {
        let echo: Arc<dyn Tool> = Arc::new(EchoTool::new());
        harness_with(vec![echo], true, default_config())
    }

    fn sandbox_tool() -> Arc<dyn Tool> {
        Arc::new(SandboxEchoTool {
            descriptor: ToolDescriptor::new("sandbox_exec", "Run in sandbox")
                .with_param(ParamSpec::required("command", ParamKind::String, "Command"))
                .with_capability(Capability::Sandbox),
        })
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_successful_invocation() {
        let mut h = harness();
        let inv = h
            .dispatcher
            .invoke("echo", &json!({"text": "hello"}), CancellationToken::new())
            .await;

        assert_eq!(inv.tool_name, "echo");
        assert_eq!(inv.result.output(), Some("hello"));
        assert_eq!(h.sink.count(MetricsEventType::ToolInvoke), 1);
        assert_eq!(h.sink.count(MetricsEventType::ToolResult), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_still_emits_result() {
        let mut h = harness();
        let inv = h
            .dispatcher
            .invoke("does_not_exist", &json!({}), CancellationToken::new())
            .await;

        let err = inv.result.error().unwrap();
        assert_eq!(err.kind, ErrorKind::UnknownTool);
        assert_eq!(err.message, "does_not_exist");
        assert_eq!(h.sink.count(MetricsEventType::ToolInvoke), 0);

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "does_not_exist");
        assert_eq!(events[0].metadata["outcome"], "UNKNOWN_TOOL");
    }

    #[tokio::test]
    async fn test_bad_arguments_rejected_before_execution() {
        let mut h = harness();
        let inv = h
            .dispatcher
            .invoke("echo", &json!({"text": 42}), CancellationToken::new())
            .await;

        assert_eq!(inv.result.error_kind(), Some(ErrorKind::BadArgument));
        assert_eq!(h.sink.count(MetricsEventType::ToolInvoke), 0);
        assert_eq!(h.sink.count(MetricsEventType::ToolResult), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal() {
        let tool: Arc<dyn Tool> = Arc::new(PanicTool {
            descriptor: ToolDescriptor::new("explode", "Always panics"),
        });
        let mut h = harness_with(vec![tool], true, default_config());

        let inv = h
            .dispatcher
            .invoke("explode", &Value::Null, CancellationToken::new())
            .await;

        let err = inv.result.error().unwrap();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(!err.recoverable);
        assert!(err.message.contains("index out of bounds"));
        assert_eq!(h.sink.count(MetricsEventType::ToolResult), 1);

        // The dispatcher is still usable afterwards.
        let inv = h
            .dispatcher
            .invoke("explode", &Value::Null, CancellationToken::new())
            .await;
        assert_eq!(inv.result.error_kind(), Some(ErrorKind::Internal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_waits_for_cooperative_tool() {
        let cleaned_up = Arc::new(AtomicBool::new(false));
        let tool: Arc<dyn Tool> = Arc::new(CooperativeSleepTool {
            descriptor: ToolDescriptor::new("sleep", "Sleep"),
            cleaned_up: cleaned_up.clone(),
        });
        let mut h = harness_with(vec![tool], true, default_config());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let inv = h.dispatcher.invoke("sleep", &json!({}), cancel).await;

        let err = inv.result.error().unwrap();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(err.message.contains("process terminated"));
        assert!(cleaned_up.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_gives_up_after_grace() {
        let tool: Arc<dyn Tool> = Arc::new(StubbornTool {
            descriptor: ToolDescriptor::new("stubborn", "Ignores cancel"),
        });
        let mut h = harness_with(vec![tool], true, default_config());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let inv = h.dispatcher.invoke("stubborn", &json!({}), cancel).await;

        assert_eq!(inv.result.error_kind(), Some(ErrorKind::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(h.sink.count(MetricsEventType::ToolResult), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_skips_execution() {
        let mut h = harness();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let inv = h
            .dispatcher
            .invoke("echo", &json!({"text": "x"}), cancel)
            .await;

        assert_eq!(inv.result.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(h.sink.count(MetricsEventType::ToolInvoke), 0);
    }

    #[tokio::test]
    async fn test_sandbox_started_lazily_once() {
        let mut h = harness_with(vec![sandbox_tool()], true, default_config());
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Uninitialized);

        for _ in 0..2 {
            let inv = h
                .dispatcher
                .invoke(
                    "sandbox_exec",
                    &json!({"command": "python -V"}),
                    CancellationToken::new(),
                )
                .await;
            assert_eq!(inv.result.output(), Some("ran python -V"));
        }

        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Running);
    }

    #[tokio::test]
    async fn test_failed_sandbox_is_unavailable() {
        let mut h = harness_with(vec![sandbox_tool()], false, default_config());

        let inv = h
            .dispatcher
            .invoke(
                "sandbox_exec",
                &json!({"command": "ls"}),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(inv.result.error_kind(), Some(ErrorKind::SandboxUnavailable));
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Failed);

        // No second start attempt while Failed.
        h.dispatcher
            .invoke(
                "sandbox_exec",
                &json!({"command": "ls"}),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_and_reset() {
        let mut h = harness_with(vec![sandbox_tool()], true, default_config());
        h.dispatcher
            .invoke("sandbox_exec", &json!({"command": "ls"}), CancellationToken::new())
            .await;

        h.dispatcher.shutdown().await;
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Stopped);
        h.dispatcher.shutdown().await;
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Stopped);

        h.dispatcher.reset_sandbox().await;
        assert_eq!(h.dispatcher.sandbox_state(), SandboxState::Uninitialized);
    }

    #[tokio::test]
    async fn test_non_sandbox_tools_do_not_start_sandbox() {
        let mut h = harness();
        h.dispatcher
            .invoke("echo", &json!({"text": "x"}), CancellationToken::new())
            .await;
        assert_eq!(h.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_envelope_and_summary() {
        let mut h = harness();
        let ok = h
            .dispatcher
            .invoke("echo", &json!({"text": "a"}), CancellationToken::new())
            .await;
        h.dispatcher
            .invoke("nope", &json!({}), CancellationToken::new())
            .await;

        let envelope = ok.into_envelope();
        assert!(envelope.ok);
        assert_eq!(envelope.output.as_deref(), Some("a"));

        let summary = h.dispatcher.metrics_summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
    }

    #[tokio::test]
    async fn test_invoke_call() {
        let mut h = harness();
        let call = ToolCall::new("echo").with_arg("text", "from call");
        let inv = h
            .dispatcher
            .invoke_call(&call, CancellationToken::new())
            .await;
        assert_eq!(inv.result.output(), Some("from call"));
    }
}
