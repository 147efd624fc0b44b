//! Tool domain value objects: result and error types
//!
//! Every invocation produces exactly one [`ToolResult`]. Failures carry a
//! named [`ErrorKind`] so the agent loop can decide whether to retry, ask the
//! user, or give up, and they never unwind past the dispatcher.
//!
//! | Kind | Recoverable | Raised by |
//! |------|:-----------:|-----------|
//! | `UNKNOWN_TOOL` | yes | dispatcher lookup |
//! | `BAD_ARGUMENT` | yes | schema validator, tools |
//! | `FORBIDDEN` | yes | policy gate |
//! | `NOT_FOUND` | yes | file tools |
//! | `TOO_LARGE` | yes | file tools |
//! | `TIMEOUT` | yes | shell / sandbox |
//! | `NON_ZERO_EXIT` | yes | shell / sandbox |
//! | `NETWORK_FAILURE` | yes | web tools |
//! | `SANDBOX_UNAVAILABLE` | yes | policy gate, sandbox runner |
//! | `CANCELLED` | yes | dispatcher, process tools |
//! | `INTERNAL` | no | dispatcher (tool panic or bug) |
//! | `PATH_ESCAPE` | yes | workspace guard |
//! | `DUPLICATE_NAME` | yes | registry (registration only) |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Exhaustive taxonomy of tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnknownTool,
    BadArgument,
    Forbidden,
    NotFound,
    TooLarge,
    Timeout,
    NonZeroExit,
    NetworkFailure,
    SandboxUnavailable,
    Cancelled,
    Internal,
    PathEscape,
    DuplicateName,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "UNKNOWN_TOOL",
            ErrorKind::BadArgument => "BAD_ARGUMENT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TooLarge => "TOO_LARGE",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NonZeroExit => "NON_ZERO_EXIT",
            ErrorKind::NetworkFailure => "NETWORK_FAILURE",
            ErrorKind::SandboxUnavailable => "SANDBOX_UNAVAILABLE",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::PathEscape => "PATH_ESCAPE",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
        }
    }

    /// Everything except `Internal` can be retried or fixed by the agent.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error outcome of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    /// Short user-visible cause, no stack traces
    pub message: String,
    pub recoverable: bool,
    /// Structured detail (exit code, stderr, HTTP status, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.is_recoverable(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownTool, name)
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadArgument, message)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, reason)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("not found: {}", resource.into()),
        )
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooLarge, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("timed out: {}", operation.into()),
        )
    }

    pub fn non_zero_exit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonZeroExit, message)
    }

    pub fn network_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkFailure, message)
    }

    pub fn sandbox_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SandboxUnavailable, message)
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Cancelled,
            format!("cancelled: {}", operation.into()),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn path_escape(path: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::PathEscape,
            format!("path escapes the workspace: {}", path.into()),
        )
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::DuplicateName,
            format!("tool '{}' is already registered", name.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Successful outcome: displayable text plus optional structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Map<String, Value>>,
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Ok(ToolOutput),
    Err(ToolError),
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<String>) -> Self {
        ToolResult::Ok(ToolOutput {
            output: output.into(),
            structured: None,
        })
    }

    /// Create a successful result with structured data
    pub fn success_with(output: impl Into<String>, structured: Map<String, Value>) -> Self {
        ToolResult::Ok(ToolOutput {
            output: output.into(),
            structured: Some(structured),
        })
    }

    /// Create a failed result
    pub fn failure(error: ToolError) -> Self {
        ToolResult::Err(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Ok(_))
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            ToolResult::Ok(out) => Some(&out.output),
            ToolResult::Err(_) => None,
        }
    }

    pub fn structured(&self) -> Option<&Map<String, Value>> {
        match self {
            ToolResult::Ok(out) => out.structured.as_ref(),
            ToolResult::Err(err) => err.metadata.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolResult::Ok(_) => None,
            ToolResult::Err(err) => Some(err),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(|e| e.kind)
    }

    /// Short outcome tag used in metrics ("ok" or the error kind).
    pub fn outcome_tag(&self) -> &'static str {
        match self {
            ToolResult::Ok(_) => "ok",
            ToolResult::Err(err) => err.kind.as_str(),
        }
    }

    /// Convert into the wire shape handed back to the agent loop.
    pub fn into_envelope(self, duration_ms: u64) -> ResultEnvelope {
        match self {
            ToolResult::Ok(out) => ResultEnvelope {
                ok: true,
                output: Some(out.output),
                error: None,
                metadata: out.structured,
                duration_ms,
            },
            ToolResult::Err(err) => ResultEnvelope {
                ok: false,
                output: None,
                error: Some(ErrorBody {
                    kind: err.kind,
                    message: err.message,
                    recoverable: err.recoverable,
                }),
                metadata: err.metadata,
                duration_ms,
            },
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(error: ToolError) -> Self {
        ToolResult::Err(error)
    }
}

/// Error body of the wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub recoverable: bool,
}

/// Result wire shape: `{ ok, output?, error?, metadata?, duration_ms }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub duration_ms: u64,
}
