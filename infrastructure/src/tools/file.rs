//! File operation tools: file_read, file_write, file_list
//!
//! Every path goes through the workspace guard before the filesystem is
//! touched.

use async_trait::async_trait;
use nova_application::{Tool, ToolContext};
use nova_domain::{
    Arguments, Capability, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolResult,
};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::Path;

/// Tool name constants
pub const FILE_READ: &str = "file_read";
pub const FILE_WRITE: &str = "file_write";
pub const FILE_LIST: &str = "file_list";

/// Maximum file size to read (1 MiB, inclusive)
pub const MAX_READ_SIZE: u64 = 1024 * 1024;

/// Map an I/O failure on `path` to the closest tool error.
pub(crate) fn io_error(path: &str, error: io::Error) -> ToolError {
    match error.kind() {
        io::ErrorKind::NotFound => ToolError::not_found(path),
        io::ErrorKind::PermissionDenied => {
            ToolError::forbidden(format!("permission denied: {}", path))
        }
        io::ErrorKind::IsADirectory | io::ErrorKind::NotADirectory => {
            ToolError::bad_argument(format!("{}: {}", path, error))
        }
        _ => ToolError::internal(format!("{}: {}", path, error)),
    }
}

fn display(ctx: &ToolContext<'_>, resolved: &Path) -> String {
    let relative = ctx.workspace.display_path(resolved);
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.display().to_string()
    }
}

/// Read a file inside the workspace.
pub struct FileReadTool {
    descriptor: ToolDescriptor,
}

impl FileReadTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            FILE_READ,
            "Read the contents of a file in the workspace",
        )
        .with_param(ParamSpec::required("path", ParamKind::Path, "Path to the file to read"))
        .with_param(ParamSpec::new(
            "offset",
            ParamKind::Number,
            "Line number to start reading from (0-indexed)",
        ))
        .with_param(ParamSpec::new(
            "limit",
            ParamKind::Number,
            "Maximum number of lines to read",
        ))
        .with_capability(Capability::Filesystem);
        Self { descriptor }
    }

    async fn read(&self, args: &Arguments, ctx: &ToolContext<'_>) -> Result<ToolResult, ToolError> {
        let path_str = args.require_str("path")?;
        let path = ctx.workspace.resolve(path_str)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(path_str, e))?;
        if !metadata.is_file() {
            return Err(ToolError::bad_argument(format!("'{}' is not a file", path_str)));
        }
        if metadata.len() > MAX_READ_SIZE {
            return Err(ToolError::too_large(format!(
                "{} is {} bytes, maximum is {} bytes",
                path_str,
                metadata.len(),
                MAX_READ_SIZE
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(path_str, e))?;
        // The file may have grown since the metadata check.
        if bytes.len() as u64 > MAX_READ_SIZE {
            return Err(ToolError::too_large(format!(
                "{} is larger than {} bytes",
                path_str, MAX_READ_SIZE
            )));
        }
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let offset = args.get_u64("offset").unwrap_or(0) as usize;
        let limit = args.get_u64("limit").map(|l| l as usize);

        let mut structured = Map::new();
        structured.insert("path".to_string(), Value::String(display(ctx, &path)));
        structured.insert("bytes".to_string(), Value::from(bytes.len()));

        let output = if offset > 0 || limit.is_some() {
            let lines: Vec<&str> = content.lines().collect();
            let total_lines = lines.len();
            structured.insert("total_lines".to_string(), Value::from(total_lines));

            if offset >= total_lines {
                String::new()
            } else {
                let end = match limit {
                    Some(l) => offset.saturating_add(l).min(total_lines),
                    None => total_lines,
                };
                lines[offset..end].join("\n")
            }
        } else {
            content
        };

        Ok(ToolResult::success_with(output, structured))
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        self.read(args, ctx).await.unwrap_or_else(ToolResult::from)
    }
}

/// Write a file inside the workspace, atomically.
pub struct FileWriteTool {
    descriptor: ToolDescriptor,
}

impl FileWriteTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            FILE_WRITE,
            "Write content to a file in the workspace. Creates parent directories and replaces the file if it exists.",
        )
        .with_param(ParamSpec::required("path", ParamKind::Path, "Path to the file to write"))
        .with_param(ParamSpec::required(
            "content",
            ParamKind::String,
            "Content to write to the file",
        ))
        .with_capability(Capability::Filesystem);
        Self { descriptor }
    }

    async fn write_file(
        &self,
        args: &Arguments,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolResult, ToolError> {
        let path_str = args.require_str("path")?;
        let content = args.require_str("content")?.to_string();
        let path = ctx.workspace.resolve(path_str)?;

        let is_dir = tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir());
        if is_dir {
            return Err(ToolError::bad_argument(format!("'{}' is a directory", path_str)));
        }

        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.workspace.root().to_path_buf());
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| io_error(path_str, e))?;

        let bytes = content.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&parent, &target, content.as_bytes()))
            .await
            .map_err(|e| ToolError::internal(format!("write task failed: {}", e)))?
            .map_err(|e| io_error(path_str, e))?;

        let shown = display(ctx, &path);
        tracing::debug!(tool = FILE_WRITE, path = %shown, bytes, "Wrote file");

        let mut structured = Map::new();
        structured.insert("path".to_string(), Value::String(shown.clone()));
        structured.insert("bytes".to_string(), Value::from(bytes));
        Ok(ToolResult::success_with(
            format!("wrote {} ({} bytes)", shown, bytes),
            structured,
        ))
    }
}

impl Default for FileWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Temp file in the same directory, then rename over the target.
fn write_atomic(dir: &Path, target: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl Tool for FileWriteTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        self.write_file(args, ctx).await.unwrap_or_else(ToolResult::from)
    }
}

/// List a directory inside the workspace.
pub struct FileListTool {
    descriptor: ToolDescriptor,
}

impl FileListTool {
    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            FILE_LIST,
            "List the entries of a directory in the workspace ('d' for directories, 'f' for files)",
        )
        .with_param(
            ParamSpec::new("path", ParamKind::Path, "Directory to list").with_default("."),
        )
        .with_capability(Capability::Filesystem);
        Self { descriptor }
    }

    async fn list(&self, args: &Arguments, ctx: &ToolContext<'_>) -> Result<ToolResult, ToolError> {
        let path_str = args.get_str("path").unwrap_or(".");
        let path = ctx.workspace.resolve(path_str)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(path_str, e))?;
        if !metadata.is_dir() {
            return Err(ToolError::bad_argument(format!(
                "'{}' is not a directory",
                path_str
            )));
        }

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_error(path_str, e))?;
        let mut entries: Vec<(String, bool)> = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_error(path_str, e))?
        {
            // Follow symlinks so a link to a directory lists as one.
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .is_ok_and(|m| m.is_dir());
            entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let output = entries
            .iter()
            .map(|(name, is_dir)| format!("{} {}", if *is_dir { "d" } else { "f" }, name))
            .collect::<Vec<_>>()
            .join("\n");

        let mut structured = Map::new();
        structured.insert("path".to_string(), Value::String(display(ctx, &path)));
        structured.insert("entries".to_string(), Value::from(entries.len()));
        Ok(ToolResult::success_with(output, structured))
    }
}

impl Default for FileListTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileListTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        self.list(args, ctx).await.unwrap_or_else(ToolResult::from)
    }
}
