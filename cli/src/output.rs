//! Terminal formatting for tool listings and results

use colored::Colorize;
use nova_application::Invocation;
use nova_domain::{ToolDescriptor, ToolResult};

/// Human-readable tool listing.
pub fn format_tool_list(tools: &[&ToolDescriptor]) -> String {
    let mut out = String::new();
    for tool in tools {
        let capabilities = tool
            .capabilities
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "{} {}\n    {}\n",
            tool.name.bold(),
            format!("[{}]", capabilities).dimmed(),
            tool.description
        ));
        for param in tool.schema.params() {
            let mut flags = vec![param.kind.as_str().to_string()];
            if param.required {
                flags.push("required".to_string());
            }
            if let Some(default) = &param.default {
                flags.push(format!("default {}", default));
            }
            out.push_str(&format!(
                "      {} ({}) {}\n",
                param.name.cyan(),
                flags.join(", "),
                param.description
            ));
        }
    }
    out
}

/// One-line status footer printed to stderr after `invoke`.
pub fn format_status(invocation: &Invocation) -> String {
    match &invocation.result {
        ToolResult::Ok(_) => format!(
            "{}: {} ({} ms)",
            invocation.tool_name,
            "ok".green().bold(),
            invocation.duration_ms
        ),
        ToolResult::Err(err) => format!(
            "{}: {} ({} ms)",
            invocation.tool_name,
            format!("error {}", err).red().bold(),
            invocation.duration_ms
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_domain::{Capability, ParamKind, ParamSpec, ToolError};

    #[test]
    fn test_tool_list_mentions_params() {
        colored::control::set_override(false);
        let tool = ToolDescriptor::new("file_list", "List a directory")
            .with_param(ParamSpec::new("path", ParamKind::Path, "Directory").with_default("."))
            .with_capability(Capability::Filesystem);

        let text = format_tool_list(&[&tool]);
        assert!(text.starts_with("file_list [filesystem]\n"));
        assert!(text.contains("path (path, default \".\") Directory"));
    }

    #[test]
    fn test_status_line() {
        colored::control::set_override(false);
        let invocation = Invocation {
            tool_name: "shell_run".to_string(),
            result: ToolResult::failure(ToolError::forbidden("shell commands are disabled")),
            duration_ms: 3,
        };
        assert_eq!(
            format_status(&invocation),
            "shell_run: error [FORBIDDEN] shell commands are disabled (3 ms)"
        );
    }
}
