//! web_get tool: fetch a URL over HTTP(S)
//!
//! Plain GET with a 10 second timeout and at most 5 redirects. The body is
//! cut to the first 5000 characters; with `text_only` HTML pages are reduced
//! to their readable text first.

use async_trait::async_trait;
use nova_application::{Tool, ToolContext};
use nova_domain::{
    Arguments, Capability, ParamKind, ParamSpec, ToolDescriptor, ToolError, ToolResult,
    util::truncate_chars,
};
use serde_json::{Map, Value};
use std::time::Duration;

/// Tool name constant
pub const WEB_GET: &str = "web_get";

/// Characters of body text returned to the caller
pub const MAX_OUTPUT_CHARS: usize = 5000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

/// Upper bound on bytes read from a response body
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

pub struct WebGetTool {
    descriptor: ToolDescriptor,
    client: reqwest::Client,
}

impl WebGetTool {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("nova-tools/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxies, custom TLS roots, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        let descriptor = ToolDescriptor::new(
            WEB_GET,
            "Fetch a web page over HTTP(S) and return its content (first 5000 characters)",
        )
        .with_param(ParamSpec::required("url", ParamKind::Url, "The URL to fetch"))
        .with_param(
            ParamSpec::new(
                "text_only",
                ParamKind::Boolean,
                "Strip HTML markup and return only the readable text",
            )
            .with_default(false),
        )
        .with_capability(Capability::Network);
        Self { descriptor, client }
    }

    async fn fetch(&self, url: &str, text_only: bool) -> Result<ToolResult, ToolError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(ToolError::network_failure(format!(
                "HTTP {} {} from {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                final_url
            ))
            .with_metadata(Map::from_iter([(
                "status".to_string(),
                Value::from(status.as_u16()),
            )])));
        }

        if let Some(length) = response.content_length()
            && length > MAX_BODY_SIZE as u64
        {
            return Err(ToolError::too_large(format!(
                "response too large: {} bytes (max: {} bytes)",
                length, MAX_BODY_SIZE
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Bodies without a length are read up to the cap and cut there.
        let mut body = Vec::new();
        let mut body_truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(url, e))?
        {
            let room = MAX_BODY_SIZE - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                body_truncated = chunk.len() > room;
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&body);

        let is_html = content_type.contains("text/html") || content_type.contains("application/xhtml");
        let text = if text_only && is_html {
            html_to_text(&body)
        } else {
            body.into_owned()
        };

        let (output, truncated) = truncate_chars(&text, MAX_OUTPUT_CHARS);

        let mut structured = Map::new();
        structured.insert("status".to_string(), Value::from(status.as_u16()));
        structured.insert("url".to_string(), Value::String(final_url));
        structured.insert("content_type".to_string(), Value::String(content_type));
        structured.insert("truncated".to_string(), Value::Bool(truncated || body_truncated));
        Ok(ToolResult::success_with(output, structured))
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> ToolError {
    let cause = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        format!("more than {} redirects", MAX_REDIRECTS)
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    };
    ToolError::network_failure(format!("{}: {}", url, cause))
}

#[async_trait]
impl Tool for WebGetTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: &Arguments, ctx: &ToolContext<'_>) -> ToolResult {
        let url = match args.require_str("url") {
            Ok(u) => u,
            Err(e) => return ToolResult::failure(e),
        };
        let text_only = args.get_bool("text_only").unwrap_or(false);

        tracing::debug!(tool = WEB_GET, url = %url, text_only, "Fetching");
        // Dropping the request future aborts the connection.
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => ToolResult::failure(ToolError::cancelled("web request")),
            result = self.fetch(url, text_only) => result.unwrap_or_else(ToolResult::from),
        }
    }
}

/// Tags whose subtree never contributes text
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template", "head"];

/// Tags that start a new line in the extracted text
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "pre", "blockquote", "table", "ul", "ol",
];

/// Extract readable text from HTML, one line per block element.
pub fn html_to_text(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);
    tidy_lines(&raw)
}

fn collect_text(element: scraper::ElementRef<'_>, out: &mut String) {
    let tag = element.value().name();
    if SKIP_TAGS.contains(&tag) {
        return;
    }
    let block = BLOCK_TAGS.contains(&tag);
    if block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                out.push(' ');
                out.push_str(text);
            }
            scraper::Node::Element(_) => {
                if let Some(child_el) = scraper::ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }

    if block {
        out.push('\n');
    }
}

/// Collapse runs of spaces inside lines and drop blank lines.
fn tidy_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
