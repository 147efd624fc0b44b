//! CLI entrypoint for nova-tools
//!
//! Wires the layers together: configuration → snapshot → workspace guard,
//! sandbox runner and metrics sink → dispatcher.

mod commands;
mod output;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use nova_application::{Dispatcher, ToolRegistry, ToolSchemaPort};
use nova_domain::{ErrorKind, ResultEnvelope, ToolCall, ToolError, ToolResult};
use nova_infrastructure::{
    ConfigLoader, ContainerSandbox, FileConfig, JsonSchemaToolConverter, JsonlMetricsSink,
    WorkspaceGuard, standard_registry,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if let Command::ShowConfig = cli.command {
        print_config_sources();
        return Ok(ExitCode::SUCCESS);
    }

    let registry = standard_registry()?;
    if let Command::List { json } = cli.command {
        print_tool_list(&registry, json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut file_config = load_config(&cli)?;
    let workspace = match &cli.workspace {
        Some(dir) => Some(dir.clone()),
        None => file_config.tools.workspace_dir.take(),
    };
    let workspace = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    file_config.tools.workspace_dir = Some(
        std::path::absolute(&workspace)
            .with_context(|| format!("invalid workspace path {}", workspace.display()))?,
    );

    let metrics_path = if cli.no_metrics {
        None
    } else {
        cli.metrics.clone().or_else(|| file_config.metrics.resolved_path())
    };

    let config = file_config.into_snapshot()?;
    let guard = WorkspaceGuard::new(config.workspace_dir())
        .with_context(|| format!("cannot open workspace {}", config.workspace_dir().display()))?;
    let sandbox = ContainerSandbox::from_config(&config);
    info!(workspace = %config.workspace_dir().display(), "Starting nova-tools");

    let mut dispatcher = Dispatcher::new(registry, config, Box::new(guard), Box::new(sandbox));
    if let Some(path) = metrics_path {
        match JsonlMetricsSink::open(&path) {
            Ok(sink) => dispatcher = dispatcher.with_metrics(Arc::new(sink)),
            Err(e) => warn!("Metrics disabled, cannot open {}: {}", path.display(), e),
        }
    }

    // Ctrl-C cancels whatever is running; every call gets a child token.
    let session = CancellationToken::new();
    let on_interrupt = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let code = match cli.command {
        Command::Invoke { name, args, json } => {
            let raw = parse_args(args.as_deref())?;
            let invocation = dispatcher.invoke(&name, &raw, session.child_token()).await;

            eprintln!("{}", output::format_status(&invocation));
            let ok = invocation.is_success();
            if json {
                println!("{}", serde_json::to_string_pretty(&invocation.into_envelope())?);
            } else if let Some(text) = invocation.result.output() {
                println!("{}", text);
            }
            if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Command::Batch => run_batch(&mut dispatcher, &session).await?,
        Command::List { .. } | Command::ShowConfig => ExitCode::SUCCESS,
    };

    dispatcher.shutdown().await;
    let summary = dispatcher.metrics_summary();
    info!(
        total = summary.total,
        successful = summary.successful,
        average_ms = summary.average_duration_ms(),
        "Session finished"
    );
    Ok(code)
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return ConfigLoader::load_env_only()
            .map_err(|e| anyhow!("invalid configuration in environment: {}", e));
    }

    if let Some(path) = &cli.config
        && !path.exists()
    {
        bail!("config file not found: {}", path.display());
    }
    ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("invalid configuration: {}", e))
}

fn print_config_sources() {
    println!("Configuration sources (in priority order):");
    println!("  [ENV  ] NOVA_* variables (NOVA_TOOLS__<KEY>, NOVA_METRICS__<KEY>)");

    match ConfigLoader::project_config_path() {
        Some(path) => println!("  [FOUND] Project: {}", path.display()),
        None => println!("  [     ] Project: ./nova.toml or ./.nova.toml"),
    }

    if let Some(path) = ConfigLoader::global_config_path() {
        let marker = if path.exists() { "FOUND" } else { "     " };
        println!("  [{}] Global:  {}", marker, path.display());
    }

    println!("  [     ] Default: built-in defaults");
}

fn print_tool_list(registry: &ToolRegistry, json: bool) -> Result<()> {
    if json {
        let schemas = JsonSchemaToolConverter.all_tools_schema(registry);
        println!("{}", serde_json::to_string_pretty(&schemas)?);
    } else {
        print!("{}", output::format_tool_list(&registry.list()));
    }
    Ok(())
}

fn parse_args(args: Option<&str>) -> Result<Value> {
    match args {
        None => Ok(Value::Object(Default::default())),
        Some(text) => serde_json::from_str(text).context("arguments are not valid JSON"),
    }
}

/// One envelope per input line. Malformed lines get a `BAD_ARGUMENT`
/// envelope and do not stop the batch; an interrupt does.
async fn run_batch(dispatcher: &mut Dispatcher, session: &CancellationToken) -> Result<ExitCode> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failures = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            _ = session.cancelled() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => dispatcher
                .invoke_call(&call, session.child_token())
                .await
                .into_envelope(),
            Err(e) => malformed_line(&e.to_string()),
        };
        if !envelope.ok {
            failures += 1;
        }
        println!("{}", serde_json::to_string(&envelope)?);

        if session.is_cancelled() {
            break;
        }
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn malformed_line(cause: &str) -> ResultEnvelope {
    let error = ToolError::new(ErrorKind::BadArgument, format!("malformed tool call: {}", cause));
    ToolResult::failure(error).into_envelope(0)
}
