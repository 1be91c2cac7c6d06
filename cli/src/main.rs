//! CLI entrypoint for repo-lens
//!
//! This is the main binary that wires together all layers using
//! dependency injection and dispatches the subcommands.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use futures::StreamExt;
use lens_application::{
    ExportJobQueue, RunAnalysisInput, RunAnalysisUseCase, ToolExecutorPort, TranscriptLogger,
};
use lens_domain::{EventPayload, ExportRequest, JobId, JobStatus};
use lens_infrastructure::{
    ConfigLoader, FileConfig, GitHubApiToolExecutor, InMemoryJobStore, JsonlTranscriptLogger,
    MarkdownReportRenderer, McpToolExecutor, ProviderRegistry, ToolBackend,
};
use lens_presentation::{
    AppState, Cli, Command, ConsoleFormatter, EventFormatter, ExportProgress, JsonLinesFormatter,
};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config || matches!(cli.command, Some(Command::Config)) {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = ConfigLoader::load(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    let default_level = if matches!(command, Command::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    let _log_guard = init_logging(cli.verbose, default_level, config.logging.dir.as_deref())?;

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("config error: {issue}");
        }
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    match command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Analyze {
            repo_url,
            language,
            provider,
            model,
            json,
        } => {
            let input =
                RunAnalysisInput::parse(&repo_url, language.as_deref(), provider.as_deref(), model)?;
            analyze(config, input, json).await
        }
        Command::Export {
            analysis,
            repo_url,
            project_name,
            wait,
        } => export(config, &analysis, repo_url, project_name, wait).await,
        Command::Config => Ok(()),
    }
}

/// Initialize logging based on verbosity level.
///
/// `RUST_LOG` overrides the verbosity flags. When `dir` is set, a daily
/// rolling file receives the same records; the returned guard flushes it.
fn init_logging(verbose: u8, default_level: &str, dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "repo-lens.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

// === Dependency Injection ===

async fn build_tools(config: &FileConfig) -> Result<Arc<dyn ToolExecutorPort>> {
    let tools = &config.tools;
    match tools.backend {
        ToolBackend::Mcp => {
            let command = tools.mcp.server_command(tools.github.token());
            info!("Starting MCP tool server: {} {}", command.program, command.args.join(" "));
            let executor = McpToolExecutor::start(
                &command,
                Duration::from_secs(tools.mcp.startup_timeout_secs.max(1)),
            )
            .await
            .with_context(|| format!("Failed to start MCP tool server `{}`", command.program))?;
            Ok(Arc::new(executor))
        }
        ToolBackend::Github => {
            let options = tools.github.to_options();
            if options.token.is_none() {
                warn!(
                    "{} is not set; GitHub API requests are unauthenticated and heavily rate limited",
                    tools.github.token_env
                );
            }
            let timeout = Duration::from_secs(config.analysis.tool_timeout_secs.max(1));
            let executor = GitHubApiToolExecutor::with_timeout(options, timeout)
                .context("Failed to build GitHub API client")?;
            Ok(Arc::new(executor))
        }
    }
}

async fn build_analysis(config: &FileConfig) -> Result<RunAnalysisUseCase> {
    let registry = ProviderRegistry::new(config.providers.to_provider_config())
        .context("Model provider is not usable")?;
    info!(
        "Default model: {} / {}",
        registry.config().default,
        registry.config().model_for(registry.config().default)
    );
    let tools = build_tools(config).await?;

    let mut use_case = RunAnalysisUseCase::new(Arc::new(registry), tools)
        .with_params(config.analysis.to_params(config.server.event_buffer));

    if let Some(dir) = &config.logging.transcript_dir {
        match JsonlTranscriptLogger::new(dir) {
            Some(logger) => {
                info!("Writing session transcripts to {}", dir.display());
                let logger: Arc<dyn TranscriptLogger> = Arc::new(logger);
                use_case = use_case.with_transcript_logger(logger);
            }
            None => warn!("Transcript directory {} is not writable", dir.display()),
        }
    }
    Ok(use_case)
}

fn build_exports(config: &FileConfig) -> ExportJobQueue {
    ExportJobQueue::start(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(MarkdownReportRenderer::new(&config.export.output_dir)),
        config.export.to_params(),
    )
}

/// Token cancelled on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            cancel.cancel();
        }
    });
    token
}

// === Subcommands ===

async fn serve(mut config: FileConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let analysis = build_analysis(&config).await?;
    let exports = Arc::new(build_exports(&config));
    let shutdown = ctrl_c_token();

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    let state = AppState::new(analysis, exports.clone())
        .with_keepalive(Duration::from_secs(config.server.keepalive_secs.max(1)))
        .with_shutdown_token(shutdown);
    lens_presentation::serve(listener, state).await?;

    exports.shutdown().await;
    Ok(())
}

async fn analyze(config: FileConfig, input: RunAnalysisInput, json: bool) -> Result<()> {
    let analysis = build_analysis(&config).await?;
    let token = ctrl_c_token();
    let mut stream = analysis.start(input, &token)?;

    let mut formatter: Box<dyn EventFormatter> = if json {
        Box::new(JsonLinesFormatter)
    } else {
        Box::new(ConsoleFormatter::new())
    };

    let mut stdout = std::io::stdout();
    let mut failure = None;
    let mut finished = false;
    while let Some(event) = stream.next().await {
        if let EventPayload::Error { error } = &event.payload {
            failure = Some(error.clone());
        }
        finished |= event.is_terminal();
        write!(stdout, "{}", formatter.format_event(&event))?;
        stdout.flush()?;
    }
    write!(stdout, "{}", formatter.finish())?;
    stdout.flush()?;

    if let Some(error) = failure {
        bail!("Analysis failed: {error}");
    }
    if !finished {
        bail!("Analysis cancelled");
    }
    Ok(())
}

async fn export(
    config: FileConfig,
    analysis: &Path,
    repo_url: String,
    project_name: Option<String>,
    wait: bool,
) -> Result<()> {
    let analysis_result = load_analysis(analysis)?;
    let mut request = ExportRequest::new(analysis_result, repo_url);
    request.project_name = project_name;

    let queue = build_exports(&config);
    let job_id = queue.submit(request)?;
    info!(job_id = %job_id, "Export submitted");

    let mut progress = if wait {
        ExportProgress::new("Export")
    } else {
        ExportProgress::hidden()
    };
    let outcome = poll_job(&queue, &job_id, &mut progress, ctrl_c_token()).await;
    queue.shutdown().await;

    match outcome? {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(reason) => bail!("Export failed: {reason}"),
    }
}

/// Poll until the job is terminal. The queue lives in this process, so the
/// command always waits; `--wait` only controls the progress display.
async fn poll_job(
    queue: &ExportJobQueue,
    job_id: &JobId,
    progress: &mut ExportProgress,
    token: CancellationToken,
) -> Result<std::result::Result<PathBuf, String>> {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => bail!("Export cancelled"),
            _ = interval.tick() => {}
        }
        let Some(job) = queue.status(job_id) else {
            bail!("Export job {job_id} disappeared");
        };
        progress.update(&job);
        match job.status {
            JobStatus::Succeeded => {
                let path = job
                    .artifact
                    .map(|a| a.path)
                    .ok_or_else(|| anyhow!("Export job {job_id} has no artifact"))?;
                return Ok(Ok(path));
            }
            JobStatus::Failed => {
                return Ok(Err(job.failure.unwrap_or_else(|| "unknown error".to_string())));
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }
}

/// Read an analysis result: either the report object itself, or the output
/// of `analyze --json`, whose `complete` line carries the report as `data`.
fn load_analysis(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => text
            .lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .find_map(|line| {
                serde_json::from_str::<Value>(line)
                    .ok()
                    .filter(|v| v["type"] == "complete")
            })
            .ok_or_else(|| anyhow!("{} holds no analysis result", path.display()))?,
    };

    match value.get("type").and_then(Value::as_str) {
        Some("complete") => value
            .get("data")
            .cloned()
            .ok_or_else(|| anyhow!("{}: complete event without data", path.display())),
        _ => Ok(value),
    }
}
