// crates/github-mcp-cli/src/main.rs
// ============================================================================
// Module: GitHub MCP CLI Entry Point
// Description: Command dispatcher for the GitHub MCP server.
// Purpose: Resolve configuration from file, environment, and flags, then
// serve stdio or HTTP, or print the active tool catalogue.
// Dependencies: clap, github-mcp-config, github-mcp-server, tokio, url.
// ============================================================================

//! ## Overview
//! The `github-mcp-server` binary layers configuration in a fixed order:
//! TOML file, then `GITHUB_*` environment variables, then command-line flags.
//! The subcommand selects the transport. `list-tools` never contacts GitHub
//! and needs no credentials.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use github_mcp_config::GithubMcpConfig;
use github_mcp_config::ServerTransport;
use github_mcp_config::config::split_list;
use github_mcp_contract::ToolDefinition;
use github_mcp_server::McpServer;
use github_mcp_server::active_tool_definitions;
use github_mcp_server::catalogue_from_config;
use github_mcp_server::ungated_sets;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming a config file when `--config` is absent.
const CONFIG_ENV: &str = "GITHUB_MCP_CONFIG";
/// Public GitHub host; its API lives on a separate domain.
const PUBLIC_HOST: &str = "github.com";
/// REST API base for the public host.
const PUBLIC_API_URL: &str = "https://api.github.com";
/// REST API path on GitHub Enterprise Server hosts.
const ENTERPRISE_API_PATH: &str = "api/v3/";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "github-mcp-server", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration overrides shared by every subcommand.
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Flags layered over file and environment configuration.
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// Config file path (defaults to `GITHUB_MCP_CONFIG` when set).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Comma-separated toolsets to enable (`all` enables every set).
    #[arg(long, value_name = "LIST", global = true)]
    toolsets: Option<String>,
    /// Hide and refuse tools that change GitHub state.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    read_only: bool,
    /// Start with toolsets disabled and expose discovery tools.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    dynamic_toolsets: bool,
    /// GitHub host or URL (GitHub Enterprise Server hosts use `/api/v3`).
    #[arg(long, value_name = "HOST", global = true)]
    gh_host: Option<String>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve single-tenant JSON-RPC over stdin/stdout.
    Stdio,
    /// Serve multi-tenant JSON-RPC over HTTP.
    Http(HttpCommand),
    /// Print the active tool definitions as JSON.
    ListTools,
}

/// Configuration for the `http` command.
#[derive(Args, Debug)]
struct HttpCommand {
    /// Socket address to bind (overrides `server.bind`).
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.overrides)?;
    match cli.command {
        Commands::Stdio => {
            config.server.transport = ServerTransport::Stdio;
            command_serve(config).await
        }
        Commands::Http(command) => {
            config.server.transport = ServerTransport::Http;
            if let Some(bind) = command.bind {
                config.server.bind = Some(bind);
            }
            command_serve(config).await
        }
        Commands::ListTools => command_list_tools(&config),
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Loads the file, overlays the environment, and applies flags.
fn load_config(overrides: &ConfigOverrides) -> CliResult<GithubMcpConfig> {
    let path = overrides.config.clone().or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let mut config = match path {
        Some(path) => GithubMcpConfig::load(&path)
            .map_err(|err| CliError::new(format!("failed to load config: {err}")))?,
        None => GithubMcpConfig::default(),
    };
    config
        .apply_env_overrides(|name| std::env::var(name).ok())
        .map_err(|err| CliError::new(format!("invalid environment: {err}")))?;
    apply_overrides(&mut config, overrides)?;
    Ok(config)
}

/// Applies command-line flags on top of loaded configuration.
fn apply_overrides(config: &mut GithubMcpConfig, overrides: &ConfigOverrides) -> CliResult<()> {
    if let Some(toolsets) = &overrides.toolsets {
        config.toolsets.enabled = split_list(toolsets);
    }
    if overrides.read_only {
        config.toolsets.read_only = true;
    }
    if overrides.dynamic_toolsets {
        config.toolsets.dynamic = true;
    }
    if let Some(host) = &overrides.gh_host {
        config.github.api_url = api_url_for_host(host)?;
    }
    Ok(())
}

/// Maps a GitHub host to its REST API base URL.
///
/// `github.com` maps to the public API domain. Any other host is treated as
/// GitHub Enterprise Server and gets the `/api/v3/` path. A bare host name
/// defaults to `https`.
fn api_url_for_host(host: &str) -> CliResult<String> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(CliError::new("--gh-host must not be empty".to_string()));
    }
    let with_scheme =
        if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let mut url = Url::parse(&with_scheme)
        .map_err(|err| CliError::new(format!("invalid --gh-host {trimmed}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::new(format!("--gh-host must use http or https: {trimmed}")));
    }
    let Some(host_name) = url.host_str().map(str::to_ascii_lowercase) else {
        return Err(CliError::new(format!("--gh-host has no host: {trimmed}")));
    };
    if host_name == PUBLIC_HOST || host_name == "api.github.com" {
        return Ok(PUBLIC_API_URL.to_string());
    }
    url.set_path(ENTERPRISE_API_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Builds and runs the server for the selected transport.
async fn command_serve(config: GithubMcpConfig) -> CliResult<ExitCode> {
    let server = McpServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the tool definitions of the configured active view.
fn command_list_tools(config: &GithubMcpConfig) -> CliResult<ExitCode> {
    let catalogue = catalogue_from_config(&config.toolsets)
        .map_err(|err| CliError::new(format!("invalid toolsets: {err}")))?;
    let tools: Vec<ToolDefinition> =
        active_tool_definitions(&catalogue, &ungated_sets(&config.toolsets));
    let rendered = serde_json::to_string_pretty(&tools)
        .map_err(|err| CliError::new(format!("failed to render tools: {err}")))?;
    write_stdout_line(&rendered)
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
