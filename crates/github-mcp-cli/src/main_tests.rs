// crates/github-mcp-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and configuration overrides.
// Purpose: Ensure flags layer over loaded configuration as documented.
// Dependencies: github-mcp-cli main helpers
// ============================================================================

//! ## Overview
//! Validates host mapping, flag overrides, and subcommand parsing.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigOverrides;
use super::GithubMcpConfig;
use super::api_url_for_host;
use super::apply_overrides;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn public_host_maps_to_api_domain() {
    assert_eq!(api_url_for_host("github.com").unwrap(), "https://api.github.com");
    assert_eq!(api_url_for_host("https://GitHub.com/").unwrap(), "https://api.github.com");
}

#[test]
fn enterprise_host_gets_api_v3_path() {
    assert_eq!(
        api_url_for_host("ghe.example.com").unwrap(),
        "https://ghe.example.com/api/v3/"
    );
    assert_eq!(
        api_url_for_host("http://ghe.internal:8443/ignored?x=1").unwrap(),
        "http://ghe.internal:8443/api/v3/"
    );
}

#[test]
fn unusable_hosts_are_rejected() {
    for host in ["", "   ", "ftp://ghe.example.com", "https://"] {
        assert!(api_url_for_host(host).is_err(), "host {host:?} accepted");
    }
}

#[test]
fn flags_override_loaded_configuration() {
    let mut config = GithubMcpConfig::default();
    let overrides = ConfigOverrides {
        toolsets: Some("repos, issues".to_string()),
        read_only: true,
        dynamic_toolsets: true,
        gh_host: Some("ghe.example.com".to_string()),
        ..ConfigOverrides::default()
    };
    apply_overrides(&mut config, &overrides).unwrap();
    assert_eq!(config.toolsets.enabled, vec!["repos".to_string(), "issues".to_string()]);
    assert!(config.toolsets.read_only);
    assert!(config.toolsets.dynamic);
    assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3/");
}

#[test]
fn absent_flags_leave_configuration_untouched() {
    let mut config = GithubMcpConfig::from_toml_str(
        r#"
[toolsets]
enabled = ["users"]
read_only = true
"#,
    )
    .unwrap();
    apply_overrides(&mut config, &ConfigOverrides::default()).unwrap();
    assert_eq!(config.toolsets.enabled, vec!["users".to_string()]);
    assert!(config.toolsets.read_only);
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "github-mcp-server",
        "http",
        "--bind",
        "127.0.0.1:8082",
        "--read-only",
        "--toolsets",
        "repos",
    ])
    .unwrap();
    assert!(cli.overrides.read_only);
    assert_eq!(cli.overrides.toolsets.as_deref(), Some("repos"));
    match cli.command {
        Commands::Http(command) => assert_eq!(command.bind.as_deref(), Some("127.0.0.1:8082")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["github-mcp-server"]).is_err());
    assert!(matches!(
        Cli::try_parse_from(["github-mcp-server", "list-tools"]).unwrap().command,
        Commands::ListTools
    ));
}
