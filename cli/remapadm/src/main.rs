// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! remapadm: bulk-reassign Jira and Confluence ownership between users
//!
//! Exit codes: 0 on success; 2 for configuration and input validation
//! failures (missing settings, malformed mapping files, usage errors);
//! 1 for everything else, including the bare invocation that only
//! prints help.

mod commands;
mod config;
mod mapping;
mod output;
mod tracker;

use clap::{CommandFactory as _, Parser, Subcommand};
use config::{ConfigError, Settings};
use mapping::MappingError;
use secrecy::SecretString;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "remapadm",
    version,
    about = "Bulk-reassign Jira issues/filters and Confluence space permissions between users"
)]
struct Cli {
    /// Atlassian site base URL, e.g. https://example.atlassian.net
    #[arg(long, global = true, env = "REMAPADM_BASE_URL")]
    base_url: Option<String>,

    /// Email of the account the API token belongs to
    #[arg(long, global = true, env = "REMAPADM_EMAIL")]
    email: Option<String>,

    /// Atlassian API token
    #[arg(long, global = true, env = "REMAPADM_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Maximum concurrent requests per API (1-20)
    #[arg(
        long,
        global = true,
        env = "REMAPADM_CONCURRENCY",
        default_value_t = 10,
        value_parser = clap::value_parser!(u8).range(1..=20)
    )]
    concurrency: u8,

    /// Debug-level logging for the workspace crates
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify connectivity and credentials against the Jira site
    Check,
    /// Resolve identifiers (emails or accountIds) to users
    Find(commands::find::FindArgs),
    /// Reassign ownership per a CSV mapping of old to new users
    Remap(commands::remap::RemapArgs),
    /// Generate shell completions
    Completion {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // The TLS provider must be installed before any reqwest client is
    // built; a second install attempt (tests, mostly) is harmless.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    };

    let settings = || {
        Settings::new(
            cli.base_url.clone(),
            cli.email.clone(),
            cli.api_token.clone().map(SecretString::from),
            cli.concurrency,
        )
    };

    let outcome = match command {
        Commands::Check => match settings() {
            Ok(settings) => commands::check::run(&settings).await,
            Err(error) => Err(error.into()),
        },
        Commands::Find(args) => match settings() {
            Ok(settings) => commands::find::run(&settings, &args).await,
            Err(error) => Err(error.into()),
        },
        Commands::Remap(args) => match settings() {
            Ok(settings) => commands::remap::run(&settings, &args).await,
            Err(error) => Err(error.into()),
        },
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "remapadm",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            exit_code_for(&error)
        }
    }
}

/// Validation failures get their own exit code so scripted callers can
/// tell "fix your input" from "the run failed".
fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    if error.downcast_ref::<ConfigError>().is_some()
        || error.downcast_ref::<MappingError>().is_some()
    {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,remapadm=debug,jira_client=debug,confluence_client=debug,\
         atlassian_http=debug,atlassian_pagination=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
