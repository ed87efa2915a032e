//! CLI command definitions for the `credsync` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod credential;
pub mod jobs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use credsync_types::credential::CredentialType;

/// Tenant credential vault and sync scheduler.
#[derive(Parser)]
#[command(name = "credsync", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory holding credsync.db and config.toml.
    #[arg(long, global = true, env = "CREDSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base64-encoded 32-byte master key.
    #[arg(long, global = true, env = "MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and the sync scheduler.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate a fresh master key.
    Keygen,

    /// Inspect and revoke tenant credentials.
    #[command(alias = "creds")]
    Credentials {
        #[command(subcommand)]
        action: CredentialCommand,
    },

    /// Show the job catalogue with effective intervals.
    Jobs,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CredentialCommand {
    /// List credential metadata for a tenant.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        tenant: String,
    },

    /// Every stored version of one credential type.
    History {
        #[arg(long)]
        tenant: String,

        /// Credential type (slug or wire name, e.g. email-smtp).
        #[arg(long = "type", value_parser = parse_credential_type)]
        credential_type: CredentialType,
    },

    /// Revoke the active credential of one type.
    #[command(alias = "rm")]
    Revoke {
        #[arg(long)]
        tenant: String,

        /// Credential type (slug or wire name, e.g. email-smtp).
        #[arg(long = "type", value_parser = parse_credential_type)]
        credential_type: CredentialType,
    },
}

fn parse_credential_type(s: &str) -> Result<CredentialType, String> {
    s.parse()
}
