//! Command-line interface.

pub mod check;
pub mod completions;
pub mod context;
pub mod deploy;
pub mod init;
pub mod migrate;
pub mod output;
pub mod plan;
pub mod secrets;
pub mod status;
pub mod verify;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::constants;
use crate::core::domain::Purpose;

/// Bullpen - deploy one environment: secrets, image, stack, DNS, then a
/// one-shot database init.
#[derive(Parser)]
#[command(
    name = "bullpen",
    about = "Deploy one environment: secrets, image, stack, DNS, then a one-shot database init",
    version,
    after_help = "Warm up before you pitch."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the deployment description
    #[arg(
        short,
        long,
        global = true,
        env = "BULLPEN_CONFIG",
        default_value = constants::CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Per-invocation overrides of `[project]` settings.
#[derive(Args, Clone, Debug, Default)]
pub struct Overrides {
    /// Target environment
    #[arg(short, long, env = "BULLPEN_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Target region
    #[arg(short, long, env = "BULLPEN_REGION")]
    pub region: Option<String>,

    /// AWS CLI profile
    #[arg(long, env = "BULLPEN_PROFILE")]
    pub profile: Option<String>,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Write a starter bullpen.toml
    Init {
        /// Project name (defaults to the current directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Check tools, credentials and configuration without touching anything
    Check {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show what a deploy would do, read-only
    Plan {
        #[command(flatten)]
        overrides: Overrides,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the full pipeline
    Deploy {
        #[command(flatten)]
        overrides: Overrides,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
        /// Deploy an already-published image instead of building one
        #[arg(long, conflicts_with = "image_tag")]
        image_ref: Option<String>,
        /// Tag for the built image
        #[arg(long, env = "BULLPEN_IMAGE_TAG")]
        image_tag: Option<String>,
        /// Do not run the migration task
        #[arg(long)]
        skip_migration: bool,
        /// Do not run smoke checks
        #[arg(long)]
        skip_verify: bool,
    },

    /// Manage deployment secrets
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Show stack and service state
    Status {
        #[command(flatten)]
        overrides: Overrides,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run only the migration task against the deployed stack
    Migrate {
        #[command(flatten)]
        overrides: Overrides,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run only the smoke checks against the deployed stack
    Verify {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Secret purposes as CLI values.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum PurposeArg {
    SecretKey,
    JwtSecretKey,
    DbPassword,
    AdminPassword,
}

impl From<PurposeArg> for Purpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::SecretKey => Purpose::SigningKey,
            PurposeArg::JwtSecretKey => Purpose::TokenKey,
            PurposeArg::DbPassword => Purpose::DatabasePassword,
            PurposeArg::AdminPassword => Purpose::AdminPassword,
        }
    }
}

/// Secrets subcommands.
#[derive(Subcommand)]
pub enum SecretsAction {
    /// Apply the rotation policy to every secret (or one)
    Ensure {
        #[command(flatten)]
        overrides: Overrides,
        /// Only this purpose
        #[arg(short, long, value_enum)]
        purpose: Option<PurposeArg>,
        /// Write the value of this environment variable when a replacement is needed
        #[arg(long, requires = "purpose")]
        from_env: Option<String>,
    },

    /// List secrets and what the next deploy would do to each
    List {
        #[command(flatten)]
        overrides: Overrides,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute a command.
pub fn execute(cli: Cli) -> crate::error::Result<()> {
    use Command::*;

    let config = cli.config;
    match cli.command {
        Init { name } => init::execute(&config, name),
        Check { overrides } => check::execute(&config, &overrides),
        Plan { overrides, json } => plan::execute(&config, &overrides, json),
        Deploy {
            overrides,
            yes,
            json,
            image_ref,
            image_tag,
            skip_migration,
            skip_verify,
        } => deploy::execute(
            &config,
            &overrides,
            deploy::Flags {
                yes,
                json,
                image_ref,
                image_tag,
                skip_migration,
                skip_verify,
            },
        ),
        Secrets { action } => match action {
            SecretsAction::Ensure {
                overrides,
                purpose,
                from_env,
            } => secrets::ensure(&config, &overrides, purpose.map(Purpose::from), from_env),
            SecretsAction::List { overrides, json } => secrets::list(&config, &overrides, json),
        },
        Status { overrides, json } => status::execute(&config, &overrides, json),
        Migrate { overrides, yes } => migrate::execute(&config, &overrides, yes),
        Verify { overrides } => verify::execute(&config, &overrides),
        Completions { shell } => completions::execute(shell),
    }
}
