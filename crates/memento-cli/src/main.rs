//! Memento CLI - photo and voice clip galleries from the terminal
//!
//! Each command mounts the same screens a mobile client would, with the
//! terminal standing in for the camera, the microphone, and the mail app.

mod adapters;
mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;
use memento_core::profile::{Credentials, Registration};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::audio::run_audio;
use crate::commands::auth_cmd::{run_login, run_logout, run_register, run_verify, run_whoami};
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::photos::run_photos;
use crate::commands::sync::run_sync;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "memento=info,memento_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let global_profile = cli.profile.as_deref();

    match cli.command {
        Commands::Config { command } => run_config(command, global_profile)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        command => {
            let context = Context::load(global_profile, cli.db_path)?;
            run_account_command(&context, command).await?;
        }
    }

    Ok(())
}

async fn run_account_command(context: &Context, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            let registration = Registration {
                first_name,
                last_name,
                email,
                password,
            };
            run_register(context, registration).await
        }
        Commands::Login { email, password } => {
            run_login(context, Credentials { email, password }).await
        }
        Commands::Logout => run_logout(context).await,
        Commands::Whoami => run_whoami(context).await,
        Commands::Verify { command } => run_verify(context, command).await,
        Commands::Photos { command } => run_photos(context, command).await,
        Commands::Audio { command } => run_audio(context, command).await,
        Commands::Sync => run_sync(&context.db_path).await,
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}
