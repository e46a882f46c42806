//! Warden CLI
//!
//! Serves the admin API and answers authorization questions from the shell.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use warden_cli::commands::{self, Decision};
use warden_cli::{WardenConfig, logging};

/// Warden - role-based access control and admin back-office
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the admin API, seeding an empty store first
    Serve,
    /// Create the permission catalog, roles, and admin account
    Seed,
    /// Print allow or deny for an ability; exits 1 on deny
    Check {
        /// Principal's login email
        #[arg(long)]
        email: String,
        /// Ability to check, e.g. view_any_users
        #[arg(long)]
        ability: String,
    },
    /// Print a principal's roles and effective permissions
    Grants {
        /// Principal's login email
        #[arg(long)]
        email: String,
    },
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = WardenConfig::load_from_process_env(args.config.as_deref())?;
    let engine = commands::open(&config).await?;

    match args.command {
        Command::Serve => {
            commands::serve(engine, &config).await?;
        }
        Command::Seed => {
            let report = commands::seed(&engine, &config).await?;
            println!(
                "seeded: {} permissions, {} roles, {} grants, admin {}",
                report.permissions_created,
                report.roles_created,
                report.grants_added,
                if report.admin_created { "created" } else { "kept" }
            );
        }
        Command::Check { email, ability } => {
            let decision = commands::check(&engine, &email, &ability).await?;
            println!("{decision}");
            if decision == Decision::Deny {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Grants { email } => {
            print!("{}", commands::grants(&engine, &email).await?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
