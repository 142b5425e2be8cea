pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "bonusbot",
    about = "Bonusbot operator CLI",
    long_about = "Run one-shot salary/bonus lookups, inspect effective configuration, and check spreadsheet readiness.",
    after_help = "Examples:\n  bonusbot lookup administrator current 13102025-9224\n  bonusbot lookup СФУ prev 13102025-9224 --json\n  bonusbot doctor --json\n  bonusbot config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Look up one employee record without a chat session")]
    Lookup {
        #[arg(help = "Role: administrator | field_staff (also admin, sfu, Администратор, СФУ)")]
        role: String,
        #[arg(help = "Period: current | previous (also prev, Настоящий месяц, Предыдущая зарплата)")]
        period: String,
        #[arg(help = "Hire date and personnel number as DDMMYYYY-NNNN")]
        identifier: String,
        #[arg(long, help = "Emit the report as JSON")]
        json: bool,
        #[arg(long, value_name = "PATH", help = "Config file to load instead of bonusbot.toml")]
        config: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and spreadsheet layout")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

/// Diagnostics go to stderr so command output stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Command::Lookup { role, period, identifier, json, config } => {
            commands::lookup::run(&commands::lookup::LookupArgs {
                role,
                period,
                identifier,
                json,
                config_path: config,
            })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
