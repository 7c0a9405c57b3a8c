pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "brainrelay",
    about = "brainrelay operator CLI",
    long_about = "Apply migrations, check readiness, inspect configuration, and look at stored thread state.",
    after_help = "Examples:\n  brainrelay doctor --json\n  brainrelay config\n  brainrelay thread C0123456789 1700000000.000100"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack and Quivr credentials, and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the stored state of one Slack thread as JSON")]
    Thread {
        #[arg(help = "Channel id, e.g. C0123456789")]
        channel_id: String,
        #[arg(help = "Thread timestamp, e.g. 1700000000.000100")]
        thread_ts: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Thread { channel_id, thread_ts } => {
            commands::thread::run(&channel_id, &thread_ts)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
