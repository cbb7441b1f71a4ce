//! FinPilot CLI - tamper-evident expense ledger in your terminal

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use finpilot_core::{EntryPoint, LogEvent, LoggingService};

mod commands;
mod output;

use commands::{advisor, audit, bot, budget, expense, logs, query, savings, user};

/// FinPilot - hash-chained expense ledger and financial advisor
#[derive(Parser)]
#[command(name = "fp", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register users and manage profiles
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Record, list, edit and delete expenses
    Expense {
        #[command(subcommand)]
        command: expense::ExpenseCommands,
    },

    /// Manage category budgets
    Budget {
        #[command(subcommand)]
        command: budget::BudgetCommands,
    },

    /// Manage savings goals
    Savings {
        #[command(subcommand)]
        command: savings::SavingsCommands,
    },

    /// Spending analysis, forecast and recommendations
    Advisor {
        #[command(subcommand)]
        command: advisor::AdvisorCommands,
    },

    /// Verify the ledger and scan for anomalies
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommands,
    },

    /// Chat bot message handling
    Bot {
        #[command(subcommand)]
        command: bot::BotCommands,
    },

    /// Execute a read-only SQL query against the database
    Query {
        /// SQL query to execute
        sql: Option<String>,
        /// Read SQL from file
        #[arg(short, long)]
        file: Option<std::path::PathBuf>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: String,
        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Chat messages are logged as webhook traffic
    fn entry_point(&self) -> EntryPoint {
        match self {
            Commands::Bot {
                command: bot::BotCommands::Message { .. },
            } => EntryPoint::Webhook,
            _ => EntryPoint::Cli,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Commands::User { .. } => "user",
            Commands::Expense { .. } => "expense",
            Commands::Budget { .. } => "budget",
            Commands::Savings { .. } => "savings",
            Commands::Advisor { .. } => "advisor",
            Commands::Audit { .. } => "audit",
            Commands::Bot { .. } => "bot",
            Commands::Query { .. } => "query",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The logs command opens the log database itself
    let logger = match &cli.command {
        Commands::Logs { .. } => None,
        command => commands::get_logger(command.entry_point()).map(Arc::new),
    };
    let name = cli.command.name();
    commands::log_event(&logger, LogEvent::new("command_executed").with_command(name));

    let result = run(cli, &logger);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:?}", e)),
            );
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    match cli.command {
        Commands::User { command } => user::run(command, logger),
        Commands::Expense { command } => expense::run(command, logger),
        Commands::Budget { command } => budget::run(command, logger),
        Commands::Savings { command } => savings::run(command, logger),
        Commands::Advisor { command } => advisor::run(command, logger),
        Commands::Audit { command } => audit::run(command, logger),
        Commands::Bot { command } => bot::run(command, logger),
        Commands::Query { sql, file, format, json } => {
            let fmt = if json { "json".to_string() } else { format };
            query::run(sql.as_deref(), file.as_deref(), &fmt, logger)
        }
        Commands::Logs { command } => logs::run(command),
    }
}
