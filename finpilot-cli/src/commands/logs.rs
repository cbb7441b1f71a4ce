//! Logs command - ledger activity and failures recorded in logs.duckdb

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use finpilot_core::services::{LogEntry, LogFilter};
use finpilot_core::{EntryPoint, LoggingService};

use super::{get_finpilot_dir, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only entries for this user
        #[arg(long)]
        user: Option<i64>,
        /// Only this event, e.g. expense_recorded or audit_completed
        #[arg(long)]
        event: Option<String>,
        /// Show only entries carrying an error
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Integrity sweeps run for a user, with their outcome
    Audits {
        #[arg(long)]
        user: i64,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Event totals and log database location
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete entries older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let dir = get_finpilot_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?)
}

fn when(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn print_entries(entries: &[LogEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Source", "Event", "User", "Command", "Error"]);
    for entry in entries {
        table.add_row(vec![
            when(entry.timestamp),
            entry.entry_point.clone(),
            entry.event.clone(),
            entry.user_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.command.clone().unwrap_or_default(),
            entry
                .error_message
                .as_deref()
                .map(|m| m.red().to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = open_log()?;

    match command {
        LogsCommands::List {
            limit,
            user,
            event,
            errors,
            json,
        } => {
            let entries = service.entries(&LogFilter {
                user_id: user,
                event,
                errors_only: errors,
                limit,
            })?;
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }
            print_entries(&entries);
        }
        LogsCommands::Audits { user, limit, json } => {
            let sweeps = service.entries(&LogFilter {
                user_id: Some(user),
                event: Some("audit_completed".to_string()),
                errors_only: false,
                limit,
            })?;
            if json {
                return print_json(&sweeps);
            }
            if sweeps.is_empty() {
                println!("No integrity sweeps logged for user {}.", user);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Outcome"]);
            for sweep in &sweeps {
                let outcome = match &sweep.error_message {
                    Some(finding) => format!("{} ({})", "Compromised".red(), finding),
                    None => "Stable".green().to_string(),
                };
                table.add_row(vec![when(sweep.timestamp), outcome]);
            }
            println!("{}", table);
        }
        LogsCommands::Stats { json } => {
            let counts = service.event_counts()?;
            let total = service.count()?;
            let db_path = service.db_path().to_path_buf();
            if json {
                return print_json(&serde_json::json!({
                    "total_entries": total,
                    "events": counts,
                    "database_path": db_path.to_string_lossy(),
                }));
            }

            println!("{} {} entries", "Log:".bold(), total);
            println!("  Database: {}", db_path.display());
            if counts.is_empty() {
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Event", "Count", "Errors", "Last seen"]);
            for count in counts {
                table.add_row(vec![
                    count.event,
                    count.total.to_string(),
                    count.errors.to_string(),
                    when(count.last_seen),
                ]);
            }
            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff = Utc::now() - Duration::days(older_than_days);
            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Delete log entries before {}?", cutoff.format("%Y-%m-%d")))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff.timestamp_millis())?;
            if json {
                return print_json(&serde_json::json!({ "deleted": deleted }));
            }
            output::success(&format!("Deleted {} log entries", deleted));
        }
    }

    Ok(())
}
