//! CLI command implementations

pub mod advisor;
pub mod audit;
pub mod bot;
pub mod budget;
pub mod expense;
pub mod logs;
pub mod query;
pub mod savings;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use finpilot_core::domain::chain::parse_amount;
use finpilot_core::{EntryPoint, FinpilotContext, LogEvent, LoggingService};
use rust_decimal::Decimal;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Option<LoggingService> {
    let finpilot_dir = get_finpilot_dir().ok()?;
    // Ensure directory exists
    std::fs::create_dir_all(&finpilot_dir).ok()?;
    LoggingService::new(&finpilot_dir, entry_point, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the finpilot directory from environment or default
pub fn get_finpilot_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FINPILOT_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(".finpilot"))
}

/// Open the context; services report events to `logger`
pub fn get_context(logger: &Option<Arc<LoggingService>>) -> Result<FinpilotContext> {
    let finpilot_dir = get_finpilot_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&finpilot_dir)
        .with_context(|| format!("Failed to create finpilot directory: {:?}", finpilot_dir))?;

    FinpilotContext::open(&finpilot_dir, logger.clone())
        .context("Failed to initialize finpilot context")
}

/// Parse an amount argument the way the ledger validates it
pub fn parse_amount_arg(raw: &str) -> Result<Decimal> {
    Ok(parse_amount(raw)?)
}

/// Accept "YYYY-MM-DD" or "YYYY-MM-DD HH:MM[:SS]"
pub fn parse_datetime_arg(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", raw))?;
    Ok(date.and_time(NaiveTime::MIN))
}

/// Print a serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
