//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

use chrono::{NaiveDateTime, Utc};

use crate::domain::chain::truncate_to_micros;

pub mod advisor;
pub mod audit;
pub mod bot;
mod budget;
pub mod ledger;
pub mod logging;
pub mod migration;
mod savings;
mod user;

pub use advisor::{AdvisorService, Dashboard, Forecast, SpendingAnalysis};
pub use audit::{Anomaly, AuditService, ComplianceReport, FullAudit, IntegrityReport, IntegrityStatus};
pub use bot::{BotService, Intent, ParsedMessage};
pub use budget::BudgetService;
pub use ledger::{LedgerService, RecordedExpense};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LogFilter, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use savings::SavingsService;
pub use user::UserService;

/// Current UTC time at the precision the store keeps
pub(crate) fn utc_now() -> NaiveDateTime {
    truncate_to_micros(Utc::now().naive_utc())
}
