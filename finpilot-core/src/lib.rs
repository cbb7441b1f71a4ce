//! FinPilot Core - hash-chained expense ledger and financial advisor
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Expense, Budget, User, etc.)
//! - **ports**: Trait definitions for external dependencies (Repository)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Repository;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{Budget, Category, ChainLink, Expense, NewExpense, SavingsGoal, User};
pub use ports::QueryResult;
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "finpilot.duckdb";

/// Main context for FinPilot operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct FinpilotContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub ledger: Arc<LedgerService>,
    pub audit: AuditService,
    pub advisor: Arc<AdvisorService>,
    pub budgets: BudgetService,
    pub savings: SavingsService,
    pub users: UserService,
    pub bot: BotService,
}

impl FinpilotContext {
    /// Create a context without event logging
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir, None)
    }

    /// Create a context whose services report events to `logger`
    pub fn open(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;
        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        Self::with_repository(config, repository, logger)
    }

    /// Wire services around an already opened repository
    pub fn with_repository(
        config: Config,
        repository: Arc<DuckDbRepository>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        // Initialize schema
        repository.ensure_schema()?;

        let store: Arc<dyn Repository> = repository.clone();
        let ledger = Arc::new(
            LedgerService::new(Arc::clone(&store), config.edit_policy)
                .with_logger(logger.clone()),
        );
        let advisor = Arc::new(AdvisorService::new(
            Arc::clone(&store),
            config.advisor.clone(),
        ));
        let audit = AuditService::new(Arc::clone(&store), config.audit.clone(), config.edit_policy)
            .with_logger(logger);
        let budgets = BudgetService::new(Arc::clone(&store));
        let savings = SavingsService::new(Arc::clone(&store));
        let users = UserService::new(Arc::clone(&store));
        let bot = BotService::new(store, Arc::clone(&ledger), Arc::clone(&advisor));

        Ok(Self {
            config,
            repository,
            ledger,
            audit,
            advisor,
            budgets,
            savings,
            users,
            bot,
        })
    }
}
