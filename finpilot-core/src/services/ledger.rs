//! Ledger service - appends expenses to each user's hash chain
//!
//! Every append reads the user's latest record, links the new record to
//! that record's chain anchor and inserts it with the next sequence
//! number. Appends for one user run under a per-user lock; the
//! `UNIQUE(user_id, seq)` constraint catches writers in other processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::logging::{LogEvent, LoggingService};
use super::utc_now;
use crate::config::EditPolicy;
use crate::domain::chain::{self, truncate_to_micros, ChainLink};
use crate::domain::money::format_rupees;
use crate::domain::period::{day_window, start_of_day};
use crate::domain::result::{Error, Result};
use crate::domain::{Expense, ExpenseUpdate, NewExpense};
use crate::ports::Repository;

/// Reason stored on records rehashed by an edit
pub const EDIT_REASON: &str = "edited";

/// A freshly appended expense and the budget alerts it triggered
#[derive(Debug, Clone, Serialize)]
pub struct RecordedExpense {
    pub expense: Expense,
    pub alerts: Vec<String>,
}

pub struct LedgerService {
    repository: Arc<dyn Repository>,
    edit_policy: EditPolicy,
    chain_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    logger: Option<Arc<LoggingService>>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn Repository>, edit_policy: EditPolicy) -> Self {
        Self {
            repository,
            edit_policy,
            chain_locks: Mutex::new(HashMap::new()),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn edit_policy(&self) -> EditPolicy {
        self.edit_policy
    }

    fn chain_lock(&self, user_id: i64) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .chain_locks
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))?;
        Ok(Arc::clone(locks.entry(user_id).or_default()))
    }

    fn report(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            // Logging must never fail a ledger operation
            let _ = logger.log(event);
        }
    }

    /// Append a new expense to the owner's chain
    pub fn create_expense(&self, user_id: i64, new: NewExpense) -> Result<RecordedExpense> {
        let mut new = new;
        new.validate()?;

        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("User {}", user_id)));
        }

        let expense = {
            let lock = self.chain_lock(user_id)?;
            let _guard = lock
                .lock()
                .map_err(|e| Error::database(format!("Chain lock poisoned: {}", e)))?;
            self.append(user_id, new)?
        };

        let alerts = self.budget_alerts(&expense)?;
        self.report(LogEvent::new("expense_recorded").with_user(user_id));

        Ok(RecordedExpense { expense, alerts })
    }

    /// Build and insert the next record; caller holds the user's chain lock
    fn append(&self, user_id: i64, new: NewExpense) -> Result<Expense> {
        let latest = self.repository.latest_expense(user_id)?;
        let link = ChainLink::after(latest.as_ref().map(|e| e.chain_anchor()));
        let seq = latest.as_ref().map(|e| e.seq + 1).unwrap_or(1);

        let now = utc_now();
        let occurred_at = truncate_to_micros(new.occurred_at.unwrap_or(now));
        let id = self.repository.next_expense_id()?;

        let mut expense = Expense {
            id,
            user_id,
            seq,
            amount: new.amount,
            description: new.description.unwrap_or_default(),
            occurred_at,
            category: new.category,
            payment_method: new.payment_method,
            payee: new.payee,
            reference_no: new.reference_no,
            status: new.status,
            digest: String::new(),
            link,
            original_digest: None,
            created_at: now,
            deleted_at: None,
        };
        expense.digest = chain::compute_digest(&expense.digest_input(&expense.link))?;

        self.repository.insert_expense(&expense).map_err(|e| match e {
            Error::Conflict(msg) => Error::conflict(format!(
                "chain position {} for user {} was taken concurrently: {}",
                seq, user_id, msg
            )),
            other => other,
        })?;

        Ok(expense)
    }

    /// Daily and weekly pacing alerts against the category budget
    ///
    /// Daily limit is the monthly limit / 30 over the record's calendar day;
    /// weekly limit is the monthly limit / 4 over the trailing seven days.
    fn budget_alerts(&self, expense: &Expense) -> Result<Vec<String>> {
        let budgets = self
            .repository
            .budgets_for_category(expense.user_id, expense.category)?;
        let budget = match budgets.first() {
            Some(b) => b,
            None => return Ok(Vec::new()),
        };

        let mut alerts = Vec::new();
        let label = expense.category.as_str();

        let day = day_window(expense.date());
        let daily_total = self.category_total(expense, day.start, day.end)?;
        let daily_limit = budget.daily_limit();
        if daily_total > daily_limit {
            alerts.push(format!(
                "Daily Limit Exceeded: You've spent {} on {} today (Limit: {}).",
                format_rupees(daily_total),
                label,
                format_rupees(daily_limit)
            ));
        }

        let week_start = expense.occurred_at - Duration::days(7);
        let week_end = start_of_day(expense.date()) + Duration::days(1);
        let weekly_total = self.category_total(expense, week_start, week_end)?;
        let weekly_limit = budget.weekly_limit();
        if weekly_total > weekly_limit {
            alerts.push(format!(
                "Weekly Threshold: {} spent on {} in last 7 days (Target: {}).",
                format_rupees(weekly_total),
                label,
                format_rupees(weekly_limit)
            ));
        }

        Ok(alerts)
    }

    fn category_total(
        &self,
        expense: &Expense,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Decimal> {
        Ok(self
            .repository
            .expenses_between(expense.user_id, start, end)?
            .iter()
            .filter(|e| e.category == expense.category)
            .map(|e| e.amount)
            .sum())
    }

    pub fn get_expense(&self, user_id: i64, id: i64) -> Result<Expense> {
        self.repository
            .get_expense(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("Expense {}", id)))
    }

    /// Non-deleted expenses, newest first
    pub fn list_expenses(&self, user_id: i64, skip: usize, limit: usize) -> Result<Vec<Expense>> {
        self.repository.list_expenses(user_id, skip, limit)
    }

    /// Apply an edit under the configured policy
    ///
    /// Changes to non-chained fields keep the digest. A change to amount or
    /// description is refused under `Reject`; under `Unlink` the record is
    /// rehashed as unlinked and keeps anchoring its successors at its
    /// pre-edit digest.
    pub fn update_expense(&self, user_id: i64, id: i64, update: ExpenseUpdate) -> Result<Expense> {
        let lock = self.chain_lock(user_id)?;
        let _guard = lock
            .lock()
            .map_err(|e| Error::database(format!("Chain lock poisoned: {}", e)))?;

        let current = self.get_expense(user_id, id)?;
        if update.is_empty() {
            return Ok(current);
        }

        let rehash = update.changes_chained_fields(&current);
        if rehash && self.edit_policy == EditPolicy::Reject {
            return Err(Error::validation(format!(
                "Expense {} is sealed in the ledger: amount and description cannot be edited",
                id
            )));
        }

        let mut updated = update.apply(&current)?;
        if rehash {
            if updated.original_digest.is_none() {
                updated.original_digest = Some(current.digest.clone());
            }
            updated.link = ChainLink::Unlinked(EDIT_REASON.to_string());
            updated.digest = updated.recompute_digest()?;
        }

        self.repository.update_expense(&updated)?;
        if rehash {
            self.report(LogEvent::new("expense_unlinked").with_user(user_id));
        }
        Ok(updated)
    }

    /// Soft delete; the record stays in the chain for auditing
    pub fn delete_expense(&self, user_id: i64, id: i64) -> Result<()> {
        if !self.repository.soft_delete_expense(user_id, id, utc_now())? {
            return Err(Error::not_found(format!("Expense {}", id)));
        }
        self.report(LogEvent::new("expense_deleted").with_user(user_id));
        Ok(())
    }
}
