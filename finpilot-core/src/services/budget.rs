//! Budget service - category limits with current-month spending

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::utc_now;
use crate::domain::period::month_window;
use crate::domain::result::{Error, Result};
use crate::domain::{Budget, BudgetStatus, BudgetUpdate, Expense, NewBudget, User};
use crate::ports::Repository;

pub struct BudgetService {
    repository: Arc<dyn Repository>,
}

impl BudgetService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    fn user(&self, user_id: i64) -> Result<User> {
        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("User {}", user_id)))
    }

    fn month_expenses(&self, user_id: i64, now: NaiveDateTime) -> Result<Vec<Expense>> {
        let month = month_window(now.date());
        self.repository.expenses_between(user_id, month.start, month.end)
    }

    fn status_of(budget: Budget, expenses: &[Expense]) -> BudgetStatus {
        let spent: Decimal = expenses
            .iter()
            .filter(|e| e.category == budget.category)
            .map(|e| e.amount)
            .sum();
        BudgetStatus::new(budget, spent)
    }

    pub fn create_budget(&self, user_id: i64, new: NewBudget) -> Result<BudgetStatus> {
        new.validate()?;
        self.user(user_id)?;
        let now = utc_now();
        let budget = self.repository.insert_budget(user_id, &new, now)?;
        Ok(Self::status_of(budget, &self.month_expenses(user_id, now)?))
    }

    pub fn list_budgets(&self, user_id: i64) -> Result<Vec<BudgetStatus>> {
        self.list_budgets_at(user_id, utc_now())
    }

    pub fn list_budgets_at(&self, user_id: i64, now: NaiveDateTime) -> Result<Vec<BudgetStatus>> {
        self.user(user_id)?;
        let expenses = self.month_expenses(user_id, now)?;
        Ok(self
            .repository
            .list_budgets(user_id)?
            .into_iter()
            .map(|b| Self::status_of(b, &expenses))
            .collect())
    }

    pub fn get_budget(&self, user_id: i64, id: i64) -> Result<BudgetStatus> {
        let budget = self
            .repository
            .get_budget(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("Budget {}", id)))?;
        Ok(Self::status_of(budget, &self.month_expenses(user_id, utc_now())?))
    }

    pub fn update_budget(&self, user_id: i64, id: i64, update: BudgetUpdate) -> Result<BudgetStatus> {
        let mut budget = self
            .repository
            .get_budget(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("Budget {}", id)))?;
        update.apply(&mut budget)?;

        let now = utc_now();
        budget.updated_at = now;
        self.repository.update_budget(&budget)?;
        Ok(Self::status_of(budget, &self.month_expenses(user_id, now)?))
    }

    pub fn delete_budget(&self, user_id: i64, id: i64) -> Result<()> {
        if !self.repository.delete_budget(user_id, id)? {
            return Err(Error::not_found(format!("Budget {}", id)));
        }
        Ok(())
    }

    /// Set or clear the user's global monthly limit
    pub fn set_global_limit(&self, user_id: i64, limit: Option<Decimal>) -> Result<User> {
        if let Some(limit) = limit {
            if limit < Decimal::ZERO {
                return Err(Error::validation(format!(
                    "monthly budget must not be negative, got {}",
                    limit
                )));
            }
        }
        let mut user = self.user(user_id)?;
        user.monthly_budget = limit;
        user.updated_at = utc_now();
        self.repository.update_user(&user)?;
        Ok(user)
    }
}
