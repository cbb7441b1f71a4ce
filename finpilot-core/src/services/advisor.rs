//! Advisor service - spending analysis, month-end forecast and guidance
//!
//! Every entry point has an `_at` variant taking the reference time so the
//! calendar-dependent rules can be exercised deterministically.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::utc_now;
use crate::config::AdvisorSettings;
use crate::domain::money::format_rupees;
use crate::domain::period::{
    fiscal_year_window, is_tax_season, month_window, shift_month, start_of_day,
};
use crate::domain::result::{Error, Result};
use crate::domain::{Category, Expense, User};
use crate::ports::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ok,
    NoData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySpend {
    pub count: usize,
    pub total: Decimal,
}

/// Spending over a trailing window of days
#[derive(Debug, Clone, Serialize)]
pub struct SpendingAnalysis {
    pub status: AnalysisStatus,
    pub period_days: u32,
    pub total_spent: Decimal,
    pub average_daily_spend: Decimal,
    pub category_breakdown: BTreeMap<Category, CategorySpend>,
    pub expense_count: usize,
}

/// Linear month-end projection
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub current_month_spending: Decimal,
    pub predicted_monthly_spending: Decimal,
    pub days_elapsed: u32,
    pub days_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SavingsStatus {
    Surplus,
    Deficit,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySavings {
    pub month: String,
    pub savings: Decimal,
    pub expenses: Decimal,
    pub status: SavingsStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary {
    pub global_budget_limit: Decimal,
    pub total_spent_month: Decimal,
    pub net_savings: Decimal,
    pub savings_history: Vec<MonthlySavings>,
    pub overall_savings: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user_id: i64,
    pub user_name: String,
    pub analysis: SpendingAnalysis,
    pub forecast: Forecast,
    pub recommendations: Vec<String>,
    pub financial_summary: FinancialSummary,
}

/// Months shown in the dashboard savings history, current month first
const HISTORY_MONTHS: i32 = 3;

pub struct AdvisorService {
    repository: Arc<dyn Repository>,
    settings: AdvisorSettings,
}

impl AdvisorService {
    pub fn new(repository: Arc<dyn Repository>, settings: AdvisorSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    fn user(&self, user_id: i64) -> Result<User> {
        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("User {}", user_id)))
    }

    pub fn analyze_spending(&self, user_id: i64, days: u32) -> Result<SpendingAnalysis> {
        self.analyze_spending_at(user_id, days, utc_now())
    }

    pub fn analyze_spending_at(
        &self,
        user_id: i64,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<SpendingAnalysis> {
        self.user(user_id)?;
        if days == 0 {
            return Err(Error::validation("analysis period must be at least one day"));
        }

        let start = now - Duration::days(i64::from(days));
        let end = start_of_day(now.date()) + Duration::days(1);
        let expenses = self.repository.expenses_between(user_id, start, end)?;
        Ok(summarize(&expenses, days))
    }

    pub fn forecast(&self, user_id: i64) -> Result<Forecast> {
        self.forecast_at(user_id, utc_now())
    }

    pub fn forecast_at(&self, user_id: i64, now: NaiveDateTime) -> Result<Forecast> {
        self.user(user_id)?;
        let month = month_window(now.date());
        let total = total_of(&self.repository.expenses_between(user_id, month.start, month.end)?);
        Ok(project(total, now.day(), self.settings.projection_days))
    }

    pub fn recommendations(&self, user_id: i64) -> Result<Vec<String>> {
        self.recommendations_at(user_id, utc_now())
    }

    pub fn recommendations_at(&self, user_id: i64, now: NaiveDateTime) -> Result<Vec<String>> {
        self.user(user_id)?;
        let today = now.date();

        // The current month always sits inside the current fiscal year
        let fiscal = fiscal_year_window(today);
        let month = month_window(today);
        let start = month.start.max(fiscal.start);
        let end = month.end.min(fiscal.end);
        let expenses = self.repository.expenses_between(user_id, start, end)?;
        let budgets = self.repository.list_budgets(user_id)?;

        let mut recommendations = Vec::new();
        if budgets.is_empty() {
            recommendations.push(
                "Compliance Alert: No budgets found. Set up monthly operating budgets for your main spending categories."
                    .to_string(),
            );
        }

        for budget in &budgets {
            let spent: Decimal = expenses
                .iter()
                .filter(|e| e.category == budget.category)
                .map(|e| e.amount)
                .sum();
            let variance = spent - budget.limit;

            if variance > Decimal::ZERO {
                recommendations.push(format!(
                    "Variance Detected: Your '{}' spending ({}) has exceeded the monthly limit ({}) by {}.",
                    budget.category,
                    format_rupees(spent),
                    format_rupees(budget.limit),
                    format_rupees(variance)
                ));
            } else if spent > budget.limit * self.settings.utilization_warning {
                recommendations.push(format!(
                    "High Utilization: You have utilized {}% of your '{}' budget.",
                    (spent / budget.limit * Decimal::from(100)).floor(),
                    budget.category
                ));
            }
        }

        let average_daily = total_of(&expenses) / Decimal::from(now.day());
        if average_daily > self.settings.daily_burn_limit {
            recommendations.push(format!(
                "Cost Control: Your daily average burn rate is high ({}).",
                format_rupees(average_daily)
            ));
        }

        if is_tax_season(today) {
            recommendations.push(
                "Tax Planning: We are approaching fiscal year-end (Mar 31). Ensure 80C and 80D investments are maximized."
                    .to_string(),
            );
        }

        if recommendations.is_empty() {
            recommendations.push(
                "Audit Clean: Books are in order. Spending aligns with projections.".to_string(),
            );
        }

        Ok(recommendations)
    }

    pub fn dashboard(&self, user_id: i64) -> Result<Dashboard> {
        self.dashboard_at(user_id, utc_now())
    }

    pub fn dashboard_at(&self, user_id: i64, now: NaiveDateTime) -> Result<Dashboard> {
        let user = self.user(user_id)?;
        let global_limit = user.monthly_budget.unwrap_or(Decimal::ZERO);
        let today = now.date();

        let mut savings_history = Vec::with_capacity(HISTORY_MONTHS as usize);
        for offset in 0..HISTORY_MONTHS {
            let month = month_window(shift_month(today, -offset));
            let expenses = total_of(&self.repository.expenses_between(user_id, month.start, month.end)?);
            let savings = global_limit - expenses;
            savings_history.push(MonthlySavings {
                month: month.start.format("%b %Y").to_string(),
                savings,
                expenses,
                status: if savings >= Decimal::ZERO {
                    SavingsStatus::Surplus
                } else {
                    SavingsStatus::Deficit
                },
            });
        }

        let total_spent_month = savings_history
            .first()
            .map(|m| m.expenses)
            .unwrap_or(Decimal::ZERO);

        let lifetime_spent: Decimal = self
            .repository
            .chain_expenses(user_id)?
            .iter()
            .filter(|e| !e.is_deleted())
            .map(|e| e.amount)
            .sum();
        let months_active = ((now - user.created_at).num_days() / 30).max(1);
        let overall_savings = global_limit * Decimal::from(months_active) - lifetime_spent;

        Ok(Dashboard {
            user_id,
            user_name: user.display_name().to_string(),
            analysis: self.analyze_spending_at(user_id, 30, now)?,
            forecast: self.forecast_at(user_id, now)?,
            recommendations: self.recommendations_at(user_id, now)?,
            financial_summary: FinancialSummary {
                global_budget_limit: global_limit,
                total_spent_month,
                net_savings: global_limit - total_spent_month,
                savings_history,
                overall_savings,
            },
        })
    }
}

fn total_of(expenses: &[Expense]) -> Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

fn summarize(expenses: &[Expense], days: u32) -> SpendingAnalysis {
    let mut category_breakdown: BTreeMap<Category, CategorySpend> = BTreeMap::new();
    for expense in expenses {
        let entry = category_breakdown.entry(expense.category).or_default();
        entry.count += 1;
        entry.total += expense.amount;
    }

    let total_spent = total_of(expenses);
    SpendingAnalysis {
        status: if expenses.is_empty() {
            AnalysisStatus::NoData
        } else {
            AnalysisStatus::Ok
        },
        period_days: days,
        total_spent,
        average_daily_spend: (total_spent / Decimal::from(days)).round_dp(2),
        category_breakdown,
        expense_count: expenses.len(),
    }
}

fn project(total: Decimal, days_elapsed: u32, projection_days: u32) -> Forecast {
    let predicted = if days_elapsed == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(days_elapsed) * Decimal::from(projection_days)
    };
    Forecast {
        current_month_spending: total,
        predicted_monthly_spending: predicted.round_dp(2),
        days_elapsed,
        days_remaining: projection_days.saturating_sub(days_elapsed),
    }
}
