//! Budget domain model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::result::{Error, Result};

/// Budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Quarterly => "quarterly",
            BudgetPeriod::Yearly => "yearly",
        }
    }
}

impl Default for BudgetPeriod {
    fn default() -> Self {
        BudgetPeriod::Monthly
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(BudgetPeriod::Monthly),
            "quarterly" => Ok(BudgetPeriod::Quarterly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            _ => Err(Error::validation(format!("Unknown budget period '{}'", s))),
        }
    }
}

/// A per-category spending limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub category: Category,
    pub limit: Decimal,
    pub period: BudgetPeriod,
    pub is_rollover: bool,
    pub start_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Budget {
    /// Limit scaled down to one day of a monthly budget
    pub fn daily_limit(&self) -> Decimal {
        self.limit / Decimal::from(30)
    }

    /// Limit scaled down to one week of a monthly budget
    pub fn weekly_limit(&self) -> Decimal {
        self.limit / Decimal::from(4)
    }
}

/// Budget creation input
///
/// Callers may send the limit as either `limit` or `amount`; both land in
/// the single `limit` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub category: Category,
    #[serde(alias = "amount")]
    pub limit: Decimal,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub is_rollover: bool,
}

impl NewBudget {
    pub fn new(name: impl Into<String>, category: Category, limit: Decimal) -> Self {
        Self {
            name: name.into(),
            category,
            limit,
            period: BudgetPeriod::Monthly,
            is_rollover: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("budget name must not be empty"));
        }
        validate_limit(self.limit)
    }
}

/// Partial budget update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "amount")]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub period: Option<BudgetPeriod>,
    #[serde(default)]
    pub is_rollover: Option<bool>,
}

impl BudgetUpdate {
    pub fn apply(&self, budget: &mut Budget) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::validation("budget name must not be empty"));
            }
            budget.name = name.clone();
        }
        if let Some(limit) = self.limit {
            validate_limit(limit)?;
            budget.limit = limit;
        }
        if let Some(period) = self.period {
            budget.period = period;
        }
        if let Some(is_rollover) = self.is_rollover {
            budget.is_rollover = is_rollover;
        }
        Ok(())
    }
}

/// Budget plus current-month spending
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub budget: Budget,
    /// Read-only mirror of `limit`
    pub amount: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Spent as a percentage of the limit
    pub utilization: Decimal,
}

impl BudgetStatus {
    pub fn new(budget: Budget, spent: Decimal) -> Self {
        let utilization = if budget.limit > Decimal::ZERO {
            (spent / budget.limit * Decimal::from(100)).round_dp(1)
        } else {
            Decimal::ZERO
        };
        Self {
            amount: budget.limit,
            remaining: budget.limit - spent,
            spent,
            utilization,
            budget,
        }
    }

    pub fn is_over(&self) -> bool {
        self.spent > self.budget.limit
    }
}

fn validate_limit(limit: Decimal) -> Result<()> {
    if limit <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "budget limit must be positive, got {}",
            limit
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_alias_on_input() {
        let json = r#"{"name":"Groceries","category":"food","amount":5000}"#;
        let budget: NewBudget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.limit, Decimal::from(5000));
        assert_eq!(budget.period, BudgetPeriod::Monthly);

        let json = r#"{"name":"Groceries","category":"food","limit":"1200.50"}"#;
        let budget: NewBudget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.limit, Decimal::new(120050, 2));
    }

    #[test]
    fn test_update_alias() {
        let update: BudgetUpdate = serde_json::from_str(r#"{"amount": 800}"#).unwrap();
        assert_eq!(update.limit, Some(Decimal::from(800)));
    }

    #[test]
    fn test_validation() {
        assert!(NewBudget::new("", Category::Food, Decimal::ONE).validate().is_err());
        assert!(NewBudget::new("Food", Category::Food, Decimal::ZERO).validate().is_err());
        assert!(NewBudget::new("Food", Category::Food, Decimal::TEN).validate().is_ok());
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("Yearly".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Yearly);
        assert!("weekly".parse::<BudgetPeriod>().is_err());
    }
}
