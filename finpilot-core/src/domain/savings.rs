//! Savings goal domain model

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A target amount the user is saving towards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SavingsGoal {
    /// Progress towards the target, capped at 100
    pub fn progress_percentage(&self) -> Decimal {
        if self.target_amount.is_zero() {
            return Decimal::ZERO;
        }
        let pct = self.current_amount / self.target_amount * Decimal::from(100);
        pct.min(Decimal::from(100)).round_dp(2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavingsGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub current_amount: Decimal,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSavingsGoal {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("goal name must not be empty"));
        }
        validate_amounts(self.target_amount, self.current_amount)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavingsGoalUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_amount: Option<Decimal>,
    #[serde(default)]
    pub current_amount: Option<Decimal>,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SavingsGoalUpdate {
    pub fn apply(&self, goal: &mut SavingsGoal) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::validation("goal name must not be empty"));
            }
            goal.name = name.clone();
        }
        let target = self.target_amount.unwrap_or(goal.target_amount);
        let current = self.current_amount.unwrap_or(goal.current_amount);
        validate_amounts(target, current)?;
        goal.target_amount = target;
        goal.current_amount = current;
        if self.deadline.is_some() {
            goal.deadline = self.deadline;
        }
        if self.description.is_some() {
            goal.description = self.description.clone();
        }
        Ok(())
    }
}

fn validate_amounts(target: Decimal, current: Decimal) -> Result<()> {
    if target <= Decimal::ZERO {
        return Err(Error::validation("target amount must be positive"));
    }
    if current < Decimal::ZERO {
        return Err(Error::validation("current amount must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn goal(target: i64, current: i64) -> SavingsGoal {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SavingsGoal {
            id: 1,
            user_id: 1,
            name: "Laptop".to_string(),
            target_amount: Decimal::from(target),
            current_amount: Decimal::from(current),
            deadline: None,
            description: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_progress_is_capped() {
        assert_eq!(goal(1000, 250).progress_percentage(), Decimal::from(25));
        assert_eq!(goal(1000, 5000).progress_percentage(), Decimal::from(100));
    }

    #[test]
    fn test_update_validation() {
        let mut g = goal(1000, 0);
        let bad = SavingsGoalUpdate {
            current_amount: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert!(bad.apply(&mut g).is_err());

        let ok = SavingsGoalUpdate {
            current_amount: Some(Decimal::from(400)),
            ..Default::default()
        };
        ok.apply(&mut g).unwrap();
        assert_eq!(g.progress_percentage(), Decimal::from(40));
    }
}
