//! Savings goal service

use std::sync::Arc;

use super::utc_now;
use crate::domain::result::{Error, Result};
use crate::domain::{NewSavingsGoal, SavingsGoal, SavingsGoalUpdate};
use crate::ports::Repository;

pub struct SavingsService {
    repository: Arc<dyn Repository>,
}

impl SavingsService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn create_goal(&self, user_id: i64, new: NewSavingsGoal) -> Result<SavingsGoal> {
        new.validate()?;
        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("User {}", user_id)));
        }
        self.repository.insert_goal(user_id, &new, utc_now())
    }

    pub fn list_goals(&self, user_id: i64) -> Result<Vec<SavingsGoal>> {
        self.repository.list_goals(user_id)
    }

    pub fn get_goal(&self, user_id: i64, id: i64) -> Result<SavingsGoal> {
        self.repository
            .get_goal(user_id, id)?
            .ok_or_else(|| Error::not_found(format!("Savings goal {}", id)))
    }

    pub fn update_goal(&self, user_id: i64, id: i64, update: SavingsGoalUpdate) -> Result<SavingsGoal> {
        let mut goal = self.get_goal(user_id, id)?;
        update.apply(&mut goal)?;
        goal.updated_at = utc_now();
        self.repository.update_goal(&goal)?;
        Ok(goal)
    }

    pub fn delete_goal(&self, user_id: i64, id: i64) -> Result<()> {
        if !self.repository.delete_goal(user_id, id)? {
            return Err(Error::not_found(format!("Savings goal {}", id)));
        }
        Ok(())
    }
}
