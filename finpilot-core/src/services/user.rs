//! User service - registration, login and profile updates

use std::sync::Arc;

use super::utc_now;
use crate::domain::result::{Error, Result};
use crate::domain::user::{hash_password, phone_suffix};
use crate::domain::{NewUser, User};
use crate::ports::Repository;

pub struct UserService {
    repository: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn register(&self, new: NewUser) -> Result<User> {
        new.validate()?;

        if self
            .repository
            .get_user_by_username(new.username.trim())?
            .is_some()
        {
            return Err(Error::conflict("Username already registered"));
        }
        if let Some(phone) = &new.phone_number {
            check_phone(phone)?;
        }

        let hash = hash_password(&new.password)?;
        self.repository
            .insert_user(&new, &hash, utc_now())
            .map_err(|e| match e {
                // Email uniqueness is enforced by the store
                Error::Conflict(_) => Error::conflict("Username or email already registered"),
                other => other,
            })
    }

    /// Verify credentials; inactive accounts are refused
    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .repository
            .get_user_by_username(username.trim())?
            .filter(|u| u.verify_password(password))
            .ok_or_else(|| Error::auth("Invalid credentials"))?;

        if !user.is_active {
            return Err(Error::auth("User account is inactive"));
        }
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> Result<User> {
        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("User {}", user_id)))
    }

    /// Attach a phone number used to identify chat senders
    pub fn set_phone(&self, user_id: i64, phone: &str) -> Result<User> {
        let suffix = check_phone(phone)?;
        if let Some(owner) = self.repository.find_user_by_phone_suffix(&suffix)? {
            if owner.id != user_id {
                return Err(Error::conflict(format!(
                    "Phone number is already linked to user {}",
                    owner.id
                )));
            }
        }

        let mut user = self.get_user(user_id)?;
        user.phone_number = Some(phone.trim().to_string());
        user.updated_at = utc_now();
        self.repository.update_user(&user)?;
        Ok(user)
    }

    pub fn set_active(&self, user_id: i64, active: bool) -> Result<User> {
        let mut user = self.get_user(user_id)?;
        user.is_active = active;
        user.updated_at = utc_now();
        self.repository.update_user(&user)?;
        Ok(user)
    }
}

fn check_phone(phone: &str) -> Result<String> {
    phone_suffix(phone).ok_or_else(|| {
        Error::validation(format!(
            "phone number '{}' must contain at least 10 digits",
            phone
        ))
    })
}
