//! User command - register, log in and manage profiles

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Password;
use finpilot_core::domain::{NewUser, User};
use finpilot_core::services::bot::welcome_message;
use finpilot_core::LoggingService;

use super::{get_context, parse_amount_arg, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        /// Phone number used to match chat messages
        #[arg(long)]
        phone: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify credentials
    Login {
        #[arg(long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a user profile
    Show {
        user_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Link a phone number for chat messages
    SetPhone {
        user_id: i64,
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the global monthly spending limit
    SetBudget {
        user_id: i64,
        /// Monthly limit (omit when using --clear)
        amount: Option<String>,
        /// Remove the global limit
        #[arg(long)]
        clear: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn read_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

fn print_user(user: &User) {
    let mut table = output::create_table();
    table.add_row(vec!["ID".to_string(), user.id.to_string()]);
    table.add_row(vec!["Username".to_string(), user.username.clone()]);
    table.add_row(vec!["Email".to_string(), user.email.clone()]);
    table.add_row(vec!["Name".to_string(), user.full_name.clone().unwrap_or_default()]);
    table.add_row(vec!["Phone".to_string(), user.phone_number.clone().unwrap_or_default()]);
    table.add_row(vec![
        "Monthly budget".to_string(),
        user.monthly_budget.map(output::money).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Active".to_string(),
        if user.is_active { "yes" } else { "no" }.to_string(),
    ]);
    println!("{}", table);
}

pub fn run(command: UserCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        UserCommands::Register {
            username,
            email,
            password,
            full_name,
            phone,
            json,
        } => {
            let password = read_password(password, !json)?;
            let user = ctx.users.register(NewUser {
                username,
                email,
                password,
                full_name,
                phone_number: phone,
            })?;

            if json {
                return print_json(&user);
            }
            output::success(&format!("Registered user {} (id {})", user.username, user.id));
            if user.phone_number.is_some() {
                println!();
                println!("{}", welcome_message(user.full_name.as_deref()));
            }
        }
        UserCommands::Login {
            username,
            password,
            json,
        } => {
            let password = read_password(password, false)?;
            let user = ctx.users.login(&username, &password)?;
            if json {
                return print_json(&serde_json::json!({
                    "message": "Login successful",
                    "user_id": user.id,
                    "username": user.username,
                    "email": user.email,
                }));
            }
            output::success(&format!("Welcome back, {}", user.display_name()));
            println!("User id: {}", user.id.to_string().bold());
        }
        UserCommands::Show { user_id, json } => {
            let user = ctx.users.get_user(user_id)?;
            if json {
                return print_json(&user);
            }
            print_user(&user);
        }
        UserCommands::SetPhone {
            user_id,
            phone,
            json,
        } => {
            let user = ctx.users.set_phone(user_id, &phone)?;
            if json {
                return print_json(&user);
            }
            output::success(&format!("Linked {} to {}", phone, user.username));
        }
        UserCommands::SetBudget {
            user_id,
            amount,
            clear,
            json,
        } => {
            let limit = match (amount, clear) {
                (_, true) => None,
                (Some(raw), false) => Some(parse_amount_arg(&raw)?),
                (None, false) => anyhow::bail!("Provide an amount or --clear"),
            };
            let user = ctx.budgets.set_global_limit(user_id, limit)?;
            if json {
                return print_json(&user);
            }
            match user.monthly_budget {
                Some(limit) => output::success(&format!("Monthly limit set to {}", output::money(limit))),
                None => output::info("Monthly limit cleared"),
            }
        }
    }

    Ok(())
}
