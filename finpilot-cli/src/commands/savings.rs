//! Savings command - goals and progress

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use finpilot_core::domain::{NewSavingsGoal, SavingsGoalUpdate};
use finpilot_core::{LoggingService, SavingsGoal};
use rust_decimal::Decimal;

use super::{get_context, parse_amount_arg, parse_datetime_arg, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum SavingsCommands {
    /// Create a savings goal
    Add {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        target: String,
        /// Amount already saved
        #[arg(long)]
        current: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List savings goals
    List {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one goal
    Show {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a goal or record progress
    Edit {
        #[arg(long)]
        user: i64,
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a goal
    Delete {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Saved amounts may be zero, unlike ledger amounts
fn parse_saved(raw: &str) -> Result<Decimal> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid amount '{}'", raw))?;
    Ok(amount)
}

fn print_goals(goals: &[SavingsGoal]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Saved", "Target", "Progress", "Deadline"]);
    for goal in goals {
        table.add_row(vec![
            goal.id.to_string(),
            goal.name.clone(),
            output::money(goal.current_amount),
            output::money(goal.target_amount),
            format!("{}%", goal.progress_percentage()),
            goal.deadline
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: SavingsCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        SavingsCommands::Add {
            user,
            name,
            target,
            current,
            deadline,
            description,
            json,
        } => {
            let goal = ctx.savings.create_goal(
                user,
                NewSavingsGoal {
                    name,
                    target_amount: parse_amount_arg(&target)?,
                    current_amount: current.as_deref().map(parse_saved).transpose()?.unwrap_or_default(),
                    deadline: deadline.as_deref().map(parse_datetime_arg).transpose()?,
                    description,
                },
            )?;
            if json {
                return print_json(&goal);
            }
            output::success(&format!("Created goal {} ({})", goal.id, goal.name));
        }
        SavingsCommands::List { user, json } => {
            let goals = ctx.savings.list_goals(user)?;
            if json {
                return print_json(&goals);
            }
            if goals.is_empty() {
                println!("No savings goals found.");
                return Ok(());
            }
            print_goals(&goals);
        }
        SavingsCommands::Show { user, id, json } => {
            let goal = ctx.savings.get_goal(user, id)?;
            if json {
                return print_json(&goal);
            }
            print_goals(std::slice::from_ref(&goal));
        }
        SavingsCommands::Edit {
            user,
            id,
            name,
            target,
            current,
            deadline,
            description,
            json,
        } => {
            let update = SavingsGoalUpdate {
                name,
                target_amount: target.as_deref().map(parse_amount_arg).transpose()?,
                current_amount: current.as_deref().map(parse_saved).transpose()?,
                deadline: deadline.as_deref().map(parse_datetime_arg).transpose()?,
                description,
            };
            let goal = ctx.savings.update_goal(user, id, update)?;
            if json {
                return print_json(&goal);
            }
            output::success(&format!(
                "Updated goal {} ({}% reached)",
                goal.id,
                goal.progress_percentage()
            ));
        }
        SavingsCommands::Delete { user, id, json } => {
            ctx.savings.delete_goal(user, id)?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            output::success(&format!("Deleted goal {}", id));
        }
    }

    Ok(())
}
