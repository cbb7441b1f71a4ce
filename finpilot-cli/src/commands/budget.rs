//! Budget command - category limits and current-month spending

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use finpilot_core::domain::{BudgetPeriod, BudgetStatus, BudgetUpdate, Category, NewBudget};
use finpilot_core::LoggingService;

use super::{get_context, parse_amount_arg, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget for a category
    Add {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: Category,
        /// Monthly limit in rupees
        #[arg(long)]
        limit: String,
        #[arg(long, default_value = "monthly")]
        period: BudgetPeriod,
        #[arg(long)]
        rollover: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List budgets with this month's spending
    List {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one budget
    Show {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a budget
    Edit {
        #[arg(long)]
        user: i64,
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        limit: Option<String>,
        #[arg(long)]
        period: Option<BudgetPeriod>,
        #[arg(long)]
        rollover: Option<bool>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a budget
    Delete {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_budgets(budgets: &[BudgetStatus]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Category", "Limit", "Spent", "Remaining", "Used"]);
    for status in budgets {
        table.add_row(vec![
            status.budget.id.to_string(),
            status.budget.name.clone(),
            status.budget.category.label(),
            output::money(status.budget.limit),
            output::money(status.spent),
            output::money(status.remaining),
            format!("{}%", status.utilization),
        ]);
    }
    println!("{}", table);

    for status in budgets.iter().filter(|s| s.is_over()) {
        output::warning(&format!(
            "{} is over its limit by {}",
            status.budget.name,
            output::money(status.spent - status.budget.limit)
        ));
    }
}

pub fn run(command: BudgetCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        BudgetCommands::Add {
            user,
            name,
            category,
            limit,
            period,
            rollover,
            json,
        } => {
            let mut new = NewBudget::new(name, category, parse_amount_arg(&limit)?);
            new.period = period;
            new.is_rollover = rollover;
            let status = ctx.budgets.create_budget(user, new)?;
            if json {
                return print_json(&status);
            }
            output::success(&format!(
                "Created budget {} for {} ({})",
                status.budget.id,
                status.budget.category.label(),
                output::money(status.budget.limit)
            ));
        }
        BudgetCommands::List { user, json } => {
            let budgets = ctx.budgets.list_budgets(user)?;
            if json {
                return print_json(&budgets);
            }
            if budgets.is_empty() {
                println!("No budgets found.");
                return Ok(());
            }
            print_budgets(&budgets);
        }
        BudgetCommands::Show { user, id, json } => {
            let status = ctx.budgets.get_budget(user, id)?;
            if json {
                return print_json(&status);
            }
            print_budgets(std::slice::from_ref(&status));
        }
        BudgetCommands::Edit {
            user,
            id,
            name,
            limit,
            period,
            rollover,
            json,
        } => {
            let update = BudgetUpdate {
                name,
                limit: limit.as_deref().map(parse_amount_arg).transpose()?,
                period,
                is_rollover: rollover,
            };
            let status = ctx.budgets.update_budget(user, id, update)?;
            if json {
                return print_json(&status);
            }
            output::success(&format!("Updated budget {}", status.budget.id));
        }
        BudgetCommands::Delete { user, id, json } => {
            ctx.budgets.delete_budget(user, id)?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            output::success(&format!("Deleted budget {}", id));
        }
    }

    Ok(())
}
