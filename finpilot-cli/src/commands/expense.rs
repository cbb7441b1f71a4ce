//! Expense command - append to and browse a user's ledger

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use finpilot_core::domain::{
    Category, ExpenseStatus, ExpenseUpdate, NewExpense, PaymentMethod,
};
use finpilot_core::{Expense, LoggingService};

use super::{get_context, parse_amount_arg, parse_datetime_arg, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record a new expense
    Add {
        #[arg(long)]
        user: i64,
        /// Amount in rupees, at most two decimals
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "other")]
        category: Category,
        #[arg(long)]
        description: Option<String>,
        /// When it happened (defaults to now)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "cash")]
        method: PaymentMethod,
        #[arg(long)]
        payee: Option<String>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long, default_value = "cleared")]
        status: ExpenseStatus,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List expenses, newest first
    List {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one expense with its chain fields
    Show {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an expense (amount and description follow the edit policy)
    Edit {
        #[arg(long)]
        user: i64,
        id: i64,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        method: Option<PaymentMethod>,
        #[arg(long)]
        payee: Option<String>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        status: Option<ExpenseStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an expense (it stays in the audited chain)
    Delete {
        #[arg(long)]
        user: i64,
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_expenses(expenses: &[Expense]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "#", "Date", "Category", "Amount", "Description", "Payee"]);
    for e in expenses {
        table.add_row(vec![
            e.id.to_string(),
            e.seq.to_string(),
            e.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
            e.category.label(),
            output::money(e.amount),
            e.description.clone(),
            e.payee.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: ExpenseCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        ExpenseCommands::Add {
            user,
            amount,
            category,
            description,
            date,
            method,
            payee,
            reference,
            status,
            json,
        } => {
            let mut new = NewExpense::new(parse_amount_arg(&amount)?, category)
                .with_payment_method(method)
                .with_status(status);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(date) = date {
                new = new.with_occurred_at(parse_datetime_arg(&date)?);
            }
            if let Some(payee) = payee {
                new = new.with_payee(payee);
            }
            if let Some(reference) = reference {
                new = new.with_reference(reference);
            }

            let recorded = ctx.ledger.create_expense(user, new)?;
            if json {
                return print_json(&recorded);
            }

            output::success(&format!(
                "Recorded expense {} ({} on {})",
                recorded.expense.id,
                output::money(recorded.expense.amount),
                recorded.expense.category.label()
            ));
            println!("Digest: {}", recorded.expense.digest.dimmed());
            for alert in &recorded.alerts {
                output::warning(alert);
            }
        }
        ExpenseCommands::List {
            user,
            skip,
            limit,
            json,
        } => {
            let expenses = ctx.ledger.list_expenses(user, skip, limit)?;
            if json {
                return print_json(&expenses);
            }
            if expenses.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }
            print_expenses(&expenses);
        }
        ExpenseCommands::Show { user, id, json } => {
            let expense = ctx.ledger.get_expense(user, id)?;
            if json {
                return print_json(&expense);
            }
            print_expenses(std::slice::from_ref(&expense));
            println!("Chain position: {}", expense.seq);
            println!("Link:           {}", expense.link.kind());
            if let Some(previous) = expense.link.previous_digest() {
                println!("Previous:       {}", output::short_digest(previous));
            }
            if let Some(reason) = expense.link.unlink_reason() {
                println!("Unlinked:       {}", reason.yellow());
            }
            println!("Digest:         {}", expense.digest);
        }
        ExpenseCommands::Edit {
            user,
            id,
            amount,
            category,
            description,
            method,
            payee,
            reference,
            status,
            json,
        } => {
            let update = ExpenseUpdate {
                amount: amount.as_deref().map(parse_amount_arg).transpose()?,
                category,
                description,
                payment_method: method,
                payee,
                reference_no: reference,
                status,
            };
            let expense = ctx.ledger.update_expense(user, id, update)?;
            if json {
                return print_json(&expense);
            }
            output::success(&format!("Updated expense {}", expense.id));
            if expense.link.is_unlinked() {
                output::warning("Amount or description changed: the record is now unlinked from the chain");
            }
        }
        ExpenseCommands::Delete { user, id, json } => {
            ctx.ledger.delete_expense(user, id)?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            output::success(&format!("Deleted expense {}", id));
        }
    }

    Ok(())
}
