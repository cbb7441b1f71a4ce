//! Advisor command - analysis, forecast, recommendations and dashboard

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use finpilot_core::services::advisor::{AnalysisStatus, SavingsStatus};
use finpilot_core::services::{Forecast, SpendingAnalysis};
use finpilot_core::LoggingService;

use super::{get_context, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum AdvisorCommands {
    /// Spending over a trailing window
    Analysis {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value = "30")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Month-end spending projection
    Forecast {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Budget and tax guidance
    Recommendations {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Everything above plus savings history
    Dashboard {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_analysis(analysis: &SpendingAnalysis) {
    if analysis.status == AnalysisStatus::NoData {
        println!("No expenses found in the last {} days.", analysis.period_days);
        return;
    }

    println!(
        "{} ({} days)",
        "Spending Analysis".bold(),
        analysis.period_days
    );
    let mut table = output::create_table();
    table.set_header(vec!["Category", "Count", "Total"]);
    for (category, spend) in &analysis.category_breakdown {
        table.add_row(vec![
            category.label(),
            spend.count.to_string(),
            output::money(spend.total),
        ]);
    }
    println!("{}", table);
    println!(
        "Total: {} across {} expense(s), {} per day",
        output::money(analysis.total_spent),
        analysis.expense_count,
        output::money(analysis.average_daily_spend)
    );
}

fn print_forecast(forecast: &Forecast) {
    println!("{}", "Forecast".bold());
    println!("  Spent this month:  {}", output::money(forecast.current_month_spending));
    println!("  Projected month:   {}", output::money(forecast.predicted_monthly_spending));
    println!(
        "  Days elapsed:      {} ({} remaining)",
        forecast.days_elapsed, forecast.days_remaining
    );
}

fn print_recommendations(recommendations: &[String]) {
    println!("{}", "Recommendations".bold());
    for rec in recommendations {
        println!("  • {}", rec);
    }
}

pub fn run(command: AdvisorCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        AdvisorCommands::Analysis { user, days, json } => {
            let analysis = ctx.advisor.analyze_spending(user, days)?;
            if json {
                return print_json(&serde_json::json!({ "user_id": user, "analysis": analysis }));
            }
            print_analysis(&analysis);
        }
        AdvisorCommands::Forecast { user, json } => {
            let forecast = ctx.advisor.forecast(user)?;
            if json {
                return print_json(&serde_json::json!({ "user_id": user, "forecast": forecast }));
            }
            print_forecast(&forecast);
        }
        AdvisorCommands::Recommendations { user, json } => {
            let recommendations = ctx.advisor.recommendations(user)?;
            if json {
                return print_json(&serde_json::json!({
                    "user_id": user,
                    "recommendations": recommendations
                }));
            }
            print_recommendations(&recommendations);
        }
        AdvisorCommands::Dashboard { user, json } => {
            let dashboard = ctx.advisor.dashboard(user)?;
            if json {
                return print_json(&dashboard);
            }

            let summary = &dashboard.financial_summary;
            println!("{} {}", "Dashboard for".bold(), dashboard.user_name.bold());
            println!();
            println!("  Global budget:   {}", output::money(summary.global_budget_limit));
            println!("  Spent (month):   {}", output::money(summary.total_spent_month));
            println!("  Net savings:     {}", output::money(summary.net_savings));
            println!("  Overall savings: {}", output::money(summary.overall_savings));
            println!();

            let mut table = output::create_table();
            table.set_header(vec!["Month", "Expenses", "Savings", "Status"]);
            for month in &summary.savings_history {
                let status = match month.status {
                    SavingsStatus::Surplus => "Surplus".green().to_string(),
                    SavingsStatus::Deficit => "Deficit".red().to_string(),
                };
                table.add_row(vec![
                    month.month.clone(),
                    output::money(month.expenses),
                    output::money(month.savings),
                    status,
                ]);
            }
            println!("{}", table);
            println!();

            print_analysis(&dashboard.analysis);
            println!();
            print_forecast(&dashboard.forecast);
            println!();
            print_recommendations(&dashboard.recommendations);
        }
    }

    Ok(())
}
