//! Chat bot service - turns short text messages into ledger entries
//!
//! Senders are matched to users by the last ten digits of their phone
//! number. A message is either a status query, answered from the advisor
//! figures, or a spending note like "Spent 500 on food", which is
//! recorded through the ledger as a cleared UPI payment.

use std::sync::Arc;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use super::advisor::AdvisorService;
use super::ledger::LedgerService;
use super::utc_now;
use crate::domain::category::capitalize;
use crate::domain::money::format_rupees;
use crate::domain::period::month_window;
use crate::domain::result::{Error, Result};
use crate::domain::user::phone_suffix;
use crate::domain::{Category, ExpenseStatus, NewExpense, PaymentMethod, User};
use crate::ports::Repository;

const AMOUNT_PATTERN: &str = r"(?:₹|rs\s*)?\s*(\d+(?:\.\d{1,2})?)";
const QUERY_KEYWORDS: [&str; 7] = [
    "balance", "status", "how much", "summary", "spent", "limit", "budget",
];
const FILLERS: [&str; 5] = ["spent", "on", "for", "paid", "to"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Record,
    Query,
}

/// Fields pulled out of a spending note
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMessage {
    /// None when no positive amount was found
    pub amount: Option<Decimal>,
    pub category: Category,
    pub description: String,
}

fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| Error::Other(format!("invalid pattern '{}': {}", re, e)))
}

/// Extract amount, category and a cleaned description
pub fn parse_message(text: &str) -> Result<ParsedMessage> {
    let text = text.trim().to_lowercase();

    let amount_match = pattern(AMOUNT_PATTERN)?.captures(&text).and_then(|caps| {
        let whole = caps.get(0)?.as_str().to_string();
        let amount = caps.get(1)?.as_str().parse::<Decimal>().ok()?;
        Some((whole, amount))
    });

    let category = Category::ALL
        .into_iter()
        .find(|c| text.contains(c.as_str()))
        .unwrap_or(Category::Other);

    let mut description = text.clone();
    if let Some((whole, _)) = &amount_match {
        description = description.replace(whole.as_str(), " ");
    }
    description = description.replace(category.as_str(), " ");
    for filler in FILLERS {
        description = pattern(&format!(r"\b{}\b", filler))?
            .replace_all(&description, " ")
            .into_owned();
    }
    let description = description.split_whitespace().collect::<Vec<_>>().join(" ");

    let description = if description.is_empty() {
        format!("WhatsApp Entry: {}", category.label())
    } else {
        capitalize(&description)
    };

    Ok(ParsedMessage {
        amount: amount_match
            .map(|(_, amount)| amount)
            .filter(|a| *a > Decimal::ZERO),
        category,
        description,
    })
}

/// Query keywords win unless the text is a short "spent N ..." note
pub fn detect_intent(text: &str) -> Intent {
    let text = text.trim().to_lowercase();
    let has_number = text.chars().any(|c| c.is_ascii_digit());
    let short_spend_note =
        has_number && text.contains("spent") && text.split_whitespace().count() < 5;

    if QUERY_KEYWORDS.iter().any(|k| text.contains(k)) && !short_spend_note {
        Intent::Query
    } else {
        Intent::Record
    }
}

pub fn welcome_message(full_name: Option<&str>) -> String {
    let name = full_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Navigator");
    format!(
        "*Welcome to FinPilot, {}!*\n\n\
         I am your financial assistant. You can now record expenses or query your budget right here.\n\n\
         Try saying: *'Spent 500 on Food'* or *'How is my budget?'*",
        name
    )
}

/// Wrap a reply in a TwiML messaging response
pub fn render_twiml(reply: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n    <Message>{}</Message>\n</Response>",
        escape_xml(reply)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct BotService {
    repository: Arc<dyn Repository>,
    ledger: Arc<LedgerService>,
    advisor: Arc<AdvisorService>,
}

impl BotService {
    pub fn new(
        repository: Arc<dyn Repository>,
        ledger: Arc<LedgerService>,
        advisor: Arc<AdvisorService>,
    ) -> Self {
        Self {
            repository,
            ledger,
            advisor,
        }
    }

    /// Answer one inbound message
    ///
    /// Problems with the message itself come back as reply text; only
    /// storage failures are returned as errors.
    pub fn process_message(&self, from: &str, body: &str) -> Result<String> {
        let user = match phone_suffix(from) {
            Some(suffix) => self.repository.find_user_by_phone_suffix(&suffix)?,
            None => None,
        };
        let user = match user {
            Some(user) => user,
            None => {
                return Ok("Phone number not recognized. Please update your phone number in FinPilot settings.".to_string())
            }
        };

        if body.trim().is_empty() {
            return Ok(
                "I didn't catch that. Try 'Spent 500 on Food' or 'What is my balance?'.".to_string(),
            );
        }

        match detect_intent(body) {
            Intent::Query => self.status_summary(&user),
            Intent::Record => self.record(&user, body),
        }
    }

    fn status_summary(&self, user: &User) -> Result<String> {
        let now = utc_now();
        let month = month_window(now.date());
        let spent: Decimal = self
            .repository
            .expenses_between(user.id, month.start, month.end)?
            .iter()
            .map(|e| e.amount)
            .sum();
        let global_limit = user.monthly_budget.unwrap_or(Decimal::ZERO);
        let net_savings = global_limit - spent;
        let forecast = self.advisor.forecast_at(user.id, now)?;

        let mut reply = String::from("*Financial Status Update*\n\n");
        reply.push_str(&format!("*Spent this month*: {}\n", format_rupees(spent)));
        reply.push_str(&format!("*Global Budget*: {}\n", format_rupees(global_limit)));
        reply.push_str(&format!("*Net Savings*: {}\n", format_rupees(net_savings)));

        if !forecast.predicted_monthly_spending.is_zero() {
            reply.push_str(&format!(
                "\n*Forecasted Spend*: {}\n",
                format_rupees(forecast.predicted_monthly_spending)
            ));
        }
        if net_savings < Decimal::ZERO {
            reply.push_str(&format!(
                "\n*Warning*: You are {} over your monthly limit!",
                format_rupees(net_savings.abs())
            ));
        }
        Ok(reply)
    }

    fn record(&self, user: &User, body: &str) -> Result<String> {
        let parsed = parse_message(body)?;
        let amount = match parsed.amount {
            Some(amount) => amount,
            None => {
                return Ok("I couldn't identify the amount. Please use a format like '100 for shopping' or ask 'How much have I spent?'.".to_string())
            }
        };

        let new = NewExpense::new(amount, parsed.category)
            .with_description(parsed.description.clone())
            .with_payment_method(PaymentMethod::Upi)
            .with_status(ExpenseStatus::Cleared);

        let recorded = match self.ledger.create_expense(user.id, new) {
            Ok(recorded) => recorded,
            Err(e @ (Error::Validation(_) | Error::Conflict(_))) => {
                return Ok(format!("Error processing transaction: {}", e))
            }
            Err(e) => return Err(e),
        };

        let mut reply = String::from("*Record Created*\n");
        reply.push_str(&format!("Amount: {}\n", format_rupees(recorded.expense.amount)));
        reply.push_str(&format!("Category: {}\n", parsed.category.label()));
        reply.push_str(&format!("Narration: {}", parsed.description));

        if !recorded.alerts.is_empty() {
            reply.push_str("\n\n*Alerts:*");
            for alert in &recorded.alerts {
                reply.push_str(&format!("\n- {}", alert));
            }
        }
        Ok(reply)
    }
}
