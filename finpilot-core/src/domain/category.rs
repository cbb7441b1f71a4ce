//! Expense category and related enumerations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Closed set of expense categories
///
/// Budgets and expenses are matched through [`Category::canonicalize`], so a
/// budget created as "Food" and an expense logged as "food " land in the
/// same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Entertainment,
    Health,
    Shopping,
    Education,
    Other,
}

impl Category {
    /// All categories, in keyword-scan order for chat parsing
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Entertainment,
        Category::Health,
        Category::Shopping,
        Category::Education,
        Category::Other,
    ];

    /// Map freeform text onto a category (trimmed, case-insensitive)
    pub fn canonicalize(raw: &str) -> Option<Category> {
        let key = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Utilities => "utilities",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Shopping => "shopping",
            Category::Education => "education",
            Category::Other => "other",
        }
    }

    /// Display label with a leading capital ("Food")
    pub fn label(&self) -> String {
        capitalize(self.as_str())
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::canonicalize(s).ok_or_else(|| Error::validation(format!("Unknown category '{}'", s)))
    }
}

/// How an expense was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(Error::validation(format!("Unknown payment method '{}'", s))),
        }
    }
}

/// Settlement status of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Cleared,
    Pending,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Cleared => "cleared",
            ExpenseStatus::Pending => "pending",
        }
    }
}

impl Default for ExpenseStatus {
    fn default() -> Self {
        ExpenseStatus::Cleared
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cleared" => Ok(ExpenseStatus::Cleared),
            "pending" => Ok(ExpenseStatus::Pending),
            _ => Err(Error::validation(format!("Unknown expense status '{}'", s))),
        }
    }
}

/// Uppercase the first character, lowercase the rest
pub fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(Category::canonicalize("Food"), Some(Category::Food));
        assert_eq!(Category::canonicalize("  TRANSPORT "), Some(Category::Transport));
        assert_eq!(Category::canonicalize("groceries"), None);
    }

    #[test]
    fn test_category_from_str_error() {
        assert!("rent".parse::<Category>().is_err());
        assert_eq!("health".parse::<Category>().unwrap(), Category::Health);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("bank-transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("coffee at cafe"), "Coffee at cafe");
        assert_eq!(capitalize(""), "");
        assert_eq!(Category::Education.label(), "Education");
    }
}
