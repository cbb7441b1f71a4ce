//! Expense domain model - the hash-chained financial record

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::{Category, ExpenseStatus, PaymentMethod};
use super::chain::{self, ChainLink, DigestInput};
use super::result::{Error, Result};

/// A single expense, linked into its owner's hash chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    /// Position in the owner's chain, starting at 1
    pub seq: i64,

    // Hash-bound fields
    pub amount: Decimal,
    pub description: String,
    pub occurred_at: NaiveDateTime,

    pub category: Category,
    pub payment_method: PaymentMethod,
    pub payee: Option<String>,
    pub reference_no: Option<String>,
    pub status: ExpenseStatus,

    pub digest: String,
    pub link: ChainLink,
    /// Digest held before the record was first unlinked
    pub original_digest: Option<String>,

    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Expense {
    /// The value successors link to
    ///
    /// An unlinked record keeps anchoring its successors at the digest it
    /// had before the edit, so the rest of the chain still verifies.
    pub fn chain_anchor(&self) -> &str {
        self.original_digest.as_deref().unwrap_or(&self.digest)
    }

    /// Digest input built from the stored fields and the given link
    pub fn digest_input<'a>(&'a self, link: &'a ChainLink) -> DigestInput<'a> {
        DigestInput {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            description: &self.description,
            timestamp: self.occurred_at,
            link,
        }
    }

    /// Recompute the digest against the record's own stored link
    pub fn recompute_digest(&self) -> Result<String> {
        chain::compute_digest(&self.digest_input(&self.link))
    }

    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A ledger row with its text columns left uninterpreted
///
/// The integrity sweep reads the chain in this form so that a row whose
/// category or link state was overwritten in storage is still reported
/// instead of aborting the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredExpense {
    pub id: i64,
    pub user_id: i64,
    pub seq: i64,
    pub amount: Decimal,
    pub description: String,
    pub occurred_at: NaiveDateTime,
    pub category: String,
    pub payment_method: String,
    pub payee: Option<String>,
    pub reference_no: Option<String>,
    pub status: String,
    pub digest: String,
    pub link_state: String,
    pub previous_digest: Option<String>,
    pub unlink_reason: Option<String>,
    pub original_digest: Option<String>,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl StoredExpense {
    pub fn link(&self) -> Result<ChainLink> {
        ChainLink::from_parts(
            &self.link_state,
            self.previous_digest.clone(),
            self.unlink_reason.clone(),
        )
    }

    /// Same anchor rule as [`Expense::chain_anchor`], read from the raw columns
    pub fn chain_anchor(&self) -> &str {
        self.original_digest.as_deref().unwrap_or(&self.digest)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn digest_input<'a>(&'a self, link: &'a ChainLink) -> DigestInput<'a> {
        DigestInput {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            description: &self.description,
            timestamp: self.occurred_at,
            link,
        }
    }

    /// Interpret every column; fails on values no code path writes
    pub fn into_expense(self) -> Result<Expense> {
        Ok(Expense {
            link: self.link()?,
            category: self.category.parse()?,
            payment_method: self.payment_method.parse()?,
            status: self.status.parse()?,
            id: self.id,
            user_id: self.user_id,
            seq: self.seq,
            amount: self.amount,
            description: self.description,
            occurred_at: self.occurred_at,
            payee: self.payee,
            reference_no: self.reference_no,
            digest: self.digest,
            original_digest: self.original_digest,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

impl From<&Expense> for StoredExpense {
    fn from(e: &Expense) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            seq: e.seq,
            amount: e.amount,
            description: e.description.clone(),
            occurred_at: e.occurred_at,
            category: e.category.as_str().to_string(),
            payment_method: e.payment_method.as_str().to_string(),
            payee: e.payee.clone(),
            reference_no: e.reference_no.clone(),
            status: e.status.as_str().to_string(),
            digest: e.digest.clone(),
            link_state: e.link.kind().to_string(),
            previous_digest: e.link.previous_digest().map(str::to_string),
            unlink_reason: e.link.unlink_reason().map(str::to_string),
            original_digest: e.original_digest.clone(),
            created_at: e.created_at,
            deleted_at: e.deleted_at,
        }
    }
}

/// Input for recording a new expense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the current time
    #[serde(default)]
    pub occurred_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub status: ExpenseStatus,
}

impl NewExpense {
    pub fn new(amount: Decimal, category: Category) -> Self {
        Self {
            amount,
            category,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: NaiveDateTime) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn with_reference(mut self, reference_no: impl Into<String>) -> Self {
        self.reference_no = Some(reference_no.into());
        self
    }

    pub fn with_status(mut self, status: ExpenseStatus) -> Self {
        self.status = status;
        self
    }

    /// Validate hash-bound fields and normalize optional text
    pub fn validate(&mut self) -> Result<()> {
        self.amount = chain::validate_amount(self.amount)?;
        if let Some(desc) = &self.description {
            validate_description(desc)?;
        }
        self.payee = blank_to_none(self.payee.take());
        self.reference_no = blank_to_none(self.reference_no.take());
        Ok(())
    }
}

/// Partial update of an expense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub status: Option<ExpenseStatus>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.payment_method.is_none()
            && self.payee.is_none()
            && self.reference_no.is_none()
            && self.status.is_none()
    }

    /// True when the update would change a hash-bound field of `current`
    pub fn changes_chained_fields(&self, current: &Expense) -> bool {
        let amount_changed = self
            .amount
            .map(|a| a.normalize() != current.amount.normalize())
            .unwrap_or(false);
        let description_changed = self
            .description
            .as_ref()
            .map(|d| d != &current.description)
            .unwrap_or(false);
        amount_changed || description_changed
    }

    /// Validate and apply to a copy of the record; the digest is left untouched
    pub fn apply(&self, current: &Expense) -> Result<Expense> {
        let mut updated = current.clone();
        if let Some(amount) = self.amount {
            updated.amount = chain::validate_amount(amount)?;
        }
        if let Some(desc) = &self.description {
            validate_description(desc)?;
            updated.description = desc.clone();
        }
        if let Some(category) = self.category {
            updated.category = category;
        }
        if let Some(method) = self.payment_method {
            updated.payment_method = method;
        }
        if let Some(payee) = &self.payee {
            updated.payee = blank_to_none(Some(payee.clone()));
        }
        if let Some(reference_no) = &self.reference_no {
            updated.reference_no = blank_to_none(Some(reference_no.clone()));
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        Ok(updated)
    }
}

fn validate_description(desc: &str) -> Result<()> {
    if desc.contains('\0') {
        return Err(Error::validation("description contains a NUL character"));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
