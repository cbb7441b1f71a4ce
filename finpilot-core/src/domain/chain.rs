//! Ledger hashing - the digest that binds an expense to its predecessor
//!
//! Each expense carries a SHA-256 digest over a canonical JSON rendering of
//! its id, owner, amount, description, timestamp and the link to the
//! previous expense of the same user. Recomputing the digest from stored
//! fields reproduces the stored value unless the record was altered.
//!
//! Canonical form (keys sorted, compact separators):
//!
//! ```text
//! {"amount":"100.5","description":"Lunch","previous_hash":"genesis",
//!  "timestamp":"2025-01-15T10:30:00","transaction_id":1,"user_id":1}
//! ```
//!
//! - `amount` is the normalized decimal text (`100`, not `100.00`)
//! - `timestamp` has a `.ffffff` suffix only when sub-second precision is set
//! - an unlinked record has `"previous_hash":null` and an extra `"unlinked"` key

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::result::{Error, Result};

/// Previous-digest input for the first record of a user
pub const GENESIS: &str = "genesis";

/// Maximum fractional digits an amount may carry
pub const AMOUNT_SCALE: u32 = 2;

/// Largest amount a `DECIMAL(18, 2)` column holds
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_999_999, AMOUNT_SCALE)
}

/// Chain linkage state of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum ChainLink {
    /// First record of the user's chain
    Genesis,
    /// Linked to the digest of the preceding record
    Linked(String),
    /// Rehashed outside the linear chain (e.g. after an edit); holds the reason
    Unlinked(String),
}

impl ChainLink {
    /// Link for a record whose predecessor has the given chain anchor
    pub fn after(previous: Option<&str>) -> Self {
        match previous {
            Some(digest) => ChainLink::Linked(digest.to_string()),
            None => ChainLink::Genesis,
        }
    }

    /// Storage tag
    pub fn kind(&self) -> &'static str {
        match self {
            ChainLink::Genesis => "genesis",
            ChainLink::Linked(_) => "linked",
            ChainLink::Unlinked(_) => "unlinked",
        }
    }

    pub fn previous_digest(&self) -> Option<&str> {
        match self {
            ChainLink::Linked(digest) => Some(digest),
            _ => None,
        }
    }

    pub fn unlink_reason(&self) -> Option<&str> {
        match self {
            ChainLink::Unlinked(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_unlinked(&self) -> bool {
        matches!(self, ChainLink::Unlinked(_))
    }

    /// Rebuild a link from its stored columns
    pub fn from_parts(
        kind: &str,
        previous_digest: Option<String>,
        unlink_reason: Option<String>,
    ) -> Result<Self> {
        match kind {
            "genesis" => Ok(ChainLink::Genesis),
            "linked" => previous_digest
                .map(ChainLink::Linked)
                .ok_or_else(|| Error::database("linked record without previous digest")),
            "unlinked" => Ok(ChainLink::Unlinked(unlink_reason.unwrap_or_default())),
            other => Err(Error::database(format!("unknown link state '{}'", other))),
        }
    }
}

/// Field values bound into a record's digest
#[derive(Debug, Clone)]
pub struct DigestInput<'a> {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub description: &'a str,
    pub timestamp: NaiveDateTime,
    pub link: &'a ChainLink,
}

/// Compute the hex SHA-256 digest of a record
pub fn compute_digest(input: &DigestInput<'_>) -> Result<String> {
    let payload = canonical_payload(input)?;
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Recompute and compare against a stored digest
pub fn verify_digest(stored: &str, input: &DigestInput<'_>) -> Result<bool> {
    Ok(compute_digest(input)? == stored)
}

/// Canonical JSON text hashed by [`compute_digest`]
pub fn canonical_payload(input: &DigestInput<'_>) -> Result<String> {
    let amount = validate_amount(input.amount)?;
    if input.description.contains('\0') {
        return Err(Error::validation("description contains a NUL character"));
    }

    // BTreeMap keeps key order stable whatever serde_json features are enabled
    let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
    fields.insert("transaction_id", Value::from(input.id));
    fields.insert("user_id", Value::from(input.user_id));
    fields.insert("amount", Value::String(amount.to_string()));
    fields.insert("description", Value::String(input.description.to_string()));
    fields.insert("timestamp", Value::String(format_timestamp(input.timestamp)));
    match input.link {
        ChainLink::Genesis => {
            fields.insert("previous_hash", Value::String(GENESIS.to_string()));
        }
        ChainLink::Linked(previous) => {
            fields.insert("previous_hash", Value::String(previous.clone()));
        }
        ChainLink::Unlinked(reason) => {
            fields.insert("previous_hash", Value::Null);
            fields.insert("unlinked", Value::String(reason.clone()));
        }
    }

    Ok(serde_json::to_string(&fields)?)
}

/// Check an amount is positive with at most two decimals; returns it normalized
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if amount > max_amount() {
        return Err(Error::validation(format!(
            "amount {} exceeds the maximum of {}",
            amount,
            max_amount()
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(Error::validation(format!(
            "amount {} has more than {} decimal places",
            amount, AMOUNT_SCALE
        )));
    }
    Ok(normalized)
}

/// Parse user-supplied amount text
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    if lower.contains("nan") || lower.contains("inf") {
        return Err(Error::validation(format!("amount '{}' is not finite", raw)));
    }
    let amount: Decimal = trimmed
        .parse()
        .map_err(|_| Error::validation(format!("invalid amount '{}'", raw)))?;
    validate_amount(amount)
}

/// Canonical timestamp text
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Drop sub-microsecond precision so storage round-trips are exact
pub fn truncate_to_micros(ts: NaiveDateTime) -> NaiveDateTime {
    let micros = ts.nanosecond() / 1_000;
    ts.with_nanosecond(micros * 1_000).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn input<'a>(link: &'a ChainLink, amount: Decimal, description: &'a str) -> DigestInput<'a> {
        DigestInput {
            id: 1,
            user_id: 1,
            amount,
            description,
            timestamp: ts(10, 30, 0),
            link,
        }
    }

    #[test]
    fn test_canonical_payload_is_sorted_and_compact() {
        let link = ChainLink::Genesis;
        let payload = canonical_payload(&input(&link, Decimal::new(10050, 2), "Lunch")).unwrap();
        assert_eq!(
            payload,
            r#"{"amount":"100.5","description":"Lunch","previous_hash":"genesis","timestamp":"2025-01-15T10:30:00","transaction_id":1,"user_id":1}"#
        );
    }

    #[test]
    fn test_known_digest_vector() {
        let link = ChainLink::Genesis;
        let digest = compute_digest(&input(&link, Decimal::new(10050, 2), "Lunch")).unwrap();
        assert_eq!(
            digest,
            "b815fce9d40d38a087a07f4b0dd6dcd05c788e231a1b9587063a0d5a1e1616e8"
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let link = ChainLink::Linked("abc".to_string());
        let a = compute_digest(&input(&link, Decimal::new(200, 0), "")).unwrap();
        let b = compute_digest(&input(&link, Decimal::new(200, 0), "")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_amount_scale_does_not_change_digest() {
        // 100, 100.0 and 100.00 are the same amount
        let link = ChainLink::Genesis;
        let a = compute_digest(&input(&link, Decimal::new(100, 0), "x")).unwrap();
        let b = compute_digest(&input(&link, Decimal::new(10000, 2), "x")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_link_changes_digest() {
        let genesis = ChainLink::Genesis;
        let linked = ChainLink::Linked("genesis2".to_string());
        let unlinked = ChainLink::Unlinked("edited".to_string());
        let a = compute_digest(&input(&genesis, Decimal::ONE, "x")).unwrap();
        let b = compute_digest(&input(&linked, Decimal::ONE, "x")).unwrap();
        let c = compute_digest(&input(&unlinked, Decimal::ONE, "x")).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_unlinked_payload_shape() {
        let link = ChainLink::Unlinked("edited".to_string());
        let payload = canonical_payload(&input(&link, Decimal::ONE, "x")).unwrap();
        assert!(payload.contains(r#""previous_hash":null"#));
        assert!(payload.contains(r#""unlinked":"edited""#));
    }

    #[test]
    fn test_invalid_amounts_rejected() {
        let link = ChainLink::Genesis;
        assert!(compute_digest(&input(&link, Decimal::ZERO, "x")).is_err());
        assert!(compute_digest(&input(&link, Decimal::new(-5, 0), "x")).is_err());
        assert!(compute_digest(&input(&link, Decimal::new(1001, 3), "x")).is_err());
        assert!(compute_digest(&input(&link, Decimal::ONE, "bad\0text")).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 250.50 ").unwrap(), Decimal::new(2505, 1));
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("0").is_err());
    }

    #[test]
    fn test_amount_must_fit_storage() {
        assert_eq!(validate_amount(max_amount()).unwrap(), max_amount());
        let err = parse_amount("10000000000000000").unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(ts(9, 5, 7)), "2025-01-15T09:05:07");

        let precise = ts(9, 5, 7).with_nanosecond(123_456_789).unwrap();
        let truncated = truncate_to_micros(precise);
        assert_eq!(format_timestamp(truncated), "2025-01-15T09:05:07.123456");
    }

    #[test]
    fn test_link_storage_round_trip() {
        let link = ChainLink::from_parts("linked", Some("abc".into()), None).unwrap();
        assert_eq!(link.previous_digest(), Some("abc"));
        assert_eq!(link.kind(), "linked");

        assert!(ChainLink::from_parts("linked", None, None).is_err());
        assert!(ChainLink::from_parts("modified", None, None).is_err());

        let unlinked = ChainLink::from_parts("unlinked", None, Some("edited".into())).unwrap();
        assert_eq!(unlinked.unlink_reason(), Some("edited"));
        assert_eq!(ChainLink::after(None), ChainLink::Genesis);
    }
}
