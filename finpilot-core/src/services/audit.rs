//! Audit service - chain integrity sweep, anomaly scan and compliance score
//!
//! The integrity sweep replays a user's chain in append order and
//! recomputes every digest. A record whose stored fields no longer
//! reproduce its stored digest is reported as tampered. The running
//! previous value always advances to the stored anchor, so a single
//! altered record never cascades into its successors.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::logging::{LogEvent, LoggingService};
use super::utc_now;
use crate::config::{AuditSettings, EditPolicy};
use crate::domain::chain::{self, ChainLink};
use crate::domain::money::format_rupees;
use crate::domain::period::{month_window, shift_month, start_of_day, Window};
use crate::domain::result::{Error, Result};
use crate::domain::{Category, Expense, StoredExpense};
use crate::ports::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntegrityStatus {
    Stable,
    Compromised,
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityStatus::Stable => f.write_str("Stable"),
            IntegrityStatus::Compromised => f.write_str("Compromised"),
        }
    }
}

/// A record whose stored fields no longer reproduce its digest
#[derive(Debug, Clone, Serialize)]
pub struct TamperedRecord {
    pub id: i64,
    pub seq: i64,
    pub date: NaiveDateTime,
    pub amount: Decimal,
    /// Category text as stored, which may not name a known category
    pub category: String,
    pub description: String,
    pub stored_digest: String,
    pub deleted: bool,
    pub reason: String,
}

/// A self-consistent record deliberately taken out of the linear chain
#[derive(Debug, Clone, Serialize)]
pub struct UnlinkedRecord {
    pub id: i64,
    pub seq: i64,
    pub reason: String,
    pub original_digest: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub total_count: usize,
    pub verified_count: usize,
    pub tampered_records: Vec<TamperedRecord>,
    pub unlinked_records: Vec<UnlinkedRecord>,
}

/// Replay a chain (ordered by seq) and classify every record
///
/// Under [`EditPolicy::Reject`] no edit can unlink a record, so any
/// unlinked row is counted as tampered.
pub fn verify_chain(records: &[StoredExpense], policy: EditPolicy) -> Result<IntegrityReport> {
    let mut verified_count = 0;
    let mut tampered_records = Vec::new();
    let mut unlinked_records = Vec::new();
    let mut previous = ChainLink::Genesis;

    for record in records {
        let (link, mut problem) = match record.link() {
            Ok(link) => (Some(link), None),
            Err(e) => (None, Some(e.to_string())),
        };

        if let Some(link) = &link {
            problem = match link {
                ChainLink::Unlinked(_) if policy == EditPolicy::Reject => {
                    Some("unlinked record while edits are rejected".to_string())
                }
                _ => {
                    let expected = if link.is_unlinked() { link } else { &previous };
                    match chain::compute_digest(&record.digest_input(expected)) {
                        Ok(digest) if digest == record.digest => None,
                        Ok(_) => Some("digest mismatch".to_string()),
                        // A stored amount that no longer validates cannot match any digest
                        Err(e @ Error::Validation(_)) => Some(e.to_string()),
                        Err(e) => return Err(e),
                    }
                }
            };
        }
        if problem.is_none() && Category::canonicalize(&record.category).is_none() {
            problem = Some(format!("unknown category '{}'", record.category));
        }

        match (problem, link) {
            (Some(reason), _) => tampered_records.push(TamperedRecord {
                id: record.id,
                seq: record.seq,
                date: record.occurred_at,
                amount: record.amount,
                category: record.category.clone(),
                description: record.description.clone(),
                stored_digest: record.digest.clone(),
                deleted: record.is_deleted(),
                reason,
            }),
            (None, Some(ChainLink::Unlinked(reason))) => unlinked_records.push(UnlinkedRecord {
                id: record.id,
                seq: record.seq,
                reason,
                original_digest: record.original_digest.clone(),
            }),
            (None, _) => verified_count += 1,
        }

        previous = ChainLink::Linked(record.chain_anchor().to_string());
    }

    let status = if tampered_records.is_empty() {
        IntegrityStatus::Stable
    } else {
        IntegrityStatus::Compromised
    };

    Ok(IntegrityReport {
        status,
        total_count: records.len(),
        verified_count,
        tampered_records,
        unlinked_records,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    #[serde(rename = "Duplicate Entry")]
    DuplicateEntry,
    #[serde(rename = "Spending Outlier")]
    SpendingOutlier,
    #[serde(rename = "Category Shift")]
    CategoryShift,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::DuplicateEntry => f.write_str("Duplicate Entry"),
            AnomalyKind::SpendingOutlier => f.write_str("Spending Outlier"),
            AnomalyKind::CategoryShift => f.write_str("Category Shift"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub details: String,
    pub recommendation: String,
    pub expense_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Same amount, category, calendar date and payee recorded more than once
pub fn find_duplicates(records: &[Expense]) -> Vec<Anomaly> {
    let mut groups: BTreeMap<(Decimal, Category, NaiveDate, Option<String>), Vec<i64>> =
        BTreeMap::new();
    for record in records {
        let key = (
            record.amount.normalize(),
            record.category,
            record.date(),
            record.payee.clone(),
        );
        groups.entry(key).or_default().push(record.id);
    }

    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((amount, _, date, _), ids)| Anomaly {
            kind: AnomalyKind::DuplicateEntry,
            severity: Severity::Medium,
            details: format!(
                "Potential double-posting: {} records for {} found on {}.",
                ids.len(),
                format_rupees(amount),
                date
            ),
            recommendation: "Verify your ledger for manual entry errors.".to_string(),
            count: Some(ids.len()),
            expense_ids: ids,
        })
        .collect()
}

/// Records above `multiplier` times their category mean over the trailing window
pub fn find_outliers(
    records: &[Expense],
    now: NaiveDateTime,
    settings: &AuditSettings,
) -> Vec<Anomaly> {
    let window_start = now - Duration::days(settings.outlier_window_days);
    let mut anomalies = Vec::new();

    for category in categories_in(records) {
        let recent: Vec<Decimal> = records
            .iter()
            .filter(|e| e.category == category && e.occurred_at >= window_start)
            .map(|e| e.amount)
            .collect();
        if recent.is_empty() {
            continue;
        }
        let mean = recent.iter().copied().sum::<Decimal>() / Decimal::from(recent.len());
        if mean <= Decimal::ZERO {
            continue;
        }
        let threshold = mean * settings.outlier_multiplier;

        for record in records
            .iter()
            .filter(|e| e.category == category && e.amount > threshold)
        {
            anomalies.push(Anomaly {
                kind: AnomalyKind::SpendingOutlier,
                severity: Severity::High,
                details: format!(
                    "Significant transaction: {} in {} (Average: {}).",
                    format_rupees(record.amount),
                    category.label(),
                    format_rupees(mean)
                ),
                recommendation: "Confirm this high-value procurement is authorized.".to_string(),
                expense_ids: vec![record.id],
                count: None,
            });
        }
    }

    anomalies
}

/// Month-over-month surge per category
pub fn find_category_shifts(
    records: &[Expense],
    today: NaiveDate,
    settings: &AuditSettings,
) -> Vec<Anomaly> {
    let current = month_window(today);
    let previous = Window::new(start_of_day(shift_month(today, -1)), current.start);
    let mut anomalies = Vec::new();

    for category in categories_in(records) {
        let total_in = |window: &Window| -> Decimal {
            records
                .iter()
                .filter(|e| e.category == category && window.contains(e.occurred_at))
                .map(|e| e.amount)
                .sum()
        };
        let current_total = total_in(&current);
        let previous_total = total_in(&previous);

        if previous_total > settings.surge_min_previous
            && current_total > previous_total * settings.surge_ratio
        {
            let surge = surge_percent(current_total, previous_total).unwrap_or_default();
            anomalies.push(Anomaly {
                kind: AnomalyKind::CategoryShift,
                severity: Severity::Medium,
                details: format!(
                    "Spending in {} has surged by {}% vs last month.",
                    category.label(),
                    surge
                ),
                recommendation: "Investigate surge in category-specific burn rate.".to_string(),
                expense_ids: Vec::new(),
                count: None,
            });
        }
    }

    anomalies
}

fn categories_in(records: &[Expense]) -> Vec<Category> {
    let set: HashSet<Category> = records.iter().map(|e| e.category).collect();
    let mut categories: Vec<Category> = set.into_iter().collect();
    categories.sort();
    categories
}

/// Metadata completeness of a user's records
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub score: u32,
    pub missing_payee_count: usize,
    pub missing_reference_count: usize,
    pub tax_ready: bool,
}

/// Score = 100 - floor(missing fields / (2 * records) * 100), never below 0
pub fn compliance_report(records: &[Expense], threshold: u32) -> ComplianceReport {
    let missing_payee_count = records.iter().filter(|e| e.payee.is_none()).count();
    let missing_reference_count = records.iter().filter(|e| e.reference_no.is_none()).count();

    let score = if records.is_empty() {
        100
    } else {
        let missing = (missing_payee_count + missing_reference_count) as u64;
        let deduction = missing * 100 / (records.len() as u64 * 2);
        100u64.saturating_sub(deduction) as u32
    };

    ComplianceReport {
        score,
        missing_payee_count,
        missing_reference_count,
        tax_ready: score >= threshold,
    }
}

/// Integrity, anomalies and compliance in one report
#[derive(Debug, Clone, Serialize)]
pub struct FullAudit {
    pub user_id: i64,
    pub timestamp: NaiveDateTime,
    pub integrity: IntegrityReport,
    pub anomalies: Vec<Anomaly>,
    pub compliance: ComplianceReport,
}

pub struct AuditService {
    repository: Arc<dyn Repository>,
    settings: AuditSettings,
    edit_policy: EditPolicy,
    logger: Option<Arc<LoggingService>>,
}

impl AuditService {
    pub fn new(
        repository: Arc<dyn Repository>,
        settings: AuditSettings,
        edit_policy: EditPolicy,
    ) -> Self {
        Self {
            repository,
            settings,
            edit_policy,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<LoggingService>>) -> Self {
        self.logger = logger;
        self
    }

    fn ensure_user(&self, user_id: i64) -> Result<()> {
        match self.repository.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("User {}", user_id))),
        }
    }

    /// Live (non-deleted) records in append order
    ///
    /// Rows that no longer parse are left to the integrity sweep.
    fn live_records(&self, user_id: i64) -> Result<Vec<Expense>> {
        Ok(self
            .repository
            .stored_chain(user_id)?
            .into_iter()
            .filter(|e| !e.is_deleted())
            .filter_map(|e| e.into_expense().ok())
            .collect())
    }

    /// Recompute every digest of the user's chain, deleted records included
    pub fn perform_integrity_sweep(&self, user_id: i64) -> Result<IntegrityReport> {
        self.ensure_user(user_id)?;
        let records = self.repository.stored_chain(user_id)?;
        let report = verify_chain(&records, self.edit_policy)?;

        if let Some(logger) = &self.logger {
            let mut event = LogEvent::new("audit_completed").with_user(user_id);
            if report.status == IntegrityStatus::Compromised {
                event = event.with_error(format!(
                    "{} tampered record(s)",
                    report.tampered_records.len()
                ));
            }
            let _ = logger.log(event);
        }

        Ok(report)
    }

    pub fn detect_anomalies(&self, user_id: i64) -> Result<Vec<Anomaly>> {
        self.detect_anomalies_at(user_id, utc_now())
    }

    pub fn detect_anomalies_at(&self, user_id: i64, now: NaiveDateTime) -> Result<Vec<Anomaly>> {
        self.ensure_user(user_id)?;
        let records = self.live_records(user_id)?;

        let mut anomalies = find_duplicates(&records);
        anomalies.extend(find_outliers(&records, now, &self.settings));
        anomalies.extend(find_category_shifts(&records, now.date(), &self.settings));
        Ok(anomalies)
    }

    pub fn check_compliance(&self, user_id: i64) -> Result<ComplianceReport> {
        self.ensure_user(user_id)?;
        let records = self.live_records(user_id)?;
        Ok(compliance_report(&records, self.settings.compliance_threshold))
    }

    pub fn full_audit(&self, user_id: i64) -> Result<FullAudit> {
        let now = utc_now();
        Ok(FullAudit {
            user_id,
            timestamp: now,
            integrity: self.perform_integrity_sweep(user_id)?,
            anomalies: self.detect_anomalies_at(user_id, now)?,
            compliance: self.check_compliance(user_id)?,
        })
    }
}

/// Surge percentage as a whole number, for display
pub fn surge_percent(current: Decimal, previous: Decimal) -> Option<i64> {
    if previous.is_zero() {
        return None;
    }
    ((current / previous - Decimal::ONE) * Decimal::from(100))
        .round()
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpenseStatus, PaymentMethod};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Build a correctly chained sequence of records for user 1
    fn chain_of(amounts: &[i64]) -> Vec<Expense> {
        let mut records: Vec<Expense> = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let link = ChainLink::after(records.last().map(|e| e.chain_anchor()));
            let mut e = record(i as i64 + 1, *amount, Category::Food, ts(2025, 1, 10));
            e.link = link;
            e.digest = e.recompute_digest().unwrap();
            records.push(e);
        }
        records
    }

    fn stored(records: &[Expense]) -> Vec<StoredExpense> {
        records.iter().map(StoredExpense::from).collect()
    }

    fn record(id: i64, amount: i64, category: Category, at: NaiveDateTime) -> Expense {
        Expense {
            id,
            user_id: 1,
            seq: id,
            amount: Decimal::from(amount),
            description: format!("item {}", id),
            occurred_at: at,
            category,
            payment_method: PaymentMethod::Cash,
            payee: None,
            reference_no: None,
            status: ExpenseStatus::Cleared,
            digest: String::new(),
            link: ChainLink::Genesis,
            original_digest: None,
            created_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_clean_chain_is_stable() {
        let records = stored(&chain_of(&[100, 200, 300]));
        let report = verify_chain(&records, EditPolicy::Reject).unwrap();
        assert_eq!(report.status, IntegrityStatus::Stable);
        assert_eq!(report.total_count, 3);
        assert_eq!(report.verified_count, 3);
        assert!(report.tampered_records.is_empty());
    }

    #[test]
    fn test_empty_chain_is_stable() {
        let report = verify_chain(&[], EditPolicy::Reject).unwrap();
        assert_eq!(report.status, IntegrityStatus::Stable);
        assert_eq!(report.total_count, 0);
    }

    #[test]
    fn test_tamper_does_not_cascade() {
        let mut records = stored(&chain_of(&[100, 200, 300]));
        records[1].amount = Decimal::from(9999);

        let report = verify_chain(&records, EditPolicy::Reject).unwrap();
        assert_eq!(report.status, IntegrityStatus::Compromised);
        assert_eq!(report.verified_count, 2);
        assert_eq!(report.tampered_records.len(), 1);
        assert_eq!(report.tampered_records[0].id, 2);
        assert_eq!(report.tampered_records[0].amount, Decimal::from(9999));
        assert_eq!(report.tampered_records[0].reason, "digest mismatch");
    }

    #[test]
    fn test_invalid_stored_amount_counts_as_tampered() {
        let mut records = stored(&chain_of(&[100, 200]));
        records[0].amount = Decimal::from(-5);
        let report = verify_chain(&records, EditPolicy::Reject).unwrap();
        assert_eq!(report.tampered_records.len(), 1);
        assert_eq!(report.verified_count, 1);
    }

    /// Rewrite record 2 as if it had been edited under the unlink policy
    fn unlink_second(records: &mut [Expense], amount: i64) {
        let edited = &mut records[1];
        edited.original_digest = Some(edited.digest.clone());
        edited.amount = Decimal::from(amount);
        edited.link = ChainLink::Unlinked("edited".to_string());
        edited.digest = edited.recompute_digest().unwrap();
    }

    #[test]
    fn test_unlinked_record_reported_separately() {
        let mut records = chain_of(&[100, 200, 300]);
        unlink_second(&mut records, 250);

        let report = verify_chain(&stored(&records), EditPolicy::Unlink).unwrap();
        assert_eq!(report.status, IntegrityStatus::Stable);
        assert_eq!(report.verified_count, 2);
        assert_eq!(report.unlinked_records.len(), 1);
        assert_eq!(report.unlinked_records[0].id, 2);
    }

    #[test]
    fn test_unlinked_record_is_tampered_when_edits_are_rejected() {
        let mut records = chain_of(&[100, 200, 300]);
        unlink_second(&mut records, 9999);

        let report = verify_chain(&stored(&records), EditPolicy::Reject).unwrap();
        assert_eq!(report.status, IntegrityStatus::Compromised);
        assert_eq!(report.verified_count, 2);
        assert!(report.unlinked_records.is_empty());
        assert_eq!(report.tampered_records.len(), 1);
        assert_eq!(report.tampered_records[0].id, 2);
        assert_eq!(report.tampered_records[0].amount, Decimal::from(9999));
    }

    #[test]
    fn test_unparseable_rows_are_tampered() {
        let mut records = stored(&chain_of(&[100, 200, 300, 400]));
        records[1].category = "misc".to_string();
        records[2].link_state = "modified".to_string();

        let report = verify_chain(&records, EditPolicy::Reject).unwrap();
        assert_eq!(report.status, IntegrityStatus::Compromised);
        assert_eq!(report.total_count, 4);
        assert_eq!(report.verified_count, 2);

        let tampered: Vec<i64> = report.tampered_records.iter().map(|r| r.id).collect();
        assert_eq!(tampered, vec![2, 3]);
        assert_eq!(report.tampered_records[0].category, "misc");
        assert!(report.tampered_records[0].reason.contains("misc"));
        assert!(report.tampered_records[1].reason.contains("modified"));
    }

    #[test]
    fn test_duplicates_grouped_by_day_and_payee() {
        let mut a = record(1, 500, Category::Food, ts(2025, 1, 10));
        let mut b = record(2, 500, Category::Food, ts(2025, 1, 10) + Duration::hours(3));
        let c = record(3, 500, Category::Food, ts(2025, 1, 11));
        a.payee = Some("Cafe".to_string());
        b.payee = Some("Cafe".to_string());

        let anomalies = find_duplicates(&[a, b, c]);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::DuplicateEntry);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert_eq!(anomalies[0].count, Some(2));
        assert_eq!(anomalies[0].expense_ids, vec![1, 2]);
    }

    #[test]
    fn test_outlier_detection() {
        let now = ts(2025, 1, 20);
        let mut records: Vec<Expense> = (1..=5)
            .map(|i| record(i, 100, Category::Shopping, ts(2025, 1, i as u32)))
            .collect();
        records.push(record(6, 2000, Category::Shopping, ts(2025, 1, 15)));

        // mean = (500 + 2000) / 6 = 416.67, threshold 1250
        let anomalies = find_outliers(&records, now, &AuditSettings::default());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].expense_ids, vec![6]);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn test_outlier_mean_uses_only_the_trailing_window() {
        let now = ts(2025, 6, 1);
        let mut records: Vec<Expense> = (1..=3)
            .map(|i| record(i, 100, Category::Shopping, ts(2025, 5, i as u32)))
            .collect();
        records.push(record(4, 1000, Category::Shopping, ts(2025, 5, 20)));
        // Older than 90 days: outside the mean, still checked against the threshold
        records.push(record(5, 5000, Category::Shopping, ts(2024, 12, 1)));

        // mean = 1300 / 4 = 325, threshold 975; with record 5 it would be 3780
        let anomalies = find_outliers(&records, now, &AuditSettings::default());
        let flagged: Vec<i64> = anomalies.iter().flat_map(|a| a.expense_ids.clone()).collect();
        assert_eq!(flagged, vec![4, 5]);
        assert!(anomalies[0].details.contains("325"));
    }

    #[test]
    fn test_outliers_skip_category_without_recent_records() {
        let now = ts(2025, 6, 1);
        let records = vec![
            record(1, 100, Category::Health, ts(2024, 1, 1)),
            record(2, 9000, Category::Health, ts(2024, 1, 2)),
        ];
        assert!(find_outliers(&records, now, &AuditSettings::default()).is_empty());
    }

    #[test]
    fn test_category_shift() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let records = vec![
            record(1, 6000, Category::Entertainment, ts(2025, 2, 10)),
            record(2, 9500, Category::Entertainment, ts(2025, 3, 5)),
            record(3, 4000, Category::Food, ts(2025, 2, 10)),
            record(4, 9000, Category::Food, ts(2025, 3, 5)),
        ];

        let anomalies = find_category_shifts(&records, today, &AuditSettings::default());
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].details.contains("Entertainment"));
        assert!(anomalies[0].details.contains("58%"));
    }

    #[test]
    fn test_category_shift_needs_previous_above_minimum() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let settings = AuditSettings::default();

        // Exactly 5000 last month is not enough, however large the surge
        let at_minimum = vec![
            record(1, 5000, Category::Entertainment, ts(2025, 2, 10)),
            record(2, 20000, Category::Entertainment, ts(2025, 3, 5)),
        ];
        assert!(find_category_shifts(&at_minimum, today, &settings).is_empty());

        let mut above = at_minimum.clone();
        above[0].amount = Decimal::new(500001, 2);
        let anomalies = find_category_shifts(&above, today, &settings);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::CategoryShift);
    }

    #[test]
    fn test_category_shift_ratio_is_strict() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let records = vec![
            record(1, 6000, Category::Food, ts(2025, 2, 10)),
            record(2, 9000, Category::Food, ts(2025, 3, 5)),
        ];
        assert!(find_category_shifts(&records, today, &AuditSettings::default()).is_empty());
    }

    #[test]
    fn test_compliance_score() {
        assert_eq!(compliance_report(&[], 90).score, 100);

        let mut full = record(1, 10, Category::Food, ts(2025, 1, 1));
        full.payee = Some("Shop".to_string());
        full.reference_no = Some("R1".to_string());
        let bare = record(2, 10, Category::Food, ts(2025, 1, 1));
        let mut half = record(3, 10, Category::Food, ts(2025, 1, 1));
        half.payee = Some("Shop".to_string());

        // missing = 2 + 1 = 3 of 6 fields -> 50%
        let report = compliance_report(&[full.clone(), bare, half], 90);
        assert_eq!(report.score, 50);
        assert_eq!(report.missing_payee_count, 1);
        assert_eq!(report.missing_reference_count, 2);
        assert!(!report.tax_ready);

        let report = compliance_report(&[full], 90);
        assert_eq!(report.score, 100);
        assert!(report.tax_ready);
    }

    #[test]
    fn test_surge_percent() {
        assert_eq!(surge_percent(Decimal::from(150), Decimal::from(100)), Some(50));
        assert_eq!(surge_percent(Decimal::ONE, Decimal::ZERO), None);
    }
}
