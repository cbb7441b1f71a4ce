//! Integration tests for finpilot-core services
//!
//! These tests exercise the ledger, auditor and advisor against a real
//! DuckDB file in a temporary directory.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempfile::TempDir;

use finpilot_core::adapters::duckdb::DuckDbRepository;
use finpilot_core::config::{Config, EditPolicy};
use finpilot_core::domain::{
    BudgetUpdate, Category, ChainLink, ExpenseUpdate, NewBudget, NewExpense, NewSavingsGoal,
    NewUser, PaymentMethod, SavingsGoalUpdate, User,
};
use finpilot_core::ports::Repository;
use finpilot_core::services::audit::AnomalyKind;
use finpilot_core::services::IntegrityStatus;
use finpilot_core::{Error, FinpilotContext};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a context backed by a fresh database file
fn create_test_context(temp_dir: &TempDir, policy: EditPolicy) -> FinpilotContext {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    let config = Config::default().with_edit_policy(policy);
    FinpilotContext::with_repository(config, Arc::new(repo), None)
        .expect("Failed to create context")
}

fn register(ctx: &FinpilotContext, username: &str) -> User {
    ctx.users
        .register(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "hunter22".to_string(),
            full_name: None,
            phone_number: None,
        })
        .expect("Failed to register user")
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn record(ctx: &FinpilotContext, user_id: i64, amount: i64, category: Category) -> i64 {
    ctx.ledger
        .create_expense(
            user_id,
            NewExpense::new(Decimal::from(amount), category)
                .with_description(format!("{} spend", category)),
        )
        .expect("Failed to record expense")
        .expense
        .id
}

// ============================================================================
// Chain building and integrity
// ============================================================================

#[test]
fn test_clean_chain_audits_stable() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    for amount in [100, 200, 300] {
        record(&ctx, user.id, amount, Category::Food);
    }

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Stable);
    assert_eq!(report.total_count, 3);
    assert_eq!(report.verified_count, 3);
    assert!(report.tampered_records.is_empty());
}

#[test]
fn test_chain_links_each_record_to_its_predecessor() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    record(&ctx, user.id, 200, Category::Transport);

    let chain = ctx.repository.chain_expenses(user.id).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].seq, 1);
    assert_eq!(chain[0].link, ChainLink::Genesis);
    assert_eq!(chain[1].seq, 2);
    assert_eq!(chain[1].link, ChainLink::Linked(chain[0].digest.clone()));
    assert_eq!(chain[0].digest.len(), 64);
}

#[test]
fn test_tampered_amount_is_detected_without_cascade() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    let second = record(&ctx, user.id, 200, Category::Food);
    record(&ctx, user.id, 300, Category::Food);

    // Bypass the service layer and rewrite the stored amount directly
    ctx.repository
        .execute_sql(&format!(
            "UPDATE expenses SET amount = 9999 WHERE id = {}",
            second
        ))
        .unwrap();

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Compromised);
    assert_eq!(report.total_count, 3);
    assert_eq!(report.verified_count, 2);
    assert_eq!(report.tampered_records.len(), 1);
    assert_eq!(report.tampered_records[0].id, second);
    assert_eq!(report.tampered_records[0].amount, Decimal::from(9999));
}

#[test]
fn test_users_have_independent_chains() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let asha = register(&ctx, "asha");
    let ravi = register(&ctx, "ravi");

    let tampered = record(&ctx, asha.id, 100, Category::Food);
    record(&ctx, ravi.id, 100, Category::Food);
    record(&ctx, asha.id, 50, Category::Health);
    record(&ctx, ravi.id, 75, Category::Health);

    let ravi_chain = ctx.repository.chain_expenses(ravi.id).unwrap();
    assert_eq!(ravi_chain[0].seq, 1);
    assert_eq!(ravi_chain[0].link, ChainLink::Genesis);

    ctx.repository
        .execute_sql(&format!(
            "UPDATE expenses SET description = 'forged' WHERE id = {}",
            tampered
        ))
        .unwrap();

    let asha_report = ctx.audit.perform_integrity_sweep(asha.id).unwrap();
    let ravi_report = ctx.audit.perform_integrity_sweep(ravi.id).unwrap();
    assert_eq!(asha_report.status, IntegrityStatus::Compromised);
    assert_eq!(ravi_report.status, IntegrityStatus::Stable);
    assert_eq!(ravi_report.verified_count, 2);
}

#[test]
fn test_unreadable_columns_are_reported_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    let recategorized = record(&ctx, user.id, 200, Category::Food);
    let relinked = record(&ctx, user.id, 300, Category::Food);
    record(&ctx, user.id, 400, Category::Food);

    ctx.repository
        .execute_sql(&format!(
            "UPDATE expenses SET category = 'misc' WHERE id = {}",
            recategorized
        ))
        .unwrap();
    ctx.repository
        .execute_sql(&format!(
            "UPDATE expenses SET link_state = 'modified' WHERE id = {}",
            relinked
        ))
        .unwrap();

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Compromised);
    assert_eq!(report.total_count, 4);
    assert_eq!(report.verified_count, 2);
    let ids: Vec<i64> = report.tampered_records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![recategorized, relinked]);
    assert_eq!(report.tampered_records[0].category, "misc");

    // The remaining checks run over the rows that still parse
    let audit = ctx.audit.full_audit(user.id).unwrap();
    assert_eq!(audit.integrity.status, IntegrityStatus::Compromised);
    assert_eq!(audit.compliance.missing_payee_count, 2);
}

#[test]
fn test_forged_unlinked_record_is_tampered_under_reject() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    let forged_id = record(&ctx, user.id, 200, Category::Food);
    record(&ctx, user.id, 300, Category::Food);

    // Self-consistent rewrite that keeps successors anchored
    let mut forged = ctx.ledger.get_expense(user.id, forged_id).unwrap();
    forged.original_digest = Some(forged.digest.clone());
    forged.amount = Decimal::from(9999);
    forged.link = ChainLink::Unlinked("edited".to_string());
    forged.digest = forged.recompute_digest().unwrap();
    ctx.repository.update_expense(&forged).unwrap();

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Compromised);
    assert_eq!(report.verified_count, 2);
    assert!(report.unlinked_records.is_empty());
    assert_eq!(report.tampered_records.len(), 1);
    assert_eq!(report.tampered_records[0].id, forged_id);
    assert_eq!(report.tampered_records[0].amount, Decimal::from(9999));
}

#[test]
fn test_unknown_user_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);

    let err = ctx
        .ledger
        .create_expense(42, NewExpense::new(Decimal::TEN, Category::Food))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(matches!(
        ctx.audit.perform_integrity_sweep(42).unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_invalid_amount_is_rejected_before_append() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    let too_large = Decimal::new(10_000_000_000_000_000, 0);
    for bad in [Decimal::ZERO, Decimal::from(-5), Decimal::new(1005, 3), too_large] {
        let err = ctx
            .ledger
            .create_expense(user.id, NewExpense::new(bad, Category::Food))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
    assert!(ctx.repository.chain_expenses(user.id).unwrap().is_empty());
}

// ============================================================================
// Edit policies and soft delete
// ============================================================================

#[test]
fn test_reject_policy_refuses_chained_edits() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");
    let id = record(&ctx, user.id, 100, Category::Food);

    let err = ctx
        .ledger
        .update_expense(
            user.id,
            id,
            ExpenseUpdate {
                amount: Some(Decimal::from(150)),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Fields outside the digest stay editable
    let updated = ctx
        .ledger
        .update_expense(
            user.id,
            id,
            ExpenseUpdate {
                payee: Some("Corner Cafe".to_string()),
                payment_method: Some(PaymentMethod::Card),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.payee.as_deref(), Some("Corner Cafe"));

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Stable);
    assert_eq!(report.verified_count, 1);
}

#[test]
fn test_unlink_policy_keeps_successors_verified() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Unlink);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    let edited = record(&ctx, user.id, 200, Category::Food);
    record(&ctx, user.id, 300, Category::Food);

    let updated = ctx
        .ledger
        .update_expense(
            user.id,
            edited,
            ExpenseUpdate {
                amount: Some(Decimal::from(250)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(updated.link.is_unlinked());
    assert!(updated.original_digest.is_some());

    // A second edit keeps the first anchor
    let again = ctx
        .ledger
        .update_expense(
            user.id,
            edited,
            ExpenseUpdate {
                description: Some("Team lunch".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(again.original_digest, updated.original_digest);

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Stable);
    assert_eq!(report.verified_count, 2);
    assert_eq!(report.unlinked_records.len(), 1);
    assert_eq!(report.unlinked_records[0].id, edited);

    // New appends still chain after the latest record
    record(&ctx, user.id, 400, Category::Food);
    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.verified_count, 3);
}

#[test]
fn test_soft_deleted_records_stay_audited() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    record(&ctx, user.id, 100, Category::Food);
    let deleted = record(&ctx, user.id, 200, Category::Food);
    record(&ctx, user.id, 300, Category::Food);

    ctx.ledger.delete_expense(user.id, deleted).unwrap();
    assert!(matches!(
        ctx.ledger.delete_expense(user.id, deleted).unwrap_err(),
        Error::NotFound(_)
    ));

    let listed = ctx.ledger.list_expenses(user.id, 0, 50).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|e| e.id != deleted));

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Stable);
    assert_eq!(report.total_count, 3);
    assert_eq!(report.verified_count, 3);

    ctx.repository
        .execute_sql(&format!(
            "UPDATE expenses SET amount = 1 WHERE id = {}",
            deleted
        ))
        .unwrap();
    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Compromised);
    assert!(report.tampered_records[0].deleted);
}

// ============================================================================
// Anomalies and compliance
// ============================================================================

#[test]
fn test_duplicate_entries_are_flagged() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    let when = at(2025, 5, 10, 9);
    for hour_offset in 0..2 {
        ctx.ledger
            .create_expense(
                user.id,
                NewExpense::new(Decimal::from(450), Category::Food)
                    .with_payee("Corner Cafe")
                    .with_occurred_at(when + chrono::Duration::hours(hour_offset)),
            )
            .unwrap();
    }

    let anomalies = ctx.audit.detect_anomalies_at(user.id, at(2025, 5, 12, 9)).unwrap();
    let duplicates: Vec<_> = anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::DuplicateEntry)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].count, Some(2));
    assert!(duplicates[0].details.contains("2025-05-10"));
}

#[test]
fn test_compliance_counts_missing_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    assert_eq!(ctx.audit.check_compliance(user.id).unwrap().score, 100);

    ctx.ledger
        .create_expense(
            user.id,
            NewExpense::new(Decimal::from(100), Category::Utilities)
                .with_payee("Power Co")
                .with_reference("INV-1"),
        )
        .unwrap();
    record(&ctx, user.id, 50, Category::Food);

    let compliance = ctx.audit.check_compliance(user.id).unwrap();
    assert_eq!(compliance.missing_payee_count, 1);
    assert_eq!(compliance.missing_reference_count, 1);
    assert_eq!(compliance.score, 50);
    assert!(!compliance.tax_ready);

    let full = ctx.audit.full_audit(user.id).unwrap();
    assert_eq!(full.user_id, user.id);
    assert_eq!(full.integrity.status, IntegrityStatus::Stable);
    assert_eq!(full.compliance.score, 50);
}

// ============================================================================
// Budgets, alerts and advisor
// ============================================================================

#[test]
fn test_budget_alerts_on_append() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    // Daily limit 100, weekly limit 750
    ctx.budgets
        .create_budget(
            user.id,
            NewBudget::new("Groceries", Category::Food, Decimal::from(3000)),
        )
        .unwrap();

    let quiet = ctx
        .ledger
        .create_expense(user.id, NewExpense::new(Decimal::from(80), Category::Food))
        .unwrap();
    assert!(quiet.alerts.is_empty());

    let loud = ctx
        .ledger
        .create_expense(user.id, NewExpense::new(Decimal::from(700), Category::Food))
        .unwrap();
    assert_eq!(loud.alerts.len(), 2);
    assert!(loud.alerts[0].starts_with("Daily Limit Exceeded"));
    assert!(loud.alerts[0].contains("₹780.00"));
    assert!(loud.alerts[1].starts_with("Weekly Threshold"));

    // Other categories are unaffected
    let other = ctx
        .ledger
        .create_expense(user.id, NewExpense::new(Decimal::from(900), Category::Shopping))
        .unwrap();
    assert!(other.alerts.is_empty());
}

#[test]
fn test_budget_crud_reports_spending() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    let created = ctx
        .budgets
        .create_budget(
            user.id,
            NewBudget::new("Travel", Category::Transport, Decimal::from(1000)),
        )
        .unwrap();
    record(&ctx, user.id, 250, Category::Transport);

    let listed = ctx.budgets.list_budgets(user.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].spent, Decimal::from(250));
    assert_eq!(listed[0].remaining, Decimal::from(750));
    assert_eq!(listed[0].amount, listed[0].budget.limit);

    let updated = ctx
        .budgets
        .update_budget(
            user.id,
            created.budget.id,
            BudgetUpdate {
                limit: Some(Decimal::from(200)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(updated.is_over());

    ctx.budgets.delete_budget(user.id, created.budget.id).unwrap();
    assert!(ctx.budgets.list_budgets(user.id).unwrap().is_empty());
    assert!(matches!(
        ctx.budgets.get_budget(user.id, created.budget.id).unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_recommendations_follow_budgets_and_season() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    let june = at(2025, 6, 15, 12);
    let recs = ctx.advisor.recommendations_at(user.id, june).unwrap();
    assert_eq!(recs.len(), 1);
    assert!(recs[0].starts_with("Compliance Alert"));

    ctx.budgets
        .create_budget(user.id, NewBudget::new("Food", Category::Food, Decimal::from(1000)))
        .unwrap();
    let recs = ctx.advisor.recommendations_at(user.id, june).unwrap();
    assert_eq!(recs, vec!["Audit Clean: Books are in order. Spending aligns with projections."]);

    ctx.ledger
        .create_expense(
            user.id,
            NewExpense::new(Decimal::from(1200), Category::Food).with_occurred_at(at(2025, 6, 2, 8)),
        )
        .unwrap();
    let recs = ctx.advisor.recommendations_at(user.id, june).unwrap();
    assert!(recs.iter().any(|r| r.starts_with("Variance Detected")
        && r.contains("₹1,200.00")
        && r.contains("by ₹200.00")));

    ctx.budgets
        .create_budget(
            user.id,
            NewBudget::new("Commute", Category::Transport, Decimal::from(1000)),
        )
        .unwrap();
    ctx.ledger
        .create_expense(
            user.id,
            NewExpense::new(Decimal::from(957), Category::Transport)
                .with_occurred_at(at(2025, 6, 3, 9)),
        )
        .unwrap();
    let recs = ctx.advisor.recommendations_at(user.id, june).unwrap();
    assert!(recs
        .iter()
        .any(|r| r == "High Utilization: You have utilized 95% of your 'transport' budget."));

    let february = at(2026, 2, 10, 12);
    let recs = ctx.advisor.recommendations_at(user.id, february).unwrap();
    assert!(recs.iter().any(|r| r.starts_with("Tax Planning")));
}

#[test]
fn test_forecast_and_dashboard() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");
    ctx.budgets
        .set_global_limit(user.id, Some(Decimal::from(20000)))
        .unwrap();

    ctx.ledger
        .create_expense(
            user.id,
            NewExpense::new(Decimal::from(3000), Category::Shopping)
                .with_occurred_at(at(2025, 6, 3, 10)),
        )
        .unwrap();
    ctx.ledger
        .create_expense(
            user.id,
            NewExpense::new(Decimal::from(25000), Category::Education)
                .with_occurred_at(at(2025, 5, 20, 10)),
        )
        .unwrap();

    let now = at(2025, 6, 10, 12);
    let forecast = ctx.advisor.forecast_at(user.id, now).unwrap();
    assert_eq!(forecast.current_month_spending, Decimal::from(3000));
    assert_eq!(forecast.predicted_monthly_spending, Decimal::from(9000));
    assert_eq!(forecast.days_elapsed, 10);
    assert_eq!(forecast.days_remaining, 20);

    let dashboard = ctx.advisor.dashboard_at(user.id, now).unwrap();
    assert_eq!(dashboard.user_name, "asha");
    let history = &dashboard.financial_summary.savings_history;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].month, "Jun 2025");
    assert_eq!(history[0].savings, Decimal::from(17000));
    assert_eq!(history[1].month, "May 2025");
    assert_eq!(history[1].savings, Decimal::from(-5000));
    assert_eq!(history[2].month, "Apr 2025");
    assert_eq!(dashboard.financial_summary.total_spent_month, Decimal::from(3000));
    assert_eq!(dashboard.financial_summary.net_savings, Decimal::from(17000));
}

// ============================================================================
// Users, savings goals and the chat bot
// ============================================================================

#[test]
fn test_registration_and_login() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let dup = ctx
        .users
        .register(NewUser {
            username: "asha".to_string(),
            email: "other@example.com".to_string(),
            password: "pw".to_string(),
            full_name: None,
            phone_number: None,
        })
        .unwrap_err();
    assert!(matches!(dup, Error::Conflict(_)));

    assert_eq!(ctx.users.login("asha", "hunter22").unwrap().id, user.id);
    assert!(matches!(
        ctx.users.login("asha", "wrong").unwrap_err(),
        Error::Auth(_)
    ));

    ctx.users.set_active(user.id, false).unwrap();
    assert!(matches!(
        ctx.users.login("asha", "hunter22").unwrap_err(),
        Error::Auth(_)
    ));
}

#[test]
fn test_savings_goal_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");

    let goal = ctx
        .savings
        .create_goal(
            user.id,
            NewSavingsGoal {
                name: "Emergency fund".to_string(),
                target_amount: Decimal::from(50000),
                current_amount: Decimal::from(12500),
                deadline: None,
                description: None,
            },
        )
        .unwrap();
    assert_eq!(goal.progress_percentage(), Decimal::from(25));

    let updated = ctx
        .savings
        .update_goal(
            user.id,
            goal.id,
            SavingsGoalUpdate {
                current_amount: Some(Decimal::from(60000)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.progress_percentage(), Decimal::from(100));
    assert_eq!(ctx.savings.get_goal(user.id, goal.id).unwrap().current_amount, Decimal::from(60000));

    ctx.savings.delete_goal(user.id, goal.id).unwrap();
    assert!(ctx.savings.list_goals(user.id).unwrap().is_empty());
}

#[test]
fn test_bot_records_and_answers() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir, EditPolicy::Reject);
    let user = register(&ctx, "asha");
    ctx.users.set_phone(user.id, "+91 98765 43210").unwrap();

    let reply = ctx
        .bot
        .process_message("whatsapp:+919876543210", "Spent 500 on food")
        .unwrap();
    assert!(reply.contains("Record Created"));
    assert!(reply.contains("₹500.00"));

    let expenses = ctx.ledger.list_expenses(user.id, 0, 10).unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].category, Category::Food);
    assert_eq!(expenses[0].payment_method, PaymentMethod::Upi);
    assert_eq!(expenses[0].description, "WhatsApp Entry: Food");

    let reply = ctx
        .bot
        .process_message("whatsapp:+919876543210", "What is my balance?")
        .unwrap();
    assert!(reply.contains("Financial Status Update"));
    assert!(reply.contains("₹500.00"));

    let reply = ctx
        .bot
        .process_message("whatsapp:+919876543210", "lunch with team")
        .unwrap();
    assert!(reply.contains("couldn't identify the amount"));

    let reply = ctx
        .bot
        .process_message("whatsapp:+911111111111", "Spent 20 on food")
        .unwrap();
    assert!(reply.contains("not recognized"));

    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.status, IntegrityStatus::Stable);
}

#[test]
fn test_context_opens_data_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("finpilot");

    {
        let ctx = FinpilotContext::new(&data_dir).unwrap();
        let user = register(&ctx, "asha");
        record(&ctx, user.id, 100, Category::Food);
    }

    // Reopening sees the same chain and applies no migrations twice
    let ctx = FinpilotContext::new(&data_dir).unwrap();
    let user = ctx.users.login("asha", "hunter22").unwrap();
    let report = ctx.audit.perform_integrity_sweep(user.id).unwrap();
    assert_eq!(report.verified_count, 1);
    assert!(data_dir.join(finpilot_core::DB_FILENAME).exists());
}
