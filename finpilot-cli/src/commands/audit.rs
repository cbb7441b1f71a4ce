//! Audit command - chain integrity, anomalies and compliance

use std::process::exit;
use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use finpilot_core::services::audit::{Anomaly, Severity};
use finpilot_core::services::{ComplianceReport, IntegrityReport, IntegrityStatus};
use finpilot_core::LoggingService;

use super::{get_context, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Recompute every digest in the user's chain
    Integrity {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Duplicate, outlier and category-shift checks
    Anomalies {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Payee and reference completeness
    Compliance {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Integrity, anomalies and compliance together
    Full {
        #[arg(long)]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_integrity(report: &IntegrityReport) {
    let status = match report.status {
        IntegrityStatus::Stable => "Stable".green().bold(),
        IntegrityStatus::Compromised => "Compromised".red().bold(),
    };
    println!("{} {}", "Ledger integrity:".bold(), status);
    println!(
        "  {} of {} record(s) verified",
        report.verified_count, report.total_count
    );

    if !report.tampered_records.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec![
            "ID",
            "#",
            "Date",
            "Category",
            "Amount",
            "Description",
            "Stored digest",
            "Finding",
        ]);
        for record in &report.tampered_records {
            let description = if record.deleted {
                format!("{} (deleted)", record.description)
            } else {
                record.description.clone()
            };
            table.add_row(vec![
                record.id.to_string(),
                record.seq.to_string(),
                record.date.format("%Y-%m-%d").to_string(),
                record.category.clone(),
                output::money(record.amount),
                description,
                output::short_digest(&record.stored_digest),
                record.reason.clone(),
            ]);
        }
        println!("{}", table);
    }

    if !report.unlinked_records.is_empty() {
        output::info(&format!(
            "  {} record(s) unlinked by edits: {}",
            report.unlinked_records.len(),
            report
                .unlinked_records
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
}

fn print_anomalies(anomalies: &[Anomaly]) {
    if anomalies.is_empty() {
        output::success("No anomalies found.");
        return;
    }
    let mut table = output::create_table();
    table.set_header(vec!["Type", "Severity", "Details", "Recommendation"]);
    for anomaly in anomalies {
        let severity = match anomaly.severity {
            Severity::High => "High".red().to_string(),
            Severity::Medium => "Medium".yellow().to_string(),
            Severity::Low => "Low".to_string(),
        };
        table.add_row(vec![
            anomaly.kind.to_string(),
            severity,
            anomaly.details.clone(),
            anomaly.recommendation.clone(),
        ]);
    }
    println!("{}", table);
}

fn print_compliance(report: &ComplianceReport) {
    let ready = if report.tax_ready {
        "tax ready".green()
    } else {
        "not tax ready".yellow()
    };
    println!("{} {}/100 ({})", "Compliance score:".bold(), report.score, ready);
    println!("  Missing payee:     {}", report.missing_payee_count);
    println!("  Missing reference: {}", report.missing_reference_count);
}

pub fn run(command: AuditCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        AuditCommands::Integrity { user, json } => {
            let report = ctx.audit.perform_integrity_sweep(user)?;
            if json {
                print_json(&report)?;
            } else {
                print_integrity(&report);
            }
            // Non-zero exit on tampering so scripts can react
            if report.status == IntegrityStatus::Compromised {
                exit(1);
            }
        }
        AuditCommands::Anomalies { user, json } => {
            let anomalies = ctx.audit.detect_anomalies(user)?;
            if json {
                return print_json(&anomalies);
            }
            print_anomalies(&anomalies);
        }
        AuditCommands::Compliance { user, json } => {
            let report = ctx.audit.check_compliance(user)?;
            if json {
                return print_json(&report);
            }
            print_compliance(&report);
        }
        AuditCommands::Full { user, json } => {
            let audit = ctx.audit.full_audit(user)?;
            if json {
                print_json(&audit)?;
            } else {
                println!(
                    "{} user {} at {}",
                    "Financial audit for".bold(),
                    audit.user_id,
                    audit.timestamp.format("%Y-%m-%d %H:%M:%S")
                );
                println!();
                print_integrity(&audit.integrity);
                println!();
                print_anomalies(&audit.anomalies);
                println!();
                print_compliance(&audit.compliance);
            }
            if audit.integrity.status == IntegrityStatus::Compromised {
                exit(1);
            }
        }
    }

    Ok(())
}
