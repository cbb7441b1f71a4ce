//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "ledger": { "editPolicy": "reject" },
//!   "advisor": { "dailyBurnLimit": 2000, "utilizationWarning": 0.9, "projectionDays": 30 },
//!   "audit": { "outlierMultiplier": 3, "outlierWindowDays": 90, "surgeRatio": 1.5,
//!              "surgeMinPrevious": 5000, "complianceThreshold": 90 }
//! }
//! ```
//! A missing or malformed file falls back to defaults.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What happens when an edit touches a hash-bound field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditPolicy {
    /// Refuse edits to amount or description
    Reject,
    /// Rehash the record outside the linear chain
    Unlink,
}

impl Default for EditPolicy {
    fn default() -> Self {
        EditPolicy::Reject
    }
}

impl fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditPolicy::Reject => f.write_str("reject"),
            EditPolicy::Unlink => f.write_str("unlink"),
        }
    }
}

impl FromStr for EditPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(EditPolicy::Reject),
            "unlink" => Ok(EditPolicy::Unlink),
            other => anyhow::bail!("Unknown edit policy '{}' (expected reject or unlink)", other),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(default)]
    advisor: AdvisorSettings,
    #[serde(default)]
    audit: AuditSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSettings {
    #[serde(default)]
    pub edit_policy: EditPolicy,
}

/// Thresholds behind advisor recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorSettings {
    /// Average daily spend above which a burn-rate alert is raised
    pub daily_burn_limit: Decimal,
    /// Fraction of a budget that counts as high utilization
    pub utilization_warning: Decimal,
    /// Days used for the month-end projection
    pub projection_days: u32,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            daily_burn_limit: Decimal::from(2000),
            utilization_warning: Decimal::new(9, 1),
            projection_days: 30,
        }
    }
}

/// Thresholds behind anomaly and compliance checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditSettings {
    pub outlier_multiplier: Decimal,
    pub outlier_window_days: i64,
    pub surge_ratio: Decimal,
    pub surge_min_previous: Decimal,
    pub compliance_threshold: u32,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            outlier_multiplier: Decimal::from(3),
            outlier_window_days: 90,
            surge_ratio: Decimal::new(15, 1),
            surge_min_previous: Decimal::from(5000),
            compliance_threshold: 90,
        }
    }
}

/// FinPilot configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub edit_policy: EditPolicy,
    pub advisor: AdvisorSettings,
    pub audit: AuditSettings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory
    ///
    /// The edit policy can be overridden with FINPILOT_EDIT_POLICY.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let edit_policy = match std::env::var("FINPILOT_EDIT_POLICY").ok() {
            Some(value) => value.parse()?,
            None => raw.ledger.edit_policy,
        };

        Ok(Self {
            edit_policy,
            advisor: raw.advisor.clone(),
            audit: raw.audit.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    ///
    /// Keys this crate does not manage are written back untouched.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.ledger.edit_policy = self.edit_policy;
        settings.advisor = self.advisor.clone();
        settings.audit = self.audit.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn with_edit_policy(mut self, policy: EditPolicy) -> Self {
        self.edit_policy = policy;
        self
    }
}
