use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShortageError};

/// Evidence flags the shortage predicate understands. `shortage_required_flags`
/// entries must name one of these.
pub const KNOWN_EVIDENCE_FLAGS: [&str; 2] = ["has_deductions", "child_invoice_present"];

/// Convention used when parsing ambiguous date strings like `03/04/2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    DayFirst,
    MonthFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub input_raw_dir: PathBuf,
    pub output_processed_dir: PathBuf,
    pub date_format: DateFormat,
    pub aging_days_threshold: i64,
    pub currency_expected: String,
    pub round_decimals: u32,
    pub partition_by_year: bool,
    pub tolerance_small_delta: Decimal,
}

impl SettingsConfig {
    /// Load and validate settings from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = read_config_file(path)?;
        let settings: SettingsConfig =
            toml::from_str(&raw).map_err(|e| ShortageError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        settings.validate()?;
        debug!("Parsed settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.aging_days_threshold < 0 {
            return Err(ShortageError::ConfigValidation(format!(
                "aging_days_threshold must be non-negative, got {}",
                self.aging_days_threshold
            )));
        }
        if self.currency_expected.trim().is_empty() {
            return Err(ShortageError::ConfigValidation(
                "currency_expected must not be empty".to_string(),
            ));
        }
        if self.tolerance_small_delta < Decimal::ZERO {
            return Err(ShortageError::ConfigValidation(format!(
                "tolerance_small_delta must be non-negative, got {}",
                self.tolerance_small_delta
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    pub eligible_statuses: BTreeSet<String>,
    pub shortage_required_flags: Vec<String>,
    pub use_strict_currency_check: bool,
}

impl RulesConfig {
    /// Load, normalize and validate rules from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = read_config_file(path)?;
        let rules: RulesConfig = toml::from_str(&raw).map_err(|e| ShortageError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let rules = rules.normalized();
        rules.validate()?;
        debug!("Parsed rules: {:?}", rules);
        Ok(rules)
    }

    /// Upper-case the status allow-list so lookups are case-insensitive.
    pub fn normalized(self) -> Self {
        let Self {
            eligible_statuses,
            shortage_required_flags,
            use_strict_currency_check,
        } = self;
        Self {
            eligible_statuses: eligible_statuses
                .into_iter()
                .map(|status| status.trim().to_uppercase())
                .collect(),
            shortage_required_flags,
            use_strict_currency_check,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.eligible_statuses.is_empty() {
            return Err(ShortageError::ConfigValidation(
                "eligible_statuses must not be empty".to_string(),
            ));
        }
        for flag in &self.shortage_required_flags {
            if !KNOWN_EVIDENCE_FLAGS.contains(&flag.as_str()) {
                return Err(ShortageError::ConfigValidation(format!(
                    "unknown evidence flag '{}' in shortage_required_flags (known: {:?})",
                    flag, KNOWN_EVIDENCE_FLAGS
                )));
            }
        }
        Ok(())
    }

    pub fn status_is_eligible(&self, status: &str) -> bool {
        self.eligible_statuses
            .contains(&status.trim().to_uppercase())
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(ShortageError::ConfigNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}
