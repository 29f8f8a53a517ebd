//! # Invoice Shortage
//!
//! A library for flagging, aging and reporting underpaid invoices from
//! batches of raw invoice data.
//!
//! ## Core Concepts
//!
//! - **Delta**: invoice amount minus the amount actually paid, rounded to a
//!   configured precision
//! - **Shortage**: a delta above a small tolerance, backed by evidence (a
//!   deduction flag or a child invoice) and an eligible invoice status
//! - **Aged**: an invoice whose payment due date is more than a threshold
//!   number of days in the past
//! - **KPI tables**: four roll-ups of the evaluated batch (overall total,
//!   per-year totals, and two aged views)
//!
//! The pipeline is a sequence of pure batch stages (transform, shortage
//! evaluation, a quality gate, aggregation) wrapped by CSV ingestion and
//! export collaborators. Every run is a fresh, stateless computation over a
//! full input batch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use invoice_shortage::*;
//! use std::path::Path;
//!
//! let settings = SettingsConfig::from_path(Path::new("config/settings.toml"))?;
//! let rules = RulesConfig::from_path(Path::new("config/rules.toml"))?;
//!
//! let artifacts = run_pipeline(&settings, &rules)?;
//! for (name, path) in &artifacts {
//!     println!("{name}: {}", path.display());
//! }
//! ```
//!
//! The core stages are also callable directly with an explicit clock, which
//! keeps evaluation deterministic under test:
//!
//! ```rust,ignore
//! let evaluated = evaluate_invoices(records, &settings, &rules, today);
//! run_quality_checks(&evaluated, &settings, &rules, today)?;
//! let tables = compute_kpis(&evaluated, &settings);
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod schema;
pub mod shortage;
pub mod transform;
pub mod utils;

pub use analytics::compute_kpis;
pub use config::{DateFormat, RulesConfig, SettingsConfig};
pub use error::{Result, ShortageError};
pub use ingestion::read_invoice_data;
pub use pipeline::run_pipeline;
pub use quality::run_quality_checks;
pub use schema::{
    AgeBucket, AgedInvoiceRow, AgedShortageRow, AnnualShortageRow, EvaluatedInvoice,
    InvoiceRecord, KpiTables, TotalShortageSummary, TransformedInvoice,
};
pub use shortage::apply_shortage_logic;
pub use transform::transform_invoices;

use chrono::NaiveDate;

/// Transform and evaluate a batch in one call with an explicit clock.
pub fn evaluate_invoices(
    records: Vec<InvoiceRecord>,
    settings: &SettingsConfig,
    rules: &RulesConfig,
    today: NaiveDate,
) -> Vec<EvaluatedInvoice> {
    let transformed = transform::transform_invoices(records, settings);
    shortage::apply_shortage_logic(transformed, settings, rules, today)
}
