use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Local;
use log::info;

use crate::analytics::compute_kpis;
use crate::config::{RulesConfig, SettingsConfig};
use crate::error::{Result, ShortageError};
use crate::ingestion::read_invoice_data;
use crate::quality::run_quality_checks;
use crate::report;
use crate::shortage::apply_shortage_logic;
use crate::transform::transform_invoices;
use crate::utils::ensure_directories;

/// Execute the full shortage detection workflow.
///
/// Linear and fail-fast: the first error aborts the run. Outputs already
/// written by earlier stages may remain on disk after a later failure; the
/// pipeline is not atomic.
pub fn run_pipeline(
    settings: &SettingsConfig,
    rules: &RulesConfig,
) -> Result<BTreeMap<String, PathBuf>> {
    info!("Pipeline started");
    ensure_directories(&[&settings.output_processed_dir])?;

    let invoices_raw = read_invoice_data(settings)?;
    if invoices_raw.is_empty() {
        return Err(ShortageError::EmptyRecordSet);
    }

    let invoices_transformed = transform_invoices(invoices_raw, settings);
    let today = Local::now().date_naive();
    let invoices_flagged =
        apply_shortage_logic(invoices_transformed.clone(), settings, rules, today);

    run_quality_checks(&invoices_flagged, settings, rules, today)?;

    let mut artifacts = BTreeMap::new();
    let clean_path = report::export_clean_dataset(&invoices_transformed, settings)?;
    artifacts.insert("clean_dataset".to_string(), clean_path);
    artifacts.extend(report::export_shortage_outputs(&invoices_flagged, settings)?);

    let tables = compute_kpis(&invoices_flagged, settings);
    artifacts.extend(report::export_kpi_tables(&tables, settings)?);

    let summary_path = report::write_run_summary(&artifacts, settings)?;
    artifacts.insert("run_summary".to_string(), summary_path);

    info!("Pipeline completed successfully");
    Ok(artifacts)
}
