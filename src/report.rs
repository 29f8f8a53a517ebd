use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use log::info;
use serde::Serialize;

use crate::config::SettingsConfig;
use crate::error::Result;
use crate::schema::{EvaluatedInvoice, InvoiceRecord, KpiTables, TransformedInvoice};
use crate::utils::ensure_directories;

const CLEAN_DATASET_NAME: &str = "invoices_clean";
const RUN_SUMMARY_FILE: &str = "run_summary.json";

const RECORD_HEADERS: [&str; 12] = [
    "invoice_id",
    "invoice_date",
    "payment_due_date",
    "invoice_creation_date",
    "invoice_status",
    "invoice_amount",
    "actual_paid_amount",
    "invoice_currency",
    "paid_amount_currency",
    "has_deductions",
    "child_invoice_id",
    "source_file",
];

const TRANSFORMED_HEADERS: [&str; 3] = ["delta", "child_invoice_present", "payment_year"];

const EVALUATED_HEADERS: [&str; 4] = [
    "shortage_flag",
    "shortage_amount",
    "days_past_due",
    "age_bucket",
];

/// Write the clean invoices dataset, optionally partitioned by payment year.
///
/// Partitioned export writes one file per year under a dataset directory;
/// records with no year land in a dedicated `unknown` partition. Repeated
/// runs replace previous partitions.
pub fn export_clean_dataset(
    records: &[TransformedInvoice],
    settings: &SettingsConfig,
) -> Result<PathBuf> {
    if settings.partition_by_year {
        let dataset_dir = settings.output_processed_dir.join(CLEAN_DATASET_NAME);
        if dataset_dir.exists() {
            fs::remove_dir_all(&dataset_dir)?;
        }
        ensure_directories(&[&dataset_dir])?;

        let mut partitions: BTreeMap<String, Vec<&TransformedInvoice>> = BTreeMap::new();
        for record in records {
            let key = record
                .payment_year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            partitions.entry(key).or_default().push(record);
        }

        for (year, rows) in &partitions {
            let path = dataset_dir.join(format!("payment_year={year}.csv"));
            write_transformed_csv(&path, rows)?;
        }
        info!(
            "Wrote clean dataset partitioned by payment year to {}",
            dataset_dir.display()
        );
        Ok(dataset_dir)
    } else {
        ensure_directories(&[&settings.output_processed_dir])?;
        let path = settings
            .output_processed_dir
            .join(format!("{CLEAN_DATASET_NAME}.csv"));
        let rows: Vec<&TransformedInvoice> = records.iter().collect();
        write_transformed_csv(&path, &rows)?;
        info!("Wrote clean dataset to {}", path.display());
        Ok(path)
    }
}

/// Write the full evaluated set and the shortage-only subset.
pub fn export_shortage_outputs(
    records: &[EvaluatedInvoice],
    settings: &SettingsConfig,
) -> Result<BTreeMap<String, PathBuf>> {
    ensure_directories(&[&settings.output_processed_dir])?;

    let flagged_path = settings.output_processed_dir.join("shortages_flagged.csv");
    let shortages_only_path = settings.output_processed_dir.join("shortages_only.csv");

    let all: Vec<&EvaluatedInvoice> = records.iter().collect();
    write_evaluated_csv(&flagged_path, &all)?;

    let shortages: Vec<&EvaluatedInvoice> =
        records.iter().filter(|r| r.shortage_flag).collect();
    write_evaluated_csv(&shortages_only_path, &shortages)?;

    info!(
        "Wrote shortage outputs ({} evaluated, {} flagged)",
        all.len(),
        shortages.len()
    );
    Ok(BTreeMap::from([
        ("shortages_flagged".to_string(), flagged_path),
        ("shortages_only".to_string(), shortages_only_path),
    ]))
}

/// Write the four KPI tables under their fixed filenames.
pub fn export_kpi_tables(
    tables: &KpiTables,
    settings: &SettingsConfig,
) -> Result<BTreeMap<String, PathBuf>> {
    ensure_directories(&[&settings.output_processed_dir])?;
    let output_dir = &settings.output_processed_dir;
    let mut paths = BTreeMap::new();

    let total_path = output_dir.join("total_shortage.csv");
    write_rows(
        &total_path,
        std::slice::from_ref(&tables.total_shortage),
        &["shortage_count", "total_shortage"],
    )?;
    paths.insert("total_shortage".to_string(), total_path);

    let annual_path = output_dir.join("annual_shortages.csv");
    write_rows(
        &annual_path,
        &tables.annual_shortages,
        &[
            "payment_year",
            "shortage_count",
            "total_shortage",
            "mean_shortage",
        ],
    )?;
    paths.insert("annual_shortages".to_string(), annual_path);

    let aged_shortages_path = output_dir.join("aged_shortages_by_year.csv");
    write_rows(
        &aged_shortages_path,
        &tables.aged_shortages_by_year,
        &["payment_year", "shortage_count", "total_shortage"],
    )?;
    paths.insert("aged_shortages_by_year".to_string(), aged_shortages_path);

    let aged_invoices_path = output_dir.join("aged_invoices_by_year.csv");
    write_rows(
        &aged_invoices_path,
        &tables.aged_invoices_by_year,
        &[
            "payment_year",
            "invoice_count",
            "shortage_count",
            "total_invoice_amount",
            "total_shortage",
        ],
    )?;
    paths.insert("aged_invoices_by_year".to_string(), aged_invoices_path);

    info!("Wrote {} KPI tables to {}", paths.len(), output_dir.display());
    Ok(paths)
}

/// Write a JSON manifest mapping output names to their paths.
pub fn write_run_summary(
    artifacts: &BTreeMap<String, PathBuf>,
    settings: &SettingsConfig,
) -> Result<PathBuf> {
    ensure_directories(&[&settings.output_processed_dir])?;
    let path = settings.output_processed_dir.join(RUN_SUMMARY_FILE);
    let json = serde_json::to_string_pretty(artifacts)?;
    fs::write(&path, json)?;
    info!("Wrote run summary to {}", path.display());
    Ok(path)
}

/// Serialize rows with an explicit header record so empty tables still get
/// a header row.
fn write_rows<S: Serialize>(path: &Path, rows: &[S], headers: &[&str]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_transformed_csv(path: &Path, rows: &[&TransformedInvoice]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    let headers: Vec<&str> = RECORD_HEADERS
        .iter()
        .chain(TRANSFORMED_HEADERS.iter())
        .copied()
        .collect();
    writer.write_record(&headers)?;

    for row in rows {
        let mut fields = record_fields(&row.record);
        fields.push(row.delta.to_string());
        fields.push(row.child_invoice_present.to_string());
        fields.push(optional_string(row.payment_year.map(|y| y.to_string())));
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_evaluated_csv(path: &Path, rows: &[&EvaluatedInvoice]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    let headers: Vec<&str> = RECORD_HEADERS
        .iter()
        .chain(TRANSFORMED_HEADERS.iter())
        .chain(EVALUATED_HEADERS.iter())
        .copied()
        .collect();
    writer.write_record(&headers)?;

    for row in rows {
        let mut fields = record_fields(&row.record);
        fields.push(row.delta.to_string());
        fields.push(row.child_invoice_present.to_string());
        fields.push(optional_string(row.payment_year.map(|y| y.to_string())));
        fields.push(row.shortage_flag.to_string());
        fields.push(row.shortage_amount.to_string());
        fields.push(row.days_past_due.to_string());
        fields.push(row.age_bucket.to_string());
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn record_fields(record: &InvoiceRecord) -> Vec<String> {
    vec![
        record.invoice_id.clone(),
        optional_date(record.invoice_date),
        optional_date(record.payment_due_date),
        optional_date(record.invoice_creation_date),
        record.invoice_status.clone(),
        optional_string(record.invoice_amount.map(|a| a.to_string())),
        optional_string(record.actual_paid_amount.map(|a| a.to_string())),
        record.invoice_currency.clone(),
        record.paid_amount_currency.clone(),
        record.has_deductions.to_string(),
        optional_string(record.child_invoice_id.clone()),
        record.source_file.clone(),
    ]
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn optional_string(value: Option<String>) -> String {
    value.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateFormat;
    use crate::schema::{
        AgeBucket, AnnualShortageRow, TotalShortageSummary,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn settings(output_dir: &Path, partition_by_year: bool) -> SettingsConfig {
        SettingsConfig {
            input_raw_dir: output_dir.join("raw"),
            output_processed_dir: output_dir.to_path_buf(),
            date_format: DateFormat::DayFirst,
            aging_days_threshold: 90,
            currency_expected: "USD".to_string(),
            round_decimals: 2,
            partition_by_year,
            tolerance_small_delta: dec!(0.01),
        }
    }

    fn transformed(id: &str, payment_year: Option<i32>) -> TransformedInvoice {
        TransformedInvoice {
            record: InvoiceRecord {
                invoice_id: id.to_string(),
                invoice_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                payment_due_date: payment_year.and_then(|y| NaiveDate::from_ymd_opt(y, 6, 1)),
                invoice_creation_date: NaiveDate::from_ymd_opt(2024, 4, 28),
                invoice_status: "PAID".to_string(),
                invoice_amount: Some(dec!(100.00)),
                actual_paid_amount: Some(dec!(95.00)),
                invoice_currency: "USD".to_string(),
                paid_amount_currency: "USD".to_string(),
                has_deductions: true,
                child_invoice_id: None,
                source_file: "test.csv".to_string(),
            },
            delta: dec!(5.00),
            child_invoice_present: false,
            payment_year,
        }
    }

    fn evaluated(id: &str, shortage_flag: bool) -> EvaluatedInvoice {
        let base = transformed(id, Some(2024));
        EvaluatedInvoice {
            record: base.record,
            delta: base.delta,
            child_invoice_present: base.child_invoice_present,
            payment_year: base.payment_year,
            shortage_flag,
            shortage_amount: if shortage_flag { dec!(5.00) } else { Decimal::ZERO },
            days_past_due: 10,
            age_bucket: AgeBucket::Current,
        }
    }

    #[test]
    fn test_partitioned_export_writes_one_file_per_year() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            transformed("A", Some(2023)),
            transformed("B", Some(2024)),
            transformed("C", None),
        ];

        let dataset_dir =
            export_clean_dataset(&records, &settings(dir.path(), true)).unwrap();

        assert!(dataset_dir.join("payment_year=2023.csv").is_file());
        assert!(dataset_dir.join("payment_year=2024.csv").is_file());
        assert!(dataset_dir.join("payment_year=unknown.csv").is_file());
    }

    #[test]
    fn test_repeated_partitioned_export_replaces_old_partitions() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), true);

        export_clean_dataset(&[transformed("A", Some(2022))], &settings).unwrap();
        let dataset_dir =
            export_clean_dataset(&[transformed("B", Some(2024))], &settings).unwrap();

        assert!(!dataset_dir.join("payment_year=2022.csv").exists());
        assert!(dataset_dir.join("payment_year=2024.csv").is_file());
    }

    #[test]
    fn test_unpartitioned_export_writes_single_file() {
        let dir = TempDir::new().unwrap();
        let path = export_clean_dataset(
            &[transformed("A", Some(2024))],
            &settings(dir.path(), false),
        )
        .unwrap();

        assert!(path.is_file());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("invoice_id,"));
        assert!(contents.contains("A,2024-05-01"));
    }

    #[test]
    fn test_shortage_outputs_split_flagged_subset() {
        let dir = TempDir::new().unwrap();
        let records = vec![
            evaluated("A", true),
            evaluated("B", false),
            evaluated("C", true),
        ];

        let paths =
            export_shortage_outputs(&records, &settings(dir.path(), false)).unwrap();

        let flagged = fs::read_to_string(&paths["shortages_flagged"]).unwrap();
        assert_eq!(flagged.lines().count(), 4);
        let only = fs::read_to_string(&paths["shortages_only"]).unwrap();
        assert_eq!(only.lines().count(), 3);
        assert!(only.contains("A,"));
        assert!(!only.contains("B,"));
    }

    #[test]
    fn test_kpi_export_writes_fixed_filenames_with_headers() {
        let dir = TempDir::new().unwrap();
        let tables = KpiTables {
            total_shortage: TotalShortageSummary {
                shortage_count: 1,
                total_shortage: dec!(5.00),
            },
            annual_shortages: vec![AnnualShortageRow {
                payment_year: 2024,
                shortage_count: 1,
                total_shortage: dec!(5.00),
                mean_shortage: dec!(5.00),
            }],
            aged_shortages_by_year: Vec::new(),
            aged_invoices_by_year: Vec::new(),
        };

        let paths = export_kpi_tables(&tables, &settings(dir.path(), false)).unwrap();

        assert_eq!(paths.len(), 4);
        let total = fs::read_to_string(&paths["total_shortage"]).unwrap();
        assert!(total.starts_with("shortage_count,total_shortage"));
        assert!(total.contains("1,5.00"));

        // Empty tables still carry their header row.
        let aged = fs::read_to_string(&paths["aged_invoices_by_year"]).unwrap();
        assert_eq!(aged.lines().count(), 1);
    }

    #[test]
    fn test_run_summary_lists_artifacts() {
        let dir = TempDir::new().unwrap();
        let artifacts = BTreeMap::from([
            ("clean_dataset".to_string(), dir.path().join("clean.csv")),
            ("total_shortage".to_string(), dir.path().join("total.csv")),
        ]);

        let path = write_run_summary(&artifacts, &settings(dir.path(), false)).unwrap();
        let summary: BTreeMap<String, PathBuf> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(summary.len(), 2);
        assert!(summary.contains_key("clean_dataset"));
    }
}
