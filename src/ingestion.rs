use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use log::{info, warn};
use rust_decimal::Decimal;

use crate::config::SettingsConfig;
use crate::error::{Result, ShortageError};
use crate::schema::InvoiceRecord;
use crate::utils::{parse_flexible_date, round_money};

pub const REQUIRED_COLUMNS: [&str; 10] = [
    "invoice_id",
    "invoice_date",
    "payment_due_date",
    "invoice_status",
    "actual_paid_amount",
    "paid_amount_currency",
    "invoice_creation_date",
    "invoice_amount",
    "invoice_currency",
    "has_deductions",
];

const CHILD_INVOICE_COLUMN: &str = "child_invoice_id";

const TRUE_VALUES: [&str; 6] = ["true", "t", "yes", "y", "1", "on"];
const FALSE_VALUES: [&str; 6] = ["false", "f", "no", "n", "0", "off"];

/// Read and combine invoice CSV files from the configured raw directory.
///
/// Files are processed in sorted filename order. Rows whose currency fields
/// do not match the expected currency are filtered out with a warning; the
/// quality gate later re-asserts compliance on whatever survives.
pub fn read_invoice_data(settings: &SettingsConfig) -> Result<Vec<InvoiceRecord>> {
    let source_dir = &settings.input_raw_dir;
    if !source_dir.is_dir() {
        return Err(ShortageError::InputDirNotFound(source_dir.clone()));
    }

    let mut csv_files: Vec<PathBuf> = fs::read_dir(source_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    csv_files.sort();

    if csv_files.is_empty() {
        return Err(ShortageError::NoInputFiles(source_dir.clone()));
    }
    info!(
        "Found {} raw CSV files in {}",
        csv_files.len(),
        source_dir.display()
    );

    let mut records = Vec::new();
    for file_path in &csv_files {
        records.extend(load_single_file(file_path, settings)?);
    }
    info!(
        "Combined {} rows from {} files",
        records.len(),
        csv_files.len()
    );
    Ok(records)
}

fn load_single_file(file_path: &Path, settings: &SettingsConfig) -> Result<Vec<InvoiceRecord>> {
    info!("Reading CSV file {}", file_path.display());
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::from_headers(&headers, &file_name)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row?;
        let record = parse_row(&row, &columns, settings, &file_name)?;
        if currency_compliant(&record, &settings.currency_expected) {
            records.push(record);
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!(
            "Skipping {} rows from {} due to non-{} currency values",
            skipped, file_name, settings.currency_expected
        );
    }
    if records.is_empty() {
        warn!(
            "All rows filtered out from {} due to currency checks (expected {})",
            file_name, settings.currency_expected
        );
    }
    Ok(records)
}

struct ColumnIndex {
    invoice_id: usize,
    invoice_date: usize,
    payment_due_date: usize,
    invoice_status: usize,
    actual_paid_amount: usize,
    paid_amount_currency: usize,
    invoice_creation_date: usize,
    invoice_amount: usize,
    invoice_currency: usize,
    has_deductions: usize,
    child_invoice_id: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord, file: &str) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|header| header == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| position(column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ShortageError::MissingColumns {
                file: file.to_string(),
                columns: missing,
            });
        }

        // All required lookups are Some after the check above.
        Ok(Self {
            invoice_id: position("invoice_id").unwrap(),
            invoice_date: position("invoice_date").unwrap(),
            payment_due_date: position("payment_due_date").unwrap(),
            invoice_status: position("invoice_status").unwrap(),
            actual_paid_amount: position("actual_paid_amount").unwrap(),
            paid_amount_currency: position("paid_amount_currency").unwrap(),
            invoice_creation_date: position("invoice_creation_date").unwrap(),
            invoice_amount: position("invoice_amount").unwrap(),
            invoice_currency: position("invoice_currency").unwrap(),
            has_deductions: position("has_deductions").unwrap(),
            child_invoice_id: position(CHILD_INVOICE_COLUMN),
        })
    }
}

fn parse_row(
    row: &StringRecord,
    columns: &ColumnIndex,
    settings: &SettingsConfig,
    file_name: &str,
) -> Result<InvoiceRecord> {
    let field = |index: usize| row.get(index).unwrap_or("").trim();

    let has_deductions = parse_bool(field(columns.has_deductions), "has_deductions", file_name)?;

    let child_invoice_id = columns
        .child_invoice_id
        .map(|index| field(index).to_string())
        .filter(|value| !value.is_empty());

    Ok(InvoiceRecord {
        invoice_id: field(columns.invoice_id).to_string(),
        invoice_date: parse_flexible_date(field(columns.invoice_date), settings.date_format),
        payment_due_date: parse_flexible_date(
            field(columns.payment_due_date),
            settings.date_format,
        ),
        invoice_creation_date: parse_flexible_date(
            field(columns.invoice_creation_date),
            settings.date_format,
        ),
        invoice_status: field(columns.invoice_status).to_string(),
        invoice_amount: parse_amount(field(columns.invoice_amount), settings.round_decimals),
        actual_paid_amount: parse_amount(
            field(columns.actual_paid_amount),
            settings.round_decimals,
        ),
        invoice_currency: field(columns.invoice_currency).to_string(),
        paid_amount_currency: field(columns.paid_amount_currency).to_string(),
        has_deductions,
        child_invoice_id,
        source_file: file_name.to_string(),
    })
}

/// Unparseable or empty amounts coerce to None; Transform later defaults
/// them to zero.
fn parse_amount(value: &str, round_decimals: u32) -> Option<Decimal> {
    if value.is_empty() {
        return None;
    }
    value
        .parse::<Decimal>()
        .ok()
        .map(|amount| round_money(amount, round_decimals))
}

fn parse_bool(value: &str, column: &str, file: &str) -> Result<bool> {
    let normalized = value.to_ascii_lowercase();
    if TRUE_VALUES.contains(&normalized.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&normalized.as_str()) {
        Ok(false)
    } else {
        Err(ShortageError::InvalidBoolean {
            file: file.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}

fn currency_compliant(record: &InvoiceRecord, expected: &str) -> bool {
    record.invoice_currency.eq_ignore_ascii_case(expected)
        && record.paid_amount_currency.eq_ignore_ascii_case(expected)
}
