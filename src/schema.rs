use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw invoice row as produced by ingestion.
///
/// Amount and date fields are optional at this stage: a missing amount is a
/// documented Transform policy (defaults to zero), while a missing date is
/// what the quality gate later turns into a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub payment_due_date: Option<NaiveDate>,
    pub invoice_creation_date: Option<NaiveDate>,
    pub invoice_status: String,
    pub invoice_amount: Option<Decimal>,
    pub actual_paid_amount: Option<Decimal>,
    pub invoice_currency: String,
    pub paid_amount_currency: String,
    pub has_deductions: bool,
    pub child_invoice_id: Option<String>,
    pub source_file: String,
}

/// An invoice enriched with the fields shortage evaluation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedInvoice {
    pub record: InvoiceRecord,
    pub delta: Decimal,
    pub child_invoice_present: bool,
    pub payment_year: Option<i32>,
}

/// A fully evaluated invoice with shortage flag and aging classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedInvoice {
    pub record: InvoiceRecord,
    pub delta: Decimal,
    pub child_invoice_present: bool,
    pub payment_year: Option<i32>,
    pub shortage_flag: bool,
    pub shortage_amount: Decimal,
    pub days_past_due: i64,
    pub age_bucket: AgeBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBucket {
    Current,
    Aged,
}

impl AgeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Aged => "Aged",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count and sum over all shortage-flagged records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalShortageSummary {
    pub shortage_count: usize,
    pub total_shortage: Decimal,
}

/// Per-year shortage totals over flagged records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualShortageRow {
    pub payment_year: i32,
    pub shortage_count: usize,
    pub total_shortage: Decimal,
    pub mean_shortage: Decimal,
}

/// Per-year shortage totals restricted to aged flagged records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgedShortageRow {
    pub payment_year: i32,
    pub shortage_count: usize,
    pub total_shortage: Decimal,
}

/// Per-year roll-up over all aged invoices, shortage or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgedInvoiceRow {
    pub payment_year: i32,
    pub invoice_count: usize,
    pub shortage_count: usize,
    pub total_invoice_amount: Decimal,
    pub total_shortage: Decimal,
}

/// The four KPI tables computed from an evaluated record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTables {
    pub total_shortage: TotalShortageSummary,
    pub annual_shortages: Vec<AnnualShortageRow>,
    pub aged_shortages_by_year: Vec<AgedShortageRow>,
    pub aged_invoices_by_year: Vec<AgedInvoiceRow>,
}
