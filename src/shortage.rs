use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;

use crate::config::{RulesConfig, SettingsConfig};
use crate::schema::{AgeBucket, EvaluatedInvoice, TransformedInvoice};

/// Flag invoice shortages based on the configured tolerance and rules.
///
/// A record is a shortage when its delta exceeds the tolerance (strictly),
/// it carries evidence (a deduction flag or a child invoice), and its status
/// is on the eligible allow-list. `today` is passed in explicitly so aging
/// is deterministic under test.
pub fn apply_shortage_logic(
    records: Vec<TransformedInvoice>,
    settings: &SettingsConfig,
    rules: &RulesConfig,
    today: NaiveDate,
) -> Vec<EvaluatedInvoice> {
    info!("Applying shortage logic to {} records", records.len());
    let mut flagged = 0usize;

    let evaluated: Vec<EvaluatedInvoice> = records
        .into_iter()
        .map(|invoice| {
            let TransformedInvoice {
                record,
                delta,
                child_invoice_present,
                payment_year,
            } = invoice;

            let evidence = record.has_deductions || child_invoice_present;
            let shortage_flag = delta > settings.tolerance_small_delta
                && evidence
                && rules.status_is_eligible(&record.invoice_status);
            let shortage_amount = if shortage_flag { delta } else { Decimal::ZERO };
            if shortage_flag {
                flagged += 1;
            }

            // Missing due dates are treated as not past due rather than an error.
            let days_past_due = record
                .payment_due_date
                .map(|due| (today - due).num_days().max(0))
                .unwrap_or(0);
            let age_bucket = if days_past_due > settings.aging_days_threshold {
                AgeBucket::Aged
            } else {
                AgeBucket::Current
            };

            EvaluatedInvoice {
                record,
                delta,
                child_invoice_present,
                payment_year,
                shortage_flag,
                shortage_amount,
                days_past_due,
                age_bucket,
            }
        })
        .collect();

    info!("Shortage logic flagged {} of {} records", flagged, evaluated.len());
    evaluated
}
