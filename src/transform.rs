use chrono::Datelike;
use log::info;
use rust_decimal::Decimal;

use crate::config::SettingsConfig;
use crate::schema::{InvoiceRecord, TransformedInvoice};
use crate::utils::round_money;

/// Derive the per-invoice fields downstream evaluation needs.
///
/// Missing amounts default to zero before subtraction, so a record never
/// carries an absent delta. Records with an unparseable payment due date get
/// an absent payment year, which is not an error at this stage.
pub fn transform_invoices(
    records: Vec<InvoiceRecord>,
    settings: &SettingsConfig,
) -> Vec<TransformedInvoice> {
    info!("Starting transformation step for {} records", records.len());

    let transformed: Vec<TransformedInvoice> = records
        .into_iter()
        .map(|record| {
            let invoice_amount = record.invoice_amount.unwrap_or(Decimal::ZERO);
            let paid_amount = record.actual_paid_amount.unwrap_or(Decimal::ZERO);
            let delta = round_money(invoice_amount - paid_amount, settings.round_decimals);

            let child_invoice_present = record
                .child_invoice_id
                .as_deref()
                .map(|id| !id.trim().is_empty())
                .unwrap_or(false);

            let payment_year = record.payment_due_date.map(|date| date.year());

            TransformedInvoice {
                record,
                delta,
                child_invoice_present,
                payment_year,
            }
        })
        .collect();

    info!("Completed transformation");
    transformed
}
