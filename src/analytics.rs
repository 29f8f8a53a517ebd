use std::collections::BTreeMap;

use log::info;
use rust_decimal::Decimal;

use crate::config::SettingsConfig;
use crate::schema::{
    AgeBucket, AgedInvoiceRow, AgedShortageRow, AnnualShortageRow, EvaluatedInvoice, KpiTables,
    TotalShortageSummary,
};
use crate::utils::round_money;

/// Compute the four KPI tables from a shortage-evaluated record set.
///
/// Year-grouped tables exclude records with an absent payment year and come
/// out sorted ascending by year. Monetary sums and means are rounded to the
/// configured precision.
pub fn compute_kpis(records: &[EvaluatedInvoice], settings: &SettingsConfig) -> KpiTables {
    info!("Computing analytics tables");
    let decimals = settings.round_decimals;

    let shortages: Vec<&EvaluatedInvoice> =
        records.iter().filter(|r| r.shortage_flag).collect();

    let total_shortage = TotalShortageSummary {
        shortage_count: shortages.len(),
        total_shortage: round_money(
            shortages.iter().map(|r| r.shortage_amount).sum::<Decimal>(),
            decimals,
        ),
    };

    let mut annual: BTreeMap<i32, (usize, Decimal)> = BTreeMap::new();
    for invoice in &shortages {
        if let Some(year) = invoice.payment_year {
            let entry = annual.entry(year).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += invoice.shortage_amount;
        }
    }
    let annual_shortages = annual
        .into_iter()
        .map(|(year, (count, sum))| AnnualShortageRow {
            payment_year: year,
            shortage_count: count,
            total_shortage: round_money(sum, decimals),
            mean_shortage: round_money(sum / Decimal::from(count as u64), decimals),
        })
        .collect();

    let mut aged_shortages: BTreeMap<i32, (usize, Decimal)> = BTreeMap::new();
    for invoice in shortages
        .iter()
        .filter(|r| r.age_bucket == AgeBucket::Aged)
    {
        if let Some(year) = invoice.payment_year {
            let entry = aged_shortages.entry(year).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += invoice.shortage_amount;
        }
    }
    let aged_shortages_by_year = aged_shortages
        .into_iter()
        .map(|(year, (count, sum))| AgedShortageRow {
            payment_year: year,
            shortage_count: count,
            total_shortage: round_money(sum, decimals),
        })
        .collect();

    let mut aged_invoices: BTreeMap<i32, (usize, usize, Decimal, Decimal)> = BTreeMap::new();
    for invoice in records.iter().filter(|r| r.age_bucket == AgeBucket::Aged) {
        if let Some(year) = invoice.payment_year {
            let entry = aged_invoices
                .entry(year)
                .or_insert((0, 0, Decimal::ZERO, Decimal::ZERO));
            entry.0 += 1;
            if invoice.shortage_flag {
                entry.1 += 1;
            }
            entry.2 += invoice.record.invoice_amount.unwrap_or(Decimal::ZERO);
            entry.3 += invoice.shortage_amount;
        }
    }
    let aged_invoices_by_year = aged_invoices
        .into_iter()
        .map(
            |(year, (invoice_count, shortage_count, amount_sum, shortage_sum))| AgedInvoiceRow {
                payment_year: year,
                invoice_count,
                shortage_count,
                total_invoice_amount: round_money(amount_sum, decimals),
                total_shortage: round_money(shortage_sum, decimals),
            },
        )
        .collect();

    info!("Computed 4 KPI tables");
    KpiTables {
        total_shortage,
        annual_shortages,
        aged_shortages_by_year,
        aged_invoices_by_year,
    }
}
