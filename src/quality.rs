use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::config::{RulesConfig, SettingsConfig};
use crate::error::{Result, ShortageError};
use crate::schema::{EvaluatedInvoice, InvoiceRecord};

/// Execute quality assertions on the evaluated record set.
///
/// Two-tier policy: schema conformance is checked lazily across the whole
/// batch and reported as one failure with every violation, while the
/// currency and date business checks fail fast on the first offender.
/// Never mutates or filters the input.
pub fn run_quality_checks(
    records: &[EvaluatedInvoice],
    settings: &SettingsConfig,
    rules: &RulesConfig,
    today: NaiveDate,
) -> Result<()> {
    info!("Running quality checks on {} records", records.len());
    debug!(
        "Eligible statuses for shortage logic: {:?}",
        rules.eligible_statuses
    );

    if records.is_empty() {
        return Err(ShortageError::EmptyRecordSet);
    }

    validate_schema(records)?;
    if rules.use_strict_currency_check {
        validate_currency(records, &settings.currency_expected)?;
    }
    validate_dates(records, today)?;

    info!("Quality checks passed");
    Ok(())
}

fn validate_schema(records: &[EvaluatedInvoice]) -> Result<()> {
    let mut violations = Vec::new();

    for (index, invoice) in records.iter().enumerate() {
        let record = &invoice.record;

        for (column, value) in [
            ("invoice_id", &record.invoice_id),
            ("invoice_status", &record.invoice_status),
            ("invoice_currency", &record.invoice_currency),
            ("paid_amount_currency", &record.paid_amount_currency),
        ] {
            if value.trim().is_empty() {
                violations.push(format!("record {index}: {column} is empty"));
            }
        }

        for (column, amount) in [
            ("invoice_amount", record.invoice_amount),
            ("actual_paid_amount", record.actual_paid_amount),
        ] {
            if let Some(amount) = amount {
                if amount < Decimal::ZERO {
                    violations.push(format!("record {index}: {column} is negative ({amount})"));
                }
            }
        }

        if invoice.days_past_due < 0 {
            violations.push(format!(
                "record {index}: days_past_due is negative ({})",
                invoice.days_past_due
            ));
        }

        if invoice.shortage_flag && invoice.shortage_amount != invoice.delta {
            violations.push(format!(
                "record {index}: shortage_amount {} does not equal delta {}",
                invoice.shortage_amount, invoice.delta
            ));
        }
        if !invoice.shortage_flag && invoice.shortage_amount != Decimal::ZERO {
            violations.push(format!(
                "record {index}: shortage_amount {} on an unflagged record",
                invoice.shortage_amount
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ShortageError::SchemaViolations(violations))
    }
}

fn validate_currency(records: &[EvaluatedInvoice], expected: &str) -> Result<()> {
    for invoice in records {
        let record = &invoice.record;
        if !record.paid_amount_currency.eq_ignore_ascii_case(expected)
            || !record.invoice_currency.eq_ignore_ascii_case(expected)
        {
            return Err(ShortageError::CurrencyNonCompliant(expected.to_uppercase()));
        }
    }
    Ok(())
}

fn validate_dates(records: &[EvaluatedInvoice], today: NaiveDate) -> Result<()> {
    check_date_column(records, "invoice_date", |r| r.invoice_date, today)?;
    check_date_column(records, "payment_due_date", |r| r.payment_due_date, today)?;
    check_date_column(
        records,
        "invoice_creation_date",
        |r| r.invoice_creation_date,
        today,
    )?;
    Ok(())
}

fn check_date_column<F>(
    records: &[EvaluatedInvoice],
    column: &'static str,
    extract: F,
    today: NaiveDate,
) -> Result<()>
where
    F: Fn(&InvoiceRecord) -> Option<NaiveDate>,
{
    if records.iter().any(|r| extract(&r.record).is_none()) {
        return Err(ShortageError::InvalidDateColumn(column));
    }
    if records
        .iter()
        .any(|r| extract(&r.record).is_some_and(|date| date > today))
    {
        return Err(ShortageError::FutureDatedColumn(column));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateFormat;
    use crate::schema::AgeBucket;
    use chrono::Days;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn settings() -> SettingsConfig {
        SettingsConfig {
            input_raw_dir: PathBuf::from("data/raw"),
            output_processed_dir: PathBuf::from("data/processed"),
            date_format: DateFormat::DayFirst,
            aging_days_threshold: 90,
            currency_expected: "USD".to_string(),
            round_decimals: 2,
            partition_by_year: true,
            tolerance_small_delta: dec!(0.01),
        }
    }

    fn rules() -> RulesConfig {
        RulesConfig {
            eligible_statuses: BTreeSet::from(["PAID".to_string()]),
            shortage_required_flags: vec![
                "has_deductions".to_string(),
                "child_invoice_present".to_string(),
            ],
            use_strict_currency_check: true,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn valid_invoice() -> EvaluatedInvoice {
        let today = today();
        EvaluatedInvoice {
            record: InvoiceRecord {
                invoice_id: "INV-001".to_string(),
                invoice_date: Some(today),
                payment_due_date: today.checked_sub_days(Days::new(5)),
                invoice_creation_date: today.checked_sub_days(Days::new(10)),
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
            payment_year: Some(2025),
            shortage_flag: true,
            shortage_amount: dec!(5.00),
            days_past_due: 5,
            age_bucket: AgeBucket::Current,
        }
    }

    #[test]
    fn test_checks_pass_for_valid_data() {
        let records = vec![valid_invoice()];
        run_quality_checks(&records, &settings(), &rules(), today()).unwrap();
    }

    #[test]
    fn test_empty_record_set_fails() {
        let err = run_quality_checks(&[], &settings(), &rules(), today()).unwrap_err();
        assert!(matches!(err, ShortageError::EmptyRecordSet));
    }

    #[test]
    fn test_schema_violations_are_collected_not_first_only() {
        let mut first = valid_invoice();
        first.record.invoice_amount = Some(dec!(-1.00));
        let mut second = valid_invoice();
        second.record.invoice_id = "  ".to_string();
        second.shortage_flag = false;
        second.shortage_amount = dec!(5.00);

        let err =
            run_quality_checks(&[first, second], &settings(), &rules(), today()).unwrap_err();
        match err {
            ShortageError::SchemaViolations(violations) => {
                assert_eq!(violations.len(), 3);
                assert!(violations[0].contains("invoice_amount is negative"));
                assert!(violations[1].contains("invoice_id is empty"));
                assert!(violations[2].contains("unflagged record"));
            }
            other => panic!("expected SchemaViolations, got {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_shortage_amount_is_a_violation() {
        let mut invoice = valid_invoice();
        invoice.shortage_amount = dec!(4.99);

        let err = run_quality_checks(&[invoice], &settings(), &rules(), today()).unwrap_err();
        assert!(matches!(err, ShortageError::SchemaViolations(_)));
    }

    #[test]
    fn test_currency_mismatch_fails_batch() {
        let valid = valid_invoice();
        let mut offender = valid_invoice();
        offender.record.paid_amount_currency = "EUR".to_string();

        let err =
            run_quality_checks(&[valid, offender], &settings(), &rules(), today()).unwrap_err();
        assert!(matches!(err, ShortageError::CurrencyNonCompliant(_)));
    }

    #[test]
    fn test_currency_comparison_is_case_insensitive() {
        let mut invoice = valid_invoice();
        invoice.record.invoice_currency = "usd".to_string();
        invoice.record.paid_amount_currency = "Usd".to_string();

        run_quality_checks(&[invoice], &settings(), &rules(), today()).unwrap();
    }

    #[test]
    fn test_non_strict_rules_skip_currency_check() {
        let mut invoice = valid_invoice();
        invoice.record.paid_amount_currency = "EUR".to_string();
        let mut rules = rules();
        rules.use_strict_currency_check = false;

        run_quality_checks(&[invoice], &settings(), &rules, today()).unwrap();
    }

    #[test]
    fn test_future_due_date_fails() {
        let mut invoice = valid_invoice();
        invoice.record.payment_due_date = today().checked_add_days(Days::new(1));

        let err = run_quality_checks(&[invoice], &settings(), &rules(), today()).unwrap_err();
        assert!(matches!(
            err,
            ShortageError::FutureDatedColumn("payment_due_date")
        ));
    }

    #[test]
    fn test_unparseable_date_fails_before_future_check() {
        let mut invoice = valid_invoice();
        invoice.record.invoice_date = None;

        let err = run_quality_checks(&[invoice], &settings(), &rules(), today()).unwrap_err();
        assert!(matches!(err, ShortageError::InvalidDateColumn("invoice_date")));
    }
}
