//! CSV exports

use csv::WriterBuilder;
use serde::Serialize;

use crate::backend::error::BackendError;
use crate::backend::reports::db::Defaulter;
use crate::shared::Payment;

#[derive(Serialize)]
struct PaymentRow<'a> {
    receipt_number: &'a str,
    paid_at: String,
    admission_number: &'a str,
    amount: String,
    method: &'a str,
    reference: Option<&'a str>,
    in_kind_item: Option<&'a str>,
    in_kind_quantity: Option<f64>,
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct DefaulterRow<'a> {
    admission_number: &'a str,
    name: &'a str,
    grade_level: &'a str,
    parent_name: &'a str,
    parent_phone: &'a str,
    total_fees: String,
    fees_paid: String,
    remaining_balance: String,
    percent_paid: String,
}

fn csv_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::internal(format!("failed to write CSV: {}", e))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, BackendError> {
    let bytes = writer.into_inner().map_err(csv_error)?;
    String::from_utf8(bytes).map_err(csv_error)
}

pub fn payments_csv(payments: &[Payment]) -> Result<String, BackendError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for payment in payments {
        writer
            .serialize(PaymentRow {
                receipt_number: &payment.receipt_number,
                paid_at: payment.paid_at.to_rfc3339(),
                admission_number: &payment.admission_number,
                amount: format!("{:.2}", payment.amount),
                method: payment.method.as_str(),
                reference: payment.reference.as_deref(),
                in_kind_item: payment.in_kind.as_ref().map(|k| k.item.as_str()),
                in_kind_quantity: payment.in_kind.as_ref().map(|k| k.quantity),
                notes: payment.notes.as_deref(),
            })
            .map_err(csv_error)?;
    }
    finish(writer)
}

pub fn defaulters_csv(defaulters: &[Defaulter]) -> Result<String, BackendError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for defaulter in defaulters {
        writer
            .serialize(DefaulterRow {
                admission_number: &defaulter.admission_number,
                name: &defaulter.name,
                grade_level: &defaulter.grade_level,
                parent_name: &defaulter.parent_name,
                parent_phone: &defaulter.parent_phone,
                total_fees: format!("{:.2}", defaulter.total_fees),
                fees_paid: format!("{:.2}", defaulter.fees_paid),
                remaining_balance: format!("{:.2}", defaulter.remaining_balance),
                percent_paid: format!("{:.1}", defaulter.percent_paid()),
            })
            .map_err(csv_error)?;
    }
    finish(writer)
}
