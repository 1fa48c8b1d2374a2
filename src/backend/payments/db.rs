/**
 * Payment Database Operations
 *
 * The payments table is append-only (enforced by triggers), so this module
 * only inserts and reads.
 */

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::backend::error::{is_unique_violation, BackendError};
use crate::shared::payment::InKindDetails;
use crate::shared::{Payment, PaymentMethod};

const PAYMENT_COLUMNS: &str = "id, student_id, admission_number, amount, method, reference, in_kind_item, \
     in_kind_quantity, receipt_number, notes, recorded_by, paid_at, created_at";

fn payment_from_row(row: &SqliteRow) -> Result<Payment, sqlx::Error> {
    let method: String = row.try_get("method")?;
    let item: Option<String> = row.try_get("in_kind_item")?;
    let quantity: Option<f64> = row.try_get("in_kind_quantity")?;

    Ok(Payment {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        admission_number: row.try_get("admission_number")?,
        amount: row.try_get("amount")?,
        method: PaymentMethod::from_str(&method)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown payment method '{}'", method).into()))?,
        reference: row.try_get("reference")?,
        in_kind: item.map(|item| InKindDetails {
            item,
            quantity: quantity.unwrap_or_default(),
        }),
        receipt_number: row.try_get("receipt_number")?,
        notes: row.try_get("notes")?,
        recorded_by: row.try_get("recorded_by")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Payment about to be inserted
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub admission_number: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub in_kind: Option<InKindDetails>,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

/// Receipt number of the form `RCT-20250131-9F3A0C1B`
pub fn generate_receipt_number(id: Uuid, at: DateTime<Utc>) -> String {
    let suffix = id.simple().to_string()[..8].to_uppercase();
    format!("RCT-{}-{}", at.format("%Y%m%d"), suffix)
}

fn duplicate_reference(method: PaymentMethod, reference: &str) -> BackendError {
    BackendError::conflict(format!(
        "Reference {} has already been recorded for a {} payment",
        reference,
        method.label()
    ))
}

/// Insert a payment on the caller's connection (normally a transaction)
pub async fn insert_payment(conn: &mut SqliteConnection, new: &NewPayment) -> Result<Payment, BackendError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO payments
            (id, student_id, admission_number, amount, method, reference, in_kind_item, in_kind_quantity,
             receipt_number, notes, recorded_by, paid_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {PAYMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(new.student_id)
    .bind(&new.admission_number)
    .bind(new.amount)
    .bind(new.method.as_str())
    .bind(new.reference.as_deref())
    .bind(new.in_kind.as_ref().map(|k| k.item.trim().to_string()))
    .bind(new.in_kind.as_ref().map(|k| k.quantity))
    .bind(generate_receipt_number(id, now))
    .bind(new.notes.as_deref())
    .bind(new.recorded_by)
    .bind(new.paid_at)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match &new.reference {
        Some(reference) if is_unique_violation(&e) => duplicate_reference(new.method, reference),
        _ => e.into(),
    })?;

    Ok(payment_from_row(&row)?)
}

/// Fail with 409 when a reference is already recorded for the method
pub async fn ensure_reference_unused(
    pool: &SqlitePool,
    method: PaymentMethod,
    reference: &str,
) -> Result<(), BackendError> {
    let exists = sqlx::query("SELECT 1 FROM payments WHERE method = ? AND reference = ?")
        .bind(method.as_str())
        .bind(reference)
        .fetch_optional(pool)
        .await?
        .is_some();

    if exists {
        return Err(duplicate_reference(method, reference));
    }
    Ok(())
}

pub async fn get_payment(pool: &SqlitePool, id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(payment_from_row).transpose()
}

/// Filters for the payment list; bounds are inclusive of `from`, exclusive of `to`
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub admission_number: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_payments(pool: &SqlitePool, filter: &PaymentFilter) -> Result<Vec<Payment>, sqlx::Error> {
    let method = filter.method.map(|m| m.as_str());
    let admission = filter.admission_number.as_deref().map(str::trim);

    let rows = sqlx::query(&format!(
        r#"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE (? IS NULL OR paid_at >= ?)
          AND (? IS NULL OR paid_at < ?)
          AND (? IS NULL OR method = ?)
          AND (? IS NULL OR admission_number = ?)
        ORDER BY paid_at DESC, created_at DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(filter.from)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.to)
    .bind(method)
    .bind(method)
    .bind(admission)
    .bind(admission)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(payment_from_row).collect()
}

/// All payments of a student, newest first
pub async fn list_payments_for_student(pool: &SqlitePool, student_id: Uuid) -> Result<Vec<Payment>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE student_id = ? ORDER BY paid_at DESC, created_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(payment_from_row).collect()
}

pub async fn last_payment_for_student(pool: &SqlitePool, student_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE student_id = ? ORDER BY paid_at DESC, created_at DESC LIMIT 1"
    ))
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(payment_from_row).transpose()
}
