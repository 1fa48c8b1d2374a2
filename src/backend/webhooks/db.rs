/**
 * Pending Payment Database Operations
 *
 * State changes are guarded with `WHERE status = 'pending'` so a payment can
 * leave the pending state exactly once, even under concurrent requests.
 */

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::shared::{PendingPayment, PendingPaymentStatus};

const PENDING_COLUMNS: &str = "id, gateway_reference, amount, currency, channel, payer_email, payer_phone, \
     admission_number, student_id, status, raw_payload, received_at, confirmed_by, confirmed_at, \
     payment_id, rejection_reason";

fn pending_from_row(row: &SqliteRow) -> Result<PendingPayment, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let raw: String = row.try_get("raw_payload")?;

    Ok(PendingPayment {
        id: row.try_get("id")?,
        gateway_reference: row.try_get("gateway_reference")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        channel: row.try_get("channel")?,
        payer_email: row.try_get("payer_email")?,
        payer_phone: row.try_get("payer_phone")?,
        admission_number: row.try_get("admission_number")?,
        student_id: row.try_get("student_id")?,
        status: PendingPaymentStatus::from_str(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown pending status '{}'", status).into()))?,
        raw_payload: serde_json::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        received_at: row.try_get("received_at")?,
        confirmed_by: row.try_get("confirmed_by")?,
        confirmed_at: row.try_get("confirmed_at")?,
        payment_id: row.try_get("payment_id")?,
        rejection_reason: row.try_get("rejection_reason")?,
    })
}

/// Gateway transaction about to be staged
#[derive(Debug, Clone)]
pub struct NewPending {
    pub gateway_reference: String,
    pub amount: f64,
    pub currency: String,
    pub channel: Option<String>,
    pub payer_email: Option<String>,
    pub payer_phone: Option<String>,
    pub admission_number: Option<String>,
    pub student_id: Option<Uuid>,
    pub status: PendingPaymentStatus,
    pub raw_payload: serde_json::Value,
}

/// Insert unless the gateway reference is already known.
/// Returns `None` for a duplicate delivery.
pub async fn insert_pending(pool: &SqlitePool, new: &NewPending) -> Result<Option<PendingPayment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO pending_payments
            (id, gateway_reference, amount, currency, channel, payer_email, payer_phone,
             admission_number, student_id, status, raw_payload, received_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(gateway_reference) DO NOTHING
        RETURNING {PENDING_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&new.gateway_reference)
    .bind(new.amount)
    .bind(&new.currency)
    .bind(new.channel.as_deref())
    .bind(new.payer_email.as_deref())
    .bind(new.payer_phone.as_deref())
    .bind(new.admission_number.as_deref())
    .bind(new.student_id)
    .bind(new.status.as_str())
    .bind(new.raw_payload.to_string())
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(pending_from_row).transpose()
}

pub async fn get_pending(pool: &SqlitePool, id: Uuid) -> Result<Option<PendingPayment>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {PENDING_COLUMNS} FROM pending_payments WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(pending_from_row).transpose()
}

pub async fn count_pending_by_reference(pool: &SqlitePool, reference: &str) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM pending_payments WHERE gateway_reference = ?")
        .bind(reference)
        .fetch_one(pool)
        .await?;
    row.try_get("n")
}

/// Newest first; `status = None` lists everything
pub async fn list_pending(
    pool: &SqlitePool,
    status: Option<PendingPaymentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PendingPayment>, sqlx::Error> {
    let status = status.map(|s| s.as_str());
    let rows = sqlx::query(&format!(
        r#"
        SELECT {PENDING_COLUMNS} FROM pending_payments
        WHERE (? IS NULL OR status = ?)
        ORDER BY received_at DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(status)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(pending_from_row).collect()
}

/// Attach a student to a pending payment
pub async fn link_student(
    pool: &SqlitePool,
    id: Uuid,
    student_id: Uuid,
    admission_number: &str,
) -> Result<Option<PendingPayment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE pending_payments SET student_id = ?, admission_number = ?
        WHERE id = ? AND status = 'pending'
        RETURNING {PENDING_COLUMNS}
        "#
    ))
    .bind(student_id)
    .bind(admission_number)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(pending_from_row).transpose()
}

/// Mark confirmed inside the confirming transaction
pub async fn mark_confirmed(
    conn: &mut SqliteConnection,
    id: Uuid,
    payment_id: Uuid,
    confirmed_by: Uuid,
    at: DateTime<Utc>,
) -> Result<Option<PendingPayment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE pending_payments SET status = 'confirmed', payment_id = ?, confirmed_by = ?, confirmed_at = ?
        WHERE id = ? AND status = 'pending'
        RETURNING {PENDING_COLUMNS}
        "#
    ))
    .bind(payment_id)
    .bind(confirmed_by)
    .bind(at)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(pending_from_row).transpose()
}

pub async fn mark_rejected(
    pool: &SqlitePool,
    id: Uuid,
    reason: &str,
    rejected_by: Uuid,
) -> Result<Option<PendingPayment>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE pending_payments SET status = 'rejected', rejection_reason = ?, confirmed_by = ?, confirmed_at = ?
        WHERE id = ? AND status = 'pending'
        RETURNING {PENDING_COLUMNS}
        "#
    ))
    .bind(reason)
    .bind(rejected_by)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(pending_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;

    fn staged(reference: &str) -> NewPending {
        NewPending {
            gateway_reference: reference.to_string(),
            amount: 2500.0,
            currency: "KES".to_string(),
            channel: Some("mobile_money".to_string()),
            payer_email: Some("mary@example.com".to_string()),
            payer_phone: None,
            admission_number: None,
            student_id: None,
            status: PendingPaymentStatus::Pending,
            raw_payload: serde_json::json!({ "event": "charge.success" }),
        }
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_ignored() {
        let pool = memory_pool().await.unwrap();
        let first = insert_pending(&pool, &staged("PSK_1")).await.unwrap();
        assert!(first.is_some());
        assert!(insert_pending(&pool, &staged("PSK_1")).await.unwrap().is_none());
        assert_eq!(count_pending_by_reference(&pool, "PSK_1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reject_only_once() {
        let pool = memory_pool().await.unwrap();
        let pending = insert_pending(&pool, &staged("PSK_2")).await.unwrap().unwrap();
        let staff = Uuid::new_v4();

        let rejected = mark_rejected(&pool, pending.id, "Duplicate charge", staff).await.unwrap().unwrap();
        assert_eq!(rejected.status, PendingPaymentStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Duplicate charge"));
        assert!(mark_rejected(&pool, pending.id, "again", staff).await.unwrap().is_none());

        let listed = list_pending(&pool, Some(PendingPaymentStatus::Pending), 50, 0).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(list_pending(&pool, None, 50, 0).await.unwrap().len(), 1);
    }
}
