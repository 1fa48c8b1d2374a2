//! Payment recorder
//!
//! `post_payment` inserts the payment and applies it to the student's fee
//! details on one connection; callers wrap it in a transaction. Staff-recorded
//! payments go through `record_payment`, confirmed gateway payments through
//! the webhook reconciler, and both end up in `post_payment`.
//!
//! Reads (student, fee structure, reference check) happen before the
//! transaction starts so the transaction only writes.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::backend::error::BackendResult;
use crate::backend::fees::initial_fee_total;
use crate::backend::payments::db::{ensure_reference_unused, insert_payment, NewPayment};
use crate::backend::students::{apply_payment, require_student};
use crate::shared::payment::PaymentReceipt;
use crate::shared::{FeeDetails, Payment, PaymentMethod, RecordPaymentRequest};

/// Payment row together with the student's updated fee details
#[derive(Debug, Clone)]
pub struct PostedPayment {
    pub payment: Payment,
    pub fee_details: FeeDetails,
}

/// Insert a payment and update the student's balance
pub async fn post_payment(
    conn: &mut SqliteConnection,
    draft: &NewPayment,
    fee_total: Option<f64>,
) -> BackendResult<PostedPayment> {
    let payment = insert_payment(conn, draft).await?;
    let fee_details = apply_payment(conn, draft.student_id, draft.amount, fee_total).await?;
    Ok(PostedPayment { payment, fee_details })
}

/// Validate and record a staff-submitted payment
pub async fn record_payment(
    pool: &SqlitePool,
    request: &RecordPaymentRequest,
    recorded_by: Option<Uuid>,
) -> BackendResult<PaymentReceipt> {
    request.validate()?;

    let student = require_student(pool, &request.admission_number).await?;
    let fee_total = initial_fee_total(pool, &student).await?;

    let reference = request.clean_reference();
    if let Some(reference) = &reference {
        ensure_reference_unused(pool, request.method, reference).await?;
    }

    let draft = NewPayment {
        student_id: student.id,
        admission_number: student.admission_number.clone(),
        amount: request.amount,
        method: request.method,
        reference,
        in_kind: match request.method {
            PaymentMethod::InKind => request.in_kind.clone(),
            _ => None,
        },
        notes: request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        recorded_by,
        paid_at: request.paid_at.unwrap_or_else(Utc::now),
    };

    let mut tx = pool.begin().await?;
    let posted = post_payment(&mut tx, &draft, fee_total).await?;
    tx.commit().await?;

    tracing::info!(
        "Recorded {} payment {} of {} for {} (balance {})",
        posted.payment.method.as_str(),
        posted.payment.receipt_number,
        posted.payment.amount,
        student.admission_number,
        posted.fee_details.remaining_balance
    );

    Ok(PaymentReceipt {
        payment: posted.payment,
        student_name: student.name,
        fee_details: posted.fee_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;
    use crate::backend::error::BackendError;
    use crate::backend::fees::db::upsert_structure;
    use crate::backend::payments::db::list_payments_for_student;
    use crate::backend::students::db::insert_student;
    use crate::shared::fees::UpsertFeeStructureRequest;
    use crate::shared::student::CreateStudentRequest;
    use crate::shared::{BoardingStatus, FeeComponent};
    use axum::http::StatusCode;

    async fn setup(initial_total: Option<f64>) -> SqlitePool {
        let pool = memory_pool().await.unwrap();
        upsert_structure(
            &pool,
            &UpsertFeeStructureRequest {
                grade_level: "Grade 3".to_string(),
                boarding_status: BoardingStatus::Day,
                has_transport: false,
                components: vec![FeeComponent { name: "Tuition".to_string(), amount: 15000.0 }],
                transport_routes: Default::default(),
                academic_year: None,
            },
        )
        .await
        .unwrap();
        insert_student(
            &pool,
            &CreateStudentRequest {
                admission_number: "ADM001".to_string(),
                name: "Achieng Otieno".to_string(),
                grade_level: "Grade 3".to_string(),
                boarding_status: BoardingStatus::Day,
                has_transport: false,
                transport_route: None,
                parent_name: "Mary Otieno".to_string(),
                parent_phone: "0712345678".to_string(),
                parent_email: None,
            },
            initial_total,
        )
        .await
        .unwrap();
        pool
    }

    fn cash(amount: f64) -> RecordPaymentRequest {
        RecordPaymentRequest {
            admission_number: "ADM001".to_string(),
            amount,
            method: PaymentMethod::Cash,
            reference: None,
            in_kind: None,
            notes: None,
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn test_first_payment_initialises_total() {
        let pool = setup(None).await;
        let receipt = record_payment(&pool, &cash(5000.0), None).await.unwrap();

        assert_eq!(receipt.fee_details.total_fees, 15000.0);
        assert_eq!(receipt.fee_details.fees_paid, 5000.0);
        assert_eq!(receipt.fee_details.remaining_balance, 10000.0);
        assert!(receipt.payment.receipt_number.starts_with("RCT-"));
    }

    #[tokio::test]
    async fn test_balance_decreases_by_amount() {
        let pool = setup(Some(15000.0)).await;
        let before = require_student(&pool, "ADM001").await.unwrap().fee_details;
        let receipt = record_payment(&pool, &cash(2500.0), None).await.unwrap();
        assert_eq!(receipt.fee_details.remaining_balance, before.remaining_balance - 2500.0);
    }

    #[tokio::test]
    async fn test_duplicate_reference_conflicts() {
        let pool = setup(Some(15000.0)).await;
        let mut request = cash(1000.0);
        request.method = PaymentMethod::Mpesa;
        request.reference = Some("qhx12ab".to_string());
        record_payment(&pool, &request, None).await.unwrap();

        request.reference = Some("QHX12AB ".to_string());
        let err = record_payment(&pool, &request, None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let student = require_student(&pool, "ADM001").await.unwrap();
        assert_eq!(student.fee_details.fees_paid, 1000.0);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_balance_untouched() {
        let pool = setup(Some(15000.0)).await;
        let student = require_student(&pool, "ADM001").await.unwrap();
        let draft = NewPayment {
            student_id: student.id,
            admission_number: student.admission_number.clone(),
            amount: 1000.0,
            method: PaymentMethod::Bank,
            reference: Some("SLIP-1".to_string()),
            in_kind: None,
            notes: None,
            recorded_by: None,
            paid_at: Utc::now(),
        };

        let mut tx = pool.begin().await.unwrap();
        post_payment(&mut tx, &draft, None).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let err = post_payment(&mut tx, &draft, None).await.unwrap_err();
        drop(tx);
        assert!(matches!(err, BackendError::Conflict { .. }));

        let student = require_student(&pool, "ADM001").await.unwrap();
        assert_eq!(student.fee_details.fees_paid, 1000.0);
        assert_eq!(list_payments_for_student(&pool, student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_student() {
        let pool = setup(None).await;
        let mut request = cash(100.0);
        request.admission_number = "ADM404".to_string();
        let err = record_payment(&pool, &request, None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_concurrent_payments_do_not_lose_updates() {
        let pool = setup(Some(15000.0)).await;
        let (first, second) = (cash(1200.0), cash(800.0));
        let (a, b) = tokio::join!(
            record_payment(&pool, &first, None),
            record_payment(&pool, &second, None)
        );
        a.unwrap();
        b.unwrap();

        let student = require_student(&pool, "ADM001").await.unwrap();
        assert_eq!(student.fee_details.fees_paid, 2000.0);
        assert_eq!(student.fee_details.remaining_balance, 13000.0);
    }
}
