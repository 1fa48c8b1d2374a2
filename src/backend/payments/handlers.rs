/**
 * Payment Handlers
 *
 * - `POST /api/payments` - record a payment (staff), returns 201 with the receipt
 * - `GET  /api/payments` - list with `from`, `to`, `method`, `admission_number`, `limit`, `offset`
 * - `GET  /api/payments/{id}`
 * - `GET  /api/payments/{id}/receipt` - PDF receipt (staff or the student's parent)
 * - `GET  /api/students/{admission_number}/payments` - payment history (staff)
 *
 * A confirmation SMS goes to the parent after a payment is committed.
 */

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::{AuthUser, StaffUser};
use crate::backend::notifications::{payment_confirmation_message, spawn_payment_confirmation};
use crate::backend::parents::ensure_can_view;
use crate::backend::payments::db::{self, PaymentFilter};
use crate::backend::payments::receipt::render_receipt_pdf;
use crate::backend::payments::recorder::record_payment as post_recorded_payment;
use crate::backend::server::state::AppState;
use crate::backend::students::db::get_student_by_id;
use crate::backend::students::require_student;
use crate::shared::payment::PaymentReceipt;
use crate::shared::{Payment, PaymentMethod, RecordPaymentRequest};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

pub async fn record_payment(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Json(request): Json<RecordPaymentRequest>,
) -> BackendResult<(StatusCode, Json<PaymentReceipt>)> {
    let receipt = post_recorded_payment(&state.db_pool, &request, Some(user.user_id)).await?;

    if let Some(student) = get_student_by_id(&state.db_pool, receipt.payment.student_id).await? {
        let message = payment_confirmation_message(
            &state.config.school_name,
            &receipt.student_name,
            &receipt.payment,
            &receipt.fee_details,
        );
        spawn_payment_confirmation(state.sms.clone(), student.parent_phone, message);
    }

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub method: Option<String>,
    pub admission_number: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    StaffUser(_user): StaffUser,
    Query(params): Query<PaymentListParams>,
) -> BackendResult<Json<Vec<Payment>>> {
    let method = match params.method.as_deref() {
        Some(raw) => Some(
            PaymentMethod::from_str(raw)
                .ok_or_else(|| BackendError::validation("method", format!("Unknown payment method '{}'", raw)))?,
        ),
        None => None,
    };

    let filter = PaymentFilter {
        from: params.from,
        to: params.to,
        method,
        admission_number: params.admission_number,
        limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(0).max(0),
    };
    Ok(Json(db::list_payments(&state.db_pool, &filter).await?))
}

async fn require_payment(state: &AppState, id: Uuid) -> BackendResult<Payment> {
    db::get_payment(&state.db_pool, id)
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Payment {} not found", id)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    StaffUser(_user): StaffUser,
    Path(id): Path<Uuid>,
) -> BackendResult<Json<Payment>> {
    Ok(Json(require_payment(&state, id).await?))
}

pub async fn download_receipt(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> BackendResult<impl IntoResponse> {
    let payment = require_payment(&state, id).await?;
    let student = get_student_by_id(&state.db_pool, payment.student_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Student not found"))?;
    ensure_can_view(&user, &student)?;

    let pdf = render_receipt_pdf(&state.config.school_name, &payment, &student, &student.fee_details)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", payment.receipt_number),
            ),
        ],
        pdf,
    ))
}

pub async fn student_payments(
    State(state): State<AppState>,
    StaffUser(_user): StaffUser,
    Path(admission_number): Path<String>,
) -> BackendResult<Json<Vec<Payment>>> {
    let student = require_student(&state.db_pool, &admission_number).await?;
    Ok(Json(db::list_payments_for_student(&state.db_pool, student.id).await?))
}
