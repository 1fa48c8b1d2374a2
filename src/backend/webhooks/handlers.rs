/**
 * Webhook and Pending Payment Handlers
 *
 * - `POST /api/webhooks/payments` - gateway callback (public, signed)
 * - `GET  /api/pending-payments?status=` - list (staff)
 * - `POST /api/pending-payments/{id}/link` - attach a student (staff)
 * - `POST /api/pending-payments/{id}/confirm` - post to the balance (staff)
 * - `POST /api/pending-payments/{id}/reject` - reject with a reason (staff)
 */

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::middleware::StaffUser;
use crate::backend::notifications::{payment_confirmation_message, spawn_payment_confirmation};
use crate::backend::server::state::AppState;
use crate::backend::webhooks::reconciler::{self, WebhookOutcome};
use crate::backend::webhooks::signature::{self, SIGNATURE_HEADER};
use crate::backend::webhooks::db;
use crate::shared::payment::PaymentReceipt;
use crate::shared::pending::{LinkPendingPaymentRequest, RejectPendingPaymentRequest};
use crate::shared::{AppConfig, PendingPayment, PendingPaymentStatus};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// `staged`, `failed`, `duplicate` or `ignored`
    pub outcome: &'static str,
}

/// The gateway retries anything but 2xx, so every verified event is acknowledged
pub async fn payment_webhook(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: Bytes,
) -> BackendResult<Json<WebhookAck>> {
    let Some(secret) = config.gateway_secret.as_deref() else {
        tracing::error!("Payment webhook received but PAYSTACK_SECRET_KEY is not configured");
        return Err(BackendError::unavailable("Payment gateway is not configured"));
    };

    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !signature::verify(secret, &body, provided) {
        tracing::warn!("Rejected webhook with invalid signature ({} bytes)", body.len());
        return Err(BackendError::Unauthorized);
    }

    let outcome = match reconciler::receive_event(&pool, &body).await? {
        WebhookOutcome::Staged(_) => "staged",
        WebhookOutcome::Failed(_) => "failed",
        WebhookOutcome::Duplicate => "duplicate",
        WebhookOutcome::Ignored(_) => "ignored",
    };
    Ok(Json(WebhookAck { received: true, outcome }))
}

#[derive(Debug, Deserialize)]
pub struct PendingListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_pending(
    State(pool): State<SqlitePool>,
    StaffUser(_user): StaffUser,
    Query(params): Query<PendingListParams>,
) -> BackendResult<Json<Vec<PendingPayment>>> {
    let status = match params.status.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            PendingPaymentStatus::from_str(raw)
                .ok_or_else(|| BackendError::validation("status", format!("Unknown status '{}'", raw)))?,
        ),
    };
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);
    Ok(Json(db::list_pending(&pool, status, limit, offset).await?))
}

pub async fn link_pending(
    State(pool): State<SqlitePool>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<LinkPendingPaymentRequest>,
) -> BackendResult<Json<PendingPayment>> {
    let linked = reconciler::link(&pool, id, &request.admission_number).await?;
    tracing::info!("{} linked pending payment {}", user.email, linked.gateway_reference);
    Ok(Json(linked))
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub pending: PendingPayment,
    pub receipt: PaymentReceipt,
}

pub async fn confirm_pending(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
) -> BackendResult<Json<ConfirmResponse>> {
    let confirmation = reconciler::confirm(&state.db_pool, id, user.user_id).await?;

    let message = payment_confirmation_message(
        &state.config.school_name,
        &confirmation.student.name,
        &confirmation.receipt.payment,
        &confirmation.receipt.fee_details,
    );
    spawn_payment_confirmation(state.sms.clone(), confirmation.student.parent_phone.clone(), message);

    Ok(Json(ConfirmResponse {
        pending: confirmation.pending,
        receipt: confirmation.receipt,
    }))
}

pub async fn reject_pending(
    State(pool): State<SqlitePool>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectPendingPaymentRequest>,
) -> BackendResult<Json<PendingPayment>> {
    let rejected = reconciler::reject(&pool, id, &request.reason, user.user_id).await?;
    tracing::info!("{} rejected pending payment {}", user.email, rejected.gateway_reference);
    Ok(Json(rejected))
}
