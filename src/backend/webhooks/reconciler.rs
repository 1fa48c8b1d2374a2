//! Webhook Reconciler
//!
//! Gateway events are staged as pending payments and only reach a student's
//! balance when staff confirm them.
//!
//! ```text
//! received --bad signature--> rejected (nothing stored, 401)
//! received --charge.success--> pending (deduplicated by gateway reference)
//! received --charge.failed---> failed
//! pending  --confirm--> confirmed (payment posted, balance updated)
//! pending  --reject---> rejected
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::fees::initial_fee_total;
use crate::backend::payments::db::{ensure_reference_unused, NewPayment};
use crate::backend::payments::post_payment;
use crate::backend::students::db::{get_student_by_admission, get_student_by_id};
use crate::backend::students::require_student;
use crate::backend::webhooks::db::{self, NewPending};
use crate::shared::payment::PaymentReceipt;
use crate::shared::{PaymentMethod, PendingPayment, PendingPaymentStatus, Student};

/// `data` of a charge event
#[derive(Debug, Deserialize)]
pub struct GatewayCharge {
    pub reference: String,
    /// Minor currency units
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub customer: Option<GatewayCustomer>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayCustomer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn default_currency() -> String {
    "KES".to_string()
}

impl GatewayCharge {
    /// Admission number from the metadata object, or from a JSON-encoded
    /// metadata string
    fn admission_number(&self) -> Option<String> {
        let metadata = match &self.metadata {
            serde_json::Value::String(raw) => serde_json::from_str(raw).ok()?,
            other => other.clone(),
        };
        metadata
            .get("admission_number")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }
}

/// What happened to an incoming event
#[derive(Debug)]
pub enum WebhookOutcome {
    Staged(PendingPayment),
    Failed(PendingPayment),
    /// Reference seen before; nothing written
    Duplicate,
    Ignored(String),
}

/// Stage a verified gateway event
pub async fn receive_event(pool: &SqlitePool, payload: &[u8]) -> BackendResult<WebhookOutcome> {
    let raw: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|_| BackendError::validation("body", "Webhook body is not valid JSON"))?;
    let event = raw.get("event").and_then(|e| e.as_str()).unwrap_or_default();

    let status = match event {
        "charge.success" => PendingPaymentStatus::Pending,
        "charge.failed" => PendingPaymentStatus::Failed,
        other => {
            tracing::info!("Ignoring gateway event {}", other);
            return Ok(WebhookOutcome::Ignored(other.to_string()));
        }
    };

    let charge: GatewayCharge = serde_json::from_value(raw.get("data").cloned().unwrap_or_default())
        .map_err(|e| BackendError::validation("data", format!("Unrecognised charge payload: {}", e)))?;
    if charge.amount <= 0 {
        return Err(BackendError::validation("data.amount", "Amount must be greater than zero"));
    }
    let reference = charge.reference.trim().to_string();
    if reference.is_empty() {
        return Err(BackendError::validation("data.reference", "Reference is required"));
    }

    let admission_number = charge.admission_number();
    let student = match &admission_number {
        Some(admission) => get_student_by_admission(pool, admission).await?,
        None => None,
    };
    if admission_number.is_some() && student.is_none() {
        tracing::warn!(
            "Gateway payment {} names unknown admission number {:?}",
            reference,
            admission_number
        );
    }

    let customer = charge.customer.as_ref();
    let new = NewPending {
        gateway_reference: reference,
        amount: charge.amount as f64 / 100.0,
        currency: charge.currency.to_uppercase(),
        channel: charge.channel.clone(),
        payer_email: customer.and_then(|c| c.email.clone()),
        payer_phone: customer.and_then(|c| c.phone.clone()),
        admission_number,
        student_id: student.as_ref().map(|s| s.id),
        status,
        raw_payload: raw,
    };

    let Some(pending) = db::insert_pending(pool, &new).await? else {
        tracing::info!("Duplicate gateway delivery {} ignored", new.gateway_reference);
        return Ok(WebhookOutcome::Duplicate);
    };

    tracing::info!(
        "Gateway payment {} of {} staged as {} (linked: {})",
        pending.gateway_reference,
        pending.amount,
        pending.status.as_str(),
        pending.student_id.is_some()
    );

    Ok(match pending.status {
        PendingPaymentStatus::Failed => WebhookOutcome::Failed(pending),
        _ => WebhookOutcome::Staged(pending),
    })
}

async fn require_pending(pool: &SqlitePool, id: Uuid) -> BackendResult<PendingPayment> {
    db::get_pending(pool, id)
        .await?
        .ok_or_else(|| BackendError::not_found(format!("Pending payment {} not found", id)))
}

fn ensure_pending(pending: &PendingPayment) -> BackendResult<()> {
    if !pending.is_pending() {
        return Err(BackendError::conflict(format!(
            "Pending payment {} is already {}",
            pending.gateway_reference,
            pending.status.as_str()
        )));
    }
    Ok(())
}

fn already_processed(id: Uuid) -> BackendError {
    BackendError::conflict(format!("Pending payment {} was processed concurrently", id))
}

/// Link a pending payment to a student by admission number
pub async fn link(pool: &SqlitePool, id: Uuid, admission_number: &str) -> BackendResult<PendingPayment> {
    let pending = require_pending(pool, id).await?;
    ensure_pending(&pending)?;
    let student = require_student(pool, admission_number).await?;

    let linked = db::link_student(pool, id, student.id, &student.admission_number)
        .await?
        .ok_or_else(|| already_processed(id))?;
    tracing::info!("Pending payment {} linked to {}", linked.gateway_reference, student.admission_number);
    Ok(linked)
}

/// Confirmed pending payment with its posted receipt and the student it was applied to
#[derive(Debug)]
pub struct Confirmation {
    pub pending: PendingPayment,
    pub receipt: PaymentReceipt,
    pub student: Student,
}

/// Post a linked pending payment to the student's balance
pub async fn confirm(pool: &SqlitePool, id: Uuid, confirmed_by: Uuid) -> BackendResult<Confirmation> {
    let pending = require_pending(pool, id).await?;
    ensure_pending(&pending)?;

    let Some(student_id) = pending.student_id else {
        return Err(BackendError::NotLinked {
            reference: pending.gateway_reference.clone(),
        });
    };
    let student = get_student_by_id(pool, student_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Linked student no longer exists"))?;
    let fee_total = initial_fee_total(pool, &student).await?;
    ensure_reference_unused(pool, PaymentMethod::Gateway, &pending.gateway_reference).await?;

    let now = Utc::now();
    let draft = NewPayment {
        student_id: student.id,
        admission_number: student.admission_number.clone(),
        amount: pending.amount,
        method: PaymentMethod::Gateway,
        reference: Some(pending.gateway_reference.clone()),
        in_kind: None,
        notes: pending.channel.as_ref().map(|c| format!("Gateway channel: {}", c)),
        recorded_by: Some(confirmed_by),
        paid_at: pending.received_at,
    };

    let mut tx = pool.begin().await?;
    let posted = post_payment(&mut tx, &draft, fee_total).await?;
    let confirmed = db::mark_confirmed(&mut tx, id, posted.payment.id, confirmed_by, now)
        .await?
        .ok_or_else(|| already_processed(id))?;
    tx.commit().await?;

    tracing::info!(
        "Gateway payment {} confirmed for {} as {}",
        confirmed.gateway_reference,
        student.admission_number,
        posted.payment.receipt_number
    );

    Ok(Confirmation {
        pending: confirmed,
        receipt: PaymentReceipt {
            payment: posted.payment,
            student_name: student.name.clone(),
            fee_details: posted.fee_details,
        },
        student,
    })
}

pub async fn reject(pool: &SqlitePool, id: Uuid, reason: &str, rejected_by: Uuid) -> BackendResult<PendingPayment> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(BackendError::validation("reason", "A rejection reason is required"));
    }
    let pending = require_pending(pool, id).await?;
    ensure_pending(&pending)?;

    let rejected = db::mark_rejected(pool, id, reason, rejected_by)
        .await?
        .ok_or_else(|| already_processed(id))?;
    tracing::info!("Pending payment {} rejected: {}", rejected.gateway_reference, reason);
    Ok(rejected)
}
