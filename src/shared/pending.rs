//! Pending Gateway Payment Data Structures
//!
//! Payments reported by the payment gateway are staged here until a staff
//! member confirms them against a student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a gateway payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingPaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    /// Gateway reported the charge as failed
    Failed,
}

impl PendingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingPaymentStatus::Pending => "pending",
            PendingPaymentStatus::Confirmed => "confirmed",
            PendingPaymentStatus::Rejected => "rejected",
            PendingPaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PendingPaymentStatus::Pending),
            "confirmed" => Some(PendingPaymentStatus::Confirmed),
            "rejected" => Some(PendingPaymentStatus::Rejected),
            "failed" => Some(PendingPaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Gateway payment awaiting confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingPayment {
    pub id: Uuid,
    /// Gateway transaction reference, unique per gateway event
    pub gateway_reference: String,
    pub amount: f64,
    pub currency: String,
    pub channel: Option<String>,
    pub payer_email: Option<String>,
    pub payer_phone: Option<String>,
    /// Admission number supplied in the gateway metadata
    pub admission_number: Option<String>,
    /// Student the payment is linked to
    pub student_id: Option<Uuid>,
    pub status: PendingPaymentStatus,
    pub raw_payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
    pub rejection_reason: Option<String>,
}

impl PendingPayment {
    pub fn is_pending(&self) -> bool {
        self.status == PendingPaymentStatus::Pending
    }
}

/// Staff request linking a pending payment to a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPendingPaymentRequest {
    pub admission_number: String,
}

/// Staff request rejecting a pending payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectPendingPaymentRequest {
    pub reason: String,
}
