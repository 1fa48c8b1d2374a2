//! Payment Data Structures
//!
//! Payments are append-only: once recorded they are never updated or deleted.
//! Receipts are regenerated from the stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::fees::FeeDetails;

/// How a payment was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Bank,
    Cheque,
    Card,
    InKind,
    /// Confirmed payment-gateway transaction
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Card => "card",
            PaymentMethod::InKind => "in_kind",
            PaymentMethod::Gateway => "gateway",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "mpesa" | "m-pesa" => Some(PaymentMethod::Mpesa),
            "bank" => Some(PaymentMethod::Bank),
            "cheque" => Some(PaymentMethod::Cheque),
            "card" => Some(PaymentMethod::Card),
            "in_kind" => Some(PaymentMethod::InKind),
            "gateway" => Some(PaymentMethod::Gateway),
            _ => None,
        }
    }

    /// Methods that must carry a transaction reference
    pub fn requires_reference(&self) -> bool {
        !matches!(self, PaymentMethod::Cash | PaymentMethod::InKind)
    }

    /// Human label used on receipts and messages
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Mpesa => "M-Pesa",
            PaymentMethod::Bank => "Bank deposit",
            PaymentMethod::Cheque => "Cheque",
            PaymentMethod::Card => "Card",
            PaymentMethod::InKind => "In kind",
            PaymentMethod::Gateway => "Online payment",
        }
    }
}

/// Goods accepted in place of money
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InKindDetails {
    pub item: String,
    pub quantity: f64,
}

/// Stored payment record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub admission_number: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub in_kind: Option<InKindDetails>,
    pub receipt_number: String,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payment submission from staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub admission_number: String,
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub in_kind: Option<InKindDetails>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to the time of recording
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl RecordPaymentRequest {
    /// Check the method-conditional field requirements
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.admission_number.trim().is_empty() {
            return Err(SharedError::validation("admission_number", "Admission number is required"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(SharedError::validation("amount", "Amount must be greater than zero"));
        }
        if self.method.requires_reference() {
            let reference = self.reference.as_deref().map(str::trim).unwrap_or_default();
            if reference.is_empty() {
                return Err(SharedError::validation(
                    "reference",
                    format!("A reference is required for {} payments", self.method.label()),
                ));
            }
        }
        if self.method == PaymentMethod::InKind {
            match &self.in_kind {
                Some(details) if !details.item.trim().is_empty() => {
                    if !details.quantity.is_finite() || details.quantity <= 0.0 {
                        return Err(SharedError::validation("in_kind.quantity", "Quantity must be greater than zero"));
                    }
                }
                _ => {
                    return Err(SharedError::validation("in_kind.item", "In-kind payments must describe the item"));
                }
            }
        }
        Ok(())
    }

    /// Reference with surrounding whitespace removed, `None` when blank
    pub fn clean_reference(&self) -> Option<String> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| r.to_uppercase())
    }
}

/// Response to a recorded or confirmed payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub student_name: String,
    pub fee_details: FeeDetails,
}
