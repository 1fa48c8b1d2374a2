//! Notifications Module
//!
//! Outbound channels (SMS, email), the USSD menu and the TTL store that
//! backs USSD sessions and password-reset codes.
//!
//! # Module Structure
//!
//! ```text
//! notifications/
//! ├── mod.rs      - Message templates and fire-and-forget delivery
//! ├── sms.rs      - SMS gateway client
//! ├── email.rs    - SMTP mailer
//! ├── store.rs    - Keyed store with expiry
//! ├── ussd.rs     - USSD menu state machine
//! └── handlers.rs - SMS send and reminder endpoints
//! ```

pub mod email;
pub mod handlers;
pub mod sms;
pub mod store;
pub mod ussd;

use crate::backend::reports::db::Defaulter;
use crate::shared::fees::format_kes;
use crate::shared::{FeeDetails, Payment};

use sms::SmsClient;

/// Text sent to the parent after a payment is posted
pub fn payment_confirmation_message(
    school_name: &str,
    student_name: &str,
    payment: &Payment,
    fee_details: &FeeDetails,
) -> String {
    format!(
        "{}: Payment of {} received for {} ({}). Receipt {}. Balance: {}.",
        school_name,
        format_kes(payment.amount),
        student_name,
        payment.admission_number,
        payment.receipt_number,
        format_kes(fee_details.remaining_balance)
    )
}

/// Balance reminder for a defaulter's parent
pub fn reminder_message(school_name: &str, defaulter: &Defaulter) -> String {
    format!(
        "{}: Dear {}, {} ({}) has an outstanding fee balance of {}. Kindly clear it at your earliest convenience.",
        school_name,
        defaulter.parent_name,
        defaulter.name,
        defaulter.admission_number,
        format_kes(defaulter.remaining_balance)
    )
}

/// Send a payment confirmation without blocking the caller.
///
/// Delivery failures are logged; the payment is already committed.
pub fn spawn_payment_confirmation(sms: SmsClient, phone: String, message: String) {
    tokio::spawn(async move {
        match sms.send(std::slice::from_ref(&phone), &message).await {
            Ok(outcome) if !outcome.rejected.is_empty() => {
                tracing::warn!("Payment confirmation to {} rejected: {:?}", phone, outcome.rejected);
            }
            Ok(_) => tracing::debug!("Payment confirmation sent to {}", phone),
            Err(e) => tracing::warn!("Payment confirmation to {} failed: {:?}", phone, e),
        }
    });
}
