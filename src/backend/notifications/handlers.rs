/**
 * SMS Handlers
 *
 * - `POST /api/sms/send` - send a message to explicit numbers (staff)
 * - `POST /api/sms/reminders` - balance reminders to parents of defaulters (staff)
 */

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::error::BackendResult;
use crate::backend::middleware::StaffUser;
use crate::backend::notifications::reminder_message;
use crate::backend::notifications::sms::{SmsClient, SmsOutcome, SmsRejection};
use crate::backend::reports::db::defaulters;
use crate::shared::AppConfig;

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    pub recipients: Vec<String>,
    pub message: String,
}

pub async fn send_sms(
    State(sms): State<SmsClient>,
    StaffUser(user): StaffUser,
    Json(request): Json<SendSmsRequest>,
) -> BackendResult<Json<SmsOutcome>> {
    let outcome = sms.send(&request.recipients, &request.message).await?;
    tracing::info!(
        "{} sent SMS to {} recipients ({} rejected)",
        user.email,
        outcome.accepted.len(),
        outcome.rejected.len()
    );
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderRequest {
    pub grade_level: Option<String>,
    #[serde(default)]
    pub min_balance: f64,
}

#[derive(Debug, Serialize)]
pub struct ReminderSummary {
    pub mode: String,
    pub sent: usize,
    pub failed: Vec<SmsRejection>,
}

/// One message per defaulter since every text carries its own balance
pub async fn send_reminders(
    State(pool): State<SqlitePool>,
    State(sms): State<SmsClient>,
    State(config): State<Arc<AppConfig>>,
    StaffUser(user): StaffUser,
    Json(request): Json<ReminderRequest>,
) -> BackendResult<Json<ReminderSummary>> {
    let owing = defaulters(&pool, request.grade_level.as_deref(), request.min_balance).await?;

    let mut summary = ReminderSummary {
        mode: if sms.is_live() { "sent" } else { "logged" }.to_string(),
        sent: 0,
        failed: Vec::new(),
    };

    for defaulter in &owing {
        let message = reminder_message(&config.school_name, defaulter);
        match sms.send(std::slice::from_ref(&defaulter.parent_phone), &message).await {
            Ok(outcome) => {
                summary.sent += outcome.accepted.len();
                summary.failed.extend(outcome.rejected);
            }
            Err(e) => {
                tracing::warn!("Reminder for {} failed: {:?}", defaulter.admission_number, e);
                summary.failed.push(SmsRejection {
                    number: defaulter.parent_phone.clone(),
                    status: e.message(),
                });
            }
        }
    }

    tracing::info!(
        "{} sent {} fee reminders ({} failed)",
        user.email,
        summary.sent,
        summary.failed.len()
    );
    Ok(Json(summary))
}
