/**
 * USSD Menu
 *
 * The gateway posts the whole input history joined by `*` on every step
 * (`""`, `"1"`, `"1*ADM001"`), so the reply is derived from `text`. The
 * session entry pins the session to the dialling phone number; it is dropped
 * when the menu ends. Failures end the session with a plain-text reply since
 * the gateway cannot show a JSON error.
 *
 * Balances are only revealed to the phone number registered as the
 * student's parent.
 */

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::backend::error::BackendResult;
use crate::backend::notifications::sms::normalize_msisdn;
use crate::backend::notifications::store::{namespace, EphemeralStore};
use crate::backend::payments::db::last_payment_for_student;
use crate::backend::students::db::get_student_by_admission;
use crate::shared::fees::format_kes;
use crate::shared::AppConfig;

/// Gateway callback fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdRequest {
    pub session_id: String,
    #[serde(default)]
    pub service_code: String,
    pub phone_number: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct UssdSession {
    phone_number: String,
}

/// Reply to the gateway; `Continue` keeps the session open
#[derive(Debug, Clone, PartialEq)]
pub enum UssdReply {
    Continue(String),
    End(String),
}

impl UssdReply {
    pub fn render(&self) -> String {
        match self {
            UssdReply::Continue(text) => format!("CON {}", text),
            UssdReply::End(text) => format!("END {}", text),
        }
    }

    fn is_end(&self) -> bool {
        matches!(self, UssdReply::End(_))
    }
}

fn main_menu(school_name: &str) -> UssdReply {
    UssdReply::Continue(format!(
        "Welcome to {} fees\n1. Check balance\n2. Last payment\n3. How to pay",
        school_name
    ))
}

fn how_to_pay(school_name: &str) -> UssdReply {
    UssdReply::End(format!(
        "Pay {} fees by M-Pesa, bank deposit or at the school office. \
         Use the admission number as the account reference.",
        school_name
    ))
}

/// Produce the reply for one step of the menu
pub async fn respond(pool: &SqlitePool, school_name: &str, phone_number: &str, text: &str) -> BackendResult<UssdReply> {
    let inputs: Vec<&str> = if text.trim().is_empty() {
        Vec::new()
    } else {
        text.split('*').map(str::trim).collect()
    };

    let reply = match inputs.as_slice() {
        [] => main_menu(school_name),
        ["1"] | ["2"] => UssdReply::Continue("Enter the student's admission number".to_string()),
        ["3"] => how_to_pay(school_name),
        [choice @ ("1" | "2"), admission] => lookup(pool, phone_number, choice, admission).await?,
        _ => UssdReply::End("Invalid choice. Please try again.".to_string()),
    };
    Ok(reply)
}

async fn lookup(pool: &SqlitePool, phone_number: &str, choice: &str, admission: &str) -> BackendResult<UssdReply> {
    let not_found = || UssdReply::End(format!("No student found for admission number {}", admission.to_uppercase()));

    let Some(student) = get_student_by_admission(pool, admission).await? else {
        return Ok(not_found());
    };
    // Same reply as an unknown student so admission numbers cannot be enumerated
    if student.parent_phone != normalize_msisdn(phone_number) {
        tracing::warn!("USSD lookup of {} from unregistered number {}", student.admission_number, phone_number);
        return Ok(not_found());
    }

    if choice == "1" {
        let fees = &student.fee_details;
        return Ok(UssdReply::End(format!(
            "{} ({})\nTotal: {}\nPaid: {}\nBalance: {}",
            student.name,
            student.admission_number,
            format_kes(fees.total_fees),
            format_kes(fees.fees_paid),
            format_kes(fees.remaining_balance)
        )));
    }

    let reply = match last_payment_for_student(pool, student.id).await? {
        Some(payment) => UssdReply::End(format!(
            "{}: last payment {} via {} on {}\nReceipt {}",
            student.name,
            format_kes(payment.amount),
            payment.method.label(),
            payment.paid_at.format("%d/%m/%Y"),
            payment.receipt_number
        )),
        None => UssdReply::End(format!("No payments recorded for {}", student.name)),
    };
    Ok(reply)
}

/// `POST /api/ussd`
pub async fn ussd_callback(
    State(pool): State<SqlitePool>,
    State(store): State<EphemeralStore>,
    State(config): State<Arc<AppConfig>>,
    Form(request): Form<UssdRequest>,
) -> impl IntoResponse {
    let reply = match handle_step(&pool, &store, &config, &request).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("USSD session {} failed: {:?}", request.session_id, e);
            UssdReply::End("Service unavailable. Please try again later.".to_string())
        }
    };

    tracing::debug!("USSD {} {} -> {:?}", request.service_code, request.session_id, reply);
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], reply.render())
}

async fn handle_step(
    pool: &SqlitePool,
    store: &EphemeralStore,
    config: &AppConfig,
    request: &UssdRequest,
) -> BackendResult<UssdReply> {
    let phone = normalize_msisdn(&request.phone_number);
    let session: Option<UssdSession> = store.get(namespace::USSD_SESSION, &request.session_id).await?;

    let reply = match session {
        Some(session) if session.phone_number != phone => {
            tracing::warn!("USSD session {} reused from a different number", request.session_id);
            UssdReply::End("Session error. Please dial again.".to_string())
        }
        _ => {
            let reply = respond(pool, &config.school_name, &phone, &request.text).await?;
            if !reply.is_end() {
                let next = UssdSession { phone_number: phone };
                store
                    .put(namespace::USSD_SESSION, &request.session_id, &next, config.ussd_session_ttl)
                    .await?;
            }
            reply
        }
    };

    if reply.is_end() {
        store.remove(namespace::USSD_SESSION, &request.session_id).await?;
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::db::memory_pool;
    use crate::backend::payments::recorder::record_payment;
    use crate::backend::students::db::insert_student;
    use crate::shared::student::CreateStudentRequest;
    use crate::shared::{BoardingStatus, PaymentMethod, RecordPaymentRequest};

    async fn setup() -> SqlitePool {
        let pool = memory_pool().await.unwrap();
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
            Some(15000.0),
        )
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_main_menu_and_prompts() {
        let pool = setup().await;
        let reply = respond(&pool, "Hillside", "+254712345678", "").await.unwrap();
        assert!(reply.render().starts_with("CON Welcome to Hillside"));

        let reply = respond(&pool, "Hillside", "+254712345678", "1").await.unwrap();
        assert_eq!(reply.render(), "CON Enter the student's admission number");

        let reply = respond(&pool, "Hillside", "+254712345678", "3").await.unwrap();
        assert!(reply.render().starts_with("END Pay Hillside fees"));

        let reply = respond(&pool, "Hillside", "+254712345678", "9").await.unwrap();
        assert!(reply.is_end());
    }

    #[tokio::test]
    async fn test_balance_for_registered_parent() {
        let pool = setup().await;
        let reply = respond(&pool, "Hillside", "+254712345678", "1*adm001").await.unwrap();
        let text = reply.render();
        assert!(text.starts_with("END Achieng Otieno (ADM001)"));
        assert!(text.contains("Balance: KES 15,000.00"));
    }

    #[tokio::test]
    async fn test_other_numbers_cannot_see_balance() {
        let pool = setup().await;
        let reply = respond(&pool, "Hillside", "+254799999999", "1*ADM001").await.unwrap();
        assert_eq!(reply, UssdReply::End("No student found for admission number ADM001".to_string()));
    }

    #[tokio::test]
    async fn test_last_payment() {
        let pool = setup().await;
        let reply = respond(&pool, "Hillside", "+254712345678", "2*ADM001").await.unwrap();
        assert_eq!(reply, UssdReply::End("No payments recorded for Achieng Otieno".to_string()));

        record_payment(
            &pool,
            &RecordPaymentRequest {
                admission_number: "ADM001".to_string(),
                amount: 2500.0,
                method: PaymentMethod::Cash,
                reference: None,
                in_kind: None,
                notes: None,
                paid_at: None,
            },
            None,
        )
        .await
        .unwrap();

        let text = respond(&pool, "Hillside", "+254712345678", "2*ADM001").await.unwrap().render();
        assert!(text.contains("last payment KES 2,500.00 via Cash"));
    }

    type CallbackParts = (State<SqlitePool>, State<EphemeralStore>, State<Arc<AppConfig>>, Form<UssdRequest>);

    fn callback_parts(pool: &SqlitePool, text: &str) -> CallbackParts {
        let config = AppConfig::builder().jwt_secret("test-secret").build().unwrap();
        (
            State(pool.clone()),
            State(EphemeralStore::new(pool.clone())),
            State(Arc::new(config)),
            Form(UssdRequest {
                session_id: "ATUid_1".to_string(),
                service_code: "*384*1#".to_string(),
                phone_number: "+254712345678".to_string(),
                text: text.to_string(),
            }),
        )
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_session_is_kept_until_the_menu_ends() {
        let pool = setup().await;
        let store = EphemeralStore::new(pool.clone());

        let (a, b, c, d) = callback_parts(&pool, "");
        ussd_callback(a, b, c, d).await.into_response();
        let session: Option<UssdSession> = store.get(namespace::USSD_SESSION, "ATUid_1").await.unwrap();
        assert_eq!(session, Some(UssdSession { phone_number: "+254712345678".to_string() }));

        let (a, b, c, d) = callback_parts(&pool, "3");
        ussd_callback(a, b, c, d).await.into_response();
        let session: Option<UssdSession> = store.get(namespace::USSD_SESSION, "ATUid_1").await.unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_database_failure_ends_session_in_plain_text() {
        let pool = setup().await;
        pool.close().await;

        let (a, b, c, d) = callback_parts(&pool, "1*ADM001");
        let response = ussd_callback(a, b, c, d).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "END Service unavailable. Please try again later.");
    }
}
