/**
 * SMS Gateway Client
 *
 * Sends text messages through an Africa's Talking compatible HTTP API
 * (form-encoded POST with an `apiKey` header). When no API key is configured
 * the client runs in log-only mode: messages are written to the log and
 * reported as `logged`, so development setups never hit the network.
 */

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::error::BackendError;
use crate::shared::SmsConfig;

/// Status codes the gateway uses for accepted messages
const ACCEPTED_STATUS_CODES: [i64; 3] = [100, 101, 102];

/// Outcome of a send request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmsOutcome {
    /// `sent` when delivered to the gateway, `logged` in log-only mode
    pub mode: String,
    pub accepted: Vec<String>,
    pub rejected: Vec<SmsRejection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmsRejection {
    pub number: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(rename = "SMSMessageData")]
    data: GatewayMessageData,
}

#[derive(Debug, Deserialize)]
struct GatewayMessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<GatewayRecipient>,
}

#[derive(Debug, Deserialize)]
struct GatewayRecipient {
    number: String,
    status: String,
    #[serde(rename = "statusCode", default)]
    status_code: i64,
}

/// Convert a local Kenyan number to international format.
/// Numbers already in international form are returned without separators.
pub fn normalize_msisdn(phone: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.starts_with('+') {
        cleaned
    } else if cleaned.starts_with("254") {
        format!("+{}", cleaned)
    } else if cleaned.len() == 10 && cleaned.starts_with('0') {
        format!("+254{}", &cleaned[1..])
    } else {
        cleaned
    }
}

/// SMS client shared through application state
#[derive(Clone)]
pub struct SmsClient {
    http: Client,
    config: SmsConfig,
}

impl SmsClient {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Whether messages actually leave the server
    pub fn is_live(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Send one message to one or more recipients
    pub async fn send(&self, recipients: &[String], message: &str) -> Result<SmsOutcome, BackendError> {
        if recipients.is_empty() {
            return Err(BackendError::validation("recipients", "At least one recipient is required"));
        }
        if message.trim().is_empty() {
            return Err(BackendError::validation("message", "Message must not be empty"));
        }

        let numbers: Vec<String> = recipients.iter().map(|r| normalize_msisdn(r)).collect();

        let Some(api_key) = &self.config.api_key else {
            tracing::info!("[sms:log-only] to {}: {}", numbers.join(","), message);
            return Ok(SmsOutcome {
                mode: "logged".to_string(),
                accepted: numbers,
                rejected: Vec::new(),
            });
        };

        let mut form = vec![
            ("username", self.config.username.clone()),
            ("to", numbers.join(",")),
            ("message", message.to_string()),
        ];
        if let Some(sender_id) = &self.config.sender_id {
            form.push(("from", sender_id.clone()));
        }

        let response = self
            .http
            .post(&self.config.api_url)
            .header("apiKey", api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("SMS gateway request failed: {}", e);
                BackendError::unavailable("SMS gateway is unreachable")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("SMS gateway returned {}: {}", status, body);
            return Err(BackendError::unavailable("SMS gateway rejected the request"));
        }

        let parsed: GatewayResponse = response.json().await.map_err(|e| {
            tracing::error!("Unreadable SMS gateway response: {}", e);
            BackendError::unavailable("SMS gateway returned an unexpected response")
        })?;

        tracing::info!("SMS gateway: {}", parsed.data.message);

        let mut outcome = SmsOutcome {
            mode: "sent".to_string(),
            accepted: Vec::new(),
            rejected: Vec::new(),
        };
        for recipient in parsed.data.recipients {
            if ACCEPTED_STATUS_CODES.contains(&recipient.status_code) || recipient.status == "Success" {
                outcome.accepted.push(recipient.number);
            } else {
                tracing::warn!("SMS to {} rejected: {}", recipient.number, recipient.status);
                outcome.rejected.push(SmsRejection {
                    number: recipient.number,
                    status: recipient.status,
                });
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn live_config(server: &MockServer) -> SmsConfig {
        SmsConfig {
            api_url: format!("{}/version1/messaging", server.uri()),
            username: "school".to_string(),
            api_key: Some("at-key".to_string()),
            sender_id: None,
        }
    }

    #[test]
    fn test_normalize_msisdn() {
        assert_eq!(normalize_msisdn("0712 345 678"), "+254712345678");
        assert_eq!(normalize_msisdn("254712345678"), "+254712345678");
        assert_eq!(normalize_msisdn("+254-712-345-678"), "+254712345678");
        assert_eq!(normalize_msisdn("0110345678"), "+254110345678");
    }

    #[tokio::test]
    async fn test_log_only_mode() {
        let client = SmsClient::new(SmsConfig::default());
        assert!(!client.is_live());

        let outcome = client.send(&["0712345678".to_string()], "Hello").await.unwrap();
        assert_eq!(outcome.mode, "logged");
        assert_eq!(outcome.accepted, vec!["+254712345678".to_string()]);
    }

    #[tokio::test]
    async fn test_send_through_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version1/messaging"))
            .and(header("apiKey", "at-key"))
            .and(body_string_contains("username=school"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "SMSMessageData": {
                    "Message": "Sent to 1/2 Total Cost: KES 0.8000",
                    "Recipients": [
                        {"statusCode": 101, "number": "+254712345678", "status": "Success", "cost": "KES 0.8000", "messageId": "ATXid_1"},
                        {"statusCode": 403, "number": "+254700000000", "status": "InvalidPhoneNumber", "cost": "0", "messageId": "None"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SmsClient::new(live_config(&server));
        let outcome = client
            .send(&["0712345678".to_string(), "0700000000".to_string()], "Fee reminder")
            .await
            .unwrap();

        assert_eq!(outcome.mode, "sent");
        assert_eq!(outcome.accepted, vec!["+254712345678".to_string()]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].status, "InvalidPhoneNumber");
    }

    #[tokio::test]
    async fn test_gateway_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("The supplied authentication is invalid"))
            .mount(&server)
            .await;

        let client = SmsClient::new(live_config(&server));
        let err = client.send(&["0712345678".to_string()], "Hi").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let client = SmsClient::new(SmsConfig::default());
        let err = client.send(&["0712345678".to_string()], "  ").await.unwrap_err();
        assert_eq!(err.field(), Some("message"));
    }
}
