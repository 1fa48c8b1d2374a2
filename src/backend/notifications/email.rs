//! Outgoing email over SMTP
//!
//! Used for password-reset codes. Without SMTP settings the mailer logs the
//! message instead of sending it.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::backend::error::BackendError;
use crate::shared::SmtpConfig;

#[derive(Clone)]
pub struct Mailer {
    transport: Option<(AsyncSmtpTransport<Tokio1Executor>, Mailbox)>,
}

impl Mailer {
    /// Build a mailer; `None` gives a log-only mailer
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, BackendError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| BackendError::internal(format!("invalid SMTP_FROM: {}", e)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| BackendError::internal(format!("invalid SMTP host: {}", e)))?
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        Ok(Self {
            transport: Some((transport, from)),
        })
    }

    pub fn log_only() -> Self {
        Self { transport: None }
    }

    /// Send a plain-text email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), BackendError> {
        let Some((transport, from)) = &self.transport else {
            tracing::info!("[email:log-only] to {} | {} | {}", to, subject, body);
            return Ok(());
        };

        let recipient: Mailbox = to
            .parse()
            .map_err(|_| BackendError::validation("email", "Invalid email format"))?;
        let message = Message::builder()
            .from(from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| BackendError::internal(format!("failed to build email: {}", e)))?;

        transport.send(message).await.map_err(|e| {
            tracing::error!("SMTP delivery to {} failed: {}", to, e);
            BackendError::unavailable("Email could not be sent")
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_mailer_accepts_messages() {
        let mailer = Mailer::new(None).unwrap();
        mailer.send("parent@example.com", "Reset code", "123456").await.unwrap();
    }

    #[test]
    fn test_invalid_from_address() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            from: "not an address".to_string(),
        };
        assert!(Mailer::new(Some(&config)).is_err());
    }
}
