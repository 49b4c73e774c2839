//! Outbound mail for the password reset flow

use async_trait::async_trait;
use qfraud_common::config::MailConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const RESET_SUBJECT: &str = "Your Temporary Password";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Mail API error {0}: {1}")]
    ApiError(u16, String),
}

/// Delivers temporary passwords to users
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_temporary_password(&self, to: &str, password: &str) -> Result<(), MailError>;
}

/// Build the mailer for a mail configuration
///
/// Falls back to `LogMailer` (with a warning) when credentials are missing.
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match (&config.sendgrid_api_key, &config.from_email) {
        (Some(api_key), Some(from)) if config.is_configured() => {
            match SendGridMailer::new(api_key.clone(), from.clone()) {
                Ok(mailer) => return Arc::new(mailer),
                Err(e) => tracing::warn!(error = %e, "Failed to build SendGrid client"),
            }
        }
        _ => tracing::warn!(
            "SENDGRID_API_KEY or SENDGRID_FROM_EMAIL not set; reset emails will only be logged"
        ),
    }
    Arc::new(LogMailer)
}

/// SendGrid v3 API client
pub struct SendGridMailer {
    http_client: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from_email: String) -> Result<Self, MailError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            from_email,
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_temporary_password(&self, to: &str, password: &str) -> Result<(), MailError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email },
            "subject": RESET_SUBJECT,
            "content": [{
                "type": "text/plain",
                "value": format!(
                    "Your temporary password is: {}\nPlease log in and change it immediately.",
                    password
                ),
            }],
        });

        let response = self
            .http_client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MailError::ApiError(status.as_u16(), error_text));
        }

        tracing::info!(to, "Temporary password email sent");
        Ok(())
    }
}

/// Logs the recipient instead of sending anything
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_temporary_password(&self, to: &str, _password: &str) -> Result<(), MailError> {
        tracing::info!(to, "Mail delivery not configured; temporary password not sent");
        Ok(())
    }
}
