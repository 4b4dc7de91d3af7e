use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use furlough_core::config::MailerConfig;
use furlough_core::effects::EmailRequest;

/// Outbound email. Implementations never throw: a delivery problem is a
/// `false` return and a log line, nothing more.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &EmailRequest) -> bool;
}

/// Delivers through the platform's HTTP mail relay.
pub struct RelayMailer {
    client: reqwest::Client,
    relay_url: String,
    auth_token: SecretString,
    from_address: String,
}

impl RelayMailer {
    pub fn from_config(config: &MailerConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let relay_url = config.relay_url.clone()?;
        let auth_token = config.auth_token.clone()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .ok()?;

        Some(Self { client, relay_url, auth_token, from_address: config.from_address.clone() })
    }
}

#[async_trait]
impl EmailSender for RelayMailer {
    async fn send(&self, email: &EmailRequest) -> bool {
        let payload = json!({
            "from": self.from_address,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
            "text": email.text,
        });

        let response = self
            .client
            .post(&self.relay_url)
            .bearer_auth(self.auth_token.expose_secret())
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    event_name = "mailer.relay_rejected",
                    status = %response.status(),
                    to = email.to.as_str(),
                    "mail relay rejected the message"
                );
                false
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "mailer.relay_unreachable",
                    error = %error,
                    to = email.to.as_str(),
                    "mail relay request failed"
                );
                false
            }
        }
    }
}

/// Stands in when the mailer is disabled. Accepts and drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMailer;

#[async_trait]
impl EmailSender for NoopMailer {
    async fn send(&self, email: &EmailRequest) -> bool {
        tracing::debug!(
            event_name = "mailer.disabled_drop",
            to = email.to.as_str(),
            subject = email.subject.as_str(),
            "mailer disabled, dropping email"
        );
        true
    }
}

/// Test double that records outbound mail and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailRequest>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { sent: Arc::default(), fail: true }
    }

    pub fn sent(&self) -> Vec<EmailRequest> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &EmailRequest) -> bool {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(email.clone()),
            Err(poisoned) => poisoned.into_inner().push(email.clone()),
        }
        !self.fail
    }
}

#[cfg(test)]
mod tests {
    use furlough_core::config::MailerConfig;
    use furlough_core::effects::EmailRequest;

    use super::{EmailSender, RecordingMailer, RelayMailer};

    fn email() -> EmailRequest {
        EmailRequest {
            to: "mikel.sousa@company.test".to_string(),
            subject: "Approval escalated".to_string(),
            html: "<p>hello</p>".to_string(),
            text: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn recording_mailer_captures_messages_and_reports_failure_mode() {
        let ok = RecordingMailer::default();
        assert!(ok.send(&email()).await);
        assert_eq!(ok.sent().len(), 1);

        let failing = RecordingMailer::failing();
        assert!(!failing.send(&email()).await);
        assert_eq!(failing.sent().len(), 1, "failure still records the attempt");
    }

    #[test]
    fn relay_mailer_requires_an_enabled_complete_config() {
        let mut config = MailerConfig {
            enabled: false,
            relay_url: Some("https://mail-relay.internal/send".to_string()),
            auth_token: Some(String::from("token").into()),
            from_address: "no-reply@company.test".to_string(),
            timeout_secs: 10,
        };
        assert!(RelayMailer::from_config(&config).is_none());

        config.enabled = true;
        assert!(RelayMailer::from_config(&config).is_some());

        config.relay_url = None;
        assert!(RelayMailer::from_config(&config).is_none());
    }
}
