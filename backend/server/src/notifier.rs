//! # Notifier
//!
//! Confirmation email after a registration.
//!
//! The mail relay is an external service. We hand it (name, email, NUPCAN, exam) and
//! only care whether it accepted the message. A failure here is logged and reported
//! back as `notified: false`, the registration itself stands.
//!
//! ## Relay
//! - `MAIL_RELAY_URL` set: POST the confirmation as JSON, 2xx means accepted
//! - Unset: log the confirmation instead, handy for local runs
use std::time::Duration;

use async_trait::async_trait;
use registry::Nupcan;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub name: String,
    pub email: String,
    pub nupcan: Nupcan,
    pub exam_name: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Mail relay unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, confirmation: &Confirmation) -> Result<(), NotifyError>;
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        info!(
            "Confirmation for {} <{}>: {} registered for {}",
            confirmation.name, confirmation.email, confirmation.nupcan, confirmation.exam_name
        );

        Ok(())
    }
}

pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, confirmation: &Confirmation) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(confirmation)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        #[cfg(feature = "verbose")]
        info!("Mail relay accepted {}", confirmation.nupcan);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_payload() {
        let confirmation = Confirmation {
            name: "Ada Obame".to_string(),
            email: "ada@example.ga".to_string(),
            nupcan: "GABCONCOURS-03-05-1".parse().unwrap(),
            exam_name: "ENS Libreville".to_string(),
        };

        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["nupcan"], "GABCONCOURS-03-05-1");
        assert_eq!(json["examName"], "ENS Libreville");
    }

    #[tokio::test]
    async fn test_log_notifier_accepts() {
        let confirmation = Confirmation {
            name: "Ada Obame".to_string(),
            email: "ada@example.ga".to_string(),
            nupcan: "GABCONCOURS-03-05-1".parse().unwrap(),
            exam_name: "ENS Libreville".to_string(),
        };

        assert!(LogNotifier.notify(&confirmation).await.is_ok());
    }
}
