/// Lead relay: forwards captured leads to the EmailJS REST API.
///
/// Handlers depend on the `LeadRelay` trait; `EmailJsRelay` is the production backend and
/// `DisabledRelay` stands in when no EmailJS credentials are configured.
/// Delivery is best effort: callers log failures and carry on.
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::report::lead::RelayMessage;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Lead relay is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait LeadRelay: Send + Sync {
    async fn send(&self, message: &RelayMessage) -> Result<(), RelayError>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a RelayMessage,
}

/// EmailJS `email/send` client. The public key travels as `user_id`.
#[derive(Clone)]
pub struct EmailJsRelay {
    client: Client,
    config: RelayConfig,
}

impl EmailJsRelay {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            config,
        })
    }

    fn request_body<'a>(&'a self, message: &'a RelayMessage) -> SendRequest<'a> {
        SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            access_token: self.config.access_token.as_deref(),
            template_params: message,
        }
    }
}

#[async_trait]
impl LeadRelay for EmailJsRelay {
    async fn send(&self, message: &RelayMessage) -> Result<(), RelayError> {
        let response = self
            .client
            .post(EMAILJS_SEND_URL)
            .json(&self.request_body(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // EmailJS answers errors in plain text.
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(template = %self.config.template_id, "Lead relayed via EmailJS");
        Ok(())
    }
}

/// Used when EmailJS is not configured. Every send fails with `NotConfigured`.
pub struct DisabledRelay;

#[async_trait]
impl LeadRelay for DisabledRelay {
    async fn send(&self, message: &RelayMessage) -> Result<(), RelayError> {
        warn!(lead = %message.email, "Lead relay disabled; lead not forwarded");
        Err(RelayError::NotConfigured)
    }
}
