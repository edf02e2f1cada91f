//! Web3Forms-compatible form-submission transport.
//!
//! Posts a JSON form to the configured endpoint. Messages without a `to`
//! field land in the inbox of the account that owns the access key, which
//! is how administrator alerts are routed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Delivery, NotificationTransport, NotifyError, OutgoingMessage, Recipient};
use crate::config::NotifierConfig;

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    access_key: &'a str,
    from_name: &'a str,
    subject: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a str>,
    reply_to: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
}

/// HTTP transport for a Web3Forms-style submission API.
pub struct Web3FormsTransport {
    http: reqwest::Client,
    config: NotifierConfig,
}

impl Web3FormsTransport {
    pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| NotifyError::Request(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl NotificationTransport for Web3FormsTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, NotifyError> {
        let to = match &message.recipient {
            Recipient::Administrator => None,
            Recipient::Address(addr) => Some(addr.as_str()),
        };
        let request = SubmitRequest {
            access_key: &self.config.access_key,
            from_name: &self.config.from_name,
            subject: &message.subject,
            message: &message.body,
            to,
            reply_to: &self.config.reply_to,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SubmitResponse = serde_json::from_str(&body)
            .map_err(|e| NotifyError::MalformedResponse(e.to_string()))?;

        debug!(
            recipient = %message.recipient,
            success = parsed.success,
            "Form submission answered"
        );

        if parsed.success {
            Ok(Delivery {
                success: true,
                message_id: parsed.message_id,
                detail: None,
            })
        } else {
            Ok(Delivery::refused(
                parsed
                    .message
                    .unwrap_or_else(|| "submission rejected".to_string()),
            ))
        }
    }
}
