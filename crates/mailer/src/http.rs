use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::EmailMessage;

/// Client for a JSON mail relay accepting `POST {base}/messages`.
#[derive(Clone)]
pub struct HttpMailer {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    from_address: String,
}

impl HttpMailer {
    pub fn new(
        base_url: Url,
        api_key: Option<String>,
        from_address: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            from_address: from_address.into(),
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Submits one message. Each call carries a fresh `Idempotency-Key`.
    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let url = self.base_url.join("messages")?;
        let body = OutgoingMessage {
            from: &self.from_address,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self
            .http
            .post(url)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;
        ensure_success(response).await
    }
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Errors produced while handing a message to the relay.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn ensure_success(response: Response) -> Result<(), MailerError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(MailerError::Status { status, body });
    }
    Ok(())
}
