//! Outgoing email delivery.

pub mod http;
pub mod outbox;

use serde::Serialize;

pub use http::{HttpMailer, MailerError};
pub use outbox::Outbox;

/// A fully addressed email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend selected at startup.
#[derive(Clone)]
pub enum Mailer {
    Http(HttpMailer),
    Outbox(Outbox),
}

impl Mailer {
    pub async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        match self {
            Self::Http(client) => client.send(message).await,
            Self::Outbox(outbox) => {
                outbox.deliver(message).await;
                Ok(())
            }
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Outbox(_) => "outbox",
        }
    }

    /// The captured messages, when delivering to the in-process outbox.
    pub fn outbox(&self) -> Option<&Outbox> {
        match self {
            Self::Outbox(outbox) => Some(outbox),
            Self::Http(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outbox_backend_never_fails() {
        let mailer = Mailer::Outbox(Outbox::default());
        let message = EmailMessage {
            to: "nova@example.edu".into(),
            subject: "Welcome".into(),
            body: "Hello".into(),
        };
        mailer.send(&message).await.expect("outbox send");
        assert_eq!(mailer.backend(), "outbox");
        let outbox = mailer.outbox().expect("outbox backend");
        assert_eq!(outbox.messages().await, vec![message]);
    }
}
