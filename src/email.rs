//! Outbound email delivery.
//!
//! Dispatch is fire-and-forget: the orchestrator spawns the send and the
//! HTTP response never waits on mail transport. Transport failures are
//! logged, never propagated.

use async_trait::async_trait;
use tracing::info;

/// Transport seam for outbound mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Error from the mail transport.
#[derive(Debug)]
pub struct MailError(pub String);

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mail transport error: {}", self.0)
    }
}

impl std::error::Error for MailError {}

/// Mailer that writes messages to the log instead of a mail relay.
/// The default when no transport is wired up.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), MailError> {
        info!(to = %to, subject = %subject, "Email dispatched");
        Ok(())
    }
}

/// HTML body for the password reset email.
pub fn password_reset_body(reset_link: &str) -> String {
    format!(
        "<p>Hello,</p>\
         <p>Click the link below to reset your password:</p>\
         <a href=\"{}\">Reset password</a>\
         <p>This link is valid for 1 hour.</p>",
        reset_link
    )
}
