use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{MailConfig, SmtpConfig};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("failed to build email message: {0}")]
    MessageBuild(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("smtp configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to_email: &str, link: &str) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log. Used when no SMTP relay is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to_email: &str, link: &str) -> Result<(), MailError> {
        tracing::info!(to = %to_email, %link, "password reset mail (log only)");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, mail: &MailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| MailError::Config(format!("smtp starttls error: {e}")))?
            .port(smtp.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: format!("{} <{}>", mail.from_name, mail.from_email),
        })
    }
}

fn reset_body(link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <h3>Hi! We got a request from you to reset your password.</h3>
    <p><a href="{link}">Click here to choose a new password</a></p>
    <p style="color: #666; font-size: 13px;">The link works once. If you did not ask for it, ignore this mail.</p>
</body>
</html>
"#
    )
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(&self, to_email: &str, link: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError::MessageBuild(format!("invalid from address: {e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| MailError::MessageBuild(format!("invalid to address: {e}")))?)
            .subject("Expense Tracker Reset Password")
            .header(ContentType::TEXT_HTML)
            .body(reset_body(link))
            .map_err(|e| MailError::MessageBuild(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// Picks SMTP when configured, the log mailer otherwise.
pub fn from_config(mail: &MailConfig) -> Result<std::sync::Arc<dyn Mailer>, MailError> {
    Ok(match &mail.smtp {
        Some(smtp) => std::sync::Arc::new(SmtpMailer::new(smtp, mail)?),
        None => {
            tracing::warn!("SMTP_HOST not set, reset mails are only logged");
            std::sync::Arc::new(LogMailer)
        }
    })
}
