/// Email notifier for OTP codes and purchase confirmations
use crate::config::EmailSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Rendered message with a plain text fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn otp_code(code: &str, validity_minutes: i64) -> Self {
        let subject = "Verify your email - OTP".to_string();
        let text_body = format!(
            "Your OTP is: {code}\n\nThis code will expire in {validity_minutes} minutes.\n\nIf you did not request this, please ignore this email."
        );
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <p>Your OTP is:</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #000; margin: 30px 0;">{code}</p>
    <p style="color: #666; font-size: 14px;">This code will expire in <strong>{validity_minutes} minutes</strong>.</p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">If you did not request this, please ignore this email.</p>
</body>
</html>"#
        );

        Self {
            subject,
            text_body,
            html_body,
        }
    }

    pub fn purchase_confirmation(project_name: &str, link: &str, validity_minutes: i64) -> Self {
        let subject = "Your project download link".to_string();
        let validity = if validity_minutes % 60 == 0 {
            match validity_minutes / 60 {
                1 => "1 hour".to_string(),
                hours => format!("{hours} hours"),
            }
        } else {
            format!("{validity_minutes} minutes")
        };
        let text_body = format!(
            "Thank you for your purchase of {project_name}!\n\nDownload your project here (valid for {validity}):\n{link}"
        );
        let project_name = escape_html(project_name);
        let link = escape_html(link);
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <p>Thank you for your purchase of <strong>{project_name}</strong>!</p>
    <p>Click the link below to download your project (valid for {validity}):</p>
    <p><a href="{link}" style="color:#4a6cf7; text-decoration:none;">Download Project</a></p>
</body>
</html>"#
        );

        Self {
            subject,
            text_body,
            html_body,
        }
    }
}

/// Escape text for an HTML body or a double-quoted attribute
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Outbound message channel to a buyer
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, message: &EmailMessage) -> Result<()>;
}

/// Async SMTP transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build notifier from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email notifier will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AppError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, address: &str, message: &EmailMessage) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                subject = %message.subject,
                "Email notifier running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Notification(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(message.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(message.html_body.clone()),
                    ),
            )
            .map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AppError::Notification(format!("SMTP send failed: {}", e)))?;

        info!(subject = %message.subject, "email sent successfully");
        Ok(())
    }
}
