//! SMTP adapter for the `InvoiceMailer` port (STARTTLS submission via `lettre`).

use async_trait::async_trait;
use base64::Engine;
use lettre::message::{header::ContentType, Attachment, Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, instrument, warn};

use crate::config::MailConfig;
use crate::contract::MailOutcome;
use crate::domain::invoice_mail::{self, InvoiceMessage};
use crate::domain::ports::InvoiceMailer;

const AUTH_FAILED: &str =
    "Email authentication failed. Check the configured mail username and password (use an app password for Gmail)";

pub struct SmtpMailer {
    config: MailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Builds the transport only when credentials are configured.
    pub fn new(config: MailConfig) -> anyhow::Result<Self> {
        let transport = match config.credentials() {
            Some((user, pass)) => Some(
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                    .port(config.port)
                    .credentials(Credentials::new(user.to_string(), pass.to_string()))
                    .build(),
            ),
            None => {
                warn!("Mail credentials not configured; invoice emails are disabled");
                None
            }
        };
        Ok(Self { config, transport })
    }

    fn sender(&self) -> anyhow::Result<Mailbox> {
        let user = self.config.username.as_deref().unwrap_or_default();
        Ok(format!("{} <{}>", self.config.from_name, user).parse()?)
    }

    /// Multipart/alternative body, wrapped in multipart/mixed when a PDF is attached.
    pub fn build_message(
        &self,
        subject: String,
        recipient: &str,
        reply_to: Option<&str>,
        text: String,
        html: String,
        attachment: Option<(String, Vec<u8>)>,
    ) -> anyhow::Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender()?)
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject);
        if let Some(reply) = reply_to.filter(|r| !r.trim().is_empty()) {
            match reply.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.reply_to(mailbox),
                Err(e) => warn!("Ignoring invalid Reply-To '{}': {}", reply, e),
            }
        }

        let body = MultiPart::alternative_plain_html(text, html);
        let message = match attachment {
            Some((name, bytes)) => builder.multipart(
                MultiPart::mixed().multipart(body).singlepart(
                    Attachment::new(name).body(bytes, ContentType::parse("application/pdf")?),
                ),
            )?,
            None => builder.multipart(body)?,
        };
        Ok(message)
    }

    async fn deliver(&self, message: Message) -> Result<(), String> {
        let Some(transport) = &self.transport else {
            return Err("Email not configured".to_string());
        };
        transport.send(message).await.map(|_| ()).map_err(|e| {
            let auth_rejected = e
                .status()
                .map(|code| code.to_string() == "535")
                .unwrap_or(false);
            if auth_rejected {
                AUTH_FAILED.to_string()
            } else {
                format!("Failed to send email: {e}")
            }
        })
    }
}

/// Accepts raw base64 or a `data:` URL.
fn decode_pdf(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = raw.split_once("base64,").map(|(_, p)| p).unwrap_or(raw);
    base64::engine::general_purpose::STANDARD.decode(payload.trim())
}

fn recipient_of(recipient: Option<&str>) -> Option<&str> {
    recipient.map(str::trim).filter(|r| !r.is_empty())
}

#[async_trait]
impl InvoiceMailer for SmtpMailer {
    #[instrument(name = "backoffice.mail.send_invoice", skip_all, fields(invoice = %message.invoice_number))]
    async fn send_invoice(
        &self,
        message: &InvoiceMessage,
        recipient: Option<&str>,
        pdf_base64: Option<&str>,
    ) -> MailOutcome {
        if self.transport.is_none() {
            return MailOutcome::failed(
                "Email not configured. Set the mail username and password in the backoffice configuration",
            );
        }
        let Some(to) = recipient_of(recipient) else {
            return MailOutcome::failed("No client email provided");
        };

        let attachment = pdf_base64.and_then(|raw| match decode_pdf(raw) {
            Ok(bytes) => Some((format!("Invoice-{}.pdf", message.invoice_number), bytes)),
            Err(e) => {
                warn!("Could not attach PDF: {}", e);
                None
            }
        });

        let email = match self.build_message(
            message.invoice_subject(),
            to,
            message.business_email.as_deref(),
            invoice_mail::invoice_text(message),
            invoice_mail::invoice_html(message),
            attachment,
        ) {
            Ok(m) => m,
            Err(e) => return MailOutcome::failed(format!("Failed to send email: {e}")),
        };

        match self.deliver(email).await {
            Ok(()) => {
                info!("Invoice #{} sent to {}", message.invoice_number, to);
                MailOutcome::sent(format!("Invoice sent successfully to {to}"))
            }
            Err(reason) => MailOutcome::failed(reason),
        }
    }

    #[instrument(name = "backoffice.mail.send_reminder", skip_all, fields(invoice = %message.invoice_number))]
    async fn send_reminder(&self, message: &InvoiceMessage, recipient: Option<&str>) -> MailOutcome {
        if self.transport.is_none() {
            return MailOutcome::failed("Email not configured");
        }
        let Some(to) = recipient_of(recipient) else {
            return MailOutcome::failed("No client email provided");
        };

        let email = match self.build_message(
            message.reminder_subject(),
            to,
            None,
            invoice_mail::reminder_text(message),
            invoice_mail::reminder_html(message),
            None,
        ) {
            Ok(m) => m,
            Err(e) => return MailOutcome::failed(format!("Failed to send email: {e}")),
        };

        match self.deliver(email).await {
            Ok(()) => {
                info!("Payment reminder for invoice #{} sent to {}", message.invoice_number, to);
                MailOutcome::sent("Reminder sent successfully")
            }
            Err(reason) => MailOutcome::failed(reason),
        }
    }
}
