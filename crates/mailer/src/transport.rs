//! SMTP delivery behind a narrow transport seam.

use {
    async_trait::async_trait,
    lettre::{
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        message::header::ContentType, transport::smtp::authentication::Credentials,
    },
    secrecy::ExposeSecret,
    thiserror::Error,
};

use clockin_config::SmtpConfig;

/// Errors raised while validating or delivering a notification mail. These
/// never leave the notifier — they are logged and swallowed there.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail config error: {0}")]
    Config(String),

    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("mail transport error: {0}")]
    Transport(String),
}

/// One fully-rendered outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery seam; the notifier validates, this only ships.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: OutboundMail) -> Result<(), MailerError>;
}

/// Async SMTP delivery via lettre. `secure = true` opens an implicit-TLS
/// relay, `secure = false` a STARTTLS relay.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: OutboundMail) -> Result<(), MailerError> {
        let secure = self.config.secure.unwrap_or(true);
        let builder = if secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
        }
        .map_err(|e| MailerError::Transport(e.to_string()))?;

        let transport = builder
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.auth.user.clone(),
                self.config.auth.pass.expose_secret().clone(),
            ))
            .build();

        let message = Message::builder()
            .from(
                mail.from
                    .parse()
                    .map_err(|e| MailerError::Address(format!("from: {e}")))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|e| MailerError::Address(format!("to: {e}")))?)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Stand-in used when no transport is configured. Unreachable by
/// construction: the notifier short-circuits before delivery whenever the
/// transport section is absent.
pub(crate) struct NullTransport;

#[async_trait]
impl MailTransport for NullTransport {
    async fn deliver(&self, _mail: OutboundMail) -> Result<(), MailerError> {
        Err(MailerError::Config("no mail transport configured".into()))
    }
}
