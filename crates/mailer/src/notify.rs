//! The outcome notifier: config validation, rendering, best-effort dispatch.

use std::sync::Arc;

use {async_trait::async_trait, secrecy::ExposeSecret, tracing::error};

use {
    clockin_config::{MailConfig, MessageInfo, SmtpConfig},
    clockin_runner::{OutcomeNotifier, RunOutcome},
};

use crate::{
    template::{self, TemplateFields},
    transport::{MailTransport, MailerError, NullTransport, OutboundMail, SmtpMailer},
};

/// Sends one outcome mail per run. Mail is opt-in: an absent `mail` section
/// (or absent `info`/`transport` sub-sections) silently disables
/// notification, while a present-but-incomplete section is an operator
/// mistake and is logged as a config error.
pub struct MailNotifier {
    username: String,
    mail: Option<MailConfig>,
    transport: Arc<dyn MailTransport>,
}

impl MailNotifier {
    /// Build the production notifier, wiring an SMTP transport when one is
    /// configured.
    #[must_use]
    pub fn from_config(username: impl Into<String>, mail: Option<MailConfig>) -> Self {
        let transport: Arc<dyn MailTransport> =
            match mail.as_ref().and_then(|m| m.transport.clone()) {
                Some(smtp) => Arc::new(SmtpMailer::new(smtp)),
                None => Arc::new(NullTransport),
            };
        Self {
            username: username.into(),
            mail,
            transport,
        }
    }

    /// Test seam: inject a transport.
    #[must_use]
    pub fn with_transport(
        username: impl Into<String>,
        mail: Option<MailConfig>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            username: username.into(),
            mail,
            transport,
        }
    }
}

/// All transport fields must be filled in before a send is attempted.
fn check_transport(transport: &SmtpConfig) -> Result<(), MailerError> {
    let complete = !transport.host.is_empty()
        && transport.port != 0
        && transport.secure.is_some()
        && !transport.auth.user.is_empty()
        && !transport.auth.pass.expose_secret().is_empty();
    if complete {
        Ok(())
    } else {
        Err(MailerError::Config(
            "incomplete SMTP transport settings (host/port/secure/auth required)".into(),
        ))
    }
}

/// The envelope template needs every field before a send is attempted.
fn check_info(info: &MessageInfo) -> Result<(), MailerError> {
    let complete = !info.from.is_empty()
        && !info.to.is_empty()
        && !info.subject.is_empty()
        && !info.html.is_empty();
    if complete {
        Ok(())
    } else {
        Err(MailerError::Config(
            "incomplete mail sender info (from/to/subject/html required)".into(),
        ))
    }
}

#[async_trait]
impl OutcomeNotifier for MailNotifier {
    async fn notify(&self, outcome: RunOutcome, message: &str) {
        // Not configured at all: notification is off, stay silent.
        let Some(mail) = &self.mail else { return };
        let (Some(info), Some(transport)) = (&mail.info, &mail.transport) else {
            return;
        };

        // Present but incomplete: the operator meant to configure mail.
        if let Err(e) = check_transport(transport) {
            error!(error = %e, "failed to load SMTP transport settings");
            return;
        }
        if let Err(e) = check_info(info) {
            error!(error = %e, "failed to load mail sender info");
            return;
        }

        let fields = TemplateFields::now(&self.username, outcome.label(), message);
        let outbound = OutboundMail {
            from: info.from.clone(),
            to: info.to.clone(),
            subject: template::render(&info.subject, &fields),
            html: template::render(&info.html, &fields),
        };

        if let Err(e) = self.transport.deliver(outbound).await {
            error!(error = %e, "failed to send notification mail");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use secrecy::Secret;

    use {
        clockin_config::{MailConfig, MessageInfo, SmtpAuth, SmtpConfig},
        clockin_runner::RunOutcome,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundMail>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, mail: OutboundMail) -> Result<(), MailerError> {
            if self.fail {
                return Err(MailerError::Transport("relay refused".into()));
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn full_info() -> MessageInfo {
        MessageInfo {
            from: "bot@example.com".into(),
            to: "alice@example.com".into(),
            subject: "打卡通知：{{result}}".into(),
            html: "<p>{{username}} {{date}} {{time}}</p><p>{{result}}：{{message}}</p>".into(),
        }
    }

    fn full_transport() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port: 465,
            secure: Some(true),
            auth: SmtpAuth {
                user: "bot@example.com".into(),
                pass: Secret::new("mailpass".into()),
            },
        }
    }

    fn notifier_with(
        mail: Option<MailConfig>,
        fail: bool,
    ) -> (MailNotifier, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail,
        });
        (
            MailNotifier::with_transport("alice", mail, transport.clone()),
            transport,
        )
    }

    #[tokio::test]
    async fn absent_mail_config_sends_nothing() {
        let (notifier, transport) = notifier_with(None, false);
        notifier.notify(RunOutcome::Success, "ok").await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn absent_sub_sections_send_nothing() {
        for mail in [
            MailConfig {
                info: None,
                transport: None,
            },
            MailConfig {
                info: Some(full_info()),
                transport: None,
            },
            MailConfig {
                info: None,
                transport: Some(full_transport()),
            },
        ] {
            let (notifier, transport) = notifier_with(Some(mail), false);
            notifier.notify(RunOutcome::Success, "ok").await;
            assert!(transport.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn missing_smtp_pass_is_config_error_and_no_send() {
        let mut smtp = full_transport();
        smtp.auth.pass = Secret::new(String::new());
        let mail = MailConfig {
            info: Some(full_info()),
            transport: Some(smtp),
        };
        let (notifier, transport) = notifier_with(Some(mail), false);
        notifier.notify(RunOutcome::LoginFailed, "密码错误").await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unset_secure_flag_is_config_error() {
        let mut smtp = full_transport();
        smtp.secure = None;
        let mail = MailConfig {
            info: Some(full_info()),
            transport: Some(smtp),
        };
        let (notifier, transport) = notifier_with(Some(mail), false);
        notifier.notify(RunOutcome::Success, "ok").await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_info_field_is_config_error() {
        let mut info = full_info();
        info.html = String::new();
        let mail = MailConfig {
            info: Some(info),
            transport: Some(full_transport()),
        };
        let (notifier, transport) = notifier_with(Some(mail), false);
        notifier.notify(RunOutcome::Success, "ok").await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_config_sends_rendered_mail() {
        let mail = MailConfig {
            info: Some(full_info()),
            transport: Some(full_transport()),
        };
        let (notifier, transport) = notifier_with(Some(mail), false);
        notifier
            .notify(RunOutcome::ValidationFailed, "数据不一致")
            .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let mail = &sent[0];
        assert_eq!(mail.to, "alice@example.com");
        assert_eq!(mail.subject, "打卡通知：数据校验失败");
        assert!(mail.html.contains("alice"));
        assert!(mail.html.contains("数据校验失败：数据不一致"));
        assert!(!mail.html.contains("{{"), "unrendered field: {}", mail.html);
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let mail = MailConfig {
            info: Some(full_info()),
            transport: Some(full_transport()),
        };
        let (notifier, _transport) = notifier_with(Some(mail), true);
        // Must not panic or propagate.
        notifier.notify(RunOutcome::Success, "ok").await;
    }

    #[test]
    fn check_transport_requires_every_field() {
        assert!(check_transport(&full_transport()).is_ok());
        let mut smtp = full_transport();
        smtp.port = 0;
        assert!(check_transport(&smtp).is_err());
        let mut smtp = full_transport();
        smtp.host.clear();
        assert!(check_transport(&smtp).is_err());
        let mut smtp = full_transport();
        smtp.auth.user.clear();
        assert!(check_transport(&smtp).is_err());
    }

    #[test]
    fn check_info_requires_every_field() {
        assert!(check_info(&full_info()).is_ok());
        for strip in 0..4 {
            let mut info = full_info();
            match strip {
                0 => info.from.clear(),
                1 => info.to.clear(),
                2 => info.subject.clear(),
                _ => info.html.clear(),
            }
            assert!(check_info(&info).is_err(), "field {strip} must be required");
        }
    }
}
