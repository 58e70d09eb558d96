//! Outcome notification by email.
//!
//! [`MailNotifier`] implements the orchestrator's `OutcomeNotifier` seam:
//! it validates the (optional) mail configuration, renders the operator's
//! HTML template, and hands the message to an SMTP transport. Its own
//! failures are logged and swallowed — a broken mailbox never masks the
//! run's outcome.

pub mod notify;
pub mod template;
pub mod transport;

pub use {
    notify::MailNotifier,
    template::TemplateFields,
    transport::{MailTransport, MailerError, OutboundMail, SmtpMailer},
};
