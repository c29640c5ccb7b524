//! Account lifecycle notifications.
//!
//! Notifiers are fire-and-forget: callers never wait on delivery and never
//! see its outcome.

use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use service_core::error::AppError;
use service_core::utils::{format_date_and_time, format_terms_agreement_date};
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::models::User;

pub trait Notifier: Send + Sync {
    fn account_registered(&self, user: &User);
    fn account_reactivated(&self, user: &User);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Welcome message for a newly provisioned account, `None` without an address.
pub fn registration_email(user: &User, origin: &str) -> Option<Email> {
    let to = user.email_address()?;
    Some(Email {
        to: to.to_string(),
        subject: "Welcome to the Digital Marketplace".to_string(),
        body: format!(
            "Hello {},\n\n\
             Your Digital Marketplace account was created on {}.\n\
             {}\n\n\
             Finish setting up your profile at {}/sign-up/complete.\n",
            display_name(user),
            format_date_and_time(&user.created_at, true),
            format_terms_agreement_date(user.accepted_terms_at.as_ref(), "You", "have"),
            origin
        ),
    })
}

pub fn reactivation_email(user: &User, origin: &str) -> Option<Email> {
    let to = user.email_address()?;
    Some(Email {
        to: to.to_string(),
        subject: "Your Digital Marketplace account has been reactivated".to_string(),
        body: format!(
            "Hello {},\n\n\
             Your Digital Marketplace account was reactivated on {}.\n\n\
             Sign in any time at {}.\n",
            display_name(user),
            format_date_and_time(&Utc::now(), true),
            origin
        ),
    })
}

fn display_name(user: &User) -> &str {
    if user.name.trim().is_empty() {
        "there"
    } else {
        &user.name
    }
}

/// Sends notifications over SMTP on a background task per message.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    origin: String,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig, origin: &str) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid from address: {}", e)))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP notifier initialized");

        Ok(Self {
            transport,
            from,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    fn dispatch(&self, kind: &'static str, email: Option<Email>) {
        let Some(email) = email else {
            tracing::debug!(kind, "No email address on account, skipping notification");
            return;
        };

        let to: Mailbox = match email.to.parse() {
            Ok(to) => to,
            Err(e) => {
                tracing::warn!(kind, error = %e, "Invalid recipient, skipping notification");
                return;
            }
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
        {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(kind, error = %e, "Failed to build notification email");
                return;
            }
        };

        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => tracing::info!(kind, "Notification email sent"),
                Err(e) => tracing::error!(kind, error = %e, "Failed to send notification email"),
            }
        });
    }
}

impl Notifier for EmailNotifier {
    fn account_registered(&self, user: &User) {
        self.dispatch("account_registered", registration_email(user, &self.origin));
    }

    fn account_reactivated(&self, user: &User) {
        self.dispatch("account_reactivated", reactivation_email(user, &self.origin));
    }
}

/// Used when SMTP is disabled.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn account_registered(&self, user: &User) {
        tracing::info!(user_id = %user.id, "Account registered (email disabled)");
    }

    fn account_reactivated(&self, user: &User) {
        tracing::info!(user_id = %user.id, "Account reactivated (email disabled)");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    AccountRegistered(Uuid),
    AccountReactivated(Uuid),
}

/// Records notifications in memory for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn record(&self, notification: Notification) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn account_registered(&self, user: &User) {
        self.record(Notification::AccountRegistered(user.id));
    }

    fn account_reactivated(&self, user: &User) {
        self.record(Notification::AccountReactivated(user.id));
    }
}
