//! User-visible notifications.
//!
//! Controllers push through a cloned [`Notifier`]; the UI shell owns the
//! receiving end and decides how to display them.

use tokio::sync::mpsc;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Set for 401/403 failures; the shell redirects to sign-in
    pub sign_in_required: bool,
}

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn channel() -> (Notifier, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Notifier { tx }, rx)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message.into(), false);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message.into(), false);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Warning, message.into(), false);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message.into(), false);
    }

    /// Report a failed operation with the error's message verbatim.
    pub fn failure(&self, err: &AppError) {
        self.push(NotificationLevel::Error, err.message(), err.requires_sign_in());
    }

    fn push(&self, level: NotificationLevel, message: String, sign_in_required: bool) {
        let notification = Notification {
            level,
            message,
            sign_in_required,
        };
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification dropped, no receiver");
        }
    }
}
