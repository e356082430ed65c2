//! Outbound member notifications.
//!
//! The protocols only know the [`NotificationSender`] trait. Delivery (push,
//! mail, whatever) lives behind it and is injected at startup.

use async_trait::async_trait;
use db::models::attendance::AttendanceStatus;
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub deeplink: Option<String>,
}

impl Notification {
    fn for_event(title: String, body: String, deeplink_scheme: &str, event_id: i64) -> Self {
        Self {
            title,
            body,
            deeplink: Some(format!("{deeplink_scheme}://deeplink/event/{event_id}")),
        }
    }

    /// Sent to a member whose attendance an officer changed.
    pub fn attendance_change(
        event_id: i64,
        event_title: &str,
        status: AttendanceStatus,
        deeplink_scheme: &str,
    ) -> Self {
        Self::for_event(
            "Attendance status changed".into(),
            format!("[{event_title}] attendance was changed to {status}."),
            deeplink_scheme,
            event_id,
        )
    }

    /// Sent to the member once an officer decides their edit request.
    pub fn edit_request_reviewed(
        event_id: i64,
        event_title: &str,
        status: AttendanceStatus,
        approved: bool,
        deeplink_scheme: &str,
    ) -> Self {
        let verdict = if approved { "approved" } else { "rejected" };
        Self::for_event(
            format!("Edit request {verdict}"),
            format!("[{event_title}] your request to change attendance to {status} was {verdict}."),
            deeplink_scheme,
            event_id,
        )
    }

    /// Sent to the attendance managers when a member applies for an absence.
    pub fn absence_applied(
        event_id: i64,
        event_title: &str,
        username: &str,
        status: AttendanceStatus,
        deeplink_scheme: &str,
    ) -> Self {
        Self::for_event(
            format!("{status} application"),
            format!("[{event_title}] {username} applied for {status}."),
            deeplink_scheme,
            event_id,
        )
    }

    /// Sent to the member once an officer decides their absence application.
    pub fn absence_reviewed(
        event_id: i64,
        event_title: &str,
        status: AttendanceStatus,
        approved: bool,
        deeplink_scheme: &str,
    ) -> Self {
        let verdict = if approved { "approved" } else { "rejected" };
        Self::for_event(
            format!("{status} application {verdict}"),
            format!("[{event_title}] your {status} application was {verdict}."),
            deeplink_scheme,
            event_id,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_to_user(
        &self,
        user_id: i64,
        notification: &Notification,
    ) -> Result<(), NotificationError>;

    /// Sends the same notification to several users. Stops at the first
    /// failure unless the implementation overrides it.
    async fn send_to_users(
        &self,
        user_ids: &[i64],
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        for &user_id in user_ids {
            self.send_to_user(user_id, notification).await?;
        }
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send_to_user(
        &self,
        user_id: i64,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            user_id,
            title = %notification.title,
            body = %notification.body,
            deeplink = notification.deeplink.as_deref().unwrap_or(""),
            "notification"
        );
        Ok(())
    }
}

/// Test double that keeps every dispatch. With `failing` set every call
/// errors after being recorded.
#[derive(Debug, Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<(Vec<i64>, Notification)>>,
    failing: bool,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// One entry per `send_to_user`/`send_to_users` call.
    pub fn calls(&self) -> Vec<(Vec<i64>, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(
        &self,
        user_ids: Vec<i64>,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((user_ids, notification.clone()));
        }
        if self.failing {
            return Err(NotificationError::Delivery("recording sender set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_to_user(
        &self,
        user_id: i64,
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        self.record(vec![user_id], notification)
    }

    async fn send_to_users(
        &self,
        user_ids: &[i64],
        notification: &Notification,
    ) -> Result<(), NotificationError> {
        self.record(user_ids.to_vec(), notification)
    }
}
