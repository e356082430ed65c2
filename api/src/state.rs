use sea_orm::DatabaseConnection;
use services::AttendanceSettings;
use services::notification::NotificationSender;
use std::sync::Arc;

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    notifier: Arc<dyn NotificationSender>,
    settings: Arc<AttendanceSettings>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        notifier: Arc<dyn NotificationSender>,
        settings: AttendanceSettings,
    ) -> Self {
        Self {
            db,
            notifier,
            settings: Arc::new(settings),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn notifier(&self) -> &dyn NotificationSender {
        self.notifier.as_ref()
    }

    pub fn settings(&self) -> &AttendanceSettings {
        &self.settings
    }
}
