use api::auth::generate_jwt;
use api::routes::routes;
use api::state::AppState;
use axum::Router;
use chrono::{NaiveTime, Timelike, Utc};
use db::models::event;
use db::test_utils::{seed_event_at, setup_test_db};
use sea_orm::DatabaseConnection;
use services::AttendanceSettings;
use services::notification::RecordingNotificationSender;
use std::sync::{Arc, Once};
use util::config::AppConfig;

static CONFIG: Once = Once::new();

fn init_test_config() {
    CONFIG.call_once(|| AppConfig::set_jwt_secret("test-secret"));
}

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub notifier: Arc<RecordingNotificationSender>,
}

/// A router over a fresh in-memory database, with notifications recorded.
pub async fn make_test_app() -> TestApp {
    init_test_config();

    let db = setup_test_db().await;
    let notifier = Arc::new(RecordingNotificationSender::new());
    let state = AppState::new(db.clone(), notifier.clone(), AttendanceSettings::default());

    TestApp {
        app: Router::new().nest("/api", routes(state)),
        db,
        notifier,
    }
}

pub fn auth_header(user_id: i64) -> String {
    let (token, _) = generate_jwt(user_id).unwrap();
    format!("Bearer {token}")
}

/// An event starting this second, so a scan right now is `PRESENT`.
pub async fn live_event(db: &DatabaseConnection, generation_id: i64) -> event::Model {
    let now = Utc::now().naive_utc();
    let start = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second()).unwrap();
    seed_event_at(db, generation_id, now.date(), start, (-10, 10, 30)).await
}
