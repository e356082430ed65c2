pub mod app;

pub use app::{TestApp, auth_header, live_event, make_test_app};
