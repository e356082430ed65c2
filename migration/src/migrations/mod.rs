pub mod m202510010001_create_users;
pub mod m202510010002_create_clubs;
pub mod m202510010003_create_memberships;
pub mod m202510010004_create_events;
pub mod m202510010005_create_attendance;
pub mod m202510010006_create_edit_requests;
pub mod m202510010007_create_absence_applications;
