pub mod absence_application;
pub mod abuse_flag;
pub mod attendance;
pub mod club;
pub mod device_token;
pub mod edit_request;
pub mod event;
pub mod generation;
pub mod join_request;
pub mod membership;
pub mod role;
pub mod user;

pub use absence_application::Entity as AbsenceApplication;
pub use abuse_flag::Entity as AbuseFlag;
pub use attendance::Entity as Attendance;
pub use club::Entity as Club;
pub use device_token::Entity as DeviceToken;
pub use edit_request::Entity as EditRequest;
pub use event::Entity as Event;
pub use generation::Entity as Generation;
pub use join_request::Entity as JoinRequest;
pub use membership::Entity as Membership;
pub use role::Entity as Role;
pub use user::Entity as User;
