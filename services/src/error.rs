use sea_orm::DbErr;
use serde::Serialize;

pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Broad category of a failure, used to pick the transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Internal,
}

/// Every way a check-in, override, finalize or review call can be refused.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("The attendance code is invalid or has expired")]
    InvalidCode,

    #[error("Check-in for this event is not open yet")]
    NotOpenYet,

    #[error("The event has not reached its absence threshold yet")]
    NotDue,

    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("You are not a member of this club")]
    NotRegisteredClub,

    #[error("Your join request is waiting for approval")]
    WaitingForApproval,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Attendance has already been recorded")]
    AlreadyCheckedIn,

    #[error("This request has already been reviewed")]
    AlreadyReviewed,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AttendanceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCode => "INVALID_CODE",
            Self::NotOpenYet => "NOT_OPEN_YET",
            Self::NotDue => "NOT_DUE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotRegisteredClub => "NOT_REGISTERED_CLUB",
            Self::WaitingForApproval => "WAITING_FOR_APPROVAL",
            Self::Forbidden => "FORBIDDEN",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::AlreadyReviewed => "ALREADY_REVIEWED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "INTERNAL",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode | Self::NotOpenYet | Self::NotDue | Self::InvalidRequest(_) => {
                ErrorKind::Validation
            }
            Self::NotRegisteredClub | Self::WaitingForApproval | Self::Forbidden => {
                ErrorKind::Authorization
            }
            Self::AlreadyCheckedIn | Self::AlreadyReviewed => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}
