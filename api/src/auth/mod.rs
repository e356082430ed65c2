pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims};

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use util::config;

/// Generates a JWT and its expiry timestamp for a given user.
///
/// Token issuance belongs to the account service; this is what it and the
/// tests use to mint tokens the extractor accepts.
pub fn generate_jwt(user_id: i64) -> Result<(String, String), jsonwebtoken::errors::Error> {
    // Capped at a year.
    let minutes = config::jwt_duration_minutes().min(525_600) as i64;
    let expiry = Utc::now() + Duration::minutes(minutes);

    let claims = Claims {
        sub: user_id,
        exp: expiry.timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::jwt_secret().as_bytes()),
    )?;

    Ok((token, expiry.to_rfc3339()))
}
