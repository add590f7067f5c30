//! # Authentication
//!
//! ```text
//! POST /login/ ──► password::verify_password(argon2 PHC)
//!                      │ ok
//!                      ▼
//!                  SessionKeys::issue(user_id) ──► Set-Cookie: stockroom_session=<JWT>
//!
//! any request  ──► Viewer extractor
//!                      │ cookie → SessionKeys::verify → users().principal(sub)
//!                      ▼
//!                  Viewer(Option<Principal>) ──► Viewer::require(operation)
//! ```
//!
//! The token only names the user. Role and active flag are re-read from the
//! database on every request.

pub mod extractor;
pub mod password;
pub mod session;

pub use extractor::Viewer;
pub use password::{hash_password, verify_password};
pub use session::{Claims, SessionKeys};

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Failed to issue session token: {0}")]
    TokenIssue(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),
}
