//! Error types for the HTTP layer.
//!
//! ```text
//! ValidationError ─► CoreError ─► DbError ─► AppError ─► Response
//!
//! AppError::LoginRequired   303 /login/?next=<path>   + info notice
//! AppError::Forbidden       303 /                     + "Access denied. Manager only area."
//! AppError::Invalid         303 back to the form      + error notice
//!                           (400 JSON without a form to go back to)
//! AppError::NotFound        404 JSON
//! Database / Auth / Internal  500 JSON, logged with error!
//! ```

use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use tracing::error;

use crate::auth::AuthError;
use crate::flash::{Notice, SeeOther};

pub const ACCESS_DENIED: &str = "Access denied. Manager only area.";
pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";
const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    #[error("{}", ACCESS_DENIED)]
    Forbidden,

    /// Something the user typed; sent back to `back_to` when known.
    #[error("{message}")]
    Invalid {
        message: String,
        back_to: Option<String>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(DbError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Invalid {
            message: message.into(),
            back_to: None,
        }
    }

    /// Sends user-input errors back to `path`. Other errors are untouched.
    pub fn back_to(self, path: impl Into<String>) -> Self {
        match self {
            AppError::Invalid { message, .. } => AppError::Invalid {
                message,
                back_to: Some(path.into()),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::LoginRequired { .. } | AppError::Forbidden => StatusCode::SEE_OTHER,
            AppError::Invalid { back_to: Some(_), .. } => StatusCode::SEE_OTHER,
            AppError::Invalid { back_to: None, .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Auth(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        if err.is_user_input() {
            AppError::invalid(err.to_string())
        } else {
            AppError::NotFound(err.to_string())
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::invalid(err.to_string())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => AppError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => AppError::invalid(err.to_string()),
            other => AppError::Database(other),
        }
    }
}

/// A body that did not decode. Handlers take `Result<Form<_>, FormRejection>`
/// and convert only after the access check, so anonymous and staff requests
/// still get their redirects.
impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::LoginRequired { next } => SeeOther::to(login_url(&next))
                .notice(Notice::info(LOGIN_REQUIRED))
                .into_response(),

            AppError::Forbidden => SeeOther::to("/")
                .notice(Notice::error(ACCESS_DENIED))
                .into_response(),

            AppError::Invalid {
                message,
                back_to: Some(path),
            } => SeeOther::to(path).notice(Notice::error(message)).into_response(),

            AppError::Invalid {
                message,
                back_to: None,
            } => (status, Json(json!({ "error": message }))).into_response(),

            AppError::NotFound(message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }

            infra @ (AppError::Database(_) | AppError::Auth(_) | AppError::Internal(_)) => {
                error!(error = %infra, "Request failed");
                (status, Json(json!({ "error": GENERIC_FAILURE }))).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// `/login/?next=<path>`, with `next` percent-encoded.
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        return "/login/".to_string();
    }
    format!("/login/?next={}", urlencoding::encode(next))
}

/// True for same-site paths (`/x`), false for `//host` and absolute URLs.
pub fn is_local_path(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url() {
        assert_eq!(login_url("/"), "/login/");
        assert_eq!(login_url(""), "/login/");
        assert_eq!(login_url("/record-sale/"), "/login/?next=%2Frecord-sale%2F");
        assert_eq!(
            login_url("/?q=casio g&x=1"),
            "/login/?next=%2F%3Fq%3Dcasio%20g%26x%3D1"
        );
    }

    #[test]
    fn test_local_paths() {
        assert!(is_local_path("/sale/3/"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn test_domain_errors_map_to_user_input() {
        let err: AppError = DbError::Domain(CoreError::InsufficientStock {
            ref_no: "A1".into(),
            requested: 12,
            available: 10,
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.back_to("/record-sale/").status(),
            StatusCode::SEE_OTHER
        );

        let err: AppError = DbError::Domain(CoreError::ProductNotFound(4)).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = CoreError::SaleNotFound(9).into();
        assert!(matches!(&err, AppError::NotFound(m) if m == "Sale not found: 9"));

        let err: AppError = CoreError::TooManyLines { max: 50 }.into();
        assert!(matches!(err, AppError::Invalid { back_to: None, .. }));

        let err: AppError = DbError::Busy.into();
        assert_eq!(err.back_to("/x/").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forbidden_redirects_home_with_notice() {
        let response = AppError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
        assert!(response.headers().get("set-cookie").is_some());
    }
}
