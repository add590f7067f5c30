//! Session extractor.
//!
//! Resolves the session cookie into the acting [`Principal`] for every
//! request that asks for a [`Viewer`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use stockroom_core::{authorize, Access, Operation, Principal};
use tracing::{debug, warn};

use crate::cookie::{self, SESSION_COOKIE};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Who is asking, and for which path.
///
/// `principal` is `None` for anonymous requests, and for sessions whose
/// token is invalid or whose account is gone or deactivated.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub principal: Option<Principal>,
    /// Path and query of the request, used as the login `next` target.
    pub path: String,
}

impl Viewer {
    pub fn anonymous(path: impl Into<String>) -> Self {
        Viewer {
            principal: None,
            path: path.into(),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Gate for operations that need a signed-in principal.
    ///
    /// ## Errors
    /// - `AppError::LoginRequired` for anonymous viewers
    /// - `AppError::Forbidden` when the role is not enough
    pub fn require(&self, operation: Operation) -> AppResult<&Principal> {
        match (authorize(self.principal(), operation), self.principal()) {
            (Access::Allowed, Some(principal)) => Ok(principal),
            (Access::Denied, Some(principal)) => {
                warn!(
                    user_id = principal.user_id,
                    username = %principal.username,
                    role = %principal.role,
                    ?operation,
                    "Access denied"
                );
                Err(AppError::Forbidden)
            }
            _ => {
                debug!(?operation, path = %self.path, "Login required");
                Err(AppError::LoginRequired {
                    next: self.path.clone(),
                })
            }
        }
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let Some(token) = cookie::read(&parts.headers, SESSION_COOKIE).filter(|t| !t.is_empty())
        else {
            return Ok(Viewer::anonymous(path));
        };

        let user_id = match state.sessions.verify(token).and_then(|c| c.user_id()) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Ignoring session cookie");
                return Ok(Viewer::anonymous(path));
            }
        };

        let principal = state.db.users().principal(user_id).await?;
        if principal.is_none() {
            debug!(user_id, "Session user missing or inactive");
        }

        Ok(Viewer { principal, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::Role;

    fn viewer(role: Option<Role>) -> Viewer {
        Viewer {
            principal: role.map(|role| Principal {
                user_id: 1,
                username: "sam".to_string(),
                role,
            }),
            path: "/add-stock/".to_string(),
        }
    }

    #[test]
    fn test_require_maps_policy_outcomes() {
        assert!(viewer(Some(Role::Manager)).require(Operation::AddStock).is_ok());
        assert!(viewer(Some(Role::Staff)).require(Operation::RecordSale).is_ok());

        assert!(matches!(
            viewer(Some(Role::Staff)).require(Operation::AddStock),
            Err(AppError::Forbidden)
        ));
        match viewer(None).require(Operation::ViewDashboard) {
            Err(AppError::LoginRequired { next }) => assert_eq!(next, "/add-stock/"),
            other => panic!("expected login redirect, got {other:?}"),
        }
    }
}
