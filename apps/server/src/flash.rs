//! # Flash Notices
//!
//! One-shot messages that survive exactly one redirect.
//!
//! ```text
//! POST /add-stock/ ──► 303 See Other
//!                      Location: /
//!                      Set-Cookie: stockroom_flash=<base64(json)>
//!
//! GET /            ──► view { notices: [...] }
//!                      Set-Cookie: stockroom_flash=; Max-Age=0
//! ```
//!
//! The cookie holds URL-safe base64 of a JSON array of [`Notice`]s. A cookie
//! that fails to decode is treated as empty.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Json, Redirect, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cookie::{self, FLASH_COOKIE};

// =============================================================================
// Notice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A message shown once on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: Level::Error,
            message: message.into(),
        }
    }
}

pub fn encode(notices: &[Notice]) -> String {
    // Vec<Notice> always serializes.
    let json = serde_json::to_vec(notices).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(raw: &str) -> Vec<Notice> {
    URL_SAFE_NO_PAD
        .decode(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

// =============================================================================
// Incoming
// =============================================================================

/// Notices carried in on the request.
#[derive(Debug, Clone, Default)]
pub struct Flash {
    notices: Vec<Notice>,
    present: bool,
}

impl Flash {
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Takes the notices for a view. The cookie is cleared by [`Page`].
    pub fn take(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn is_present(&self) -> bool {
        self.present
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = cookie::read(&parts.headers, FLASH_COOKIE) else {
            return Ok(Flash::default());
        };

        let notices = decode(raw);
        debug!(count = notices.len(), "Flash notices received");

        Ok(Flash {
            notices,
            present: true,
        })
    }
}

// =============================================================================
// Responses
// =============================================================================

/// A JSON view that also clears the flash cookie once it has been shown.
#[derive(Debug)]
pub struct Page<T> {
    body: T,
    clear_flash: bool,
}

impl<T: Serialize> Page<T> {
    pub fn new(body: T, flash: &Flash) -> Self {
        Page {
            body,
            clear_flash: flash.is_present(),
        }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        if self.clear_flash {
            append_cookie(&mut response, &cookie::clear(FLASH_COOKIE, false));
        }
        response
    }
}

/// `303 See Other` with optional notices and extra cookies.
///
/// ## Example
/// ```rust,ignore
/// Ok(SeeOther::to("/").notice(Notice::success("Stock updated successfully.")))
/// ```
#[derive(Debug, Clone)]
pub struct SeeOther {
    location: String,
    notices: Vec<Notice>,
    cookies: Vec<String>,
}

impl SeeOther {
    pub fn to(location: impl Into<String>) -> Self {
        SeeOther {
            location: location.into(),
            notices: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    /// Adds a raw `Set-Cookie` value.
    pub fn cookie(mut self, set_cookie: String) -> Self {
        self.cookies.push(set_cookie);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for SeeOther {
    fn into_response(self) -> Response {
        let mut response = Redirect::to(&self.location).into_response();

        if !self.notices.is_empty() {
            let value = encode(&self.notices);
            append_cookie(&mut response, &cookie::set(FLASH_COOKIE, &value, None, false));
        }
        for set_cookie in &self.cookies {
            append_cookie(&mut response, set_cookie);
        }

        response
    }
}

fn append_cookie(response: &mut Response, set_cookie: &str) {
    match HeaderValue::from_str(set_cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => debug!(error = %e, "Dropping unencodable cookie"),
    }
}
