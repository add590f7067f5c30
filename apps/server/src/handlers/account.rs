//! Login, logout and manager-run registration.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Query, State};
use serde::Deserialize;
use stockroom_core::validation::{validate_new_password, validate_username};
use stockroom_core::{Operation, Role, ValidationError};
use stockroom_db::NewUser;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthError, Viewer};
use crate::cookie::{self, SESSION_COOKIE};
use crate::error::{is_local_path, login_url, AppError, AppResult};
use crate::flash::{Flash, Notice, Page, SeeOther};
use crate::views::{role_choices, LoginView, RegisterView};
use crate::AppState;

const LOGIN_PATH: &str = "/login/";
const REGISTER_PATH: &str = "/register/";

// =============================================================================
// Login / Logout
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

/// `GET /login/`
pub async fn login_form(
    viewer: Viewer,
    mut flash: Flash,
    Query(params): Query<LoginParams>,
) -> Page<LoginView> {
    let view = LoginView {
        action: LOGIN_PATH,
        next: params.next.filter(|n| is_local_path(n)),
        signed_in_as: viewer.principal().map(|p| p.username.clone()),
        notices: flash.take(),
    };
    Page::new(view, &flash)
}

/// `POST /login/`
///
/// Unknown usernames, wrong passwords and inactive accounts all get the same
/// notice. A user without a profile gets one here.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<SeeOther> {
    let username = form.username.trim();
    let users = state.db.users();

    let candidate = users
        .find_by_username(username)
        .await?
        .filter(|user| user.is_active);

    let verified = match candidate {
        Some(user) => {
            let password = form.password.clone();
            let hash = user.password_hash.clone();
            let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            matches.then_some(user)
        }
        None => None,
    };

    let Some(user) = verified else {
        warn!(username = %username, "Failed login");
        return Ok(SeeOther::to(login_url(&form.next))
            .notice(Notice::error(AuthError::InvalidCredentials.to_string())));
    };

    let profile = users.ensure_profile(&user).await?;
    let token = state.sessions.issue(user.id)?;

    info!(user_id = user.id, username = %user.username, role = %profile.role, "User logged in");

    let target = if is_local_path(&form.next) {
        form.next.as_str()
    } else {
        "/"
    };

    Ok(SeeOther::to(target)
        .cookie(cookie::set(
            SESSION_COOKIE,
            &token,
            Some(state.sessions.lifetime_secs()),
            state.config.secure_cookies,
        ))
        .notice(Notice::success(format!("Welcome back, {}!", user.username))))
}

/// `GET /logout/`
pub async fn logout(State(state): State<AppState>, viewer: Viewer) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::Logout)?;
    info!(user_id = principal.user_id, username = %principal.username, "User logged out");

    Ok(SeeOther::to(LOGIN_PATH)
        .cookie(cookie::clear(SESSION_COOKIE, state.config.secure_cookies))
        .notice(Notice::info("You have been logged out.")))
}

// =============================================================================
// Register
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
}

impl RegisterForm {
    /// Blank means staff.
    fn role(&self) -> Result<Role, ValidationError> {
        if self.role.trim().is_empty() {
            return Ok(Role::Staff);
        }
        Role::parse(&self.role).ok_or_else(|| ValidationError::NotAllowed {
            field: "role".to_string(),
            allowed: vec![Role::Staff.to_string(), Role::Manager.to_string()],
        })
    }
}

/// `GET /register/`
pub async fn register_form(viewer: Viewer, mut flash: Flash) -> AppResult<Page<RegisterView>> {
    viewer.require(Operation::RegisterUser)?;

    let view = RegisterView {
        action: REGISTER_PATH,
        roles: role_choices(),
        notices: flash.take(),
    };
    Ok(Page::new(view, &flash))
}

/// `POST /register/`
pub async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::RegisterUser)?;
    let Form(form) = form.map_err(|e| AppError::from(e).back_to(REGISTER_PATH))?;
    let back = |e: ValidationError| AppError::from(e).back_to(REGISTER_PATH);

    let username = validate_username(&form.username).map_err(back)?;
    validate_new_password(&form.password, &form.confirm_password).map_err(back)?;
    let role = form.role().map_err(back)?;

    let password = form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let (user, profile) = state
        .db
        .users()
        .create(&NewUser::new(username, password_hash).role(role))
        .await
        .map_err(|e| AppError::from(e).back_to(REGISTER_PATH))?;

    info!(
        user_id = user.id,
        username = %user.username,
        role = %profile.role,
        by = %principal.username,
        "Account registered"
    );

    let role_label = match profile.role {
        Role::Manager => "Manager",
        Role::Staff => "Staff",
    };
    Ok(SeeOther::to("/").notice(Notice::success(format!(
        "{role_label} account created successfully for {}!",
        user.username
    ))))
}
