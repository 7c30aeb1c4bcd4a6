//! Session-cookie authentication: registration, login, logout and the
//! require-auth middleware.
//!
//! Passwords are hashed with argon2. Sessions are opaque UUID tokens stored in
//! the sessions table and carried in an HttpOnly cookie; the middleware
//! resolves the cookie to a user row on every request.

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{LoginRequest, RegisterRequest, ResetPasswordRequest, User, UserResponse};
use crate::validation::{is_valid_username, MIN_PASSWORD_LEN};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const SESSION_COOKIE: &str = "session";

/// Authenticated user attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.0.role == "admin"
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::InternalError(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

fn session_token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .and_then(|t| Uuid::parse_str(t).ok())
}

/// Creates a session row and returns the Set-Cookie value for it.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    let token = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::days(state.config.session_ttl_days);

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&state.db)
        .await?;

    Ok(session_cookie(
        &token.to_string(),
        Duration::days(state.config.session_ttl_days).num_seconds(),
    ))
}

/// Middleware for all business routes: resolves the session cookie to a user
/// and attaches it as a [`CurrentUser`] extension. 401 when missing/expired.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token_from_headers(req.headers())
        .ok_or_else(|| AppError::Unauthorized("No session cookie".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = $1 AND s.expires_at > now()
        "#,
    )
    .bind(token)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Session expired or invalid".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// POST /api/register
///
/// Creates a user, opens a session and sets the cookie. The endpoint is
/// public, so it always creates a cobrador; admin accounts only come from
/// [`debug_bootstrap_admin`].
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<UserResponse>), AppError> {
    if !is_valid_username(&req.username) {
        return Err(AppError::BadRequest(
            "El nombre de usuario debe tener entre 3 y 32 caracteres alfanumericos".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "La contrasena debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }
    let taken: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(
            "El nombre de usuario ya esta en uso".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, 'cobrador')
        RETURNING *
        "#,
    )
    .bind(&req.username)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    let cookie = open_session(&state, user.id).await?;
    tracing::info!("Usuario {} registrado ({})", user.username, user.role);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(user.into()),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<([(header::HeaderName, String); 1], Json<UserResponse>), AppError> {
    // Opportunistic cleanup of expired sessions
    sqlx::query("DELETE FROM sessions WHERE expires_at < now()")
        .execute(&state.db)
        .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Usuario o contrasena incorrectos".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Usuario o contrasena incorrectos".to_string(),
        ));
    }

    let cookie = open_session(&state, user.id).await?;
    tracing::info!("Usuario {} inicio sesion", user.username);

    Ok(([(header::SET_COOKIE, cookie)], Json(user.into())))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, [(header::HeaderName, String); 1]), AppError> {
    if let Some(token) = session_token_from_headers(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&state.db)
            .await?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie("", 0))],
    ))
}

/// GET /api/user — the authenticated user behind the session cookie.
pub async fn current_user(
    Extension(user): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(user.0.into())
}

/// POST /api/debug/bootstrap-admin
///
/// Debug-only bootstrap: creates the first admin account on a fresh install.
/// 404 unless DEBUG_ENDPOINTS is set; 409 once any admin exists.
pub async fn debug_bootstrap_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if !state.config.debug_endpoints {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    if !is_valid_username(&req.username) || req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Usuario o contrasena invalidos para el administrador".to_string(),
        ));
    }

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&state.db)
        .await?;
    if admins > 0 {
        return Err(AppError::Conflict(
            "Ya existe un administrador".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, 'admin')
        RETURNING *
        "#,
    )
    .bind(&req.username)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    tracing::warn!("Admin {} bootstrapped via debug endpoint", user.username);
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/debug/reset-password
///
/// Debug-only recovery path; 404 unless DEBUG_ENDPOINTS is set.
pub async fn debug_reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    if !state.config.debug_endpoints {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "La contrasena debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }

    let hash = hash_password(&req.new_password)?;
    let updated = sqlx::query("UPDATE users SET password_hash = $2 WHERE username = $1")
        .bind(&req.username)
        .bind(&hash)
        .execute(&state.db)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Usuario {} no encontrado",
            req.username
        )));
    }

    tracing::warn!("Password reset via debug endpoint for {}", req.username);
    Ok(StatusCode::OK)
}
