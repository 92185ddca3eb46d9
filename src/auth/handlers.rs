use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        jwt::{CurrentUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Genders are stored as a single uppercase letter, "F" or "M".
pub(crate) fn normalize_gender(raw: &str) -> Option<String> {
    match raw.trim().to_uppercase().as_str() {
        "F" | "FEMALE" => Some("F".into()),
        "M" | "MALE" => Some("M".into()),
        _ => None,
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.username = payload.username.trim().to_lowercase();
    if payload.username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".into()));
    }
    if payload.password.len() < 8 {
        warn!(username = %payload.username, "password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    let gender = normalize_gender(&payload.gender)
        .ok_or_else(|| ApiError::BadRequest("Gender must be F or M".into()))?;

    let email = match payload.email.as_deref().map(|e| e.trim().to_lowercase()) {
        Some(e) if e.is_empty() => None,
        other => other,
    };
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            warn!(email, "invalid email");
            return Err(ApiError::BadRequest("Invalid email".into()));
        }
        if User::find_by_email(&state.db, email).await?.is_some() {
            warn!(email, "email already registered");
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.username,
        email.as_deref(),
        &hash,
        &gender,
        payload.birth_date,
    )
    .await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.username = payload.username.trim().to_lowercase();

    // Unknown usernames are a 400 on this surface; only a failed password
    // check is a 403.
    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::BadRequest("Unknown username".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Forbidden("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(user.id, user.is_admin)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse { access_token }))
}

#[instrument(skip(user))]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn gender_normalization() {
        assert_eq!(normalize_gender("f").as_deref(), Some("F"));
        assert_eq!(normalize_gender(" Male ").as_deref(), Some("M"));
        assert_eq!(normalize_gender("x"), None);
        assert_eq!(normalize_gender(""), None);
    }
}
