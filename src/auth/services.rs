use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use super::jwt::JwtKeys;
use super::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::new_id;
use crate::validation::{
    check_length, is_valid_email, PASSWORD_MAX, PASSWORD_MIN, PSEUDO_MAX, PSEUDO_MIN,
};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("invalid email"));
    }
    Ok(email)
}

fn issue_tokens(keys: &JwtKeys, user: &User) -> AppResult<AuthResponse> {
    let role = user.role();
    Ok(AuthResponse {
        access_token: keys.sign_access(&user.id, role)?,
        refresh_token: keys.sign_refresh(&user.id, role)?,
        user: PublicUser::from(user),
    })
}

pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email)?;
    let pseudo = req.pseudo.trim().to_string();
    check_length("pseudo", &pseudo, PSEUDO_MIN, PSEUDO_MAX)?;
    check_length("password", &req.password, PASSWORD_MIN, PASSWORD_MAX)?;

    if st.repos.users.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }

    let user = User {
        id: new_id(),
        email,
        pseudo,
        password_hash: hash_password(&req.password)?,
        is_superuser: false,
        created_at: OffsetDateTime::now_utc(),
    };
    st.repos.users.create_user(&user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_tokens(&JwtKeys::from_config(&st.config.jwt), &user)
}

pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email)?;

    let Some(user) = st.repos.users.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(&JwtKeys::from_config(&st.config.jwt), &user)
}

/// Trades a refresh token for a new pair. The role is re-read from the store
/// so a promotion or demotion takes effect on the next refresh.
pub async fn refresh(st: &AppState, req: RefreshRequest) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_config(&st.config.jwt);
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::InvalidToken("invalid refresh token")
    })?;

    let user = st
        .repos
        .users
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or(AppError::InvalidToken("user no longer exists"))?;

    issue_tokens(&keys, &user)
}

pub async fn me(st: &AppState, user_id: &str) -> AppResult<PublicUser> {
    let user = st
        .repos
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(PublicUser::from(&user))
}
