use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::{burn_verification_blocking, hash_password_blocking, verify_password_blocking},
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::{AppError, RepoError},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn register(users: &dyn UserRepo, req: RegisterRequest) -> Result<User, AppError> {
    let (Some(name), Some(email), Some(password)) = (
        required(req.name),
        required(req.email),
        required(req.password),
    ) else {
        return Err(AppError::validation("Name, email and password are required"));
    };
    let name = name.trim().to_string();
    let email = normalize_email(&email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    // Fast path; the unique index still decides concurrent registrations.
    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered"));
    }

    let password_hash = hash_password_blocking(password).await?;
    let user = match users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::Conflict { .. }) => {
            warn!("email registered concurrently");
            return Err(AppError::Conflict("Email already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks credentials. Unknown email and wrong password produce the same error.
pub async fn authenticate(users: &dyn UserRepo, req: LoginRequest) -> Result<User, AppError> {
    let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = users.find_by_email(&email).await? else {
        burn_verification_blocking(password).await?;
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn current_user(users: &dyn UserRepo, user_id: Uuid) -> Result<Option<User>, AppError> {
    Ok(users.find_by_id(user_id).await?)
}
