use axum::http::StatusCode;
use thiserror::Error;

/// Failures of local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Failures of login and sign-up.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("profile not found for this user")]
    ProfileNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is pending administrator approval")]
    PendingApproval,

    #[error("account has been deactivated by the administrator")]
    Deactivated,

    #[error("email already registered")]
    EmailTaken,

    #[error("invalid email")]
    InvalidEmail,

    #[error("password too short")]
    WeakPassword,

    #[error("remote auth service: {0}")]
    Remote(#[source] anyhow::Error),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::UserNotFound | AuthError::ProfileNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::PendingApproval | AuthError::Deactivated => StatusCode::FORBIDDEN,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::Remote(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        (e.status(), e.to_string())
    }
}

impl From<AuthError> for (StatusCode, String) {
    fn from(e: AuthError) -> Self {
        (e.status(), e.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Remote(anyhow::anyhow!(other)),
        }
    }
}
