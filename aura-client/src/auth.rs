use crate::backend::{AuthBackend, BackendError};
use aura_common::model::auth::{AccessToken, FieldErrors, LoginCredentials, SignupRequest};
use aura_store::{cache::SessionCache, kv::KeyValueStore, kv::StoreError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Login form is incomplete")]
    Invalid(FieldErrors),
    #[error("Email or password was rejected")]
    InvalidCredentials,
    #[error("Backend failed while logging in")]
    Server,
    #[error("Backend replied to login with unexpected status {0}")]
    Unexpected(StatusCode),
    #[error("Backend login response was not understood: {0}")]
    InvalidResponse(serde_json::Error),
    #[error("Backend could not be reached: {0}")]
    Unreachable(reqwest::Error),
    #[error("Access token could not be stored: {0}")]
    Store(#[from] StoreError),
}

impl LoginError {
    /// Text shown next to the email field.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            LoginError::Invalid(_) => "Please fix the highlighted fields.",
            LoginError::InvalidCredentials => "Invalid email or password",
            LoginError::Server => "Server error. Please try again later.",
            LoginError::InvalidResponse(_) => "Invalid response from server",
            LoginError::Unreachable(_) => {
                "Cannot connect to the server. Please check your internet connection."
            }
            LoginError::Unexpected(_) | LoginError::Store(_) => {
                "An unexpected error occurred. Please try again."
            }
        }
    }
}

impl From<BackendError> for LoginError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, .. } => match status {
                StatusCode::UNAUTHORIZED => LoginError::InvalidCredentials,
                StatusCode::INTERNAL_SERVER_ERROR => LoginError::Server,
                other => LoginError::Unexpected(other),
            },
            BackendError::Decode(err) => LoginError::InvalidResponse(err),
            BackendError::Transport(err) => LoginError::Unreachable(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("Registration form is incomplete")]
    Invalid(FieldErrors),
    #[error("Backend rejected registration fields")]
    Validation(FieldErrors),
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Registration failed: {0}")]
    Unexpected(BackendError),
    #[error("Access token could not be stored: {0}")]
    Store(#[from] StoreError),
}

impl SignupError {
    /// Field-level messages for the registration form.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            SignupError::Invalid(errors) | SignupError::Validation(errors) => errors.clone(),
            SignupError::DuplicateEmail => {
                let mut errors = FieldErrors::default();
                errors.insert("email", "Email already exists");
                errors
            }
            SignupError::Unexpected(_) | SignupError::Store(_) => {
                let mut errors = FieldErrors::default();
                errors.insert("email", "An error occurred during registration");
                errors
            }
        }
    }
}

impl From<BackendError> for SignupError {
    fn from(err: BackendError) -> Self {
        #[derive(Deserialize)]
        struct ValidationBody {
            errors: FieldErrors,
        }

        match err {
            BackendError::Status {
                status: StatusCode::CONFLICT,
                ..
            } => SignupError::DuplicateEmail,
            BackendError::Status {
                status: StatusCode::BAD_REQUEST,
                ref body,
            } => match serde_json::from_str::<ValidationBody>(body) {
                Ok(validation) => SignupError::Validation(validation.errors),
                Err(_) => SignupError::Unexpected(err),
            },
            other => SignupError::Unexpected(other),
        }
    }
}

/// Sign-in, registration and sign-out against the backend, with the token
/// kept in the session cache.
pub struct Auth<B, S> {
    backend: B,
    cache: Arc<SessionCache<S>>,
}

impl<B, S> Auth<B, S>
where
    B: AuthBackend,
    S: KeyValueStore,
{
    pub fn new(backend: B, cache: Arc<SessionCache<S>>) -> Self {
        Self { backend, cache }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.cache.access_token(), Ok(Some(_)))
    }

    pub async fn login(&self, credentials: LoginCredentials) -> Result<AccessToken, LoginError> {
        credentials.validate().map_err(LoginError::Invalid)?;

        let response = self.backend.login(&credentials).await.map_err(|err| {
            error!(%err, "Login error");
            LoginError::from(err)
        })?;

        self.cache.set_access_token(&response.access_token)?;
        info!(username = %credentials.username, "Logged in");

        Ok(response.access_token)
    }

    /// Registers a new account. If the backend hands out a token right away
    /// it becomes the session token.
    pub async fn signup(&self, request: SignupRequest) -> Result<(), SignupError> {
        request.validate().map_err(SignupError::Invalid)?;

        let response = self.backend.signup(&request).await.map_err(|err| {
            error!(%err, "Registration error");
            SignupError::from(err)
        })?;

        if let Some(token) = response.access_token {
            self.cache.set_access_token(&token)?;
        }
        info!(email = %request.email, "Registered");

        Ok(())
    }

    /// Forgets the token and everything cached for the viewer.
    pub fn logout(&self) {
        match self.cache.clear_session() {
            Ok(()) => info!("Logged out"),
            Err(err) => warn!(%err, "Session could not be fully cleared"),
        }
    }
}
