pub mod demo;

use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, RegisterPayload, User};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = AppResult<User>> + Send + 'a>>;

/// Checks credentials against whatever backs identity. Callers only see a
/// resolved `User` or an `AppError::Auth`.
pub trait CredentialVerifier: Send + Sync {
    fn verify<'a>(&'a self, email: &'a str, password: &'a str) -> VerifyFuture<'a>;

    fn register<'a>(&'a self, name: &'a str, email: &'a str, password: &'a str) -> VerifyFuture<'a>;

    /// Picks up runtime settings changes. Verifiers with nothing to tune
    /// ignore them.
    fn apply_settings(&self, _settings: &AppSettings) {}
}

#[derive(Clone)]
pub struct AuthService {
    verifier: Arc<dyn CredentialVerifier>,
    user: Arc<RwLock<Option<User>>>,
}

impl AuthService {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            user: Arc::new(RwLock::new(None)),
        }
    }

    pub fn apply_settings(&self, settings: &AppSettings) {
        self.verifier.apply_settings(settings);
    }

    pub async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please enter both email and password".to_string()));
        }

        let user = self.verifier.verify(email, password).await?;
        tracing::info!(user_id = %user.id, tier = user.subscription.as_str(), "signed in");
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    pub async fn register(&self, payload: &RegisterPayload) -> AppResult<User> {
        let name = payload.name.trim();
        let email = payload.email.trim();
        if name.is_empty() || email.is_empty() || payload.password.is_empty() || payload.confirm_password.is_empty() {
            return Err(AppError::Validation("Please fill in all fields".to_string()));
        }
        if payload.password != payload.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err(AppError::Validation(format!("'{}' is not a valid email address", email)));
        }

        let user = self.verifier.register(name, email, &payload.password).await?;
        tracing::info!(user_id = %user.id, "account registered");
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    pub async fn logout(&self) -> Option<User> {
        let previous = self.user.write().await.take();
        if let Some(user) = &previous {
            tracing::info!(user_id = %user.id, "signed out");
        }
        previous
    }
}
