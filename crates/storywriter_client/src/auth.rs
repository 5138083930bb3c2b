//! crates/storywriter_client/src/auth.rs
//!
//! Device-local accounts. Users and the active session live in the local
//! store; passwords are kept as Argon2 hashes.

use crate::{
    error::AuthError,
    local_store::{keys, load_json, save_json, LocalStore},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use std::sync::Arc;
use storywriter_core::domain::{AuthSession, AuthUser};
use tracing::{error, info};
use uuid::Uuid;

pub const MIN_PASSWORD_CHARS: usize = 6;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct LocalAuth {
    store: Arc<dyn LocalStore>,
}

impl LocalAuth {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    fn users(&self) -> Vec<AuthUser> {
        load_json(self.store.as_ref(), keys::AUTH_USERS, Vec::new())
    }

    fn start_session(&self, user: &AuthUser) -> Result<AuthSession, AuthError> {
        let session = user.to_session();
        save_json(self.store.as_ref(), keys::AUTH_SESSION, &session)?;
        Ok(session)
    }

    /// Registers a new account and logs it in.
    pub fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let name = name.trim();
        let email = normalize_email(email);
        let password = password.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingSignupFields);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::PasswordTooShort);
        }

        let mut users = self.users();
        if users.iter().any(|user| user.email == email) {
            return Err(AuthError::EmailTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                AuthError::Hashing(e.to_string())
            })?
            .to_string();

        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(0, user.clone());
        save_json(self.store.as_ref(), keys::AUTH_USERS, &users)?;

        info!("Registered local account {}", user.id);
        self.start_session(&user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingLoginFields);
        }

        let users = self.users();
        let user = users
            .iter()
            .find(|user| user.email == email)
            .ok_or(AuthError::UnknownEmail)?;

        // An unparseable stored hash can never match.
        let verified = PasswordHash::new(&user.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);
        if !verified {
            return Err(AuthError::WrongPassword);
        }

        self.start_session(user)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.remove(keys::AUTH_SESSION)?;
        Ok(())
    }

    /// The persisted session, if any.
    pub fn current_session(&self) -> Option<AuthSession> {
        load_json(self.store.as_ref(), keys::AUTH_SESSION, None)
    }
}
