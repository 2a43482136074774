//! Credentials and bearer-token sessions.
//!
//! Password hashing is an opaque `hash(password, salt) -> digest` scheme:
//! SHA-256 over salt‖password with a random 16-byte salt, stored as
//! `"<salt>.<digest>"` (both base64). Sessions are uuid tokens mapped to user
//! ids in a concurrent map; clients send them back as `Authorization: Bearer`.

use crate::error::ApiError;
use crate::model::User;
use crate::state::AppState;
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}.{}", BASE64.encode(salt), digest(&salt, password))
}

/// Checks a password against a stored `"<salt>.<digest>"` value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, expected)) = stored.split_once('.') else {
        return false;
    };
    let Ok(salt) = BASE64.decode(salt_b64) else {
        return false;
    };
    digest(&salt, password) == expected
}

/// Active login sessions: bearer token to user id.
#[derive(Debug, Default)]
pub struct Sessions {
    tokens: DashMap<String, i64>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    pub fn user_id(&self, token: &str) -> Option<i64> {
        self.tokens.get(token).map(|entry| *entry.value())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }
}

/// Extracts the bearer token from the Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolves the requesting user or rejects with 401.
///
/// A valid token whose user has since been deleted also yields 401; the
/// stale session is dropped on the way out.
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    let user_id = state.sessions.user_id(token).ok_or(ApiError::Unauthorized)?;

    let store = state.store.read().expect("store lock poisoned");
    match store.get_user(user_id) {
        Some(user) => Ok(user),
        None => {
            drop(store);
            state.sessions.revoke(token);
            Err(ApiError::Unauthorized)
        }
    }
}
