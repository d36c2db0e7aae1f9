//! Authentication — bearer tokens and account routes.
//!
//! The protocol handler only ever sees the `Authenticator` seam; the
//! concrete implementation issues and verifies HS256 JWTs.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::SessionStore;

/// Maps a bearer token to a user id, or rejects it.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<Uuid>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// HS256 JWT issuer/verifier.
pub struct JwtAuthenticator {
    secret: SecretString,
    ttl_minutes: i64,
}

impl JwtAuthenticator {
    pub fn new(secret: SecretString, ttl_minutes: i64) -> Self {
        Self {
            secret,
            ttl_minutes,
        }
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + chrono::Duration::minutes(self.ttl_minutes)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Option<Uuid> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .ok()?;
        Uuid::parse_str(&data.claims.sub).ok()
    }
}

// ── Password hashing ────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ── Routes ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct AuthRouteState {
    store: Arc<dyn SessionStore>,
    authenticator: Arc<JwtAuthenticator>,
}

/// Build the register/login router.
pub fn auth_routes(store: Arc<dyn SessionStore>, authenticator: Arc<JwtAuthenticator>) -> Router {
    let state = AuthRouteState {
        store,
        authenticator,
    };
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    login: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AuthRouteState>,
    Json(body): Json<RegisterRequest>,
) -> impl IntoResponse {
    if body.login.trim().is_empty() || body.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "login and password are required"})),
        );
    }

    match state.store.get_user_by_login(&body.login).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": "login already taken"})),
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            );
        }
    }

    let hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Password hashing failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            );
        }
    };

    match state.store.create_user(&body.login, &body.email, &hash).await {
        Ok(user) => {
            info!(user_id = %user.id, login = %user.login, "User registered");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({"id": user.id, "login": user.login})),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "User creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            )
        }
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    login: String,
    password: String,
}

async fn login(
    State(state): State<AuthRouteState>,
    Json(body): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match state.store.get_user_by_login(&body.login).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(login = %body.login, "Login failed: unknown user");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "invalid credentials"})),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            );
        }
    };

    if !verify_password(&body.password, &user.password_hash) {
        debug!(login = %body.login, "Login failed: wrong password");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid credentials"})),
        );
    }

    match state.authenticator.issue(user.id) {
        Ok(token) => (
            StatusCode::OK,
            Json(serde_json::json!({"access_token": token, "token_type": "bearer"})),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Token issuance failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal error"})),
            )
        }
    }
}
