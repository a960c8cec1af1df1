//! Authentication — Argon2id password hashing and JWT issuance.
//!
//! Tokens carry the account role so route gates don't hit the database.
//! Browsers get the same tokens as HttpOnly cookies.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use salon_common::auth::{ACCESS_TOKEN, Claims, REFRESH_TOKEN};
use salon_common::config::AuthConfig;
use salon_common::models::account::Role;
use serde::Serialize;
use uuid::Uuid;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Token pair returned on login/register.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_token(
    account_id: Uuid,
    email: &str,
    role: Role,
    token_type: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id.to_string(),
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Generate both access and refresh tokens.
pub fn generate_token_pair(
    account_id: Uuid,
    email: &str,
    role: Role,
    cfg: &AuthConfig,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    Ok(TokenPair {
        access_token: generate_token(
            account_id,
            email,
            role,
            ACCESS_TOKEN,
            &cfg.jwt_secret,
            cfg.access_token_ttl_secs,
        )?,
        refresh_token: generate_token(
            account_id,
            email,
            role,
            REFRESH_TOKEN,
            &cfg.jwt_secret,
            cfg.refresh_token_ttl_secs,
        )?,
        expires_in: cfg.access_token_ttl_secs,
        token_type: "Bearer".to_string(),
    })
}

fn token_cookie(name: &'static str, value: String, ttl_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time_secs(ttl_secs))
        .build()
}

fn time_secs(secs: u64) -> time::Duration {
    time::Duration::seconds(secs as i64)
}

/// Cookies mirroring a freshly issued token pair.
pub fn session_cookies(tokens: &TokenPair, cfg: &AuthConfig) -> [Cookie<'static>; 2] {
    [
        token_cookie(
            ACCESS_COOKIE,
            tokens.access_token.clone(),
            cfg.access_token_ttl_secs,
            cfg.cookie_secure,
        ),
        token_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token.clone(),
            cfg.refresh_token_ttl_secs,
            cfg.cookie_secure,
        ),
    ]
}

/// Expired cookies that make the browser forget the session.
pub fn cleared_cookies() -> [Cookie<'static>; 2] {
    [ACCESS_COOKIE, REFRESH_COOKIE].map(|name| {
        Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .max_age(time_secs(0))
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_common::auth::validate_token;

    fn cfg() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-with-enough-entropy".into(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 120,
            cookie_secure: false,
        }
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn token_pair_carries_role_and_type() {
        let id = Uuid::now_v7();
        let pair = generate_token_pair(id, "ana@glow.ph", Role::Staff, &cfg()).unwrap();

        let access = validate_token(&pair.access_token, &cfg().jwt_secret).unwrap();
        assert_eq!(access.sub, id.to_string());
        assert_eq!(access.role, Role::Staff);
        assert_eq!(access.token_type, ACCESS_TOKEN);

        let refresh = validate_token(&pair.refresh_token, &cfg().jwt_secret).unwrap();
        assert_eq!(refresh.token_type, REFRESH_TOKEN);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let pair = generate_token_pair(Uuid::now_v7(), "a@b.ph", Role::Customer, &cfg()).unwrap();
        assert!(validate_token(&pair.access_token, "other-secret").is_err());
    }

    #[test]
    fn session_cookies_are_http_only() {
        let pair = generate_token_pair(Uuid::now_v7(), "a@b.ph", Role::Customer, &cfg()).unwrap();
        let [access, refresh] = session_cookies(&pair, &cfg());
        assert_eq!(access.name(), ACCESS_COOKIE);
        assert_eq!(refresh.name(), REFRESH_COOKIE);
        assert_eq!(access.http_only(), Some(true));
    }
}
