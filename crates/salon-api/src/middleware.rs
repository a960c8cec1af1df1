//! Middleware — token extraction, role gates, security headers.

use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use salon_common::{
    auth::{ACCESS_TOKEN, validate_token},
    error::SalonError,
    models::account::Role,
};
use uuid::Uuid;

use crate::auth::ACCESS_COOKIE;

/// Authentication context extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    /// Front-desk gate; admins pass too.
    pub fn require_staff(&self) -> Result<(), SalonError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(SalonError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), SalonError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(SalonError::Forbidden)
        }
    }
}

/// Pull the access token from `Authorization: Bearer` or the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Decode an access token into an [`AuthContext`].
pub fn authenticate(token: &str, secret: &str) -> Result<AuthContext, SalonError> {
    let claims = validate_token(token, secret).map_err(|_| SalonError::InvalidToken)?;

    // Ensure it's an access token, not a refresh token
    if claims.token_type != ACCESS_TOKEN {
        return Err(SalonError::InvalidToken);
    }

    let account_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| SalonError::InvalidToken)?;

    Ok(AuthContext {
        account_id,
        email: claims.email,
        role: claims.role,
    })
}

/// Require a valid access token and stash the [`AuthContext`] for handlers.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, SalonError> {
    let token = extract_token(request.headers()).ok_or(SalonError::Unauthorized)?;

    let config = salon_common::config::get();
    let auth_ctx = authenticate(&token, &config.auth.jwt_secret)?;

    request.extensions_mut().insert(auth_ctx);

    Ok(next.run(request).await)
}

// ── Security headers ──────────────────────────────────────────────────────────

const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
    ("strict-transport-security", "max-age=63072000; includeSubDomains"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
];

/// Add security headers to every HTTP response. The API only serves JSON, so
/// the CSP forbids everything.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            header::HeaderName::from_static(name),
            header::HeaderValue::from_static(value),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use salon_common::config::AuthConfig;

    fn auth_cfg() -> AuthConfig {
        AuthConfig {
            jwt_secret: "middleware-test-secret".into(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 120,
            cookie_secure: false,
        }
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; access_token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn refresh_tokens_cannot_authenticate() {
        let cfg = auth_cfg();
        let pair = crate::auth::generate_token_pair(Uuid::now_v7(), "a@b.ph", Role::Admin, &cfg)
            .unwrap();
        let ctx = authenticate(&pair.access_token, &cfg.jwt_secret).unwrap();
        assert_eq!(ctx.role, Role::Admin);
        assert!(matches!(
            authenticate(&pair.refresh_token, &cfg.jwt_secret),
            Err(SalonError::InvalidToken)
        ));
    }

    #[test]
    fn role_gates() {
        let ctx = |role| AuthContext { account_id: Uuid::nil(), email: String::new(), role };
        assert!(ctx(Role::Admin).require_staff().is_ok());
        assert!(ctx(Role::Staff).require_staff().is_ok());
        assert!(ctx(Role::Staff).require_admin().is_err());
        assert!(ctx(Role::Customer).require_staff().is_err());
    }
}
