//! Authentication routes — register, login, refresh, logout, staff accounts.

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware,
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use salon_common::{
    auth::{REFRESH_TOKEN, validate_token},
    error::{SalonError, SalonResult},
    ids,
    models::{
        account::{
            AccountResponse, ChangePasswordRequest, CreateStaffRequest, LoginRequest,
            RegisterRequest, Role,
        },
        user::User,
    },
    validation::{validate_name, validate_request},
};
use salon_db::repository::{accounts, users};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    AppState,
    auth::{self, REFRESH_COOKIE, TokenPair},
    middleware::AuthContext,
};

/// Auth router.
pub fn router() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout));

    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/password", patch(change_password))
        .route("/auth/staff", post(create_staff))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware));

    public.merge(protected)
}

#[derive(Serialize)]
struct AuthResponse {
    account: AccountResponse,
    /// Customer profile; None for staff and admins
    user: Option<User>,
    #[serde(flatten)]
    tokens: TokenPair,
}

fn issue_tokens(account_id: uuid::Uuid, email: &str, role: Role) -> SalonResult<TokenPair> {
    let config = salon_common::config::get();
    auth::generate_token_pair(account_id, email, role, &config.auth)
        .map_err(|e| SalonError::Internal(e.into()))
}

fn with_session(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    let config = salon_common::config::get();
    auth::session_cookies(tokens, &config.auth)
        .into_iter()
        .fold(jar, |jar, cookie| jar.add(cookie))
}

/// POST /api/v1/auth/register
///
/// Customer self-registration. Creates the login and the profile together.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> SalonResult<(CookieJar, Json<AuthResponse>)> {
    validate_request(&body)?;
    validate_name(&body.first_name)?;
    validate_name(&body.last_name)?;

    let email = body.email.trim().to_lowercase();
    if accounts::find_by_email(&state.db.pg, &email).await?.is_some() {
        return Err(SalonError::AlreadyExists {
            resource: "Email".into(),
        });
    }

    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| SalonError::Internal(anyhow::anyhow!("{e}")))?;

    let mut tx = state.db.pg.begin().await?;
    let account = accounts::create_account(
        &mut *tx,
        ids::generate_id(),
        &email,
        &password_hash,
        Role::Customer,
    )
    .await?;
    let user = users::create_user(
        &mut *tx,
        ids::generate_id(),
        account.id,
        body.first_name.trim(),
        body.last_name.trim(),
        body.phone.as_deref(),
    )
    .await?;
    tx.commit().await?;

    let tokens = issue_tokens(account.id, &account.email, account.role)?;

    tracing::info!(account_id = %account.id, user_id = %user.id, "Customer registered");

    Ok((
        with_session(jar, &tokens),
        Json(AuthResponse {
            account: account.into(),
            user: Some(user),
            tokens,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> SalonResult<(CookieJar, Json<AuthResponse>)> {
    validate_request(&body)?;

    let account = accounts::find_by_email(&state.db.pg, body.email.trim())
        .await?
        .ok_or(SalonError::InvalidCredentials)?;

    let valid = auth::verify_password(&body.password, &account.password_hash)
        .map_err(|_| SalonError::InvalidCredentials)?;
    if !valid {
        return Err(SalonError::InvalidCredentials);
    }

    let user = match account.role {
        Role::Customer => users::find_by_auth_id(&state.db.pg, account.id).await?,
        Role::Staff | Role::Admin => None,
    };

    let tokens = issue_tokens(account.id, &account.email, account.role)?;

    tracing::info!(account_id = %account.id, role = account.role.as_str(), "Logged in");

    Ok((
        with_session(jar, &tokens),
        Json(AuthResponse {
            account: account.into(),
            user,
            tokens,
        }),
    ))
}

#[derive(Deserialize)]
struct RefreshRequest {
    /// Falls back to the refresh cookie when omitted
    refresh_token: Option<String>,
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new token pair.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> SalonResult<(CookieJar, Json<TokenPair>)> {
    let config = salon_common::config::get();

    let token = body
        .refresh_token
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or(SalonError::Unauthorized)?;

    let claims =
        validate_token(&token, &config.auth.jwt_secret).map_err(|_| SalonError::InvalidToken)?;
    if claims.token_type != REFRESH_TOKEN {
        return Err(SalonError::InvalidToken);
    }

    let account_id: uuid::Uuid = claims.sub.parse().map_err(|_| SalonError::InvalidToken)?;

    // Re-read the account so deleted logins and role changes take effect.
    let account = accounts::find_by_id(&state.db.pg, account_id)
        .await?
        .ok_or(SalonError::InvalidToken)?;

    let tokens = issue_tokens(account.id, &account.email, account.role)?;
    Ok((with_session(jar, &tokens), Json(tokens)))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; logging out only clears the browser cookies.
async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = auth::cleared_cookies()
        .into_iter()
        .fold(jar, |jar, cookie| jar.add(cookie));
    (jar, Json(serde_json::json!({ "status": true })))
}

#[derive(Serialize)]
struct MeResponse {
    account: AccountResponse,
    user: Option<User>,
}

/// GET /api/v1/auth/me
async fn me(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> SalonResult<Json<MeResponse>> {
    let account = accounts::find_by_id(&state.db.pg, auth.account_id)
        .await?
        .ok_or(SalonError::Unauthorized)?;
    let user = users::find_by_auth_id(&state.db.pg, account.id).await?;

    Ok(Json(MeResponse {
        account: account.into(),
        user,
    }))
}

/// POST /api/v1/auth/password
async fn change_password(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChangePasswordRequest>,
) -> SalonResult<Json<serde_json::Value>> {
    validate_request(&body)?;

    let account = accounts::find_by_id(&state.db.pg, auth.account_id)
        .await?
        .ok_or(SalonError::Unauthorized)?;

    let valid = auth::verify_password(&body.current_password, &account.password_hash)
        .map_err(|_| SalonError::InvalidCredentials)?;
    if !valid {
        return Err(SalonError::InvalidCredentials);
    }

    let password_hash = auth::hash_password(&body.new_password)
        .map_err(|e| SalonError::Internal(anyhow::anyhow!("{e}")))?;
    accounts::update_password(&state.db.pg, account.id, &password_hash).await?;

    tracing::info!(account_id = %account.id, "Password changed");
    Ok(Json(serde_json::json!({ "status": true })))
}

/// POST /api/v1/auth/staff (admin)
///
/// Create a front-desk or admin login.
async fn create_staff(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateStaffRequest>,
) -> SalonResult<Json<AccountResponse>> {
    auth.require_admin()?;
    validate_request(&body)?;

    if body.role == Role::Customer {
        return Err(SalonError::validation(
            "Customers register themselves; choose staff or admin",
        ));
    }

    let email = body.email.trim().to_lowercase();
    if accounts::find_by_email(&state.db.pg, &email).await?.is_some() {
        return Err(SalonError::AlreadyExists {
            resource: "Email".into(),
        });
    }

    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| SalonError::Internal(anyhow::anyhow!("{e}")))?;

    let account = accounts::create_account(
        &state.db.pg,
        ids::generate_id(),
        &email,
        &password_hash,
        body.role,
    )
    .await?;

    tracing::info!(
        account_id = %account.id,
        role = account.role.as_str(),
        created_by = %auth.account_id,
        "Staff account created"
    );

    Ok(Json(account.into()))
}
