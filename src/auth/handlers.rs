use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
    },
    config::Config,
    error::{AppError, AppResult},
    model::user::User,
    models::{Claims, LoginReqDto, LoginResponse, TokenType},
    service::identity::{login_admin, login_employee},
    store::IdentityStore,
    utils::card_cache::CardCache,
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verifies a refresh token presented as `Authorization: Bearer <token>`.
fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer_token(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Issues an access/refresh pair and persists the refresh token id.
async fn issue_tokens(
    store: &dyn IdentityStore,
    config: &Config,
    user: &User,
) -> AppResult<LoginResponse> {
    let role = user.role();

    debug!("Generating access token");
    let access_token = generate_access_token(
        user.id,
        user.username.clone(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    debug!("Generating refresh token");
    let (refresh_token, claims) = generate_refresh_token(
        user.id,
        user.username.clone(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    let expires_at = DateTime::from_timestamp(claims.exp as i64, 0)
        .ok_or_else(|| AppError::Internal(format!("token expiry out of range: {}", claims.exp)))?
        .naive_utc();

    debug!(user_id = user.id, jti = %claims.jti, "Storing refresh token");
    store
        .store_refresh_token(user.id, &claims.jti, expires_at)
        .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        role: role.as_str().to_string(),
    })
}

/// Log in as the administrator or with an ID card
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Unknown ID card or user")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip_all)]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    store: web::Data<dyn IdentityStore>,
    cache: web::Data<CardCache>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");
    let now = Local::now();

    let user = match payload.into_inner() {
        LoginReqDto::Admin { admin_id, password } => {
            login_admin(store.get_ref(), &config, &admin_id, &password, now).await?
        }
        LoginReqDto::Employee { id_card, password } => {
            login_employee(store.get_ref(), &cache, &id_card, &password).await?
        }
    };

    if let Err(e) = store.record_login(user.id, now.naive_utc()).await {
        // a missed timestamp must not block the login
        error!(error = %e, "Failed to update last_login_at");
    }

    let tokens = issue_tokens(store.get_ref(), &config, &user).await?;
    info!(user_id = user.id, role = %tokens.role, "Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Refresh token missing, expired or already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn IdentityStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let claims = refresh_claims(&req, &config).ok_or(AppError::Unauthorized)?;

    // the old token is revoked before the new pair exists, so a replay fails here
    let user_id = store
        .consume_refresh_token(&claims.jti)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = match store.user_by_id(user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::Unauthorized),
    };

    let tokens = issue_tokens(store.get_ref(), &config, &user).await?;
    debug!(user_id, "Refresh token rotated");

    Ok(HttpResponse::Ok().json(tokens))
}

/// Revoke a refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn IdentityStore>,
    config: web::Data<Config>,
) -> HttpResponse {
    if let Some(claims) = refresh_claims(&req, &config) {
        if let Err(e) = store.revoke_refresh_token(&claims.jti).await {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }
    HttpResponse::NoContent().finish()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[schema(example = "John Doe")]
    pub display_name: String,
    #[schema(example = "staff")]
    pub role: String,
    pub id_card_number: Option<String>,
}

/// Identity behind the current access token
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    auth: AuthUser,
    store: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, AppError> {
    let user = store
        .user_by_id(auth.user_id)
        .await?
        .ok_or(AppError::IdentityNotFound)?;
    let profile = store.profile_for_user(user.id).await?;

    Ok(HttpResponse::Ok().json(MeResponse {
        id: user.id,
        display_name: user.display_name(),
        role: user.role().as_str().to_string(),
        id_card_number: profile.map(|p| p.id_card_number),
        username: user.username,
        email: user.email,
    }))
}
