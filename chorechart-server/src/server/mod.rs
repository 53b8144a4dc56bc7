mod acl;
pub mod auth;
mod config;
mod rewards;
mod tasks;

use crate::server::auth::AuthCtx;
use crate::storage::{PointsChange, StorageError, models::User};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::{Method, StatusCode, header},
    routing::{get, post, put},
};
use bcrypt::verify;
use chorechart_shared::api;
use chorechart_shared::auth::Role;
use chorechart_shared::domain::ChoreError;
pub use config::{AppConfig, ConfigError, UserConfig};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

/// bcrypt work factor for passcodes set through the API.
const PASSCODE_HASH_COST: u32 = bcrypt::DEFAULT_COST;
const MIN_USERNAME_LEN: usize = 2;
const MIN_PASSCODE_LEN: usize = 4;
const DEFAULT_LOG_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: crate::storage::Store,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: crate::storage::Store) -> Self {
        Self {
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelled when the process starts shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/v1/auth/logout", post(api_auth_logout))
        .route("/api/v1/auth/register", post(api_auth_register))
        .route("/api/v1/auth/passcode", post(api_change_passcode))
        .route("/api/v1/auth/credentials", post(api_change_credentials))
        .route("/api/v1/users", get(api_list_users))
        .route("/api/v1/users/{id}", get(api_get_user))
        .route("/api/v1/users/{id}/points", put(api_set_points))
        .route("/api/v1/tasks", get(tasks::list).post(tasks::create))
        .route("/api/v1/tasks/{id}", put(tasks::update).delete(tasks::delete))
        .route("/api/v1/tasks/{id}/mark_complete", post(tasks::mark_complete))
        .route("/api/v1/tasks/{id}/approve_complete", post(tasks::approve))
        .route("/api/v1/tasks/{id}/reject_complete", post(tasks::reject))
        .route("/api/v1/rewards", get(rewards::list).post(rewards::create))
        .route(
            "/api/v1/rewards/{id}",
            put(rewards::update).delete(rewards::delete),
        )
        .route(
            "/api/v1/rewards/{id}/request_redemption",
            post(rewards::request_redemption),
        )
        .route(
            "/api/v1/rewards/{id}/approve_redemption",
            post(rewards::approve_redemption),
        )
        .route(
            "/api/v1/rewards/{id}/reject_redemption",
            post(rewards::reject_redemption),
        )
        .route("/api/v1/logs", get(api_list_logs))
        .with_state(state.clone())
        .layer(middleware::from_fn(acl::enforce_acl))
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            uid = tracing::field::Empty,
            role = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/v1/version", get(api_version))
        .route("/api/v1/auth/login", post(api_auth_login))
        .merge(private)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured

    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn api_version() -> Json<api::VersionDto> {
    Json(api::VersionDto {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found() -> AppError {
    AppError::not_found("not found")
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    // Balances and logs must never come from a cache
    if path == "/healthz" || path.starts_with("/api/") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
    }

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        let span = Span::current();
        span.record("uid", auth.user_id());
        span.record("role", tracing::field::display(auth.role()));
    }
    Ok(next.run(req).await)
}

/// JSON body extractor whose rejection is a 400 `AppError` instead of
/// axum's plain-text 422.
pub(crate) struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Path ids arrive as strings so a malformed id is a 400 with a JSON body.
fn parse_id(raw: &str, what: &str) -> Result<i32, AppError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::bad_request(format!("Invalid {} ID", what))),
    }
}

fn user_dto(user: &User) -> Result<api::UserDto, AppError> {
    Ok(user.to_dto()?)
}

// Auth

async fn api_auth_login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<api::AuthReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    let username = body.username.trim();
    if username.is_empty() || body.passcode.is_empty() {
        return Err(AppError::bad_request("Username and passcode are required"));
    }
    let user = state
        .store
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| {
            tracing::warn!(username=%username, "login: unknown username");
            AppError::unauthorized()
        })?;
    if !verify(&body.passcode, &user.passcode_hash).map_err(|e| {
        tracing::error!(username=%username, error=%e, "login: bcrypt verify failed");
        AppError::internal(e)
    })? {
        tracing::warn!(username=%username, "login: invalid passcode");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_jwt_for_user(&state, &user).await?;
    Ok(Json(api::AuthResp {
        token,
        user: user_dto(&user)?,
    }))
}

async fn api_auth_logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(&auth.claims.jti).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_username(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::bad_request(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    Ok(name)
}

fn hash_passcode(passcode: &str) -> Result<String, AppError> {
    if passcode.chars().count() < MIN_PASSCODE_LEN {
        return Err(AppError::bad_request(format!(
            "Passcode must be at least {} characters",
            MIN_PASSCODE_LEN
        )));
    }
    bcrypt::hash(passcode, PASSCODE_HASH_COST).map_err(AppError::internal)
}

async fn api_auth_register(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::RegisterReq>,
) -> Result<(StatusCode, Json<api::CreatedIdResp>), AppError> {
    auth.require_parent()?;
    let username = validate_username(&body.username)?;
    let hash = hash_passcode(&body.passcode)?;
    let user = state.store.create_user(username, &hash, body.role).await?;
    tracing::info!(uid = user.id, username = %user.username, role = %body.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(api::CreatedIdResp {
            message: "User created successfully".into(),
            created_id: user.id,
        }),
    ))
}

/// Loads the caller and checks `current` against their stored hash.
async fn verify_current_passcode(
    state: &AppState,
    auth: &AuthCtx,
    current: &str,
) -> Result<User, AppError> {
    let user = state
        .store
        .get_user(auth.user_id())
        .await?
        .ok_or_else(AppError::unauthorized)?;
    if !verify(current, &user.passcode_hash).map_err(AppError::internal)? {
        return Err(AppError::bad_request("Current passcode is incorrect"));
    }
    Ok(user)
}

async fn api_change_passcode(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::ChangePasscodeReq>,
) -> Result<Json<api::MessageResp>, AppError> {
    let user = verify_current_passcode(&state, &auth, &body.current_passcode).await?;
    let hash = hash_passcode(&body.new_passcode)?;
    state.store.update_credentials(user.id, None, &hash).await?;
    Ok(Json(api::MessageResp {
        message: "Passcode changed successfully".into(),
    }))
}

async fn api_change_credentials(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::ChangeCredentialsReq>,
) -> Result<Json<api::MessageResp>, AppError> {
    let user = verify_current_passcode(&state, &auth, &body.current_passcode).await?;
    let username = validate_username(&body.username)?;
    let hash = hash_passcode(&body.new_passcode)?;
    state
        .store
        .update_credentials(user.id, Some(username), &hash)
        .await?;
    Ok(Json(api::MessageResp {
        message: "Credentials changed successfully".into(),
    }))
}

// Users

async fn api_list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::UsersResp>, AppError> {
    auth.require_parent()?;
    let users = state
        .store
        .list_children()
        .await?
        .iter()
        .map(user_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(api::UsersResp { users }))
}

async fn api_get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::UserResp>, AppError> {
    let id = parse_id(&id, "user")?;
    if auth.role() == Role::Child && auth.user_id() != id {
        return Err(AppError::forbidden());
    }
    match state.store.get_user(id).await? {
        Some(user) if user.is_child() => Ok(Json(api::UserResp {
            user: user_dto(&user)?,
        })),
        _ => Err(AppError::not_found("User not found")),
    }
}

async fn api_set_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<api::PointsReq>,
) -> Result<Json<api::PointsResp>, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "user")?;
    let change = match (body.points, body.delta) {
        (Some(p), None) if p >= 0 => PointsChange::Set(p),
        (None, Some(d)) => PointsChange::Adjust(d),
        _ => return Err(AppError::bad_request("Invalid points value")),
    };
    let user = state
        .store
        .change_points(auth.user_id(), id, change)
        .await?;
    Ok(Json(api::PointsResp {
        message: "Points updated successfully".into(),
        user: user_dto(&user)?,
    }))
}

// Logs

#[derive(Deserialize)]
struct LogOpts {
    limit: Option<i64>,
}

async fn api_list_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Query(opts): Query<LogOpts>,
) -> Result<Json<api::LogsResp>, AppError> {
    let limit = opts.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let recipient = match auth.role() {
        Role::Parent => None,
        Role::Child => Some(auth.user_id()),
    };
    let logs = state
        .store
        .list_logs(recipient, limit)
        .await?
        .iter()
        .map(|l| l.to_dto())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(api::LogsResp { logs }))
}

// Errors

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    Rule(ChoreError),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput(m) => AppError::BadRequest(m),
            StorageError::NotFound(m) => AppError::NotFound(m),
            StorageError::Conflict(m) => AppError::Conflict(m),
            StorageError::Rule(r) => AppError::Rule(r),
            other => AppError::internal(other),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = api::ErrorBody {
            message: String::new(),
            required_points: None,
            available_points: None,
        };
        let (status, kind, detail) = match self {
            AppError::BadRequest(m) => {
                body.message = m;
                (StatusCode::BAD_REQUEST, "bad_request", None)
            }
            AppError::Unauthorized => {
                body.message = "Unauthorized".into();
                (StatusCode::UNAUTHORIZED, "unauthorized", None)
            }
            AppError::Forbidden => {
                body.message = "Forbidden".into();
                (StatusCode::FORBIDDEN, "forbidden", None)
            }
            AppError::NotFound(m) => {
                body.message = m;
                (StatusCode::NOT_FOUND, "not_found", None)
            }
            AppError::Conflict(m) => {
                body.message = m;
                (StatusCode::CONFLICT, "conflict", None)
            }
            AppError::Rule(r) => {
                if let ChoreError::InsufficientPoints {
                    required,
                    available,
                } = &r
                {
                    body.required_points = Some(*required);
                    body.available_points = Some(*available);
                }
                body.message = r.to_string();
                (StatusCode::BAD_REQUEST, "rule", None)
            }
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => {
                body.message = "Internal server error".into();
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", Some(m))
            }
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %body.message, detail = %detail, "request failed");
        } else if status.is_client_error() {
            tracing::warn!(status = %status, kind = kind, message = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
