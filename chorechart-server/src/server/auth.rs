use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use chorechart_shared::auth::Role;
use chorechart_shared::jwt::{self, JwtClaims};
use chrono::{Duration, Utc};
use tracing::{error, warn};

use super::{AppError, AppState};
use crate::storage::models::User;

/// How many days of inactivity before a session is considered expired.
const SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login.
const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub claims: JwtClaims,
}

impl AuthCtx {
    pub fn user_id(&self) -> i32 {
        self.claims.uid
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn require_parent(&self) -> Result<(), AppError> {
        match self.claims.role {
            Role::Parent => Ok(()),
            Role::Child => Err(AppError::forbidden()),
        }
    }

    /// Parents may act on any child's chores; a child only on their own.
    pub fn ensure_may_act_for(&self, child_id: i32) -> Result<(), AppError> {
        match self.claims.role {
            Role::Parent => Ok(()),
            Role::Child if self.claims.uid == child_id => Ok(()),
            Role::Child => {
                warn!(
                    uid = self.claims.uid,
                    child_id, "auth: child acting on another child's item"
                );
                Err(AppError::forbidden())
            }
        }
    }
}

pub async fn require_bearer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return unauthorized();
    };

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };

    validate_claims(&state, &claims).await.map_err(|e| {
        warn!(error=?e, username=%claims.sub, "auth: validate_claims failed");
        // Invalid token, log out the user
        AppError::unauthorized()
    })?;

    let jti = claims.jti.clone();
    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match state
        .store
        .touch_session_with_cutoff(&jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %jti,
                username = %claims.sub,
                cutoff = %cutoff,
                "auth: session missing or expired (last_used_at < cutoff)"
            );
            return unauthorized();
        }
        Err(e) => {
            error!(jti = %jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }
    req.extensions_mut().insert(AuthCtx { claims });
    Ok(next.run(req).await)
}

pub async fn issue_jwt_for_user(state: &AppState, user: &User) -> Result<String, AppError> {
    let role = user.role().map_err(AppError::internal)?;
    let jti = uuid::Uuid::new_v4().to_string();
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = JwtClaims {
        sub: user.username.clone(),
        uid: user.id,
        jti: jti.clone(),
        exp,
        role,
    };

    state
        .store
        .create_session(&jti, user.id)
        .await
        .map_err(|e| {
            error!(username = %user.username, error=%e, "login: create_session failed");
            AppError::internal(e)
        })?;
    let token = jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(username = %user.username, error=%e, "login: jwt encode failed");
        AppError::internal(e)
    })?;
    Ok(token)
}

/// The token's user must still exist with the role it was issued for.
async fn validate_claims(state: &AppState, claims: &JwtClaims) -> Result<(), AppError> {
    let user = state
        .store
        .get_user(claims.uid)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            warn!(uid = claims.uid, username = %claims.sub, "auth: unknown user");
            AppError::forbidden()
        })?;
    let actual = user.role().map_err(AppError::internal)?;
    if actual != claims.role {
        warn!(
            uid = claims.uid,
            requested_role = ?claims.role,
            actual_role = ?actual,
            "auth: role mismatch"
        );
        return Err(AppError::forbidden());
    }
    Ok(())
}
