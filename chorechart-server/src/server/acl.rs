use super::{AppError, auth::AuthCtx};
use axum::response::Response;
use axum::{
    extract::OriginalUri,
    http::{Method, Request},
    middleware::Next,
};
use chorechart_shared::auth::Role;
use chorechart_shared::jwt::JwtClaims;
use percent_encoding::percent_decode_str;

pub async fn enforce_acl(req: Request<axum::body::Body>, next: Next) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|orig| orig.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();
    let Some(auth) = req.extensions().get::<AuthCtx>() else {
        return Err(AppError::unauthorized());
    };
    let claims = &auth.claims;

    let segs = segmented(&path);
    let api_prefix = ["api", "v1"];
    if !segs.as_slice().starts_with(&api_prefix) {
        tracing::warn!(?segs, "ACL: path outside api scope");
        return Err(AppError::forbidden());
    }
    let rest = &segs[api_prefix.len()..];

    let decision = match claims.role {
        Role::Parent => allow_parent(&method, rest),
        Role::Child => allow_child(&method, rest, claims),
    };

    if let Err(err) = decision {
        tracing::warn!(
            method = %method,
            path = %path,
            username = %claims.sub,
            uid = claims.uid,
            role = ?claims.role,
            "ACL: no rule matched; denying"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}

fn allow_parent(method: &Method, rest: &[&str]) -> Result<(), AppError> {
    match rest {
        ["auth", "logout" | "passcode" | "credentials" | "register"] if *method == Method::POST => {
            Ok(())
        }
        ["users"] if *method == Method::GET => Ok(()),
        ["users", _] if *method == Method::GET => Ok(()),
        ["users", _, "points"] if *method == Method::PUT => Ok(()),
        ["tasks" | "rewards"] if *method == Method::GET || *method == Method::POST => Ok(()),
        ["tasks" | "rewards", _] if *method == Method::PUT || *method == Method::DELETE => Ok(()),
        ["tasks", _, "mark_complete" | "approve_complete" | "reject_complete"]
            if *method == Method::POST =>
        {
            Ok(())
        }
        ["rewards", _, "request_redemption" | "approve_redemption" | "reject_redemption"]
            if *method == Method::POST =>
        {
            Ok(())
        }
        ["logs"] if *method == Method::GET => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn allow_child(method: &Method, rest: &[&str], claims: &JwtClaims) -> Result<(), AppError> {
    match rest {
        ["auth", "logout" | "passcode" | "credentials"] if *method == Method::POST => Ok(()),
        ["users", user] if *method == Method::GET => ensure_self(claims, user),
        ["tasks" | "rewards"] if *method == Method::GET => Ok(()),
        // Ownership of the item itself is checked by the handler.
        ["tasks", _, "mark_complete" | "reject_complete"] if *method == Method::POST => Ok(()),
        ["rewards", _, "request_redemption" | "reject_redemption"] if *method == Method::POST => {
            Ok(())
        }
        ["logs"] if *method == Method::GET => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn segmented(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(seg: &str) -> String {
    percent_decode_str(seg).decode_utf8_lossy().to_string()
}

fn ensure_self(claims: &JwtClaims, seg: &str) -> Result<(), AppError> {
    match decode(seg).parse::<i32>() {
        Ok(id) if id == claims.uid => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}
