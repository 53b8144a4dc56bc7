use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use chorechart_shared::api;

use super::{ApiJson, AppError, AppState, auth::AuthCtx, parse_id, tasks::chore_fields, user_dto};
use crate::storage::models::Reward;

fn reward_resp(reward: &Reward) -> Result<api::RewardResp, AppError> {
    Ok(api::RewardResp {
        reward: reward.to_dto()?,
    })
}

async fn load_for(state: &AppState, auth: &AuthCtx, reward_id: i32) -> Result<Reward, AppError> {
    let reward = state
        .store
        .get_reward(reward_id)
        .await?
        .ok_or_else(|| AppError::not_found("Reward not found"))?;
    auth.ensure_may_act_for(reward.child_id)?;
    Ok(reward)
}

pub(super) async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::RewardsResp>, AppError> {
    let rewards = state
        .store
        .list_rewards_for(auth.user_id(), auth.role())
        .await?
        .iter()
        .map(|r| r.to_dto())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(api::RewardsResp { rewards }))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::ChoreReq>,
) -> Result<(StatusCode, Json<api::CreatedResp<api::RewardResp>>), AppError> {
    auth.require_parent()?;
    let child_id = body
        .child_id
        .ok_or_else(|| AppError::bad_request("child_id is required"))?;
    let fields = chore_fields(&body, None)?;
    let reward = state
        .store
        .create_reward(auth.user_id(), child_id, fields)
        .await?;
    tracing::info!(reward_id = reward.id, child_id, "reward created");
    Ok((
        StatusCode::CREATED,
        Json(api::CreatedResp {
            message: "Reward created successfully".into(),
            created_id: reward.id,
            entity: reward_resp(&reward)?,
        }),
    ))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<api::ChoreReq>,
) -> Result<Json<api::RewardResp>, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "reward")?;
    let current = load_for(&state, &auth, id).await?;
    let fields = chore_fields(
        &body,
        Some((
            &current.description,
            current.points,
            &current.recurrence_type,
        )),
    )?;
    let reward = state.store.update_reward(auth.user_id(), id, fields).await?;
    Ok(Json(reward_resp(&reward)?))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "reward")?;
    state.store.delete_reward(auth.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn request_redemption(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::MessageResp>, AppError> {
    let id = parse_id(&id, "reward")?;
    load_for(&state, &auth, id).await?;
    state.store.request_redemption(auth.user_id(), id).await?;
    Ok(Json(api::MessageResp {
        message: "Reward redemption requested. Awaiting parent approval.".into(),
    }))
}

pub(super) async fn approve_redemption(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::RedemptionApprovedResp>, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "reward")?;
    let approval = state.store.approve_redemption(auth.user_id(), id).await?;
    tracing::info!(
        reward_id = id,
        child_id = approval.child.id,
        before = approval.points_before,
        after = approval.child.points,
        resolution = ?approval.resolution,
        "redemption approved"
    );
    Ok(Json(api::RedemptionApprovedResp {
        message: "Reward redemption approved".into(),
        points_spent: approval.entity.points,
        user: user_dto(&approval.child)?,
    }))
}

pub(super) async fn reject_redemption(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::MessageResp>, AppError> {
    let id = parse_id(&id, "reward")?;
    load_for(&state, &auth, id).await?;
    state.store.reject_redemption(auth.user_id(), id).await?;
    Ok(Json(api::MessageResp {
        message: "Reward redemption rejected".into(),
    }))
}
