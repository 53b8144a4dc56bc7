use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use chorechart_shared::api;
use chorechart_shared::domain::RecurrenceType;

use super::{ApiJson, AppError, AppState, auth::AuthCtx, parse_id, user_dto};
use crate::storage::models::{ChoreFields, Task};

/// Validates a create/update body. On update, `current` supplies the values
/// for fields the body leaves out.
pub(super) fn chore_fields(
    body: &api::ChoreReq,
    current: Option<(&str, i32, &str)>,
) -> Result<ChoreFields, AppError> {
    let description = match (&body.description, current) {
        (Some(d), _) => d.trim().to_string(),
        (None, Some((d, _, _))) => d.to_string(),
        (None, None) => String::new(),
    };
    if description.is_empty() {
        return Err(AppError::bad_request("Description is required"));
    }
    let points = match (body.points, current) {
        (Some(p), _) => p,
        (None, Some((_, p, _))) => p,
        (None, None) => return Err(AppError::bad_request("Points are required")),
    };
    if points <= 0 {
        return Err(AppError::bad_request("Points must be a positive integer"));
    }
    let recurrence_type = match (&body.recurrence_type, current) {
        (Some(r), _) => r.parse::<RecurrenceType>(),
        (None, Some((_, _, r))) => r.parse::<RecurrenceType>(),
        (None, None) => Ok(RecurrenceType::SingleUse),
    }
    .map_err(|_| AppError::bad_request("Invalid recurrence type"))?;
    Ok(ChoreFields {
        description,
        points,
        recurrence_type,
    })
}

fn task_resp(task: &Task) -> Result<api::TaskResp, AppError> {
    Ok(api::TaskResp {
        task: task.to_dto()?,
    })
}

/// Loads a task and checks the caller may act on it.
async fn load_for(state: &AppState, auth: &AuthCtx, task_id: i32) -> Result<Task, AppError> {
    let task = state
        .store
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))?;
    auth.ensure_may_act_for(task.child_id)?;
    Ok(task)
}

pub(super) async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::TasksResp>, AppError> {
    let tasks = state
        .store
        .list_tasks_for(auth.user_id(), auth.role())
        .await?
        .iter()
        .map(|t| t.to_dto())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(api::TasksResp { tasks }))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::ChoreReq>,
) -> Result<(StatusCode, Json<api::CreatedResp<api::TaskResp>>), AppError> {
    auth.require_parent()?;
    let child_id = body
        .child_id
        .ok_or_else(|| AppError::bad_request("child_id is required"))?;
    let fields = chore_fields(&body, None)?;
    let task = state
        .store
        .create_task(auth.user_id(), child_id, fields)
        .await?;
    tracing::info!(task_id = task.id, child_id, "task created");
    Ok((
        StatusCode::CREATED,
        Json(api::CreatedResp {
            message: "Task created successfully".into(),
            created_id: task.id,
            entity: task_resp(&task)?,
        }),
    ))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<api::ChoreReq>,
) -> Result<Json<api::TaskResp>, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "task")?;
    let current = load_for(&state, &auth, id).await?;
    let fields = chore_fields(
        &body,
        Some((
            &current.description,
            current.points,
            &current.recurrence_type,
        )),
    )?;
    let task = state.store.update_task(auth.user_id(), id, fields).await?;
    Ok(Json(task_resp(&task)?))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "task")?;
    state.store.delete_task(auth.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn mark_complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::MessageResp>, AppError> {
    let id = parse_id(&id, "task")?;
    load_for(&state, &auth, id).await?;
    state.store.mark_task_complete(auth.user_id(), id).await?;
    Ok(Json(api::MessageResp {
        message: "Task marked as completed. Awaiting parent approval.".into(),
    }))
}

pub(super) async fn approve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::TaskApprovedResp>, AppError> {
    auth.require_parent()?;
    let id = parse_id(&id, "task")?;
    let approval = state.store.approve_task(auth.user_id(), id).await?;
    tracing::info!(
        task_id = id,
        child_id = approval.child.id,
        before = approval.points_before,
        after = approval.child.points,
        resolution = ?approval.resolution,
        "task approved"
    );
    Ok(Json(api::TaskApprovedResp {
        message: "Task completion approved".into(),
        points_earned: approval.entity.points,
        user: user_dto(&approval.child)?,
    }))
}

pub(super) async fn reject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::MessageResp>, AppError> {
    let id = parse_id(&id, "task")?;
    load_for(&state, &auth, id).await?;
    state.store.reject_task(auth.user_id(), id).await?;
    Ok(Json(api::MessageResp {
        message: "Task completion rejected".into(),
    }))
}
