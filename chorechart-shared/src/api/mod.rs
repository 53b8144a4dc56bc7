use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::domain::{ActionType, RecurrenceType};

pub mod endpoints;

pub const API_V1_PREFIX: &str = "/api/v1";

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub username: String,
    pub passcode: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterReq {
    pub username: String,
    pub passcode: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasscodeReq {
    pub current_passcode: String,
    pub new_passcode: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCredentialsReq {
    pub username: String,
    pub current_passcode: String,
    pub new_passcode: String,
}

// Generic responses
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResp {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResp<T> {
    pub message: String,
    pub created_id: i32,
    #[serde(flatten)]
    pub entity: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIdResp {
    pub message: String,
    pub created_id: i32,
}

// Users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub points: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResp {
    pub user: UserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResp {
    pub users: Vec<UserDto>,
}

/// Either an absolute balance or a signed adjustment; exactly one is required.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PointsReq {
    pub points: Option<i32>,
    pub delta: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResp {
    pub message: String,
    pub user: UserDto,
}

// Tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: i32,
    pub description: String,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: RecurrenceType,
    pub is_marked_complete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResp {
    pub task: TaskDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResp {
    pub tasks: Vec<TaskDto>,
}

/// Body for creating a task or reward. `child_id` is ignored on update.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChoreReq {
    pub description: Option<String>,
    pub points: Option<i32>,
    pub child_id: Option<i32>,
    pub recurrence_type: Option<String>,
}

// Rewards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardDto {
    pub id: i32,
    pub description: String,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: RecurrenceType,
    pub is_redemption_requested: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewardResp {
    pub reward: RewardDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewardsResp {
    pub rewards: Vec<RewardDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskApprovedResp {
    pub message: String,
    pub points_earned: i32,
    pub user: UserDto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionApprovedResp {
    pub message: String,
    pub points_spent: i32,
    pub user: UserDto,
}

// Logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDto {
    pub id: i32,
    /// RFC3339 UTC
    pub timestamp: String,
    pub actor_id: i32,
    pub actor_username: Option<String>,
    pub action_type: ActionType,
    pub recipient_id: Option<i32>,
    pub recipient_username: Option<String>,
    pub points_before: Option<i32>,
    pub points_after: Option<i32>,
    pub additional_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResp {
    pub logs: Vec<LogDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionDto {
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_points: Option<i32>,
}
