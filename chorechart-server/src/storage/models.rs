use crate::storage::schema::{logs, rewards, sessions, tasks, users};
use chorechart_shared::api;
use chorechart_shared::auth::Role;
use chorechart_shared::domain::{ActionType, ChoreState, RecurrenceType};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::StorageError;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub passcode_hash: String,
    pub role: String,
    pub points: i32,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn role(&self) -> Result<Role, StorageError> {
        self.role
            .parse()
            .map_err(|e: chorechart_shared::auth::UnknownRole| {
                StorageError::Corrupt(e.to_string())
            })
    }

    pub fn is_child(&self) -> bool {
        matches!(self.role(), Ok(Role::Child))
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub passcode_hash: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: i32,
    pub description: String,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: String,
    pub is_marked_complete: bool,
    pub created_at: NaiveDateTime,
}

impl Task {
    pub fn recurrence(&self) -> Result<RecurrenceType, StorageError> {
        parse_recurrence(&self.recurrence_type)
    }

    pub fn state(&self) -> ChoreState {
        ChoreState::from_flag(self.is_marked_complete)
    }
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub description: &'a str,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = rewards)]
pub struct Reward {
    pub id: i32,
    pub description: String,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: String,
    pub is_redemption_requested: bool,
    pub created_at: NaiveDateTime,
}

impl Reward {
    pub fn recurrence(&self) -> Result<RecurrenceType, StorageError> {
        parse_recurrence(&self.recurrence_type)
    }

    pub fn state(&self) -> ChoreState {
        ChoreState::from_flag(self.is_redemption_requested)
    }
}

#[derive(Insertable)]
#[diesel(table_name = rewards)]
pub struct NewReward<'a> {
    pub description: &'a str,
    pub points: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub recurrence_type: &'a str,
}

/// Fields shared by task and reward creation and update.
#[derive(Debug, Clone)]
pub struct ChoreFields {
    pub description: String,
    pub points: i32,
    pub recurrence_type: RecurrenceType,
}

fn parse_recurrence(s: &str) -> Result<RecurrenceType, StorageError> {
    s.parse()
        .map_err(|e: chorechart_shared::domain::UnknownRecurrence| {
            StorageError::Corrupt(e.to_string())
        })
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = logs)]
pub struct Log {
    pub id: i32,
    pub timestamp: NaiveDateTime,
    pub actor_id: i32,
    pub action_type: String,
    pub recipient_id: Option<i32>,
    pub points_before: Option<i32>,
    pub points_after: Option<i32>,
    pub additional_context: Option<String>,
}

impl Log {
    pub fn action(&self) -> Result<ActionType, StorageError> {
        self.action_type
            .parse()
            .map_err(|e: chorechart_shared::domain::UnknownAction| {
                StorageError::Corrupt(e.to_string())
            })
    }
}

#[derive(Insertable)]
#[diesel(table_name = logs)]
pub struct NewLog<'a> {
    pub timestamp: NaiveDateTime,
    pub actor_id: i32,
    pub action_type: &'a str,
    pub recipient_id: Option<i32>,
    pub points_before: Option<i32>,
    pub points_after: Option<i32>,
    pub additional_context: Option<&'a str>,
}

/// A log row joined with the usernames of its actor and recipient.
#[derive(Debug, Clone)]
pub struct LogView {
    pub log: Log,
    pub actor_username: Option<String>,
    pub recipient_username: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub user_id: i32,
    pub issued_at: NaiveDateTime,
    pub last_used_at: NaiveDateTime,
}

// Wire conversions

fn rfc3339(dt: NaiveDateTime) -> String {
    chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc).to_rfc3339()
}

impl User {
    pub fn to_dto(&self) -> Result<api::UserDto, StorageError> {
        Ok(api::UserDto {
            id: self.id,
            username: self.username.clone(),
            role: self.role()?,
            points: self.points,
        })
    }
}

impl Task {
    pub fn to_dto(&self) -> Result<api::TaskDto, StorageError> {
        Ok(api::TaskDto {
            id: self.id,
            description: self.description.clone(),
            points: self.points,
            parent_id: self.parent_id,
            child_id: self.child_id,
            recurrence_type: self.recurrence()?,
            is_marked_complete: self.is_marked_complete,
        })
    }
}

impl Reward {
    pub fn to_dto(&self) -> Result<api::RewardDto, StorageError> {
        Ok(api::RewardDto {
            id: self.id,
            description: self.description.clone(),
            points: self.points,
            parent_id: self.parent_id,
            child_id: self.child_id,
            recurrence_type: self.recurrence()?,
            is_redemption_requested: self.is_redemption_requested,
        })
    }
}

impl LogView {
    pub fn to_dto(&self) -> Result<api::LogDto, StorageError> {
        Ok(api::LogDto {
            id: self.log.id,
            timestamp: rfc3339(self.log.timestamp),
            actor_id: self.log.actor_id,
            actor_username: self.actor_username.clone(),
            action_type: self.log.action()?,
            recipient_id: self.log.recipient_id,
            recipient_username: self.recipient_username.clone(),
            points_before: self.log.points_before,
            points_after: self.log.points_after,
            additional_context: self.log.additional_context.clone(),
        })
    }
}
