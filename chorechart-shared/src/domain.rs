//! Chore lifecycle rules shared by the server and clients.
//!
//! Tasks and rewards follow the same two-state cycle: `Open` until the child
//! marks a task complete (or asks to redeem a reward), `Pending` until a
//! parent approves or rejects. Approval resolves the entity according to its
//! [`RecurrenceType`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecurrenceType {
    #[serde(rename = "single-use")]
    SingleUse,
    #[serde(rename = "perpetual")]
    Perpetual,
}

impl RecurrenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceType::SingleUse => "single-use",
            RecurrenceType::Perpetual => "perpetual",
        }
    }

    /// What happens to the entity once a parent approves it.
    pub fn on_approve(self) -> Resolution {
        match self {
            RecurrenceType::SingleUse => Resolution::Remove,
            RecurrenceType::Perpetual => Resolution::Reopen,
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recurrence type: {0}")]
pub struct UnknownRecurrence(pub String);

impl FromStr for RecurrenceType {
    type Err = UnknownRecurrence;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-use" => Ok(RecurrenceType::SingleUse),
            "perpetual" => Ok(RecurrenceType::Perpetual),
            other => Err(UnknownRecurrence(other.to_string())),
        }
    }
}

/// Outcome of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Row is deleted.
    Remove,
    /// Pending flag is cleared; the row stays for the next cycle.
    Reopen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoreState {
    Open,
    Pending,
}

impl ChoreState {
    pub fn from_flag(pending: bool) -> Self {
        if pending {
            ChoreState::Pending
        } else {
            ChoreState::Open
        }
    }

    pub fn is_pending(self) -> bool {
        self == ChoreState::Pending
    }

    /// Child marks a task complete or asks for a reward.
    pub fn request(self) -> Result<ChoreState, ChoreError> {
        match self {
            ChoreState::Open => Ok(ChoreState::Pending),
            ChoreState::Pending => Err(ChoreError::AlreadyPending),
        }
    }

    /// Parent (or the child) withdraws a pending request.
    pub fn reject(self) -> Result<ChoreState, ChoreError> {
        match self {
            ChoreState::Pending => Ok(ChoreState::Open),
            ChoreState::Open => Err(ChoreError::NotPending),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChoreError {
    #[error("already pending approval")]
    AlreadyPending,
    #[error("not pending approval")]
    NotPending,
    #[error("not enough points: {available} available, {required} required")]
    InsufficientPoints { required: i32, available: i32 },
}

/// Balance after earning `points`. Saturates instead of overflowing.
pub fn credit(balance: i32, points: i32) -> i32 {
    balance.saturating_add(points.max(0))
}

/// Balance after spending `cost`, clamped at zero.
pub fn debit(balance: i32, cost: i32) -> i32 {
    balance.saturating_sub(cost.max(0)).max(0)
}

/// Balance after a signed adjustment, clamped at zero.
pub fn adjust(balance: i32, delta: i32) -> i32 {
    balance.saturating_add(delta).max(0)
}

pub fn ensure_affordable(balance: i32, cost: i32) -> Result<(), ChoreError> {
    if balance < cost {
        Err(ChoreError::InsufficientPoints {
            required: cost,
            available: balance,
        })
    } else {
        Ok(())
    }
}

/// Kinds of audit log rows. Stored as snake_case text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ChangePoints,
    CreateTask,
    UpdateTask,
    DeleteTask,
    MarkTaskComplete,
    ApproveTaskComplete,
    RejectTaskComplete,
    CreateReward,
    UpdateReward,
    DeleteReward,
    RequestRedemption,
    ApproveRedemption,
    RejectRedemption,
}

impl ActionType {
    pub const ALL: [ActionType; 13] = [
        ActionType::ChangePoints,
        ActionType::CreateTask,
        ActionType::UpdateTask,
        ActionType::DeleteTask,
        ActionType::MarkTaskComplete,
        ActionType::ApproveTaskComplete,
        ActionType::RejectTaskComplete,
        ActionType::CreateReward,
        ActionType::UpdateReward,
        ActionType::DeleteReward,
        ActionType::RequestRedemption,
        ActionType::ApproveRedemption,
        ActionType::RejectRedemption,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::ChangePoints => "change_points",
            ActionType::CreateTask => "create_task",
            ActionType::UpdateTask => "update_task",
            ActionType::DeleteTask => "delete_task",
            ActionType::MarkTaskComplete => "mark_task_complete",
            ActionType::ApproveTaskComplete => "approve_task_complete",
            ActionType::RejectTaskComplete => "reject_task_complete",
            ActionType::CreateReward => "create_reward",
            ActionType::UpdateReward => "update_reward",
            ActionType::DeleteReward => "delete_reward",
            ActionType::RequestRedemption => "request_redemption",
            ActionType::ApproveRedemption => "approve_redemption",
            ActionType::RejectRedemption => "reject_redemption",
        }
    }

    /// Only point changes are debounced; everything else is append-only.
    pub fn is_debounced(self) -> bool {
        self == ActionType::ChangePoints
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action type: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionType {
    type Err = UnknownAction;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
