//! Audit log writer.
//!
//! Every point-affecting or chore-state-affecting action lands here. Point
//! changes are debounced: a burst of adjustments by the same actor to the same
//! recipient collapses into a single "from X to Y" row, and a burst whose net
//! effect is zero leaves no row at all. The table is kept to the most recent
//! `retention` rows after every insert.

use chorechart_shared::domain::ActionType;
use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use tracing::trace;

use super::models::{Log, NewLog};
use super::schema::logs;

/// Window within which repeated `change_points` rows are merged.
pub const CHANGE_POINTS_DEBOUNCE_SECS: i64 = 30;
/// Rows kept when the config does not say otherwise.
pub const DEFAULT_LOG_RETENTION: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub actor_id: i32,
    pub action: ActionType,
    pub recipient_id: Option<i32>,
    pub points_before: Option<i32>,
    pub points_after: Option<i32>,
    pub additional_context: Option<String>,
}

impl LogEntry {
    pub fn new(actor_id: i32, action: ActionType) -> Self {
        Self {
            actor_id,
            action,
            recipient_id: None,
            points_before: None,
            points_after: None,
            additional_context: None,
        }
    }

    pub fn recipient(mut self, recipient_id: i32) -> Self {
        self.recipient_id = Some(recipient_id);
        self
    }

    pub fn points(mut self, before: i32, after: i32) -> Self {
        self.points_before = Some(before);
        self.points_after = Some(after);
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// A new row was appended.
    Inserted(i32),
    /// An existing row in the debounce window absorbed the change.
    Merged(i32),
    /// The change undid the window's earlier changes; the row was removed.
    Collapsed(i32),
}

pub fn record_action(
    conn: &mut SqliteConnection,
    entry: &LogEntry,
    now: NaiveDateTime,
    retention: i64,
) -> QueryResult<LedgerOutcome> {
    if entry.action.is_debounced()
        && let Some(existing) = find_in_window(conn, entry, now)?
    {
        if existing.points_before == entry.points_after {
            diesel::delete(logs::table.find(existing.id)).execute(conn)?;
            trace!(log_id = existing.id, "ledger: net-zero burst collapsed");
            return Ok(LedgerOutcome::Collapsed(existing.id));
        }
        diesel::update(logs::table.find(existing.id))
            .set((
                logs::points_after.eq(entry.points_after),
                logs::timestamp.eq(now),
            ))
            .execute(conn)?;
        trace!(log_id = existing.id, "ledger: merged into window");
        return Ok(LedgerOutcome::Merged(existing.id));
    }

    let row = NewLog {
        timestamp: now,
        actor_id: entry.actor_id,
        action_type: entry.action.as_str(),
        recipient_id: entry.recipient_id,
        points_before: entry.points_before,
        points_after: entry.points_after,
        additional_context: entry.additional_context.as_deref(),
    };
    let id = diesel::insert_into(logs::table)
        .values(&row)
        .returning(logs::id)
        .get_result::<i32>(conn)?;
    let pruned = prune(conn, retention)?;
    trace!(log_id = id, pruned, action = %entry.action, "ledger: appended");
    Ok(LedgerOutcome::Inserted(id))
}

fn find_in_window(
    conn: &mut SqliteConnection,
    entry: &LogEntry,
    now: NaiveDateTime,
) -> QueryResult<Option<Log>> {
    let window_start = now - Duration::seconds(CHANGE_POINTS_DEBOUNCE_SECS);
    let mut query = logs::table
        .select(Log::as_select())
        .filter(logs::actor_id.eq(entry.actor_id))
        .filter(logs::action_type.eq(entry.action.as_str()))
        .filter(logs::timestamp.ge(window_start))
        .into_boxed();
    query = match entry.recipient_id {
        Some(r) => query.filter(logs::recipient_id.eq(r)),
        None => query.filter(logs::recipient_id.is_null()),
    };
    query
        .order((logs::timestamp.desc(), logs::id.desc()))
        .first::<Log>(conn)
        .optional()
}

/// Deletes everything but the newest `retention` rows. Returns rows removed.
pub fn prune(conn: &mut SqliteConnection, retention: i64) -> QueryResult<usize> {
    let stale: Vec<i32> = logs::table
        .select(logs::id)
        .order((logs::timestamp.desc(), logs::id.desc()))
        .offset(retention.max(0))
        .load(conn)?;
    if stale.is_empty() {
        return Ok(0);
    }
    diesel::delete(logs::table.filter(logs::id.eq_any(&stale))).execute(conn)
}
