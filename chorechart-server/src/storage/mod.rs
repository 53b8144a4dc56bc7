pub mod ledger;
pub mod models;
pub mod schema;

use chorechart_shared::auth::Role;
use chorechart_shared::domain::{self, ActionType, ChoreError, Resolution};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use ledger::LogEntry;
use models::{ChoreFields, Log, LogView, NewReward, NewSession, NewTask, NewUser, Reward, Task, User};
use tracing::trace;

pub(crate) const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The addressed row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A unique value (username) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// A chore lifecycle guard refused the transition.
    #[error(transparent)]
    Rule(#[from] ChoreError),

    /// A stored value could not be interpreted.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// How a parent changes a child's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsChange {
    Set(i32),
    Adjust(i32),
}

/// Result of an approval: the entity as it was before resolution, what was
/// done to it, and the child with the updated balance.
#[derive(Debug, Clone)]
pub struct Approval<T> {
    pub entity: T,
    pub resolution: Resolution,
    pub child: User,
    pub points_before: i32,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
    log_retention: i64,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store {
            pool,
            log_retention: ledger::DEFAULT_LOG_RETENTION,
        })
    }

    pub fn with_log_retention(mut self, rows: i64) -> Self {
        self.log_retention = rows.max(1);
        self
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut conn)
        })
        .await?
    }

    // Users

    /// Upserts users by username; passcode hash and role follow the config.
    pub async fn seed_users(&self, seed: &[crate::server::UserConfig]) -> Result<(), StorageError> {
        use schema::users;
        let seed_owned = seed.to_owned();
        self.with_conn(move |conn| {
            for u in &seed_owned {
                let row = NewUser {
                    username: &u.username,
                    passcode_hash: &u.passcode_hash,
                    role: u.role.as_str(),
                };
                diesel::insert_into(users::table)
                    .values(&row)
                    .on_conflict(users::username)
                    .do_update()
                    .set((
                        users::passcode_hash.eq(row.passcode_hash),
                        users::role.eq(row.role),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn create_user(
        &self,
        username: &str,
        passcode_hash: &str,
        role: Role,
    ) -> Result<User, StorageError> {
        use schema::users;
        let username = username.to_string();
        let hash = passcode_hash.to_string();
        trace!(username = %username, %role, "create_user starting");
        self.with_conn(move |conn| {
            let row = NewUser {
                username: &username,
                passcode_hash: &hash,
                role: role.as_str(),
            };
            diesel::insert_into(users::table)
                .values(&row)
                .returning(User::as_returning())
                .get_result(conn)
                .map_err(|e| username_conflict(e, &username))
        })
        .await
    }

    pub async fn get_user(&self, user_id: i32) -> Result<Option<User>, StorageError> {
        use schema::users;
        self.with_conn(move |conn| {
            Ok(users::table
                .find(user_id)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn find_user_by_username(&self, name: &str) -> Result<Option<User>, StorageError> {
        use schema::users;
        let name = name.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::username.eq(&name))
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn list_children(&self) -> Result<Vec<User>, StorageError> {
        use schema::users;
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::role.eq(Role::Child.as_str()))
                .order(users::username.asc())
                .select(User::as_select())
                .load(conn)?)
        })
        .await
    }

    /// Changes username and passcode hash together; `None` keeps the username.
    pub async fn update_credentials(
        &self,
        user_id: i32,
        username: Option<&str>,
        passcode_hash: &str,
    ) -> Result<(), StorageError> {
        use schema::users;
        let username = username.map(|s| s.to_string());
        let hash = passcode_hash.to_string();
        self.with_conn(move |conn| {
            let target = users::table.find(user_id);
            let updated = match &username {
                Some(name) => diesel::update(target)
                    .set((users::username.eq(name), users::passcode_hash.eq(&hash)))
                    .execute(conn)
                    .map_err(|e| username_conflict(e, name))?,
                None => diesel::update(target)
                    .set(users::passcode_hash.eq(&hash))
                    .execute(conn)?,
            };
            if updated == 0 {
                return Err(StorageError::NotFound("user not found".into()));
            }
            Ok(())
        })
        .await
    }

    /// Sets or adjusts a child's balance and records a debounced
    /// `change_points` log row. Balances never go below zero.
    pub async fn change_points(
        &self,
        actor_id: i32,
        child_id: i32,
        change: PointsChange,
    ) -> Result<User, StorageError> {
        use schema::users;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<User, StorageError> {
                let child = load_child(conn, child_id)?;
                let before = child.points;
                let after = match change {
                    PointsChange::Set(p) if p < 0 => {
                        return Err(StorageError::InvalidInput(
                            "points must not be negative".into(),
                        ));
                    }
                    PointsChange::Set(p) => p,
                    PointsChange::Adjust(d) => domain::adjust(before, d),
                };
                if after == before {
                    return Ok(child);
                }
                let updated = diesel::update(users::table.find(child_id))
                    .set(users::points.eq(after))
                    .returning(User::as_returning())
                    .get_result(conn)?;
                let entry = LogEntry::new(actor_id, ActionType::ChangePoints)
                    .recipient(child_id)
                    .points(before, after);
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(updated)
            })
        })
        .await
    }

    // Tasks

    pub async fn list_tasks_for(&self, user_id: i32, role: Role) -> Result<Vec<Task>, StorageError> {
        use schema::tasks;
        self.with_conn(move |conn| {
            let query = tasks::table.select(Task::as_select()).into_boxed();
            let query = match role {
                Role::Parent => query.filter(tasks::parent_id.eq(user_id)),
                Role::Child => query.filter(tasks::child_id.eq(user_id)),
            };
            Ok(query.order(tasks::id.asc()).load(conn)?)
        })
        .await
    }

    pub async fn get_task(&self, task_id: i32) -> Result<Option<Task>, StorageError> {
        self.with_conn(move |conn| Ok(find_task(conn, task_id)?)).await
    }

    pub async fn create_task(
        &self,
        parent_id: i32,
        child_id: i32,
        fields: ChoreFields,
    ) -> Result<Task, StorageError> {
        use schema::tasks;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Task, StorageError> {
                ensure_assignable(conn, child_id)?;
                let task = diesel::insert_into(tasks::table)
                    .values(&NewTask {
                        description: &fields.description,
                        points: fields.points,
                        parent_id,
                        child_id,
                        recurrence_type: fields.recurrence_type.as_str(),
                    })
                    .returning(Task::as_returning())
                    .get_result(conn)?;
                let entry = LogEntry::new(parent_id, ActionType::CreateTask)
                    .recipient(child_id)
                    .context(task.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(task)
            })
        })
        .await
    }

    pub async fn update_task(
        &self,
        actor_id: i32,
        task_id: i32,
        fields: ChoreFields,
    ) -> Result<Task, StorageError> {
        use schema::tasks;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Task, StorageError> {
                let task = diesel::update(tasks::table.find(task_id))
                    .set((
                        tasks::description.eq(&fields.description),
                        tasks::points.eq(fields.points),
                        tasks::recurrence_type.eq(fields.recurrence_type.as_str()),
                    ))
                    .returning(Task::as_returning())
                    .get_result(conn)
                    .optional()?
                    .ok_or_else(|| task_not_found(task_id))?;
                let entry = LogEntry::new(actor_id, ActionType::UpdateTask)
                    .recipient(task.child_id)
                    .context(task.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(task)
            })
        })
        .await
    }

    pub async fn delete_task(&self, actor_id: i32, task_id: i32) -> Result<Task, StorageError> {
        use schema::tasks;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Task, StorageError> {
                let task = find_task(conn, task_id)?.ok_or_else(|| task_not_found(task_id))?;
                diesel::delete(tasks::table.find(task_id)).execute(conn)?;
                let entry = LogEntry::new(actor_id, ActionType::DeleteTask)
                    .recipient(task.child_id)
                    .context(task.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(task)
            })
        })
        .await
    }

    /// Open -> Pending. Fails with [`ChoreError::AlreadyPending`].
    pub async fn mark_task_complete(&self, actor_id: i32, task_id: i32) -> Result<Task, StorageError> {
        self.set_task_pending(actor_id, task_id, true).await
    }

    /// Pending -> Open without touching the balance.
    pub async fn reject_task(&self, actor_id: i32, task_id: i32) -> Result<Task, StorageError> {
        self.set_task_pending(actor_id, task_id, false).await
    }

    async fn set_task_pending(
        &self,
        actor_id: i32,
        task_id: i32,
        pending: bool,
    ) -> Result<Task, StorageError> {
        use schema::tasks;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Task, StorageError> {
                let task = find_task(conn, task_id)?.ok_or_else(|| task_not_found(task_id))?;
                let (next, action) = if pending {
                    (task.state().request()?, ActionType::MarkTaskComplete)
                } else {
                    (task.state().reject()?, ActionType::RejectTaskComplete)
                };
                let task = diesel::update(tasks::table.find(task_id))
                    .set(tasks::is_marked_complete.eq(next.is_pending()))
                    .returning(Task::as_returning())
                    .get_result(conn)?;
                let entry = LogEntry::new(actor_id, action)
                    .recipient(task.child_id)
                    .context(task.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(task)
            })
        })
        .await
    }

    /// Credits the task's points to its child, then deletes a single-use task
    /// or reopens a perpetual one.
    pub async fn approve_task(&self, actor_id: i32, task_id: i32) -> Result<Approval<Task>, StorageError> {
        use schema::{tasks, users};
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Approval<Task>, StorageError> {
                let task = find_task(conn, task_id)?.ok_or_else(|| task_not_found(task_id))?;
                let resolution = task.recurrence()?.on_approve();
                let child = load_child(conn, task.child_id)?;
                let before = child.points;
                let after = domain::credit(before, task.points);
                let child = diesel::update(users::table.find(child.id))
                    .set(users::points.eq(after))
                    .returning(User::as_returning())
                    .get_result(conn)?;
                match resolution {
                    Resolution::Remove => {
                        diesel::delete(tasks::table.find(task_id)).execute(conn)?;
                    }
                    Resolution::Reopen => {
                        diesel::update(tasks::table.find(task_id))
                            .set(tasks::is_marked_complete.eq(false))
                            .execute(conn)?;
                    }
                }
                let entry = LogEntry::new(actor_id, ActionType::ApproveTaskComplete)
                    .recipient(child.id)
                    .points(before, after)
                    .context(task.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(Approval {
                    entity: task,
                    resolution,
                    child,
                    points_before: before,
                })
            })
        })
        .await
    }

    // Rewards

    pub async fn list_rewards_for(
        &self,
        user_id: i32,
        role: Role,
    ) -> Result<Vec<Reward>, StorageError> {
        use schema::rewards;
        self.with_conn(move |conn| {
            let query = rewards::table.select(Reward::as_select()).into_boxed();
            let query = match role {
                Role::Parent => query.filter(rewards::parent_id.eq(user_id)),
                Role::Child => query.filter(rewards::child_id.eq(user_id)),
            };
            Ok(query.order(rewards::id.asc()).load(conn)?)
        })
        .await
    }

    pub async fn get_reward(&self, reward_id: i32) -> Result<Option<Reward>, StorageError> {
        self.with_conn(move |conn| Ok(find_reward(conn, reward_id)?)).await
    }

    pub async fn create_reward(
        &self,
        parent_id: i32,
        child_id: i32,
        fields: ChoreFields,
    ) -> Result<Reward, StorageError> {
        use schema::rewards;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Reward, StorageError> {
                ensure_assignable(conn, child_id)?;
                let reward = diesel::insert_into(rewards::table)
                    .values(&NewReward {
                        description: &fields.description,
                        points: fields.points,
                        parent_id,
                        child_id,
                        recurrence_type: fields.recurrence_type.as_str(),
                    })
                    .returning(Reward::as_returning())
                    .get_result(conn)?;
                let entry = LogEntry::new(parent_id, ActionType::CreateReward)
                    .recipient(child_id)
                    .context(reward.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(reward)
            })
        })
        .await
    }

    pub async fn update_reward(
        &self,
        actor_id: i32,
        reward_id: i32,
        fields: ChoreFields,
    ) -> Result<Reward, StorageError> {
        use schema::rewards;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Reward, StorageError> {
                let reward = diesel::update(rewards::table.find(reward_id))
                    .set((
                        rewards::description.eq(&fields.description),
                        rewards::points.eq(fields.points),
                        rewards::recurrence_type.eq(fields.recurrence_type.as_str()),
                    ))
                    .returning(Reward::as_returning())
                    .get_result(conn)
                    .optional()?
                    .ok_or_else(|| reward_not_found(reward_id))?;
                let entry = LogEntry::new(actor_id, ActionType::UpdateReward)
                    .recipient(reward.child_id)
                    .context(reward.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(reward)
            })
        })
        .await
    }

    pub async fn delete_reward(&self, actor_id: i32, reward_id: i32) -> Result<Reward, StorageError> {
        use schema::rewards;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Reward, StorageError> {
                let reward =
                    find_reward(conn, reward_id)?.ok_or_else(|| reward_not_found(reward_id))?;
                diesel::delete(rewards::table.find(reward_id)).execute(conn)?;
                let entry = LogEntry::new(actor_id, ActionType::DeleteReward)
                    .recipient(reward.child_id)
                    .context(reward.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(reward)
            })
        })
        .await
    }

    /// Open -> Pending, only when the child can currently afford the reward.
    pub async fn request_redemption(
        &self,
        actor_id: i32,
        reward_id: i32,
    ) -> Result<Reward, StorageError> {
        self.set_redemption_pending(actor_id, reward_id, true).await
    }

    pub async fn reject_redemption(
        &self,
        actor_id: i32,
        reward_id: i32,
    ) -> Result<Reward, StorageError> {
        self.set_redemption_pending(actor_id, reward_id, false).await
    }

    async fn set_redemption_pending(
        &self,
        actor_id: i32,
        reward_id: i32,
        pending: bool,
    ) -> Result<Reward, StorageError> {
        use schema::rewards;
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Reward, StorageError> {
                let reward =
                    find_reward(conn, reward_id)?.ok_or_else(|| reward_not_found(reward_id))?;
                let (next, action) = if pending {
                    let next = reward.state().request()?;
                    let child = load_child(conn, reward.child_id)?;
                    domain::ensure_affordable(child.points, reward.points)?;
                    (next, ActionType::RequestRedemption)
                } else {
                    (reward.state().reject()?, ActionType::RejectRedemption)
                };
                let reward = diesel::update(rewards::table.find(reward_id))
                    .set(rewards::is_redemption_requested.eq(next.is_pending()))
                    .returning(Reward::as_returning())
                    .get_result(conn)?;
                let entry = LogEntry::new(actor_id, action)
                    .recipient(reward.child_id)
                    .context(reward.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(reward)
            })
        })
        .await
    }

    /// Debits the reward's cost from its child after re-checking the balance,
    /// then deletes a single-use reward or reopens a perpetual one.
    pub async fn approve_redemption(
        &self,
        actor_id: i32,
        reward_id: i32,
    ) -> Result<Approval<Reward>, StorageError> {
        use schema::{rewards, users};
        let retention = self.log_retention;
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Approval<Reward>, StorageError> {
                let reward =
                    find_reward(conn, reward_id)?.ok_or_else(|| reward_not_found(reward_id))?;
                let resolution = reward.recurrence()?.on_approve();
                let child = load_child(conn, reward.child_id)?;
                domain::ensure_affordable(child.points, reward.points)?;
                let before = child.points;
                let after = domain::debit(before, reward.points);
                let child = diesel::update(users::table.find(child.id))
                    .set(users::points.eq(after))
                    .returning(User::as_returning())
                    .get_result(conn)?;
                match resolution {
                    Resolution::Remove => {
                        diesel::delete(rewards::table.find(reward_id)).execute(conn)?;
                    }
                    Resolution::Reopen => {
                        diesel::update(rewards::table.find(reward_id))
                            .set(rewards::is_redemption_requested.eq(false))
                            .execute(conn)?;
                    }
                }
                let entry = LogEntry::new(actor_id, ActionType::ApproveRedemption)
                    .recipient(child.id)
                    .points(before, after)
                    .context(reward.description.clone());
                ledger::record_action(conn, &entry, now(), retention)?;
                Ok(Approval {
                    entity: reward,
                    resolution,
                    child,
                    points_before: before,
                })
            })
        })
        .await
    }

    // Logs

    /// Newest first. `recipient` restricts to rows about one user.
    pub async fn list_logs(
        &self,
        recipient: Option<i32>,
        limit: i64,
    ) -> Result<Vec<LogView>, StorageError> {
        use schema::{logs, users};
        let limit = limit.clamp(1, 1000);
        self.with_conn(move |conn| {
            let mut query = logs::table.select(Log::as_select()).into_boxed();
            if let Some(r) = recipient {
                query = query.filter(logs::recipient_id.eq(r));
            }
            let rows: Vec<Log> = query
                .order((logs::timestamp.desc(), logs::id.desc()))
                .limit(limit)
                .load(conn)?;

            let mut ids: Vec<i32> = rows
                .iter()
                .flat_map(|l| std::iter::once(l.actor_id).chain(l.recipient_id))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            let names: std::collections::HashMap<i32, String> = users::table
                .filter(users::id.eq_any(&ids))
                .select((users::id, users::username))
                .load::<(i32, String)>(conn)?
                .into_iter()
                .collect();

            Ok(rows
                .into_iter()
                .map(|log| LogView {
                    actor_username: names.get(&log.actor_id).cloned(),
                    recipient_username: log.recipient_id.and_then(|r| names.get(&r).cloned()),
                    log,
                })
                .collect())
        })
        .await
    }

    // Session helpers for JWT inactivity windows
    pub async fn create_session(&self, jti_: &str, user_id_: i32) -> Result<(), StorageError> {
        use schema::sessions;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let now = now();
            let new = NewSession {
                jti: &j,
                user_id: user_id_,
                issued_at: now,
                last_used_at: now,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(sessions.filter(jti.eq(&j))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now()))
                    .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn find_task(conn: &mut SqliteConnection, task_id: i32) -> QueryResult<Option<Task>> {
    schema::tasks::table
        .find(task_id)
        .select(Task::as_select())
        .first(conn)
        .optional()
}

fn find_reward(conn: &mut SqliteConnection, reward_id: i32) -> QueryResult<Option<Reward>> {
    schema::rewards::table
        .find(reward_id)
        .select(Reward::as_select())
        .first(conn)
        .optional()
}

fn task_not_found(task_id: i32) -> StorageError {
    StorageError::NotFound(format!("task not found: {}", task_id))
}

fn reward_not_found(reward_id: i32) -> StorageError {
    StorageError::NotFound(format!("reward not found: {}", reward_id))
}

fn load_child(conn: &mut SqliteConnection, child_id: i32) -> Result<User, StorageError> {
    let user = schema::users::table
        .find(child_id)
        .select(User::as_select())
        .first(conn)
        .optional()?;
    match user {
        Some(u) if u.is_child() => Ok(u),
        _ => Err(StorageError::NotFound(format!(
            "child not found: {}",
            child_id
        ))),
    }
}

/// Tasks and rewards can only be assigned to existing child users.
fn ensure_assignable(conn: &mut SqliteConnection, child_id: i32) -> Result<(), StorageError> {
    match load_child(conn, child_id) {
        Ok(_) => Ok(()),
        Err(StorageError::NotFound(_)) => Err(StorageError::InvalidInput(format!(
            "child_id {} does not reference a child",
            child_id
        ))),
        Err(e) => Err(e),
    }
}

fn username_conflict(e: diesel::result::Error, username: &str) -> StorageError {
    match e {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StorageError::Conflict(format!("username already exists: {}", username))
        }
        other => StorageError::Database(other),
    }
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}
