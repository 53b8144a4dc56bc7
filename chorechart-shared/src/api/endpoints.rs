//! URL builders for the REST API, relative to a server base URL.

use super::API_V1_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn v1(base: &str, path: &str) -> String {
    base_join(base, &format!("{}/{}", API_V1_PREFIX, path))
}

pub fn health(base: &str) -> String {
    base_join(base, "/healthz")
}
pub fn version(base: &str) -> String {
    v1(base, "version")
}
pub fn auth_login(base: &str) -> String {
    v1(base, "auth/login")
}
pub fn auth_logout(base: &str) -> String {
    v1(base, "auth/logout")
}
pub fn auth_register(base: &str) -> String {
    v1(base, "auth/register")
}
pub fn auth_passcode(base: &str) -> String {
    v1(base, "auth/passcode")
}
pub fn auth_credentials(base: &str) -> String {
    v1(base, "auth/credentials")
}
pub fn users(base: &str) -> String {
    v1(base, "users")
}
pub fn user(base: &str, user_id: i32) -> String {
    v1(base, &format!("users/{}", user_id))
}
pub fn user_points(base: &str, user_id: i32) -> String {
    v1(base, &format!("users/{}/points", user_id))
}
pub fn tasks(base: &str) -> String {
    v1(base, "tasks")
}
pub fn task(base: &str, task_id: i32) -> String {
    v1(base, &format!("tasks/{}", task_id))
}
pub fn task_mark_complete(base: &str, task_id: i32) -> String {
    v1(base, &format!("tasks/{}/mark_complete", task_id))
}
pub fn task_approve(base: &str, task_id: i32) -> String {
    v1(base, &format!("tasks/{}/approve_complete", task_id))
}
pub fn task_reject(base: &str, task_id: i32) -> String {
    v1(base, &format!("tasks/{}/reject_complete", task_id))
}
pub fn rewards(base: &str) -> String {
    v1(base, "rewards")
}
pub fn reward(base: &str, reward_id: i32) -> String {
    v1(base, &format!("rewards/{}", reward_id))
}
pub fn reward_request(base: &str, reward_id: i32) -> String {
    v1(base, &format!("rewards/{}/request_redemption", reward_id))
}
pub fn reward_approve(base: &str, reward_id: i32) -> String {
    v1(base, &format!("rewards/{}/approve_redemption", reward_id))
}
pub fn reward_reject(base: &str, reward_id: i32) -> String {
    v1(base, &format!("rewards/{}/reject_redemption", reward_id))
}
pub fn logs(base: &str, limit: Option<u32>) -> String {
    match limit {
        Some(n) => v1(base, &format!("logs?limit={}", n)),
        None => v1(base, "logs"),
    }
}
