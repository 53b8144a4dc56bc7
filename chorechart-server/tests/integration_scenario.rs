use axum::http::StatusCode;
use chorechart_server::{server, storage};
use chorechart_shared::api::endpoints as ep;
use chorechart_shared::auth::Role;
use reqwest::Client;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

const PARENT_PASS: &str = "secret123";
const CHILD_PASS: &str = "kidpass";
// Low bcrypt cost keeps the suite fast.
const TEST_COST: u32 = 4;

struct TestServer {
    base: String,
    client: Client,
    handle: tokio::task::JoinHandle<()>,
    _tempdir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Option<Self> {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let (addr, handle) = match start_server(&db_path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                eprintln!("Skipping test due to sandbox restrictions: {e}");
                return None;
            }
            Err(e) => panic!("failed to start server: {e}"),
        };
        Some(Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            handle,
            _tempdir: dir,
        })
    }

    async fn login(&self, username: &str, passcode: &str) -> (String, i32) {
        let body = self
            .request_expect(
                "POST",
                &ep::auth_login(&self.base),
                None,
                Some(json!({"username": username, "passcode": passcode})),
                StatusCode::OK,
            )
            .await;
        let token = body["token"]
            .as_str()
            .map(|s| s.to_string())
            .expect("token missing from auth response");
        let id = body["user"]["id"].as_i64().expect("user id") as i32;
        (token, id)
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = match method {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            other => panic!("unsupported method {other}"),
        };
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let val = if text.is_empty() {
            json!(null)
        } else {
            serde_json::from_str(&text).unwrap_or(json!({"raw": text}))
        };
        (status, val)
    }

    async fn request_expect(
        &self,
        method: &str,
        url: &str,
        token: Option<&str>,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let (status, value) = self.request(method, url, token, body).await;
        assert_eq!(
            status, expected,
            "{method} {url} returned {status:?} with body {value:?}",
        );
        value
    }

    async fn create_task(&self, token: &str, child_id: i32, points: i32, rec: &str) -> i32 {
        let body = self
            .request_expect(
                "POST",
                &ep::tasks(&self.base),
                Some(token),
                Some(json!({
                    "description": "Empty the dishwasher",
                    "points": points,
                    "child_id": child_id,
                    "recurrence_type": rec,
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(body["createdId"], body["task"]["id"]);
        body["createdId"].as_i64().unwrap() as i32
    }

    async fn create_reward(&self, token: &str, child_id: i32, points: i32, rec: &str) -> i32 {
        let body = self
            .request_expect(
                "POST",
                &ep::rewards(&self.base),
                Some(token),
                Some(json!({
                    "description": "Movie night",
                    "points": points,
                    "child_id": child_id,
                    "recurrence_type": rec,
                })),
                StatusCode::CREATED,
            )
            .await;
        body["createdId"].as_i64().unwrap() as i32
    }

    async fn points_of(&self, token: &str, user_id: i32) -> i64 {
        let body = self
            .request_expect(
                "GET",
                &ep::user(&self.base, user_id),
                Some(token),
                None,
                StatusCode::OK,
            )
            .await;
        body["user"]["points"].as_i64().unwrap()
    }

    async fn logs(&self, token: &str) -> Vec<Value> {
        let body = self
            .request_expect(
                "GET",
                &ep::logs(&self.base, Some(1000)),
                Some(token),
                None,
                StatusCode::OK,
            )
            .await;
        body["logs"].as_array().cloned().unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_server(
    tmp_db: &Path,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let parent_hash = bcrypt::hash(PARENT_PASS, TEST_COST).unwrap();
    let child_hash = bcrypt::hash(CHILD_PASS, TEST_COST).unwrap();
    let config = server::AppConfig {
        jwt_secret: "testsecret".into(),
        users: vec![
            server::UserConfig {
                username: "parent".into(),
                passcode_hash: parent_hash,
                role: Role::Parent,
            },
            server::UserConfig {
                username: "alice".into(),
                passcode_hash: child_hash.clone(),
                role: Role::Child,
            },
            server::UserConfig {
                username: "bob".into(),
                passcode_hash: child_hash,
                role: Role::Child,
            },
        ],
        dev_cors_origin: None,
        listen_port: None,
        log_retention: 1000,
    };

    let store = storage::Store::connect_sqlite(tmp_db.to_str().unwrap())
        .await
        .expect("db")
        .with_log_retention(config.log_retention);
    store.seed_users(&config.users).await.expect("seed");

    let state = server::AppState::new(config, store);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((addr, handle))
}

fn count_actions(logs: &[Value], action: &str) -> usize {
    logs.iter().filter(|l| l["action_type"] == action).count()
}

#[tokio::test]
async fn public_endpoints_work() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let resp = server
        .client
        .get(ep::health(&server.base))
        .header("x-request-id", "rid-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "rid-42");
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.text().await.unwrap(), "ok");

    let version = server
        .request_expect("GET", &ep::version(&server.base), None, None, StatusCode::OK)
        .await;
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));

    let missing = format!("{}/no/such/route", server.base);
    let body = server
        .request_expect("GET", &missing, None, None, StatusCode::NOT_FOUND)
        .await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn login_and_token_checks() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect(
            "POST",
            &ep::auth_login(&server.base),
            None,
            Some(json!({"username": "parent", "passcode": "wrong"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_login(&server.base),
            None,
            Some(json!({"username": "nobody", "passcode": "whatever"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;

    for url in [
        ep::users(&server.base),
        ep::tasks(&server.base),
        ep::rewards(&server.base),
        ep::logs(&server.base, None),
    ] {
        server
            .request_expect("GET", &url, None, None, StatusCode::UNAUTHORIZED)
            .await;
        server
            .request_expect("GET", &url, Some("garbage"), None, StatusCode::UNAUTHORIZED)
            .await;
    }

    let (token, _) = server.login("parent", PARENT_PASS).await;
    let users = server
        .request_expect(
            "GET",
            &ep::users(&server.base),
            Some(&token),
            None,
            StatusCode::OK,
        )
        .await;
    let names: Vec<&str> = users["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["username"].as_str())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);

    server
        .request_expect(
            "POST",
            &ep::auth_logout(&server.base),
            Some(&token),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;
    server
        .request_expect(
            "GET",
            &ep::users(&server.base),
            Some(&token),
            None,
            StatusCode::UNAUTHORIZED,
        )
        .await;
}

#[tokio::test]
async fn single_use_task_lifecycle() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, alice_id) = server.login("alice", CHILD_PASS).await;

    let task_id = server
        .create_task(&parent, alice_id, 10, "single-use")
        .await;

    let listed = server
        .request_expect("GET", &ep::tasks(&server.base), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(listed["tasks"][0]["id"], task_id);
    assert_eq!(listed["tasks"][0]["is_marked_complete"], false);

    server
        .request_expect(
            "POST",
            &ep::task_mark_complete(&server.base, task_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    // Already pending
    server
        .request_expect(
            "POST",
            &ep::task_mark_complete(&server.base, task_id),
            Some(&alice),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;

    let approved = server
        .request_expect(
            "POST",
            &ep::task_approve(&server.base, task_id),
            Some(&parent),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(approved["pointsEarned"], 10);
    assert_eq!(approved["user"]["points"], 10);
    assert_eq!(server.points_of(&alice, alice_id).await, 10);

    // Single-use tasks disappear once approved
    let listed = server
        .request_expect("GET", &ep::tasks(&server.base), Some(&alice), None, StatusCode::OK)
        .await;
    assert!(listed["tasks"].as_array().unwrap().is_empty());
    server
        .request_expect(
            "POST",
            &ep::task_mark_complete(&server.base, task_id),
            Some(&alice),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;

    let logs = server.logs(&parent).await;
    let approval = logs
        .iter()
        .find(|l| l["action_type"] == "approve_task_complete")
        .expect("approval logged");
    assert_eq!(approval["points_before"], 0);
    assert_eq!(approval["points_after"], 10);
    assert_eq!(approval["recipient_username"], "alice");
    assert_eq!(approval["actor_username"], "parent");
}

#[tokio::test]
async fn perpetual_task_reopens_and_reject_keeps_balance() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, alice_id) = server.login("alice", CHILD_PASS).await;
    let task_id = server.create_task(&parent, alice_id, 3, "perpetual").await;

    for _ in 0..2 {
        server
            .request_expect(
                "POST",
                &ep::task_mark_complete(&server.base, task_id),
                Some(&alice),
                None,
                StatusCode::OK,
            )
            .await;
        server
            .request_expect(
                "POST",
                &ep::task_approve(&server.base, task_id),
                Some(&parent),
                None,
                StatusCode::OK,
            )
            .await;
    }
    assert_eq!(server.points_of(&parent, alice_id).await, 6);

    let listed = server
        .request_expect("GET", &ep::tasks(&server.base), Some(&parent), None, StatusCode::OK)
        .await;
    assert_eq!(listed["tasks"][0]["is_marked_complete"], false);
    assert_eq!(listed["tasks"][0]["recurrence_type"], "perpetual");

    server
        .request_expect(
            "POST",
            &ep::task_mark_complete(&server.base, task_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::task_reject(&server.base, task_id),
            Some(&parent),
            None,
            StatusCode::OK,
        )
        .await;
    // Nothing pending any more
    server
        .request_expect(
            "POST",
            &ep::task_reject(&server.base, task_id),
            Some(&parent),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(server.points_of(&parent, alice_id).await, 6);

    let updated = server
        .request_expect(
            "PUT",
            &ep::task(&server.base, task_id),
            Some(&parent),
            Some(json!({"points": 5})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(updated["task"]["points"], 5);
    assert_eq!(updated["task"]["description"], "Empty the dishwasher");

    server
        .request_expect(
            "DELETE",
            &ep::task(&server.base, task_id),
            Some(&parent),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            &ep::task(&server.base, task_id),
            Some(&parent),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn task_validation_errors() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, parent_id) = server.login("parent", PARENT_PASS).await;
    let (_, alice_id) = server.login("alice", CHILD_PASS).await;

    for body in [
        json!({"points": 5, "child_id": alice_id}),
        json!({"description": "x", "points": 0, "child_id": alice_id}),
        json!({"description": "x", "points": 5}),
        json!({"description": "x", "points": 5, "child_id": alice_id, "recurrence_type": "daily"}),
        // Tasks can only go to children
        json!({"description": "x", "points": 5, "child_id": parent_id}),
    ] {
        server
            .request_expect(
                "POST",
                &ep::tasks(&server.base),
                Some(&parent),
                Some(body),
                StatusCode::BAD_REQUEST,
            )
            .await;
    }

    let bad_id = format!("{}/api/v1/tasks/abc/approve_complete", server.base);
    server
        .request_expect("POST", &bad_id, Some(&parent), None, StatusCode::BAD_REQUEST)
        .await;
    server
        .request_expect(
            "POST",
            &ep::task_approve(&server.base, 9999),
            Some(&parent),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn reward_redemption_checks_balance() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, alice_id) = server.login("alice", CHILD_PASS).await;
    let reward_id = server
        .create_reward(&parent, alice_id, 15, "single-use")
        .await;

    let body = server
        .request_expect(
            "POST",
            &ep::reward_request(&server.base, reward_id),
            Some(&alice),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(body["requiredPoints"], 15);
    assert_eq!(body["availablePoints"], 0);

    server
        .request_expect(
            "PUT",
            &ep::user_points(&server.base, alice_id),
            Some(&parent),
            Some(json!({"points": 20})),
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::reward_request(&server.base, reward_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    let listed = server
        .request_expect("GET", &ep::rewards(&server.base), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(listed["rewards"][0]["is_redemption_requested"], true);

    let approved = server
        .request_expect(
            "POST",
            &ep::reward_approve(&server.base, reward_id),
            Some(&parent),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(approved["pointsSpent"], 15);
    assert_eq!(approved["user"]["points"], 5);

    let listed = server
        .request_expect("GET", &ep::rewards(&server.base), Some(&alice), None, StatusCode::OK)
        .await;
    assert!(listed["rewards"].as_array().unwrap().is_empty());

    let logs = server.logs(&alice).await;
    let approval = logs
        .iter()
        .find(|l| l["action_type"] == "approve_redemption")
        .expect("redemption logged");
    assert_eq!(approval["points_before"], 20);
    assert_eq!(approval["points_after"], 5);
}

#[tokio::test]
async fn perpetual_reward_can_be_rejected_and_reused() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, alice_id) = server.login("alice", CHILD_PASS).await;
    let reward_id = server.create_reward(&parent, alice_id, 4, "perpetual").await;
    server
        .request_expect(
            "PUT",
            &ep::user_points(&server.base, alice_id),
            Some(&parent),
            Some(json!({"points": 10})),
            StatusCode::OK,
        )
        .await;

    server
        .request_expect(
            "POST",
            &ep::reward_request(&server.base, reward_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::reward_reject(&server.base, reward_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(server.points_of(&alice, alice_id).await, 10);

    for expected in [6, 2] {
        server
            .request_expect(
                "POST",
                &ep::reward_request(&server.base, reward_id),
                Some(&alice),
                None,
                StatusCode::OK,
            )
            .await;
        let approved = server
            .request_expect(
                "POST",
                &ep::reward_approve(&server.base, reward_id),
                Some(&parent),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(approved["user"]["points"], expected);
    }
    // 2 points left, reward costs 4
    server
        .request_expect(
            "POST",
            &ep::reward_request(&server.base, reward_id),
            Some(&alice),
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn children_are_confined_to_their_own_items() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, alice_id) = server.login("alice", CHILD_PASS).await;
    let (bob, bob_id) = server.login("bob", CHILD_PASS).await;
    let task_id = server.create_task(&parent, alice_id, 5, "single-use").await;
    let reward_id = server.create_reward(&parent, alice_id, 1, "single-use").await;

    server
        .request_expect(
            "POST",
            &ep::task_mark_complete(&server.base, task_id),
            Some(&bob),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::reward_request(&server.base, reward_id),
            Some(&bob),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "GET",
            &ep::user(&server.base, alice_id),
            Some(&bob),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect("GET", &ep::user(&server.base, bob_id), Some(&bob), None, StatusCode::OK)
        .await;
    let bob_tasks = server
        .request_expect("GET", &ep::tasks(&server.base), Some(&bob), None, StatusCode::OK)
        .await;
    assert!(bob_tasks["tasks"].as_array().unwrap().is_empty());

    // Parent-only routes
    server
        .request_expect(
            "POST",
            &ep::tasks(&server.base),
            Some(&alice),
            Some(json!({"description": "x", "points": 5, "child_id": alice_id})),
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::task_approve(&server.base, task_id),
            Some(&alice),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "PUT",
            &ep::user_points(&server.base, alice_id),
            Some(&alice),
            Some(json!({"points": 100})),
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect("GET", &ep::users(&server.base), Some(&alice), None, StatusCode::FORBIDDEN)
        .await;

    // Logs: children only see rows about themselves
    let bob_logs = server.logs(&bob).await;
    assert!(bob_logs.iter().all(|l| l["recipient_id"] == bob_id));
    let alice_logs = server.logs(&alice).await;
    assert_eq!(count_actions(&alice_logs, "create_task"), 1);
    assert_eq!(count_actions(&alice_logs, "create_reward"), 1);
}

#[tokio::test]
async fn registration_and_credentials() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (alice, _) = server.login("alice", CHILD_PASS).await;

    let created = server
        .request_expect(
            "POST",
            &ep::auth_register(&server.base),
            Some(&parent),
            Some(json!({"username": "carol", "passcode": "carol123", "role": "child"})),
            StatusCode::CREATED,
        )
        .await;
    assert!(created["createdId"].as_i64().unwrap() > 0);
    server
        .request_expect(
            "POST",
            &ep::auth_register(&server.base),
            Some(&parent),
            Some(json!({"username": "carol", "passcode": "other123", "role": "child"})),
            StatusCode::CONFLICT,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_register(&server.base),
            Some(&parent),
            Some(json!({"username": "d", "passcode": "1234", "role": "child"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_register(&server.base),
            Some(&alice),
            Some(json!({"username": "eve", "passcode": "eve12345", "role": "parent"})),
            StatusCode::FORBIDDEN,
        )
        .await;

    let (carol, _) = server.login("carol", "carol123").await;
    server
        .request_expect(
            "POST",
            &ep::auth_passcode(&server.base),
            Some(&carol),
            Some(json!({"currentPasscode": "nope", "newPasscode": "9999"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_passcode(&server.base),
            Some(&carol),
            Some(json!({"currentPasscode": "carol123", "newPasscode": "9999"})),
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_login(&server.base),
            None,
            Some(json!({"username": "carol", "passcode": "carol123"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    let (carol, _) = server.login("carol", "9999").await;

    server
        .request_expect(
            "POST",
            &ep::auth_credentials(&server.base),
            Some(&carol),
            Some(json!({"username": "alice", "currentPasscode": "9999", "newPasscode": "8888"})),
            StatusCode::CONFLICT,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::auth_credentials(&server.base),
            Some(&carol),
            Some(json!({"username": "caroline", "currentPasscode": "9999", "newPasscode": "8888"})),
            StatusCode::OK,
        )
        .await;
    server.login("caroline", "8888").await;
}

#[tokio::test]
async fn point_changes_are_consolidated_in_the_log() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (_, alice_id) = server.login("alice", CHILD_PASS).await;
    let points_url = ep::user_points(&server.base, alice_id);

    for delta in [5, 3, 2] {
        server
            .request_expect(
                "PUT",
                &points_url,
                Some(&parent),
                Some(json!({"delta": delta})),
                StatusCode::OK,
            )
            .await;
    }
    let logs = server.logs(&parent).await;
    assert_eq!(count_actions(&logs, "change_points"), 1);
    let row = logs
        .iter()
        .find(|l| l["action_type"] == "change_points")
        .unwrap();
    assert_eq!(row["points_before"], 0);
    assert_eq!(row["points_after"], 10);

    // Decrements clamp at zero
    let body = server
        .request_expect(
            "PUT",
            &points_url,
            Some(&parent),
            Some(json!({"delta": -25})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["user"]["points"], 0);

    // Back where the burst started: the consolidated row disappears
    let logs = server.logs(&parent).await;
    assert_eq!(count_actions(&logs, "change_points"), 0);

    server
        .request_expect(
            "PUT",
            &points_url,
            Some(&parent),
            Some(json!({"points": -1})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    server
        .request_expect(
            "PUT",
            &points_url,
            Some(&parent),
            Some(json!({})),
            StatusCode::BAD_REQUEST,
        )
        .await;
}

#[tokio::test]
async fn malformed_bodies_are_json_bad_requests() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let (parent, _) = server.login("parent", PARENT_PASS).await;
    let (_, alice_id) = server.login("alice", CHILD_PASS).await;

    let cases = [
        (
            "POST",
            ep::auth_register(&server.base),
            json!({"username": "eve", "passcode": "eve12345", "role": "admin"}),
        ),
        (
            "POST",
            ep::auth_register(&server.base),
            json!({"passcode": "eve12345", "role": "child"}),
        ),
        (
            "POST",
            ep::tasks(&server.base),
            json!({"description": "x", "points": "ten", "child_id": alice_id}),
        ),
        (
            "PUT",
            ep::user_points(&server.base, alice_id),
            json!({"points": 1.5}),
        ),
    ];
    for (method, url, body) in cases {
        let resp = server
            .request_expect(method, &url, Some(&parent), Some(body), StatusCode::BAD_REQUEST)
            .await;
        assert!(
            resp["message"].as_str().is_some_and(|m| !m.is_empty()),
            "{method} {url} body {resp:?}"
        );
    }

    // Login is public and goes through the same extractor
    let resp = server
        .request_expect(
            "POST",
            &ep::auth_login(&server.base),
            None,
            Some(json!({"username": "parent"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(resp["message"].is_string());
    assert_eq!(server.points_of(&parent, alice_id).await, 0);
}
