use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Task, SEED_PASSWORD, SEED_USERNAME};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn login_body(username: &str, password: &str) -> String {
    serde_json::json!({ "username": username, "password": password }).to_string()
}

// --- login ---

#[tokio::test]
async fn login_with_seed_account_returns_token() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/user/auth/local/login",
            &login_body(SEED_USERNAME, SEED_PASSWORD),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["newUser"], false);
    assert!(body["data"]["apiToken"].is_string());
    assert!(body["data"]["id"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/user/auth/local/login",
            &login_body(SEED_USERNAME, "nope"),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn login_with_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v1/user/auth/local/login", r#"{"user":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- tasks ---

#[tokio::test]
async fn tasks_require_auth_header() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/v1/tasks").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tasks_reject_unknown_token() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/tasks")
                .header("Auth", "00000000-0000-0000-0000-000000000000")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- echo / status ---

#[tokio::test]
async fn echo_reflects_method_headers_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/echo")
                .header("Custom", "header")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["method"], "PATCH");
    assert_eq!(body["headers"]["custom"], "header");
    assert_eq!(body["body"], "payload");
}

#[tokio::test]
async fn status_route_answers_requested_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/v1/status/503").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], br#"{"code":503}"#);
}

#[tokio::test]
async fn redirect_route_points_at_a_successful_status() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/v1/redirect/301").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()[http::header::LOCATION], "/api/v1/status/200");
}

// --- full login / task lifecycle ---

#[tokio::test]
async fn login_then_manage_tasks() {
    use tower::Service;

    let mut app = app().into_service();

    // login
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v1/user/auth/local/login",
            &login_body(SEED_USERNAME, SEED_PASSWORD),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = body_json(resp).await;
    let token = login["data"]["apiToken"].as_str().unwrap().to_string();

    // list is empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .uri("/api/v1/tasks")
                .header("Auth", &token)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Value = body_json(resp).await;
    assert_eq!(listed["data"], serde_json::json!([]));

    // create
    let mut create = json_request("POST", "/api/v1/tasks", r#"{"text":"Walk dog"}"#);
    create.headers_mut().insert("auth", token.parse().unwrap());
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(create).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = body_json(resp).await;
    let task: Task = serde_json::from_value(created["data"].clone()).unwrap();
    assert_eq!(task.text, "Walk dog");
    assert!(!task.completed);

    // list contains the new task
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .uri("/api/v1/tasks")
                .header("Auth", &token)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed: Value = body_json(resp).await;
    let tasks: Vec<Task> = serde_json::from_value(listed["data"].clone()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task.id);
}
