use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Username of the account every fresh server knows about.
pub const SEED_USERNAME: &str = "fake73";
pub const SEED_PASSWORD: &str = "fakepassword";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
struct Account {
    id: Uuid,
    password: String,
    api_token: Uuid,
}

#[derive(Default)]
pub struct Accounts {
    by_username: HashMap<String, Account>,
    tasks: HashMap<Uuid, Vec<Task>>,
}

impl Accounts {
    fn seeded() -> Self {
        let mut accounts = Self::default();
        accounts.by_username.insert(
            SEED_USERNAME.to_string(),
            Account {
                id: Uuid::new_v4(),
                password: SEED_PASSWORD.to_string(),
                api_token: Uuid::new_v4(),
            },
        );
        accounts
    }

    fn user_for_token(&self, token: &str) -> Option<Uuid> {
        let token = Uuid::parse_str(token).ok()?;
        self.by_username
            .values()
            .find(|account| account.api_token == token)
            .map(|account| account.id)
    }
}

pub type Db = Arc<RwLock<Accounts>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Accounts::seeded()));
    let api = Router::new()
        .route("/user/auth/local/login", post(login))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/redirect/{code}", any(redirect));
    Router::new().nest("/api/v1", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "message": message })))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let accounts = db.read().await;
    let account = accounts
        .by_username
        .get(&input.username)
        .filter(|account| account.password == input.password)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Incorrect username or password"))?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "newUser": false,
            "apiToken": account.api_token.to_string(),
            "id": account.id.to_string(),
        }
    })))
}

async fn authorized(db: &Db, headers: &HeaderMap) -> Result<Uuid, (StatusCode, Json<Value>)> {
    let token = headers
        .get("Auth")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Missing Auth header"))?;
    db.read()
        .await
        .user_for_token(token)
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Unknown API token"))
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user = authorized(&db, &headers).await?;
    let accounts = db.read().await;
    let tasks = accounts.tasks.get(&user).cloned().unwrap_or_default();
    Ok(Json(json!({ "success": true, "data": tasks })))
}

async fn create_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let user = authorized(&db, &headers).await?;
    let task = Task {
        id: Uuid::new_v4(),
        text: input.text,
        completed: input.completed,
    };
    db.write().await.tasks.entry(user).or_default().push(task.clone());
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": task }))))
}

/// Reflects the request back so clients can inspect what went on the wire.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Answers with whatever status the path asks for.
async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "code": status.as_u16() })))
}

/// Redirects with the requested 3xx code to a route that would succeed.
async fn redirect(Path(code): Path<u16>) -> (StatusCode, [(header::HeaderName, &'static str); 1], Json<Value>) {
    let status = StatusCode::from_u16(code)
        .ok()
        .filter(StatusCode::is_redirection)
        .unwrap_or(StatusCode::FOUND);
    (
        status,
        [(header::LOCATION, "/api/v1/status/200")],
        Json(json!({ "code": status.as_u16() })),
    )
}
