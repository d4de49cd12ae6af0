use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use matchline::{utils::config::AppConfig, AppContext};

type Shared = Arc<RwLock<MockState>>;

/// Scripted state of the mock matchmaking API. Tests tweak the knobs and
/// inspect what the client sent.
#[derive(Default)]
pub struct MockState {
    /// Body returned by a successful login; `None` scripts a 401 rejection.
    pub login_body: Option<Value>,
    /// Body returned by match search; `None` scripts a 500 failure.
    pub search_body: Option<Value>,
    /// Recommendation list served per user id.
    pub recommendations: Value,
    /// Everything POSTed to /api/user.
    pub registered: Vec<Value>,
    /// Everything PUT to /api/user.
    pub updated: Vec<Value>,
    /// Contact records known to the server (created or preloaded).
    pub contacts: Vec<Value>,
    /// File names received by the photo endpoint.
    pub uploads: Vec<String>,
    next_contact_id: i64,
}

pub struct MockApi {
    pub base_url: String,
    pub state: Shared,
}

/// Installs the test log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Binds the mock API to an ephemeral port and serves it in the background.
pub async fn spawn_mock_api() -> MockApi {
    init_tracing();

    let state: Shared = Arc::new(RwLock::new(MockState {
        recommendations: json!([]),
        ..MockState::default()
    }));

    let app = Router::new()
        .route("/api/user/login", post(login))
        .route("/api/user", post(create_user).put(update_user))
        .route("/api/user/search", post(search_matches))
        .route("/api/contact", post(create_contact))
        .route("/api/contact/:reference_id", get(contacts_for_user))
        .route("/api/photos/:reference_id", post(upload_photo))
        .route("/users/recommendations/:user_id", get(recommendations))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Builds an application context over temporary storage, pointed at the mock.
pub async fn setup_context(api: &MockApi) -> (TempDir, AppContext) {
    let dir = TempDir::new().unwrap();
    let context = context_over(api, &dir, 24 * 60 * 60).await;
    (dir, context)
}

/// Rebuilds a context over existing storage, simulating a page reload.
pub async fn context_over(api: &MockApi, dir: &TempDir, ttl_seconds: u64) -> AppContext {
    let config = AppConfig {
        api_base_url: api.base_url.clone(),
        storage_dir: dir.path().to_str().unwrap().to_string(),
        session_ttl_seconds: ttl_seconds,
    };
    AppContext::new(config).await.unwrap()
}

async fn login(State(state): State<Shared>, Json(_body): Json<Value>) -> Response {
    match state.read().await.login_body.clone() {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response(),
    }
}

async fn create_user(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.write().await.registered.push(body);
    (StatusCode::CREATED, Json(json!({"status": "created"}))).into_response()
}

async fn update_user(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.write().await.updated.push(body);
    (StatusCode::OK, Json(json!({"status": "updated"}))).into_response()
}

async fn search_matches(State(state): State<Shared>, Json(_body): Json<Value>) -> Response {
    match state.read().await.search_body.clone() {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Search backend unavailable"})),
        )
            .into_response(),
    }
}

async fn create_contact(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.write().await;
    state.next_contact_id += 1;

    let mut record = json!({
        "id": state.next_contact_id,
        "userReferenceId": body["userReferenceId"],
        "contactReferenceId": body["contactReferenceId"],
    });
    if !body["status"].is_null() {
        record["status"] = body["status"].clone();
    }

    state.contacts.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn contacts_for_user(
    State(state): State<Shared>,
    Path(reference_id): Path<String>,
) -> Response {
    let contacts: Vec<Value> = state
        .read()
        .await
        .contacts
        .iter()
        .filter(|c| c["userReferenceId"] == reference_id.as_str())
        .cloned()
        .collect();
    (StatusCode::OK, Json(json!(contacts))).into_response()
}

async fn upload_photo(
    State(state): State<Shared>,
    Path(reference_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            // Drain the content so the request completes cleanly.
            let _ = field.bytes().await.unwrap();
            state.write().await.uploads.push(file_name.clone());
            let url = format!("https://cdn.test/{}/{}", reference_id, file_name);
            return (StatusCode::OK, Json(json!({"url": url}))).into_response();
        }
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": "Missing file part"})),
    )
        .into_response()
}

async fn recommendations(State(state): State<Shared>, Path(_user_id): Path<String>) -> Response {
    let body = state.read().await.recommendations.clone();
    (StatusCode::OK, Json(body)).into_response()
}
