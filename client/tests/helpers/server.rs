//! In-process stand-in for the attendance service. Routes mirror the real
//! API shape; state is inspectable so tests can assert on what the client
//! actually sent.

use axum::{
    Json, Router,
    extract::{Multipart, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "tok-123";

pub fn student_user() -> Value {
    json!({
        "_id": "u-1",
        "username": "alice",
        "role": "student",
        "company_id": "acme",
        "full_name": "Alice Zhou",
        "has_face_encoding": true
    })
}

pub fn admin_user() -> Value {
    json!({
        "_id": "u-9",
        "username": "root",
        "role": "faculty_admin"
    })
}

/// Multipart fields of the last `POST /attendance`, as received.
#[derive(Debug, Clone, Default)]
pub struct SubmittedFields {
    pub field_names: Vec<String>,
    pub image_len: usize,
    pub lat: String,
    pub lon: String,
    pub bearer: Option<String>,
}

#[derive(Clone)]
pub struct StubState {
    pub login_user: Arc<Mutex<Value>>,
    pub submit_hits: Arc<AtomicUsize>,
    pub history_hits: Arc<AtomicUsize>,
    /// Status + body for `POST /attendance`; non-2xx bodies are served as
    /// plain text.
    pub submit_response: Arc<Mutex<(u16, Value)>>,
    pub last_submission: Arc<Mutex<Option<SubmittedFields>>>,
    pub history: Arc<Mutex<Vec<Value>>>,
    pub records_queries: Arc<Mutex<Vec<String>>>,
    pub records_response: Arc<Mutex<Value>>,
    pub export_queries: Arc<Mutex<Vec<String>>>,
    pub export_body: Arc<Mutex<Vec<u8>>>,
}

impl StubState {
    fn new() -> Self {
        Self {
            login_user: Arc::new(Mutex::new(student_user())),
            submit_hits: Arc::new(AtomicUsize::new(0)),
            history_hits: Arc::new(AtomicUsize::new(0)),
            submit_response: Arc::new(Mutex::new((201, json!({"status": "present"})))),
            last_submission: Arc::new(Mutex::new(None)),
            history: Arc::new(Mutex::new(Vec::new())),
            records_queries: Arc::new(Mutex::new(Vec::new())),
            records_response: Arc::new(Mutex::new(
                json!({"data": [], "page": 1, "limit": 50, "total": 0}),
            )),
            export_queries: Arc::new(Mutex::new(Vec::new())),
            export_body: Arc::new(Mutex::new(b"PK\x03\x04stub-xlsx".to_vec())),
        }
    }
}

pub struct StubServer {
    pub addr: SocketAddr,
    pub state: StubState,
}

impl StubServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn() -> StubServer {
    let state = StubState::new();
    let port = portpicker::pick_unused_port().expect("no free port");
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind stub");
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    StubServer { addr, state }
}

fn router(state: StubState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/attendance", post(submit_attendance))
        .route("/attendance/me", get(my_records))
        .route("/admin/records", get(admin_records))
        .route("/admin/export", get(admin_export))
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "missing or invalid token").into_response()
}

async fn login(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    let password = body
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if password == "wrong" {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    let user = state.login_user.lock().unwrap().clone();
    Json(json!({"access_token": TOKEN, "user": user})).into_response()
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> Response {
    if bearer(&headers).as_deref() != Some(TOKEN) {
        return unauthorized();
    }
    Json(state.login_user.lock().unwrap().clone()).into_response()
}

async fn submit_attendance(
    State(state): State<StubState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.submit_hits.fetch_add(1, Ordering::SeqCst);

    let mut fields = SubmittedFields {
        bearer: bearer(&headers),
        ..Default::default()
    };
    while let Some(field) = multipart.next_field().await.expect("multipart") {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.expect("field bytes");
        match name.as_str() {
            "image" => fields.image_len = data.len(),
            "lat" => fields.lat = String::from_utf8_lossy(&data).into_owned(),
            "lon" => fields.lon = String::from_utf8_lossy(&data).into_owned(),
            _ => {}
        }
        fields.field_names.push(name);
    }

    if fields.bearer.as_deref() != Some(TOKEN) {
        *state.last_submission.lock().unwrap() = Some(fields);
        return unauthorized();
    }

    let (status, body) = state.submit_response.lock().unwrap().clone();
    let status = StatusCode::from_u16(status).expect("stub status");

    if status.is_success() {
        let record = json!({
            "_id": format!("rec-{}", state.submit_hits.load(Ordering::SeqCst)),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "location": {
                "lat": fields.lat.parse::<f64>().unwrap_or(0.0),
                "lon": fields.lon.parse::<f64>().unwrap_or(0.0),
            },
            "status": body.get("status").and_then(|v| v.as_str()).unwrap_or("pending"),
            "score": body.get("score").cloned().unwrap_or(Value::Null),
        });
        state.history.lock().unwrap().insert(0, record);
        *state.last_submission.lock().unwrap() = Some(fields);
        (status, Json(body)).into_response()
    } else {
        *state.last_submission.lock().unwrap() = Some(fields);
        (status, body.as_str().unwrap_or_default().to_string()).into_response()
    }
}

async fn my_records(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.history_hits.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers).as_deref() != Some(TOKEN) {
        return unauthorized();
    }
    Json(Value::Array(state.history.lock().unwrap().clone())).into_response()
}

async fn admin_records(
    State(state): State<StubState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if bearer(&headers).as_deref() != Some(TOKEN) {
        return unauthorized();
    }
    state
        .records_queries
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());
    Json(state.records_response.lock().unwrap().clone()).into_response()
}

async fn admin_export(
    State(state): State<StubState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if bearer(&headers).as_deref() != Some(TOKEN) {
        return unauthorized();
    }
    state
        .export_queries
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());
    let body = state.export_body.lock().unwrap().clone();
    (
        [(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )],
        body,
    )
        .into_response()
}
