//! In-process fake control plane that records every request it receives

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Form, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-token";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub fields: Vec<RecordedField>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&RecordedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields_named(&self, name: &str) -> Vec<&RecordedField> {
        self.fields.iter().filter(|f| f.name == name).collect()
    }
}

#[derive(Default)]
struct Inner {
    requests: Vec<RecordedRequest>,
    /// Remaining reads that answer 503 before succeeding
    flaky_reads: u32,
    fail_mutations: bool,
}

#[derive(Clone, Default)]
pub struct FakeState {
    inner: Arc<Mutex<Inner>>,
}

impl FakeState {
    fn record(
        &self,
        method: &str,
        path: String,
        headers: &HeaderMap,
        fields: Vec<RecordedField>,
        body: Option<Value>,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.inner.lock().unwrap().requests.push(RecordedRequest {
            method: method.to_string(),
            path,
            authorization: header(AUTHORIZATION.as_str()),
            request_id: header("x-request-id"),
            fields,
            body,
        });
    }

    fn take_flaky(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.flaky_reads > 0 {
            inner.flaky_reads -= 1;
            true
        } else {
            false
        }
    }

    fn mutations_fail(&self) -> bool {
        self.inner.lock().unwrap().fail_mutations
    }
}

pub struct FakeControlPlane {
    pub url: String,
    state: FakeState,
}

impl FakeControlPlane {
    pub async fn spawn() -> Self {
        let state = FakeState::default();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn set_flaky_reads(&self, count: u32) {
        self.state.inner.lock().unwrap().flaky_reads = count;
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.state.inner.lock().unwrap().fail_mutations = fail;
    }
}

fn router(state: FakeState) -> Router {
    Router::new()
        .route("/api/auth/token", post(login))
        .route("/api/servers", get(list_servers).post(create_server))
        .route(
            "/api/servers/:id",
            get(get_server).put(update_server).delete(delete_server),
        )
        .route("/api/servers/:id/action", post(server_action))
        .route("/api/servers/:id/upload-code", post(upload_code))
        .route("/api/servers/:id/upload-config", post(upload_config))
        .route(
            "/api/servers/:id/config-files",
            get(list_config_files).post(add_config_file),
        )
        .route(
            "/api/servers/:id/config-files/:config_id",
            put(update_config_file).delete(delete_config_file),
        )
        .route("/api/images", get(list_images))
        .route("/api/system/status", get(system_status))
        .route("/api/system/ports", get(port_pool))
        .route("/api/system/version", get(version))
        .with_state(state)
}

// ============================================================================
// Helpers
// ============================================================================

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn unauthorized() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")
}

async fn read_fields(mut multipart: Multipart) -> Vec<RecordedField> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.push(RecordedField {
            name,
            filename,
            data,
        });
    }
    fields
}

fn server_json(id: &str, name: &str, status: &str) -> Value {
    let host_port = if status == "running" {
        json!(30001)
    } else {
        Value::Null
    };
    json!({
        "id": id,
        "name": name,
        "description": null,
        "entry_object": "mcp",
        "ports": "30001",
        "host_port": host_port,
        "status": status,
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-01T10:00:00",
        "env_vars": [],
        "config_files": []
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn login(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.record(
        "POST",
        "/api/auth/token".to_string(),
        &headers,
        Vec::new(),
        Some(json!(form)),
    );

    let ok = form.get("username").map(String::as_str) == Some(USERNAME)
        && form.get("password").map(String::as_str) == Some(PASSWORD);
    if !ok {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }

    Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
}

async fn list_servers(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.record("GET", "/api/servers".to_string(), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.take_flaky() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "try again");
    }

    Json(json!([
        server_json("srv-1", "weather", "running"),
        server_json("srv-2", "notes", "stopped")
    ]))
    .into_response()
}

async fn create_server(
    State(state): State<FakeState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = read_fields(multipart).await;
    let name = fields
        .iter()
        .find(|f| f.name == "name")
        .map(RecordedField::text)
        .unwrap_or_default();
    state.record("POST", "/api/servers".to_string(), &headers, fields, None);

    if !authorized(&headers) {
        return unauthorized();
    }
    if state.mutations_fail() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "engine unavailable");
    }

    Json(server_json("srv-new", &name, "stopped")).into_response()
}

async fn get_server(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("GET", format!("/api/servers/{}", id), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != "srv-1" {
        return detail(StatusCode::NOT_FOUND, "Server not found");
    }

    Json(server_json("srv-1", "weather", "running")).into_response()
}

async fn update_server(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("PUT", format!("/api/servers/{}", id), &headers, Vec::new(), Some(body.clone()));
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut server = server_json(&id, "weather", "stopped");
    if let Some(description) = body.get("description") {
        server["description"] = description.clone();
    }
    Json(server).into_response()
}

async fn delete_server(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("DELETE", format!("/api/servers/{}", id), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "Server deleted" })).into_response()
}

async fn server_action(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(
        "POST",
        format!("/api/servers/{}/action", id),
        &headers,
        Vec::new(),
        Some(body.clone()),
    );
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.mutations_fail() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "engine unavailable");
    }

    let action = body["action"].as_str().unwrap_or_default();
    Json(json!({ "message": format!("Server {}ed", action) })).into_response()
}

async fn upload_code(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = read_fields(multipart).await;
    state.record("POST", format!("/api/servers/{}/upload-code", id), &headers, fields, None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "Code uploaded" })).into_response()
}

async fn upload_config(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = read_fields(multipart).await;
    let count = fields.len();
    state.record("POST", format!("/api/servers/{}/upload-config", id), &headers, fields, None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": format!("{} config file(s) uploaded", count) })).into_response()
}

async fn list_config_files(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record("GET", format!("/api/servers/{}/config-files", id), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([{
        "id": 7,
        "server_id": id,
        "filename": "settings.json",
        "content": "{}",
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-01T10:00:00"
    }]))
    .into_response()
}

async fn add_config_file(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(
        "POST",
        format!("/api/servers/{}/config-files", id),
        &headers,
        Vec::new(),
        Some(body.clone()),
    );
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": 8,
        "server_id": id,
        "filename": body["filename"],
        "content": body["content"],
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-01T10:00:00"
    }))
    .into_response()
}

async fn update_config_file(
    State(state): State<FakeState>,
    Path((id, config_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(
        "PUT",
        format!("/api/servers/{}/config-files/{}", id, config_id),
        &headers,
        Vec::new(),
        Some(body.clone()),
    );
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": config_id,
        "server_id": id,
        "filename": body["filename"],
        "content": body["content"],
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-02T10:00:00"
    }))
    .into_response()
}

async fn delete_config_file(
    State(state): State<FakeState>,
    Path((id, config_id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "DELETE",
        format!("/api/servers/{}/config-files/{}", id, config_id),
        &headers,
        Vec::new(),
        None,
    );
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "Config file deleted" })).into_response()
}

async fn list_images(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.record("GET", "/api/images".to_string(), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"name": "corp/mcp-base:latest", "size": 157286400u64},
        {"name": "python:3.11-slim", "size": "48.2MB"}
    ]))
    .into_response()
}

async fn system_status(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.record("GET", "/api/system/status".to_string(), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "docker_available": true,
        "docker_version": "24.0.7",
        "api_version": "1.43",
        "containers": [
            {"id": "abc123def456", "name": "mcp-weather", "image": "corp/mcp-base:latest",
             "status": "running", "created": "2025-03-01T10:00:00Z", "ports": {}}
        ],
        "images": [
            {"id": "sha256:1234", "tags": ["corp/mcp-base:latest"], "size": 157286400u64,
             "created": "2025-02-01T00:00:00Z"}
        ],
        "platform_version": "1.0.0"
    }))
    .into_response()
}

async fn port_pool(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.record("GET", "/api/system/ports".to_string(), &headers, Vec::new(), None);
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.take_flaky() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "try again");
    }
    Json(json!({
        "port_pool_start": 30000,
        "port_pool_end": 30200,
        "total_ports": 200,
        "allocated_ports_count": 15,
        "available_ports_count": 185,
        "allocated_ports": [30001],
        "port_assignments": [
            {"server_id": "srv-1", "server_name": "weather", "port": 30001,
             "status": "running", "is_allocated": true, "is_running": true}
        ],
        "sample_available_ports": [30000, 30002, 30003]
    }))
    .into_response()
}

async fn version(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.record("GET", "/api/system/version".to_string(), &headers, Vec::new(), None);
    Json(json!({
        "version": "1.0.0",
        "name": "MCP Platform",
        "description": "Sandboxed server hosting"
    }))
    .into_response()
}
