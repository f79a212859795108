//! JSON HTTP server for the query tools and resource views.
//!
//! All query tools are registered in a unified [`ToolRegistry`] and
//! dispatched through the same `POST /tools/{name}` handler. Read-only
//! resource routes expose the scanned context directly, serving markdown
//! content with its native content type.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call any registered tool by name |
//! | `GET`  | `/resources/rules` | Rule list for a project (`?project=`) |
//! | `GET`  | `/resources/rules/{name}` | One rule's markdown content |
//! | `GET`  | `/resources/commands` | Workspace + global command list |
//! | `GET`  | `/resources/commands/{name}` | One command's markdown content |
//! | `GET`  | `/resources/skills` | Workspace + global skill list |
//! | `GET`  | `/resources/skills/{name}` | One skill's markdown content |
//! | `GET`  | `/resources/constitution` | Parsed constitution view |
//! | `GET`  | `/resources/constitution/content` | Raw constitution markdown |
//! | `GET`  | `/resources/specs` | Specification index |
//! | `GET`  | `/resources/specs/{domain}` | One domain's spec.md content |
//! | `GET`  | `/resources/schemas` | Schema index |
//! | `GET`  | `/resources/schemas/{name}` | One schema's JSON content |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "name must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` and
//! `internal_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients and cross-origin MCP tool calls.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregate::{ContextAggregator, ProjectContext};
use crate::config::Config;
use crate::fs::RealFileSystem;
use crate::models::FileBody;
use crate::tools::{ToolContext, ToolRegistry};

const MARKDOWN_TYPE: &str = "text/markdown; charset=utf-8";

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    ctx: Arc<ToolContext>,
    tools: Arc<ToolRegistry>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind`. Every request scans
/// fresh, so responses always reflect disk state.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
    let default_root = std::env::current_dir()?;
    run_server_with(config, ToolContext::new(aggregator, default_root)).await
}

/// Starts the HTTP server with an explicit tool context.
///
/// Like [`run_server`], but lets callers supply the scanning session, e.g.
/// to pin the default project root somewhere other than the current
/// directory.
pub async fn run_server_with(config: &Config, ctx: ToolContext) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let registry = ToolRegistry::with_builtins();

    println!("Registered {} tools:", registry.len());
    for t in registry.tools() {
        println!("  POST /tools/{} — {}", t.name(), t.description());
    }

    let state = AppState {
        ctx: Arc::new(ctx),
        tools: Arc::new(registry),
    };

    let app = router(state);

    println!("Context server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/resources/rules", get(handle_list_rules))
        .route("/resources/rules/{name}", get(handle_rule_content))
        .route("/resources/commands", get(handle_list_commands))
        .route("/resources/commands/{name}", get(handle_command_content))
        .route("/resources/skills", get(handle_list_skills))
        .route("/resources/skills/{name}", get(handle_skill_content))
        .route("/resources/constitution", get(handle_constitution))
        .route(
            "/resources/constitution/content",
            get(handle_constitution_content),
        )
        .route("/resources/specs", get(handle_specs))
        .route("/resources/specs/{domain}", get(handle_spec_content))
        .route("/resources/schemas", get(handle_schemas))
        .route("/resources/schemas/{name}", get(handle_schema_content))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for tool execution failures.
fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for resource reads that cannot degrade to a
/// markdown sentinel body.
fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal_error".to_string(),
        message: message.into(),
    }
}

/// Maps tool execution errors to the most appropriate HTTP status. Lets
/// tools signal client errors (empty name → 400) without a custom error
/// type in the `Tool` trait.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(format!("{}: {}", tool_name, msg))
    } else {
        tool_error(format!("{}: {}", tool_name, msg))
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

/// One entry in the `GET /tools/list` response.
#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    builtin: bool,
    parameters: Value,
}

/// JSON response body for `GET /tools/list`.
#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            builtin: t.is_builtin(),
            parameters: t.parameters_schema(),
        })
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Unified tool dispatch. Returns `404` if the tool is not registered,
/// `400` for parameter validation errors, and `500` for execution errors.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let result = tool
        .execute(params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(json!({ "result": result })))
}

// ============ GET /resources/* ============

/// Query parameters shared by every resource route.
#[derive(Deserialize)]
struct ResourceQuery {
    /// Project root path; defaults to the server's workspace.
    project: Option<String>,
}

async fn scan_for(state: &AppState, query: &ResourceQuery) -> ProjectContext {
    let root = query
        .project
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| state.ctx.resolve_root(&Value::Null));
    state.ctx.scan(&root).await
}

/// Markdown response with its native content type. Read-degraded files
/// serve the sentinel body rather than an error.
fn markdown_response(content: &FileBody) -> Response {
    ([(header::CONTENT_TYPE, MARKDOWN_TYPE)], content.text().to_string()).into_response()
}

async fn handle_list_rules(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    let rules: Vec<Value> = context
        .rules
        .iter()
        .map(|rule| {
            let mut value = json!(rule);
            value["kind"] = json!(rule.kind());
            value
        })
        .collect();
    Json(json!({ "rules": rules }))
}

async fn handle_rule_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let rule = context
        .rules
        .iter()
        .find(|r| r.file_name.eq_ignore_ascii_case(&name) || stem_matches(&r.file_name, &name))
        .ok_or_else(|| not_found(format!("no rule named: {}", name)))?;
    Ok(markdown_response(&rule.content))
}

async fn handle_list_commands(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    let commands: Vec<Value> = context
        .all_commands()
        .map(|command| {
            let mut value = json!(command);
            value["description"] = json!(command.description());
            value
        })
        .collect();
    Json(json!({ "commands": commands }))
}

async fn handle_command_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let command = context
        .all_commands()
        .find(|c| c.file_name.eq_ignore_ascii_case(&name) || stem_matches(&c.file_name, &name))
        .ok_or_else(|| not_found(format!("no command named: {}", name)))?;
    Ok(markdown_response(&command.content))
}

async fn handle_list_skills(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    let skills: Vec<Value> = context.all_skills().map(|skill| json!(skill)).collect();
    Json(json!({ "skills": skills }))
}

async fn handle_skill_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let skill = context
        .all_skills()
        .find(|s| s.name.eq_ignore_ascii_case(&name))
        .ok_or_else(|| not_found(format!("no skill named: {}", name)))?;
    Ok(markdown_response(&skill.content))
}

async fn handle_constitution(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    Json(json!({ "constitution": context.artifacts.constitution }))
}

async fn handle_specs(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    Json(json!({ "specs": context.artifacts.specs }))
}

async fn handle_constitution_content(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let path = context
        .artifacts
        .constitution
        .path
        .as_ref()
        .ok_or_else(|| not_found("no constitution file found"))?;
    let body = state.ctx.aggregator().read_artifact(path).await;
    Ok(markdown_response(&body))
}

async fn handle_schemas(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> Json<Value> {
    let context = scan_for(&state, &query).await;
    Json(json!({ "schemas": context.artifacts.schemas }))
}

async fn handle_spec_content(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let spec = context
        .artifacts
        .specs
        .specs
        .iter()
        .find(|s| s.domain.eq_ignore_ascii_case(&domain))
        .ok_or_else(|| not_found(format!("no specification domain named: {}", domain)))?;
    let body = state.ctx.aggregator().read_artifact(&spec.path).await;
    Ok(markdown_response(&body))
}

async fn handle_schema_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response, AppError> {
    let context = scan_for(&state, &query).await;
    let schema = context
        .artifacts
        .schemas
        .schemas
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(&name) || stem_matches(&name, &s.name))
        .ok_or_else(|| not_found(format!("no schema named: {}", name)))?;
    match state.ctx.aggregator().read_artifact(&schema.path).await {
        FileBody::Ok(text) => {
            Ok(([(header::CONTENT_TYPE, "application/json")], text).into_response())
        }
        FileBody::ReadError => Err(internal_error(format!(
            "could not read {}",
            schema.path.display()
        ))),
    }
}

/// Extension-agnostic name comparison for resource path segments.
fn stem_matches(file_name: &str, query: &str) -> bool {
    std::path::Path::new(file_name)
        .file_stem()
        .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/core.mdc",
            "---\ndescription: Core rules\nalwaysApply: true\n---\nAlways on.\n",
        )
        .add_file("/p/.cursor/commands/release.md", "# Release\n\nCut a tag.\n")
        .add_file(
            "/p/AGENTS.md",
            "# Constitution\n\n> **Project Mission:** Ship well.\n",
        )
        .add_file(
            "/p/specs/auth/spec.md",
            "# Auth\n\n## Blueprint\n\nToken flow.\n",
        )
        .add_file("/p/schemas/user.json", r#"{"$id": "urn:user", "type": "object"}"#);
        let state = AppState {
            ctx: Arc::new(ToolContext::new(
                ContextAggregator::new(Arc::new(fs)),
                PathBuf::from("/p"),
            )),
            tools: Arc::new(ToolRegistry::with_builtins()),
        };
        router(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_tools_list_and_dispatch() {
        let response = app()
            .oneshot(Request::get("/tools/list").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["tools"].as_array().unwrap().len(), 9);

        let response = app()
            .oneshot(
                Request::post("/tools/list_rules")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["rules"][0]["kind"], "always");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let response = app()
            .oneshot(
                Request::post("/tools/nope")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_empty_name_param_is_400() {
        let response = app()
            .oneshot(
                Request::post("/tools/get_rule")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rule_content_served_as_markdown() {
        let response = app()
            .oneshot(
                Request::get("/resources/rules/core")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            MARKDOWN_TYPE
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8(bytes.to_vec())
            .unwrap()
            .contains("Always on."));
    }

    #[tokio::test]
    async fn test_missing_rule_content_is_404() {
        let response = app()
            .oneshot(
                Request::get("/resources/rules/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_constitution_resource() {
        let response = app()
            .oneshot(
                Request::get("/resources/constitution")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["constitution"]["exists"], true);
        assert_eq!(body["constitution"]["mission"], "Ship well.");
    }

    #[tokio::test]
    async fn test_constitution_content_served_as_markdown() {
        let response = app()
            .oneshot(
                Request::get("/resources/constitution/content")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MARKDOWN_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8(bytes.to_vec())
            .unwrap()
            .contains("Project Mission"));
    }

    #[tokio::test]
    async fn test_spec_content_served_as_markdown() {
        let response = app()
            .oneshot(
                Request::get("/resources/specs/auth")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MARKDOWN_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8(bytes.to_vec())
            .unwrap()
            .contains("Token flow."));
    }

    #[tokio::test]
    async fn test_schema_content_served_as_json() {
        let response = app()
            .oneshot(
                Request::get("/resources/schemas/user.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["$id"], "urn:user");
    }

    #[tokio::test]
    async fn test_missing_schema_is_404() {
        let response = app()
            .oneshot(
                Request::get("/resources/schemas/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_project_query_param() {
        let response = app()
            .oneshot(
                Request::get("/resources/rules?project=/elsewhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["rules"].as_array().unwrap().is_empty());
    }
}
