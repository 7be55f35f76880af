//! cutover-api - HTTP API server for the cutover migration dashboard.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use cutover_ado::AdoClient;
use cutover_core::{
    defaults, ArtifactKind, ArtifactSource, ArtifactSummary, ConnectionRole,
    CreateConnectionRequest, ExtractionJob, JobStatus, Project, ProjectStatus, SourceConnection,
};
use cutover_jobs::{ExtractionManager, ManagerConfig, RepositoryInspector};
use cutover_store::Store;

/// Maximum request body size (1 MiB); every inbound payload is small JSON.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: Store,
    manager: Arc<ExtractionManager>,
    source: Arc<dyn ArtifactSource>,
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Project as rendered by the dashboard.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    id: Uuid,
    external_id: String,
    name: String,
    description: Option<String>,
    process_template: Option<String>,
    source_control: Option<String>,
    visibility: Option<String>,
    status: ProjectStatus,
    work_item_count: i64,
    repo_count: i64,
    test_case_count: i64,
    pipeline_count: i64,
    created_date: DateTime<Utc>,
    synced_date: Option<DateTime<Utc>>,
}

impl From<&Project> for ProjectResponse {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            external_id: p.external_id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            process_template: p.process_template.clone(),
            source_control: p.source_control.clone(),
            visibility: p.visibility.clone(),
            status: p.status,
            work_item_count: p.work_item_count,
            repo_count: p.repo_count,
            test_case_count: p.test_case_count,
            pipeline_count: p.pipeline_count,
            created_date: p.created_at,
            synced_date: p.synced_at,
        }
    }
}

/// Project plus artifact summaries and extraction history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSummaryResponse {
    #[serde(flatten)]
    project: ProjectResponse,
    artifact_summaries: HashMap<String, ArtifactSummary>,
    extraction_history: Vec<JobResponse>,
}

/// Extraction job as consumed by the polling client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    id: Uuid,
    project_id: Uuid,
    artifact_type: String,
    status: JobStatus,
    progress: i32,
    extracted_items: i64,
    total_items: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl From<&ExtractionJob> for JobResponse {
    fn from(job: &ExtractionJob) -> Self {
        Self {
            id: job.id,
            project_id: job.project_id,
            artifact_type: job.artifact_kind.to_string(),
            status: job.status,
            progress: job.progress_percent,
            extracted_items: job.extracted_items,
            total_items: job.total_items,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error_message: job.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsResponse {
    total_projects: i64,
    selected_projects: i64,
    in_progress_projects: i64,
    migrated_projects: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionResponse {
    id: Uuid,
    name: String,
    organization: String,
    base_url: String,
    #[serde(rename = "type")]
    role: ConnectionRole,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<&SourceConnection> for ConnectionResponse {
    fn from(c: &SourceConnection) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            organization: c.organization.clone(),
            base_url: c.base_url.clone(),
            role: c.role,
            is_active: c.active,
            created_at: c.created_at,
        }
    }
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Batch extraction request from the dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest {
    project_ids: Vec<Uuid>,
    artifact_types: Vec<String>,
}

/// Per (project, artifact type) outcome of a batch extraction request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractOutcome {
    project_id: Uuid,
    artifact_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionRequest {
    name: Option<String>,
    organization: String,
    pat_token: String,
    #[serde(rename = "type", default)]
    role: ConnectionRole,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestConnectionRequest {
    organization: String,
    pat_token: String,
}

/// Normalize an organization field that may arrive as a full URL.
fn normalize_organization(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("https://dev.azure.com/")
        .trim_matches('/')
        .to_string()
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.store.projects.list().await?;
    let response: Vec<ProjectResponse> = projects.iter().map(ProjectResponse::from).collect();
    Ok(Json(response))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.store.projects.get(id).await?;
    let history = state.store.jobs.list_for_project(id).await?;
    Ok(Json(ProjectSummaryResponse {
        project: ProjectResponse::from(&project),
        artifact_summaries: project
            .artifact_summaries
            .iter()
            .map(|(kind, summary)| (kind.to_string(), summary.clone()))
            .collect(),
        extraction_history: history.iter().map(JobResponse::from).collect(),
    }))
}

async fn update_project_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.projects.update_status(id, req.status).await?;
    let project = state.store.projects.get(id).await?;
    Ok(Json(ProjectResponse::from(&project)))
}

async fn get_statistics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.store.projects.stats().await?;
    Ok(Json(StatisticsResponse {
        total_projects: stats.total_projects,
        selected_projects: stats.selected_projects,
        in_progress_projects: stats.in_progress_projects,
        migrated_projects: stats.migrated_projects,
    }))
}

async fn sync_projects(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = state.source.projects().await?;
    for record in &records {
        state.store.projects.upsert_synced(record).await?;
    }
    info!(result_count = records.len(), "Projects synced from source");
    Ok(Json(serde_json::json!({
        "message": format!("Synced {} projects successfully", records.len())
    })))
}

async fn extract_projects(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.project_ids.is_empty() || req.artifact_types.is_empty() {
        return Err(ApiError::BadRequest(
            "projectIds and artifactTypes are required".to_string(),
        ));
    }

    let mut results = Vec::new();
    for &project_id in &req.project_ids {
        for raw_kind in &req.artifact_types {
            let kind: ArtifactKind = match raw_kind.parse() {
                Ok(kind) => kind,
                Err(e) => {
                    results.push(ExtractOutcome {
                        project_id,
                        artifact_type: raw_kind.clone(),
                        job_id: None,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };
            let outcome = state.manager.start(project_id, kind).await;
            results.push(ExtractOutcome {
                project_id,
                artifact_type: raw_kind.clone(),
                job_id: outcome.as_ref().ok().copied(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }
    }
    Ok(Json(serde_json::json!({ "results": results })))
}

async fn start_extraction(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: ArtifactKind = kind
        .parse()
        .map_err(|e: cutover_core::Error| ApiError::BadRequest(e.to_string()))?;
    let job_id = state.manager.start(id, kind).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "jobId": job_id })),
    ))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.manager.job_status(id).await?;
    Ok(Json(JobResponse::from(&job)))
}

async fn list_project_jobs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.projects.exists(id).await? {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }
    let jobs = state.manager.jobs_for_project(id).await?;
    let response: Vec<JobResponse> = jobs.iter().map(JobResponse::from).collect();
    Ok(Json(response))
}

async fn repository_detail(
    State(state): State<AppState>,
    Path((id, repo)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.store.projects.get(id).await?;
    let inspector = RepositoryInspector::new(state.source.clone());
    let detail = inspector.inspect(&project.name, &repo).await?;
    Ok(Json(detail))
}

async fn list_connections(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let connections = state.store.connections.list_active().await?;
    let response: Vec<ConnectionResponse> =
        connections.iter().map(ConnectionResponse::from).collect();
    Ok(Json(response))
}

async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<ConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let organization = normalize_organization(&req.organization);
    if organization.is_empty() || req.pat_token.is_empty() {
        return Err(ApiError::BadRequest(
            "Organization and PAT token are required".to_string(),
        ));
    }

    let connection = state
        .store
        .connections
        .upsert(CreateConnectionRequest {
            name: req.name.unwrap_or_else(|| organization.clone()),
            base_url: format!("{}/{}", cutover_ado::client::DEFAULT_HOST, organization),
            organization,
            token: req.pat_token,
            role: req.role,
            active: req.is_active,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ConnectionResponse::from(&connection)),
    ))
}

async fn test_connection(
    Json(req): Json<TestConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let organization = normalize_organization(&req.organization);
    let client = AdoClient::new(&organization, &req.pat_token);
    match client.test_connection().await {
        Ok(true) => Ok(Json(serde_json::json!({ "success": true }))),
        Ok(false) => Err(ApiError::BadRequest(
            "Invalid credentials or empty response".to_string(),
        )),
        Err(e) => Err(ApiError::from(e)),
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Parse allowed origins from a comma-separated environment variable.
///
/// With `CORS_ALLOWED_ORIGINS` unset the API stays permissive, which suits a
/// dashboard served from the same host during development.
fn cors_layer() -> CorsLayer {
    match std::env::var("CORS_ALLOWED_ORIGINS") {
        Ok(raw) => {
            let origins: Vec<HeaderValue> = raw
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        Err(_) => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/sync", post(sync_projects))
        .route("/api/projects/extract", post(extract_projects))
        .route("/api/projects/:id", get(get_project))
        .route("/api/projects/:id/status", patch(update_project_status))
        .route("/api/projects/:id/extract/:kind", post(start_extraction))
        .route("/api/projects/:id/jobs", get(list_project_jobs))
        .route(
            "/api/projects/:id/repositories/:repo/detail",
            get(repository_detail),
        )
        .route("/api/jobs/:id", get(get_job))
        .route("/api/statistics", get(get_statistics))
        .route(
            "/api/connections",
            get(list_connections).post(create_connection),
        )
        .route("/api/connections/test", post(test_connection))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}

// =============================================================================
// MAIN
// =============================================================================

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cutover_api=debug,cutover_jobs=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let organization = std::env::var("CUTOVER_ORG")
        .map_err(|_| anyhow::anyhow!("CUTOVER_ORG must be set to the source organization"))?;
    let pat = std::env::var("CUTOVER_PAT")
        .map_err(|_| anyhow::anyhow!("CUTOVER_PAT must be set to a personal access token"))?;

    let store = Store::in_memory();
    store
        .connections
        .upsert(CreateConnectionRequest {
            name: format!("{} (env)", organization),
            organization: organization.clone(),
            base_url: format!("{}/{}", cutover_ado::client::DEFAULT_HOST, organization),
            token: pat.clone(),
            role: ConnectionRole::Source,
            active: true,
        })
        .await
        .map_err(|e| anyhow::anyhow!("seeding connection failed: {}", e))?;

    let client = AdoClient::new(&organization, &pat);
    let manager = Arc::new(
        ExtractionManager::new(store.clone(), Arc::new(client.clone()))
            .with_config(ManagerConfig::from_env()),
    );
    let state = AppState {
        store,
        manager,
        source: Arc::new(client),
    };

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!(host = %host, port, "cutover-api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Core(cutover_core::Error),
    BadRequest(String),
    NotFound(String),
}

impl From<cutover_core::Error> for ApiError {
    fn from(err: cutover_core::Error) -> Self {
        use cutover_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::ProjectNotFound(id) => ApiError::NotFound(format!("Project {} not found", id)),
            Error::JobNotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Core(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use cutover_core::Error;
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Core(err) => {
                let status = match &err {
                    Error::Conflict(_) => StatusCode::CONFLICT,
                    Error::UpstreamAuth(_)
                    | Error::UpstreamTimeout(_)
                    | Error::UpstreamMalformed(_)
                    | Error::Request(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
