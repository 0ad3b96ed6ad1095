// Registry Lens - Web Server
// REST API over one in-memory session with Axum

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use registry_lens::{
    logging, parse_date, Config, DuplicateGroup, DuplicateKey, ExportView, MatchMode, Record,
    SearchOutcome, Session, Summary, TableSource, YearCount,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

/// Uploads larger than this are rejected
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "registry-server", version, about = "HTTP API for business-registration tables")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "REGISTRY_LENS_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// TOML config file
    #[arg(long, env = "REGISTRY_LENS_CONFIG")]
    config: Option<PathBuf>,

    /// Table loaded at startup; the built-in sample is used when omitted
    #[arg(short, long)]
    file: Option<PathBuf>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    /// Uploads start a fresh session with this config
    config: Arc<Config>,
}

impl AppState {
    fn new(session: Session) -> Self {
        let config = Arc::new(session.config().clone());
        Self {
            session: Arc::new(Mutex::new(session)),
            config,
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>, ApiError> {
        self.session
            .lock()
            .map_err(|_| ApiError::internal("session lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Error carried back to the client in the response envelope
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        }
        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request / response shapes
// ============================================================================

/// Query parameters shared by the views and their exports
#[derive(Debug, Default, Deserialize)]
struct ViewParams {
    q: Option<String>,
    mode: Option<String>,
    start: Option<String>,
    end: Option<String>,
    from: Option<i32>,
    to: Option<i32>,
    by: Option<String>,
    key: Option<String>,
    /// Comma-separated statuses for the status list
    status: Option<String>,
}

impl ViewParams {
    fn mode(&self, default: MatchMode) -> Result<MatchMode, ApiError> {
        match &self.mode {
            Some(m) => m.parse().map_err(ApiError::bad_request),
            None => Ok(default),
        }
    }

    fn duplicate_key(&self) -> Result<DuplicateKey, ApiError> {
        match &self.by {
            Some(by) => by.parse().map_err(ApiError::bad_request),
            None => Ok(DuplicateKey::default()),
        }
    }

    /// Selected statuses; the configured defaults when the parameter is absent.
    fn statuses(&self, session: &Session) -> Vec<String> {
        match &self.status {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => session.default_statuses(),
        }
    }

    fn detail_key(&self) -> Result<&str, ApiError> {
        self.key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("missing query parameter: key"))
    }
}

#[derive(Deserialize)]
struct UploadParams {
    name: Option<String>,
}

#[derive(Serialize)]
struct SummaryResponse {
    source: TableSource,
    encoding: Option<String>,
    columns: Vec<String>,
    #[serde(flatten)]
    summary: Summary,
}

#[derive(Serialize)]
struct SearchResponse {
    mode: MatchMode,
    terms: usize,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    advisory: Option<&'static str>,
    records: Vec<Record>,
}

#[derive(Serialize)]
struct ClosedResponse {
    statuses: Vec<String>,
    status_options: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    count: usize,
    closed_ratio: f64,
    records: Vec<Record>,
}

#[derive(Serialize)]
struct YearsResponse {
    available: Vec<i32>,
    counts: Vec<YearCount>,
}

#[derive(Serialize)]
struct DuplicatesResponse {
    by: DuplicateKey,
    column: String,
    groups: Vec<DuplicateGroup>,
}

// ============================================================================
// View computation (shared by the JSON routes and the CSV exports)
// ============================================================================

fn closed_view(session: &Session, params: &ViewParams) -> Result<ClosedResponse, ApiError> {
    let date = |value: &Option<String>| -> Result<_, ApiError> {
        match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => parse_date(v)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("unrecognised date: {}", v))),
            None => Ok(None),
        }
    };

    let statuses = params.statuses(session);
    let range = session.status_range(&statuses, date(&params.start)?, date(&params.end)?);
    let records = session.status_list(&statuses, range);
    Ok(ClosedResponse {
        statuses,
        status_options: session.status_options(),
        start: range.map(|r| r.start.to_string()),
        end: range.map(|r| r.end.to_string()),
        count: records.len(),
        closed_ratio: session.summary().closed_ratio,
        records,
    })
}

fn years_view(session: &Session, params: &ViewParams) -> YearsResponse {
    let available = session.closed_years();
    let counts = match (available.first(), available.last()) {
        (Some(&first), Some(&last)) => {
            let lo = params.from.unwrap_or(first);
            let hi = params.to.unwrap_or(last);
            session.closures_by_year(Some(lo.min(hi)..=lo.max(hi)))
        }
        _ => Vec::new(),
    };
    YearsResponse { available, counts }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/upload?name= - Replace the table with the request body
async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<SummaryResponse> {
    let name = params.name.unwrap_or_else(|| "upload.csv".to_string());
    let mut fresh = Session::from_bytes(&name, &body, (*state.config).clone())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    fresh
        .load_configured_rules()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(name = %name, rows = fresh.records().len(), "table uploaded");

    let mut session = state.session()?;
    *session = fresh;
    Ok(Json(ApiResponse::ok(summary_of(&session))))
}

fn summary_of(session: &Session) -> SummaryResponse {
    SummaryResponse {
        source: session.source().clone(),
        encoding: session.encoding().map(|e| e.to_string()),
        columns: session
            .config()
            .columns
            .display()
            .iter()
            .map(|c| c.to_string())
            .collect(),
        summary: session.summary(),
    }
}

/// GET /api/summary - Row and closure totals
async fn get_summary(State(state): State<AppState>) -> ApiResult<SummaryResponse> {
    let session = state.session()?;
    Ok(Json(ApiResponse::ok(summary_of(&session))))
}

/// GET /api/search?q=&mode= - Multi-term search
async fn search(State(state): State<AppState>, Query(params): Query<ViewParams>) -> ApiResult<SearchResponse> {
    let session = state.session()?;
    let mode = params.mode(session.config().default_mode)?;
    let text = params.q.as_deref().unwrap_or("");
    let outcome = session.search_for(text, mode);

    Ok(Json(ApiResponse::ok(SearchResponse {
        mode,
        terms: text.split_whitespace().count(),
        count: outcome.len(),
        advisory: outcome.advisory(),
        records: outcome.records().to_vec(),
    })))
}

/// GET /api/closed?status=&start=&end= - Businesses by status within a date range
async fn closed(State(state): State<AppState>, Query(params): Query<ViewParams>) -> ApiResult<ClosedResponse> {
    let session = state.session()?;
    Ok(Json(ApiResponse::ok(closed_view(&session, &params)?)))
}

/// GET /api/closed/years?from=&to= - Closures per year
async fn closed_years(State(state): State<AppState>, Query(params): Query<ViewParams>) -> ApiResult<YearsResponse> {
    let session = state.session()?;
    Ok(Json(ApiResponse::ok(years_view(&session, &params))))
}

/// GET /api/duplicates?by= - Repeated owners or national ids
async fn duplicates(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> ApiResult<DuplicatesResponse> {
    let session = state.session()?;
    let by = params.duplicate_key()?;
    Ok(Json(ApiResponse::ok(DuplicatesResponse {
        by,
        column: session.key_header(by).to_string(),
        groups: session.duplicate_groups(by),
    })))
}

/// GET /api/duplicates/detail?by=&key= - Records sharing one key value
async fn duplicate_detail(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Vec<Record>> {
    let session = state.session()?;
    let by = params.duplicate_key()?;
    let key = params.detail_key()?;
    Ok(Json(ApiResponse::ok(session.duplicate_detail(by, key))))
}

/// GET /api/export/:view - Current view as a BOM-prefixed CSV download
async fn export(
    State(state): State<AppState>,
    Path(view): Path<String>,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let session = state.session()?;

    let (target, bytes) = match view.as_str() {
        "search" => {
            let mode = params.mode(session.config().default_mode)?;
            let outcome = session.search_for(params.q.as_deref().unwrap_or(""), mode);
            if let SearchOutcome::NoQuery = outcome {
                return Err(ApiError::bad_request("nothing to export without a query"));
            }
            (ExportView::Search, session.export_records(outcome.records()))
        }
        "closed" => {
            let view = closed_view(&session, &params)?;
            (ExportView::ClosedList, session.export_records(&view.records))
        }
        "years" => {
            let view = years_view(&session, &params);
            (ExportView::ClosedByYear, session.export_year_counts(&view.counts))
        }
        "duplicates" => {
            let by = params.duplicate_key()?;
            let groups = session.duplicate_groups(by);
            (ExportView::DuplicateSummary(by), session.export_duplicate_groups(by, &groups))
        }
        "duplicates-detail" => {
            let by = params.duplicate_key()?;
            let detail = session.duplicate_detail(by, params.detail_key()?);
            (ExportView::DuplicateDetail(by), session.export_records(&detail))
        }
        other => return Err(ApiError::bad_request(format!("unknown view: {}", other))),
    };

    let bytes = bytes.map_err(|e| ApiError::internal(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"export.csv\"; filename*=UTF-8''{}",
        urlencoding::encode(target.file_name())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================================
// Main Server
// ============================================================================

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(upload))
        .route("/summary", get(get_summary))
        .route("/search", get(search))
        .route("/closed", get(closed))
        .route("/closed/years", get(closed_years))
        .route("/duplicates", get(duplicates))
        .route("/duplicates/detail", get(duplicate_detail))
        .route("/export/:view", get(export))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    println!("🌐 Registry Lens - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    let mut session = match &args.file {
        Some(path) => Session::from_path(path, config)
            .with_context(|| format!("Failed to load table: {}", path.display()))?,
        None => {
            println!("ℹ️  No file given; serving the built-in sample table.");
            Session::sample(config)
        }
    };
    session
        .load_configured_rules()
        .context("Failed to load category rules")?;
    println!("✓ {} rows loaded", session.records().len());

    let router = app(AppState::new(session));

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/summary", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router)
        .await
        .context("Server error")?;
    Ok(())
}
