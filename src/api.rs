// src/api.rs
//! Dashboard HTTP surface: one JSON endpoint per region, each failing on its own.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::aggregate::{
    by_company, by_date_and_function, by_function, by_location, by_skill_and_function,
    company_size_ranges, dataset_span, Breakdown, DatasetSpan, FunctionBreakdown,
    FunctionSkills, SizeRange, Timeline, WeekdayCount,
};
use crate::fetch::{fetch_all_records, FetchSettings, Projection, RecordSource, StoreError};
use crate::filter::{apply_filters, FilterOptions, FilterState};
use crate::format::{format_amount, format_percent, format_salary, top_n, Precision, Takeaways};
use crate::records::{JobFunction, JobRecord};
use crate::relay::{
    suggested_prompts, AskOutcome, ChatExchange, ChatMessage, ChatSession, QueryRelay,
    BASE_PROMPTS,
};

pub const MSG_TABLE: &str = "Unable to load job listings. Please try again later.";
pub const MSG_OVERVIEW: &str = "Unable to load the dataset overview.";
pub const MSG_COMPANIES: &str = "Unable to load company statistics.";
pub const MSG_MAP: &str = "Unable to load map data. Please try again later.";
pub const MSG_FUNCTIONS: &str = "Unable to load job function statistics.";
pub const MSG_TIMELINE: &str = "Unable to load the postings timeline.";
pub const MSG_SKILLS: &str = "Unable to load skills data.";
pub const MSG_CHAT: &str = "Sorry, I encountered an error. Please try again.";
pub const MSG_PANIC: &str = "Something went wrong.";

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RecordSource>,
    pub relay: Arc<dyn QueryRelay>,
    pub chat: Arc<ChatSession>,
    pub fetch: FetchSettings,
}

impl AppState {
    pub fn new(
        source: Arc<dyn RecordSource>,
        relay: Arc<dyn QueryRelay>,
        fetch: FetchSettings,
    ) -> Self {
        Self {
            source,
            relay,
            chat: Arc::new(ChatSession::new()),
            fetch,
        }
    }

    async fn records(
        &self,
        projection: Projection,
        region: &'static str,
    ) -> Result<Vec<JobRecord>, ApiError> {
        fetch_all_records(self.source.as_ref(), &self.fetch, projection)
            .await
            .map_err(|e| ApiError::store(region, e))
    }
}

/// Error body: `{ "error": <region message>, "detail": <cause> }`.
#[derive(Debug)]
pub enum ApiError {
    Upstream { message: &'static str, detail: String },
    BadRequest(String),
    Superseded { seq: u64 },
}

impl ApiError {
    fn store(message: &'static str, err: StoreError) -> Self {
        tracing::warn!(target: "api", error = %err, region = message, "region fetch failed");
        ApiError::Upstream {
            message,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Upstream { message, detail } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "detail": detail }),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Bad request", "detail": detail }),
            ),
            ApiError::Superseded { seq } => (
                StatusCode::CONFLICT,
                json!({ "error": "Superseded by a newer query", "detail": format!("query {seq} was cancelled") }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}

fn panic_response(message: &'static str, err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(err.as_ref());
    tracing::error!(target: "api", panic = %detail, region = message, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message, "detail": detail })),
    )
        .into_response()
}

fn app_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    panic_response(MSG_PANIC, err)
}

fn map_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    panic_response(MSG_MAP, err)
}

/// Build the dashboard router (without `/metrics`, which the binary merges in).
pub fn router(state: AppState) -> Router {
    // The map region gets its own boundary so its failures never read as app-wide.
    let map = Router::new()
        .route("/api/locations", get(locations))
        .layer(CatchPanicLayer::custom(map_panic));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/jobs", get(jobs))
        .route("/api/overview", get(overview))
        .route("/api/companies", get(companies))
        .route("/api/functions", get(functions))
        .route("/api/timeline", get(timeline))
        .route("/api/skills", get(skills))
        .route("/api/chat", post(chat))
        .route("/api/chat/history", get(chat_history))
        .route("/api/chat/suggestions", get(chat_suggestions))
        .merge(map)
        .layer(CatchPanicLayer::custom(app_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// --- listings table ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobsQuery {
    pub q: Option<String>,
    pub function: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
}

impl From<JobsQuery> for FilterState {
    fn from(q: JobsQuery) -> Self {
        FilterState {
            search: q.q.unwrap_or_default(),
            job_function: q.function.unwrap_or_default(),
            location: q.location.unwrap_or_default(),
            company: q.company.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobRow {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_function: String,
    pub salary: String,
    pub source: String,
    pub job_url: Option<String>,
    pub posted_date: Option<String>,
}

impl From<&JobRecord> for JobRow {
    fn from(r: &JobRecord) -> Self {
        Self {
            title: r.title().to_string(),
            company: r.company().unwrap_or_default().to_string(),
            location: r.location().unwrap_or_default().to_string(),
            job_function: r.job_function().unwrap_or_default().to_string(),
            salary: format_amount(r.salary_amount),
            source: r.source.clone().unwrap_or_default(),
            job_url: r.job_url.clone(),
            posted_date: r.posted_date.map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsView {
    pub total: usize,
    pub matched: usize,
    pub filter: FilterState,
    pub options: FilterOptions,
    pub rows: Vec<JobRow>,
}

async fn jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobsView>, ApiError> {
    let records = state.records(Projection::Full, MSG_TABLE).await?;
    let filter = FilterState::from(query);
    let matched = apply_filters(&records, &filter);
    Ok(Json(JobsView {
        total: records.len(),
        matched: matched.len(),
        options: FilterOptions::from_records(&records),
        rows: matched.iter().map(JobRow::from).collect(),
        filter,
    }))
}

// --- overview ---

#[derive(Debug, Serialize)]
pub struct OverviewView {
    pub span: DatasetSpan,
    pub takeaways: Takeaways,
    pub markdown: String,
}

async fn overview(State(state): State<AppState>) -> Result<Json<OverviewView>, ApiError> {
    let records = state.records(Projection::Full, MSG_OVERVIEW).await?;
    let takeaways = Takeaways::from_records(&records);
    Ok(Json(OverviewView {
        span: dataset_span(&records),
        markdown: takeaways.to_markdown(),
        takeaways,
    }))
}

// --- companies / map ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TopQuery {
    pub top: Option<usize>,
}

impl TopQuery {
    fn apply(&self, mut breakdown: Breakdown) -> Breakdown {
        if let Some(n) = self.top {
            breakdown.buckets = top_n(&breakdown.buckets, n);
        }
        breakdown
    }
}

#[derive(Debug, Serialize)]
pub struct CompaniesView {
    pub companies: Breakdown,
    pub size_ranges: Vec<SizeRange>,
}

async fn companies(
    State(state): State<AppState>,
    Query(top): Query<TopQuery>,
) -> Result<Json<CompaniesView>, ApiError> {
    let records = state.records(Projection::Full, MSG_COMPANIES).await?;
    let all = by_company(&records);
    let size_ranges = company_size_ranges(&all);
    Ok(Json(CompaniesView {
        companies: top.apply(all),
        size_ranges,
    }))
}

async fn locations(
    State(state): State<AppState>,
    Query(top): Query<TopQuery>,
) -> Result<Json<Breakdown>, ApiError> {
    let records = state.records(Projection::Full, MSG_MAP).await?;
    Ok(Json(top.apply(by_location(&records))))
}

// --- job functions ---

#[derive(Debug, Serialize)]
pub struct FunctionRow {
    pub job_function: JobFunction,
    pub color: &'static str,
    pub count: usize,
    pub percentage: String,
    pub average_salary: String,
    pub jobs_with_salary: usize,
    pub salary_info_percentage: String,
}

#[derive(Debug, Serialize)]
pub struct FunctionsView {
    pub breakdown: FunctionBreakdown,
    pub rows: Vec<FunctionRow>,
}

async fn functions(State(state): State<AppState>) -> Result<Json<FunctionsView>, ApiError> {
    let records = state.records(Projection::Full, MSG_FUNCTIONS).await?;
    let breakdown = by_function(&records);
    let rows = breakdown
        .functions
        .iter()
        .map(|s| FunctionRow {
            job_function: s.job_function,
            color: s.color,
            count: s.count,
            percentage: format_percent(s.percentage, Precision::Whole),
            average_salary: format_salary(s.average_salary),
            jobs_with_salary: s.jobs_with_salary,
            salary_info_percentage: format_percent(s.salary_info_percentage, Precision::Whole),
        })
        .collect();
    Ok(Json(FunctionsView { breakdown, rows }))
}

// --- timeline / skills ---

#[derive(Debug, Serialize)]
pub struct TimelineView {
    #[serde(flatten)]
    pub timeline: Timeline,
    pub weekdays: Vec<WeekdayCount>,
}

async fn timeline(State(state): State<AppState>) -> Result<Json<TimelineView>, ApiError> {
    let records = state.records(Projection::Full, MSG_TIMELINE).await?;
    let timeline = by_date_and_function(&records);
    Ok(Json(TimelineView {
        weekdays: timeline.weekday_totals(),
        timeline,
    }))
}

async fn skills(State(state): State<AppState>) -> Result<Json<Vec<FunctionSkills>>, ApiError> {
    let records = state.records(Projection::Skills, MSG_SKILLS).await?;
    Ok(Json(by_skill_and_function(&records)))
}

// --- chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatExchange>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    match state.chat.ask(state.relay.as_ref(), query).await {
        AskOutcome::Answered(exchange) => Ok(Json(exchange)),
        AskOutcome::Superseded { seq } => Err(ApiError::Superseded { seq }),
    }
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryView {
    pub messages: Vec<ChatMessage>,
    pub exchanges: Vec<ChatExchange>,
    pub busy: bool,
}

async fn chat_history(State(state): State<AppState>) -> Json<ChatHistoryView> {
    Json(ChatHistoryView {
        messages: state.chat.transcript(),
        exchanges: state.chat.exchanges(),
        busy: state.chat.is_busy(),
    })
}

// Suggestions are a convenience; a store outage falls back to the fixed prompts.
async fn chat_suggestions(State(state): State<AppState>) -> Json<Vec<String>> {
    match state.records(Projection::Full, MSG_CHAT).await {
        Ok(records) => Json(suggested_prompts(&records)),
        Err(_) => Json(BASE_PROMPTS.iter().map(|p| p.to_string()).collect()),
    }
}
