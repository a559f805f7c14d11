use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::dataset::{DatasetError, DatasetStatus, ProgrammeStore};
use crate::engine::recommender::{
    RecommendRequest, RecommendSummary, RecommendationEntry, Recommender, RequestError,
};
use crate::engine::{classify_programme, Band};
use crate::programme::prestige::PrestigeTable;
use crate::scores::{normalize_scores, ScoreMap};

#[derive(Clone)]
struct ApiState {
    config: Config,
    store: Arc<ProgrammeStore>,
    recommender: Arc<Recommender>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

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

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<DatasetError> for ApiError {
    fn from(error: DatasetError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: error.to_string(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(error: RequestError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Deserialize)]
struct ClassifyBody {
    code: String,
    scores: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RecommendBody {
    scores: BTreeMap<String, String>,
    target_band: i8,
    count: Option<usize>,
    #[serde(default)]
    exclude_codes: Vec<String>,
    institutions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    code: String,
    institution: String,
    band: Band,
    band_label: &'static str,
    score: f64,
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    recommendations: Vec<RecommendationEntry>,
    summary: RecommendSummary,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    generation: u64,
    programmes: usize,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let store = Arc::new(ProgrammeStore::new(config.resolved_dataset_path()));
    let recommender = Arc::new(Recommender::new(
        PrestigeTable::with_defaults(),
        config.scan_limits(),
    ));
    let state = ApiState {
        config,
        store,
        recommender,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route("/v1/dataset/status", get(dataset_status))
        .route("/v1/dataset/reload", post(dataset_reload))
        .route("/v1/classify", post(classify))
        .route("/v1/recommend", post(recommend))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn dataset_status(State(state): State<ApiState>) -> Json<ApiResponse<DatasetStatus>> {
    ok(state.store.status())
}

async fn dataset_reload(State(state): State<ApiState>) -> ApiResult<ReloadResponse> {
    let snapshot = state.store.force_reload()?;
    Ok(ok(ReloadResponse {
        generation: snapshot.generation,
        programmes: snapshot.programmes.len(),
    }))
}

async fn classify(
    State(state): State<ApiState>,
    Json(body): Json<ClassifyBody>,
) -> ApiResult<ClassifyResponse> {
    let scores = parse_scores(&body.scores)?;
    let snapshot = state.store.snapshot()?;
    let programme = snapshot
        .find_programme(&body.code)
        .ok_or_else(|| ApiError::not_found(format!("unknown programme code: {}", body.code)))?;

    let result = classify_programme(&scores, programme);
    Ok(ok(ClassifyResponse {
        code: programme.code.clone(),
        institution: programme.institution.clone(),
        band: result.band,
        band_label: result.band.label(),
        score: result.score,
    }))
}

async fn recommend(
    State(state): State<ApiState>,
    Json(body): Json<RecommendBody>,
) -> ApiResult<RecommendResponse> {
    let scores = parse_scores(&body.scores)?;
    let target_band = Band::try_from(body.target_band)
        .map_err(|error| ApiError::bad_request(error.to_string()))?;
    let request = RecommendRequest {
        target_band,
        exclude_codes: body.exclude_codes,
        institutions: body.institutions,
        count: body
            .count
            .unwrap_or(state.config.engine.default_recommendations),
    };

    let snapshot = state.store.snapshot()?;
    let (recommendations, summary) = state.recommender.recommend(&scores, &snapshot, &request)?;
    Ok(ok(RecommendResponse {
        recommendations,
        summary,
    }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn parse_scores(
    raw: &BTreeMap<String, String>,
) -> std::result::Result<ScoreMap, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::bad_request("score mapping cannot be empty"));
    }
    Ok(normalize_scores(
        raw.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    ))
}
