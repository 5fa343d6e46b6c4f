use crate::adapter::InferenceAdapter;
use crate::classes::ObesityClass;
use crate::codec::Codec;
use crate::collector::answers_from_json;
use crate::error::{InferenceError, ReportError, ValidationError};
use crate::flow::{Outcome, SubmissionFlow};
use crate::reporter::{Reporter, DEFAULT_GRID_RESOLUTION, DEFAULT_TOP_FEATURES};
use crate::schema::Field;
use crate::types::{FieldOut, HealthOut, PredictionOut};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<Codec>,
    pub adapter: Arc<InferenceAdapter>,
    pub reporter: Option<Arc<Reporter>>,
}

// ---------- Errors ----------

#[derive(Debug)]
pub enum AppError {
    Body(JsonRejection),
    Validation(ValidationError),
    Inference(InferenceError),
    Report(ReportError),
    ReporterUnavailable,
    Internal(String),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Body(rejection) => (
                rejection.status(),
                json!({ "error": rejection.body_text() }),
            ),
            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": err.to_string(), "field": err.field }),
            ),
            AppError::Inference(err) => {
                tracing::error!("{err}");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": err.to_string(),
                        "message": "Ocorreu um erro durante a predição. Por favor, verifique os dados e tente novamente."
                    }),
                )
            }
            AppError::Report(err) => {
                let status = match err {
                    ReportError::UnknownFeature(_) | ReportError::Class(_) => StatusCode::BAD_REQUEST,
                    ReportError::Dataset(_) | ReportError::Unsupported(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    ReportError::Csv(_) | ReportError::Model(_) => {
                        tracing::error!("report failed: {err}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, json!({ "error": err.to_string() }))
            }
            AppError::ReporterUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "reports need an introspectable model" }),
            ),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
            }
        };
        (status, Json(body)).into_response()
    }
}

// ---------- Router ----------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schema", get(schema))
        .route("/predict", post(predict))
        .route("/report/importance", get(importance))
        .route("/report/distribution", get(distribution))
        .route("/report/partial-dependence", get(partial_dependence))
        .with_state(state)
}

// ---------- Handlers ----------

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        reporter: state.reporter.is_some(),
        dataset: state.reporter.as_ref().is_some_and(|r| r.has_dataset()),
    })
}

async fn schema(State(state): State<AppState>) -> Json<Vec<FieldOut>> {
    Json(
        Field::ALL
            .iter()
            .map(|&field| FieldOut::describe(&state.codec, field))
            .collect(),
    )
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionOut>, AppError> {
    let Json(body) = body.map_err(AppError::Body)?;
    // null, bool, array or object answers never reach the collector
    let answers = answers_from_json(&body).map_err(AppError::Validation)?;
    let mut flow = SubmissionFlow::new(&state.codec, &state.adapter);
    match flow.submit(&answers) {
        Outcome::Predicted(result) => Ok(Json(PredictionOut::new(&result, now_ms()))),
        Outcome::Rejected(err) => Err(AppError::Validation(err)),
        Outcome::Failed(err) => Err(AppError::Inference(err)),
    }
}

// ---------- Reports ----------

fn reporter(state: &AppState) -> Result<Arc<Reporter>, AppError> {
    state.reporter.clone().ok_or(AppError::ReporterUnavailable)
}

#[derive(Debug, Deserialize)]
struct ImportanceQuery {
    top: Option<usize>,
}

async fn importance(
    State(state): State<AppState>,
    Query(q): Query<ImportanceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let top = q.top.unwrap_or(DEFAULT_TOP_FEATURES);
    Ok(Json(reporter(&state)?.feature_importance(top)?))
}

async fn distribution(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let reporter = reporter(&state)?;
    let dist = tokio::task::spawn_blocking(move || reporter.class_distribution())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(dist))
}

#[derive(Debug, Deserialize)]
struct DependenceQuery {
    feature: Option<String>,
    target: Option<i64>,
    grid: Option<usize>,
}

async fn partial_dependence(
    State(state): State<AppState>,
    Query(q): Query<DependenceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let reporter = reporter(&state)?;
    let target = match q.target {
        Some(i) => ObesityClass::from_index(i).map_err(ReportError::from)?,
        None => ObesityClass::ObesityTypeIII,
    };
    let features: Vec<String> = match q.feature {
        Some(f) => vec![f],
        None => Reporter::default_dependence_features().to_vec(),
    };
    let grid = q.grid.unwrap_or(DEFAULT_GRID_RESOLUTION);

    let curves = tokio::task::spawn_blocking(move || {
        features
            .iter()
            .map(|f| reporter.partial_dependence(f, target, grid))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(curves))
}
