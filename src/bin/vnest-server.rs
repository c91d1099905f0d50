//! vnest HTTP server.
//!
//! **Words:**
//! - `GET    /api/words[?type=SUBJECT|VERB|OBJECT]`: list words
//! - `POST   /api/words`: create word
//! - `PUT    /api/words/{id}`: update word
//! - `DELETE /api/words/{id}`: delete word and its combinations
//!
//! **Combinations:**
//! - `GET    /api/combinations[?verb_id=N]`: list combinations
//! - `POST   /api/combinations`: allow one triple
//! - `POST   /api/combinations/batch`: allow a verb over subjects × objects
//! - `DELETE /api/combinations/{id}`: delete one combination
//! - `DELETE /api/combinations/by-verb/{verb_id}`: delete all for a verb
//!
//! **Suggestions:**
//! - `GET    /api/suggestions`: verb-centric exercise data
//! - `POST   /api/suggestions/validate`: check a sentence
//!
//! **Health:**
//! - `GET    /health`: server status
//!
//! Settings are read from `$VNEST_CONFIG` (default `vnest.toml`, optional).
//!
//! Build and run: `cargo run --features server --bin vnest-server`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;

use vnest_graph::api::{
    ApiResponse, BatchResponse, CombinationBatchRequest, CombinationRequest, CombinationView,
    CombinationsQuery, HealthResponse, SuggestionsQuery, ValidationRequest, WordRequest, WordView,
    WordsQuery, combination_views, status_code,
};
use vnest_graph::config::{DEFAULT_CONFIG_FILE, ENV_CONFIG, Settings};
use vnest_graph::engine::Engine;
use vnest_graph::error::{CombinationError, InputError, VnestError, WordError};
use vnest_graph::graph::CombinationId;
use vnest_graph::graph::suggest::Suggestions;
use vnest_graph::graph::validate::Validation;
use vnest_graph::word::{WordId, WordRole};

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    engine: Engine,
}

type AppState = State<Arc<ServerState>>;

// ── Errors ────────────────────────────────────────────────────────────────

/// Engine failure or malformed body, rendered as an `ApiResponse` envelope.
enum ApiError {
    Engine(VnestError),
    Malformed(String),
}

impl From<VnestError> for ApiError {
    fn from(err: VnestError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::Engine(err.into())
    }
}

impl From<CombinationError> for ApiError {
    fn from(err: CombinationError) -> Self {
        ApiError::Engine(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Engine(err) => {
                let status = StatusCode::from_u16(status_code(&err))
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                } else {
                    tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
                }
                (status, Json(ApiResponse::failure(&err))).into_response()
            }
            ApiError::Malformed(detail) => {
                let envelope = ApiResponse {
                    success: false,
                    data: Some(format!(
                        "Malformed JSON request or invalid enum value provided. Error: {detail}"
                    )),
                };
                (StatusCode::BAD_REQUEST, Json(envelope)).into_response()
            }
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn body<T: DeserializeOwned>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::Malformed(e.body_text()))
}

fn path_word(raw: u64) -> ApiResult<WordId> {
    WordId::new(raw).ok_or_else(|| ApiError::Engine(WordError::NotFound { id: raw }.into()))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): AppState) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        persistent: state.engine.is_persistent(),
    })
}

async fn list_words(
    State(state): AppState,
    Query(query): Query<WordsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<WordView>>>> {
    let words = state.engine.list_words(query.role)?;
    Ok(Json(ApiResponse::ok(words.iter().map(WordView::from).collect())))
}

async fn create_word(
    State(state): AppState,
    payload: std::result::Result<Json<WordRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<WordView>>)> {
    let (text, role) = body(payload)?.validate()?;
    let word = state.engine.create_word(&text, role)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(WordView::from(&word)))))
}

async fn update_word(
    State(state): AppState,
    Path(id): Path<u64>,
    payload: std::result::Result<Json<WordRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<WordView>>> {
    let (text, role) = body(payload)?.validate()?;
    let word = state.engine.update_word(path_word(id)?, &text, role)?;
    Ok(Json(ApiResponse::ok(WordView::from(&word))))
}

async fn delete_word(State(state): AppState, Path(id): Path<u64>) -> ApiResult<StatusCode> {
    state.engine.delete_word(path_word(id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_combinations(
    State(state): AppState,
    Query(query): Query<CombinationsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<CombinationView>>>> {
    let verb = match query.verb_id {
        Some(raw) => match WordId::new(raw) {
            Some(id) => Some(id),
            None => return Ok(Json(ApiResponse::ok(Vec::new()))),
        },
        None => None,
    };
    let combos = state.engine.list_combinations(verb)?;
    Ok(Json(ApiResponse::ok(combination_views(&state.engine, &combos)?)))
}

async fn create_combination(
    State(state): AppState,
    payload: std::result::Result<Json<CombinationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CombinationView>>)> {
    let key = body(payload)?.validate()?;
    let combo = state
        .engine
        .create_combination(key.subject, key.verb, key.object)?;
    let words = state.engine.resolve_words(&[combo.subject, combo.verb, combo.object])?;
    let view = CombinationView::new(&combo, &words, &state.engine.config().messages);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

async fn create_batch(
    State(state): AppState,
    payload: std::result::Result<Json<CombinationBatchRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BatchResponse>>)> {
    let input = body(payload)?.validate()?;
    let outcome = state
        .engine
        .create_batch(input.verb, &input.subjects, &input.objects)?;
    let views = combination_views(&state.engine, &outcome.created)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(BatchResponse::new(&outcome, views))),
    ))
}

async fn delete_combination(State(state): AppState, Path(id): Path<u64>) -> ApiResult<StatusCode> {
    let cid = CombinationId::new(id)
        .ok_or(CombinationError::CombinationNotFound { id })?;
    state.engine.delete_combination(cid)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_by_verb(
    State(state): AppState,
    Path(verb_id): Path<u64>,
) -> ApiResult<StatusCode> {
    let verb = WordId::new(verb_id)
        .ok_or(CombinationError::NotFound {
            role: WordRole::Verb,
            id: verb_id,
        })?;
    state.engine.delete_by_verb(verb)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn suggestions(
    State(state): AppState,
    Query(query): Query<SuggestionsQuery>,
) -> ApiResult<Json<ApiResponse<Suggestions>>> {
    if let Some(ref difficulty) = query.difficulty {
        tracing::debug!(%difficulty, "difficulty filter not supported, ignoring");
    }
    Ok(Json(ApiResponse::ok(state.engine.suggestions(query.limit)?)))
}

async fn validate(
    State(state): AppState,
    payload: std::result::Result<Json<ValidationRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Validation>>> {
    let key = body(payload)?.validate()?;
    let result = state.engine.validate(key.subject, key.verb, key.object)?;
    Ok(Json(ApiResponse::ok(result)))
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health.
        .route("/health", get(health))
        // Words.
        .route("/api/words", get(list_words).post(create_word))
        .route("/api/words/{id}", put(update_word).delete(delete_word))
        // Combinations.
        .route("/api/combinations", get(list_combinations).post(create_combination))
        .route("/api/combinations/batch", post(create_batch))
        .route("/api/combinations/{id}", delete(delete_combination))
        .route("/api/combinations/by-verb/{verb_id}", delete(delete_by_verb))
        // Suggestions.
        .route("/api/suggestions", get(suggestions))
        .route("/api/suggestions/validate", post(validate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var(ENV_CONFIG)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut settings = Settings::load_or_default(&config_path)?;
    settings.server.apply_env();

    let engine = Engine::new(settings.to_engine_config())?;
    let state = Arc::new(ServerState { engine });

    tracing::info!("vnest server initialized");

    let addr = settings.server.address();
    tracing::info!("vnest server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}
