use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::ApiError,
    export,
    models::{BatchRecord, BatchRequest, GenerationOptions, Platform, Product, TONE_OPTIONS},
    orchestrator::BatchOrchestrator,
};

pub struct BatchEntry {
    pub record: BatchRecord,
    pub cancel: CancellationToken,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, BatchEntry>>>,
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: BatchOrchestrator) -> Self {
        Self { store: Arc::default(), orchestrator: Arc::new(orchestrator) }
    }

    fn record(&self, id: Uuid) -> Result<BatchRecord, ApiError> {
        self.store.read().get(&id).map(|e| e.record.clone()).ok_or(ApiError::NotFound(id))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/options", get(list_options))
        .route("/api/batches", post(start_batch))
        .route("/api/batches/:id", get(get_batch))
        .route("/api/batches/:id/cancel", post(cancel_batch))
        .route("/api/batches/:id/export/json", get(export_json))
        .route("/api/batches/:id/export/csv", get(export_csv))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Drops incomplete entries; an empty outcome is an input error and no run starts.
pub fn validate_products(products: Vec<Product>) -> Result<Vec<Product>, ApiError> {
    let submitted = products.len();
    let valid: Vec<Product> = products.into_iter().filter(Product::is_valid).collect();
    if valid.is_empty() {
        return Err(ApiError::Validation("Please fill in name, description and link for at least one product.".into()));
    }
    if valid.len() < submitted {
        tracing::info!("Ignoring {} incomplete products", submitted - valid.len());
    }
    Ok(valid)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_options() -> Json<Value> {
    let platforms: Vec<Value> = Platform::ALL.iter()
        .map(|p| json!({ "value": p, "label": p.label() }))
        .collect();
    Json(json!({
        "tones": TONE_OPTIONS,
        "platforms": platforms,
        "defaults": GenerationOptions::default(),
    }))
}

pub async fn start_batch(State(state): State<AppState>, Json(body): Json<BatchRequest>) -> Result<(StatusCode, Json<BatchRecord>), ApiError> {
    let products = validate_products(body.products)?;
    let mut options = body.options;
    options.temperature = options.clamped_temperature();
    let id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let record = BatchRecord::new(id, options.platform, products.len());

    tracing::info!("🚀 Starting batch {} with {} products", id, products.len());
    state.store.write().insert(id, BatchEntry { record: record.clone(), cancel: cancel.clone() });
    spawn_run(state, id, products, options, cancel);

    Ok((StatusCode::ACCEPTED, Json(record)))
}

fn spawn_run(state: AppState, id: Uuid, products: Vec<Product>, options: GenerationOptions, cancel: CancellationToken) {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = state.orchestrator.clone();
        // The sender lives in the run task, so the loop below ends even if that task panics.
        let run = tokio::spawn(async move { orchestrator.run(&products, &options, &cancel, tx).await });

        while let Some(event) = rx.recv().await {
            if let Some(entry) = state.store.write().get_mut(&id) {
                entry.record.apply(event);
            }
        }
        let outcome = run.await;

        let mut store = state.store.write();
        let Some(entry) = store.get_mut(&id) else { return };
        match outcome {
            Ok(report) => {
                entry.record.finish(report);
                tracing::info!("✅ Batch {} finished as {:?}", id, entry.record.state);
            }
            Err(e) => {
                tracing::error!("❌ Batch {} run task failed: {}", id, e);
                entry.record.abort(format!("The batch stopped unexpectedly: {}", e));
            }
        }
    });
}

pub async fn get_batch(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<BatchRecord>, ApiError> {
    state.record(id).map(Json)
}

pub async fn cancel_batch(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<(StatusCode, Json<BatchRecord>), ApiError> {
    let guard = state.store.read();
    let entry = guard.get(&id).ok_or(ApiError::NotFound(id))?;
    if !entry.cancel.is_cancelled() {
        tracing::info!("⏹️ Cancellation requested for batch {}", id);
        entry.cancel.cancel();
    }
    Ok((StatusCode::ACCEPTED, Json(entry.record.clone())))
}

pub async fn export_json(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let record = state.record(id)?;
    let body = export::to_json(&record.results).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"viral_content.json\""),
        ],
        body,
    ))
}

pub async fn export_csv(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let record = state.record(id)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"viral_content.csv\""),
        ],
        export::to_csv(&record.results),
    ))
}
