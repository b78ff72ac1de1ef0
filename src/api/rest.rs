//! REST API - Patient CRUD endpoints

use std::sync::Arc;
use axum::{
    Router,
    routing::{delete, get, post, put},
    extract::{rejection::JsonRejection, Extension, Path, Query, Json},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::error::ApiError;
use crate::healthcare::{NewPatient, Patient, PatientUpdate};
use crate::store::{PatientStore, SortField, SortOrder};

/// Patient API state
#[derive(Clone)]
pub struct PatientApiState {
    pub store: Arc<PatientStore>,
}

impl PatientApiState {
    pub fn new(store: Arc<PatientStore>) -> Self {
        Self { store }
    }
}

pub fn routes(state: PatientApiState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/view", get(view_all))
        .route("/patient/:id", get(view_patient))
        .route("/create", post(create_patient))
        .route("/sort", get(sort_patients))
        .route("/edit/:id", put(update_patient))
        .route("/delete/:id", delete(delete_patient))
        .layer(Extension(state))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self { message: message.to_string() })
    }
}

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

/// Build a `{id: record}` object in the given order, derived fields included.
fn listing<'a>(entries: impl IntoIterator<Item = (&'a str, &'a Patient)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(id, patient)| (id.to_string(), json!(patient.view())))
        .collect()
}

async fn home() -> Json<MessageResponse> {
    MessageResponse::new("Patients Management System API")
}

async fn about() -> Json<MessageResponse> {
    MessageResponse::new("A Fully Functional API to manage patient records")
}

async fn view_all(
    Extension(state): Extension<PatientApiState>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let registry = state.store.load().await?;
    Ok(Json(listing(registry.iter())))
}

async fn view_patient(
    Extension(state): Extension<PatientApiState>,
    Path(id): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let registry = state.store.load().await?;
    let patient = registry
        .get(&id)
        .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))?;
    Ok(Json(listing([(id.as_str(), patient)])))
}

async fn create_patient(
    Extension(state): Extension<PatientApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let NewPatient { id, patient } = NewPatient::from_value(&body)?;

    state
        .store
        .modify(|registry| {
            if registry.contains(&id) {
                return Err(ApiError::Conflict("Patient already exists".to_string()));
            }
            registry.upsert(id.clone(), patient);
            Ok(())
        })
        .await?;

    info!(patient_id = %id, "Created patient");
    Ok((StatusCode::CREATED, MessageResponse::new("Patient created successfully")))
}

async fn sort_patients(
    Extension(state): Extension<PatientApiState>,
    Query(query): Query<SortQuery>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let field = query
        .sort_by
        .as_deref()
        .unwrap_or_default()
        .parse::<SortField>()
        .map_err(ApiError::BadRequest)?;
    let order: SortOrder = match query.order.as_deref() {
        Some(order) => order.parse::<SortOrder>().map_err(ApiError::BadRequest)?,
        None => SortOrder::default(),
    };

    let registry = state.store.load().await?;
    Ok(Json(listing(registry.sorted_by(field, order))))
}

async fn update_patient(
    Extension(state): Extension<PatientApiState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = payload?;
    let update = PatientUpdate::from_value(&body)?;

    state
        .store
        .modify(|registry| -> Result<(), ApiError> {
            let existing = registry
                .get(&id)
                .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))?;
            let merged = update.apply(existing)?;
            registry.upsert(id.clone(), merged);
            Ok(())
        })
        .await?;

    info!(patient_id = %id, "Updated patient");
    Ok(MessageResponse::new("Patient updated"))
}

async fn delete_patient(
    Extension(state): Extension<PatientApiState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .modify(|registry| {
            registry
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))
        })
        .await?;

    info!(patient_id = %id, "Deleted patient");
    Ok(MessageResponse::new("Patient deleted"))
}
