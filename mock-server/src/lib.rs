use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: u64,
    pub name: String,
    pub contact: Option<Contact>,
}

/// Body accepted by `POST /patients` and `PUT /patients/{id}`. Any `id`
/// sent by the client is ignored; the server owns identifiers.
#[derive(Deserialize)]
pub struct PatientInput {
    pub name: String,
    #[serde(default)]
    pub contact: Option<Contact>,
}

#[derive(Deserialize)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub contact: Option<Contact>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoReceipt {
    pub patient_id: u64,
    pub bytes: usize,
    pub content_type: String,
}

#[derive(Debug)]
pub struct Store {
    next_id: u64,
    patients: BTreeMap<u64, Patient>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            next_id: 1,
            patients: BTreeMap::new(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/{id}",
            get(get_patient)
                .put(replace_patient)
                .patch(patch_patient)
                .delete(delete_patient),
        )
        .route("/patients/{id}/photo", put(upload_photo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_patients(State(db): State<Db>) -> Json<Vec<Patient>> {
    let store = db.read().await;
    Json(store.patients.values().cloned().collect())
}

async fn create_patient(
    State(db): State<Db>,
    Json(input): Json<PatientInput>,
) -> (StatusCode, Json<Patient>) {
    let mut store = db.write().await;
    let patient = Patient {
        id: store.next_id,
        name: input.name,
        contact: input.contact,
    };
    store.next_id += 1;
    store.patients.insert(patient.id, patient.clone());
    tracing::debug!(id = patient.id, "patient created");
    (StatusCode::CREATED, Json(patient))
}

async fn get_patient(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Patient>, StatusCode> {
    let store = db.read().await;
    store.patients.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_patient(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, StatusCode> {
    let mut store = db.write().await;
    let patient = store.patients.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    patient.name = input.name;
    patient.contact = input.contact;
    Ok(Json(patient.clone()))
}

async fn patch_patient(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PatientPatch>,
) -> Result<Json<Patient>, StatusCode> {
    let mut store = db.write().await;
    let patient = store.patients.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        patient.name = name;
    }
    if let Some(contact) = input.contact {
        patient.contact = Some(contact);
    }
    Ok(Json(patient.clone()))
}

async fn delete_patient(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Patient>, StatusCode> {
    let mut store = db.write().await;
    store.patients.remove(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn upload_photo(
    State(db): State<Db>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PhotoReceipt>, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type != "application/octet-stream" {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
    if !db.read().await.patients.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(PhotoReceipt {
        patient_id: id,
        bytes: body.len(),
        content_type,
    }))
}
