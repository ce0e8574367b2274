//! # API REST
//!
//! REST API for DXR diagnosis case records.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Mapping core error kinds onto HTTP status codes
//!
//! Uses `api-shared` for wire types. The core is synchronous, so every store call runs on the
//! blocking thread pool.

#![warn(rust_2018_idioms)]

pub mod error;

use api_shared::{
    CaseIdsRes, CaseStatusDto, CreatePatientReq, CreatePatientRes, DiagnosisEntryDto, ErrorDetail,
    ErrorRes, HealthRes, HealthService, PatientRes, RegisterDoctorReq, RegisterDoctorRes,
    SubmitDiagnosisReq, SubmitDiagnosisRes, TimelineRes,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dxr_core::{CaseId, DiagnosisService, PatientId, RecordError, RecordResult};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: DiagnosisService,
}

impl AppState {
    pub fn new(service: DiagnosisService) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_patient,
        get_patient,
        register_doctor,
        list_case_ids,
        case_timeline,
        submit_diagnosis,
    ),
    components(schemas(
        HealthRes,
        CreatePatientReq,
        CreatePatientRes,
        PatientRes,
        RegisterDoctorReq,
        RegisterDoctorRes,
        CaseIdsRes,
        DiagnosisEntryDto,
        TimelineRes,
        SubmitDiagnosisReq,
        SubmitDiagnosisRes,
        CaseStatusDto,
        ErrorDetail,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", post(create_patient))
        .route("/patients/:patient_id", get(get_patient))
        .route("/doctors", post(register_doctor))
        .route("/patients/:patient_id/case-ids", get(list_case_ids))
        .route("/patients/:patient_id/diagnoses/:case_id", get(case_timeline))
        .route("/diagnoses", post(submit_diagnosis))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> RecordResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered", body = CreatePatientRes),
        (status = 400, description = "Missing or out-of-range attributes", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a patient. All five attributes are required.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatientReq>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePatientRes>), ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();
    let patient = run_blocking(move || service.create_patient(req.into())).await?;
    Ok((StatusCode::CREATED, Json(CreatePatientRes::from(&patient))))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}",
    params(
        ("patient_id" = String, Path, description = "Canonical patient identifier")
    ),
    responses(
        (status = 200, description = "Patient record", body = PatientRes),
        (status = 400, description = "Malformed patient id", body = ErrorRes),
        (status = 404, description = "Patient not registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = state.service.clone();
    let patient = run_blocking(move || service.patient(&patient_id)).await?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    post,
    path = "/doctors",
    request_body = RegisterDoctorReq,
    responses(
        (status = 201, description = "Doctor registered", body = RegisterDoctorRes),
        (status = 400, description = "Missing name", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn register_doctor(
    State(state): State<AppState>,
    payload: Result<Json<RegisterDoctorReq>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterDoctorRes>), ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();
    let doctor = run_blocking(move || service.register_doctor(req.into())).await?;
    Ok((StatusCode::CREATED, Json(RegisterDoctorRes::from(&doctor))))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/case-ids",
    params(
        ("patient_id" = String, Path, description = "Canonical patient identifier")
    ),
    responses(
        (status = 200, description = "Distinct case ids, alphabetical", body = CaseIdsRes),
        (status = 400, description = "Malformed patient id", body = ErrorRes),
        (status = 404, description = "Patient not registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Summary view: the case identifiers a patient has entries under.
#[axum::debug_handler]
async fn list_case_ids(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<CaseIdsRes>, ApiError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let service = state.service.clone();
    let lookup_id = patient_id.clone();
    let case_ids = run_blocking(move || service.list_case_ids(&lookup_id)).await?;
    Ok(Json(CaseIdsRes::new(&patient_id, &case_ids)))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/diagnoses/{case_id}",
    params(
        ("patient_id" = String, Path, description = "Canonical patient identifier"),
        ("case_id" = String, Path, description = "Free-form case identifier")
    ),
    responses(
        (status = 200, description = "Entries of the case, oldest first", body = TimelineRes),
        (status = 400, description = "Malformed identifier", body = ErrorRes),
        (status = 404, description = "No entries under this case; a submission will open it", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Timeline view of one case.
#[axum::debug_handler]
async fn case_timeline(
    State(state): State<AppState>,
    Path((patient_id, case_id)): Path<(String, String)>,
) -> Result<Json<TimelineRes>, ApiError> {
    let patient_id = PatientId::parse(&patient_id)?;
    let case_id = CaseId::new(&case_id).map_err(RecordError::from)?;
    let service = state.service.clone();
    let timeline = run_blocking(move || {
        service
            .resolve_timeline(&patient_id, &case_id)?
            .found_or_err(&patient_id, &case_id)
    })
    .await?;
    Ok(Json(TimelineRes::from(&timeline)))
}

#[utoipa::path(
    post,
    path = "/diagnoses",
    request_body = SubmitDiagnosisReq,
    responses(
        (status = 201, description = "Entry recorded", body = SubmitDiagnosisRes),
        (status = 400, description = "Missing fields or malformed identifiers", body = ErrorRes),
        (status = 422, description = "Unknown patient or doctor", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Submit a diagnosis entry, opening or extending its case.
#[axum::debug_handler]
async fn submit_diagnosis(
    State(state): State<AppState>,
    payload: Result<Json<SubmitDiagnosisReq>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitDiagnosisRes>), ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();
    let outcome = run_blocking(move || service.submit(req.into())).await?;
    Ok((StatusCode::CREATED, Json(SubmitDiagnosisRes::from(&outcome))))
}
