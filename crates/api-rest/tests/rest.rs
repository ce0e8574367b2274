use api_rest::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use dxr_core::store::MemoryStore;
use dxr_core::{CoreConfig, DiagnosisService, NonEmptyText, StoreBackend};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn memory_app() -> Router {
    router(AppState::new(DiagnosisService::new(Arc::new(MemoryStore::new()))))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn seed(app: &Router) -> (String, String) {
    let (status, patient) = send(
        app,
        post_json(
            "/patients",
            json!({
                "name": "John Snow",
                "age": 45,
                "weight_kg": 80.0,
                "height_cm": 180.0,
                "gender": "male"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, doctor) = send(
        app,
        post_json("/doctors", json!({ "name": "Dr. Bell", "specialty": "GP" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        patient["patient_id"].as_str().unwrap().to_string(),
        doctor["doctor_id"].as_str().unwrap().to_string(),
    )
}

fn diagnosis(patient_id: &str, doctor_id: &str, case_id: &str, symptoms: &str) -> Value {
    json!({
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "case_id": case_id,
        "symptoms": symptoms,
        "clinical_assessment": "under review"
    })
}

#[tokio::test]
async fn health_is_ok() {
    let app = memory_app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn submit_then_read_timeline() {
    let app = memory_app();
    let (patient_id, doctor_id) = seed(&app).await;

    let (status, first) = send(
        &app,
        post_json("/diagnoses", diagnosis(&patient_id, &doctor_id, "DX-1", "fever")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["case_status"], json!("opened"));
    assert_eq!(first["prior_entries"], json!(0));

    let (status, second) = send(
        &app,
        post_json("/diagnoses", diagnosis(&patient_id, &doctor_id, "DX-1", "recovering")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["case_status"], json!("extended"));
    assert_eq!(second["prior_entries"], json!(1));

    let (status, timeline) = send(
        &app,
        get(&format!("/patients/{patient_id}/diagnoses/DX-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = timeline["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["symptoms"], json!("fever"));
    assert_eq!(entries[1]["symptoms"], json!("recovering"));
    assert!(entries[1]["created_at"].as_str() > entries[0]["created_at"].as_str());
}

#[tokio::test]
async fn case_ids_are_distinct_and_sorted() {
    let app = memory_app();
    let (patient_id, doctor_id) = seed(&app).await;

    let (status, body) = send(&app, get(&format!("/patients/{patient_id}/case-ids"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["case_ids"], json!([]));

    for case in ["DX-2", "DX-1", "DX-2"] {
        let (status, _) = send(
            &app,
            post_json("/diagnoses", diagnosis(&patient_id, &doctor_id, case, "cough")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, get(&format!("/patients/{patient_id}/case-ids"))).await;
    assert_eq!(body["case_ids"], json!(["DX-1", "DX-2"]));
}

#[tokio::test]
async fn unknown_case_is_404_with_hint() {
    let app = memory_app();
    let (patient_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        get(&format!("/patients/{patient_id}/diagnoses/DX-UNKNOWN")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("open a new case"));
}

#[tokio::test]
async fn missing_fields_are_listed() {
    let app = memory_app();
    let (patient_id, doctor_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/diagnoses",
            json!({ "patient_id": patient_id, "doctor_id": doctor_id, "case_id": "DX-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation"));
    assert_eq!(
        body["error"]["fields"],
        json!(["symptoms", "clinical_assessment"])
    );

    let (_, body) = send(&app, get(&format!("/patients/{patient_id}/case-ids"))).await;
    assert_eq!(body["case_ids"], json!([]));
}

#[tokio::test]
async fn unknown_doctor_is_422() {
    let app = memory_app();
    let (patient_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/diagnoses",
            diagnosis(&patient_id, "0123456789abcdef0123456789abcdef", "DX-1", "fever"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("reference"));
}

#[tokio::test]
async fn malformed_patient_id_is_400_and_unknown_patient_is_404() {
    let app = memory_app();

    let (status, _) = send(&app, get("/patients/not-a-uuid/case-ids")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        get("/patients/0123456789abcdef0123456789abcdef/case-ids"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = memory_app();
    let req = Request::builder()
        .method("POST")
        .uri("/diagnoses")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation"));
}

#[tokio::test]
async fn incomplete_patient_is_rejected() {
    let app = memory_app();
    let (status, body) = send(
        &app,
        post_json("/patients", json!({ "name": "Ada", "age": 36 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["fields"],
        json!(["weight_kg", "height_cm", "gender"])
    );
}

#[tokio::test]
async fn file_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let cfg = Arc::new(
        CoreConfig::new(
            temp.path().to_path_buf(),
            NonEmptyText::new("dxr.test.1").unwrap(),
            StoreBackend::File,
        )
        .unwrap(),
    );
    let app = router(AppState::new(DiagnosisService::from_config(cfg).unwrap()));
    let (patient_id, doctor_id) = seed(&app).await;

    let (status, _) = send(
        &app,
        post_json("/diagnoses", diagnosis(&patient_id, &doctor_id, "DX-1", "fever")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, timeline) = send(
        &app,
        get(&format!("/patients/{patient_id}/diagnoses/DX-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline["entries"][0]["sequence"], json!(1));
}

#[tokio::test]
async fn registered_patient_can_be_read_back() {
    let app = memory_app();
    let (patient_id, _) = seed(&app).await;

    let (status, body) = send(&app, get(&format!("/patients/{patient_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_id"], json!(patient_id));
    assert_eq!(body["name"], json!("John Snow"));
    assert_eq!(body["age"], json!(45));
    assert_eq!(body["gender"], json!("male"));

    let (status, body) = send(
        &app,
        get("/patients/0123456789abcdef0123456789abcdef"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn case_id_with_line_break_round_trips_through_the_file_store() {
    let temp = TempDir::new().unwrap();
    let cfg = Arc::new(
        CoreConfig::new(
            temp.path().to_path_buf(),
            NonEmptyText::new("dxr.test.1").unwrap(),
            StoreBackend::File,
        )
        .unwrap(),
    );
    let app = router(AppState::new(DiagnosisService::from_config(cfg).unwrap()));
    let (patient_id, doctor_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        post_json("/diagnoses", diagnosis(&patient_id, &doctor_id, "DX\n1", "fever")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entry"]["case_id"], json!("DX\n1"));

    let (status, body) = send(&app, get(&format!("/patients/{patient_id}/case-ids"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["case_ids"], json!(["DX\n1"]));
}
