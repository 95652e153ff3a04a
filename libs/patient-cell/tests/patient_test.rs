use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::router::patient_routes;
use patient_cell::store::memory::InMemoryPatientStore;
use patient_cell::store::supabase::SupabasePatientStore;
use patient_cell::store::PatientStore;
use patient_cell::{
    NoPatientAppointments, PatientCellState, PatientError, PatientReferences, PatientRequest, PatientService,
};
use shared_database::SupabaseClient;
use shared_models::auth::Actor;
use shared_models::pagination::PageRequest;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct HasAppointments;

#[async_trait]
impl PatientReferences for HasAppointments {
    async fn patient_is_referenced(&self, _patient_id: Uuid) -> Result<bool, PatientError> {
        Ok(true)
    }
}

fn state_with(appointments: Arc<dyn PatientReferences>) -> Arc<PatientCellState> {
    Arc::new(PatientCellState::new(
        TestConfig::default().to_arc(),
        Arc::new(InMemoryPatientStore::default()),
        appointments,
    ))
}

fn state() -> Arc<PatientCellState> {
    state_with(Arc::new(NoPatientAppointments))
}

fn request(email: &str) -> PatientRequest {
    PatientRequest {
        first_name: "Marta".to_string(),
        last_name: "Ruiz".to_string(),
        email: email.to_string(),
        phone: Some("600123456".to_string()),
    }
}

#[tokio::test]
async fn create_then_update_records_the_actor() {
    let state = state();
    let service = PatientService::new(&state);

    let patient = service
        .create_patient(request("marta@example.com"), &Actor::user("admin-1"))
        .await
        .unwrap();
    assert_eq!(patient.updated_by.as_deref(), Some("admin-1"));

    let mut changes = request("marta.ruiz@example.com");
    changes.phone = None;
    let updated = service
        .update_patient(patient.id, changes, &Actor::user(patient.id.to_string()))
        .await
        .unwrap();

    assert_eq!(updated.email, "marta.ruiz@example.com");
    assert_eq!(updated.phone, None);
    assert_eq!(updated.created_at, patient.created_at);
    assert_eq!(updated.updated_by, Some(patient.id.to_string()));
}

#[tokio::test]
async fn duplicate_email_conflicts_case_insensitively() {
    let state = state();
    let service = PatientService::new(&state);

    service.create_patient(request("marta@example.com"), &Actor::system()).await.unwrap();
    let second = service.create_patient(request("MARTA@example.com"), &Actor::system()).await;
    assert_matches!(second, Err(PatientError::DuplicateEmail(_)));

    let other = service.create_patient(request("other@example.com"), &Actor::system()).await.unwrap();
    let steal = service
        .update_patient(other.id, request("marta@example.com"), &Actor::system())
        .await;
    assert_matches!(steal, Err(PatientError::DuplicateEmail(_)));
}

#[tokio::test]
async fn patients_with_appointments_are_kept() {
    let state = state_with(Arc::new(HasAppointments));
    let service = PatientService::new(&state);
    let patient = service.create_patient(request("marta@example.com"), &Actor::system()).await.unwrap();

    assert_matches!(service.delete_patient(patient.id).await, Err(PatientError::PatientInUse));
    assert!(service.get_patient(patient.id).await.is_ok());
}

#[tokio::test]
async fn delete_then_lookup_is_not_found() {
    let state = state();
    let service = PatientService::new(&state);
    let patient = service.create_patient(request("marta@example.com"), &Actor::system()).await.unwrap();

    service.delete_patient(patient.id).await.unwrap();
    assert_matches!(service.get_patient(patient.id).await, Err(PatientError::NotFound));
    assert_matches!(service.delete_patient(patient.id).await, Err(PatientError::NotFound));
}

#[tokio::test]
async fn listing_is_ordered_by_name_and_paged() {
    let state = state();
    let service = PatientService::new(&state);
    for (last, email) in [("Zapata", "z@example.com"), ("Alonso", "a@example.com"), ("Martin", "m@example.com")] {
        let mut req = request(email);
        req.last_name = last.to_string();
        service.create_patient(req, &Actor::system()).await.unwrap();
    }

    let page = service.list_patients(PageRequest::new(0, 2)).await.unwrap();
    let names: Vec<_> = page.content.iter().map(|p| p.last_name.as_str()).collect();
    assert_eq!(names, vec!["Alonso", "Martin"]);
    assert_eq!(page.metadata.total_elements, 3);
    assert_eq!(page.metadata.total_pages, 2);
}

// ==============================================================================
// HTTP
// ==============================================================================

async fn call(state: Arc<PatientCellState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = patient_routes(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn authed(method: &str, uri: &str, user: &TestUser, body: Option<Value>) -> Request<Body> {
    let secret = TestConfig::default().jwt_secret;
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", JwtTestUtils::bearer(user, &secret))
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn patients_see_only_themselves() {
    let state = state();
    let patient = PatientService::new(&state)
        .create_patient(request("marta@example.com"), &Actor::system())
        .await
        .unwrap();

    let me = TestUser::with_id(patient.id, "patient");
    let (status, body) = call(state.clone(), authed("GET", &format!("/{}", patient.id), &me, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "marta@example.com");
    assert_eq!(body["firstName"], "Marta");

    let stranger = TestUser::patient("stranger@example.com");
    let (status, body) = call(state.clone(), authed("GET", &format!("/{}", patient.id), &stranger, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");

    let (status, _) = call(state, authed("GET", "/", &me, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_registers_and_duplicate_is_conflict() {
    let state = state();
    let admin = TestUser::admin("admin@clinic.example");
    let body = json!({ "firstName": "Marta", "lastName": "Ruiz", "email": "marta@example.com" });

    let (status, created) = call(state.clone(), authed("POST", "/", &admin, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["phone"].is_null());

    let (status, error) = call(state, authed("POST", "/", &admin, Some(body))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "BUSINESS_CONFLICT");
}

#[tokio::test]
async fn invalid_fields_are_reported_together() {
    let admin = TestUser::admin("admin@clinic.example");
    let body = json!({ "firstName": "", "lastName": "Ruiz", "email": "not-an-email" });

    let (status, error) = call(state(), authed("POST", "/", &admin, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_FAILED");
    assert!(error["fieldErrors"]["firstName"].is_string());
    assert!(error["fieldErrors"]["email"].is_string());
}

#[tokio::test]
async fn malformed_id_is_a_bad_request() {
    let admin = TestUser::admin("admin@clinic.example");
    let (status, error) = call(state(), authed("GET", "/not-a-uuid", &admin, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn supabase_listing_reads_the_exact_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("offset", "2"))
        .and(query_param("limit", "2"))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "2-2/3")
                .set_body_json(json!([{
                    "id": Uuid::new_v4(),
                    "first_name": "Marta",
                    "last_name": "Ruiz",
                    "email": "marta@example.com",
                    "phone": null,
                    "created_at": "2030-01-01T00:00:00Z",
                    "updated_at": "2030-01-01T00:00:00Z",
                    "updated_by": null
                }])),
        )
        .mount(&server)
        .await;

    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    let store = SupabasePatientStore::new(Arc::new(SupabaseClient::new(&config)));

    let page = store.list(PageRequest::new(2, 2)).await.unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.metadata.total_elements, 3);
    assert_eq!(page.metadata.current_page, 1);
}

#[tokio::test]
async fn supabase_unique_violation_is_a_duplicate_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value"))
        .mount(&server)
        .await;

    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    let store = SupabasePatientStore::new(Arc::new(SupabaseClient::new(&config)));
    let now = chrono::Utc::now();

    let result = store
        .insert(patient_cell::Patient {
            id: Uuid::new_v4(),
            first_name: "Marta".to_string(),
            last_name: "Ruiz".to_string(),
            email: "marta@example.com".to_string(),
            phone: None,
            created_at: now,
            updated_at: now,
            updated_by: None,
        })
        .await;
    assert_matches!(result, Err(PatientError::DuplicateEmail(_)));
}

#[tokio::test]
async fn supabase_email_lookup_matches_the_address_literally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("email", "ilike.m\\_ruiz\\%@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    let store = SupabasePatientStore::new(Arc::new(SupabaseClient::new(&config)));

    assert!(store.find_by_email("m_ruiz%@example.com").await.unwrap().is_none());
}
