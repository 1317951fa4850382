//! End-to-end tests for registration and container tracking
//!
//! Both services run in-process against memory ledgers; the compliance
//! service is a recording double.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use container_service::ContainerService;
use logistics_common::{
    ComplianceRecord, ContainerHistory, ContainerRecord, ContractService, Error, Evaluation, Ledger,
    LocalInvoker, MemoryLedger, RegistrationRecord, Result,
};
use registration_service::{create_router, RegistrationService, SagaStatus};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt; // for `oneshot`

/// Compliance double recording every record it receives
#[derive(Default)]
struct RecordingCompliance {
    records: Mutex<Vec<ComplianceRecord>>,
    fail: AtomicBool,
}

impl RecordingCompliance {
    async fn records(&self) -> Vec<ComplianceRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ContractService for RecordingCompliance {
    fn name(&self) -> &'static str {
        "compliance"
    }

    async fn init(&self, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn invoke(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        assert_eq!(function, "createUpdateComplianceRecord");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::LedgerIo("compliance ledger unavailable".to_string()));
        }

        let record: ComplianceRecord = serde_json::from_slice(&args[0])?;
        self.records.lock().await.push(record);
        Ok(Vec::new())
    }
}

struct Deployment {
    registration: Arc<RegistrationService>,
    containers: Arc<ContainerService>,
    compliance: Arc<RecordingCompliance>,
    registration_ledger: Arc<MemoryLedger>,
}

async fn deploy() -> Deployment {
    let compliance = Arc::new(RecordingCompliance::default());

    let containers = Arc::new(ContainerService::new(
        Arc::new(MemoryLedger::new()),
        Arc::new(LocalInvoker::new().with_service("compliance-cc", compliance.clone())),
    ));
    containers
        .init(br#"{"version":"1.0.0","compliancecc":"compliance-cc"}"#)
        .await
        .unwrap();

    let registration_ledger = Arc::new(MemoryLedger::new());
    let invoker = LocalInvoker::new()
        .with_service("container-cc", containers.clone())
        .with_service("compliance-cc", compliance.clone());
    let registration = Arc::new(RegistrationService::new(
        registration_ledger.clone(),
        Arc::new(invoker),
    ));
    registration
        .init(br#"{"version":"1.0.0","containercc":"container-cc","compliancecc":"compliance-cc"}"#)
        .await
        .unwrap();

    Deployment {
        registration,
        containers,
        compliance,
        registration_ledger,
    }
}

fn bl1() -> Vec<u8> {
    json!({
        "blno": "BL1",
        "containernos": "C1,C2",
        "hazmat": false,
        "maxtemperature": 10.0
    })
    .to_string()
    .into_bytes()
}

fn reading(temperature: f64) -> Vec<u8> {
    json!({ "containerno": "C1", "temperature": temperature })
        .to_string()
        .into_bytes()
}

#[tokio::test]
async fn test_shipment_lifecycle() {
    let d = deploy().await;

    d.registration.register(&bl1()).await.unwrap();

    for container in ["C1", "C2"] {
        let status = d.containers.current_status(container).await.unwrap();
        assert_eq!(status.bl_no.as_deref(), Some("BL1"));
        assert_eq!(status.transit_complete, Some(false));
    }
    let seeded = d.compliance.records().await;
    assert_eq!(seeded.len(), 1);
    assert!(seeded[0].compliance);

    let before = d.containers.history("C1").await.unwrap().len();

    let outcome = d.containers.update(&reading(15.0)).await.unwrap();
    assert!(matches!(outcome.evaluation, Evaluation::Violation(_)));
    assert_eq!(outcome.history_len, before + 1);

    let records = d.compliance.records().await;
    assert_eq!(records.len(), 2);
    let violation = &records[1];
    assert_eq!(violation.bl_no, "BL1");
    assert!(!violation.compliance);
    let alerts = &violation.asset_alerts.as_ref().unwrap()["C1"];
    let alerts: serde_json::Value = serde_json::from_str(alerts).unwrap();
    assert_eq!(alerts["tempalert"], "above");

    let status = d.containers.current_status("C1").await.unwrap();
    assert_eq!(status.temperature, Some(15.0));
    assert!(status.alerts.is_some());

    let outcome = d.containers.update(&reading(5.0)).await.unwrap();
    assert_eq!(outcome.evaluation, Evaluation::Clear);
    assert_eq!(d.compliance.records().await.len(), 2);

    let status = d.containers.current_status("C1").await.unwrap();
    assert_eq!(status.temperature, Some(5.0));
    assert_eq!(status.bl_no.as_deref(), Some("BL1"));

    let history = d.containers.history("C1").await.unwrap();
    assert_eq!(history.len(), before + 2);
    assert!(history.entries[0].contains("5"));

    // C2 untouched
    assert_eq!(d.containers.history("C2").await.unwrap().len(), before);
}

#[tokio::test]
async fn test_duplicate_registration_keeps_original() {
    let d = deploy().await;
    d.registration.register(&bl1()).await.unwrap();

    let err = d
        .registration
        .register(br#"{"blno":"BL1","containernos":"C7","hazmat":true}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));

    let stored = d.registration.registration("BL1").await.unwrap();
    assert_eq!(stored.container_nos.as_deref(), Some("C1,C2"));
    assert_eq!(stored.hazmat, Some(false));
    assert!(matches!(
        d.containers.current_status("C7").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_compliance_outage_during_registration() {
    let d = deploy().await;
    d.compliance.fail.store(true, Ordering::SeqCst);

    let err = d.registration.register(&bl1()).await.unwrap_err();
    assert!(matches!(err, Error::PartiallyApplied { .. }));

    // containers were committed, the registration was not
    assert!(d.containers.current_status("C1").await.is_ok());
    assert!(d.registration_ledger.get("BL1").await.unwrap().is_none());
    let saga = d.registration.saga_status("BL1").await.unwrap();
    assert_eq!(saga.status, SagaStatus::PartiallyApplied);
}

#[tokio::test]
async fn test_retried_registration_replaces_thresholds() {
    let d = deploy().await;
    d.compliance.fail.store(true, Ordering::SeqCst);

    let err = d.registration.register(&bl1()).await.unwrap_err();
    assert!(matches!(err, Error::PartiallyApplied { .. }));

    d.compliance.fail.store(false, Ordering::SeqCst);
    let retry = json!({
        "blno": "BL1",
        "containernos": "C1,C2",
        "hazmat": false,
        "maxtemperature": 30.0
    });
    d.registration
        .register(retry.to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(
        d.registration.registration("BL1").await.unwrap().max_temperature,
        Some(30.0)
    );

    let outcome = d.containers.update(&reading(20.0)).await.unwrap();
    assert_eq!(outcome.evaluation, Evaluation::Clear);
    assert_eq!(d.compliance.records().await.len(), 1);

    let outcome = d.containers.update(&reading(35.0)).await.unwrap();
    assert!(matches!(outcome.evaluation, Evaluation::Violation(_)));
}

#[tokio::test]
async fn test_compliance_outage_during_update_keeps_state() {
    let d = deploy().await;
    d.registration.register(&bl1()).await.unwrap();
    let before: ContainerRecord = d.containers.current_status("C1").await.unwrap();
    let history_before: ContainerHistory = d.containers.history("C1").await.unwrap();

    d.compliance.fail.store(true, Ordering::SeqCst);
    let err = d.containers.update(&reading(42.0)).await.unwrap_err();

    assert!(matches!(err, Error::DependencyInvocation { .. }));
    assert_eq!(d.containers.current_status("C1").await.unwrap(), before);
    assert_eq!(d.containers.history("C1").await.unwrap(), history_before);
}

#[tokio::test]
async fn test_container_reuse_across_shipments() {
    let d = deploy().await;
    d.registration.register(&bl1()).await.unwrap();
    d.containers.update(&reading(5.0)).await.unwrap();

    d.registration
        .register(br#"{"blno":"BL2","containernos":"C1","hazmat":true}"#)
        .await
        .unwrap();

    let status = d.containers.current_status("C1").await.unwrap();
    assert_eq!(status.bl_no.as_deref(), Some("BL2"));
    assert_eq!(status.temperature, None);
}

#[tokio::test]
async fn test_registration_without_containers_rejected() {
    let d = deploy().await;

    let err = d
        .registration
        .register(br#"{"blno":"BL1","containernos":",","hazmat":false}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(d.compliance.records().await.is_empty());
    assert!(matches!(
        d.registration.saga_status("BL1").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_records_are_not_found() {
    let d = deploy().await;

    assert!(matches!(
        d.registration.registration("BL404").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        d.containers.current_status("C404").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        d.containers.history("C404").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        d.containers.update(br#"{"containerno":"C404","temperature":1}"#).await,
        Err(Error::NotRegistered(_))
    ));
}

fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let d = deploy().await;
    let app = create_router(d.registration);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "bill-of-lading-registration");
}

#[tokio::test]
async fn test_register_over_http() {
    let d = deploy().await;
    let app = create_router(d.registration);

    let response = app
        .clone()
        .oneshot(post("/api/registerBillOfLading", bl1()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(post("/api/registerBillOfLading", bl1()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["kind"], "duplicate");

    let response = app
        .clone()
        .oneshot(post(
            "/api/getBillOfLadingRegistration",
            br#"{"blno":"BL1"}"#.to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record: RegistrationRecord =
        serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(record.bl_no.as_deref(), Some("BL1"));

    let response = app
        .oneshot(post(
            "/api/getBillOfLadingRegistration",
            br#"{"blno":"BL9"}"#.to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_error_kinds() {
    let d = deploy().await;
    let app = create_router(d.registration);

    let response = app
        .clone()
        .oneshot(post(
            "/api/registerBillOfLading",
            br#"{"blno":"BL1","hazmat":false}"#.to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["kind"], "validation");

    let response = app
        .clone()
        .oneshot(post("/api/shipIt", b"{}".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post(
            "/api/init",
            br#"{"version":"2.0.0","containercc":"a","compliancecc":"b"}"#.to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dependency_failure_status() {
    let d = deploy().await;
    d.compliance.fail.store(true, Ordering::SeqCst);
    let app = create_router(d.registration);

    let response = app
        .oneshot(post("/api/registerBillOfLading", bl1()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["kind"], "partially_applied");
}
