// HTTP-level tests for the inquiry API, backed by the in-memory repository.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use passport_market::config::{AppConfig, DatabaseConfig, ExpiryConfig};
use passport_market::middleware::{JwtService, UserRole};
use passport_market::repositories::MemoryInquiryRepository;
use passport_market::{create_app, AppState};

const JWT_SECRET: &str = "inquiry-api-test-secret";

struct Party {
    organization_id: Uuid,
    token: HeaderValue,
}

struct TestApp {
    server: TestServer,
    repo: Arc<MemoryInquiryRepository>,
}

fn test_config() -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "unused".to_string(),
            database: "passport_market_test".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 1,
        },
        jwt_secret: JWT_SECRET.to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        expiry: ExpiryConfig::default(),
    }
}

fn test_app() -> TestApp {
    let repo = Arc::new(MemoryInquiryRepository::new());
    let state = AppState::new(test_config(), repo.clone());
    let server = TestServer::new(create_app(state)).unwrap();
    TestApp { server, repo }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl TestApp {
    async fn party(&self, name: &str) -> Party {
        let organization = self.repo.insert_organization(name).await;
        let user = self
            .repo
            .insert_user(&format!("{} user", name), organization.id)
            .await;
        let token = JwtService::new(JWT_SECRET)
            .generate_token(user.id, Some(organization.id), UserRole::Customer, 3600)
            .unwrap();

        Party {
            organization_id: organization.id,
            token: bearer(&token),
        }
    }

    async fn get(&self, path: &str, party: &Party) -> TestResponse {
        self.server
            .get(path)
            .add_header(header::AUTHORIZATION, party.token.clone())
            .await
    }

    async fn post(&self, path: &str, party: &Party, body: Value) -> TestResponse {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, party.token.clone())
            .json(&body)
            .await
    }

    async fn patch(&self, path: &str, party: &Party, body: Value) -> TestResponse {
        self.server
            .patch(path)
            .add_header(header::AUTHORIZATION, party.token.clone())
            .json(&body)
            .await
    }

    async fn create_inquiry(&self, buyer: &Party, supplier: &Party) -> Value {
        let response = self
            .post(
                "/api/inquiries",
                buyer,
                json!({
                    "supplierOrgId": supplier.organization_id,
                    "subject": "Refurbished patient monitors",
                    "message": "Looking for 10 units with service history",
                    "quantity": 10,
                    "targetPrice": "450.00",
                    "targetCurrency": "EUR"
                }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let response = app.server.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = test_app();

    let response = app.server.get("/api/inquiries").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/inquiries/unread-count")
        .add_header(header::AUTHORIZATION, bearer("not-a-jwt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();
    let request_id = Uuid::new_v4().to_string();

    let response = app
        .server
        .get("/api/health")
        .add_header(
            header::HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(&request_id).unwrap(),
        )
        .await;

    let echoed = response.headers().get("x-request-id").cloned();
    assert_eq!(echoed, Some(HeaderValue::from_str(&request_id).unwrap()));
}

#[tokio::test]
async fn test_create_inquiry_response_shape() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;
    let supplier = app.party("Helix Devices").await;

    let inquiry = app.create_inquiry(&buyer, &supplier).await;

    let code = inquiry["code"].as_str().unwrap();
    assert!(code.starts_with("INQ-"));
    assert!(code.ends_with("-000001"));
    assert_eq!(inquiry["status"], "PENDING");
    assert_eq!(inquiry["targetCurrency"], "EUR");
    assert_eq!(inquiry["buyerOrg"]["name"], "Northwind Clinics");
    assert_eq!(inquiry["supplierOrg"]["name"], "Helix Devices");
    assert_eq!(inquiry["messages"].as_array().unwrap().len(), 1);
    assert_eq!(inquiry["messages"][0]["messageType"], "MESSAGE");
}

#[tokio::test]
async fn test_inquiry_to_own_organization_is_rejected() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;

    let response = app
        .post(
            "/api/inquiries",
            &buyer,
            json!({ "supplierOrgId": buyer.organization_id, "subject": "Self" }),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["status"], 400);
}

#[tokio::test]
async fn test_unknown_supplier_is_not_found() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;

    let response = app
        .post(
            "/api/inquiries",
            &buyer,
            json!({ "supplierOrgId": Uuid::new_v4(), "subject": "Nobody home" }),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negotiation_flow() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;
    let supplier = app.party("Helix Devices").await;

    let inquiry = app.create_inquiry(&buyer, &supplier).await;
    let id = inquiry["id"].as_str().unwrap().to_string();

    // supplier sees the opening message as unread
    let unread = app.get("/api/inquiries/unread-count", &supplier).await;
    assert_eq!(unread.json::<Value>()["unreadCount"], 1);

    let received = app.get("/api/inquiries/received", &supplier).await;
    assert_eq!(received.json::<Value>().as_array().unwrap().len(), 1);
    let sent = app.get("/api/inquiries/sent", &supplier).await;
    assert!(sent.json::<Value>().as_array().unwrap().is_empty());

    // quote moves PENDING -> RESPONDED
    let quote = app
        .post(
            &format!("/api/inquiries/{}/messages", id),
            &supplier,
            json!({
                "messageType": "QUOTE",
                "content": "We can offer 10 units at 430 EUR each",
                "quotePrice": "430.00",
                "quoteCurrency": "eur",
                "quotedLeadTimeDays": 14
            }),
        )
        .await;
    assert_eq!(quote.status_code(), StatusCode::CREATED);
    let quote = quote.json::<Value>();
    assert_eq!(quote["messageType"], "QUOTE");
    assert_eq!(quote["quoteCurrency"], "EUR");
    assert_eq!(quote["sender"]["organizationId"], json!(supplier.organization_id));

    let viewed = app.get(&format!("/api/inquiries/{}", id), &buyer).await;
    assert_eq!(viewed.status_code(), StatusCode::OK);
    let viewed = viewed.json::<Value>();
    assert_eq!(viewed["status"], "RESPONDED");
    assert!(viewed["respondedAt"].is_string());

    // viewing marked the supplier's quote read for the buyer
    let unread = app.get("/api/inquiries/unread-count", &buyer).await;
    assert_eq!(unread.json::<Value>()["unreadCount"], 0);

    // counter offer moves to NEGOTIATING
    let counter = app
        .post(
            &format!("/api/inquiries/{}/messages", id),
            &buyer,
            json!({ "messageType": "COUNTER_OFFER", "content": "Would you do 400?" }),
        )
        .await;
    assert_eq!(counter.status_code(), StatusCode::CREATED);

    let filtered = app.get("/api/inquiries?status=NEGOTIATING", &buyer).await;
    assert_eq!(filtered.json::<Value>().as_array().unwrap().len(), 1);

    let mark = app
        .patch(&format!("/api/inquiries/{}/messages/read", id), &supplier, json!({}))
        .await;
    assert_eq!(mark.status_code(), StatusCode::OK);
    assert_eq!(mark.json::<Value>()["success"], true);

    // acceptance closes the inquiry
    let accept = app
        .post(
            &format!("/api/inquiries/{}/messages", id),
            &supplier,
            json!({ "messageType": "ACCEPTANCE", "content": "Agreed at 400" }),
        )
        .await;
    assert_eq!(accept.status_code(), StatusCode::CREATED);

    let closed = app.get(&format!("/api/inquiries/{}", id), &supplier).await.json::<Value>();
    assert_eq!(closed["status"], "ACCEPTED");
    assert!(closed["closedAt"].is_string());

    let messages = app
        .get(&format!("/api/inquiries/{}/messages", id), &buyer)
        .await
        .json::<Value>();
    let types: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["messageType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["MESSAGE", "QUOTE", "COUNTER_OFFER", "ACCEPTANCE"]);

    // closed inquiries take no further messages
    let late = app
        .post(
            &format!("/api/inquiries/{}/messages", id),
            &buyer,
            json!({ "messageType": "MESSAGE", "content": "One more thing" }),
        )
        .await;
    assert_eq!(late.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_third_organization_is_forbidden() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;
    let supplier = app.party("Helix Devices").await;
    let outsider = app.party("Unrelated Labs").await;

    let inquiry = app.create_inquiry(&buyer, &supplier).await;
    let id = inquiry["id"].as_str().unwrap();

    let response = app.get(&format!("/api/inquiries/{}", id), &outsider).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .get(&format!("/api/inquiries/{}/messages", id), &outsider)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .patch(
            &format!("/api/inquiries/{}/status", id),
            &outsider,
            json!({ "status": "REJECTED" }),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let listed = app.get("/api/inquiries", &outsider).await;
    assert!(listed.json::<Value>().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_update_follows_transition_table() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;
    let supplier = app.party("Helix Devices").await;

    let inquiry = app.create_inquiry(&buyer, &supplier).await;
    let id = inquiry["id"].as_str().unwrap();
    let path = format!("/api/inquiries/{}/status", id);

    let invalid = app
        .patch(&path, &buyer, json!({ "status": "ACCEPTED" }))
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        invalid.json::<Value>()["error"],
        "Cannot transition from PENDING to ACCEPTED"
    );

    let rejected = app
        .patch(
            &path,
            &buyer,
            json!({ "status": "REJECTED", "closeReason": "Budget withdrawn" }),
        )
        .await;
    assert_eq!(rejected.status_code(), StatusCode::OK);
    let rejected = rejected.json::<Value>();
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["closeReason"], "Budget withdrawn");

    let reopened = app
        .patch(&path, &supplier, json!({ "status": "RESPONDED" }))
        .await;
    assert_eq!(reopened.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_inquiry_is_not_found() {
    let app = test_app();
    let buyer = app.party("Northwind Clinics").await;

    let response = app
        .get(&format!("/api/inquiries/{}", Uuid::new_v4()), &buyer)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
