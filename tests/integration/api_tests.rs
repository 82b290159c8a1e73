//! API integration tests
//!
//! These run against a live server with a migrated database and the
//! bootstrap administrator from `.env.example`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const ADMIN_EMAIL: &str = "admin@colegio.edu";
const ADMIN_PASSWORD: &str = "admin123";

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_tool(client: &Client, token: &str, quantity: i32) -> Value {
    let response = client
        .post(format!("{}/tools", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": "Multímetro",
            "category": "Electrónica",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

async fn admin_id(client: &Client, token: &str) -> String {
    let me: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    me["id"].as_str().expect("No id").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["user"]["role"], "ADMIN");
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": ADMIN_EMAIL,
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/tools", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_tool_lookup_by_qr_code() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let tool = create_tool(&client, &token, 2).await;
    let qr = tool["qrCode"].as_str().expect("No QR code");
    assert!(qr.starts_with("TOOL-"));

    let found: Value = client
        .get(format!("{}/tools/qr/{}", BASE_URL, qr))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(found["id"], tool["id"]);
    assert_eq!(found["status"], "AVAILABLE");
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_flow() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let tool = create_tool(&client, &token, 10).await;
    let tool_id = tool["id"].as_str().expect("No id");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "toolId": tool_id, "quantity": 4 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "ACTIVE");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "toolId": tool_id, "quantity": 7 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({ "returnedQuantity": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({ "returnedQuantity": 4 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "RETURNED");

    let tool: Value = client
        .get(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(tool["availableQuantity"], 10);
}

#[tokio::test]
#[ignore]
async fn test_bulk_borrow_rolls_back() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let user_id = admin_id(&client, &token).await;
    let plenty = create_tool(&client, &token, 5).await;
    let scarce = create_tool(&client, &token, 1).await;

    let response = client
        .post(format!("{}/loans/bulk", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "userId": user_id,
            "items": [
                { "toolId": plenty["id"], "quantity": 1 },
                { "toolId": scarce["id"], "quantity": 2 }
            ]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let tool: Value = client
        .get(format!("{}/tools/{}", BASE_URL, plenty["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(tool["availableQuantity"], 5);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_last_unit() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let tool = create_tool(&client, &token, 1).await;
    let tool_id = tool["id"].as_str().expect("No id");

    let borrow = || {
        client
            .post(format!("{}/loans", BASE_URL))
            .bearer_auth(&token)
            .json(&json!({ "toolId": tool_id, "quantity": 1 }))
            .send()
    };
    let (a, b) = tokio::join!(borrow(), borrow());
    let mut statuses = vec![
        a.expect("Failed to send request").status(),
        b.expect("Failed to send request").status(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let tool: Value = client
        .get(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(tool["availableQuantity"], 0);
    assert_eq!(tool["status"], "BORROWED");
}

#[tokio::test]
#[ignore]
async fn test_concurrent_full_returns_of_one_loan() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let tool = create_tool(&client, &token, 2).await;
    let tool_id = tool["id"].as_str().expect("No id");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "toolId": tool_id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_str().expect("No id");

    let give_back = || {
        client
            .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
            .bearer_auth(&token)
            .json(&json!({ "returnedQuantity": 2 }))
            .send()
    };
    let (a, b) = tokio::join!(give_back(), give_back());
    let mut statuses = vec![
        a.expect("Failed to send request").status(),
        b.expect("Failed to send request").status(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let tool: Value = client
        .get(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(tool["availableQuantity"], 2);
}

#[tokio::test]
#[ignore]
async fn test_update_tool_trims_qr_code() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let tool = create_tool(&client, &token, 1).await;
    let tool_id = tool["id"].as_str().expect("No id");
    let code = format!("LAB-{}", &tool_id[..8]);

    let response = client
        .put(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .json(&json!({ "qrCode": format!("  {}  ", code) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let found: Value = client
        .get(format!("{}/tools/qr/{}", BASE_URL, code))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(found["id"], tool["id"]);
    assert_eq!(found["qrCode"], code.as_str());

    let response = client
        .put(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .json(&json!({ "qrCode": "   " }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_invalid_borrow_quantity_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let tool = create_tool(&client, &token, 1).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "toolId": tool["id"], "quantity": 0 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_update_settings() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .put(format!("{}/settings", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "maxLoanDays": 14 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let settings: Value = client
        .get(format!("{}/settings", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(settings["maxLoanDays"], 14);
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["totalTools"].is_number());
    assert!(body["unitsOnLoan"].is_number());
    assert!(body["overdueLoans"].is_number());
}
