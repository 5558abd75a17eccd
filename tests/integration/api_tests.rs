//! API integration tests
//!
//! These tests run against a live server with a clean database:
//! start the server locally, then run with `cargo test -- --ignored`.

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use biblios_server::models::user::UserClaims;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a bearer token the way the external identity provider would
fn mint_token(sub: i32, role: &str) -> String {
    let claims = UserClaims {
        sub,
        role: role.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .expect("Failed to mint token")
}

/// Create a member through the API and return (id, token)
async fn create_member(client: &Client, admin_token: &str) -> (i32, String) {
    let email = format!("member-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap());
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "name": "Test Member",
            "email": email,
            "role": "member"
        }))
        .send()
        .await
        .expect("Failed to create user");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse user");
    let id = body["id"].as_i64().expect("No user id") as i32;
    let token = mint_token(id, "member");
    (id, token)
}

/// Create a book with the given copy count and return its id
async fn create_book(client: &Client, admin_token: &str, quantity: i32) -> i32 {
    let isbn = format!("978{}", Utc::now().timestamp_nanos_opt().unwrap() % 10_000_000_000);
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "The Test Book",
            "author": "A. Author",
            "isbn": isbn,
            "category": "fiction",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book");
    body["id"].as_i64().expect("No book id") as i32
}

async fn get_book(client: &Client, token: &str, id: i32) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to fetch book");
    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse book")
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
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_adjusts_availability() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");

    let (member_id, member_token) = create_member(&client, &admin_token).await;
    let book_id = create_book(&client, &admin_token, 3).await;

    // Borrow
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to borrow");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["loan"]["id"].as_i64().expect("No loan id");
    assert_eq!(body["loan"]["user_id"].as_i64(), Some(member_id as i64));

    let book = get_book(&client, &member_token, book_id).await;
    assert_eq!(book["available_copies"].as_i64(), Some(2));

    // A second borrow of the same title by the same member is refused
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Return
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse return");
    assert_eq!(body["fine"], "0");

    let book = get_book(&client, &member_token, book_id).await;
    assert_eq!(book["available_copies"].as_i64(), Some(3));

    // Returning twice is refused
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_last_copy_races_yield_one_loan() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");
    let book_id = create_book(&client, &admin_token, 1).await;

    let mut members = Vec::new();
    for _ in 0..5 {
        members.push(create_member(&client, &admin_token).await);
    }

    let mut handles = Vec::new();
    for (_, token) in members {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(format!("{}/loans", BASE_URL))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "book_id": book_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }));
    }

    let mut created = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.expect("Task panicked").as_u16() {
            201 => created += 1,
            409 => refused += 1,
            other => panic!("Unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(refused, 4);

    let book = get_book(&client, &admin_token, book_id).await;
    assert_eq!(book["available_copies"].as_i64(), Some(0));
    assert_eq!(book["status"], "unavailable");
}

#[tokio::test]
#[ignore]
async fn test_payment_amount_must_match_fine() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");

    let (member_id, member_token) = create_member(&client, &admin_token).await;
    let book_id = create_book(&client, &admin_token, 1).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "book_id": book_id, "user_id": member_id }))
        .send()
        .await
        .expect("Failed to borrow");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["loan"]["id"].as_i64().expect("No loan id");

    // The loan is not overdue, so its fine is zero and any positive
    // amount is a mismatch carrying the expected amount back.
    let response = client
        .post(format!("{}/payments", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({
            "loan_id": loan_id,
            "amount": "5",
            "payment_method": "cash"
        }))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["expected_amount"], "0");

    // Another member cannot pay against this loan
    let (_, other_token) = create_member(&client, &admin_token).await;
    let response = client
        .post(format!("{}/payments", BASE_URL))
        .header("Authorization", format!("Bearer {}", other_token))
        .json(&json!({
            "loan_id": loan_id,
            "amount": "0",
            "payment_method": "cash"
        }))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_reservation_lifecycle() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");

    let (_, member_token) = create_member(&client, &admin_token).await;
    let book_id = create_book(&client, &admin_token, 2).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to reserve");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation id");
    assert_eq!(body["status"], "pending");

    // A second pending reservation for the same title is refused
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Approve, then complete
    let response = client
        .post(format!("{}/reservations/{}/approve", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to approve");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/reservations/{}/complete", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to complete");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse reservation");
    assert_eq!(body["status"], "completed");

    // Completed is terminal, cancellation is refused
    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_cancel_requires_owner_or_admin() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");

    let (_, owner_token) = create_member(&client, &admin_token).await;
    let (_, other_token) = create_member(&client, &admin_token).await;
    let book_id = create_book(&client, &admin_token, 1).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to reserve");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse reservation");
    let reservation_id = body["id"].as_i64().expect("No reservation id");

    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .post(format!("{}/reservations/{}/cancel", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .send()
        .await
        .expect("Failed to cancel");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse reservation");
    assert_eq!(body["status"], "cancelled");

    // The cancelled row no longer counts as pending, so reserving again works
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to reserve again");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_readiness_probes_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_librarian_can_manage_users() {
    let client = Client::new();
    let librarian_token = mint_token(1, "librarian");

    let email = format!("by-librarian-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap());
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", librarian_token))
        .json(&json!({ "name": "New Member", "email": email, "role": "member" }))
        .send()
        .await
        .expect("Failed to create user");
    assert_eq!(response.status(), 201);

    // Members cannot
    let admin_token = mint_token(1, "admin");
    let (_, member_token) = create_member(&client, &admin_token).await;
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .json(&json!({ "name": "Nope", "email": "nope@example.com", "role": "member" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_reports_are_staff_only() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");
    let (_, member_token) = create_member(&client, &admin_token).await;

    for path in [
        "/stats",
        "/stats/popular-books",
        "/stats/overdue",
        "/stats/categories",
        "/stats/user-activity",
    ] {
        let response = client
            .get(format!("{}{}", BASE_URL, path))
            .header("Authorization", format!("Bearer {}", member_token))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 403, "member reached {}", path);

        let response = client
            .get(format!("{}{}", BASE_URL, path))
            .header("Authorization", format!("Bearer {}", admin_token))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success(), "staff refused on {}", path);
    }
}

#[tokio::test]
#[ignore]
async fn test_category_distribution_counts_copies() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");
    create_book(&client, &admin_token, 4).await;

    let response = client
        .get(format!("{}/stats/categories", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to fetch distribution");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse distribution");
    let fiction = body
        .as_array()
        .expect("Expected an array")
        .iter()
        .find(|entry| entry["category"] == "fiction")
        .expect("fiction category missing");
    assert!(fiction["titles"].as_i64().unwrap() >= 1);
    assert!(fiction["total_copies"].as_i64().unwrap() >= 4);
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_list_all_loans() {
    let client = Client::new();
    let admin_token = mint_token(1, "admin");
    let (_, member_token) = create_member(&client, &admin_token).await;

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", member_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}
