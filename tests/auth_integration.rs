//! Integration tests for registration, login, refresh, and revocation

use chirpy::configuration::{get_configuration, DatabaseSettings};
use chirpy::startup::run;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let server = run(listener, connection_pool.clone(), configuration).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Register a user and return the response body.
async fn register_user(app: &TestApp, email: &str, password: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/api/users", &app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

/// Log in and return the response body (user fields + both tokens).
async fn login_user(app: &TestApp, email: &str, password: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Registration Tests ---

#[tokio::test]
async fn create_user_returns_201_and_persists_the_user() {
    let app = spawn_app().await;

    let body = register_user(&app, "saul@bettercall.com", "98105w").await;

    assert_eq!(body["email"], "saul@bettercall.com");
    assert_eq!(body["is_chirpy_red"], false);
    assert!(body.get("password").is_none());
    assert!(body.get("hashed_password").is_none());

    let row = sqlx::query("SELECT email, hashed_password FROM users WHERE email = $1")
        .bind("saul@bettercall.com")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");

    assert_eq!(row.get::<String, _>("email"), "saul@bettercall.com");
    // Stored as an argon2id PHC string, never plaintext
    let stored_hash = row.get::<String, _>("hashed_password");
    assert_ne!(stored_hash, "98105w");
    assert!(stored_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn create_user_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_emails = vec!["notanemail", "user@", "@example.com", "user@@example.com"];

    for invalid_email in invalid_emails {
        let response = client
            .post(&format!("{}/api/users", &app.address))
            .json(&json!({ "email": invalid_email, "password": "04873509" }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn create_user_returns_400_for_empty_password() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/users", &app.address))
        .json(&json!({ "email": "walt@breakingbad.com", "password": "" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn create_user_returns_409_for_duplicate_email() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/users", &app.address))
        .json(&json!({ "email": "walt@breakingbad.com", "password": "different" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_user_and_both_tokens() {
    let app = spawn_app().await;

    let created = register_user(&app, "walt@breakingbad.com", "04873509").await;
    let body = login_user(&app, "walt@breakingbad.com", "04873509").await;

    assert_eq!(body["id"], created["id"]);
    assert_eq!(body["email"], "walt@breakingbad.com");
    assert!(!body["token"].as_str().unwrap().is_empty());
    let refresh_token = body["refresh_token"].as_str().unwrap();
    assert_eq!(refresh_token.len(), 64);

    // The refresh token record is bound to the right user
    let row = sqlx::query("SELECT user_id, is_revoked FROM refresh_tokens")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch refresh token record");
    assert_eq!(
        row.get::<Uuid, _>("user_id").to_string(),
        created["id"].as_str().unwrap()
    );
    assert!(!row.get::<bool, _>("is_revoked"));
}

#[tokio::test]
async fn login_returns_401_for_unknown_email() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": "nobody@example.com", "password": "whatever" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_returns_401_for_wrong_password() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": "walt@breakingbad.com", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let client = reqwest::Client::new();

    let unknown_email: Value = client
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": "nobody@example.com", "password": "04873509" }))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse response");

    let wrong_password: Value = client
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": "walt@breakingbad.com", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse response");

    // Same message and code whichever check failed
    assert_eq!(unknown_email["message"], wrong_password["message"]);
    assert_eq!(unknown_email["code"], wrong_password["code"]);
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_returns_a_new_access_token() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_token_can_be_reused_until_revoked() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();
    let client = reqwest::Client::new();

    // No rotation: the same refresh token works repeatedly
    for _ in 0..3 {
        let response = client
            .post(&format!("{}/api/refresh", &app.address))
            .header("Authorization", format!("Bearer {}", refresh_token))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }
}

#[tokio::test]
async fn refresh_returns_401_for_unknown_token() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", "ab".repeat(32)))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_when_header_is_missing_or_malformed() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/refresh", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = client
        .post(&format!("{}/api/refresh", &app.address))
        .header("Authorization", "NotBearer sometoken")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_revoked_token() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/revoke", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let response = client
        .post(&format!("{}/api/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_expired_token() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    // Age the only stored token past its expiry
    sqlx::query("UPDATE refresh_tokens SET expires_at = NOW() - INTERVAL '1 day'")
        .execute(&app.db_pool)
        .await
        .expect("Failed to age refresh token");

    let response = reqwest::Client::new()
        .post(&format!("{}/api/refresh", &app.address))
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

// --- Revoke Tests ---

#[tokio::test]
async fn revoke_returns_204_and_is_idempotent() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client
            .post(&format!("{}/api/revoke", &app.address))
            .header("Authorization", format!("Bearer {}", refresh_token))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(204, response.status().as_u16());
    }

    // Revoking a token that was never issued is also a 204
    let response = client
        .post(&format!("{}/api/revoke", &app.address))
        .header("Authorization", format!("Bearer {}", "cd".repeat(32)))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());
}

// --- User Update Tests ---

#[tokio::test]
async fn update_user_requires_a_valid_access_token() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .put(&format!("{}/api/users", &app.address))
        .json(&json!({ "email": "new@example.com", "password": "newpass" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn update_user_changes_email_and_password() {
    let app = spawn_app().await;

    register_user(&app, "walt@breakingbad.com", "04873509").await;
    let login = login_user(&app, "walt@breakingbad.com", "04873509").await;
    let access_token = login["token"].as_str().unwrap();

    let response = reqwest::Client::new()
        .put(&format!("{}/api/users", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .json(&json!({ "email": "heisenberg@breakingbad.com", "password": "bluecrystal" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "heisenberg@breakingbad.com");

    // The new credentials work; the old ones no longer do
    login_user(&app, "heisenberg@breakingbad.com", "bluecrystal").await;
    let response = reqwest::Client::new()
        .post(&format!("{}/api/login", &app.address))
        .json(&json!({ "email": "walt@breakingbad.com", "password": "04873509" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}
