//! Test utilities for integration testing

use axum_test::TestServer;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    Application,
    config::Config,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserDBResponse},
};

pub fn create_test_config() -> Config {
    Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        admin_email: "admin@example.com".to_string(),
        admin_password: Some("admin-password".to_string()),
        ..Default::default()
    }
}

/// Full application over the given pool, behind an in-process test server.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");

    TestServer::new(app.router()).expect("Failed to create test server")
}

/// Seed a user directly through the repository layer.
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str, admin: bool) -> UserDBResponse {
    let password_hash = crate::auth::password::hash_string(password).expect("Failed to hash password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut user_repo = Users::new(&mut conn);
    user_repo
        .create(&UserCreateDBRequest {
            company: "AIT".to_string(),
            email: email.to_string(),
            password_hash,
            admin,
        })
        .await
        .expect("Failed to create test user")
}

/// Log in over the wire and return the bearer token.
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({"email": email, "password": password}))
        .await;
    response.assert_status_ok();

    response.json::<serde_json::Value>()["token"]
        .as_str()
        .expect("token missing from login response")
        .to_string()
}
