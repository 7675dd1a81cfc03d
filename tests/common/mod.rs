//! Common test utilities for E2E tests

#![allow(dead_code)]

use linkup::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Registered test account
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestServer {
    /// Create a test server backed by a SQLite database in a temp dir
    pub async fn new() -> Self {
        Self::with_backend(config::StoreBackend::Sqlite).await
    }

    /// Create a test server with the given store backend
    pub async fn with_backend(backend: config::StoreBackend) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig {
                backend,
                path: db_path,
            },
            auth: config::AuthConfig {
                token_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                token_max_age: 3600,
            },
            graph: config::GraphConfig {
                cascade_concurrency: 4,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: config::LogFormat::Pretty,
            },
        };

        let state = AppState::new(&config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = linkup::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register an account through the API
    pub async fn register(&self, name: &str) -> TestAccount {
        let email = format!("{}@example.com", name.to_lowercase());
        let response = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": "password123",
                "dob": "1990-01-01",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "registration of {name} failed");

        let body: Value = response.json().await.unwrap();
        TestAccount {
            id: body["id"].as_str().unwrap().to_string(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// POST /api/users/{action} as `actor` against `target_id`
    pub async fn graph_request(
        &self,
        action: &str,
        actor: &TestAccount,
        target_id: &str,
    ) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/users/{action}")))
            .bearer_auth(&actor.token)
            .json(&json!({ "id": target_id }))
            .send()
            .await
            .unwrap()
    }

    pub async fn follow(&self, actor: &TestAccount, target_id: &str) -> reqwest::Response {
        self.graph_request("follow", actor, target_id).await
    }

    pub async fn unfollow(&self, actor: &TestAccount, target_id: &str) -> reqwest::Response {
        self.graph_request("unfollow", actor, target_id).await
    }

    /// GET /api/users/profile as `account`
    pub async fn profile(&self, account: &TestAccount) -> Value {
        let response = self
            .client
            .get(self.url("/api/users/profile"))
            .bearer_auth(&account.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}

/// Sorted string array from a JSON value
pub fn ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}
