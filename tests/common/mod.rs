#![allow(dead_code)]

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::{path::PathBuf, sync::Arc};
use uuid::Uuid;

use storefront::config::{AdminSeed, AppConfig};
use storefront::entities::{seed_admin, setup_schema};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// A server on an ephemeral port, backed by its own database.
pub struct TestApp {
    pub addr: String,
    pub client: Client,
    pub db: Arc<DatabaseConnection>,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub async fn spawn() -> TestApp {
        TestApp::spawn_on(memory_database().await).await
    }

    /// Same app over a database file shared by a pool of several
    /// connections, so requests really run side by side.
    pub async fn spawn_pooled() -> TestApp {
        TestApp::spawn_on(file_database(8).await).await
    }

    pub async fn spawn_on(db: DatabaseConnection) -> TestApp {
        let db = Arc::new(db);
        let upload_dir = std::env::temp_dir().join(format!("storefront-test-{}", Uuid::new_v4()));

        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            bind_addr: "127.0.0.1:0".into(),
            secret: "test-secret".into(),
            token_ttl_hours: 1,
            upload_dir: upload_dir.clone(),
            file_size_limit: 64 * 1024,
            admin: Some(AdminSeed {
                username: ADMIN_USERNAME.into(),
                password: ADMIN_PASSWORD.into(),
            }),
        };
        if let Some(seed) = &config.admin {
            seed_admin(&db, seed).await.expect("Failed to seed admin");
        }

        let app = storefront::app(db.clone(), &config);
        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .expect("Failed to bind test listener");
        let addr = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestApp {
            addr,
            client: Client::new(),
            db,
            upload_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post("/api/login")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send login request");
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Registers a fresh user and returns its token.
    pub async fn user_token(&self, username: &str) -> String {
        let password = "user-password";
        let response = self
            .post("/api/register")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send register request");
        assert_eq!(response.status(), StatusCode::CREATED);
        self.login(username, password).await
    }

    pub async fn create_category(&self, token: &str, name: &str) -> Value {
        let response = self
            .post("/api/admin/categories")
            .bearer_auth(token)
            .json(&json!({ "name": name, "color": "#aa3300" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    pub async fn create_product(&self, token: &str, payload: Value) -> Value {
        let response = self
            .post("/api/admin/products")
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED, "{payload}");
        response.json().await.unwrap()
    }
}

pub async fn memory_database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    //every connection to `:memory:` is its own database
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    open(options).await
}

/// A fresh database file in the temp dir behind `max_connections` connections.
pub async fn file_database(max_connections: u32) -> DatabaseConnection {
    let path = std::env::temp_dir().join(format!("storefront-test-{}.db", Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(max_connections)
        .sqlx_logging(false);
    open(options).await
}

async fn open(options: ConnectOptions) -> DatabaseConnection {
    let db = Database::connect(options)
        .await
        .expect("Failed to open test database");
    setup_schema(&db).await.expect("Failed to create schema");
    db
}

pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("Response is not JSON")
}

pub fn ids(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .expect("expected an array")
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}
