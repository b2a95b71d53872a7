#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jgm_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use jgm_server::config::{DatabaseConfig, LoggingConfig, ServerConfig, Settings};
use jgm_server::{app, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET_KEY: &str = "integration-test-secret";

/// A migrated on-disk database plus the router serving it. The temp
/// directory lives as long as the harness.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    _dir: tempfile::TempDir,
}

pub fn test_settings(database_url: &str) -> Settings {
    Settings {
        db_user: "jgm".to_string(),
        db_password: "jgm".to_string(),
        db_name: "justgo".to_string(),
        database_url: database_url.to_string(),
        secret_key: SECRET_KEY.to_string(),
        environment: "dev".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        logging: LoggingConfig::default(),
    }
}

pub fn test_app_with_pool_size(pool_max_size: u32) -> TestApp {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("jgm.db").display());
    let pool = create_pool(
        &url,
        DbRuntimeSettings {
            busy_timeout_ms: 1_000,
            pool_max_size,
            connection_timeout_ms: 200,
        },
    )
    .expect("failed to create pool");
    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
    }

    let router = app(AppState {
        pool: pool.clone(),
        settings: Arc::new(test_settings(&url)),
    });

    TestApp {
        router,
        pool,
        _dir: dir,
    }
}

pub fn test_app() -> TestApp {
    test_app_with_pool_size(4)
}

impl TestApp {
    /// Sends a request and returns the status and the JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_with_headers(method, uri, token, &[], body).await
    }

    /// Like [`TestApp::send`], with extra request headers.
    pub async fn send_with_headers(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Logs in as `user_id` and returns the access token.
    pub async fn login(&self, user_id: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "userId": user_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}
