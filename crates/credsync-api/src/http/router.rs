//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, request tracing, and
//! credential injection on the routes that consume decrypted credentials.

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::middleware::inject_credentials;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that read the per-request credential context.
    let injected = Router::new()
        .route(
            "/credentials/configured",
            get(handlers::credential::configured_credentials),
        )
        .route_layer(from_fn_with_state(state.clone(), inject_credentials));

    let api_routes = Router::new()
        // Credentials
        .route("/credentials", get(handlers::credential::list_credentials))
        .route(
            "/credentials/{slug}",
            post(handlers::credential::store_credential)
                .delete(handlers::credential::revoke_credential),
        )
        .route(
            "/credentials/{slug}/rotate",
            post(handlers::credential::rotate_credential),
        )
        .route(
            "/credentials/{slug}/history",
            get(handlers::credential::credential_history),
        )
        .merge(injected)
        // Sync scheduler
        .route("/sync/status", get(handlers::sync::sync_status))
        .route("/sync/jobs", get(handlers::sync::list_jobs))
        .route("/sync/jobs/{name}", get(handlers::sync::get_job))
        .route("/sync/jobs/{name}/enable", post(handlers::sync::enable_job))
        .route("/sync/jobs/{name}/start", post(handlers::sync::enable_job))
        .route("/sync/jobs/{name}/disable", post(handlers::sync::disable_job))
        .route("/sync/jobs/{name}/stop", post(handlers::sync::disable_job))
        .route("/sync/jobs/{name}/trigger", post(handlers::sync::trigger_job));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness probe (no tenant required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use credsync_types::credential::{CredentialPayload, CredentialType};

    use crate::jobs::register_catalogue;
    use crate::state::tests::test_state;

    struct TestApp {
        base: String,
        state: AppState,
        client: reqwest::Client,
        dir: tempfile::TempDir,
    }

    impl TestApp {
        async fn spawn() -> Self {
            let (state, dir) = test_state().await;
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let router = build_router(state.clone());
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            Self {
                base: format!("http://{addr}"),
                state,
                client: reqwest::Client::new(),
                dir,
            }
        }

        fn get(&self, path: &str, tenant: Option<&str>) -> reqwest::RequestBuilder {
            self.with_tenant(self.client.get(format!("{}{path}", self.base)), tenant)
        }

        fn post(&self, path: &str, tenant: Option<&str>) -> reqwest::RequestBuilder {
            self.with_tenant(self.client.post(format!("{}{path}", self.base)), tenant)
        }

        fn delete(&self, path: &str, tenant: Option<&str>) -> reqwest::RequestBuilder {
            self.with_tenant(self.client.delete(format!("{}{path}", self.base)), tenant)
        }

        fn with_tenant(
            &self,
            req: reqwest::RequestBuilder,
            tenant: Option<&str>,
        ) -> reqwest::RequestBuilder {
            match tenant {
                Some(t) => req.header("X-Tenant-Id", t).header("X-User-Id", "u1"),
                None => req,
            }
        }
    }

    fn smtp_body() -> Value {
        json!({
            "host": "smtp.example.com",
            "port": 587,
            "username": "u",
            "password": "p-secret-value",
            "from_name": "N",
            "from_email": "n@x",
            "tls": true,
            "description": "outbound mail"
        })
    }

    async fn body(resp: reqwest::Response) -> Value {
        resp.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_tenant() {
        let app = TestApp::spawn().await;
        let resp = app.get("/health", None).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_tenant_is_unauthorized() {
        let app = TestApp::spawn().await;
        let resp = app.get("/api/v1/credentials", None).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(resp).await["errors"][0]["code"], "MISSING_TENANT");
    }

    #[tokio::test]
    async fn test_store_then_list_never_returns_secrets() {
        let app = TestApp::spawn().await;
        let resp = app
            .post("/api/v1/credentials/email-smtp", Some("t1"))
            .json(&smtp_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored = body(resp).await;
        assert_eq!(stored["data"]["credential_type"], "EMAIL_SMTP");
        assert_eq!(stored["data"]["description"], "outbound mail");

        let resp = app.get("/api/v1/credentials", Some("t1")).send().await.unwrap();
        let text = resp.text().await.unwrap();
        assert!(text.contains("EMAIL_SMTP"));
        assert!(!text.contains("p-secret-value"));
        assert!(!text.contains("encrypted_value"));

        let other: Value = app
            .get("/api/v1/credentials", Some("t2"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(other["data"], json!([]));
    }

    #[tokio::test]
    async fn test_rotate_and_idempotent_revoke() {
        let app = TestApp::spawn().await;
        app.post("/api/v1/credentials/razorpay", Some("t1"))
            .json(&json!({"key_id": "k1", "key_secret": "s1"}))
            .send()
            .await
            .unwrap();

        let resp = app
            .post("/api/v1/credentials/razorpay/rotate", Some("t1"))
            .json(&json!({"key_id": "k2", "key_secret": "s2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body(resp).await["data"]["last_rotated_at"].is_string());

        let history = body(
            app.get("/api/v1/credentials/razorpay/history", Some("t1"))
                .send()
                .await
                .unwrap(),
        )
        .await;
        let versions = history["data"].as_array().unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(
            versions.iter().filter(|v| v["is_active"] == true).count(),
            1
        );

        for expected in [true, false] {
            let resp = app
                .delete("/api/v1/credentials/razorpay", Some("t1"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(body(resp).await["data"]["revoked"], expected);
        }
    }

    #[tokio::test]
    async fn test_store_validation_errors() {
        let app = TestApp::spawn().await;

        let resp = app
            .post("/api/v1/credentials/carrier-pigeon", Some("t1"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(resp).await["errors"][0]["code"], "UNKNOWN_CREDENTIAL_TYPE");

        let resp = app
            .post("/api/v1/credentials/razorpay", Some("t1"))
            .json(&json!({"key_id": "k1", "key_secret": "s1", "extra": 1}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(resp).await["errors"][0]["code"], "VALIDATION_ERROR");

        let resp = app
            .post("/api/v1/credentials/razorpay", Some("t1"))
            .json(&json!({"key_id": "k1", "key_secret": "s".repeat(5000)}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body(resp).await["errors"][0]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_past_expiry_keeps_working_credential() {
        let app = TestApp::spawn().await;
        app.post("/api/v1/credentials/razorpay", Some("t1"))
            .json(&json!({"key_id": "k1", "key_secret": "s1"}))
            .send()
            .await
            .unwrap();

        for path in ["/api/v1/credentials/razorpay", "/api/v1/credentials/razorpay/rotate"] {
            let resp = app
                .post(path, Some("t1"))
                .json(&json!({
                    "key_id": "k2",
                    "key_secret": "s2",
                    "expires_at": "2000-01-01T00:00:00Z"
                }))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body(resp).await["errors"][0]["code"], "INVALID_EXPIRY");
        }

        let current = app
            .state
            .vault
            .get("t1", CredentialType::Razorpay)
            .await
            .unwrap();
        let CredentialPayload::Razorpay(current) = current else {
            panic!("expected razorpay payload");
        };
        assert_eq!(current.key_id, "k1");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let app = TestApp::spawn().await;

        let resp = app
            .post("/api/v1/credentials/razorpay", Some("t1"))
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(resp).await["errors"][0]["code"], "VALIDATION_ERROR");

        let resp = app
            .post("/api/v1/credentials/razorpay/rotate", Some("t1"))
            .body(r#"{"key_id": "k1", "key_secret": "s1"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = body(resp).await;
        assert_eq!(err["errors"][0]["code"], "VALIDATION_ERROR");
        assert!(err["data"].is_null());
    }

    #[tokio::test]
    async fn test_configured_reports_injected_types() {
        let app = TestApp::spawn().await;
        app.post("/api/v1/credentials/email-smtp", Some("t1"))
            .json(&smtp_body())
            .send()
            .await
            .unwrap();

        let resp = app
            .get("/api/v1/credentials/configured", Some("t1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let configured = body(resp).await;
        assert_eq!(configured["data"]["configured"], json!(["EMAIL_SMTP"]));
        let missing = configured["data"]["missing"].as_array().unwrap();
        assert!(missing.contains(&json!("AWS_S3")));
        assert_eq!(missing.len(), 9);
    }

    #[tokio::test]
    async fn test_configured_fails_loudly_on_tampering() {
        let app = TestApp::spawn().await;
        app.post("/api/v1/credentials/email-smtp", Some("t1"))
            .json(&smtp_body())
            .send()
            .await
            .unwrap();

        let url = format!("sqlite://{}", app.dir.path().join("credsync.db").display());
        let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
        sqlx::query("UPDATE tenant_credentials SET encrypted_value = 'AAAA' || substr(encrypted_value, 5)")
            .execute(&pool)
            .await
            .unwrap();

        let resp = app
            .get("/api/v1/credentials/configured", Some("t1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = resp.text().await.unwrap();
        assert!(text.contains("CREDENTIAL_TAMPERED"));
        assert!(!text.contains("p-secret-value"));
    }

    #[tokio::test]
    async fn test_sync_job_endpoints() {
        let app = TestApp::spawn().await;
        register_catalogue(
            &app.state.scheduler,
            app.state.vault.clone(),
            &app.state.config.scheduler,
        )
        .await
        .unwrap();

        let status = body(app.get("/api/v1/sync/status", None).send().await.unwrap()).await;
        assert_eq!(status["data"]["totals"]["total_jobs"], 5);
        assert_eq!(status["data"]["started"], false);

        let jobs = body(app.get("/api/v1/sync/jobs", None).send().await.unwrap()).await;
        assert_eq!(jobs["data"].as_array().unwrap().len(), 5);

        let resp = app
            .post("/api/v1/sync/jobs/calculate-roi/disable", None)
            .send()
            .await
            .unwrap();
        let job = body(resp).await;
        assert_eq!(job["data"]["enabled"], false);
        assert_eq!(job["data"]["status"], "disabled");

        let job = body(
            app.post("/api/v1/sync/jobs/calculate-roi/start", None)
                .send()
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(job["data"]["enabled"], true);

        let resp = app
            .post("/api/v1/sync/jobs/calculate-roi/trigger", None)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.get("/api/v1/sync/jobs/no-such-job", None).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(resp).await["errors"][0]["code"], "JOB_NOT_FOUND");
    }
}
