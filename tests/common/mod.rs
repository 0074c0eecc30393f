#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tripmate::{
    api,
    auth::{AuthConfig, AuthState, ManualClock},
    store::{MemoryStore, SharedStore},
};

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let shared: SharedStore = store.clone();
        let auth_state = AuthState::new(AuthConfig::new(), Arc::clone(&shared), clock.clone())
            .expect("default auth config is valid");
        Self {
            router: api::router(shared, auth_state),
            clock,
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(serde_json::to_vec(body)?))?)
            .await
    }

    /// Register an account and return its token.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                &serde_json::json!({"name": name, "email": email, "password": password}),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {status} {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no token in {body}"))
    }
}
