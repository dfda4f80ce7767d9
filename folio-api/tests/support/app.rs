#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use folio_api::{create_api_router, generate_jwt_token, ApiConfig, AppState, AuthConfig};
use folio_core::UserId;
use folio_storage::InMemoryStore;
use folio_test_utils::fixtures::{seed_into, SeededUniverse};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Full router over a shared in-memory store.
pub struct TestApp {
    pub store: InMemoryStore,
    pub auth: AuthConfig,
    router: Router,
}

impl TestApp {
    pub fn new() -> TestResult<Self> {
        let store = InMemoryStore::new();
        let auth = AuthConfig::default();
        let api_config = ApiConfig {
            rate_limit_enabled: false,
            ..ApiConfig::default()
        };
        let state = AppState::new(Arc::new(store.clone()), auth.clone(), api_config);
        let router = create_api_router(state)?;
        Ok(Self {
            store,
            auth,
            router,
        })
    }

    /// App plus one seeded universe.
    pub async fn seeded() -> TestResult<(Self, SeededUniverse)> {
        let app = Self::new()?;
        let seeded = seed_into(app.store.clone(), "Eberron").await?;
        Ok((app, seeded))
    }

    pub fn token_for(&self, user: UserId) -> TestResult<String> {
        Ok(generate_jwt_token(&self.auth, user, None)?)
    }

    /// Send a request, optionally authenticated as `user`, with an optional
    /// JSON body. Returns the status and the parsed body (`Null` if empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<UserId>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user)?));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, user: UserId) -> TestResult<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: UserId, body: Value) -> TestResult<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: UserId, body: Value) -> TestResult<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: UserId) -> TestResult<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(user), None).await
    }
}
