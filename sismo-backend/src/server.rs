//! HTTP API: event listing, token registration and feedback.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sismo_common::{DeleteTokenRequest, EventRecord, FeedbackRequest, RegisterTokenRequest};

use crate::error::ApiError;
use crate::module::monitor::Monitor;
use crate::module::push::PushProvider;
use crate::module::store::{DeleteOutcome, FeedbackStore, TokenStore, UpsertOutcome};

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub tokens: Arc<dyn TokenStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub push: Arc<dyn PushProvider>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sismos", get(list_events))
        .route("/api/tokens", post(register_token))
        .route("/api/tokens/delete", delete(delete_token))
        .route("/api/feedback", post(submit_feedback))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Fresh scrape on every call; the notification marker is not involved.
async fn list_events(State(state): State<AppState>) -> Json<Vec<EventRecord>> {
    match state.monitor.fetch_events().await {
        Ok(events) => {
            info!("Serving {} events", events.len());
            Json(events)
        }
        Err(e) => {
            warn!("Event listing unavailable: {}", e);
            Json(Vec::new())
        }
    }
}

async fn register_token(
    State(state): State<AppState>,
    Json(req): Json<RegisterTokenRequest>,
) -> Result<StatusCode, ApiError> {
    match state.tokens.upsert(&req.token, &req.province).await? {
        UpsertOutcome::Inserted => info!("Registered token for province '{}'", req.province),
        UpsertOutcome::AlreadyExists => info!("Token already registered"),
    }
    Ok(StatusCode::OK)
}

async fn delete_token(
    State(state): State<AppState>,
    Json(req): Json<DeleteTokenRequest>,
) -> Result<StatusCode, ApiError> {
    match state.tokens.delete_by_token(&req.token).await? {
        DeleteOutcome::Deleted => {
            info!("Token deleted");
            Ok(StatusCode::OK)
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound),
    }
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<StatusCode, ApiError> {
    if !state.push.is_valid_token(&req.token) {
        return Err(ApiError::InvalidToken(req.token));
    }

    state.feedback.insert(&req.token, req.felt, req.event_context).await?;
    info!("Feedback stored (felt: {})", req.felt);
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushConfig;
    use crate::error::{FetchError, StoreError};
    use crate::module::push::dispatcher::tests::FakeProvider;
    use crate::module::push::NotificationDispatcher;
    use crate::module::region::RegionMatcher;
    use crate::module::sismo::EventSource;
    use crate::module::store::{JsonStore, SubscriberToken};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct StaticSource(Option<String>);

    #[async_trait]
    impl EventSource for StaticSource {
        async fn fetch(&self) -> Result<String, FetchError> {
            self.0.clone().ok_or(FetchError::Timeout)
        }
    }

    const PAGE: &str = "<table id=\"sismos\"><tr><th>N</th></tr>\
        <tr><td>11</td><td>01/01/2024</td><td>09:00:00</td><td>10 km</td><td>2.9</td><td>-31</td><td>-68</td><td>Mendoza</td></tr>\
        <tr><td>12</td><td>01/01/2024</td><td>10:00:00</td><td>15 km</td><td>3.9</td><td>-31</td><td>-68</td><td>30.5, San Juan</td></tr>\
        </table>";

    async fn test_app(dir: &TempDir, page: Option<&str>) -> (Router, Arc<JsonStore>) {
        let store = Arc::new(JsonStore::open(dir.path()).await.unwrap());
        let provider = Arc::new(FakeProvider::new(100));
        let monitor = Arc::new(Monitor::new(
            Arc::new(StaticSource(page.map(str::to_string))),
            RegionMatcher::new(store.clone()),
            NotificationDispatcher::new(provider.clone(), &PushConfig::default()),
        ));
        let state = AppState {
            monitor,
            tokens: store.clone(),
            feedback: store.clone(),
            push: provider,
        };
        (build_router(state), store)
    }

    /// Store whose every call fails as if the disk were gone.
    struct FailingStore;

    fn disk_gone() -> StoreError {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "data dir missing"))
    }

    #[async_trait]
    impl TokenStore for FailingStore {
        async fn find_by_region(&self, _region: &str) -> Result<Vec<String>, StoreError> {
            Err(disk_gone())
        }

        async fn find_by_token(&self, _token: &str) -> Result<Option<SubscriberToken>, StoreError> {
            Err(disk_gone())
        }

        async fn upsert(&self, _token: &str, _province: &str) -> Result<UpsertOutcome, StoreError> {
            Err(disk_gone())
        }

        async fn delete_by_token(&self, _token: &str) -> Result<DeleteOutcome, StoreError> {
            Err(disk_gone())
        }
    }

    #[async_trait]
    impl FeedbackStore for FailingStore {
        async fn insert(
            &self,
            _token: &str,
            _felt: bool,
            _event_context: serde_json::Value,
        ) -> Result<(), StoreError> {
            Err(disk_gone())
        }
    }

    fn failing_app() -> Router {
        let store = Arc::new(FailingStore);
        let provider = Arc::new(FakeProvider::new(100));
        let monitor = Arc::new(Monitor::new(
            Arc::new(StaticSource(None)),
            RegionMatcher::new(store.clone()),
            NotificationDispatcher::new(provider.clone(), &PushConfig::default()),
        ));
        build_router(AppState {
            monitor,
            tokens: store.clone(),
            feedback: store,
            push: provider,
        })
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (app, _) = test_app(&dir, None).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_list_events() {
        let dir = TempDir::new().unwrap();
        let (app, _) = test_app(&dir, Some(PAGE)).await;

        let response = app
            .oneshot(Request::builder().uri("/api/sismos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let events: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 2);
        assert_eq!(events[0]["numero"], "11");
        assert_eq!(events[1]["ubicacion"], "30.5, San Juan");
    }

    #[tokio::test]
    async fn test_list_events_when_source_down() {
        let dir = TempDir::new().unwrap();
        let (app, _) = test_app(&dir, None).await;

        let response = app
            .oneshot(Request::builder().uri("/api/sismos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_register_token_twice() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, None).await;
        let body = json!({"token": "ExpoPushToken[a]", "province": "Salta"});

        let response = app.clone().oneshot(json_request(Method::POST, "/api/tokens", body.clone())).await.unwrap();
        assert_eq!(response.status(), 200);
        let response = app.oneshot(json_request(Method::POST, "/api/tokens", body)).await.unwrap();
        assert_eq!(response.status(), 200);

        assert_eq!(store.token_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_token() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, None).await;
        store.upsert("ExpoPushToken[a]", "Salta").await.unwrap();

        let response = app
            .clone()
            .oneshot(json_request(Method::DELETE, "/api/tokens/delete", json!({"token": "ExpoPushToken[a]"})))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = app
            .oneshot(json_request(Method::DELETE, "/api/tokens/delete", json!({"token": "ExpoPushToken[a]"})))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_unknown_token_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (app, _) = test_app(&dir, None).await;

        let response = app
            .oneshot(json_request(Method::DELETE, "/api/tokens/delete", json!({"token": "never-registered"})))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_feedback_rejects_invalid_token() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, None).await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/feedback",
                json!({"token": "bogus", "sentiste": true, "sismoInfo": {"numero": "12"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(store.feedback_count().await, 0);
    }

    #[tokio::test]
    async fn test_feedback_is_stored() {
        let dir = TempDir::new().unwrap();
        let (app, store) = test_app(&dir, None).await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/feedback",
                json!({"token": "ExpoPushToken[a]", "sentiste": false, "sismoInfo": {"numero": "12"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(store.feedback_count().await, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let app = failing_app();
        let requests = [
            json_request(Method::POST, "/api/tokens", json!({"token": "ExpoPushToken[a]", "province": "Salta"})),
            json_request(Method::DELETE, "/api/tokens/delete", json!({"token": "ExpoPushToken[a]"})),
            json_request(
                Method::POST,
                "/api/feedback",
                json!({"token": "ExpoPushToken[a]", "sentiste": true, "sismoInfo": {"numero": "12"}}),
            ),
        ];

        for request in requests {
            let uri = request.uri().clone();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), 500, "{}", uri);
        }
    }
}
