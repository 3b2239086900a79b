//! Fake backend lifecycle management
//!
//! One axum app plays every remote the crate talks to: user storage, the
//! trigger API, the notification API and the content source. Each test gets
//! an isolated instance on a random port.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use notify_sync::onchain::{
    CreatedTrigger, ListNotificationsRequest, MarkAsReadRequest, OnChainRawNotification,
    TriggerCreateRequest,
};
use notify_sync::user_storage::{PutEntryBody, PutFeatureBody, StorageEntry, UserStorageFeature};
use notify_sync::{InMemoryUserStorage, UserStorage};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Everything the fake backend has seen or will serve.
#[derive(Default)]
pub struct BackendState {
    pub storage: InMemoryUserStorage,
    pub created_triggers: Mutex<Vec<TriggerCreateRequest>>,
    pub deleted_triggers: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<OnChainRawNotification>>,
    pub fail_notifications: AtomicBool,
    pub notification_pages_requested: AtomicUsize,
    pub marked_as_read: Mutex<Vec<String>>,
    pub content_payload: Mutex<Value>,
    pub content_failures_remaining: AtomicUsize,
    pub content_requests: AtomicUsize,
}

type Shared = Arc<BackendState>;

/// Fake backend instance
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Shared state for seeding responses and inspecting requests
    pub state: Arc<BackendState>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new fake backend on a random port
    ///
    /// # Panics
    ///
    /// Panics if port binding fails.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(BackendState::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = make_app(state.clone());

        // The listener is already bound, so requests queue until serve starts
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url,
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn user_storage_url(&self) -> String {
        format!("{}/api/v1/userstorage", self.base_url)
    }

    /// Make the next `count` content requests fail with 503.
    pub fn fail_content_requests(&self, count: usize) {
        self.state
            .content_failures_remaining
            .store(count, Ordering::SeqCst);
    }

    pub fn content_requests(&self) -> usize {
        self.state.content_requests.load(Ordering::SeqCst)
    }

    pub fn set_content_payload(&self, payload: Value) {
        *self.state.content_payload.lock().unwrap() = payload;
    }

    pub fn set_notifications(&self, notifications: Vec<OnChainRawNotification>) {
        *self.state.notifications.lock().unwrap() = notifications;
    }

    pub fn fail_notifications(&self, fail: bool) {
        self.state.fail_notifications.store(fail, Ordering::SeqCst);
    }

    pub fn notification_pages_requested(&self) -> usize {
        self.state
            .notification_pages_requested
            .load(Ordering::SeqCst)
    }

    pub fn created_trigger_ids(&self) -> Vec<String> {
        self.state
            .created_triggers
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn deleted_trigger_ids(&self) -> Vec<String> {
        self.state.deleted_triggers.lock().unwrap().clone()
    }

    pub fn marked_as_read(&self) -> Vec<String> {
        self.state.marked_as_read.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn make_app(state: Shared) -> Router {
    Router::new()
        .route(
            "/api/v1/userstorage/{feature}",
            get(get_feature).put(put_feature).delete(delete_feature),
        )
        .route(
            "/api/v1/userstorage/{feature}/{key}",
            get(get_entry).put(put_entry).delete(delete_entry),
        )
        .route(
            "/api/v1/triggers/batch",
            post(create_triggers).delete(delete_triggers),
        )
        .route("/api/v1/notifications", post(list_notifications))
        .route("/api/v1/notifications/mark-as-read", post(mark_as_read))
        .route(
            "/spaces/{space}/environments/{environment}/entries",
            get(content_entries),
        )
        .with_state(state)
}

// =========================================================================
// User storage
// =========================================================================

fn storage_error<E>(_: E) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn get_feature(
    State(state): State<Shared>,
    Path(feature): Path<String>,
) -> Result<Json<Option<Vec<StorageEntry>>>, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    state
        .storage
        .get_all(&feature)
        .await
        .map(Json)
        .map_err(storage_error)
}

async fn put_feature(
    State(state): State<Shared>,
    Path(feature): Path<String>,
    Json(body): Json<PutFeatureBody>,
) -> Result<StatusCode, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    let result = match body {
        PutFeatureBody::Upsert { data } => state.storage.put_batch(&feature, &data).await,
        PutFeatureBody::BatchDelete { batch_delete } => {
            state.storage.put_batch_delete(&feature, &batch_delete).await
        }
    };
    result.map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_feature(
    State(state): State<Shared>,
    Path(feature): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    state
        .storage
        .delete_all(&feature)
        .await
        .map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_entry(
    State(state): State<Shared>,
    Path((feature, key)): Path<(String, String)>,
) -> Result<Json<Option<StorageEntry>>, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    state
        .storage
        .get_entry(&feature, &key)
        .await
        .map(Json)
        .map_err(storage_error)
}

async fn put_entry(
    State(state): State<Shared>,
    Path((feature, key)): Path<(String, String)>,
    Json(body): Json<PutEntryBody>,
) -> Result<StatusCode, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    state
        .storage
        .put(&feature, &key, &body.data)
        .await
        .map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_entry(
    State(state): State<Shared>,
    Path((feature, key)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let feature = UserStorageFeature::from(feature.as_str());
    state
        .storage
        .delete_entry(&feature, &key)
        .await
        .map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Triggers and notifications
// =========================================================================

async fn create_triggers(
    State(state): State<Shared>,
    Json(triggers): Json<Vec<TriggerCreateRequest>>,
) -> Json<Vec<CreatedTrigger>> {
    let created = triggers
        .iter()
        .map(|t| CreatedTrigger { id: t.id.clone() })
        .collect();
    state.created_triggers.lock().unwrap().extend(triggers);
    Json(created)
}

async fn delete_triggers(
    State(state): State<Shared>,
    Json(ids): Json<Vec<String>>,
) -> StatusCode {
    state.deleted_triggers.lock().unwrap().extend(ids);
    StatusCode::NO_CONTENT
}

async fn list_notifications(
    State(state): State<Shared>,
    Json(request): Json<ListNotificationsRequest>,
) -> Result<Json<Vec<OnChainRawNotification>>, StatusCode> {
    state
        .notification_pages_requested
        .fetch_add(1, Ordering::SeqCst);
    if state.fail_notifications.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let per_page = request.per_page as usize;
    let skip = (request.page.saturating_sub(1) as usize) * per_page;
    let page = state
        .notifications
        .lock()
        .unwrap()
        .iter()
        .filter(|n| request.trigger_ids.contains(&n.trigger_id))
        .skip(skip)
        .take(per_page)
        .cloned()
        .collect();
    Ok(Json(page))
}

async fn mark_as_read(
    State(state): State<Shared>,
    Json(request): Json<MarkAsReadRequest>,
) -> StatusCode {
    state.marked_as_read.lock().unwrap().extend(request.ids);
    StatusCode::OK
}

// =========================================================================
// Content source
// =========================================================================

async fn content_entries(State(state): State<Shared>) -> Result<Json<Value>, StatusCode> {
    state.content_requests.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .content_failures_remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(state.content_payload.lock().unwrap().clone()))
}
