//! Integration tests for session acquisition, persistence and reuse.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{MockBackend, APP_ID};
use uidrive_core::error::DriverError;
use uidrive_core::platform::{Platform, PlatformProfile};
use uidrive_core::session::{
    MemorySessionStore, SessionDescriptor, SessionManager, SessionOptions, SessionStore,
};

fn manager(
    backend: Arc<MockBackend>,
    store: Arc<MemorySessionStore>,
    platform: Platform,
) -> SessionManager {
    SessionManager::new(backend, store, PlatformProfile::for_platform(platform), APP_ID)
}

fn persisted(session_id: &str, platform: Platform) -> SessionDescriptor {
    SessionDescriptor {
        session_id: session_id.into(),
        platform,
        app_id: APP_ID.into(),
        endpoint: "http://127.0.0.1:4723".into(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn fresh_acquire_creates_exactly_one_session() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let manager = manager(backend.clone(), store, Platform::Ios);

    let outcome = manager.acquire(&SessionOptions::default()).await.unwrap();

    assert_eq!(backend.creations(), 1);
    assert!(!outcome.reused);
    assert!(!outcome.recreated);
}

#[tokio::test]
async fn acquire_without_keep_persists_nothing() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let manager = manager(backend, store.clone(), Platform::Ios);

    manager.acquire(&SessionOptions::default()).await.unwrap();

    assert!(store.load(Platform::Ios, APP_ID).is_none());
}

#[tokio::test]
async fn keep_persists_a_descriptor_for_the_pair() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let manager = manager(backend, store.clone(), Platform::Android);

    let outcome = manager
        .acquire(&SessionOptions { keep: true, ..Default::default() })
        .await
        .unwrap();

    let descriptor = store.load(Platform::Android, APP_ID).unwrap();
    assert_eq!(descriptor.session_id, outcome.session_id);
    assert_eq!(descriptor.platform, Platform::Android);
    assert_eq!(descriptor.app_id, APP_ID);
}

#[tokio::test]
async fn reuse_of_a_live_session_creates_nothing() {
    let backend = Arc::new(MockBackend::new().with_alive("persisted-1"));
    let store = Arc::new(MemorySessionStore::new());
    store.save(&persisted("persisted-1", Platform::Ios)).unwrap();
    let manager = manager(backend.clone(), store, Platform::Ios);

    let outcome = manager
        .acquire(&SessionOptions { reuse: true, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(backend.creations(), 0);
    assert!(outcome.reused);
    assert_eq!(outcome.session_id, "persisted-1");
}

#[tokio::test]
async fn expired_session_is_recreated_exactly_once() {
    // The persisted id is not alive on the backend.
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    store.save(&persisted("stale-1", Platform::Ios)).unwrap();
    let manager = manager(backend.clone(), store.clone(), Platform::Ios);

    let outcome = manager
        .acquire(&SessionOptions { reuse: true, keep: true, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(backend.creations(), 1);
    assert!(!outcome.reused);
    assert!(outcome.recreated);
    assert_ne!(outcome.session_id, "stale-1");

    // The stale descriptor was replaced by the new session's.
    let descriptor = store.load(Platform::Ios, APP_ID).unwrap();
    assert_eq!(descriptor.session_id, outcome.session_id);
}

#[tokio::test]
async fn reuse_ignores_descriptors_for_other_platforms() {
    let backend = Arc::new(MockBackend::new().with_alive("persisted-1"));
    let store = Arc::new(MemorySessionStore::new());
    store.save(&persisted("persisted-1", Platform::Android)).unwrap();
    let manager = manager(backend.clone(), store, Platform::Ios);

    let outcome = manager
        .acquire(&SessionOptions { reuse: true, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(backend.creations(), 1);
    assert!(!outcome.reused);
}

#[tokio::test]
async fn end_deletes_the_descriptor_and_is_idempotent() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let manager = manager(backend, store.clone(), Platform::Ios);

    let outcome = manager
        .acquire(&SessionOptions { keep: true, ..Default::default() })
        .await
        .unwrap();
    assert!(store.load(Platform::Ios, APP_ID).is_some());

    manager.end(Some(&outcome.session_id)).await.unwrap();
    assert!(store.load(Platform::Ios, APP_ID).is_none());

    // Ending again succeeds silently.
    manager.end(Some(&outcome.session_id)).await.unwrap();
    manager.end(None).await.unwrap();
}

#[tokio::test]
async fn environment_failures_propagate_from_acquire() {
    let backend = Arc::new(MockBackend::new());
    *backend.fail_create_with.lock().unwrap() =
        Some(DriverError::DeviceNotAvailable("no booted simulator".into()));
    let store = Arc::new(MemorySessionStore::new());
    let manager = manager(backend, store, Platform::Ios);

    let err = manager.acquire(&SessionOptions::default()).await.unwrap_err();

    assert!(matches!(err, DriverError::DeviceNotAvailable(_)));
    assert!(err.is_environment());
}
