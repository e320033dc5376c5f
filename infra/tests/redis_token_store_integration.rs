//! Integration tests for the Redis token store and the engine on top of it
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p ot_infra --test redis_token_store_integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use ot_core::errors::{StoreError, TokenError};
use ot_core::repositories::TokenStore;
use ot_core::services::{TokenService, TokenServiceConfig};
use ot_infra::cache::{CacheConfig, RedisClient, RedisTokenStore};

async fn create_store() -> RedisTokenStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    // A fresh prefix per test keeps runs isolated
    let config = CacheConfig::new(url).with_prefix(format!("test-{}", Uuid::new_v4()));

    let client = RedisClient::new(config).await.expect("Failed to connect to Redis");
    RedisTokenStore::new(Arc::new(client))
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_reserve_is_set_if_absent() {
    let store = create_store().await;

    assert!(store.reserve("tok", "first", Duration::from_secs(60)).await.unwrap());
    assert!(!store.reserve("tok", "second", Duration::from_secs(60)).await.unwrap());
    assert_eq!(store.get("tok").await.unwrap(), "first");

    let ttl = store.client().ttl(&store.token_key("tok")).await.unwrap();
    assert!(matches!(ttl, Some(secs) if secs > 0 && secs <= 60));

    assert_ok!(store.delete(&["tok".to_string(), "missing".to_string()]).await);
    assert_eq!(store.get("tok").await, Err(StoreError::NotFound));
    assert!(!store.exists("tok").await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_record_expires_natively() {
    let store = create_store().await;

    store
        .reserve("short", "v", Duration::from_millis(300))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(store.get("short").await, Err(StoreError::NotFound));
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_index_operations() {
    let store = create_store().await;

    store.index_add("user", "late", 300.5).await.unwrap();
    store.index_add("user", "early", 100.25).await.unwrap();
    store.index_add("user", "edge", 200.0).await.unwrap();

    assert_eq!(
        store.index_list("user").await.unwrap(),
        vec!["early", "edge", "late"]
    );

    // Removal by score is inclusive of the bound
    assert_eq!(store.index_remove_expired("user", 200.0).await.unwrap(), 2);
    assert_eq!(store.index_list("user").await.unwrap(), vec!["late"]);

    let removed = store
        .index_remove("user", &["late".to_string(), "never".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.index_remove("user", &[]).await.unwrap(), 0);
    assert!(store.index_list("user").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_token_lifecycle_against_redis() {
    let store = create_store().await;
    let service: TokenService<_, Value> =
        TokenService::new(store.clone(), TokenServiceConfig::default()).unwrap();

    let pair = service
        .mint_pair("user-1", json!({ "role": "admin" }))
        .await
        .unwrap();
    let record = service.validate_access(pair.access_token()).await.unwrap();
    assert_eq!(record.payload["role"], "admin");

    let rotated = service.rotate(pair.refresh_token(), None).await.unwrap();
    assert_eq!(
        service.validate(pair.access_token()).await.unwrap_err(),
        TokenError::TokenInvalid
    );
    assert_err!(service.rotate(pair.refresh_token(), None).await);
    assert_ok!(service.validate_refresh(rotated.refresh_token()).await);

    assert_eq!(service.list_user_tokens("user-1").await.unwrap().len(), 2);
    assert_eq!(service.revoke_all_for_user("user-1").await.unwrap(), 2);
    assert!(store.index_list("user-1").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_sweep_repairs_evicted_records() {
    let store = create_store().await;
    let service: TokenService<_, Value> =
        TokenService::new(store.clone(), TokenServiceConfig::default()).unwrap();

    let pair = service.mint_pair("user-1", json!({})).await.unwrap();
    store
        .client()
        .unlink(&[store.token_key(pair.access_token())])
        .await
        .unwrap();

    let report = service.sweep_user("user-1").await.unwrap();
    assert_eq!(report.orphaned_removed, 1);
    assert_eq!(report.live, vec![pair.refresh_token().to_string()]);
}
