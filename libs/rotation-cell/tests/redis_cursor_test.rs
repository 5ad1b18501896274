use std::sync::Arc;

use deadpool_redis::{Config, Runtime};
use redis::AsyncCommands;
use uuid::Uuid;

use rotation_cell::{CursorStore, RedisCursorStore};
use shared_config::{AppConfig, CursorBackend};
use shared_utils::test_utils::TestConfig;

/// Redis tests run against a real server named by `REDIS_TEST_URL` and are
/// skipped when it is unset.
fn redis_test_config() -> Option<AppConfig> {
    let redis_url = match std::env::var("REDIS_TEST_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("REDIS_TEST_URL not set, skipping Redis cursor test");
            return None;
        }
    };

    let mut config = TestConfig {
        cursor_backend: CursorBackend::Redis,
        ..TestConfig::default()
    }
    .to_app_config();
    config.redis_url = Some(redis_url);
    Some(config)
}

/// Store on an isolated key so tests can run in parallel on one server.
async fn isolated_store(config: &AppConfig) -> RedisCursorStore {
    let key = format!("test_{}:rotation", Uuid::new_v4().simple());
    RedisCursorStore::with_key(config, key).await.unwrap()
}

async fn cleanup(config: &AppConfig, key: &str) {
    let redis_url = config.redis_url.clone().unwrap();
    let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1)).unwrap();
    let mut conn = pool.get().await.unwrap();
    let _: () = conn.del(key).await.unwrap();
}

async fn raw_value(config: &AppConfig, key: &str) -> Option<String> {
    let redis_url = config.redis_url.clone().unwrap();
    let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1)).unwrap();
    let mut conn = pool.get().await.unwrap();
    conn.get(key).await.unwrap()
}

#[tokio::test]
async fn test_redis_cursor_defaults_to_zero() {
    let Some(config) = redis_test_config() else { return };
    let store = isolated_store(&config).await;

    assert_eq!(store.read_cursor().await.unwrap(), 0);
    assert_eq!(raw_value(&config, store.key()).await, None);

    cleanup(&config, store.key()).await;
}

#[tokio::test]
async fn test_redis_cursor_round_trip() {
    let Some(config) = redis_test_config() else { return };
    let store = isolated_store(&config).await;

    store.write_cursor(5).await.unwrap();
    store.write_cursor(5).await.unwrap();

    assert_eq!(store.read_cursor().await.unwrap(), 5);
    assert_eq!(raw_value(&config, store.key()).await.as_deref(), Some("5"));

    cleanup(&config, store.key()).await;
}

#[tokio::test]
async fn test_redis_advance_wraps_stale_cursor() {
    let Some(config) = redis_test_config() else { return };
    let store = isolated_store(&config).await;

    store.write_cursor(7).await.unwrap();

    // 7 mod 3 = 1 is handed out, 2 is stored.
    assert_eq!(store.advance_cursor(3).await.unwrap(), 1);
    assert_eq!(store.read_cursor().await.unwrap(), 2);

    cleanup(&config, store.key()).await;
}

#[tokio::test]
async fn test_redis_full_cycle_returns_to_start() {
    let Some(config) = redis_test_config() else { return };
    let store = isolated_store(&config).await;

    let mut turns = Vec::new();
    for _ in 0..4 {
        turns.push(store.advance_cursor(4).await.unwrap());
    }

    assert_eq!(turns, vec![0, 1, 2, 3]);
    assert_eq!(store.read_cursor().await.unwrap(), 0);

    cleanup(&config, store.key()).await;
}

#[tokio::test]
async fn test_redis_concurrent_advances_hand_out_distinct_turns() {
    let Some(config) = redis_test_config() else { return };
    let store = Arc::new(isolated_store(&config).await);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.advance_cursor(6).await.unwrap() })
        })
        .collect();

    let mut turns = Vec::new();
    for handle in handles {
        turns.push(handle.await.unwrap());
    }
    turns.sort_unstable();

    assert_eq!(turns, (0..6).collect::<Vec<_>>());
    assert_eq!(store.read_cursor().await.unwrap(), 0);

    cleanup(&config, store.key()).await;
}
