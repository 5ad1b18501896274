use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::{AppConfig, CursorBackend};
use shared_database::supabase::SupabaseClient;

use crate::error::RotationError;
use crate::models::{RotationRow, CURSOR_KEY};

/// Persisted offset into the rotation sequence.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Stored cursor, 0 when no record exists.
    async fn read_cursor(&self) -> Result<u64, RotationError>;

    /// Upserts the cursor. Writing the same value twice is harmless.
    async fn write_cursor(&self, value: u64) -> Result<(), RotationError>;

    /// Returns the stored cursor reduced modulo `len` and stores the
    /// following position.
    ///
    /// The default is a separate read and write: two concurrent callers can
    /// both read the same value, and the last write wins. Stores with an
    /// atomic update override this.
    async fn advance_cursor(&self, len: usize) -> Result<usize, RotationError> {
        if len == 0 {
            return Err(RotationError::EmptySequence);
        }

        let stored = self.read_cursor().await?;
        let index = wrap_index(stored, len);
        self.write_cursor(((index + 1) % len) as u64).await?;
        Ok(index)
    }
}

pub(crate) fn wrap_index(stored: u64, len: usize) -> usize {
    if stored >= len as u64 {
        warn!("Stored cursor {} is past the sequence of {} turns, wrapping", stored, len);
    }
    (stored % len as u64) as usize
}

/// Picks the cursor store named by `ROTATION_CURSOR_BACKEND`.
pub async fn build_cursor_store(config: &AppConfig) -> Result<Arc<dyn CursorStore>, RotationError> {
    let store: Arc<dyn CursorStore> = match config.cursor_backend {
        CursorBackend::Supabase => Arc::new(SupabaseCursorStore::new(
            config,
            config.supabase_service_role_key.as_deref(),
        )),
        CursorBackend::Redis => Arc::new(RedisCursorStore::new(config).await?),
        CursorBackend::Memory => {
            warn!("Rotation cursor is kept in memory and resets on restart");
            Arc::new(InMemoryCursorStore::new())
        }
    };

    info!("Rotation cursor backend: {:?}", config.cursor_backend);
    Ok(store)
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryCursorStore {
    values: Mutex<HashMap<String, u64>>,
    writes: AtomicUsize,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes performed so far, including atomic advances.
    ///
    /// Diagnostic only: it is never persisted and plays no part in the
    /// rotation. Callers use it to confirm a failed assignment left the
    /// cursor untouched.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, u64>>, RotationError> {
        self.values
            .lock()
            .map_err(|_| RotationError::Store("cursor mutex poisoned".to_string()))
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn read_cursor(&self) -> Result<u64, RotationError> {
        Ok(self.lock()?.get(CURSOR_KEY).copied().unwrap_or(0))
    }

    async fn write_cursor(&self, value: u64) -> Result<(), RotationError> {
        self.lock()?.insert(CURSOR_KEY.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn advance_cursor(&self, len: usize) -> Result<usize, RotationError> {
        if len == 0 {
            return Err(RotationError::EmptySequence);
        }

        let mut values = self.lock()?;
        let slot = values.entry(CURSOR_KEY.to_string()).or_insert(0);
        let index = wrap_index(*slot, len);
        *slot = ((index + 1) % len) as u64;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(index)
    }
}

// ==============================================================================
// SUPABASE
// ==============================================================================

const ROTATIONS_TABLE: &str = "/rest/v1/rotations";
const ADVANCE_FUNCTION: &str = "advance_rotation_cursor";

/// Cursor kept as a row of the `rotations` key/value table.
///
/// The atomic advance calls the `advance_rotation_cursor` Postgres function
/// from `migrations/001_rotations.sql`. Both the table and the function are
/// revoked from `anon` and `authenticated`, so the store has to be built with
/// the service-role key.
pub struct SupabaseCursorStore {
    supabase: SupabaseClient,
    auth_token: Option<String>,
}

impl SupabaseCursorStore {
    pub fn new(config: &AppConfig, auth_token: Option<&str>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.map(str::to_string),
        }
    }

    fn to_cursor(value: i64) -> Result<u64, RotationError> {
        u64::try_from(value)
            .map_err(|_| RotationError::Store(format!("negative cursor value {}", value)))
    }
}

#[async_trait]
impl CursorStore for SupabaseCursorStore {
    async fn read_cursor(&self) -> Result<u64, RotationError> {
        let path = format!("{}?key=eq.{}&select=key,value", ROTATIONS_TABLE, CURSOR_KEY);

        let rows: Vec<RotationRow> = self.supabase
            .request(Method::GET, &path, self.auth_token.as_deref(), None)
            .await
            .map_err(|e| RotationError::Store(e.to_string()))?;

        match rows.first() {
            Some(row) => Self::to_cursor(row.value),
            None => {
                debug!("No rotation cursor stored yet, starting at 0");
                Ok(0)
            }
        }
    }

    async fn write_cursor(&self, value: u64) -> Result<(), RotationError> {
        let path = format!("{}?on_conflict=key", ROTATIONS_TABLE);

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates"),
        );

        let body = json!({
            "key": CURSOR_KEY,
            "value": value,
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.supabase
            .execute(Method::POST, &path, self.auth_token.as_deref(), Some(body), Some(headers))
            .await
            .map_err(|e| RotationError::Store(e.to_string()))?;

        debug!("Rotation cursor set to {}", value);
        Ok(())
    }

    async fn advance_cursor(&self, len: usize) -> Result<usize, RotationError> {
        if len == 0 {
            return Err(RotationError::EmptySequence);
        }

        let index: i64 = self.supabase
            .rpc(
                ADVANCE_FUNCTION,
                self.auth_token.as_deref(),
                json!({ "cursor_key": CURSOR_KEY, "modulus": len }),
            )
            .await
            .map_err(|e| RotationError::Store(e.to_string()))?;

        let index = Self::to_cursor(index)? as usize;
        if index >= len {
            return Err(RotationError::Store(format!(
                "{} returned {} for a sequence of {}",
                ADVANCE_FUNCTION, index, len
            )));
        }

        Ok(index)
    }
}

// ==============================================================================
// REDIS
// ==============================================================================

// KEYS[1] = cursor key, ARGV[1] = sequence length. Returns the pre-advance index.
const ADVANCE_SCRIPT: &str = r"
local len = tonumber(ARGV[1])
local current = (tonumber(redis.call('GET', KEYS[1])) or 0) % len
redis.call('SET', KEYS[1], (current + 1) % len)
return current
";

pub struct RedisCursorStore {
    pool: Pool,
    key: String,
}

impl RedisCursorStore {
    pub async fn new(config: &AppConfig) -> Result<Self, RotationError> {
        Self::with_key(config, format!("rotation:{}", CURSOR_KEY)).await
    }

    /// Store keeping the cursor under `key` instead of `rotation:currentDoctorIndex`.
    pub async fn with_key(config: &AppConfig, key: impl Into<String>) -> Result<Self, RotationError> {
        let redis_url = config.redis_url.clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RotationError::Store(format!("Failed to create Redis pool: {}", e)))?;

        let store = Self {
            pool,
            key: key.into(),
        };

        let mut conn = store.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis cursor store initialized on {}", store.key);

        Ok(store)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn get_connection(&self) -> Result<Connection, RotationError> {
        self.pool
            .get()
            .await
            .map_err(|e| RotationError::Store(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CursorStore for RedisCursorStore {
    async fn read_cursor(&self) -> Result<u64, RotationError> {
        let mut conn = self.get_connection().await?;
        let value: Option<u64> = conn.get(&self.key).await?;
        Ok(value.unwrap_or(0))
    }

    async fn write_cursor(&self, value: u64) -> Result<(), RotationError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(&self.key, value).await?;
        Ok(())
    }

    async fn advance_cursor(&self, len: usize) -> Result<usize, RotationError> {
        if len == 0 {
            return Err(RotationError::EmptySequence);
        }

        let mut conn = self.get_connection().await?;
        let index: u64 = redis::Script::new(ADVANCE_SCRIPT)
            .key(&self.key)
            .arg(len)
            .invoke_async(&mut conn)
            .await?;

        Ok(index as usize)
    }
}
