//! `SQLite` implementation of [`StateRepository`], backed by the single
//! key-value `state` table (`key`, `timestamp`, `value`).

use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use gateway_app::ports::StateRepository;
use gateway_domain::error::GatewayError;
use gateway_domain::id::DeviceId;
use gateway_domain::scenario::ScenarioState;
use gateway_domain::state::DeviceState;
use gateway_domain::time::format_persisted;

use crate::error::StorageError;

const UPSERT: &str = "INSERT INTO state (key, timestamp, value) VALUES (?, ?, ?) \
    ON CONFLICT(key) DO UPDATE SET timestamp = excluded.timestamp, value = excluded.value";
const SELECT_BY_KEY: &str = "SELECT value FROM state WHERE key = ?";
const SELECT_DEVICE_KEYS: &str = "SELECT value FROM state WHERE key LIKE 'device:%'";

const ACTIVE_SCENARIO_KEY: &str = "active_scenario";

fn device_key(device_id: &DeviceId) -> String {
    format!("device:{device_id}")
}

/// `SQLite`-backed key-value state repository.
pub struct SqliteStateRepository {
    pool: SqlitePool,
    /// Flipped once by `close()`; every operation checks it first so a call
    /// racing shutdown is rejected cleanly instead of hitting a raw
    /// "pool closed" error from `sqlx`.
    closing: AtomicBool,
}

impl SqliteStateRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            closing: AtomicBool::new(false),
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(format_persisted(gateway_domain::time::now()))
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let row: Option<SqliteRow> = sqlx::query(SELECT_BY_KEY)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        match row {
            Some(row) => {
                let value: String = row.try_get("value").map_err(StorageError::from)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl StateRepository for SqliteStateRepository {
    async fn save_device_state(&self, state: &DeviceState) -> Result<(), GatewayError> {
        if self.is_closing() {
            tracing::warn!(device_id = %state.device_id, "rejecting save_device_state: repository is closing");
            return Ok(());
        }
        let value = serde_json::to_string(state).map_err(StorageError::from)?;
        self.upsert(&device_key(&state.device_id), &value).await
    }

    async fn load_device_state(&self, device_id: &DeviceId) -> Result<Option<DeviceState>, GatewayError> {
        if self.is_closing() {
            tracing::warn!(%device_id, "rejecting load_device_state: repository is closing");
            return Ok(None);
        }
        let Some(value) = self.get(&device_key(device_id)).await? else {
            return Ok(None);
        };
        let state = serde_json::from_str(&value).map_err(StorageError::from)?;
        Ok(Some(state))
    }

    async fn load_all_device_states(&self) -> Result<Vec<DeviceState>, GatewayError> {
        if self.is_closing() {
            tracing::warn!("rejecting load_all_device_states: repository is closing");
            return Ok(Vec::new());
        }
        let rows: Vec<SqliteRow> = sqlx::query(SELECT_DEVICE_KEYS)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| {
                let value: String = row.try_get("value").map_err(StorageError::from)?;
                let state: DeviceState = serde_json::from_str(&value).map_err(StorageError::from)?;
                Ok(state)
            })
            .collect()
    }

    async fn save_scenario_state(&self, state: &ScenarioState) -> Result<(), GatewayError> {
        if self.is_closing() {
            tracing::warn!("rejecting save_scenario_state: repository is closing");
            return Ok(());
        }
        let value = serde_json::to_string(state).map_err(StorageError::from)?;
        self.upsert(ACTIVE_SCENARIO_KEY, &value).await
    }

    async fn load_scenario_state(&self) -> Result<ScenarioState, GatewayError> {
        if self.is_closing() {
            tracing::warn!("rejecting load_scenario_state: repository is closing");
            return Ok(ScenarioState::none());
        }
        let Some(value) = self.get(ACTIVE_SCENARIO_KEY).await? else {
            return Ok(ScenarioState::none());
        };
        let state = serde_json::from_str(&value).map_err(StorageError::from)?;
        Ok(state)
    }

    async fn close(&self) -> Result<(), GatewayError> {
        self.closing.store(true, Ordering::SeqCst);
        self.pool.close().await;
        Ok(())
    }
}
