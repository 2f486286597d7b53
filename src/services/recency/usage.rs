use super::store::KeyValueStore;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::utils::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub const USAGE_KEY: &str = "window-usage";

/// Local usage clock: when the picker itself last activated each window.
///
/// Stored as one JSON map `{ "<id>": <unix-ms> }` under [`USAGE_KEY`].
/// Reads never fail; a missing or corrupt record is an empty map.
pub struct UsageClock {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    // Сериализует read-modify-write внутри процесса
    write_lock: Mutex<()>,
}

impl UsageClock {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> HashMap<u64, u64> {
        let bytes = match self.store.get(USAGE_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!("Не удалось прочитать историю использования: {}", e);
                return HashMap::new();
            }
        };

        match serde_json::from_slice::<HashMap<u64, u64>>(&bytes) {
            Ok(usage) => usage,
            Err(e) => {
                warn!("История использования повреждена, начинаем заново: {}", e);
                HashMap::new()
            }
        }
    }

    /// Stamp `entity_id` with the current time and return that timestamp.
    pub async fn record(&self, entity_id: u64) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now_millis();
        let mut usage = self.snapshot().await;
        usage.insert(entity_id, now);
        self.save(&usage).await?;

        debug_if_enabled!("Окно {} использовано в {}", entity_id, now);
        Ok(now)
    }

    /// Drop records of windows that no longer exist. Returns how many were removed.
    pub async fn retain(&self, live_ids: &[u64]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut usage = self.snapshot().await;
        let before = usage.len();
        usage.retain(|id, _| live_ids.contains(id));
        let removed = before - usage.len();

        if removed > 0 {
            self.save(&usage).await?;
            debug_if_enabled!("Удалено {} записей об исчезнувших окнах", removed);
        }
        Ok(removed)
    }

    async fn save(&self, usage: &HashMap<u64, u64>) -> Result<()> {
        let bytes = serde_json::to_vec(usage)?;
        self.store.set(USAGE_KEY, &bytes).await
    }
}
