use crate::config::Config;
use crate::error::{QueryError, Result};
use crate::model::{DisplayInfo, QueryKind, SpaceInfo, WindowEntity};
use crate::search::Ranker;
use crate::services::gateway::{create_gateway, ProcessGateway};
use crate::services::query_cache::{invocation_for, CacheState, QueryCache};
use crate::services::recency::{
    merge, FileStore, FocusLog, FocusLogEntry, KeyValueStore, MemoryStore, RecencyMap, UsageClock,
};
use crate::utils::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the picker UI needs: a fresh view of the windows, their merged
/// recency and the ranked result for a search string.
///
/// Owns its caches; nothing here is process-global, so several instances can
/// live side by side (tests do exactly that).
pub struct WindowSwitcher {
    windows: QueryCache<Vec<WindowEntity>>,
    spaces: QueryCache<Vec<SpaceInfo>>,
    displays: QueryCache<Vec<DisplayInfo>>,
    usage: UsageClock,
    focus_log: FocusLog,
    ranker: Ranker,
}

impl WindowSwitcher {
    pub fn new(
        config: &Config,
        gateway: Arc<dyn ProcessGateway>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = config.query_policy();
        let cache = |kind: QueryKind| {
            (
                kind,
                invocation_for(config, kind),
                Arc::clone(&gateway),
                Arc::clone(&clock),
                policy.clone(),
            )
        };

        let (kind, invocation, gw, clk, pol) = cache(QueryKind::Windows);
        let windows = QueryCache::new(kind, invocation, gw, clk, pol);
        let (kind, invocation, gw, clk, pol) = cache(QueryKind::Spaces);
        let spaces = QueryCache::new(kind, invocation, gw, clk, pol);
        let (kind, invocation, gw, clk, pol) = cache(QueryKind::Displays);
        let displays = QueryCache::new(kind, invocation, gw, clk, pol);

        Self {
            windows,
            spaces,
            displays,
            usage: UsageClock::new(store, Arc::clone(&clock)),
            focus_log: FocusLog::new(&config.recency, clock),
            ranker: Ranker::new(config.search.fuzzy_threshold),
        }
    }

    /// Real process gateway and file store; in dry-run mode canned snapshots
    /// and an in-memory usage store.
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        let gateway = create_gateway(config, dry_run);
        let store: Arc<dyn KeyValueStore> = if dry_run {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::new(&config.recency.usage_store_dir))
        };

        let switcher = Self::new(config, gateway, store, Arc::new(SystemClock));
        info!(
            "WindowSwitcher: команда '{}', журнал фокуса {:?}",
            config.query.command,
            switcher.focus_log.path()
        );
        switcher
    }

    pub async fn windows(&self) -> std::result::Result<Arc<Vec<WindowEntity>>, QueryError> {
        self.windows.query().await
    }

    pub async fn spaces(&self) -> std::result::Result<Arc<Vec<SpaceInfo>>, QueryError> {
        self.spaces.query().await
    }

    pub async fn displays(&self) -> std::result::Result<Arc<Vec<DisplayInfo>>, QueryError> {
        self.displays.query().await
    }

    /// Merged recency for the given windows. Never fails.
    pub async fn recency(&self, windows: &[WindowEntity]) -> RecencyMap {
        let (local, external) = tokio::join!(self.usage.snapshot(), self.focus_log.read());
        merge(&local, &external, windows.iter().map(|w| w.id))
    }

    /// Windows matching `raw_query`, focused window first, then most recent.
    pub async fn recent(&self, raw_query: &str) -> std::result::Result<Vec<WindowEntity>, QueryError> {
        let windows = self.windows().await?;
        let recency = self.recency(&windows).await;
        let focused = windows.iter().find(|w| w.focused).map(|w| w.id);

        Ok(self.ranker.rank(&windows, raw_query, &recency, focused))
    }

    /// The picker activated `entity_id`: stamp local usage and make the next
    /// query see the new focus.
    pub async fn record_activation(&self, entity_id: u64) -> Result<u64> {
        let stamped = self.usage.record(entity_id).await?;
        self.windows.invalidate();

        if let Some(windows) = self.windows.cached() {
            // Снимок может быть старше только что активированного окна
            let mut live: Vec<u64> = windows.iter().map(|w| w.id).collect();
            live.push(entity_id);
            if let Err(e) = self.usage.retain(&live).await {
                warn!("Не удалось очистить историю использования: {}", e);
            }
        }

        Ok(stamped)
    }

    /// Focus changed outside the picker (window manager signal hook).
    pub async fn record_focus(&self, entity_id: u64) -> Result<FocusLogEntry> {
        let entry = self.focus_log.append(entity_id).await?;
        self.windows.invalidate();
        Ok(entry)
    }

    /// Explicit manual refresh: every cache fetches again on next use.
    pub fn refresh(&self) {
        self.windows.invalidate();
        self.spaces.invalidate();
        self.displays.invalidate();
        info!("Кэши запросов сброшены");
    }

    pub fn cache_states(&self) -> [(QueryKind, CacheState); 3] {
        [
            (self.windows.kind(), self.windows.state()),
            (self.spaces.kind(), self.spaces.state()),
            (self.displays.kind(), self.displays.state()),
        ]
    }
}
