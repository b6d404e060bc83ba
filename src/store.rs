use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, DataSourceRecord, KpiPatch, KpiRecord, NewDataSourcePayload, NewKpiPayload, Trend,
};
use crate::seed::{sample_imports, seed_data_sources, seed_kpis};
use crate::simulation::{advance_all, synthesize_history};
use crate::ticker::{TickFn, TickFuture, Ticker};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tokio::time::Duration;
use uuid::Uuid;

struct StoreState {
    kpis: Vec<KpiRecord>,
    data_sources: Vec<DataSourceRecord>,
    rng: StdRng,
}

struct StoreInner {
    state: Mutex<StoreState>,
    settings: RwLock<AppSettings>,
    refreshes_in_flight: AtomicUsize,
    ticker: Ticker,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

struct LoadingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory KPI and data-source collections plus the simulated live feed
/// that mutates them. Cloning shares the same collections.
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

impl DataStore {
    pub fn new(settings: AppSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    pub fn with_seed(settings: AppSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: AppSettings, mut rng: StdRng) -> Self {
        let kpis = seed_kpis(&mut rng, settings.history_cap, settings.seed_variation);
        Self::from_parts(settings, kpis, seed_data_sources(), rng)
    }

    fn from_parts(
        settings: AppSettings,
        kpis: Vec<KpiRecord>,
        data_sources: Vec<DataSourceRecord>,
        rng: StdRng,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    kpis,
                    data_sources,
                    rng,
                }),
                settings: RwLock::new(settings),
                refreshes_in_flight: AtomicUsize::new(0),
                ticker: Ticker::new(),
            }),
        }
    }

    /// A store starting from explicit collections instead of the seed data.
    pub fn from_records(
        settings: AppSettings,
        kpis: Vec<KpiRecord>,
        data_sources: Vec<DataSourceRecord>,
        seed: u64,
    ) -> Self {
        Self::from_parts(settings, kpis, data_sources, StdRng::seed_from_u64(seed))
    }

    pub fn settings(&self) -> AppSettings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// New caps and variations apply from the next update. A lower history
    /// cap trims every window immediately, and a running feed is re-armed
    /// when the tick interval changes.
    pub async fn apply_settings(&self, settings: AppSettings) {
        let cap = settings.history_cap;
        let interval_changed = {
            let mut writer = self.inner.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            let changed = writer.tick_interval_ms != settings.tick_interval_ms;
            *writer = settings;
            changed
        };
        {
            let mut state = self.inner.state.lock().await;
            for kpi in state.kpis.iter_mut() {
                if kpi.history.len() > cap {
                    let excess = kpi.history.len() - cap;
                    kpi.history.drain(..excess);
                }
            }
        }

        if interval_changed && self.stop_live_updates().await {
            self.start_live_updates();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.inner.refreshes_in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn kpis(&self) -> Vec<KpiRecord> {
        self.inner.state.lock().await.kpis.clone()
    }

    pub async fn kpi(&self, id: &str) -> Option<KpiRecord> {
        let state = self.inner.state.lock().await;
        state.kpis.iter().find(|kpi| kpi.id == id).cloned()
    }

    pub async fn data_sources(&self) -> Vec<DataSourceRecord> {
        self.inner.state.lock().await.data_sources.clone()
    }

    /// One live-feed step over every KPI using the narrow tick variation.
    pub async fn tick(&self) {
        let settings = self.settings();
        let mut state = self.inner.state.lock().await;
        let StoreState { kpis, rng, .. } = &mut *state;
        advance_all(kpis, rng, settings.tick_variation, settings.history_cap);
        tracing::debug!(count = kpis.len(), "applied live tick");
    }

    /// Simulated round trip to a remote source: waits out the configured
    /// latency, then applies one wide-variation step to every KPI.
    pub async fn refresh(&self) {
        let settings = self.settings();
        let _loading = LoadingGuard::enter(&self.inner.refreshes_in_flight);
        tracing::info!(latency_ms = settings.refresh_latency_ms, "refreshing kpis");
        tokio::time::sleep(Duration::from_millis(settings.refresh_latency_ms)).await;

        let mut state = self.inner.state.lock().await;
        let StoreState { kpis, rng, .. } = &mut *state;
        advance_all(kpis, rng, settings.refresh_variation, settings.history_cap);
        tracing::info!(count = kpis.len(), "kpi refresh complete");
    }

    pub fn start_live_updates(&self) -> bool {
        let period = Duration::from_millis(self.settings().tick_interval_ms);
        let weak = Arc::downgrade(&self.inner);
        let tick: TickFn = Arc::new(move || {
            let weak = weak.clone();
            let future: TickFuture = Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    DataStore { inner }.tick().await;
                }
            });
            future
        });
        let started = self.inner.ticker.start(period, tick);
        if started {
            tracing::info!(period_ms = period.as_millis() as u64, "live updates started");
        }
        started
    }

    pub async fn stop_live_updates(&self) -> bool {
        let stopped = self.inner.ticker.stop().await;
        if stopped {
            tracing::info!("live updates stopped");
        }
        stopped
    }

    pub fn live_updates_running(&self) -> bool {
        self.inner.ticker.is_running()
    }

    pub async fn add_kpi(&self, payload: NewKpiPayload) -> AppResult<KpiRecord> {
        if payload.name.trim().is_empty() {
            return Err(AppError::Validation("KPI name cannot be empty".to_string()));
        }
        if !payload.value.is_finite() || !payload.previous_value.is_finite() {
            return Err(AppError::Validation("KPI readings must be finite numbers".to_string()));
        }

        let settings = self.settings();
        let mut state = self.inner.state.lock().await;
        let history = synthesize_history(
            &mut state.rng,
            payload.value,
            settings.history_cap,
            settings.seed_variation,
        );
        let record = KpiRecord {
            id: Uuid::new_v4().to_string(),
            trend: Trend::between(payload.previous_value, payload.value),
            name: payload.name,
            category: payload.category,
            unit: payload.unit,
            value: payload.value,
            previous_value: payload.previous_value,
            target: payload.target,
            history,
            last_updated: Utc::now(),
        };
        state.kpis.push(record.clone());
        tracing::info!(kpi_id = %record.id, name = %record.name, "kpi added");
        Ok(record)
    }

    /// Unknown ids are ignored so stale references from a torn-down view
    /// cannot fail.
    pub async fn remove_kpi(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.kpis.len();
        state.kpis.retain(|kpi| kpi.id != id);
        let removed = state.kpis.len() != before;
        if removed {
            tracing::info!(kpi_id = %id, "kpi removed");
        }
        removed
    }

    /// Unknown ids yield `Ok(None)`. Non-finite readings are rejected before
    /// anything is written.
    pub async fn update_kpi(&self, id: &str, patch: KpiPatch) -> AppResult<Option<KpiRecord>> {
        let readings = [patch.value, patch.previous_value];
        if readings.iter().flatten().any(|reading| !reading.is_finite()) {
            return Err(AppError::Validation("KPI readings must be finite numbers".to_string()));
        }

        let mut state = self.inner.state.lock().await;
        let Some(kpi) = state.kpis.iter_mut().find(|kpi| kpi.id == id) else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            kpi.name = name;
        }
        if let Some(category) = patch.category {
            kpi.category = category;
        }
        if let Some(unit) = patch.unit {
            kpi.unit = unit;
        }
        if let Some(value) = patch.value {
            kpi.value = value;
        }
        if let Some(previous_value) = patch.previous_value {
            kpi.previous_value = previous_value;
        }
        if let Some(target) = patch.target {
            kpi.target = target;
        }
        kpi.trend = Trend::between(kpi.previous_value, kpi.value);
        kpi.last_updated = Utc::now();
        tracing::info!(kpi_id = %id, "kpi updated");
        Ok(Some(kpi.clone()))
    }

    pub async fn add_data_source(&self, payload: NewDataSourcePayload) -> DataSourceRecord {
        let mut state = self.inner.state.lock().await;
        let record = new_data_source(payload);
        state.data_sources.push(record.clone());
        tracing::info!(source_id = %record.id, name = %record.name, "data source added");
        record
    }

    /// Adds a random sample file, provided `admit` accepts the position the
    /// new source would occupy.
    pub async fn import_sample_source<F>(&self, admit: F) -> AppResult<DataSourceRecord>
    where
        F: FnOnce(usize) -> bool,
    {
        let mut state = self.inner.state.lock().await;
        let position = state.data_sources.len() + 1;
        if !admit(position) {
            tracing::info!(position, "data source import denied by plan");
            return Err(AppError::Policy(
                "Your plan's data source limit has been reached. Upgrade to import more.".to_string(),
            ));
        }

        let samples = sample_imports();
        let pick = state.rng.random_range(0..samples.len());
        let Some(payload) = samples.into_iter().nth(pick) else {
            return Err(AppError::Internal("sample import catalog is empty".to_string()));
        };
        let record = new_data_source(payload);
        state.data_sources.push(record.clone());
        tracing::info!(source_id = %record.id, name = %record.name, "sample data source imported");
        Ok(record)
    }

    /// Removing a source leaves KPIs untouched; the two are not linked.
    pub async fn remove_data_source(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.data_sources.len();
        state.data_sources.retain(|source| source.id != id);
        let removed = state.data_sources.len() != before;
        if removed {
            tracing::info!(source_id = %id, "data source removed");
        }
        removed
    }
}

fn new_data_source(payload: NewDataSourcePayload) -> DataSourceRecord {
    DataSourceRecord {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        row_count: payload.row_count,
        column_count: payload.column_count,
        status: payload.status,
        last_updated: Utc::now(),
    }
}
