use crate::auth::demo::DemoVerifier;
use crate::auth::{AuthService, CredentialVerifier};
use crate::config::merge_settings;
use crate::errors::{AppError, AppResult};
use crate::gate::GateScope;
use crate::metrics::{kpi_view, summarize};
use crate::models::{
    AppSettings, DashboardView, DataSourceOverview, DataSourceRecord, DataSourceView, KpiPatch, KpiRecord, KpiView,
    NewDataSourcePayload, NewKpiPayload, RegisterPayload, SubscriptionPlan, User,
};
use crate::store::DataStore;
use crate::subscription::SubscriptionService;
use chrono::Utc;
use std::sync::{Arc, RwLock};

/// Composition root handed to the presentation layer. Owns the three
/// services and ties the live feed to the signed-in session.
#[derive(Clone)]
pub struct DashboardCore {
    auth: AuthService,
    subscription: SubscriptionService,
    store: DataStore,
    settings: Arc<RwLock<AppSettings>>,
}

impl DashboardCore {
    pub fn new(settings: AppSettings, verifier: Arc<dyn CredentialVerifier>, store: DataStore) -> Self {
        Self {
            auth: AuthService::new(verifier),
            subscription: SubscriptionService::new(),
            store,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Demo wiring: stub verifier and a freshly seeded store.
    pub fn demo(settings: AppSettings) -> Self {
        let verifier = Arc::new(DemoVerifier::new(settings.login_latency_ms));
        let store = DataStore::new(settings.clone());
        Self::new(settings, verifier, store)
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn subscription(&self) -> &SubscriptionService {
        &self.subscription
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn settings(&self) -> AppSettings {
        self.settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub async fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let updated = merge_settings(&self.settings(), update)?;
        {
            let mut writer = self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *writer = updated.clone();
        }
        self.auth.apply_settings(&updated);
        self.store.apply_settings(updated.clone()).await;
        tracing::info!("settings updated");
        Ok(updated)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self.auth.login(email, password).await?;
        self.activate(&user);
        Ok(user)
    }

    pub async fn register(&self, payload: &RegisterPayload) -> AppResult<User> {
        let user = self.auth.register(payload).await?;
        self.activate(&user);
        Ok(user)
    }

    fn activate(&self, user: &User) {
        self.subscription.apply_tier(user.subscription);
        self.store.start_live_updates();
    }

    /// Disarms the live feed before the session goes away.
    pub async fn sign_out(&self) -> Option<User> {
        self.store.stop_live_updates().await;
        self.subscription.clear();
        self.auth.logout().await
    }

    pub async fn shutdown(&self) {
        if self.store.stop_live_updates().await {
            tracing::info!("dashboard core shut down");
        }
    }

    pub async fn refresh(&self) {
        self.store.refresh().await;
    }

    pub async fn dashboard(&self) -> DashboardView {
        let kpis = self.store.kpis().await;
        let total = kpis.len();
        let plan = self.subscription.current_plan();
        let (visible, locked_count) = self.subscription.partition(GateScope::Kpis, kpis);

        DashboardView {
            plan_name: plan.map(|plan| plan.name),
            total,
            summary: summarize(&visible),
            visible: visible.iter().map(kpi_view).collect(),
            locked_count,
            is_loading: self.store.is_loading(),
        }
    }

    /// Detail view for one KPI. A KPI past the plan's cap is refused.
    pub async fn kpi_detail(&self, id: &str) -> AppResult<KpiView> {
        let kpis = self.store.kpis().await;
        let (index, record) = kpis
            .iter()
            .enumerate()
            .find(|(_, kpi)| kpi.id == id)
            .ok_or_else(|| AppError::NotFound(format!("KPI {} not found", id)))?;

        if !self.subscription.can_access_kpi(index + 1) {
            return Err(AppError::Policy(format!("KPI {} is locked on the current plan", id)));
        }
        Ok(kpi_view(record))
    }

    pub async fn add_kpi(&self, payload: NewKpiPayload) -> AppResult<KpiRecord> {
        self.store.add_kpi(payload).await
    }

    pub async fn update_kpi(&self, id: &str, patch: KpiPatch) -> AppResult<Option<KpiRecord>> {
        self.store.update_kpi(id, patch).await
    }

    pub async fn remove_kpi(&self, id: &str) -> bool {
        self.store.remove_kpi(id).await
    }

    pub async fn add_data_source(&self, payload: NewDataSourcePayload) -> DataSourceRecord {
        self.store.add_data_source(payload).await
    }

    pub async fn remove_data_source(&self, id: &str) -> bool {
        self.store.remove_data_source(id).await
    }

    pub async fn import_sample_source(&self) -> AppResult<DataSourceRecord> {
        let subscription = self.subscription.clone();
        self.store
            .import_sample_source(move |position| subscription.can_access_data_source(position))
            .await
    }

    pub async fn data_source_overview(&self) -> DataSourceOverview {
        let sources = self.store.data_sources().await;
        let now = Utc::now();
        let total_rows = sources.iter().map(|source| source.row_count).sum();
        let remaining_slots = self.subscription.remaining_slots(GateScope::DataSources, sources.len());

        DataSourceOverview {
            total_rows,
            at_capacity: remaining_slots == Some(0),
            remaining_slots,
            sources: sources
                .into_iter()
                .map(|record| DataSourceView {
                    cell_count: record.row_count.saturating_mul(record.column_count),
                    days_since_update: (now - record.last_updated).num_days(),
                    record,
                })
                .collect(),
        }
    }

    pub fn plans(&self) -> Vec<SubscriptionPlan> {
        self.subscription.plans().to_vec()
    }

    /// Plan changes belong to a session; without one the gate stays closed.
    pub async fn select_plan(&self, plan_id: &str) -> AppResult<SubscriptionPlan> {
        if self.auth.current_user().await.is_none() {
            return Err(AppError::Auth("Sign in to change your subscription plan".to_string()));
        }
        self.subscription.select_plan(plan_id)
    }
}
