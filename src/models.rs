use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Self::Up
        } else if current < previous {
            Self::Down
        } else {
            Self::Stable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub value: f64,
    pub previous_value: f64,
    pub trend: Trend,
    pub target: Option<f64>,
    pub history: Vec<f64>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKpiPayload {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub value: f64,
    pub previous_value: f64,
    pub target: Option<f64>,
}

/// Partial update for a KPI. `id`, `history` and `trend` are not patchable;
/// trend is re-derived from the patched readings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub value: Option<f64>,
    pub previous_value: Option<f64>,
    pub target: Option<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSourceStatus {
    Active,
    Processing,
    Inactive,
}

impl DataSourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceRecord {
    pub id: String,
    pub name: String,
    pub row_count: u64,
    pub column_count: u64,
    pub status: DataSourceStatus,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataSourcePayload {
    pub name: String,
    pub row_count: u64,
    pub column_count: u64,
    pub status: DataSourceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub interval: BillingInterval,
    pub max_kpis: i64,
    pub max_data_sources: i64,
    pub features: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub subscription: SubscriptionTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceStatus {
    Achieved,
    OnTrack,
    BelowTarget,
}

/// A KPI with the read-side metrics the dashboard renders next to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiView {
    pub record: KpiRecord,
    pub display_value: String,
    pub percent_change: f64,
    pub target_progress: f64,
    pub stats: Option<RollingStats>,
    pub weekly_change: Option<f64>,
    pub performance: Option<PerformanceStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub improving: usize,
    pub declining: usize,
    pub stable: usize,
    pub on_target: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub plan_name: Option<String>,
    pub total: usize,
    pub visible: Vec<KpiView>,
    pub locked_count: usize,
    pub summary: TrendSummary,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceView {
    pub record: DataSourceRecord,
    pub cell_count: u64,
    pub days_since_update: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceOverview {
    pub sources: Vec<DataSourceView>,
    pub total_rows: u64,
    /// `None` means the plan is unlimited.
    pub remaining_slots: Option<i64>,
    pub at_capacity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub tick_interval_ms: u64,
    pub refresh_latency_ms: u64,
    pub login_latency_ms: u64,
    pub history_cap: usize,
    pub tick_variation: f64,
    pub refresh_variation: f64,
    pub seed_variation: f64,
    pub log_dir: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30_000,
            refresh_latency_ms: 1_500,
            login_latency_ms: 1_000,
            history_cap: 30,
            tick_variation: 0.05,
            refresh_variation: 0.1,
            seed_variation: 0.2,
            log_dir: None,
        }
    }
}
