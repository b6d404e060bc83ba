use crate::models::{
    BillingInterval, DataSourceRecord, DataSourceStatus, KpiRecord, NewDataSourcePayload, SubscriptionPlan, Trend,
};
use crate::simulation::synthesize_history;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::Rng;

pub const FREE_PLAN_ID: &str = "free";
pub const PREMIUM_PLAN_ID: &str = "premium";

static PLAN_CATALOG: Lazy<Vec<SubscriptionPlan>> = Lazy::new(|| {
    vec![
        SubscriptionPlan {
            id: FREE_PLAN_ID.to_string(),
            name: "Free".to_string(),
            price: 0.0,
            interval: BillingInterval::Monthly,
            max_kpis: 3,
            max_data_sources: 1,
            features: ["Basic KPIs", "Excel Import", "Basic Charts"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        },
        SubscriptionPlan {
            id: PREMIUM_PLAN_ID.to_string(),
            name: "Premium".to_string(),
            price: 9.99,
            interval: BillingInterval::Monthly,
            max_kpis: 20,
            max_data_sources: 5,
            features: ["Advanced KPIs", "Multiple Data Sources", "Advanced Charts"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        },
    ]
});

pub fn plan_catalog() -> Vec<SubscriptionPlan> {
    PLAN_CATALOG.clone()
}

struct KpiSeed {
    id: &'static str,
    name: &'static str,
    value: f64,
    previous_value: f64,
    unit: &'static str,
    trend: Trend,
    category: &'static str,
    target: f64,
}

const KPI_SEEDS: [KpiSeed; 6] = [
    KpiSeed {
        id: "1",
        name: "Monthly Revenue",
        value: 125_000.0,
        previous_value: 118_000.0,
        unit: "$",
        trend: Trend::Up,
        category: "Financial",
        target: 130_000.0,
    },
    KpiSeed {
        id: "2",
        name: "Active Users",
        value: 2_850.0,
        previous_value: 2_920.0,
        unit: "",
        trend: Trend::Down,
        category: "User Metrics",
        target: 3_000.0,
    },
    KpiSeed {
        id: "3",
        name: "Conversion Rate",
        value: 3.2,
        previous_value: 3.1,
        unit: "%",
        trend: Trend::Up,
        category: "Performance",
        target: 3.5,
    },
    KpiSeed {
        id: "4",
        name: "Customer Satisfaction",
        value: 4.3,
        previous_value: 4.1,
        unit: "/5",
        trend: Trend::Up,
        category: "Quality",
        target: 4.5,
    },
    KpiSeed {
        id: "5",
        name: "Support Tickets",
        value: 142.0,
        previous_value: 158.0,
        unit: "",
        trend: Trend::Down,
        category: "Operations",
        target: 120.0,
    },
    KpiSeed {
        id: "6",
        name: "Website Traffic",
        value: 15_420.0,
        previous_value: 14_800.0,
        unit: "visits",
        trend: Trend::Up,
        category: "Marketing",
        target: 16_000.0,
    },
];

pub fn seed_kpis<R: Rng + ?Sized>(rng: &mut R, history_len: usize, variation: f64) -> Vec<KpiRecord> {
    let now = Utc::now();
    KPI_SEEDS
        .iter()
        .map(|seed| KpiRecord {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            category: seed.category.to_string(),
            unit: seed.unit.to_string(),
            value: seed.value,
            previous_value: seed.previous_value,
            trend: seed.trend,
            target: Some(seed.target),
            history: synthesize_history(rng, seed.value, history_len, variation),
            last_updated: now,
        })
        .collect()
}

pub fn seed_data_sources() -> Vec<DataSourceRecord> {
    [
        ("1", "Q4 Sales Data.xlsx", 250u64, 8u64, DataSourceStatus::Active, (2024, 1, 15)),
        ("2", "User Analytics.xlsx", 1_500, 12, DataSourceStatus::Active, (2024, 1, 10)),
        ("3", "Financial Report.xlsx", 89, 15, DataSourceStatus::Inactive, (2024, 1, 8)),
    ]
    .into_iter()
    .map(|(id, name, row_count, column_count, status, (year, month, day))| DataSourceRecord {
        id: id.to_string(),
        name: name.to_string(),
        row_count,
        column_count,
        status,
        last_updated: utc_midnight(year, month, day),
    })
    .collect()
}

/// Files offered by the simulated spreadsheet import.
pub fn sample_imports() -> [NewDataSourcePayload; 3] {
    [
        NewDataSourcePayload {
            name: "Marketing Data.xlsx".to_string(),
            row_count: 500,
            column_count: 10,
            status: DataSourceStatus::Active,
        },
        NewDataSourcePayload {
            name: "HR Analytics.xlsx".to_string(),
            row_count: 200,
            column_count: 6,
            status: DataSourceStatus::Processing,
        },
        NewDataSourcePayload {
            name: "Customer Survey.xlsx".to_string(),
            row_count: 1_200,
            column_count: 15,
            status: DataSourceStatus::Active,
        },
    ]
}

fn utc_midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::{plan_catalog, seed_data_sources, seed_kpis, FREE_PLAN_ID};
    use crate::metrics::percent_change;
    use crate::models::Trend;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seeds_six_kpis_with_full_history() {
        let mut rng = StdRng::seed_from_u64(3);
        let kpis = seed_kpis(&mut rng, 30, 0.2);
        assert_eq!(kpis.len(), 6);
        assert!(kpis.iter().all(|kpi| kpi.history.len() == 30));
        for kpi in &kpis {
            assert_eq!(kpi.trend, Trend::between(kpi.previous_value, kpi.value));
        }
        assert_eq!(percent_change(kpis[0].value, kpis[0].previous_value), 5.9);
    }

    #[test]
    fn seed_sources_and_plans() {
        let sources = seed_data_sources();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].last_updated.format("%Y-%m-%d").to_string(), "2024-01-15");

        let plans = plan_catalog();
        assert_eq!(plans[0].id, FREE_PLAN_ID);
        assert_eq!(plans[0].max_kpis, 3);
        assert_eq!(plans[1].max_data_sources, 5);
    }
}
