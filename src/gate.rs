//! Tier gate: decides which ordinal items a subscription plan unlocks.
//!
//! Positions are 1-based ranks in the current list order, not identifiers.
//! Every plan-aware query fails closed when no plan is active.

use crate::models::{SubscriptionPlan, UNLIMITED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateScope {
    Kpis,
    DataSources,
}

impl GateScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kpis => "kpis",
            Self::DataSources => "data-sources",
        }
    }

    fn cap(self, plan: &SubscriptionPlan) -> i64 {
        match self {
            Self::Kpis => plan.max_kpis,
            Self::DataSources => plan.max_data_sources,
        }
    }
}

pub fn is_visible(position: usize, cap: i64) -> bool {
    if position == 0 {
        return false;
    }
    cap == UNLIMITED || (cap > 0 && position as u64 <= cap as u64)
}

pub fn visible_count(total: usize, cap: i64) -> usize {
    if cap == UNLIMITED {
        return total;
    }
    total.min(cap.max(0) as usize)
}

pub fn locked_count(total: usize, cap: i64) -> usize {
    total - visible_count(total, cap)
}

pub fn has_feature<'a, I>(features: I, name: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    features.into_iter().any(|feature| feature == name)
}

pub fn can_access(plan: Option<&SubscriptionPlan>, scope: GateScope, position: usize) -> bool {
    let Some(plan) = plan else {
        tracing::debug!(scope = scope.as_str(), position, "gate denied: no active plan");
        return false;
    };
    is_visible(position, scope.cap(plan))
}

pub fn plan_has_feature(plan: Option<&SubscriptionPlan>, name: &str) -> bool {
    plan.is_some_and(|plan| has_feature(&plan.features, name))
}

/// Splits `items` into the unlocked prefix and the number of locked items.
pub fn partition<T>(plan: Option<&SubscriptionPlan>, scope: GateScope, items: Vec<T>) -> (Vec<T>, usize) {
    let total = items.len();
    let visible = items
        .into_iter()
        .enumerate()
        .filter(|(index, _)| can_access(plan, scope, index + 1))
        .map(|(_, item)| item)
        .collect::<Vec<_>>();
    let locked = total - visible.len();
    (visible, locked)
}

/// `None` for unlimited plans. Without a plan nothing remains.
pub fn remaining_slots(plan: Option<&SubscriptionPlan>, scope: GateScope, used: usize) -> Option<i64> {
    let Some(plan) = plan else {
        return Some(0);
    };
    let cap = scope.cap(plan);
    if cap == UNLIMITED {
        return None;
    }
    Some((cap - used as i64).max(0))
}

#[cfg(test)]
mod tests {
    use super::{
        can_access, has_feature, is_visible, locked_count, partition, plan_has_feature, remaining_slots,
        visible_count, GateScope,
    };
    use crate::models::{BillingInterval, SubscriptionPlan, UNLIMITED};

    fn plan(max_kpis: i64, max_data_sources: i64) -> SubscriptionPlan {
        SubscriptionPlan {
            id: "test".to_string(),
            name: "Test".to_string(),
            price: 0.0,
            interval: BillingInterval::Monthly,
            max_kpis,
            max_data_sources,
            features: ["Basic KPIs".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn unlimited_admits_any_position() {
        for position in [1, 2, 100, 1_000_000] {
            assert!(is_visible(position, UNLIMITED));
        }
    }

    #[test]
    fn cap_of_three_admits_first_three() {
        assert!(is_visible(1, 3));
        assert!(is_visible(3, 3));
        assert!(!is_visible(4, 3));
        assert!(!is_visible(0, 3));
        assert!(!is_visible(1, 0));
    }

    #[test]
    fn counts_split_total() {
        assert_eq!(visible_count(6, 3), 3);
        assert_eq!(locked_count(6, 3), 3);
        assert_eq!(visible_count(2, 3), 2);
        assert_eq!(locked_count(6, UNLIMITED), 0);
    }

    #[test]
    fn free_plan_partitions_six_items() {
        let free = plan(3, 1);
        let (visible, locked) = partition(Some(&free), GateScope::Kpis, vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(visible, vec!["a", "b", "c"]);
        assert_eq!(locked, 3);
    }

    #[test]
    fn missing_plan_denies_everything() {
        assert!(!can_access(None, GateScope::Kpis, 1));
        assert!(!can_access(None, GateScope::DataSources, 1));
        assert!(!plan_has_feature(None, "Basic KPIs"));
        let (visible, locked) = partition::<u8>(None, GateScope::Kpis, vec![1, 2]);
        assert!(visible.is_empty());
        assert_eq!(locked, 2);
        assert_eq!(remaining_slots(None, GateScope::DataSources, 0), Some(0));
    }

    #[test]
    fn features_are_set_membership() {
        let free = plan(3, 1);
        assert!(has_feature(&free.features, "Basic KPIs"));
        assert!(!has_feature(&free.features, "Advanced Charts"));
        assert!(plan_has_feature(Some(&free), "Basic KPIs"));
    }

    #[test]
    fn remaining_slots_saturate() {
        let free = plan(3, 1);
        assert_eq!(remaining_slots(Some(&free), GateScope::DataSources, 0), Some(1));
        assert_eq!(remaining_slots(Some(&free), GateScope::DataSources, 3), Some(0));
        assert_eq!(remaining_slots(Some(&plan(UNLIMITED, UNLIMITED)), GateScope::Kpis, 50), None);
    }
}
