use crate::errors::{AppError, AppResult};
use crate::gate::{self, GateScope};
use crate::models::{SubscriptionPlan, SubscriptionTier};
use crate::seed::{plan_catalog, FREE_PLAN_ID};
use std::sync::{Arc, RwLock};

/// Plan catalog plus the plan currently in force. Cloning shares state.
#[derive(Clone)]
pub struct SubscriptionService {
    plans: Arc<Vec<SubscriptionPlan>>,
    current: Arc<RwLock<Option<SubscriptionPlan>>>,
}

impl Default for SubscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionService {
    pub fn new() -> Self {
        let plans = plan_catalog();
        let current = plans.iter().find(|plan| plan.id == FREE_PLAN_ID).cloned();
        Self::with_catalog(plans, current)
    }

    pub fn with_catalog(plans: Vec<SubscriptionPlan>, current: Option<SubscriptionPlan>) -> Self {
        Self {
            plans: Arc::new(plans),
            current: Arc::new(RwLock::new(current)),
        }
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    pub fn current_plan(&self) -> Option<SubscriptionPlan> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_current(&self, plan: Option<SubscriptionPlan>) {
        let mut writer = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *writer = plan;
    }

    /// Activates the catalog plan matching `tier`. Tiers without a catalog
    /// entry leave no plan active, so every gate query denies.
    pub fn apply_tier(&self, tier: SubscriptionTier) -> Option<SubscriptionPlan> {
        let plan = self.plans.iter().find(|plan| plan.id == tier.as_str()).cloned();
        if plan.is_none() {
            tracing::warn!(tier = tier.as_str(), "no plan for subscription tier; gating fails closed");
        }
        self.set_current(plan.clone());
        plan
    }

    pub fn clear(&self) {
        self.set_current(None);
    }

    /// Switching to a paid plan needs a payment flow that does not exist here.
    pub fn select_plan(&self, plan_id: &str) -> AppResult<SubscriptionPlan> {
        let plan = self
            .plans
            .iter()
            .find(|plan| plan.id == plan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Subscription plan {} not found", plan_id)))?;

        let current = self.current_plan();
        if current.as_ref().is_some_and(|active| active.id == plan.id) {
            return Ok(plan);
        }
        if plan.price > 0.0 {
            return Err(AppError::Policy(format!(
                "Upgrading to {} requires payment processing, which is not available",
                plan.name
            )));
        }

        self.set_current(Some(plan.clone()));
        tracing::info!(plan_id = %plan.id, "subscription plan changed");
        Ok(plan)
    }

    pub fn has_feature(&self, name: &str) -> bool {
        gate::plan_has_feature(self.current_plan().as_ref(), name)
    }

    pub fn can_access_kpi(&self, position: usize) -> bool {
        gate::can_access(self.current_plan().as_ref(), GateScope::Kpis, position)
    }

    pub fn can_access_data_source(&self, position: usize) -> bool {
        gate::can_access(self.current_plan().as_ref(), GateScope::DataSources, position)
    }

    pub fn partition<T>(&self, scope: GateScope, items: Vec<T>) -> (Vec<T>, usize) {
        gate::partition(self.current_plan().as_ref(), scope, items)
    }

    pub fn remaining_slots(&self, scope: GateScope, used: usize) -> Option<i64> {
        gate::remaining_slots(self.current_plan().as_ref(), scope, used)
    }
}
