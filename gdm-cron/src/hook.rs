use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gdm_rules::RuleStore;
use tracing::info;

use crate::runtime::ScheduleHook;

/// Applies rule activation windows against the shared store.
#[derive(Clone)]
pub struct RuleScheduleHook {
    store: RuleStore,
}

impl RuleScheduleHook {
    pub fn new(store: RuleStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ScheduleHook for RuleScheduleHook {
    async fn run(&self, now: DateTime<Utc>) -> Result<usize, String> {
        let transitions = self.store.apply_schedules(now);
        for transition in &transitions {
            info!(
                rule_id = transition.rule_id,
                from = ?transition.from,
                to = ?transition.to,
                "schedule transition"
            );
        }
        Ok(transitions.len())
    }
}
