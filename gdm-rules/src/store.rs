use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gdm_protocol::catalog::Currency;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rule::{Rule, RuleId, RuleStatus};
use crate::{RuleEngine, RuleError};

/// Versioned history entry for a stored rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleHistoryEntry {
    pub version: u32,
    pub rule: Rule,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl RuleHistoryEntry {
    fn new(version: u32, rule: Rule, updated_by: Option<String>) -> Self {
        Self {
            version,
            rule,
            created_at: Utc::now(),
            updated_by,
        }
    }
}

/// Status change performed by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleTransition {
    pub rule_id: RuleId,
    pub from: RuleStatus,
    pub to: RuleStatus,
    pub at: DateTime<Utc>,
}

/// Result of a bulk status change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkStatusReport {
    pub changed: Vec<RuleId>,
    pub unchanged: Vec<RuleId>,
    pub missing: Vec<RuleId>,
}

#[derive(Default)]
struct StoreInner {
    rules: BTreeMap<RuleId, Vec<RuleHistoryEntry>>,
    next_id: RuleId,
}

impl StoreInner {
    fn latest(&self, id: RuleId) -> Option<&RuleHistoryEntry> {
        self.rules.get(&id).and_then(|versions| versions.last())
    }

    fn push(&mut self, rule: Rule, updated_by: Option<String>) -> RuleHistoryEntry {
        self.next_id = self.next_id.max(rule.id);
        let history = self.rules.entry(rule.id).or_default();
        let version = history.last().map(|last| last.version + 1).unwrap_or(1);
        let entry = RuleHistoryEntry::new(version, rule, updated_by);
        history.push(entry.clone());
        entry
    }
}

/// In-memory typed rule store with version tracking. Writes are last-write-wins.
#[derive(Default, Clone)]
pub struct RuleStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl RuleStore {
    /// Creates a new empty rule store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given rules.
    pub fn with_rules(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let store = Self::new();
        for rule in rules {
            store.put_rule(rule, Some("seed".into()))?;
        }
        Ok(store)
    }

    /// Latest versions of every rule, ordered by priority then id.
    pub fn list(&self) -> Vec<RuleHistoryEntry> {
        let inner = self.inner.read();
        let mut entries: Vec<RuleHistoryEntry> = inner
            .rules
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect();
        entries.sort_by_key(|entry| entry.rule.priority);
        entries
    }

    /// Latest rule definitions, in the same order as [`RuleStore::list`].
    pub fn export(&self) -> Vec<Rule> {
        self.list().into_iter().map(|entry| entry.rule).collect()
    }

    pub fn get(&self, id: RuleId) -> Option<RuleHistoryEntry> {
        self.inner.read().latest(id).cloned()
    }

    /// Returns the full history for a specific rule.
    pub fn history(&self, id: RuleId) -> Vec<RuleHistoryEntry> {
        self.inner.read().rules.get(&id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or updates a rule, returning the new history entry.
    ///
    /// A rule with id `0` receives the next free id.
    pub fn put_rule(&self, mut rule: Rule, updated_by: Option<String>) -> Result<RuleHistoryEntry, RuleError> {
        let mut inner = self.inner.write();
        if rule.id == 0 {
            rule.id = inner
                .next_id
                .checked_add(1)
                .ok_or_else(|| RuleError::invalid(0, "no free rule id left after the highest stored id"))?;
        }
        Ok(inner.push(rule, updated_by))
    }

    /// Removes a rule and its history.
    pub fn delete(&self, id: RuleId) -> Result<Rule, RuleError> {
        let mut inner = self.inner.write();
        inner
            .rules
            .remove(&id)
            .and_then(|mut versions| versions.pop())
            .map(|entry| entry.rule)
            .ok_or(RuleError::NotFound(id))
    }

    /// Sets the status, appending a version only when it changes.
    pub fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
        updated_by: Option<String>,
    ) -> Result<RuleHistoryEntry, RuleError> {
        let mut inner = self.inner.write();
        let latest = inner.latest(id).cloned().ok_or(RuleError::NotFound(id))?;
        if latest.rule.status == status {
            return Ok(latest);
        }

        let mut rule = latest.rule;
        rule.status = status;
        Ok(inner.push(rule, updated_by))
    }

    /// Flips the status of a rule.
    pub fn toggle(&self, id: RuleId, updated_by: Option<String>) -> Result<RuleHistoryEntry, RuleError> {
        let current = self.get(id).ok_or(RuleError::NotFound(id))?;
        self.set_status(id, current.rule.status.toggled(), updated_by)
    }

    pub fn bulk_set_status(&self, ids: &[RuleId], status: RuleStatus, updated_by: Option<String>) -> BulkStatusReport {
        let mut report = BulkStatusReport::default();
        for id in ids {
            let before = match self.get(*id) {
                Some(entry) => entry.version,
                None => {
                    report.missing.push(*id);
                    continue;
                }
            };
            match self.set_status(*id, status, updated_by.clone()) {
                Ok(entry) if entry.version != before => report.changed.push(*id),
                Ok(_) => report.unchanged.push(*id),
                Err(_) => report.missing.push(*id),
            }
        }
        report
    }

    /// Enables/disables rules whose schedule boundary has been reached.
    pub fn apply_schedules(&self, now: DateTime<Utc>) -> Vec<ScheduleTransition> {
        let mut inner = self.inner.write();
        let candidates: Vec<Rule> = inner
            .rules
            .values()
            .filter_map(|versions| versions.last())
            .map(|entry| entry.rule.clone())
            .collect();

        let mut transitions = Vec::new();
        for mut rule in candidates {
            let Some(next) = rule.schedule.transition(rule.status, now) else {
                continue;
            };

            let from = rule.status;
            rule.status = next;
            if next == RuleStatus::Habilitada {
                rule.schedule.fired_at = Some(now);
            }
            info!(rule_id = rule.id, ?from, to = ?next, "schedule transition");
            transitions.push(ScheduleTransition {
                rule_id: rule.id,
                from,
                to: next,
                at: now,
            });
            inner.push(rule, Some("scheduler".into()));
        }

        transitions
    }

    /// Builds a rule engine using the rules active at `now`.
    pub fn engine_for(&self, now: DateTime<Utc>) -> RuleEngine {
        let rules = self
            .export()
            .into_iter()
            .filter(|rule| rule.is_active(now))
            .collect();
        RuleEngine::new(rules)
    }

    pub fn engine_with_currency(&self, now: DateTime<Utc>, currency: Currency) -> RuleEngine {
        self.engine_for(now).with_currency(currency)
    }
}
