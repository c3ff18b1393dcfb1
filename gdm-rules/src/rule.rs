use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use gdm_core::serde_utils::{lenient_bool, lenient_i32};
use serde::{Deserialize, Serialize};

use crate::action::RuleAction;
use crate::condition::Scope;
use crate::error::RuleError;
use crate::variant::{Variant, VariantMode};

/// Numeric rule identifier, as referenced by `[rule-<id>]` tokens.
pub type RuleId = u64;

/// Part of a product a rule may modify.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    #[serde(alias = "descripcion")]
    LongDescription,
    #[serde(alias = "descripcion_corta")]
    ShortDescription,
    #[serde(alias = "titulo")]
    Title,
    #[serde(alias = "precio")]
    Price,
    #[serde(alias = "galeria")]
    Gallery,
    #[serde(alias = "destacado")]
    Featured,
    /// Not a render target: marks a rule as includable through `[rule-<id>]`.
    #[serde(alias = "reutilizable")]
    Reusable,
}

impl Slot {
    /// Slots the engine renders, in application order.
    pub const RENDERED: [Slot; 6] = [
        Slot::LongDescription,
        Slot::ShortDescription,
        Slot::Title,
        Slot::Price,
        Slot::Gallery,
        Slot::Featured,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Slot::LongDescription => "long_description",
            Slot::ShortDescription => "short_description",
            Slot::Title => "title",
            Slot::Price => "price",
            Slot::Gallery => "gallery",
            Slot::Featured => "featured",
            Slot::Reusable => "reusable",
        }
    }

    pub fn from_key(key: &str) -> Option<Slot> {
        serde_json::from_value(serde_json::Value::String(key.trim().to_string())).ok()
    }

    /// Text slots accumulate content across rules instead of last-wins.
    pub fn is_text(&self) -> bool {
        matches!(self, Slot::LongDescription | Slot::ShortDescription)
    }
}

/// How composed text is spliced into the existing content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    #[serde(alias = "reemplazar")]
    Replace,
    #[serde(alias = "antes")]
    Prepend,
    #[serde(alias = "despues")]
    Append,
    #[serde(alias = "solo_vacio")]
    IfEmpty,
}

/// Lifecycle toggle of a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    #[serde(alias = "enabled")]
    Habilitada,
    #[serde(alias = "disabled")]
    Deshabilitada,
}

impl RuleStatus {
    pub fn toggled(self) -> Self {
        match self {
            RuleStatus::Habilitada => RuleStatus::Deshabilitada,
            RuleStatus::Deshabilitada => RuleStatus::Habilitada,
        }
    }
}

/// Optional activation window driven by the hourly scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Last time the scheduler enabled the rule because `start` arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fired_at: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            enabled: true,
            start,
            end,
            fired_at: None,
        }
    }

    /// Whether `now` falls inside `[start, end)`. A disabled schedule never restricts.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let started = self.start.map_or(true, |start| start <= now);
        let not_ended = self.end.map_or(true, |end| now < end);
        started && not_ended
    }

    /// Status the scheduler should move the rule to, if any.
    ///
    /// The start edge fires once per configured start: after it fired, a
    /// manual disable inside the window is left alone.
    pub fn transition(&self, status: RuleStatus, now: DateTime<Utc>) -> Option<RuleStatus> {
        if !self.enabled {
            return None;
        }

        let ended = self.end.map_or(false, |end| now >= end);
        match status {
            RuleStatus::Habilitada if ended => Some(RuleStatus::Deshabilitada),
            RuleStatus::Deshabilitada if !ended => {
                let start = self.start?;
                let already_fired = self.fired_at.map_or(false, |fired| fired >= start);
                (now >= start && !already_fired).then_some(RuleStatus::Habilitada)
            }
            _ => None,
        }
    }
}

/// Stored rule: scope, slots, templates, variants and actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Identifier. `0` asks the store to allocate one.
    #[serde(default)]
    pub id: RuleId,
    #[serde(default)]
    pub title: String,
    /// Ordering priority. Lower numbers are evaluated first.
    #[serde(default = "Rule::default_priority", deserialize_with = "lenient_i32")]
    pub priority: i32,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub applies_to: BTreeSet<Slot>,
    /// Stop processing later rules for the slot once this one is composed.
    #[serde(default, alias = "final", deserialize_with = "lenient_bool")]
    pub is_final: bool,
    /// Forced matches shadow every non-forced match for the slot.
    #[serde(default, alias = "forzada", deserialize_with = "lenient_bool")]
    pub forced: bool,
    #[serde(default)]
    pub scope: Scope,
    /// Main template, used by description slots and by nested inclusion.
    #[serde(default)]
    pub content: String,
    /// Per-slot template overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<Slot, String>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub variant_mode: VariantMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<RuleAction>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            priority: Rule::default_priority(),
            status: RuleStatus::Habilitada,
            schedule: Schedule::default(),
            applies_to: BTreeSet::new(),
            is_final: false,
            forced: false,
            scope: Scope::default(),
            content: String::new(),
            templates: BTreeMap::new(),
            placement: Placement::Replace,
            variants: Vec::new(),
            variant_mode: VariantMode::FirstMatch,
            actions: Vec::new(),
        }
    }
}

impl Rule {
    pub fn new(id: RuleId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn default_priority() -> i32 {
        10
    }

    pub fn is_enabled(&self) -> bool {
        self.status == RuleStatus::Habilitada
    }

    /// Enabled and inside its schedule window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_enabled() && self.schedule.contains(now)
    }

    pub fn applies_to_slot(&self, slot: Slot) -> bool {
        self.applies_to.contains(&slot)
    }

    pub fn is_reusable(&self) -> bool {
        self.applies_to.contains(&Slot::Reusable)
    }

    /// Reusable-only rules are reachable through `[rule-<id>]` and nothing else.
    pub fn is_reusable_only(&self) -> bool {
        self.applies_to.len() == 1 && self.is_reusable()
    }

    /// Template for the slot, falling back to the main content.
    pub fn template_for(&self, slot: Slot) -> &str {
        self.templates
            .get(&slot)
            .filter(|template| !template.trim().is_empty())
            .map(String::as_str)
            .unwrap_or(&self.content)
    }

    pub fn actions_for(&self, slot: Slot) -> impl Iterator<Item = &RuleAction> {
        self.actions
            .iter()
            .filter(move |action| action.slot() == slot)
    }

    /// Checks invariants enforced when a rule is saved.
    pub fn validate(&self) -> Result<(), RuleError> {
        for (index, variant) in self.variants.iter().enumerate() {
            variant
                .validate()
                .map_err(|message| RuleError::invalid(self.id, format!("variant {index}: {message}")))?;
        }

        for action in &self.actions {
            action
                .validate()
                .map_err(|message| RuleError::invalid(self.id, message))?;
        }

        if let (Some(start), Some(end)) = (self.schedule.start, self.schedule.end) {
            if self.schedule.enabled && end <= start {
                return Err(RuleError::invalid(
                    self.id,
                    "schedule end must be after its start",
                ));
            }
        }

        Ok(())
    }
}
