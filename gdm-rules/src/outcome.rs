use std::collections::BTreeMap;

use serde::Serialize;

use crate::rule::{RuleId, Slot};

/// Aggregated view of how rules affected a product during one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderOutcome {
    /// Rules applied per slot, in application order.
    pub applied: BTreeMap<Slot, Vec<RuleId>>,
    /// Final rule that stopped processing for a slot.
    pub halted_by: BTreeMap<Slot, RuleId>,
    pub notes: Vec<String>,
}

impl RenderOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rule(&mut self, slot: Slot, id: RuleId) {
        self.applied.entry(slot).or_default().push(id);
    }

    pub fn record_halt(&mut self, slot: Slot, id: RuleId) {
        self.halted_by.insert(slot, id);
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn applied_to(&self, slot: Slot) -> &[RuleId] {
        self.applied.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
