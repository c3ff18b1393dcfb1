use gdm_protocol::catalog::Product;
use tracing::debug;

use crate::cache::RequestCache;
use crate::condition::matches;
use crate::rule::{Rule, Slot};

/// Rules applicable to `slot` for `product`, in priority order.
///
/// Disabled and reusable-only rules are skipped. When any surviving rule is
/// forced, only the forced rules are kept. Equal priorities keep the order
/// of `rules`.
pub fn select<'r>(rules: &'r [Rule], slot: Slot, product: &Product, cache: &mut RequestCache) -> Vec<&'r Rule> {
    let mut selected: Vec<&Rule> = rules
        .iter()
        .filter(|rule| rule.is_enabled())
        .filter(|rule| !rule.is_reusable_only())
        .filter(|rule| rule.applies_to_slot(slot))
        .filter(|rule| matches(rule, product, cache))
        .collect();

    selected.sort_by_key(|rule| rule.priority);

    if selected.iter().any(|rule| rule.forced) {
        selected.retain(|rule| rule.forced);
        debug!(slot = slot.key(), count = selected.len(), "forced rules shadow other matches");
    }

    selected
}

/// Cuts the list right after the first final rule.
pub fn until_final<'r>(mut rules: Vec<&'r Rule>) -> Vec<&'r Rule> {
    if let Some(position) = rules.iter().position(|rule| rule.is_final) {
        rules.truncate(position + 1);
    }
    rules
}
