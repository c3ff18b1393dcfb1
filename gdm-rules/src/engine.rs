use std::collections::HashSet;

use gdm_protocol::catalog::{Currency, Product};
use tracing::debug;

use crate::action::RuleAction;
use crate::applier::{apply_action, splice};
use crate::cache::RequestCache;
use crate::composer::{Composer, RuleSource};
use crate::error::RuleError;
use crate::loader::load_rules;
use crate::outcome::RenderOutcome;
use crate::rule::{Rule, RuleId, Slot};
use crate::selector::{select, until_final};

/// Runtime executor that renders products against a set of rules.
#[derive(Debug, Default, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    currency: Currency,
}

impl RuleEngine {
    /// Construct an engine from the provided rules, sorting them by priority.
    ///
    /// The sort is stable, so equal priorities keep the order they were given in.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        Self {
            rules,
            currency: Currency::default(),
        }
    }

    /// Loads rules from the given path (file or directory).
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, RuleError> {
        let rules = load_rules(path)?;
        Ok(Self::new(rules))
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Borrow the underlying rule set.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Whether the engine contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applicable rules for the slot, before the final-rule cut.
    pub fn select(&self, slot: Slot, product: &Product, cache: &mut RequestCache) -> Vec<&Rule> {
        select(&self.rules, slot, product, cache)
    }

    /// Renders every slot and writes the results onto the product.
    pub fn apply(&self, product: &mut Product) -> RenderOutcome {
        let mut cache = RequestCache::new();
        self.apply_with_cache(product, &mut cache)
    }

    /// Same as [`RuleEngine::apply`] with a caller-owned request cache.
    pub fn apply_with_cache(&self, product: &mut Product, cache: &mut RequestCache) -> RenderOutcome {
        let original = product.clone();
        let composer = Composer::new(self, &self.currency);
        let mut outcome = RenderOutcome::new();

        for slot in Slot::RENDERED {
            let chain = until_final(self.select(slot, &original, cache));
            if chain.is_empty() {
                continue;
            }
            if let Some(last) = chain.last().filter(|rule| rule.is_final) {
                outcome.record_halt(slot, last.id);
            }

            if slot.is_text() {
                let mut current = text_field(&original, slot).to_string();
                for rule in chain {
                    let composed = composer.compose(rule, slot, &original, &mut HashSet::new(), 0);
                    current = splice(&current, &composed, rule.placement);
                    debug!(rule_id = rule.id, slot = slot.key(), "text rule applied");
                    outcome.record_rule(slot, rule.id);
                }
                set_text_field(product, slot, current);
                continue;
            }

            for rule in chain {
                let mut applied = false;
                for action in rule.actions_for(slot) {
                    let title = match action {
                        RuleAction::SetTitle { template, .. } => Some(composer.compose_title(rule, template, &original)),
                        _ => None,
                    };
                    apply_action(action, product, &original, title.as_deref());
                    applied = true;
                }

                if applied {
                    debug!(rule_id = rule.id, slot = slot.key(), "action rule applied");
                    outcome.record_rule(slot, rule.id);
                } else {
                    outcome.push_note(format!("rule {} targets {} but defines no action for it", rule.id, slot.key()));
                }
            }
        }

        outcome
    }

    /// Render without mutating the input, returning the rendered copy.
    pub fn evaluate(&self, product: &Product) -> (Product, RenderOutcome) {
        let mut clone = product.clone();
        let outcome = self.apply(&mut clone);
        (clone, outcome)
    }

    /// Composes one rule's template for a slot, ignoring its scope.
    pub fn preview(&self, rule: &Rule, slot: Slot, product: &Product) -> String {
        let composer = Composer::new(self, &self.currency);
        composer.compose(rule, slot, product, &mut HashSet::new(), 0)
    }
}

impl RuleSource for RuleEngine {
    fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule.id == id && rule.is_enabled())
    }
}

fn text_field(product: &Product, slot: Slot) -> &str {
    match slot {
        Slot::ShortDescription => &product.short_description,
        _ => &product.description,
    }
}

fn set_text_field(product: &mut Product, slot: Slot, value: String) {
    match slot {
        Slot::ShortDescription => product.short_description = value,
        _ => product.description = value,
    }
}
