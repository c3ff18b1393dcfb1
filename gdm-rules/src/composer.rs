//! Template expansion for rule content.
//!
//! A template goes through three passes: the selected variant is placed
//! (into `[var-cond]` or next to the text), product placeholders are
//! replaced, and `[rule-<id>]` tokens are swapped for the composed content
//! of the referenced reusable rule. Nesting is bounded by [`MAX_DEPTH`] and
//! by the `processed` set, which holds the rules currently being expanded on
//! the path from the outermost rule: a token naming one of them is a cycle
//! and expands to nothing.

use std::collections::{HashMap, HashSet};

use gdm_protocol::catalog::{Currency, Product};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::rule::{Rule, RuleId, Slot};
use crate::variant::{select_variant, VariantAction};

/// Deepest level of `[rule-<id>]` nesting that is expanded.
pub const MAX_DEPTH: usize = 5;

/// Marks where the selected variant text goes.
pub const VARIANT_TOKEN: &str = "[var-cond]";

static RULE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[rule-(\d+)\]").expect("rule token pattern is valid"));

/// Lookup of rules by id, used to resolve nested inclusion.
pub trait RuleSource {
    fn rule(&self, id: RuleId) -> Option<&Rule>;
}

impl RuleSource for [Rule] {
    fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.iter().find(|rule| rule.id == id)
    }
}

/// Replaces the fixed product placeholders.
pub fn expand_placeholders(text: &str, product: &Product, currency: &Currency) -> String {
    if !text.contains('[') {
        return text.to_string();
    }

    let replacements: [(&str, String); 6] = [
        ("[nombre-prod]", product.name.clone()),
        ("[precio-prod]", currency.format(product.active_price())),
        ("[precio-regular]", currency.format(product.regular_price)),
        ("[sku-prod]", product.sku.clone()),
        ("[slug-prod]", product.slug.clone()),
        ("[id-prod]", product.id.to_string()),
    ];

    let mut expanded = text.to_string();
    for (token, value) in &replacements {
        if expanded.contains(token) {
            expanded = expanded.replace(token, value);
        }
    }
    expanded
}

fn join_spaced(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.trim().is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{} {}", first, second),
    }
}

/// Expands rule templates against one product.
pub struct Composer<'a, S: RuleSource + ?Sized> {
    source: &'a S,
    currency: &'a Currency,
}

impl<'a, S: RuleSource + ?Sized> Composer<'a, S> {
    pub fn new(source: &'a S, currency: &'a Currency) -> Self {
        Self { source, currency }
    }

    /// Composes the rule's template for `slot`.
    pub fn compose(
        &self,
        rule: &Rule,
        slot: Slot,
        product: &Product,
        processed: &mut HashSet<RuleId>,
        depth: usize,
    ) -> String {
        self.compose_template(rule, rule.template_for(slot), product, processed, depth)
    }

    /// Composes an arbitrary template in the context of `rule` (its variants).
    pub fn compose_template(
        &self,
        rule: &Rule,
        template: &str,
        product: &Product,
        processed: &mut HashSet<RuleId>,
        depth: usize,
    ) -> String {
        let with_variant = self.place_variant(rule, template, product);
        self.expand(rule, &with_variant, product, processed, depth)
    }

    /// Composes a product title template. Variants belong to descriptions,
    /// so a stray `[var-cond]` is dropped and nothing is placed.
    pub fn compose_title(&self, rule: &Rule, template: &str, product: &Product) -> String {
        let stripped = template.replace(VARIANT_TOKEN, "");
        self.expand(rule, &stripped, product, &mut HashSet::new(), 0)
    }

    fn expand(
        &self,
        rule: &Rule,
        template: &str,
        product: &Product,
        processed: &mut HashSet<RuleId>,
        depth: usize,
    ) -> String {
        let entered = processed.insert(rule.id);
        let expanded = expand_placeholders(template, product, self.currency);
        let composed = self.expand_nested(&expanded, product, processed, depth);
        if entered {
            processed.remove(&rule.id);
        }
        composed
    }

    fn place_variant(&self, rule: &Rule, template: &str, product: &Product) -> String {
        let Some(variant) = select_variant(&rule.variants, rule.variant_mode, product) else {
            return template.replace(VARIANT_TOKEN, "");
        };

        debug!(rule_id = rule.id, kind = ?variant.kind, "variant selected");
        match variant.action {
            VariantAction::Replace if template.contains(VARIANT_TOKEN) => {
                template.replace(VARIANT_TOKEN, &variant.text)
            }
            VariantAction::Replace | VariantAction::Append => {
                join_spaced(&template.replace(VARIANT_TOKEN, ""), &variant.text)
            }
            VariantAction::Prepend => join_spaced(&variant.text, &template.replace(VARIANT_TOKEN, "")),
        }
    }

    fn expand_nested(
        &self,
        text: &str,
        product: &Product,
        processed: &mut HashSet<RuleId>,
        depth: usize,
    ) -> String {
        if !text.contains("[rule-") {
            return text.to_string();
        }

        // repeated tokens in one text share a single expansion
        let mut expanded: HashMap<RuleId, String> = HashMap::new();

        RULE_TOKEN
            .replace_all(text, |caps: &Captures<'_>| {
                let literal = caps[0].to_string();
                let Ok(id) = caps[1].parse::<RuleId>() else {
                    return literal;
                };
                if let Some(done) = expanded.get(&id) {
                    return done.clone();
                }

                let Some(nested) = self.source.rule(id).filter(|rule| rule.is_reusable()) else {
                    debug!(rule_id = id, "nested token references no reusable rule");
                    return literal;
                };

                let content = if processed.contains(&id) {
                    debug!(rule_id = id, "nested rule already expanded, skipping cycle");
                    String::new()
                } else if depth + 1 > MAX_DEPTH {
                    debug!(rule_id = id, depth, "nested inclusion depth ceiling reached");
                    String::new()
                } else {
                    self.compose_template(nested, &nested.content, product, processed, depth + 1)
                };

                expanded.insert(id, content.clone());
                content
            })
            .into_owned()
    }
}
