use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::rule::RuleId;

/// Memoization scoped to a single render.
///
/// Created by the caller, threaded through evaluation by `&mut`, and dropped
/// when the render ends. Nothing here outlives one request.
#[derive(Debug, Default)]
pub struct RequestCache {
    scope_results: HashMap<(RuleId, u64), bool>,
    regexes: HashMap<(String, bool), Option<Regex>>,
    hits: usize,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope_result(&mut self, rule_id: RuleId, product_id: u64) -> Option<bool> {
        let result = self.scope_results.get(&(rule_id, product_id)).copied();
        if result.is_some() {
            self.hits += 1;
        }
        result
    }

    pub fn store_scope_result(&mut self, rule_id: RuleId, product_id: u64, matched: bool) {
        self.scope_results.insert((rule_id, product_id), matched);
    }

    /// Compiled pattern, or `None` when it does not compile. Failures are cached too.
    pub fn regex(&mut self, pattern: &str, case_sensitive: bool) -> Option<&Regex> {
        let key = (pattern.to_string(), case_sensitive);
        if self.regexes.contains_key(&key) {
            self.hits += 1;
        }
        self.regexes
            .entry(key)
            .or_insert_with(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|err| warn!(%pattern, error = %err, "invalid title pattern"))
                    .ok()
            })
            .as_ref()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
