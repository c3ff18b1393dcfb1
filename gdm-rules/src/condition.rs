use gdm_core::serde_utils::{lenient_bool, lenient_f64, lenient_ids};
use gdm_protocol::catalog::{Product, StockStatus};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::RequestCache;
use crate::rule::Rule;

/// Tolerance used by the `equal` price comparison.
pub const PRICE_EPSILON: f64 = 0.01;

/// Price predicate of a rule scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceComparison {
    #[serde(alias = "mayor")]
    GreaterThan,
    #[serde(alias = "menor")]
    LessThan,
    #[serde(alias = "igual")]
    Equal,
    #[serde(alias = "entre")]
    Between,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceCondition {
    pub comparison: PriceComparison,
    /// Compared value, or the lower bound of `between`.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: f64,
    /// Upper bound of `between`.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: f64,
}

impl PriceCondition {
    pub fn matches(&self, price: f64) -> bool {
        match self.comparison {
            PriceComparison::GreaterThan => price > self.min,
            PriceComparison::LessThan => price < self.min,
            PriceComparison::Equal => (price - self.min).abs() < PRICE_EPSILON,
            PriceComparison::Between => {
                let (low, high) = if self.min <= self.max {
                    (self.min, self.max)
                } else {
                    (self.max, self.min)
                };
                price >= low && price <= high
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TitleComparison {
    #[serde(alias = "contiene")]
    Contains,
    #[serde(alias = "no_contiene")]
    NotContains,
    #[serde(alias = "empieza")]
    StartsWith,
    #[serde(alias = "termina")]
    EndsWith,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleCondition {
    pub comparison: TitleComparison,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub case_sensitive: bool,
}

impl TitleCondition {
    pub fn is_configured(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn matches(&self, title: &str, cache: &mut RequestCache) -> bool {
        if self.comparison == TitleComparison::Regex {
            return cache
                .regex(&self.text, self.case_sensitive)
                .map(|pattern| pattern.is_match(title))
                .unwrap_or(false);
        }

        let (haystack, needle) = if self.case_sensitive {
            (title.to_string(), self.text.clone())
        } else {
            (title.to_lowercase(), self.text.to_lowercase())
        };

        match self.comparison {
            TitleComparison::Contains => haystack.contains(&needle),
            TitleComparison::NotContains => !haystack.contains(&needle),
            TitleComparison::StartsWith => haystack.starts_with(&needle),
            TitleComparison::EndsWith => haystack.ends_with(&needle),
            TitleComparison::Regex => false,
        }
    }
}

/// Which products a rule is in scope for.
///
/// Predicates are OR-combined: the first enabled predicate the product
/// satisfies makes the rule match. A scope with nothing enabled matches
/// every product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Scope {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub all_categories: bool,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub categories: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub any_tag: bool,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub tags: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub products: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub attribute_terms: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_stock")]
    pub stock_statuses: Vec<StockStatus>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub price: Option<PriceCondition>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub title: Option<TitleCondition>,
}

impl Scope {
    /// Matches every product.
    pub fn everything() -> Self {
        Self {
            all_categories: true,
            ..Self::default()
        }
    }

    /// No predicate enabled at all.
    pub fn is_unrestricted(&self) -> bool {
        !self.all_categories
            && self.categories.is_empty()
            && !self.any_tag
            && self.tags.is_empty()
            && self.products.is_empty()
            && self.attribute_terms.is_empty()
            && self.stock_statuses.is_empty()
            && self.price.is_none()
            && !self.title.as_ref().map_or(false, TitleCondition::is_configured)
    }

    /// Evaluates the predicates in order, returning on the first satisfied one.
    pub fn evaluate(&self, product: &Product, cache: &mut RequestCache) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        if self.all_categories {
            return true;
        }
        if self.categories.iter().any(|id| product.has_category(*id)) {
            return true;
        }
        if self.any_tag && !product.tags.is_empty() {
            return true;
        }
        if self.tags.iter().any(|id| product.has_tag_id(*id)) {
            return true;
        }
        if self.products.contains(&product.id) {
            return true;
        }
        if !self.attribute_terms.is_empty()
            && product
                .attribute_term_ids()
                .any(|term| self.attribute_terms.contains(&term))
        {
            return true;
        }
        if self.stock_statuses.contains(&product.stock_status) {
            return true;
        }
        if let Some(price) = &self.price {
            if price.matches(product.active_price()) {
                return true;
            }
        }
        if let Some(title) = self.title.as_ref().filter(|title| title.is_configured()) {
            if title.matches(&product.name, cache) {
                return true;
            }
        }

        false
    }
}

/// Whether `rule` is in scope for `product`, memoized for the request.
pub fn matches(rule: &Rule, product: &Product, cache: &mut RequestCache) -> bool {
    if let Some(result) = cache.scope_result(rule.id, product.id) {
        return result;
    }

    let result = rule.scope.evaluate(product, cache);
    debug!(rule_id = rule.id, product_id = product.id, matched = result, "scope evaluated");
    cache.store_scope_result(rule.id, product.id, result);
    result
}

fn lenient_stock<'de, D>(deserializer: D) -> Result<Vec<StockStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        Value::String(_) => vec![value],
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
