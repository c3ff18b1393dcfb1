use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values a shopper chose for the order-time custom fields of one cart line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartSelection {
    pub product_id: u64,
    #[serde(default = "CartSelection::default_quantity")]
    pub quantity: u32,
    /// Field id to submitted value. Checkboxes use `"1"`/`"on"` when ticked.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl CartSelection {
    pub fn new(product_id: u64) -> Self {
        Self {
            product_id,
            quantity: 1,
            values: BTreeMap::new(),
        }
    }

    pub fn default_quantity() -> u32 {
        1
    }

    pub fn with_value(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field_id.into(), value.into());
        self
    }

    pub fn value(&self, field_id: &str) -> Option<&str> {
        self.values
            .get(field_id)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Extra charge added to the cart for a chosen custom field value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fee {
    pub field_id: String,
    pub label: String,
    pub amount: f64,
}
