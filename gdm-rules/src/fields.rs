//! Order-time custom fields (add-ons) shared by every product of the shop.
//!
//! The whole definition list is stored as one serialized array. At cart time
//! the fields visible for a product are validated against the shopper's
//! selection and turned into fees.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gdm_core::serde_utils::{lenient_bool, lenient_f64, lenient_ids};
use gdm_protocol::cart::{CartSelection, Fee};
use gdm_protocol::catalog::Product;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("field `{0}` is required")]
    Required(String),
    #[error("`{value}` is not an option of field `{field}`")]
    UnknownOption { field: String, value: String },
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("duplicate field id `{0}`")]
    DuplicateId(String),
    #[error("field definition is invalid: {0}")]
    Invalid(String),
    #[error("failed to read fields: {0}")]
    Io(String),
    #[error("failed to parse fields: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    #[serde(alias = "texto")]
    Text,
    Select,
    Checkbox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldOption {
    pub label: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    #[default]
    Always,
    #[serde(alias = "mostrar")]
    Show,
    #[serde(alias = "ocultar")]
    Hide,
}

/// Show/hide rule for a field based on product or category ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldCondition {
    #[serde(default)]
    pub mode: VisibilityMode,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub category_ids: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub product_ids: Vec<u64>,
}

impl FieldCondition {
    fn targets(&self, product: &Product) -> bool {
        self.product_ids.contains(&product.id)
            || self.category_ids.iter().any(|id| product.has_category(*id))
    }

    pub fn is_visible(&self, product: &Product) -> bool {
        match self.mode {
            VisibilityMode::Always => true,
            VisibilityMode::Show => self.targets(product),
            VisibilityMode::Hide => !self.targets(product),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomField {
    pub id: String,
    pub label: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// Flat charge for text and checkbox fields when filled/ticked.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_modifier: f64,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub required: bool,
    #[serde(default)]
    pub condition: FieldCondition,
}

impl CustomField {
    fn is_checked(value: &str) -> bool {
        matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "on" | "yes" | "true" | "si" | "sí")
    }

    fn option(&self, value: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.label == value.trim())
    }

    /// Value as submitted, or `None` when blank / unticked.
    fn chosen<'s>(&self, selection: &'s CartSelection) -> Option<&'s str> {
        let value = selection.value(&self.id)?;
        match self.field_type {
            FieldType::Checkbox if !Self::is_checked(value) => None,
            _ => Some(value),
        }
    }

    /// Charge for the chosen value, per unit.
    pub fn unit_price(&self, value: &str) -> f64 {
        match self.field_type {
            FieldType::Select => self.option(value).map(|option| option.price).unwrap_or(0.0) + self.price_modifier,
            FieldType::Text | FieldType::Checkbox => self.price_modifier,
        }
    }

    pub fn validate_definition(&self) -> Result<(), FieldError> {
        if self.id.trim().is_empty() {
            return Err(FieldError::Invalid("field id must not be empty".into()));
        }
        if self.label.trim().is_empty() {
            return Err(FieldError::Invalid(format!("field `{}` needs a label", self.id)));
        }
        if self.field_type == FieldType::Select && self.options.is_empty() {
            return Err(FieldError::Invalid(format!("select field `{}` needs options", self.id)));
        }
        Ok(())
    }
}

/// Global list of custom field definitions.
#[derive(Default, Clone)]
pub struct FieldStore {
    fields: Arc<RwLock<Vec<CustomField>>>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, FieldError> {
        let fields: Vec<CustomField> =
            serde_json::from_str(raw).map_err(|err| FieldError::Parse(err.to_string()))?;
        let store = Self::new();
        store.replace_all(fields)?;
        Ok(store)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FieldError> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|err| FieldError::Io(err.to_string()))?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String, FieldError> {
        serde_json::to_string(&*self.fields.read()).map_err(|err| FieldError::Parse(err.to_string()))
    }

    pub fn list(&self) -> Vec<CustomField> {
        self.fields.read().clone()
    }

    /// Replaces the whole list after validating every definition.
    pub fn replace_all(&self, fields: Vec<CustomField>) -> Result<(), FieldError> {
        let mut seen = HashSet::new();
        for field in &fields {
            field.validate_definition()?;
            if !seen.insert(field.id.clone()) {
                return Err(FieldError::DuplicateId(field.id.clone()));
            }
        }
        *self.fields.write() = fields;
        Ok(())
    }

    pub fn visible_fields(&self, product: &Product) -> Vec<CustomField> {
        self.fields
            .read()
            .iter()
            .filter(|field| field.condition.is_visible(product))
            .cloned()
            .collect()
    }

    /// Checks required fields, select options and unknown field ids.
    pub fn validate(&self, product: &Product, selection: &CartSelection) -> Result<(), FieldError> {
        let visible = self.visible_fields(product);

        for field_id in selection.values.keys() {
            if !visible.iter().any(|field| &field.id == field_id) {
                return Err(FieldError::UnknownField(field_id.clone()));
            }
        }

        for field in &visible {
            match field.chosen(selection) {
                None if field.required => return Err(FieldError::Required(field.id.clone())),
                Some(value) if field.field_type == FieldType::Select && field.option(value).is_none() => {
                    return Err(FieldError::UnknownOption {
                        field: field.id.clone(),
                        value: value.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Fees for the chosen values, multiplied by the line quantity. Zero charges are skipped.
    pub fn fees(&self, product: &Product, selection: &CartSelection) -> Vec<Fee> {
        let quantity = f64::from(selection.quantity.max(1));
        self.visible_fields(product)
            .iter()
            .filter_map(|field| {
                let value = field.chosen(selection)?;
                let amount = field.unit_price(value) * quantity;
                (amount.abs() > f64::EPSILON).then(|| Fee {
                    field_id: field.id.clone(),
                    label: format!("{}: {}", field.label, value),
                    amount,
                })
            })
            .collect()
    }

    /// Label/value pairs shown in the cart and the order.
    pub fn display(&self, product: &Product, selection: &CartSelection) -> Vec<(String, String)> {
        self.visible_fields(product)
            .iter()
            .filter_map(|field| {
                let value = field.chosen(selection)?;
                let shown = match field.field_type {
                    FieldType::Checkbox => "Sí".to_string(),
                    _ => value.trim().to_string(),
                };
                Some((field.label.clone(), shown))
            })
            .collect()
    }
}
