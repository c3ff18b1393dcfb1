use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inventory state of a product as reported by the shop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[serde(alias = "instock")]
    InStock,
    #[serde(alias = "outofstock")]
    OutOfStock,
    #[serde(alias = "onbackorder")]
    OnBackorder,
}

impl Default for StockStatus {
    fn default() -> Self {
        StockStatus::InStock
    }
}

/// Taxonomy term (category, tag or attribute value) attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Term {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

impl Term {
    pub fn new(id: u64, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            name: slug.clone(),
            slug,
        }
    }

    /// Matches a configured key against the slug or the display name.
    pub fn is_named(&self, key: &str) -> bool {
        let key = key.trim();
        self.slug.eq_ignore_ascii_case(key) || self.name.eq_ignore_ascii_case(key)
    }
}

/// Named attribute (e.g. `pa_color`) with the terms assigned to the product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAttribute {
    pub name: String,
    #[serde(default)]
    pub terms: Vec<Term>,
}

/// In-memory view of a shop product. Rules read it and write back onto it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub regular_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub categories: Vec<Term>,
    #[serde(default)]
    pub tags: Vec<Term>,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub gallery_image_ids: Vec<u64>,
}

impl Product {
    /// Create a product with the minimum required information.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        ProductBuilder::new(id, name).build()
    }

    /// Price the shopper pays: the sale price when set, otherwise the regular one.
    pub fn active_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.regular_price)
    }

    pub fn is_on_sale(&self) -> bool {
        matches!(self.sale_price, Some(sale) if sale < self.regular_price)
    }

    pub fn has_category(&self, id: u64) -> bool {
        self.categories.iter().any(|term| term.id == id)
    }

    pub fn has_tag_id(&self, id: u64) -> bool {
        self.tags.iter().any(|term| term.id == id)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.iter().any(|term| term.is_named(key))
    }

    /// Every attribute term id assigned to the product.
    pub fn attribute_term_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.attributes
            .iter()
            .flat_map(|attribute| attribute.terms.iter().map(|term| term.id))
    }

    pub fn attribute(&self, name: &str) -> Option<&ProductAttribute> {
        let name = name.trim();
        self.attributes.iter().find(|attribute| {
            attribute.name.eq_ignore_ascii_case(name)
                || attribute
                    .name
                    .strip_prefix("pa_")
                    .map(|bare| bare.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
        })
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }
}

/// Builder helper to create products with many optional fields.
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let product = Product {
            id,
            name: name.into(),
            slug: String::new(),
            sku: String::new(),
            description: String::new(),
            short_description: String::new(),
            regular_price: 0.0,
            sale_price: None,
            categories: Vec::new(),
            tags: Vec::new(),
            attributes: Vec::new(),
            meta: BTreeMap::new(),
            stock_status: StockStatus::InStock,
            featured: false,
            gallery_image_ids: Vec::new(),
        };

        Self { product }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.product.slug = slug.into();
        self
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.product.sku = sku.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.product.description = description.into();
        self
    }

    pub fn short_description(mut self, description: impl Into<String>) -> Self {
        self.product.short_description = description.into();
        self
    }

    pub fn price(mut self, regular: f64) -> Self {
        self.product.regular_price = regular;
        self
    }

    pub fn sale_price(mut self, sale: f64) -> Self {
        self.product.sale_price = Some(sale);
        self
    }

    pub fn category(mut self, id: u64, slug: impl Into<String>) -> Self {
        self.product.categories.push(Term::new(id, slug));
        self
    }

    pub fn tag(mut self, id: u64, slug: impl Into<String>) -> Self {
        self.product.tags.push(Term::new(id, slug));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, terms: Vec<Term>) -> Self {
        self.product.attributes.push(ProductAttribute {
            name: name.into(),
            terms,
        });
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.product.meta.insert(key.into(), value.into());
        self
    }

    pub fn stock_status(mut self, status: StockStatus) -> Self {
        self.product.stock_status = status;
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.product.featured = featured;
        self
    }

    pub fn gallery(mut self, ids: Vec<u64>) -> Self {
        self.product.gallery_image_ids = ids;
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}
