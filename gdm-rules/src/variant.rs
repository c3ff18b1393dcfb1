use gdm_protocol::catalog::Product;
use serde::{Deserialize, Serialize};

/// What a variant checks on the product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    #[serde(alias = "etiqueta")]
    Tag,
    Meta,
    #[serde(alias = "atributo")]
    Attribute,
    /// Fallback used when no other variant matched.
    #[default]
    Default,
}

/// How the variant text is placed into the rule template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantAction {
    /// Substitute the `[var-cond]` token, or append when the token is absent.
    #[default]
    #[serde(alias = "reemplazar")]
    Replace,
    #[serde(alias = "agregar")]
    Append,
    #[serde(alias = "anteponer")]
    Prepend,
}

/// Which matching variant wins when several conditions hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantMode {
    #[default]
    FirstMatch,
    LastMatch,
}

/// Conditional text fragment belonging to a rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    #[serde(default, alias = "condition")]
    pub kind: VariantKind,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub action: VariantAction,
    #[serde(default)]
    pub text: String,
}

impl Variant {
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn when(kind: VariantKind, key: impl Into<String>, value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
            action: VariantAction::Replace,
            text: text.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == VariantKind::Default
    }

    /// Default variants carry no key; every other kind needs one.
    pub fn validate(&self) -> Result<(), String> {
        let has_key = !self.key.trim().is_empty();
        match (self.kind, has_key) {
            (VariantKind::Default, true) => Err("default variant must not define a condition key".into()),
            (VariantKind::Default, false) => Ok(()),
            (_, false) => Err("conditional variant requires a condition key".into()),
            (_, true) => Ok(()),
        }
    }

    /// Whether the variant condition holds. Fallbacks never match here.
    pub fn matches(&self, product: &Product) -> bool {
        let key = self.key.trim();
        if key.is_empty() {
            return false;
        }
        let expected = self.value.trim();

        match self.kind {
            VariantKind::Default => false,
            VariantKind::Tag => product.has_tag(key),
            VariantKind::Meta => match product.meta_value(key) {
                Some(actual) if expected.is_empty() => !actual.trim().is_empty(),
                Some(actual) => actual.trim() == expected,
                None => false,
            },
            VariantKind::Attribute => match product.attribute(key) {
                Some(attribute) if expected.is_empty() => !attribute.terms.is_empty(),
                Some(attribute) => attribute.terms.iter().any(|term| term.is_named(expected)),
                None => false,
            },
        }
    }
}

/// Picks at most one variant for the product.
pub fn select_variant<'a>(variants: &'a [Variant], mode: VariantMode, product: &Product) -> Option<&'a Variant> {
    let mut conditional = variants
        .iter()
        .filter(|variant| !variant.is_fallback())
        .filter(|variant| variant.matches(product));

    let chosen = match mode {
        VariantMode::FirstMatch => conditional.next(),
        VariantMode::LastMatch => conditional.last(),
    };

    chosen.or_else(|| variants.iter().find(|variant| variant.is_fallback()))
}
