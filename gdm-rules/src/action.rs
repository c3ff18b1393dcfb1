use gdm_core::serde_utils::{lenient_bool, lenient_f64, lenient_ids};
use gdm_protocol::catalog::Product;
use serde::{Deserialize, Serialize};

use crate::rule::{Placement, Slot};

/// Rounding applied to a computed price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Round to cents only.
    #[default]
    None,
    #[serde(alias = "arriba")]
    Ceiling,
    #[serde(alias = "abajo")]
    Floor,
    #[serde(alias = "cercano")]
    Nearest,
    #[serde(rename = "force_99")]
    Force99,
    #[serde(rename = "force_95")]
    Force95,
    #[serde(rename = "force_00")]
    Force00,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::None => (value * 100.0).round() / 100.0,
            Rounding::Ceiling => value.ceil(),
            Rounding::Floor => value.floor(),
            Rounding::Nearest => value.round(),
            Rounding::Force99 => (value.trunc() * 100.0 + 99.0) / 100.0,
            Rounding::Force95 => (value.trunc() * 100.0 + 95.0) / 100.0,
            Rounding::Force00 => value.trunc(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    #[default]
    #[serde(alias = "porcentaje")]
    Percentage,
    #[serde(alias = "fijo")]
    Fixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    #[default]
    #[serde(alias = "descuento")]
    Decrease,
    #[serde(alias = "aumento")]
    Increase,
}

/// Which price field receives the computed value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceTarget {
    #[default]
    Sale,
    Regular,
}

/// Percentage or fixed change computed from the regular price.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceAdjustment {
    #[serde(default)]
    pub kind: AdjustmentKind,
    #[serde(default)]
    pub direction: AdjustmentDirection,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default)]
    pub target: PriceTarget,
}

impl PriceAdjustment {
    pub fn percentage_off(amount: f64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    /// New price for `base`, never below zero.
    pub fn compute(&self, base: f64) -> f64 {
        let delta = match self.kind {
            AdjustmentKind::Percentage => base * self.amount / 100.0,
            AdjustmentKind::Fixed => self.amount,
        };
        let raw = match self.direction {
            AdjustmentDirection::Decrease => base - delta,
            AdjustmentDirection::Increase => base + delta,
        };
        self.rounding.apply(raw.max(0.0)).max(0.0)
    }

    pub fn apply(&self, product: &mut Product, base: f64) {
        let price = self.compute(base);
        match self.target {
            PriceTarget::Sale => product.sale_price = Some(price),
            PriceTarget::Regular => product.regular_price = price,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GalleryMode {
    #[default]
    Replace,
    Append,
    Prepend,
}

/// Typed effect a rule has on a non-text slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    AdjustPrice(PriceAdjustment),
    SetTitle {
        template: String,
        #[serde(default)]
        placement: Placement,
    },
    SetFeatured {
        #[serde(default, deserialize_with = "lenient_bool")]
        featured: bool,
    },
    SetGallery {
        #[serde(default, deserialize_with = "lenient_ids")]
        image_ids: Vec<u64>,
        #[serde(default)]
        mode: GalleryMode,
    },
}

impl RuleAction {
    pub fn slot(&self) -> Slot {
        match self {
            RuleAction::AdjustPrice(_) => Slot::Price,
            RuleAction::SetTitle { .. } => Slot::Title,
            RuleAction::SetFeatured { .. } => Slot::Featured,
            RuleAction::SetGallery { .. } => Slot::Gallery,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            RuleAction::AdjustPrice(adjustment) if adjustment.amount < 0.0 => {
                Err("price adjustment amount must not be negative".into())
            }
            RuleAction::AdjustPrice(adjustment)
                if adjustment.kind == AdjustmentKind::Percentage
                    && adjustment.direction == AdjustmentDirection::Decrease
                    && adjustment.amount > 100.0 =>
            {
                Err("percentage discount cannot exceed 100".into())
            }
            RuleAction::SetTitle { template, .. } if template.trim().is_empty() => {
                Err("title template must not be empty".into())
            }
            _ => Ok(()),
        }
    }
}

/// Merges gallery image ids according to the mode, without duplicates.
pub fn merge_gallery(current: &[u64], ids: &[u64], mode: GalleryMode) -> Vec<u64> {
    let ordered: Vec<u64> = match mode {
        GalleryMode::Replace => ids.to_vec(),
        GalleryMode::Append => current.iter().chain(ids).copied().collect(),
        GalleryMode::Prepend => ids.iter().chain(current).copied().collect(),
    };

    let mut merged = Vec::with_capacity(ordered.len());
    for id in ordered {
        if !merged.contains(&id) {
            merged.push(id);
        }
    }
    merged
}
