//! Admin modules: one descriptor per slot with plain render/save/default functions.
//!
//! Modules are registered once at start-up and looked up by key when the admin
//! screen saves a rule or lists the available modules.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::action::{GalleryMode, PriceAdjustment, RuleAction};
use crate::error::RuleError;
use crate::rule::{Placement, Rule, Slot};
use crate::variant::{Variant, VariantMode};

pub type RenderFn = fn(&Rule) -> Option<String>;
pub type SaveFn = fn(&mut Rule, &Value) -> Result<(), RuleError>;
pub type DefaultDataFn = fn() -> Value;

#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub slot: Slot,
    pub order: u32,
    /// Short admin summary, `None` when the rule does not use the module.
    pub render: RenderFn,
    /// Applies the module form payload onto the rule. `null` detaches the module.
    pub save: SaveFn,
    pub default_data: DefaultDataFn,
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("key", &self.key)
            .field("slot", &self.slot)
            .field("order", &self.order)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<&'static str, ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a module for every slot.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for descriptor in [
            ModuleDescriptor {
                key: "long_description",
                label: "Descripción larga",
                slot: Slot::LongDescription,
                order: 10,
                render: render_text::<{ LONG }>,
                save: save_text::<{ LONG }>,
                default_data: default_text,
            },
            ModuleDescriptor {
                key: "short_description",
                label: "Descripción corta",
                slot: Slot::ShortDescription,
                order: 20,
                render: render_text::<{ SHORT }>,
                save: save_text::<{ SHORT }>,
                default_data: default_text,
            },
            ModuleDescriptor {
                key: "title",
                label: "Título",
                slot: Slot::Title,
                order: 30,
                render: render_title,
                save: save_title,
                default_data: || json!({ "template": "[nombre-prod]", "placement": "replace" }),
            },
            ModuleDescriptor {
                key: "price",
                label: "Precio",
                slot: Slot::Price,
                order: 40,
                render: render_price,
                save: save_price,
                default_data: || {
                    serde_json::to_value(PriceAdjustment::percentage_off(0.0)).unwrap_or(Value::Null)
                },
            },
            ModuleDescriptor {
                key: "gallery",
                label: "Galería",
                slot: Slot::Gallery,
                order: 50,
                render: render_gallery,
                save: save_gallery,
                default_data: || json!({ "image_ids": [], "mode": "replace" }),
            },
            ModuleDescriptor {
                key: "featured",
                label: "Destacado",
                slot: Slot::Featured,
                order: 60,
                render: render_featured,
                save: save_featured,
                default_data: || json!({ "featured": true }),
            },
            ModuleDescriptor {
                key: "reusable",
                label: "Reutilizable",
                slot: Slot::Reusable,
                order: 70,
                render: render_reusable,
                save: save_reusable,
                default_data: || json!({ "content": "" }),
            },
        ] {
            registry.register(descriptor);
        }
        registry
    }

    /// Adds or replaces a module, returning the previous descriptor for the key.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Option<ModuleDescriptor> {
        self.modules.insert(descriptor.key, descriptor)
    }

    pub fn get(&self, key: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(key)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        let mut modules: Vec<&ModuleDescriptor> = self.modules.values().collect();
        modules.sort_by_key(|descriptor| (descriptor.order, descriptor.key));
        modules.into_iter()
    }

    /// Applies every module payload and re-validates the rule.
    pub fn apply(&self, rule: &mut Rule, payloads: &Map<String, Value>) -> Result<(), RuleError> {
        for (key, payload) in payloads {
            let descriptor = self
                .get(key)
                .ok_or_else(|| RuleError::invalid(rule.id, format!("unknown module `{key}`")))?;
            (descriptor.save)(rule, payload)?;
        }
        rule.validate()
    }

    /// Summary of every module the rule uses, keyed by module key.
    pub fn summarize(&self, rule: &Rule) -> Vec<(&'static str, String)> {
        self.iter()
            .filter_map(|descriptor| (descriptor.render)(rule).map(|summary| (descriptor.key, summary)))
            .collect()
    }
}

const LONG: u8 = 0;
const SHORT: u8 = 1;

fn text_slot<const KIND: u8>() -> Slot {
    if KIND == LONG {
        Slot::LongDescription
    } else {
        Slot::ShortDescription
    }
}

fn parse<T: for<'de> Deserialize<'de>>(rule: &Rule, payload: &Value) -> Result<T, RuleError> {
    serde_json::from_value(payload.clone()).map_err(|err| RuleError::invalid(rule.id, err.to_string()))
}

fn detach(rule: &mut Rule, slot: Slot) {
    rule.applies_to.remove(&slot);
    rule.actions.retain(|action| action.slot() != slot);
}

fn replace_action(rule: &mut Rule, action: RuleAction) {
    let slot = action.slot();
    rule.actions.retain(|existing| existing.slot() != slot);
    rule.actions.push(action);
    rule.applies_to.insert(slot);
}

fn preview_text(text: &str) -> String {
    const LIMIT: usize = 60;
    let trimmed = text.trim();
    if trimmed.chars().count() <= LIMIT {
        trimmed.to_string()
    } else {
        format!("{}…", trimmed.chars().take(LIMIT).collect::<String>())
    }
}

#[derive(Deserialize)]
struct TextPayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    placement: Option<Placement>,
    #[serde(default)]
    variants: Option<Vec<Variant>>,
    #[serde(default)]
    variant_mode: Option<VariantMode>,
}

fn default_text() -> Value {
    json!({ "content": "", "placement": "replace", "variants": [], "variant_mode": "first_match" })
}

fn render_text<const KIND: u8>(rule: &Rule) -> Option<String> {
    let slot = text_slot::<KIND>();
    rule.applies_to_slot(slot)
        .then(|| format!("{:?}: {}", rule.placement, preview_text(rule.template_for(slot))))
}

fn save_text<const KIND: u8>(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    let slot = text_slot::<KIND>();
    if payload.is_null() {
        detach(rule, slot);
        rule.templates.remove(&slot);
        return Ok(());
    }

    let data: TextPayload = parse(rule, payload)?;
    if slot == Slot::LongDescription {
        rule.content = data.content;
        if let Some(placement) = data.placement {
            rule.placement = placement;
        }
    } else {
        rule.templates.insert(slot, data.content);
    }
    if let Some(variants) = data.variants {
        rule.variants = variants;
    }
    if let Some(mode) = data.variant_mode {
        rule.variant_mode = mode;
    }
    rule.applies_to.insert(slot);
    Ok(())
}

fn render_title(rule: &Rule) -> Option<String> {
    rule.actions_for(Slot::Title).find_map(|action| match action {
        RuleAction::SetTitle { template, placement } => Some(format!("{placement:?}: {template}")),
        _ => None,
    })
}

fn save_title(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    if payload.is_null() {
        detach(rule, Slot::Title);
        return Ok(());
    }

    #[derive(Deserialize)]
    struct TitlePayload {
        template: String,
        #[serde(default)]
        placement: Placement,
    }

    let data: TitlePayload = parse(rule, payload)?;
    replace_action(
        rule,
        RuleAction::SetTitle {
            template: data.template,
            placement: data.placement,
        },
    );
    Ok(())
}

fn render_price(rule: &Rule) -> Option<String> {
    rule.actions_for(Slot::Price).find_map(|action| match action {
        RuleAction::AdjustPrice(adjustment) => Some(format!(
            "{:?} {:?} {} ({:?}, {:?})",
            adjustment.direction, adjustment.kind, adjustment.amount, adjustment.rounding, adjustment.target
        )),
        _ => None,
    })
}

fn save_price(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    if payload.is_null() {
        detach(rule, Slot::Price);
        return Ok(());
    }
    let adjustment: PriceAdjustment = parse(rule, payload)?;
    replace_action(rule, RuleAction::AdjustPrice(adjustment));
    Ok(())
}

fn render_gallery(rule: &Rule) -> Option<String> {
    rule.actions_for(Slot::Gallery).find_map(|action| match action {
        RuleAction::SetGallery { image_ids, mode } => Some(format!("{mode:?}: {} images", image_ids.len())),
        _ => None,
    })
}

fn save_gallery(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    if payload.is_null() {
        detach(rule, Slot::Gallery);
        return Ok(());
    }

    #[derive(Deserialize)]
    struct GalleryPayload {
        #[serde(default, deserialize_with = "gdm_core::serde_utils::lenient_ids")]
        image_ids: Vec<u64>,
        #[serde(default)]
        mode: GalleryMode,
    }

    let data: GalleryPayload = parse(rule, payload)?;
    replace_action(
        rule,
        RuleAction::SetGallery {
            image_ids: data.image_ids,
            mode: data.mode,
        },
    );
    Ok(())
}

fn render_featured(rule: &Rule) -> Option<String> {
    rule.actions_for(Slot::Featured).find_map(|action| match action {
        RuleAction::SetFeatured { featured } => Some(if *featured { "destacado" } else { "normal" }.to_string()),
        _ => None,
    })
}

fn save_featured(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    if payload.is_null() {
        detach(rule, Slot::Featured);
        return Ok(());
    }

    #[derive(Deserialize)]
    struct FeaturedPayload {
        #[serde(default, deserialize_with = "gdm_core::serde_utils::lenient_bool")]
        featured: bool,
    }

    let data: FeaturedPayload = parse(rule, payload)?;
    replace_action(rule, RuleAction::SetFeatured { featured: data.featured });
    Ok(())
}

fn render_reusable(rule: &Rule) -> Option<String> {
    rule.is_reusable()
        .then(|| format!("[rule-{}] {}", rule.id, preview_text(&rule.content)))
}

fn save_reusable(rule: &mut Rule, payload: &Value) -> Result<(), RuleError> {
    if payload.is_null() {
        rule.applies_to.remove(&Slot::Reusable);
        return Ok(());
    }

    #[derive(Deserialize)]
    struct ReusablePayload {
        #[serde(default)]
        content: Option<String>,
    }

    let data: ReusablePayload = parse(rule, payload)?;
    if let Some(content) = data.content {
        rule.content = content;
    }
    rule.applies_to.insert(Slot::Reusable);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{AdjustmentKind, Rounding};

    fn payloads(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payloads must be an object"),
        }
    }

    #[test]
    fn default_registry_covers_every_slot_in_order() {
        let registry = ModuleRegistry::with_defaults();
        let keys: Vec<&str> = registry.iter().map(|descriptor| descriptor.key).collect();
        assert_eq!(
            keys,
            vec!["long_description", "short_description", "title", "price", "gallery", "featured", "reusable"]
        );
        for descriptor in registry.iter() {
            assert_eq!(Slot::from_key(descriptor.key), Some(descriptor.slot));
        }
    }

    #[test]
    fn saves_module_payloads_onto_rule() {
        let registry = ModuleRegistry::with_defaults();
        let mut rule = Rule::new(3, "Oferta");

        registry
            .apply(
                &mut rule,
                &payloads(json!({
                    "long_description": {"content": "Hola [nombre-prod]", "placement": "append"},
                    "price": {"kind": "percentage", "direction": "decrease", "amount": "15", "rounding": "force_99"},
                    "featured": {"featured": "1"}
                })),
            )
            .expect("payloads apply");

        assert!(rule.applies_to_slot(Slot::LongDescription));
        assert_eq!(rule.content, "Hola [nombre-prod]");
        assert_eq!(rule.placement, Placement::Append);
        match rule.actions_for(Slot::Price).next() {
            Some(RuleAction::AdjustPrice(adjustment)) => {
                assert_eq!(adjustment.kind, AdjustmentKind::Percentage);
                assert_eq!(adjustment.rounding, Rounding::Force99);
                assert_eq!(adjustment.amount, 15.0);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(registry.summarize(&rule).len(), 3);
    }

    #[test]
    fn placement_is_owned_by_the_long_description_module() {
        let registry = ModuleRegistry::with_defaults();
        let mut rule = Rule::new(4, "Resumen");
        registry
            .apply(
                &mut rule,
                &payloads(json!({
                    "long_description": {"content": "Largo", "placement": "prepend"},
                    "short_description": {"content": "Corto", "placement": "append"}
                })),
            )
            .expect("payloads apply");

        assert_eq!(rule.placement, Placement::Prepend);
        assert_eq!(rule.template_for(Slot::ShortDescription), "Corto");

        let mut short_only = Rule::new(5, "Corto");
        registry
            .apply(
                &mut short_only,
                &payloads(json!({"short_description": {"content": "x", "placement": "append"}})),
            )
            .expect("short description saves");
        assert_eq!(short_only.placement, Placement::Replace);
    }

    #[test]
    fn null_payload_detaches_module() {
        let registry = ModuleRegistry::with_defaults();
        let mut rule = Rule::new(1, "Galería");
        registry
            .apply(&mut rule, &payloads(json!({"gallery": {"image_ids": [4, 5]}})))
            .expect("gallery saves");
        assert!(render_gallery(&rule).is_some());

        registry
            .apply(&mut rule, &payloads(json!({"gallery": null})))
            .expect("gallery detaches");
        assert!(!rule.applies_to_slot(Slot::Gallery));
        assert!(rule.actions.is_empty());
    }

    #[test]
    fn rejects_unknown_module_and_invalid_payload() {
        let registry = ModuleRegistry::with_defaults();
        let mut rule = Rule::new(9, "x");
        assert!(registry.apply(&mut rule, &payloads(json!({"seo": {}}))).is_err());
        assert!(registry
            .apply(&mut rule, &payloads(json!({"title": {"template": "  "}})))
            .is_err());
    }

    #[test]
    fn default_data_is_accepted_by_save() {
        let registry = ModuleRegistry::with_defaults();
        for descriptor in registry.iter() {
            let mut rule = Rule::new(1, "x");
            (descriptor.save)(&mut rule, &(descriptor.default_data)()).expect("default data saves");
            assert!(rule.applies_to_slot(descriptor.slot));
        }
    }
}
