// End-to-end rendering scenarios: rules are composed and applied to products
// through the public engine API exactly as a page render would.
use chrono::{Duration, Utc};
use gdm_protocol::catalog::{Product, ProductBuilder};
use gdm_rules::{
    parse_rules, AdjustmentDirection, AdjustmentKind, Placement, PriceAdjustment,
    PriceComparison, PriceCondition, Rounding, Rule, RuleAction, RuleEngine, RuleStatus,
    RuleStore, Schedule, Scope, Slot, Variant, VariantKind,
};
use test_case::test_case;

fn text_rule(id: u64, priority: i32, placement: Placement, content: &str) -> Rule {
    let mut rule = Rule::new(id, format!("rule {id}"));
    rule.priority = priority;
    rule.applies_to.insert(Slot::LongDescription);
    rule.scope = Scope::everything();
    rule.placement = placement;
    rule.content = content.into();
    rule
}

fn widget() -> Product {
    ProductBuilder::new(1, "Widget")
        .description("Original.")
        .price(19.2)
        .category(3, "gadgets")
        .build()
}

#[test]
fn replaces_description_with_expanded_template() {
    let engine = RuleEngine::new(vec![text_rule(1, 5, Placement::Replace, "Hello [nombre-prod]!")]);
    let (rendered, outcome) = engine.evaluate(&widget());

    assert_eq!(rendered.description, "Hello Widget!");
    assert_eq!(outcome.applied_to(Slot::LongDescription), &[1]);
}

#[test]
fn appends_matching_rules_in_priority_order() {
    let engine = RuleEngine::new(vec![
        text_rule(2, 2, Placement::Append, " second"),
        text_rule(1, 1, Placement::Append, " first"),
    ]);
    let (rendered, _) = engine.evaluate(&widget());
    assert_eq!(rendered.description, "Original. first second");
}

#[test]
fn forced_rule_shadows_higher_priority_matches() {
    let mut forced = text_rule(2, 50, Placement::Append, " forced");
    forced.forced = true;
    let engine = RuleEngine::new(vec![text_rule(1, 1, Placement::Append, " normal"), forced]);

    let (rendered, outcome) = engine.evaluate(&widget());
    assert_eq!(rendered.description, "Original. forced");
    assert_eq!(outcome.applied_to(Slot::LongDescription), &[2]);
}

#[test]
fn final_rule_halts_the_slot() {
    let mut stop = text_rule(1, 1, Placement::Replace, "Stop here");
    stop.is_final = true;
    let engine = RuleEngine::new(vec![stop, text_rule(2, 2, Placement::Append, " never")]);

    let (rendered, outcome) = engine.evaluate(&widget());
    assert_eq!(rendered.description, "Stop here");
    assert_eq!(outcome.halted_by.get(&Slot::LongDescription), Some(&1));
}

#[test]
fn cyclic_inclusion_terminates() {
    let mut a = text_rule(10, 1, Placement::Replace, "A[rule-11]");
    a.applies_to.insert(Slot::Reusable);
    let mut b = Rule::new(11, "B");
    b.applies_to.insert(Slot::Reusable);
    b.content = "B[rule-10]".into();

    let engine = RuleEngine::new(vec![a, b]);
    let (rendered, outcome) = engine.evaluate(&widget());
    assert_eq!(rendered.description, "AB");
    assert_eq!(outcome.applied_to(Slot::LongDescription), &[10]);
}

#[test]
fn reusable_only_rule_is_never_applied_directly() {
    let mut block = Rule::new(7, "Bloque");
    block.applies_to.insert(Slot::Reusable);
    block.scope = Scope::everything();
    block.content = "Garantía de 2 años".into();
    let engine = RuleEngine::new(vec![
        block,
        text_rule(1, 1, Placement::Append, " [rule-7] [rule-404]"),
    ]);

    let (rendered, outcome) = engine.evaluate(&widget());
    assert_eq!(rendered.description, "Original. Garantía de 2 años [rule-404]");
    assert!(outcome.applied.values().all(|ids| !ids.contains(&7)));
}

#[test]
fn selects_meta_variant_over_default() {
    let mut rule = text_rule(1, 1, Placement::Replace, "Info: [var-cond]");
    rule.variants = vec![
        Variant::when(VariantKind::Tag, "sale", "", "SALE"),
        Variant::when(VariantKind::Meta, "x", "y", "META"),
        Variant::fallback("DEFAULT"),
    ];
    let engine = RuleEngine::new(vec![rule]);
    let product = ProductBuilder::new(2, "Lamp").meta("x", "y").build();

    let (rendered, _) = engine.evaluate(&product);
    assert_eq!(rendered.description, "Info: META");

    let (plain, _) = engine.evaluate(&Product::new(3, "Chair"));
    assert_eq!(plain.description, "Info: DEFAULT");
}

#[test]
fn disabled_rule_never_matches_inside_its_window() {
    let now = Utc::now();
    let mut rule = text_rule(1, 1, Placement::Replace, "Promo");
    rule.status = RuleStatus::Deshabilitada;
    rule.schedule = Schedule::window(Some(now - Duration::days(1)), Some(now + Duration::days(1)));

    let (direct, _) = RuleEngine::new(vec![rule.clone()]).evaluate(&widget());
    assert_eq!(direct.description, "Original.");

    let store = RuleStore::with_rules(vec![rule]).expect("rules seed");
    assert!(store.engine_for(now).is_empty());
}

#[test]
fn scope_predicates_are_or_combined() {
    let mut rule = text_rule(1, 1, Placement::Replace, "Barato");
    rule.scope = Scope {
        categories: vec![99],
        price: Some(PriceCondition {
            comparison: PriceComparison::LessThan,
            min: 20.0,
            max: 0.0,
        }),
        ..Scope::default()
    };
    let engine = RuleEngine::new(vec![rule]);

    let (cheap, _) = engine.evaluate(&widget());
    assert_eq!(cheap.description, "Barato");

    let pricey = ProductBuilder::new(5, "Sofa").description("Caro").price(900.0).build();
    let (rendered, outcome) = engine.evaluate(&pricey);
    assert_eq!(rendered.description, "Caro");
    assert!(outcome.is_empty());
}

#[test_case(Rounding::Force99, 19.99 ; "force 99")]
#[test_case(Rounding::Ceiling, 20.0 ; "ceiling")]
#[test_case(Rounding::Nearest, 19.0 ; "nearest")]
fn price_rounding_is_applied_to_sale_price(rounding: Rounding, expected: f64) {
    let mut rule = Rule::new(1, "Redondeo");
    rule.applies_to.insert(Slot::Price);
    rule.actions.push(RuleAction::AdjustPrice(PriceAdjustment {
        kind: AdjustmentKind::Fixed,
        direction: AdjustmentDirection::Decrease,
        amount: 0.0,
        rounding,
        ..PriceAdjustment::default()
    }));

    let (rendered, _) = RuleEngine::new(vec![rule]).evaluate(&widget());
    let sale = rendered.sale_price.expect("sale price set");
    assert!((sale - expected).abs() < 1e-9, "got {sale}");
}

#[test]
fn composing_twice_is_idempotent() {
    let rule = text_rule(1, 1, Placement::Replace, "[nombre-prod] a [precio-prod]");
    let engine = RuleEngine::new(vec![rule.clone()]);

    let first = engine.preview(&rule, Slot::LongDescription, &widget());
    let second = engine.preview(&rule, Slot::LongDescription, &widget());
    assert_eq!(first, "Widget a $19.20");
    assert_eq!(first, second);
}

#[test]
fn malformed_configuration_is_coerced() {
    let rules = parse_rules(
        r#"
- id: 1
  priority: "not a number"
  applies_to: [descripcion]
  content: "Ok"
  scope:
    categories: "3, x"
    price:
      comparison: mayor
      min: "abc"
"#,
        std::path::Path::new("inline.yaml"),
    )
    .expect("malformed values are tolerated");

    assert_eq!(rules[0].priority, 0);
    assert_eq!(rules[0].scope.categories, vec![3]);
    let (rendered, _) = RuleEngine::new(rules).evaluate(&widget());
    assert_eq!(rendered.description, "Ok");
}
