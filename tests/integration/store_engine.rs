// Integration between the rule store, the loader and the engine: rules are
// loaded from disk, edited in the store and rendered through `engine_for`.
use std::fs;

use chrono::{DateTime, Duration, Utc};
use gdm_protocol::catalog::{Currency, CurrencyPosition, ProductBuilder};
use gdm_rules::{load_rules, RuleError, RuleStatus, RuleStore, Schedule, Slot};

const DESCRIPTIONS: &str = r#"
rules:
  - id: 1
    title: Envío
    priority: 2
    applies_to: [long_description]
    placement: append
    content: " Envío gratis."
  - title: Precio visible
    priority: 1
    applies_to: [short_description]
    content: "Ahora [precio-prod]"
"#;

const PRICES: &str = r#"[
  {"id": 5, "title": "Rebaja", "applies_to": ["price", "title"],
   "scope": {"categories": [3]},
   "actions": [
     {"type": "adjust_price", "kind": "percentage", "amount": "10", "rounding": "force_95"},
     {"type": "set_title", "template": " (-10%)", "placement": "append"}
   ]}
]"#;

fn instant(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("valid instant")
}

#[test]
fn loads_directory_and_renders_through_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("a_descriptions.yaml"), DESCRIPTIONS).expect("write yaml");
    fs::write(dir.path().join("b_prices.json"), PRICES).expect("write json");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write txt");

    let rules = load_rules(dir.path()).expect("rules load");
    assert_eq!(rules.len(), 3);
    let ids: Vec<u64> = rules.iter().map(|rule| rule.id).collect();
    assert_eq!(ids, vec![6, 1, 5], "sorted by priority, missing id allocated after the max");

    let store = RuleStore::with_rules(rules).expect("rules seed");
    let mut currency = Currency::new("€", 2);
    currency.decimal_separator = ",".into();
    currency.thousand_separator = ".".into();
    currency.position = CurrencyPosition::RightSpace;
    let engine = store.engine_with_currency(Utc::now(), currency);

    let product = ProductBuilder::new(9, "Mesa")
        .description("Roble.")
        .price(120.0)
        .category(3, "muebles")
        .build();
    let (rendered, outcome) = engine.evaluate(&product);

    assert_eq!(rendered.description, "Roble. Envío gratis.");
    assert_eq!(rendered.short_description, "Ahora 120,00 €");
    assert_eq!(rendered.name, "Mesa (-10%)");
    assert_eq!(rendered.sale_price, Some(108.95));
    assert_eq!(outcome.applied_to(Slot::Price), &[5]);
    assert_eq!(outcome.applied_to(Slot::Title), &[5]);
}

#[test]
fn duplicate_ids_across_files_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("one.yaml"), "id: 4\ncontent: a\n").expect("write");
    fs::write(dir.path().join("two.yaml"), "id: 4\ncontent: b\n").expect("write");

    assert!(matches!(
        load_rules(dir.path()),
        Err(RuleError::DuplicateRule { id: 4 })
    ));
}

#[test]
fn toggling_changes_what_the_engine_sees() {
    let store = RuleStore::with_rules(load_rules_from(DESCRIPTIONS)).expect("rules seed");
    let product = ProductBuilder::new(1, "Silla").description("Pino.").build();

    store.toggle(1, Some("ana".into())).expect("rule 1 exists");
    let (rendered, _) = store.engine_for(Utc::now()).evaluate(&product);
    assert_eq!(rendered.description, "Pino.");

    let report = store.bulk_set_status(&[1, 2, 77], RuleStatus::Habilitada, None);
    assert_eq!(report.changed, vec![1]);
    assert_eq!(report.unchanged, vec![2]);
    assert_eq!(report.missing, vec![77]);

    let (rendered, _) = store.engine_for(Utc::now()).evaluate(&product);
    assert_eq!(rendered.description, "Pino. Envío gratis.");
    assert_eq!(store.history(1).len(), 3);
}

#[test]
fn schedule_window_opens_once_and_closes() {
    let start = instant("2026-06-01T00:00:00Z");
    let end = instant("2026-06-30T00:00:00Z");
    let mut rules = load_rules_from(DESCRIPTIONS);
    rules[0].status = RuleStatus::Deshabilitada;
    rules[0].schedule = Schedule::window(Some(start), Some(end));
    let id = rules[0].id;
    let store = RuleStore::with_rules(rules).expect("rules seed");

    assert!(store.apply_schedules(start - Duration::hours(1)).is_empty());

    let opened = store.apply_schedules(start + Duration::hours(1));
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].to, RuleStatus::Habilitada);
    assert_eq!(store.engine_for(start + Duration::hours(1)).rules().len(), 2);

    // a manual disable inside the window sticks
    store
        .set_status(id, RuleStatus::Deshabilitada, Some("ana".into()))
        .expect("rule exists");
    assert!(store.apply_schedules(start + Duration::hours(2)).is_empty());

    store
        .set_status(id, RuleStatus::Habilitada, None)
        .expect("rule exists");
    let closed = store.apply_schedules(end);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].to, RuleStatus::Deshabilitada);
    assert_eq!(
        store.get(id).and_then(|entry| entry.updated_by),
        Some("scheduler".to_string())
    );
}

fn load_rules_from(raw: &str) -> Vec<gdm_rules::Rule> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rules.yaml");
    fs::write(&path, raw).expect("write rules");
    load_rules(&path).expect("rules load")
}
