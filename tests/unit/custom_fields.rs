// Tests for order-time custom fields: definition parsing, visibility,
// validation of shopper selections and fee computation.
use gdm_protocol::cart::CartSelection;
use gdm_protocol::catalog::{Product, ProductBuilder};
use gdm_rules::{FieldError, FieldStore, FieldType, VisibilityMode};
use test_case::test_case;

const FIELDS: &str = r#"[
  {"id": "mensaje", "label": "Mensaje", "type": "text", "price_modifier": "1,5"},
  {"id": "regalo", "label": "Envolver para regalo", "type": "checkbox", "price_modifier": 3},
  {"id": "color", "label": "Color", "type": "select", "required": "1",
   "options": [{"label": "Rojo", "price": 0}, {"label": "Oro", "price": "7"}]},
  {"id": "sin_libros", "label": "Dedicatoria", "type": "text",
   "condition": {"mode": "hide", "category_ids": "8"}}
]"#;

fn store() -> FieldStore {
    FieldStore::from_json(FIELDS).expect("fields load")
}

fn book() -> Product {
    ProductBuilder::new(4, "Novela").category(8, "libros").build()
}

#[test]
fn parses_loose_definitions() {
    let fields = store().list();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0].price_modifier, 1.5);
    assert_eq!(fields[1].field_type, FieldType::Checkbox);
    assert!(fields[2].required);
    assert_eq!(fields[2].options[1].price, 7.0);
    assert_eq!(fields[3].condition.mode, VisibilityMode::Hide);
    assert_eq!(fields[3].condition.category_ids, vec![8]);
}

#[test]
fn hide_condition_removes_field_for_matching_category() {
    let visible: Vec<String> = store()
        .visible_fields(&book())
        .into_iter()
        .map(|field| field.id)
        .collect();
    assert_eq!(visible, vec!["mensaje", "regalo", "color"]);
    assert_eq!(store().visible_fields(&Product::new(5, "Taza")).len(), 4);
}

#[test_case("si", 3.0 ; "spanish yes")]
#[test_case("on", 3.0 ; "html checkbox")]
#[test_case("0", 0.0 ; "unticked")]
fn checkbox_fee_depends_on_tick(value: &str, expected: f64) {
    let selection = CartSelection::new(5)
        .with_value("color", "Rojo")
        .with_value("regalo", value);
    let total: f64 = store()
        .fees(&Product::new(5, "Taza"), &selection)
        .iter()
        .map(|fee| fee.amount)
        .sum();
    assert_eq!(total, expected);
}

#[test]
fn fees_scale_with_quantity() {
    let mut selection = CartSelection::new(5)
        .with_value("mensaje", "Feliz día")
        .with_value("color", "Oro");
    selection.quantity = 3;

    let fees = store().fees(&Product::new(5, "Taza"), &selection);
    assert_eq!(fees.len(), 2);
    assert_eq!(fees[0].label, "Mensaje: Feliz día");
    assert_eq!(fees[0].amount, 4.5);
    assert_eq!(fees[1].amount, 21.0);
}

#[test]
fn rejects_hidden_and_missing_values() {
    let store = store();
    let hidden = CartSelection::new(4)
        .with_value("color", "Rojo")
        .with_value("sin_libros", "Para Ana");
    assert_eq!(
        store.validate(&book(), &hidden),
        Err(FieldError::UnknownField("sin_libros".into()))
    );

    let blank = CartSelection::new(4).with_value("color", "   ");
    assert_eq!(
        store.validate(&book(), &blank),
        Err(FieldError::Required("color".into()))
    );
}

#[test]
fn saved_definitions_need_unique_ids() {
    let store = store();
    let mut fields = store.list();
    fields.push(fields[0].clone());
    assert_eq!(
        store.replace_all(fields),
        Err(FieldError::DuplicateId("mensaje".into()))
    );
    assert_eq!(store.list().len(), 4, "failed save leaves the list untouched");
}

#[test]
fn serialized_list_round_trips_through_store() {
    let json = store().to_json().expect("serializes");
    let reloaded = FieldStore::from_json(&json).expect("reloads");
    assert_eq!(reloaded.list(), store().list());
}
