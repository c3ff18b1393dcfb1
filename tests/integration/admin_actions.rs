// Integration tests for the admin-action HTTP API: every action goes through
// the axum router with JSON payloads, as the admin screens send them.
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use gdm_protocol::catalog::ProductBuilder;
use gdm_rules::{AdminState, FieldStore, Rule, RuleApiBuilder, RuleServiceConfig, RuleStore, Slot, NONCE_HEADER};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

const TOKEN: &str = "nonce-123";

fn seeded_state() -> AdminState {
    let mut greeting = Rule::new(1, "Saludo");
    greeting.applies_to.insert(Slot::LongDescription);
    greeting.content = "Hola [nombre-prod]".into();

    let mut block = Rule::new(2, "Bloque");
    block.applies_to.insert(Slot::Reusable);
    block.content = "Garantía".into();

    AdminState::new(RuleStore::with_rules(vec![greeting, block]).expect("rules seed"), FieldStore::new())
        .with_admin_token(Some(TOKEN.into()))
}

async fn post(app: &Router, action: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::post(format!("/admin-ajax/{action}"))
        .header(NONCE_HEADER, TOKEN)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds");
    let response = app.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).expect("json response"))
}

#[tokio::test]
async fn saving_past_the_largest_id_is_a_validation_error() {
    let app = RuleApiBuilder::new(seeded_state()).into_router();

    let (status, _) = post(&app, "gdm_save_rule", json!({"rule": {"id": u64::MAX}})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "gdm_save_rule", json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["data"]["code"], json!("validation"));

    let (_, listed) = post(&app, "gdm_list_rules", json!({})).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn rule_lifecycle_through_actions() {
    let state = seeded_state();
    let app = RuleApiBuilder::new(state.clone()).into_router();

    let (status, saved) = post(
        &app,
        "gdm_save_rule",
        json!({
            "modules": {
                "short_description": {"content": "Incluye [rule-2]"},
                "featured": {"featured": true}
            },
            "updated_by": "ana"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = saved["data"]["rule"]["id"].as_u64().expect("allocated id");
    assert_eq!(id, 3);

    let (_, listed) = post(&app, "gdm_list_rules", json!({})).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(3));

    let (status, toggled) = post(&app, "gdm_toggle_rule", json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["data"]["rule"]["status"], json!("deshabilitada"));

    let (_, report) = post(
        &app,
        "gdm_bulk_toggle",
        json!({"ids": [1, id, 99], "status": "habilitada"}),
    )
    .await;
    assert_eq!(report["data"]["changed"], json!([id]));
    assert_eq!(report["data"]["missing"], json!([99]));

    let (status, _) = post(&app, "gdm_delete_rule", json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "gdm_get_rule", json!({"id": id})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.store.len(), 2);
}

#[tokio::test]
async fn preview_expands_nested_rules() {
    let app = RuleApiBuilder::new(seeded_state()).into_router();
    let product = ProductBuilder::new(8, "Lámpara").build();

    let (status, body) = post(
        &app,
        "gdm_preview_rule",
        json!({
            "rule": {"id": 50, "applies_to": ["long_description"], "content": "[nombre-prod]: [rule-2]"},
            "slot": "long_description",
            "product": product
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], json!("Lámpara: Garantía"));
}

#[tokio::test]
async fn custom_fields_are_saved_and_priced() {
    let app = RuleApiBuilder::new(seeded_state()).into_router();

    let (status, _) = post(
        &app,
        "gdm_save_fields",
        json!({"fields": [
            {"id": "grabado", "label": "Grabado", "type": "text", "price_modifier": 2.5},
            {"id": "talla", "label": "Talla", "type": "select", "options": []}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        &app,
        "gdm_save_fields",
        json!({"fields": [
            {"id": "grabado", "label": "Grabado", "type": "text", "price_modifier": 2.5}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, fields) = post(&app, "gdm_list_fields", json!({})).await;
    assert_eq!(fields["data"][0]["id"], json!("grabado"));

    let (status, fees) = post(
        &app,
        "gdm_cart_fees",
        json!({
            "product": ProductBuilder::new(1, "Anillo").build(),
            "selection": {"product_id": 1, "quantity": 2, "values": {"grabado": "A & B"}}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fees["data"]["total"], json!(5.0));
    assert_eq!(fees["data"]["formatted_total"], json!("$5.00"));
    assert_eq!(fees["data"]["display"][0]["value"], json!("A & B"));
}

#[tokio::test]
async fn lists_registered_modules_in_order() {
    let app = RuleApiBuilder::new(seeded_state()).into_router();
    let (_, body) = post(&app, "gdm_list_modules", json!({})).await;
    let keys: Vec<&str> = body["data"]
        .as_array()
        .expect("module list")
        .iter()
        .filter_map(|module| module["key"].as_str())
        .collect();
    assert_eq!(keys.first(), Some(&"long_description"));
    assert_eq!(keys.last(), Some(&"reusable"));
}

#[tokio::test]
async fn rejects_bad_nonce_and_malformed_body() {
    let app = RuleApiBuilder::new(seeded_state()).into_router();

    let forged = Request::post("/admin-ajax/gdm_list_rules")
        .header(NONCE_HEADER, "wrong")
        .body(Body::empty())
        .expect("request builds");
    let response = app.clone().oneshot(forged).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let broken = Request::post("/admin-ajax/gdm_save_rule")
        .header(NONCE_HEADER, TOKEN)
        .body(Body::from("{\"rule\": "))
        .expect("request builds");
    let response = app.oneshot(broken).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn serves_health_over_tcp() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let addr = listener.local_addr().expect("address available");
    drop(listener);

    let shutdown = RuleApiBuilder::new(seeded_state())
        .serve(RuleServiceConfig {
            bind_address: addr.to_string(),
        })
        .await
        .expect("service started");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connects");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("request sent");
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.expect("response read");

    assert!(raw.starts_with("HTTP/1.1 200"));
    assert!(raw.contains("\"status\":\"ok\""));
    let _ = shutdown.send(());
}
