//! Admin-action HTTP API.
//!
//! Every admin operation is a named action posted to `/admin-ajax/:action`
//! and dispatched through an explicit table of handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use gdm_protocol::cart::CartSelection;
use gdm_protocol::catalog::{Currency, Product};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cache::RequestCache;
use crate::condition::matches;
use crate::fields::{CustomField, FieldError, FieldStore};
use crate::registry::ModuleRegistry;
use crate::rule::{Rule, RuleId, RuleStatus, Slot};
use crate::{RuleError, RuleHistoryEntry, RuleStore};

/// Header carrying the admin nonce.
pub const NONCE_HEADER: &str = "x-gdm-nonce";

/// Failure of an admin action, mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid or missing nonce")]
    InvalidNonce,
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
}

impl ActionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ActionError::InvalidNonce => StatusCode::FORBIDDEN,
            ActionError::UnknownAction(_) | ActionError::NotFound(_) => StatusCode::NOT_FOUND,
            ActionError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            ActionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ActionError::InvalidNonce => "invalid_nonce",
            ActionError::UnknownAction(_) => "unknown_action",
            ActionError::MalformedPayload(_) => "malformed_payload",
            ActionError::NotFound(_) => "not_found",
            ActionError::Validation(_) => "validation",
        }
    }
}

impl From<RuleError> for ActionError {
    fn from(value: RuleError) -> Self {
        match value {
            RuleError::NotFound(_) => ActionError::NotFound(value.to_string()),
            other => ActionError::Validation(other.to_string()),
        }
    }
}

impl From<FieldError> for ActionError {
    fn from(value: FieldError) -> Self {
        ActionError::Validation(value.to_string())
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "data": { "code": self.code(), "message": self.to_string() },
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Shared state handed to every action handler.
#[derive(Clone)]
pub struct AdminState {
    pub store: RuleStore,
    pub fields: FieldStore,
    pub registry: Arc<ModuleRegistry>,
    pub currency: Currency,
    pub admin_token: Option<String>,
}

impl AdminState {
    pub fn new(store: RuleStore, fields: FieldStore) -> Self {
        Self {
            store,
            fields,
            registry: Arc::new(ModuleRegistry::with_defaults()),
            currency: Currency::default(),
            admin_token: None,
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Require the given token in the nonce header of every action.
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    fn check_nonce(&self, headers: &HeaderMap) -> Result<(), ActionError> {
        let Some(expected) = &self.admin_token else {
            return Ok(());
        };
        let provided = headers.get(NONCE_HEADER).and_then(|value| value.to_str().ok());
        match provided {
            Some(nonce) if nonce == expected => Ok(()),
            _ => Err(ActionError::InvalidNonce),
        }
    }
}

pub type ActionHandler = fn(&AdminState, Value) -> Result<Value, ActionError>;

/// Explicit registration table of admin actions.
pub fn action_table() -> HashMap<&'static str, ActionHandler> {
    let mut table: HashMap<&'static str, ActionHandler> = HashMap::new();
    table.insert("gdm_list_rules", list_rules);
    table.insert("gdm_get_rule", get_rule);
    table.insert("gdm_save_rule", save_rule);
    table.insert("gdm_delete_rule", delete_rule);
    table.insert("gdm_toggle_rule", toggle_rule);
    table.insert("gdm_bulk_toggle", bulk_toggle);
    table.insert("gdm_preview_rule", preview_rule);
    table.insert("gdm_list_modules", list_modules);
    table.insert("gdm_list_fields", list_fields);
    table.insert("gdm_save_fields", save_fields);
    table.insert("gdm_cart_fees", cart_fees);
    table
}

#[derive(Clone)]
struct RuleServiceState {
    admin: AdminState,
    actions: Arc<HashMap<&'static str, ActionHandler>>,
}

/// Configuration for the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleServiceConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8081".to_string()
}

impl Default for RuleServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Helper used by binaries and tests to compose the admin router.
#[derive(Clone)]
pub struct RuleApiBuilder {
    state: RuleServiceState,
}

impl RuleApiBuilder {
    pub fn new(admin: AdminState) -> Self {
        Self {
            state: RuleServiceState {
                admin,
                actions: Arc::new(action_table()),
            },
        }
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/admin-ajax/:action", post(dispatch))
            .with_state(self.state)
    }

    /// Spawns an HTTP server binding to the configured address.
    pub async fn serve(self, config: RuleServiceConfig) -> anyhow::Result<oneshot::Sender<()>> {
        let (tx, rx) = oneshot::channel();
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        let app = self.into_router();

        tokio::spawn(async move {
            info!(address = %config.bind_address, "starting admin service");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
                .ok();
        });

        Ok(tx)
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn dispatch(
    State(state): State<RuleServiceState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ActionError> {
    state.admin.check_nonce(&headers).map_err(|err| {
        warn!(action = %action, "admin action rejected: bad nonce");
        err
    })?;

    let handler = state
        .actions
        .get(action.as_str())
        .ok_or_else(|| ActionError::UnknownAction(action.clone()))?;

    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|err| ActionError::MalformedPayload(err.to_string()))?
    };

    match handler(&state.admin, payload) {
        Ok(data) => Ok(Json(json!({ "success": true, "data": data }))),
        Err(err) => {
            warn!(action = %action, error = %err, "admin action failed");
            Err(err)
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, ActionError> {
    serde_json::from_value(payload).map_err(|err| ActionError::MalformedPayload(err.to_string()))
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, ActionError> {
    serde_json::to_value(value).map_err(|err| ActionError::Validation(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct RuleRef {
    id: RuleId,
    #[serde(default)]
    updated_by: Option<String>,
}

#[derive(Debug, Serialize)]
struct RuleSummary {
    id: RuleId,
    title: String,
    priority: i32,
    status: RuleStatus,
    version: u32,
    modules: Vec<ModuleSummary>,
}

#[derive(Debug, Serialize)]
struct ModuleSummary {
    key: &'static str,
    summary: String,
}

fn list_rules(state: &AdminState, _payload: Value) -> Result<Value, ActionError> {
    let rules: Vec<RuleSummary> = state
        .store
        .list()
        .into_iter()
        .map(|entry| RuleSummary {
            id: entry.rule.id,
            title: entry.rule.title.clone(),
            priority: entry.rule.priority,
            status: entry.rule.status,
            version: entry.version,
            modules: state
                .registry
                .summarize(&entry.rule)
                .into_iter()
                .map(|(key, summary)| ModuleSummary { key, summary })
                .collect(),
        })
        .collect();
    to_data(&rules)
}

fn find_rule(state: &AdminState, id: RuleId) -> Result<RuleHistoryEntry, ActionError> {
    state
        .store
        .get(id)
        .ok_or_else(|| ActionError::from(RuleError::NotFound(id)))
}

fn get_rule(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: RuleRef = parse(payload)?;
    to_data(&find_rule(state, request.id)?)
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(default)]
    id: Option<RuleId>,
    #[serde(default)]
    rule: Option<Rule>,
    #[serde(default)]
    modules: Map<String, Value>,
    #[serde(default)]
    updated_by: Option<String>,
}

fn save_rule(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: SaveRequest = parse(payload)?;
    let mut rule = match (request.rule, request.id) {
        (Some(rule), _) => rule,
        (None, Some(id)) if id != 0 => find_rule(state, id)?.rule,
        (None, _) => Rule::default(),
    };

    state.registry.apply(&mut rule, &request.modules)?;
    let entry = state.store.put_rule(rule, request.updated_by)?;
    info!(rule_id = entry.rule.id, version = entry.version, "rule saved");
    to_data(&entry)
}

fn delete_rule(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: RuleRef = parse(payload)?;
    let removed = state.store.delete(request.id)?;
    info!(rule_id = removed.id, "rule deleted");
    Ok(json!({ "id": removed.id }))
}

fn toggle_rule(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: RuleRef = parse(payload)?;
    to_data(&state.store.toggle(request.id, request.updated_by)?)
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    #[serde(deserialize_with = "gdm_core::serde_utils::lenient_ids")]
    ids: Vec<RuleId>,
    status: RuleStatus,
    #[serde(default)]
    updated_by: Option<String>,
}

fn bulk_toggle(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: BulkRequest = parse(payload)?;
    let report = state
        .store
        .bulk_set_status(&request.ids, request.status, request.updated_by);
    to_data(&report)
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    #[serde(default)]
    id: Option<RuleId>,
    #[serde(default)]
    rule: Option<Rule>,
    slot: Slot,
    product: Product,
}

fn preview_rule(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: PreviewRequest = parse(payload)?;
    let rule = match (request.rule, request.id) {
        (Some(rule), _) => rule,
        (None, Some(id)) => find_rule(state, id)?.rule,
        (None, None) => {
            return Err(ActionError::MalformedPayload(
                "either `id` or `rule` is required".into(),
            ))
        }
    };

    let engine = state
        .store
        .engine_with_currency(Utc::now(), state.currency.clone());
    let content = engine.preview(&rule, request.slot, &request.product);
    let in_scope = matches(&rule, &request.product, &mut RequestCache::new());
    Ok(json!({ "slot": request.slot, "content": content, "matches": in_scope }))
}

fn list_modules(state: &AdminState, _payload: Value) -> Result<Value, ActionError> {
    let modules: Vec<Value> = state
        .registry
        .iter()
        .map(|descriptor| {
            json!({
                "key": descriptor.key,
                "label": descriptor.label,
                "slot": descriptor.slot,
                "order": descriptor.order,
                "default_data": (descriptor.default_data)(),
            })
        })
        .collect();
    Ok(Value::Array(modules))
}

fn list_fields(state: &AdminState, _payload: Value) -> Result<Value, ActionError> {
    to_data(&state.fields.list())
}

#[derive(Debug, Deserialize)]
struct SaveFieldsRequest {
    fields: Vec<CustomField>,
}

fn save_fields(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: SaveFieldsRequest = parse(payload)?;
    let count = request.fields.len();
    state.fields.replace_all(request.fields)?;
    info!(count, "custom fields saved");
    Ok(json!({ "count": count }))
}

#[derive(Debug, Deserialize)]
struct CartFeesRequest {
    product: Product,
    selection: CartSelection,
}

fn cart_fees(state: &AdminState, payload: Value) -> Result<Value, ActionError> {
    let request: CartFeesRequest = parse(payload)?;
    state.fields.validate(&request.product, &request.selection)?;

    let fees = state.fields.fees(&request.product, &request.selection);
    let total: f64 = fees.iter().map(|fee| fee.amount).sum();
    let display: Vec<Value> = state
        .fields
        .display(&request.product, &request.selection)
        .into_iter()
        .map(|(label, value)| json!({ "label": label, "value": value }))
        .collect();

    Ok(json!({
        "fees": to_data(&fees)?,
        "total": total,
        "formatted_total": state.currency.format(total),
        "display": display,
    }))
}
