use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use colored::*;
use gdm_core::config::CoreConfig;
use gdm_core::errors::{ConfigError, GdmError};
use gdm_core::serde_utils::{to_pretty_json, to_yaml};
use gdm_cron::{CronError, CronRuntime, RuleScheduleHook};
use gdm_protocol::catalog::{Currency, Product};
use gdm_rules::{
    load_rules, AdminState, FieldError, FieldStore, RenderOutcome, RuleApiBuilder, RuleError,
    RuleServiceConfig, RuleStore, ScheduleTransition, Slot,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuración inválida: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] GdmError),
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Fields(#[from] FieldError),
    #[error(transparent)]
    Cron(#[from] CronError),
    #[error("error de E/S en {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("producto inválido: {0}")]
    Product(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

fn io_error(path: &Path, source: std::io::Error) -> CliError {
    CliError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_product(path: &Path) -> Result<Product, CliError> {
    let raw = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    serde_json::from_str(&raw).map_err(|err| CliError::Product(err.to_string()))
}

fn currency_from(config: &CoreConfig) -> Currency {
    Currency::new(config.currency_symbol.clone(), config.price_decimals)
}

pub fn preview(
    config: &CoreConfig,
    rules_path: &Path,
    product_path: &Path,
    slot: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let store = RuleStore::with_rules(load_rules(rules_path)?)?;
    let engine = store.engine_with_currency(now, currency_from(config));
    let product = read_product(product_path)?;

    let (rendered, outcome) = engine.evaluate(&product);

    match slot {
        Some(key) => {
            let slot = Slot::from_key(key)
                .ok_or_else(|| CliError::Validation(format!("slot desconocido: {key}")))?;
            println!("{}", slot_value(&rendered, slot, engine.currency()));
            print_applied(&outcome, Some(slot));
        }
        None => {
            println!("{}", to_pretty_json(&rendered)?);
            print_applied(&outcome, None);
        }
    }
    Ok(())
}

fn slot_value(product: &Product, slot: Slot, currency: &Currency) -> String {
    match slot {
        Slot::LongDescription => product.description.clone(),
        Slot::ShortDescription => product.short_description.clone(),
        Slot::Title => product.name.clone(),
        Slot::Price => currency.format(product.active_price()),
        Slot::Gallery => format!("{:?}", product.gallery_image_ids),
        Slot::Featured => product.featured.to_string(),
        Slot::Reusable => String::new(),
    }
}

fn print_applied(outcome: &RenderOutcome, only: Option<Slot>) {
    for (slot, ids) in &outcome.applied {
        if only.map_or(false, |wanted| wanted != *slot) {
            continue;
        }
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        eprintln!("{} {}: {}", "✔".green().bold(), slot.key().bold(), ids.join(", "));
        if let Some(halt) = outcome.halted_by.get(slot) {
            eprintln!("  regla final: {}", halt);
        }
    }
    for note in &outcome.notes {
        eprintln!("{} {}", "!".yellow().bold(), note);
    }
}

pub fn validate(rules_path: &Path) -> Result<(), CliError> {
    let rules = load_rules(rules_path)?;
    for rule in &rules {
        let slots: Vec<&str> = rule.applies_to.iter().map(Slot::key).collect();
        println!(
            "{} [{}] {} (prioridad {}, {})",
            "✔".green().bold(),
            rule.id,
            rule.title.bold(),
            rule.priority,
            slots.join(", ")
        );
    }
    println!("{} reglas válidas", rules.len());
    Ok(())
}

pub fn schedule(rules_path: &Path, write: bool, now: DateTime<Utc>) -> Result<(), CliError> {
    if write && rules_path.is_dir() {
        return Err(CliError::Validation(
            "--write requiere un archivo de reglas, no un directorio".into(),
        ));
    }

    let store = RuleStore::with_rules(load_rules(rules_path)?)?;
    let transitions = store.apply_schedules(now);
    print_transitions(&transitions);

    if write && !transitions.is_empty() {
        let yaml = to_yaml(&store.export())?;
        fs::write(rules_path, yaml).map_err(|err| io_error(rules_path, err))?;
        info!(path = %rules_path.display(), "rules written back");
    }
    Ok(())
}

fn print_transitions(transitions: &[ScheduleTransition]) {
    if transitions.is_empty() {
        println!("ningún cambio de estado");
        return;
    }
    for transition in transitions {
        println!(
            "{} regla {}: {:?} → {:?}",
            "✔".green().bold(),
            transition.rule_id,
            transition.from,
            transition.to
        );
    }
}

pub async fn serve(config: &CoreConfig) -> Result<(), CliError> {
    let rules = match &config.rules_path {
        Some(path) => load_rules(path)?,
        None => Vec::new(),
    };
    let fields = match &config.fields_path {
        Some(path) => FieldStore::from_path(path)?,
        None => FieldStore::new(),
    };
    let store = RuleStore::with_rules(rules)?;
    info!(rules = store.len(), fields = fields.list().len(), "state loaded");

    let admin = AdminState::new(store.clone(), fields)
        .with_currency(currency_from(config))
        .with_admin_token(config.admin_token.clone());
    let shutdown = RuleApiBuilder::new(admin)
        .serve(RuleServiceConfig {
            bind_address: config.http_bind.clone(),
        })
        .await?;

    let mut cron = CronRuntime::new();
    cron.start(
        Arc::new(RuleScheduleHook::new(store)),
        Duration::from_secs(config.cron_interval_secs),
    )?;

    println!(
        "{} API admin en {} (cron cada {}s)",
        "✔".green().bold(),
        config.http_bind.bold(),
        config.cron_interval_secs
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| CliError::Service(err.into()))?;
    info!("shutting down");
    let _ = shutdown.send(());
    cron.shutdown().await;
    Ok(())
}
