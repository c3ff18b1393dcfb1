use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

use crate::config::Environment;
use crate::errors::{GdmError, Result};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
fn default_directive(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "info",
        Environment::Staging | Environment::Development => "info,gdm_rules=debug",
    }
}

/// Installs the fmt subscriber for the given environment.
///
/// `RUST_LOG` wins over `level`. Production output carries no ANSI colours
/// and no targets.
pub fn init_tracing_for(environment: Environment, level: Option<&str>) -> Result<()> {
    let directive = level.unwrap_or_else(|| default_directive(environment));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let production = environment == Environment::Production;

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(!production)
        .with_ansi(!production && atty::is(atty::Stream::Stdout))
        .try_init()
        .map_err(|err| GdmError::GeneralError(err.to_string()))
}
