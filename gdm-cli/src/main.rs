use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use gdm_core::config::CoreConfig;
use gdm_core::logging::init_tracing_for;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "gdm")]
#[command(about = "GDM - product content and pricing rules for the shop", long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, env = "GDM_LOG_LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a product against a rules file or directory
    Preview(PreviewArgs),
    /// Load and validate rules without rendering
    Validate(ValidateArgs),
    /// Apply activation windows to stored rules
    Schedule(ScheduleArgs),
    /// Run the admin API and the hourly scheduler
    Serve,
    /// Show version information
    Version,
}

#[derive(Args)]
struct PreviewArgs {
    #[arg(long)]
    rules: PathBuf,
    /// JSON file describing the product
    #[arg(long)]
    product: PathBuf,
    /// Only show one slot (e.g. long_description, price)
    #[arg(long)]
    slot: Option<String>,
    /// Evaluate as of this RFC 3339 instant instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long)]
    rules: PathBuf,
}

#[derive(Args)]
struct ScheduleArgs {
    /// Rules file to evaluate
    #[arg(long)]
    rules: PathBuf,
    /// Write the updated statuses back to the file
    #[arg(long, default_value_t = false)]
    write: bool,
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = CoreConfig::from_env()?;
    init_tracing_for(config.environment, cli.log_level.as_deref())?;

    match cli.command {
        Commands::Preview(args) => commands::preview(
            &config,
            &args.rules,
            &args.product,
            args.slot.as_deref(),
            args.at.unwrap_or_else(Utc::now),
        ),
        Commands::Validate(args) => commands::validate(&args.rules),
        Commands::Schedule(args) => {
            commands::schedule(&args.rules, args.write, args.at.unwrap_or_else(Utc::now))
        }
        Commands::Serve => commands::serve(&config).await,
        Commands::Version => {
            println!("GDM rules v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
