//! The command-line interface: initialize a configuration directory and run event data
//! queries against the backend it selects.

mod filters;

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use event_data::connector::EventDataSetup;
use event_data::{health, query};
use event_data_configuration as configuration;
use event_data_configuration::environment::Environment;

pub use filters::{FilterArgument, FilterArgumentError};

/// Query distinct event data values from PostgreSQL or ClickHouse.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Arguments {
    /// The configuration directory.
    #[arg(long = "context", env = "EVENT_DATA_CONTEXT_PATH", default_value = ".")]
    pub context_path: PathBuf,
    /// Select the backend regardless of the configuration file.
    #[arg(long, env = "EVENT_DATA_BACKEND", global = true, value_enum)]
    pub backend: Option<configuration::DatabaseType>,
    #[command(subcommand)]
    pub command: Command,
}

/// The various contextual bits and bobs we need to run.
pub struct Context<Env: Environment, Output: Write> {
    pub context_path: PathBuf,
    pub environment: Env,
    pub backend: Option<configuration::DatabaseType>,
    pub output: Output,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write an initial configuration file into the configuration directory.
    Initialize,
    /// Print the distinct values of an event data property as JSON.
    Values(ValuesArguments),
    /// Check that the configured backend is reachable.
    Health,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ValuesArguments {
    #[arg(long)]
    pub website_id: Uuid,
    /// Start of the window, e.g. 2024-03-01T00:00:00Z.
    #[arg(long)]
    pub start: DateTime<Utc>,
    /// End of the window, inclusive.
    #[arg(long)]
    pub end: DateTime<Utc>,
    /// The event data key whose values are listed.
    #[arg(long)]
    pub property: Option<String>,
    /// A filter such as `country=DE`, `browser!=safari`, `title~pricing` or `url!~/blog`.
    /// Repeating a key with the same operator matches any of the values.
    #[arg(long = "filter", value_parser = filters::parse_filter_argument)]
    pub filters: Vec<FilterArgument>,
}

/// Run a command in a given directory.
pub async fn run<Env: Environment, Output: Write>(
    command: Command,
    context: Context<Env, Output>,
) -> anyhow::Result<()> {
    match command {
        Command::Initialize => initialize(context).await?,
        Command::Values(arguments) => values(arguments, context).await?,
        Command::Health => check_health(context).await?,
    };
    Ok(())
}

/// Initialize an empty directory with a configuration that reads both backends' connection
/// settings from the environment.
async fn initialize<Env: Environment, Output: Write>(
    context: Context<Env, Output>,
) -> anyhow::Result<()> {
    let configuration_file = context
        .context_path
        .join(configuration::version1::CONFIGURATION_FILENAME);
    if tokio::fs::try_exists(&configuration_file).await? {
        anyhow::bail!(
            "{} already exists; refusing to overwrite it",
            configuration_file.display()
        );
    }

    let mut parsed = configuration::ParsedConfiguration::initial();
    parsed.backend = context.backend.map(|backend| backend.to_string());
    configuration::write_parsed_configuration(parsed, &context.context_path).await?;
    Ok(())
}

async fn values<Env: Environment, Output: Write>(
    arguments: ValuesArguments,
    mut context: Context<Env, Output>,
) -> anyhow::Result<()> {
    let filters = filters::query_filters(
        arguments.start,
        arguments.end,
        arguments.property,
        arguments.filters,
    )?;

    let setup = EventDataSetup::new(context.environment).with_backend(context.backend);
    let configuration = setup.parse_configuration(&context.context_path).await?;
    let mut registry = prometheus::Registry::new();
    let state = setup.try_init_state(&configuration, &mut registry).await?;

    let rows = query::get_event_data_values(&state, arguments.website_id, &filters).await?;

    serde_json::to_writer_pretty(&mut context.output, &rows)?;
    writeln!(context.output)?;
    Ok(())
}

async fn check_health<Env: Environment, Output: Write>(
    mut context: Context<Env, Output>,
) -> anyhow::Result<()> {
    let setup = EventDataSetup::new(context.environment).with_backend(context.backend);
    let configuration = setup.parse_configuration(&context.context_path).await?;
    let mut registry = prometheus::Registry::new();
    let state = setup.try_init_state(&configuration, &mut registry).await?;

    health::health_check(&state).await?;
    writeln!(context.output, "{} backend is healthy", configuration.database_type())?;
    Ok(())
}
