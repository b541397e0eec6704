//! Tests for the `initialize` command.

use similar_asserts::assert_eq;

use event_data_cli::{run, Command, Context};
use event_data_configuration::environment::FixedEnvironment;
use event_data_configuration::{parse_configuration, DatabaseType, ParsedConfiguration};

fn context(dir: &tempfile::TempDir, backend: Option<DatabaseType>) -> Context<FixedEnvironment, Vec<u8>> {
    Context {
        context_path: dir.path().to_owned(),
        environment: FixedEnvironment::default(),
        backend,
        output: Vec::new(),
    }
}

#[tokio::test]
async fn writes_an_initial_configuration() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    run(Command::Initialize, context(&dir, None)).await?;

    assert!(dir.path().join("schema.json").exists());
    let parsed = parse_configuration(dir.path()).await?;
    assert_eq!(parsed, ParsedConfiguration::initial());
    Ok(())
}

#[tokio::test]
async fn records_a_chosen_backend() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    run(
        Command::Initialize,
        context(&dir, Some(DatabaseType::Clickhouse)),
    )
    .await?;

    let parsed = parse_configuration(dir.path()).await?;
    assert_eq!(parsed.backend.as_deref(), Some(DatabaseType::Clickhouse.name()));
    Ok(())
}

#[tokio::test]
async fn does_not_overwrite_an_existing_configuration() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    run(Command::Initialize, context(&dir, None)).await?;

    let result = run(Command::Initialize, context(&dir, None)).await;

    assert!(result.is_err());
    Ok(())
}
