//! askdb - ask a PostgreSQL database questions in plain English.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{bail, Context};
use tracing::{error, info, warn};

use ask_db::cli::Cli;
use ask_db::config::{Config, ConnectionConfig};
use ask_db::db::{self, DatabaseClient, MockDatabaseClient, Schema};
use ask_db::export::export_to_path;
use ask_db::llm::{create_client, LlmProvider, LlmTranslator};
use ask_db::logging;
use ask_db::query::QueryController;
use ask_db::render::render_result;
use ask_db::repl::Repl;
use ask_db::session::Session;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    if cli.question.is_some() {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config_path();
    info!(path = %config_path.display(), "Loading config");
    let config = Config::load_from_file(&config_path)?;

    let mut limits = config.limits;
    cli.apply_limit_overrides(&mut limits);
    let mut session = Session::from_limits(&limits)?;
    session.settings_mut().show_sql_first = cli.show_sql;

    let db = open_database(&cli, &config).await?;
    let schema = if config.llm.include_schema {
        match db.introspect_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "Schema introspection failed, continuing without schema");
                Schema::default()
            }
        }
    } else {
        Schema::default()
    };

    let provider: LlmProvider = cli
        .llm
        .as_deref()
        .unwrap_or(&config.llm.provider)
        .parse()?;
    let llm = create_client(provider, &config.llm, None)?;
    info!(%provider, tables = schema.tables.len(), "Translator ready");

    let controller = QueryController::new(
        Box::new(LlmTranslator::new(llm).with_schema(schema)),
        db,
    );

    let work = async {
        match cli.question.as_deref() {
            Some(question) => run_once(&cli, &controller, &mut session, question).await,
            None => {
                let stdin = io::stdin();
                let mut stdout = io::stdout();
                Repl::new(&controller, session)
                    .run(stdin.lock(), &mut stdout)
                    .await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    };

    controller.close_after(work).await
}

async fn run_once(
    cli: &Cli,
    controller: &QueryController,
    session: &mut Session,
    question: &str,
) -> anyhow::Result<ExitCode> {
    let rendered = controller.handle(session, question).await;

    let mut stdout = io::stdout().lock();
    for line in render_result(&rendered, session.settings().show_sql_first) {
        writeln!(stdout, "{line}")?;
    }

    if !rendered.is_success() {
        return Ok(ExitCode::FAILURE);
    }

    if let (Some(path), Some(format)) = (&cli.export, cli.export_format()?) {
        let rows = export_to_path(&rendered, path, format, cli.index)
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        writeln!(stdout, "Exported {rows} rows to {}", path.display())?;
    }

    Ok(ExitCode::SUCCESS)
}

async fn open_database(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn DatabaseClient>> {
    if cli.mock_db {
        info!("Using mock database");
        return Ok(Box::new(MockDatabaseClient::new()));
    }

    let Some(connection) = resolve_connection(cli, config)? else {
        bail!("No database connection configured. Use --help for usage information.");
    };
    info!(connection = %connection.display_string(), "Connecting");
    Ok(db::connect(&connection).await?)
}

/// Resolves the connection: CLI arguments, then the named connection, then
/// the default connection, with environment variables filling the gaps.
fn resolve_connection(cli: &Cli, config: &Config) -> anyhow::Result<Option<ConnectionConfig>> {
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                bail!("Connection '{name}' not found in config file");
            }
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    if connection.is_none() && std::env::var("PGDATABASE").is_ok() {
        connection = Some(ConnectionConfig {
            port: 5432,
            ..Default::default()
        });
    }

    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
