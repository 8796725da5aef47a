use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{get_city_theme, inspect_city, ThemeService};
use shared::error::ApiError;
use storage::{redact, ControlStore};
use tracing_subscriber::EnvFilter;

/// Operator utilities for the control database.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "CONTROL_DB_URL")]
    database_url: String,
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and run a trivial query.
    Ping,
    /// Print the theme exactly as the HTTP endpoint would serve it.
    Theme { slug: String },
    /// Print the stored record, including disabled cities.
    Inspect { slug: String },
    /// Create the cities table in the local SQLite database named by
    /// `--database-url`.
    InitDev,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms.max(1));
    if matches!(cli.command, Command::InitDev) {
        ensure_dev_database(&cli.database_url)?;
    }
    let store = ControlStore::connect(&cli.database_url, timeout).await?;

    match cli.command {
        Command::Ping => {
            store.health_check().await?;
            println!("ok {}", redact(&cli.database_url));
        }
        Command::Theme { slug } => {
            let svc = ThemeService::new(Arc::new(store)).with_query_timeout(timeout);
            match get_city_theme(&svc, &slug).await {
                Ok(theme) => println!("{}", serde_json::to_string_pretty(&theme)?),
                Err(err) => return Ok(report(err)),
            }
        }
        Command::Inspect { slug } => {
            let svc = ThemeService::new(Arc::new(store)).with_query_timeout(timeout);
            match inspect_city(&svc, &slug).await {
                Ok(city) => {
                    println!("id:              {}", city.id.0);
                    println!("name:            {}", city.name);
                    println!("slug:            {}", city.slug);
                    println!("active:          {}", city.is_active);
                    println!("logo_url:        {}", city.logo_url);
                    println!("primary_color:   {}", city.primary_color);
                    println!("secondary_color: {}", city.secondary_color);
                    println!("accent_color:    {}", city.accent_color);
                    println!("db_url:          {}", redact(&city.db_url));
                }
                Err(err) => return Ok(report(err)),
            }
        }
        Command::InitDev => {
            store.create_schema().await?;
            println!("cities table ready");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn ensure_dev_database(database_url: &str) -> Result<()> {
    if !database_url.starts_with("sqlite:") {
        anyhow::bail!("init-dev only targets local sqlite databases");
    }
    Ok(())
}

fn report(err: ApiError) -> ExitCode {
    eprintln!("{:?} ({}): {}", err.code, err.code.http_status(), err.message);
    ExitCode::FAILURE
}
