mod ai;
mod api;
mod cli;
mod config;
mod db;
mod ledger;
mod mood;

use crate::ai::{ChatSummarizer, Summarizer};
use crate::cli::{AiCommands, Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use crate::ledger::LedgerService;
use crate::ledger::aggregate::{format_minutes, render_rollup};
use crate::ledger::model::{ActivityDraft, ActivityPatch, DATE_FORMAT};
use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let owner_override = cli.owner;

    match cli.command {
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Ai { command } => handle_ai_command(command),
        Commands::Doctor => handle_doctor(),
        command => {
            let config = load_or_default_config()?;
            let owner = owner_override.unwrap_or_else(|| config.default_owner.clone());
            let ledger = open_ledger(&config)?;
            handle_ledger_command(&config, &ledger, &owner, command)
        }
    }
}

fn handle_ledger_command(
    config: &Config,
    ledger: &LedgerService,
    owner: &str,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Add {
            name,
            category,
            minutes,
            date,
        } => {
            let date = date.unwrap_or_else(today);
            let record = ledger.add(
                owner,
                &ActivityDraft::new(&name, &category, minutes, &date),
            )?;
            println!(
                "Added #{}: {} ({} mins, {}) on {}",
                record.id, record.name, record.duration_minutes, record.category, record.date
            );
            Ok(())
        }
        Commands::List { date } => {
            let date = date.unwrap_or_else(today);
            let records = ledger.list_by_date(owner, &date)?;

            if records.is_empty() {
                println!("No activities logged for {date}");
                return Ok(());
            }

            println!("Activities for {date}");
            records.iter().for_each(|record| {
                println!(
                    "#{:<5} {:<28} {:<8} {:>8}",
                    record.id,
                    record.name,
                    record.category.as_str(),
                    format_minutes(u64::from(record.duration_minutes))
                );
            });
            Ok(())
        }
        Commands::Update {
            id,
            name,
            category,
            minutes,
            date,
        } => {
            let patch = ActivityPatch {
                name,
                category,
                duration: minutes.map(Value::from),
                date,
            };
            let record = ledger.update(owner, id, &patch)?;
            println!(
                "Updated #{}: {} ({} mins, {}) on {}",
                record.id, record.name, record.duration_minutes, record.category, record.date
            );
            Ok(())
        }
        Commands::Delete { id } => {
            let outcome = ledger.delete(owner, id)?;
            if outcome.removed {
                println!("Deleted #{id}");
            } else {
                println!("Nothing to delete: #{id} does not exist");
            }
            Ok(())
        }
        Commands::Summary { date } => {
            let date = date.unwrap_or_else(today);
            let rollup = ledger.aggregate_for_date(owner, &date)?;
            print!("{}", render_rollup(&date, &rollup));
            Ok(())
        }
        Commands::Mood { date, prompt_only } => {
            let date = date.unwrap_or_else(today);
            let prompt = ledger.mood_prompt_for_date(owner, &date)?;

            if prompt_only {
                println!("[system]\n{}\n\n[user]\n{}", prompt.system, prompt.user);
                return Ok(());
            }

            let summarizer = ChatSummarizer::from_config(config);
            let text = mood::analyze(&summarizer, &prompt)?;
            println!("{text}");
            Ok(())
        }
        Commands::Dates { limit } => {
            let dates = ledger.recent_dates(owner, limit)?;
            if dates.is_empty() {
                println!("No activities logged yet");
            }
            dates.iter().for_each(|date| println!("{date}"));
            Ok(())
        }
        other => bail!("not a ledger command: {other:?}"),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            let masked = if key.contains("api_key") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_ai_command(command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Test {
            key,
            base_url,
            model,
        } => {
            let mut config = load_or_default_config()?;

            if let Some(value) = key {
                config.ai_api_key = Some(value);
            }
            if let Some(value) = base_url {
                config.set_value("ai_api_base_url", &value)?;
            }
            if let Some(value) = model {
                config.ai_model = value;
            }

            let response = ai::test_connection(&config)?;
            println!("AI API connection successful");
            println!("{response}");

            Ok(())
        }
    }
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error:#}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.ai_enabled {
        if ai::has_api_key(&config) {
            println!("[OK] AI API key is configured");
        } else {
            println!("[WARN] AI is enabled but API key is missing");
            issues.push("ai api key missing".to_string());
        }
    } else {
        println!("[OK] AI feature disabled");
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let ledger = Arc::new(open_ledger(&config)?);
    let chat = ChatSummarizer::from_config(&config);
    if !chat.is_configured() {
        warn!("AI summarizer is not configured; mood requests will fail until ai.api_key is set");
    }
    let summarizer: Arc<dyn Summarizer> = Arc::new(chat);
    let shared_config = Arc::new(config);

    info!(
        db = %shared_config.db_path.display(),
        owner = %shared_config.default_owner,
        "DayLog service started"
    );

    tokio::select! {
        api_result = api::run_server(shared_config, ledger, summarizer) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn open_ledger(config: &Config) -> Result<LedgerService> {
    let database = Database::open(&config.db_path)?;
    Ok(LedgerService::new(Arc::new(database)))
}

fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

fn load_or_default_config() -> Result<Config> {
    let config = Config::load_or_init()?;
    config.ensure_bootstrap_files()?;
    Ok(config)
}
