use std::path::{Path, PathBuf};
use std::sync::Arc;

use collegium::cache::MemoryStore;
use collegium::cli::{Cli, Commands, ConfigAction};
use collegium::config::Config;
use collegium::error::{CollegiumError, Result};
use collegium::feedback::FeedbackAction;
use collegium::pipeline::{ChatRequest, ClientInfo, FeedbackPayload, SearchPipeline};
use collegium::pipeline::response::ErrorResponse;
use collegium::storage::{Database, NewQa, NewRecord, NewTenant};
use serde::Deserialize;

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        let body = ErrorResponse::from_error(&e);
        // The error envelope goes to stdout like any other response.
        println!(
            "{}",
            serde_json::to_string(&body).unwrap_or_else(|_| "{\"status\":\"server_error\"}".into())
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Query {
            token,
            query,
            limit,
            pretty,
        } => cmd_query(cli.config, &token, &query, limit, pretty),
        Commands::Feedback {
            token,
            target,
            action,
            query,
        } => cmd_feedback(cli.config, &token, target, &action, &query),
        Commands::Seed { file } => cmd_seed(cli.config, &file),
        Commands::Stats => cmd_stats(cli.config),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "collegium=debug" } else { "collegium=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_query(
    config_path: Option<PathBuf>,
    token: &str,
    query: &str,
    limit: Option<usize>,
    pretty: bool,
) -> Result<()> {
    let (pipeline, _config) = build_pipeline(config_path)?;

    let request = ChatRequest {
        token: token.to_string(),
        query: query.to_string(),
        limit,
        feedback: None,
        client: ClientInfo::default(),
    };

    let response = pipeline.handle(&request)?;
    let json = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .map_err(|e| CollegiumError::Json {
        source: e,
        context: "Failed to serialize response".to_string(),
    })?;
    println!("{json}");

    Ok(())
}

fn cmd_feedback(
    config_path: Option<PathBuf>,
    token: &str,
    target: i64,
    action: &str,
    query: &str,
) -> Result<()> {
    let (pipeline, _config) = build_pipeline(config_path)?;
    let action: FeedbackAction = action.parse()?;

    let request = ChatRequest {
        token: token.to_string(),
        query: query.to_string(),
        limit: None,
        feedback: Some(FeedbackPayload {
            target_id: target,
            action,
        }),
        client: ClientInfo::default(),
    };

    let response = pipeline.handle(&request)?;
    let json = serde_json::to_string(&response).map_err(|e| CollegiumError::Json {
        source: e,
        context: "Failed to serialize response".to_string(),
    })?;
    println!("{json}");

    Ok(())
}

/// Seed file shape: optional arrays of tenants, records and Q&A rows.
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    tenants: Vec<NewTenant>,
    #[serde(default)]
    records: Vec<NewRecord>,
    #[serde(default)]
    qa: Vec<NewQa>,
}

fn cmd_seed(config_path: Option<PathBuf>, file: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    let content = std::fs::read_to_string(file).map_err(|e| CollegiumError::Io {
        source: e,
        context: format!("Failed to read seed file: {:?}", file),
    })?;
    let seed: SeedFile = serde_json::from_str(&content).map_err(|e| CollegiumError::Json {
        source: e,
        context: format!("Failed to parse seed file: {:?}", file),
    })?;

    for tenant in &seed.tenants {
        db.insert_tenant(tenant)?;
    }
    for record in &seed.records {
        db.insert_record(record)?;
    }
    for qa in &seed.qa {
        db.insert_qa(qa)?;
    }

    println!(
        "Seeded {} tenants, {} records, {} Q&A rows",
        seed.tenants.len(),
        seed.records.len(),
        seed.qa.len()
    );

    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;
    let stats = db.stats()?;

    println!("Collegium Statistics");
    println!("====================");
    println!("Tenants:          {}", stats.tenant_count);
    println!("Records:          {}", stats.record_count);
    println!("Q&A suggestions:  {}", stats.qa_count);
    println!("Interaction logs: {}", stats.log_count);

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| CollegiumError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{json}");
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| CollegiumError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn build_pipeline(config_path: Option<PathBuf>) -> Result<(SearchPipeline, Config)> {
    let config = load_config(config_path)?;
    let db = Arc::new(open_database(&config)?);
    let cache = Arc::new(MemoryStore::new());
    let pipeline = SearchPipeline::new(db, cache, config.clone());
    Ok((pipeline, config))
}

fn open_database(config: &Config) -> Result<Database> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    Database::new(&data_dir.join("collegium.db"))
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'collegium config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| CollegiumError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| CollegiumError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
