use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use spanish_tutor::api::{ApiServer, AppState};
use spanish_tutor::config::AppConfig;
use spanish_tutor::db::Database;
use spanish_tutor::llm::{build_generator, ProviderCredentials};
use spanish_tutor::logging::{init_logging, OperationTimer};
use spanish_tutor::models::{AccentRegion, MistakeCategory, SessionMode};
use spanish_tutor::prompts::{build_opening_prompt, build_tutor_system_prompt, TutorPromptOptions};
use spanish_tutor::repository::{SqliteTutorRepository, TutorRepository};
use spanish_tutor::suggestion::suggested_mode;
use spanish_tutor::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Bind address (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the system prompt the tutor would use
    Prompt {
        /// Program week
        #[arg(short, long, default_value = "1")]
        week: u32,

        /// Session mode (free_conversation, roleplay, storytelling, speed_round, debate)
        #[arg(short, long, default_value = "free_conversation")]
        mode: String,

        /// Accent (mexico, spain, colombia, neutral)
        #[arg(short, long, default_value = "neutral")]
        accent: String,

        /// Learner memory to include
        #[arg(long)]
        memory: Option<String>,

        /// Comma-separated recent mistake categories, newest first
        #[arg(long, value_delimiter = ',')]
        mistakes: Vec<String>,

        /// Print the opening prompt instead
        #[arg(long)]
        opening: bool,
    },
    /// Show the suggested mode for a week and recent history
    SuggestMode {
        /// Program week
        #[arg(short, long)]
        week: u32,

        /// Comma-separated recent session modes, newest first
        #[arg(short, long, value_delimiter = ',')]
        recent: Vec<String>,
    },
    /// Create the database and its tables
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        &config.logging.format,
    )?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await?,
        Commands::Prompt { week, mode, accent, memory, mistakes, opening } => {
            print_prompt(week, &mode, &accent, memory.as_deref(), &mistakes, opening);
        },
        Commands::SuggestMode { week, recent } => {
            let mode = suggested_mode(week, &recent);
            println!("{} ({})", mode.as_str(), mode.label());
        },
        Commands::InitDb => {
            let url = config.get_database_url();
            InputValidator::validate_database_url(&url)?;
            let timer = OperationTimer::new("init_db");
            Database::from_config(&spanish_tutor::config::DatabaseConfig { url: url.clone(), ..config.database.clone() })
                .with_context(|| format!("Failed to initialize database at {url}"))?;
            timer.finish();
            info!(url = %url, "Database ready");
        },
    }

    Ok(())
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    info!("Starting spanish-tutor");

    let url = config.get_database_url();
    InputValidator::validate_database_url(&url)?;
    let database = Database::from_config(&spanish_tutor::config::DatabaseConfig { url, ..config.database.clone() })
        .context("Failed to open database")?;
    let repository: Arc<dyn TutorRepository> = Arc::new(SqliteTutorRepository::new(database));

    let credentials = ProviderCredentials::from_env();
    let generator = build_generator(&credentials, &config.llm);
    match &generator {
        Some(generator) => info!(provider = %generator.provider(), "Model provider selected"),
        None => warn!("No GEMINI_API_KEY or OPENAI_API_KEY set; chat requests will fail"),
    }

    let state = AppState::new(repository, generator, &config);
    ApiServer::new(config.server.clone(), state).start().await
}

fn print_prompt(week: u32, mode: &str, accent: &str, memory: Option<&str>, mistakes: &[String], opening: bool) {
    if opening {
        println!("{}", build_opening_prompt(week));
        return;
    }

    let last_mistakes: Vec<MistakeCategory> = mistakes
        .iter()
        .filter_map(|name| {
            let category = MistakeCategory::parse(name.trim());
            if category.is_none() {
                warn!(category = %name, "Ignoring unknown mistake category");
            }
            category
        })
        .collect();

    let prompt = build_tutor_system_prompt(&TutorPromptOptions {
        week,
        mode: SessionMode::parse_or_default(mode),
        accent: AccentRegion::parse_or_default(accent),
        learner_memory: memory,
        last_mistakes: &last_mistakes,
    });
    println!("{prompt}");
}
