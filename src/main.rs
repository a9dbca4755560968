use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use greeter_bot::application::errors::{BotError, CommandError};
use greeter_bot::application::messaging::Listener;
use greeter_bot::domain::entities::{CommandRegistry, Profile, UserStatus};
use greeter_bot::domain::traits::UserStore;
use greeter_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use greeter_bot::infrastructure::config::Config;
use greeter_bot::infrastructure::database::Database;

#[derive(Parser)]
#[command(name = "greeter-bot")]
#[command(about = "A Telegram bot that greets and remembers its users", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config and BOT_TOKEN)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (console mode when no token is configured)
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// List stored users
    Users,
    /// Change a user's status
    SetStatus {
        /// Telegram id of the user
        #[arg(allow_negative_numbers = true)]
        external_id: i64,
        /// active, suspended or temporarily-banned
        #[arg(value_parser = parse_status)]
        status: UserStatus,
    },
}

fn parse_status(s: &str) -> Result<UserStatus, String> {
    s.parse()
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Version => {
            println!("greeter-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::Run => with_runtime(run_bot(cli.config, cli.token)),
        Commands::Users => with_runtime(list_users(cli.config)),
        Commands::SetStatus { external_id, status } => {
            with_runtime(set_status(cli.config, external_id, status))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn with_runtime(task: impl std::future::Future<Output = Result<(), BotError>>) -> Result<(), BotError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(task)
}

/// Config file (if present) overlaid with `.env` and the process environment
fn load_config(config_path: &str) -> Result<Config, BotError> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env loaded: {}", e);
    }

    let mut config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        tracing::debug!("{} not found, using defaults", config_path);
        Config::default()
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

async fn run_bot(config_path: String, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(&config_path)?;
    tracing::info!("Starting {}", config.bot.name);

    let registry = Arc::new(CommandRegistry::with_defaults()?);
    let store: Arc<dyn UserStore> = Arc::new(Database::open(&config.database.url)?);
    tracing::info!("Database initialized");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match token_override.or_else(|| config.telegram.token.clone()) {
        Some(token) => {
            let bot = TelegramAdapter::new(token, &config.telegram);
            let mut listener = Listener::new(bot, registry.clone(), store)
                .with_policy(config.retry_policy());

            listener.connect().await?;
            if let Err(e) = listener.bot().register_commands(&registry).await {
                tracing::warn!("Failed to register commands: {}", e);
            }
            listener.listen()?;
            listener.run_until_disconnected(shutdown).await
        }
        None => {
            tracing::warn!("No bot token configured, running in console mode");
            let user = Profile::new(config.bot.console_user_id)
                .with_username(std::env::var("USER").unwrap_or_else(|_| "console".to_string()));
            let mut listener = Listener::new(ConsoleAdapter::new(user), registry, store)
                .with_policy(config.retry_policy());
            listener.run(shutdown).await
        }
    }
}

async fn list_users(config_path: String) -> Result<(), BotError> {
    let config = load_config(&config_path)?;
    let db = Database::open(&config.database.url)?;

    let users = db.list_users().await?;
    if users.is_empty() {
        println!("No users yet.");
        return Ok(());
    }

    println!("{:<6} {:<16} {:<11} {:<19} NAME", "ID", "EXTERNAL ID", "KIND", "STATUS");
    for user in users {
        println!(
            "{:<6} {:<16} {:<11} {:<19} {}",
            user.id,
            user.external_id,
            user.kind.as_str(),
            user.status.as_str(),
            user.display_name
        );
    }
    Ok(())
}

async fn set_status(config_path: String, external_id: i64, status: UserStatus) -> Result<(), BotError> {
    let config = load_config(&config_path)?;
    let db = Database::open(&config.database.url)?;

    if db.set_status(external_id, status).await? {
        println!("User {} is now {}", external_id, status);
        Ok(())
    } else {
        Err(CommandError::NotFound(format!("user with external id {}", external_id)).into())
    }
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
