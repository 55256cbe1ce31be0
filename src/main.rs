use dotenvy::dotenv;
use recurring_ledger::{
    bot::{self, BotData},
    config::{database, settings},
    core::{ledger::SeaOrmLedger, processor::RecurringProcessor, scheduler::PeriodicSessions},
    errors::{Error, Result},
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load config.toml, defaults if it's missing
    let config = settings::load_config_or_default("config.toml")
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        interval_minutes = config.recurring.interval_minutes,
        max_occurrences = config.recurring.max_occurrences_per_template,
        "Configuration loaded"
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. One processor shared by the manual command and every session
    let processor = Arc::new(
        RecurringProcessor::with_system_clock(SeaOrmLedger::new(db.clone()))
            .with_catch_up_limit(config.recurring.max_occurrences_per_template),
    );
    let sessions = PeriodicSessions::new(Arc::clone(&processor), config.recurring.interval());

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    bot::run_bot(
        token,
        BotData::new(db, processor, sessions),
        config.recurring.auto_start_users,
    )
    .await
}
