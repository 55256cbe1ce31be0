//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the recurring ledger: the manual
//! "process now" trigger, session start/stop for periodic processing, and template
//! management commands.

/// Discord command implementations (recurring, general)
pub mod commands;

use crate::{
    core::{ledger::SeaOrmLedger, processor::RecurringProcessor, scheduler::PeriodicSessions},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Processor type used by the bot.
pub type AppProcessor = RecurringProcessor<SeaOrmLedger>;

/// Shared data available to all bot commands.
/// Holds the database connection, the processor shared by every trigger, and the
/// registry of running periodic sessions.
pub struct BotData {
    /// Database connection for template and transaction queries
    pub database: DatabaseConnection,
    /// Processor shared by the manual trigger and all sessions
    pub processor: Arc<AppProcessor>,
    /// Running periodic sessions keyed by user
    pub sessions: PeriodicSessions<SeaOrmLedger>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(
        database: DatabaseConnection,
        processor: Arc<AppProcessor>,
        sessions: PeriodicSessions<SeaOrmLedger>,
    ) -> Self {
        Self {
            database,
            processor,
            sessions,
        }
    }
}

/// Poise command context carrying [`BotData`].
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Registers commands, begins sessions for `auto_start_users`, and runs the client
/// until it stops.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData, auto_start_users: Vec<String>) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::recurring(),
                commands::process_recurring(),
                commands::session_start(),
                commands::session_end(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                for user_id in &auto_start_users {
                    if data.sessions.begin(user_id).await {
                        info!(user_id, "Started recurring session from config");
                    }
                }

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;

    Ok(())
}
