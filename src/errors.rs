//! Unified error type for the recurring ledger.

use crate::core::schedule::Frequency;
use chrono::NaiveDate;
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong
        message: String,
    },

    /// Amount is zero, negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// End date lies before the start date
    #[error("Invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange {
        /// Template start date
        start: NaiveDate,
        /// Template end date
        end: NaiveDate,
    },

    /// A stored template could not be interpreted
    #[error("Malformed recurring template {id}: {reason}")]
    MalformedTemplate {
        /// Template identifier
        id: i64,
        /// What is wrong with it
        reason: String,
    },

    /// No template exists with the given id
    #[error("Recurring template {id} not found")]
    TemplateNotFound {
        /// Template identifier
        id: i64,
    },

    /// Stepping a date left chrono's representable range
    #[error("Date out of range stepping {date} by one {frequency} period")]
    DateOutOfRange {
        /// The base point that could not be advanced
        date: NaiveDate,
        /// Frequency that was applied
        frequency: Frequency,
    },

    /// Environment variable missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Writing a formatted message failed
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Discord framework error: {0}")]
    Discord(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Discord(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
