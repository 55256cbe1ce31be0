//! Recurring Discord commands - template management, manual processing, and sessions.
//!
//! Every command acts on the invoking user's own templates; the Discord user id is the
//! ledger's user id.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{
            processor::ProcessOutcome,
            recurring, schedule,
            schedule::Frequency,
            template::{NewTemplate, RecurringTemplate, TransactionKind},
        },
        errors::{Error, Result},
    };
    use chrono::{NaiveDate, Utc};
    use std::fmt::Write;

    const DATE_FORMAT: &str = "%Y-%m-%d";

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum KindChoice {
        #[name = "expense"]
        Expense,
        #[name = "income"]
        Income,
    }

    impl From<KindChoice> for TransactionKind {
        fn from(value: KindChoice) -> Self {
            match value {
                KindChoice::Expense => Self::Expense,
                KindChoice::Income => Self::Income,
            }
        }
    }

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum FrequencyChoice {
        #[name = "weekly"]
        Weekly,
        #[name = "monthly"]
        Monthly,
        #[name = "yearly"]
        Yearly,
    }

    impl From<FrequencyChoice> for Frequency {
        fn from(value: FrequencyChoice) -> Self {
            match value {
                FrequencyChoice::Weekly => Self::Weekly,
                FrequencyChoice::Monthly => Self::Monthly,
                FrequencyChoice::Yearly => Self::Yearly,
            }
        }
    }

    fn parse_date(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
    }

    /// Parent command for managing recurring templates.
    #[poise::command(
        slash_command,
        subcommands(
            "recurring_add",
            "recurring_list",
            "recurring_pause",
            "recurring_resume",
            "recurring_delete"
        )
    )]
    pub async fn recurring(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Recurring template management. Available subcommands:\n\
            `/recurring add` - Create a template\n\
            `/recurring list` - List your templates\n\
            `/recurring pause` - Pause a template\n\
            `/recurring resume` - Resume a template\n\
            `/recurring delete` - Delete a template";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a recurring income or expense.
    ///
    /// The first transaction is posted one period after the start date.
    #[poise::command(slash_command, rename = "add")]
    pub async fn recurring_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount per occurrence"] amount: f64,
        #[description = "Income or expense"] kind: KindChoice,
        #[description = "How often it repeats"] frequency: FrequencyChoice,
        #[description = "Start date (YYYY-MM-DD)"] start_date: String,
        #[description = "Category (e.g. 'Rent/Mortgage')"] category: String,
        #[description = "Optional description"] description: Option<String>,
        #[description = "Optional last date an occurrence may fall on (YYYY-MM-DD)"]
        end_date: Option<String>,
    ) -> Result<()> {
        let Some(start) = parse_date(&start_date) else {
            ctx.say(format!("❌ Invalid start date '{start_date}'. Use YYYY-MM-DD."))
                .await?;
            return Ok(());
        };

        let end = match end_date.as_deref().map(|raw| (raw, parse_date(raw))) {
            None => None,
            Some((_, Some(end))) => Some(end),
            Some((raw, None)) => {
                ctx.say(format!("❌ Invalid end date '{raw}'. Use YYYY-MM-DD."))
                    .await?;
                return Ok(());
            }
        };

        if category.trim().is_empty() {
            ctx.say("❌ Category cannot be empty.").await?;
            return Ok(());
        }

        let input = NewTemplate {
            user_id: ctx.author().id.to_string(),
            amount,
            kind: kind.into(),
            category: category.trim().to_string(),
            description: description.unwrap_or_else(|| category.trim().to_string()),
            start_date: start,
            frequency: frequency.into(),
            end_date: end,
        };

        let db = &ctx.data().database;
        match recurring::create_template(db, input).await {
            Ok(created) => {
                ctx.say(format!(
                    "✅ Recurring {} of ${:.2} created (ID: {}), repeating {} from {}.",
                    created.kind, created.amount, created.id, created.frequency, created.start_date
                ))
                .await?;
            }
            Err(Error::InvalidAmount { amount }) => {
                ctx.say(format!("❌ Invalid amount {amount}: must be greater than zero."))
                    .await?;
            }
            Err(Error::InvalidDateRange { start, end }) => {
                ctx.say(format!("❌ End date {end} is before start date {start}."))
                    .await?;
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Lists your recurring templates with their next occurrence.
    #[poise::command(slash_command, rename = "list")]
    pub async fn recurring_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let db = &ctx.data().database;
        let rows = recurring::list_templates_for_user(db, &user_id).await?;

        if rows.is_empty() {
            ctx.say("📭 You have no recurring templates. Create one with `/recurring add`.")
                .await?;
            return Ok(());
        }

        let today = Utc::now().date_naive();
        let mut message = String::from("**Your recurring templates**\n");
        for row in rows {
            let id = row.id;
            let Ok(template) = RecurringTemplate::try_from(row) else {
                writeln!(message, "• #{id} ⚠️ unreadable template")?;
                continue;
            };

            let status = if !template.active {
                "paused/ended".to_string()
            } else if schedule::is_due(&template, today).unwrap_or(false) {
                "due now".to_string()
            } else {
                template
                    .next_occurrence()
                    .map_or_else(|_| "no further dates".to_string(), |d| format!("next {d}"))
            };

            write!(
                message,
                "• #{} {} ${:.2} {} - {} ({})",
                template.id,
                template.kind,
                template.amount,
                template.frequency,
                template.description,
                status
            )?;
            if let Some(end) = template.end_date {
                write!(message, ", ends {end}")?;
            }
            message.push('\n');
        }

        ctx.say(message).await?;
        Ok(())
    }

    /// Pauses a recurring template.
    #[poise::command(slash_command, rename = "pause")]
    pub async fn recurring_pause(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Template ID from /recurring list"] id: i64,
    ) -> Result<()> {
        set_active(ctx, id, false).await
    }

    /// Resumes a paused recurring template.
    ///
    /// Occurrences missed while paused are caught up on the next run.
    #[poise::command(slash_command, rename = "resume")]
    pub async fn recurring_resume(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Template ID from /recurring list"] id: i64,
    ) -> Result<()> {
        set_active(ctx, id, true).await
    }

    async fn set_active(ctx: poise::Context<'_, BotData, Error>, id: i64, active: bool) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let db = &ctx.data().database;

        if recurring::set_template_active(db, id, &user_id, active).await? {
            let verb = if active { "resumed" } else { "paused" };
            ctx.say(format!("✅ Template #{id} {verb}.")).await?;
        } else {
            ctx.say(format!("❌ You have no template #{id}.")).await?;
        }
        Ok(())
    }

    /// Deletes a recurring template. Transactions it already posted are kept.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn recurring_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Template ID from /recurring list"] id: i64,
    ) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let db = &ctx.data().database;

        if recurring::delete_template(db, id, &user_id).await? {
            ctx.say(format!("🗑️ Template #{id} deleted.")).await?;
        } else {
            ctx.say(format!("❌ You have no template #{id}.")).await?;
        }
        Ok(())
    }

    /// Posts every recurring occurrence that is due now.
    #[poise::command(slash_command)]
    pub async fn process_recurring(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();

        // Acknowledge command quickly
        ctx.defer().await?;

        match ctx.data().processor.process(&user_id).await {
            ProcessOutcome::Completed(report) => {
                let mut message = format!(
                    "✅ Recurring transactions processed: {} posted",
                    report.generated.len()
                );
                if !report.deactivated.is_empty() {
                    write!(message, ", {} template(s) ended", report.deactivated.len())?;
                }
                if !report.failures.is_empty() {
                    write!(
                        message,
                        ", {} template(s) will be retried",
                        report.failures.len()
                    )?;
                }
                message.push('.');
                ctx.say(message).await?;
            }
            ProcessOutcome::Skipped => {
                ctx.say("ℹ️ Recurring processing is already running. Try again in a moment.")
                    .await?;
            }
            ProcessOutcome::Aborted(_) => {
                ctx.say("❌ Failed to process recurring transactions. Please try again later.")
                    .await?;
            }
        }

        Ok(())
    }

    /// Starts periodic processing of your recurring templates.
    #[poise::command(slash_command)]
    pub async fn session_start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();

        if ctx.data().sessions.begin(&user_id).await {
            ctx.say("▶️ Session started. Due transactions are posted now and then periodically.")
                .await?;
        } else {
            ctx.say("ℹ️ Your session is already running.").await?;
        }
        Ok(())
    }

    /// Stops periodic processing of your recurring templates.
    #[poise::command(slash_command)]
    pub async fn session_end(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user_id = ctx.author().id.to_string();

        if ctx.data().sessions.end(&user_id).await {
            ctx.say("⏹️ Session ended. Periodic processing stopped.").await?;
        } else {
            ctx.say("ℹ️ You have no running session.").await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
