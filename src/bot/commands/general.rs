//! General Discord commands - ping and help.
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Recurring Ledger Help**\n\n\
        **Templates**\n\
        • `/recurring add <amount> <kind> <frequency> <start> <category> [description] [end]` - Creates a recurring income or expense.\n\
        • `/recurring list` - Lists your templates with their next occurrence.\n\
        • `/recurring pause <id>` / `/recurring resume <id>` - Stops or restarts a template.\n\
        • `/recurring delete <id>` - Deletes a template; posted transactions are kept.\n\n\
        **Processing**\n\
        • `/process_recurring` - Posts every occurrence that is due now.\n\
        • `/session_start` - Processes now and then every interval while the session runs.\n\
        • `/session_end` - Stops periodic processing.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        Dates use the `YYYY-MM-DD` format. The start date itself is not posted; the first \
        transaction lands one period later.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
