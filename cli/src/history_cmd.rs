use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_answer::{ConversationLog, JsonFileConversationLog};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct HistoryCli {
    /// Directory holding persisted conversations
    #[arg(long, value_name = "DIR", global = true, default_value = ".docqa/conversations")]
    pub history_dir: PathBuf,

    /// Client whose conversations to use
    #[arg(long, global = true, default_value = "default")]
    pub client: String,

    /// Print as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List conversations, most recent first
    List,

    /// Show the messages of one conversation
    Show {
        #[arg(value_name = "ID")]
        conversation_id: String,
    },

    /// Delete one conversation
    Delete {
        #[arg(value_name = "ID")]
        conversation_id: String,
    },

    /// Delete all of the client's conversations
    Clear,
}

impl HistoryCli {
    pub async fn run(self) -> Result<()> {
        let log = JsonFileConversationLog::new(&self.history_dir);

        match self.command {
            HistoryCommand::List => {
                let summaries = log
                    .conversations(&self.client)
                    .await
                    .context("Failed to list conversations")?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&summaries)?);
                    return Ok(());
                }
                if summaries.is_empty() {
                    println!("No conversations yet.");
                    return Ok(());
                }
                for summary in &summaries {
                    let updated = summary
                        .last_updated
                        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "{} {} {} {}",
                        summary.conversation_id.bright_cyan(),
                        format!("({} messages)", summary.message_count).bright_black(),
                        updated.bright_black(),
                        summary.preview
                    );
                }
            }
            HistoryCommand::Show { conversation_id } => {
                let entries = log
                    .history(&self.client, &conversation_id)
                    .await
                    .context("Failed to load conversation")?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                    return Ok(());
                }
                if entries.is_empty() {
                    anyhow::bail!("Conversation {conversation_id} not found");
                }
                for entry in &entries {
                    println!("{} {}", "Q:".bright_yellow(), entry.question);
                    println!("{} {}", "A:".bright_green(), entry.answer);
                    println!(
                        "   {}\n",
                        format!(
                            "confidence {:.2}, {} sources",
                            entry.confidence, entry.sources_count
                        )
                        .bright_black()
                    );
                }
            }
            HistoryCommand::Delete { conversation_id } => {
                let deleted = log
                    .delete(&self.client, &conversation_id)
                    .await
                    .context("Failed to delete conversation")?;
                if !deleted {
                    anyhow::bail!("Conversation {conversation_id} not found");
                }
                println!("{} Conversation {conversation_id} deleted", "✓".bright_green());
            }
            HistoryCommand::Clear => {
                log.clear(&self.client)
                    .await
                    .context("Failed to clear conversations")?;
                println!("{} All conversations cleared", "✓".bright_green());
            }
        }

        Ok(())
    }
}
