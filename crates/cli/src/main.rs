use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use denta_bot::{BotConfig, ConfiguredBot, TurnContext};
use denta_core::{MissingDatePolicy, Participant};
use denta_observability::{init_tracing, BotMetrics};

#[derive(Debug, Parser)]
#[command(name = "dentabot")]
#[command(about = "Dental office assistant: availability, booking and FAQ answers")]
struct Cli {
    /// Local FAQ directory used when no hosted knowledge base is configured.
    #[arg(long, env = "DENTA_KB_ROOT")]
    kb_root: Option<PathBuf>,

    /// default_today or require_entity.
    #[arg(long, env = "DENTA_MISSING_DATE_POLICY")]
    missing_date: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation.
    Chat {
        #[arg(long, default_value = "local-user")]
        user: String,
    },
    /// Classify one utterance and print the routing decision.
    Route { text: String },
    /// Print the greeting sent to new participants.
    Welcome,
}

/// Prints bot replies to stdout.
struct ConsoleContext;

impl TurnContext for ConsoleContext {
    async fn send_activity(&self, text: &str) {
        println!("\n{}\n", text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("denta_cli");
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let bot = ConfiguredBot::from_config(&config, BotMetrics::shared())?;

    match cli.command {
        Command::Chat { user } => run_chat(&bot, &config.bot_id, &user).await?,
        Command::Route { text } => {
            let (classification, decision) = bot
                .classify_and_route(&text)
                .await
                .context("classifier call failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "classification": classification,
                    "decision": decision,
                }))?
            );
        }
        Command::Welcome => {
            bot.on_members_added(&ConsoleContext, &config.bot_id, &[Participant::new("you")])
                .await;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<BotConfig> {
    let mut config = BotConfig::from_env().context("invalid DENTA_* configuration")?;

    if let Some(kb_root) = &cli.kb_root {
        config.kb_root = kb_root.clone();
    }
    if let Some(policy) = &cli.missing_date {
        config.policy.missing_date = MissingDatePolicy::parse(policy)
            .with_context(|| format!("invalid --missing-date value: {policy}"))?;
    }

    Ok(config)
}

async fn run_chat(bot: &ConfiguredBot, bot_id: &str, user: &str) -> Result<()> {
    bot.on_members_added(&ConsoleContext, bot_id, &[Participant::new(user)])
        .await;
    println!("type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        bot.on_message(&ConsoleContext, message).await;
    }

    Ok(())
}
