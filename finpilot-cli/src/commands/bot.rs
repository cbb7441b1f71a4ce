//! Bot command - feed a chat message through the bot

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use finpilot_core::services::bot::{detect_intent, parse_message, render_twiml, welcome_message};
use finpilot_core::{LogEvent, LoggingService};

use super::{get_context, log_event, print_json};

#[derive(Subcommand)]
pub enum BotCommands {
    /// Handle an inbound message and print the reply
    Message {
        /// Sender number, e.g. "whatsapp:+919876543210"
        #[arg(long)]
        from: String,
        /// Message text (read from stdin when omitted)
        body: Option<String>,
        /// Print the reply as a TwiML document
        #[arg(long)]
        twiml: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a message would be parsed, without recording it
    Parse {
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the welcome message
    Welcome {
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn run(command: BotCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    match command {
        BotCommands::Message {
            from,
            body,
            twiml,
            json,
        } => {
            let body = match body {
                Some(body) => body,
                None if atty::isnt(atty::Stream::Stdin) => {
                    let mut buffer = String::new();
                    io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read message from stdin")?;
                    buffer
                }
                None => anyhow::bail!("No message provided. Pass it as an argument or pipe it from stdin."),
            };

            let ctx = get_context(logger)?;
            let reply = ctx.bot.process_message(&from, &body)?;
            log_event(logger, LogEvent::new("bot_message").with_command("bot"));

            if json {
                return print_json(&serde_json::json!({
                    "intent": detect_intent(&body),
                    "reply": reply,
                }));
            }
            if twiml {
                println!("{}", render_twiml(&reply));
            } else {
                println!("{}", reply);
            }
        }
        BotCommands::Parse { text, json } => {
            let parsed = parse_message(&text)?;
            let intent = detect_intent(&text);
            if json {
                return print_json(&serde_json::json!({ "intent": intent, "parsed": parsed }));
            }
            println!("Intent:      {:?}", intent);
            println!(
                "Amount:      {}",
                parsed
                    .amount
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("Category:    {}", parsed.category.label());
            println!("Description: {}", parsed.description);
        }
        BotCommands::Welcome { name } => {
            println!("{}", welcome_message(name.as_deref()));
        }
    }

    Ok(())
}
