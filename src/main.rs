//! Conference preparation survey bot.
//!
//! Usage:
//!   conference-bot chat [--export survey.json] [--rephrase]
//!   conference-bot serve [--bind 0.0.0.0:8787]
//!   conference-bot categories [--kind sectors|headwinds]
//!   conference-bot match "we handle billing queries" [--kind sectors]

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use conference_bot::clients::{OpenAiRephraser, PromptRephraser, rephrase_messages};
use conference_bot::config::Config;
use conference_bot::http::{HttpState, start_http_server};
use conference_bot::matcher::Matcher;
use conference_bot::registry::CategoryRegistry;
use conference_bot::telemetry;
use conference_bot::{ExportEnvelope, Reply, survey_from_config};
use prettytable::{Table, row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "conference-bot")]
#[command(about = "Conference preparation survey chatbot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Sectors,
    Headwinds,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the survey interactively on the terminal
    Chat {
        /// Write the export envelope to this file when the survey completes
        #[arg(long)]
        export: Option<PathBuf>,
        /// Rephrase bot messages through the configured LLM endpoint
        #[arg(long)]
        rephrase: bool,
    },
    /// Start the web chat host
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// List the configured categories
    Categories {
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
    /// Show how an answer ranks against a category registry
    Match {
        text: String,
        #[arg(long, value_enum, default_value = "sectors")]
        kind: Kind,
    },
}

fn build_rephraser(config: &Config, requested: bool) -> Option<Arc<dyn PromptRephraser>> {
    if !(requested || config.rephrase.enable) {
        return None;
    }
    match OpenAiRephraser::new(&config.rephrase) {
        Ok(r) => Some(Arc::new(r)),
        Err(e) => {
            tracing::warn!("Rephrasing disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_filter = telemetry::init();
    let config = Config::load()?;
    telemetry::apply_level(&log_filter, &config.runtime.log_level);

    match cli.command {
        Commands::Chat { export, rephrase } => chat(&config, export, rephrase).await,
        Commands::Serve { bind } => serve(&config, bind).await,
        Commands::Categories { kind } => categories(&config, kind),
        Commands::Match { text, kind } => match_text(&config, &text, kind),
    }
}

async fn print_reply(reply: Reply, rephraser: Option<&dyn PromptRephraser>) {
    let messages = match rephraser {
        Some(r) => rephrase_messages(r, reply.messages).await,
        None => reply.messages,
    };
    for message in messages {
        println!("{message}");
    }
}

async fn chat(config: &Config, export: Option<PathBuf>, rephrase: bool) -> Result<()> {
    let survey = survey_from_config(config)?;
    let rephraser = build_rephraser(config, rephrase);
    let (mut conversation, opening) = survey.start();
    info!("Starting terminal survey");

    print_reply(opening, rephraser.as_deref()).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !conversation.is_complete() {
        let Some(line) = lines.next_line().await? else {
            info!("Input closed before the survey finished");
            return Ok(());
        };
        let reply = conversation.handle(&line);
        print_reply(reply, rephraser.as_deref()).await;
    }

    println!();
    println!("Survey Summary");
    for line in conversation.record().summary_lines() {
        println!("  {line}");
    }

    let envelope = ExportEnvelope::new(uuid::Uuid::new_v4().to_string(), conversation.export()?);
    let json = serde_json::to_string_pretty(&envelope)?;
    println!("{json}");
    if let Some(path) = export {
        std::fs::write(&path, &json)?;
        info!("Export written to {}", path.display());
    }
    Ok(())
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let survey = survey_from_config(config)?;
    let mut state = HttpState::from_config(survey, config);
    if let Some(r) = build_rephraser(config, false) {
        state = state.with_rephraser(r);
    }
    let bind = bind.unwrap_or_else(|| config.runtime.http_bind.clone());
    start_http_server(state, &bind).await?;
    Ok(())
}

fn registry_for(catalog: &conference_bot::SurveyCatalog, kind: Kind) -> &CategoryRegistry {
    match kind {
        Kind::Sectors => &catalog.sectors,
        Kind::Headwinds => &catalog.headwinds,
    }
}

fn categories(config: &Config, kind: Option<Kind>) -> Result<()> {
    let catalog = config.survey.load_catalog()?;
    let kinds = match kind {
        Some(k) => vec![k],
        None => vec![Kind::Sectors, Kind::Headwinds],
    };
    for k in kinds {
        let registry = registry_for(&catalog, k);
        let mut table = Table::new();
        table.add_row(row!["#", registry.kind(), "Keywords"]);
        for (i, category) in registry.all().iter().enumerate() {
            table.add_row(row![i + 1, category.name, category.keywords.join(", ")]);
        }
        table.printstd();
    }
    Ok(())
}

fn match_text(config: &Config, text: &str, kind: Kind) -> Result<()> {
    let catalog = config.survey.load_catalog()?;
    let registry = registry_for(&catalog, kind);
    let ranked = Matcher::new(config.survey.short_keyword_len).rank(text, registry);
    if ranked.is_empty() {
        println!("No {} matched.", registry.kind());
        return Ok(());
    }
    let mut table = Table::new();
    table.add_row(row!["Rank", "Category", "Kind", "Score"]);
    for (i, candidate) in ranked.iter().enumerate() {
        table.add_row(row![
            i + 1,
            candidate.name(),
            format!("{:?}", candidate.match_kind),
            candidate.score
        ]);
    }
    table.printstd();
    Ok(())
}
