// ============================================================================
// hr-assistant — command-line front end for the HR assistant core
// ============================================================================
// Usage:
//   hr-assistant ask --owner O "find top 2 python developers"
//   hr-assistant chat --owner O                       Interactive session
//   hr-assistant index --owner O --profile-id P cv.json
//   hr-assistant remove --owner O --profile-id P
//   hr-assistant rebuild --owner O                     Re-embed all profiles
//   hr-assistant candidates --owner O [--search S] [--limit 50]
//   hr-assistant show --owner O --profile-id P          One candidate in full
//   hr-assistant history --owner O [--limit 10]
//   hr-assistant prune --owner O --keep 100            Trim the chat log
//   hr-assistant stats --owner O
//   hr-assistant status                                Check the Ollama server
// ============================================================================

use anyhow::{Context, Result};
use assistant_core::{
    Assistant, AssistantConfig, AssistantDb, EmbeddingService, OllamaGenerator, OwnerId,
    QueryResponse,
};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

/// HR assistant over locally indexed CVs
#[derive(Parser)]
#[command(name = "hr-assistant", version, about = "Ask questions about indexed candidate CVs")]
struct Cli {
    /// Path to the database file (default: ~/.hr-assistant/assistant.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single query
    Ask {
        #[arg(long)]
        owner: String,

        /// Query text
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Interactive conversation (exit, quit or bye to leave)
    Chat {
        #[arg(long)]
        owner: String,
    },

    /// Index a structured CV summary (JSON file)
    Index {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        profile_id: String,

        /// Path to the summary JSON
        summary: String,
    },

    /// Remove an indexed profile
    Remove {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        profile_id: String,
    },

    /// Re-embed every stored profile from its summary
    Rebuild {
        #[arg(long)]
        owner: String,
    },

    /// List indexed candidates, most recently indexed first
    Candidates {
        #[arg(long)]
        owner: String,

        /// Case-insensitive match on name, email or profile id
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Show one candidate's stored summary and text preview
    Show {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        profile_id: String,
    },

    /// Show recent exchanges, newest first
    History {
        #[arg(long)]
        owner: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Delete all but the newest exchanges
    Prune {
        #[arg(long)]
        owner: String,

        /// Number of exchanges to keep
        #[arg(long, default_value = "100")]
        keep: usize,
    },

    /// Show profile and chat counts for an owner
    Stats {
        #[arg(long)]
        owner: String,
    },

    /// Check generator reachability and model presence
    Status,
}

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

fn format_timestamp_micros(ts: i64) -> String {
    Utc.timestamp_micros(ts)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

fn format_timestamp_secs(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

fn init_logging() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("hr_assistant=info".parse()?)
        .add_directive("assistant_core=info".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = AssistantConfig::from_env();
    if cli.db_path.is_some() {
        config.db_path = cli.db_path.clone();
    }

    let generator = Arc::new(OllamaGenerator::from_config(&config));
    if let Commands::Status = cli.command {
        return cmd_status(&generator, &config).await;
    }

    let db = Arc::new(AssistantDb::open(config.db_path.as_deref(), config.embedding_dim)?);
    let assistant = Assistant::new(
        Arc::new(EmbeddingService::from_config(&config)),
        db.clone(),
        db.clone(),
        generator,
        &config,
    );

    match cli.command {
        Commands::Ask { owner, query } => cmd_ask(&assistant, &owner, &query.join(" ")).await,
        Commands::Chat { owner } => cmd_chat(&assistant, &owner).await,
        Commands::Index {
            owner,
            profile_id,
            summary,
        } => cmd_index(&assistant, &owner, &profile_id, &summary).await,
        Commands::Remove { owner, profile_id } => {
            let owner = OwnerId::parse(&owner)?;
            if assistant.indexer().remove_profile(&owner, &profile_id).await? {
                println!("Removed profile {}", profile_id);
            } else {
                println!("No profile {} for owner {}", profile_id, owner);
            }
            Ok(())
        }
        Commands::Rebuild { owner } => {
            let owner = OwnerId::parse(&owner)?;
            let rebuilt = assistant.indexer().rebuild(&owner).await?;
            println!("Rebuilt {} profiles for owner {}", rebuilt, owner);
            Ok(())
        }
        Commands::Candidates {
            owner,
            search,
            limit,
        } => cmd_candidates(&assistant, &owner, search.as_deref(), limit).await,
        Commands::Show { owner, profile_id } => cmd_show(&assistant, &owner, &profile_id).await,
        Commands::History { owner, limit } => cmd_history(&assistant, &owner, limit).await,
        Commands::Prune { owner, keep } => {
            let owner = OwnerId::parse(&owner)?;
            let pruned = db.prune_chats(&owner, keep)?;
            println!("Pruned {} exchanges (kept newest {})", pruned, keep);
            Ok(())
        }
        Commands::Stats { owner } => cmd_stats(&db, &owner),
        Commands::Status => Ok(()),
    }
}

fn print_response(response: &QueryResponse) {
    println!("{}", response.response_text);
    if response.results.is_empty() {
        return;
    }

    println!();
    println!("{:<4}  {:<7}  {:<24}  {}", "RANK", "SCORE", "CANDIDATE", "SKILLS");
    println!("{}", "-".repeat(72));
    for result in &response.results {
        let name = result
            .candidate_name
            .as_deref()
            .unwrap_or(result.profile_id.as_str())
            .chars()
            .take(24)
            .collect::<String>();
        println!(
            "{:<4}  {:<7.3}  {:<24}  {}",
            result.rank,
            result.score,
            name,
            result.skills.join(", ")
        );
    }
}

async fn cmd_ask(assistant: &Assistant, owner: &str, query: &str) -> Result<()> {
    let response = assistant.process_query(owner, query).await?;
    print_response(&response);
    Ok(())
}

async fn cmd_chat(assistant: &Assistant, owner: &str) -> Result<()> {
    let owner = OwnerId::parse(owner)?;
    info!("Starting chat session for owner {}", owner);

    println!("HR assistant ready. Type 'exit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }

        let response = assistant.process_query(owner.as_str(), line).await?;
        print!("Assistant: ");
        print_response(&response);
    }
    Ok(())
}

async fn cmd_index(assistant: &Assistant, owner: &str, profile_id: &str, path: &str) -> Result<()> {
    let owner = OwnerId::parse(owner)?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let summary: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path))?;

    if assistant.indexer().index_profile(&owner, profile_id, summary).await? {
        println!("Indexed profile {} for owner {}", profile_id, owner);
    } else {
        println!("Profile {} has no usable content; nothing indexed", profile_id);
    }
    Ok(())
}

async fn cmd_candidates(
    assistant: &Assistant,
    owner: &str,
    search: Option<&str>,
    limit: usize,
) -> Result<()> {
    let candidates = assistant.candidates(owner, search, limit).await?;
    if candidates.is_empty() {
        println!("No candidates found.");
        return Ok(());
    }

    println!("{:<16}  {:<24}  {:<28}  {}", "PROFILE", "NAME", "EMAIL", "INDEXED");
    println!("{}", "-".repeat(90));
    for candidate in &candidates {
        println!(
            "{:<16}  {:<24}  {:<28}  {}",
            candidate.profile_id.chars().take(16).collect::<String>(),
            candidate
                .candidate_name
                .as_deref()
                .unwrap_or("-")
                .chars()
                .take(24)
                .collect::<String>(),
            candidate.email.as_deref().unwrap_or("-"),
            format_timestamp_secs(candidate.updated_at)
        );
    }
    println!("\nTotal: {} candidates", candidates.len());
    Ok(())
}

async fn cmd_show(assistant: &Assistant, owner: &str, profile_id: &str) -> Result<()> {
    let Some(detail) = assistant.candidate(owner, profile_id).await? else {
        println!("No profile {} for owner {}", profile_id, owner);
        return Ok(());
    };

    let candidate = &detail.candidate;
    println!("=== Candidate {} ===", candidate.profile_id);
    println!("Name:    {}", candidate.candidate_name.as_deref().unwrap_or("-"));
    println!("Email:   {}", candidate.email.as_deref().unwrap_or("-"));
    println!("Indexed: {}", format_timestamp_secs(candidate.updated_at));
    if !candidate.skills.is_empty() {
        println!("Skills:  {}", candidate.skills.join(", "));
    }

    if let Some(summary) = &detail.summary {
        println!("\nSummary:");
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    println!("\nIndexed text:\n{}", detail.text_preview);
    Ok(())
}

async fn cmd_history(assistant: &Assistant, owner: &str, limit: usize) -> Result<()> {
    let exchanges = assistant.history(owner, limit).await?;
    if exchanges.is_empty() {
        println!("No conversation history.");
        return Ok(());
    }

    for exchange in &exchanges {
        println!(
            "[{}] ({}) {}",
            format_timestamp_micros(exchange.created_at),
            exchange.intent,
            exchange.query
        );
        println!("  → {}", exchange.response_text);
    }
    println!("\nTotal: {} exchanges", exchanges.len());
    Ok(())
}

fn cmd_stats(db: &AssistantDb, owner: &str) -> Result<()> {
    let owner = OwnerId::parse(owner)?;
    let stats = db.stats(&owner)?;

    println!("=== HR Assistant Database Stats ===");
    println!("Database:  {}", db.path().display());
    println!("Owner:     {}", stats.owner_id);
    println!();
    println!("Profiles:  {} ({} with summary)", stats.total_profiles, stats.profiles_with_summary);
    println!("Exchanges: {}", stats.total_chats);
    println!("Embedding dimension: {}", stats.embedding_dimension);
    Ok(())
}

async fn cmd_status(generator: &OllamaGenerator, config: &AssistantConfig) -> Result<()> {
    println!("Ollama:     {}", generator.base_url());
    println!("Embeddings: {} ({})", config.embedding_base_url, config.embedding_model);

    if !generator.is_available().await {
        println!("Status:     unreachable");
        return Ok(());
    }
    println!("Status:     reachable");

    match generator.has_model(generator.model()).await {
        Ok(true) => println!("Model:      {} (installed)", generator.model()),
        Ok(false) => println!(
            "Model:      {} (missing, run: ollama pull {})",
            generator.model(),
            generator.model()
        ),
        Err(e) => println!("Model:      {} (unknown: {})", generator.model(), e),
    }
    Ok(())
}
