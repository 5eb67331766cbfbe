//! ragline — agent orchestration over hybrid retrieval
//!
//! Usage:
//!   ragline chat "What is 2+3*4?"            → one-shot run (streams tokens)
//!   ragline chat --session s1 "and now?"     → continue a session
//!   ragline ingest notes.md --title "Notes"  → add a document to the knowledge base
//!   ragline search "memory safety"           → query the knowledge base directly

use clap::{Parser, Subcommand};
use futures::StreamExt;
use ragline::{AgentEvent, RaglineConfig, RetrievalEngine, RunOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Agent runtime with hybrid retrieval and session memory",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (TOML)
    #[arg(short, long, default_value = "ragline.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to the agent and stream the reply
    Chat {
        message: String,
        /// Session id to continue (default: a fresh session)
        #[arg(short, long)]
        session: Option<String>,
        /// User id attached to the session
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Skip knowledge-base retrieval for this run
        #[arg(long, default_value_t = false)]
        no_retrieval: bool,
    },
    /// Ingest a file into the knowledge base
    Ingest {
        path: PathBuf,
        /// Document title (default: the file name)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Search the knowledge base directly
    Search {
        query: String,
        /// Number of results
        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = RaglineConfig::load(&cli.config)?;
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let runtime = ragline::build_runtime(&api_key, config);

    match cli.command {
        Commands::Chat {
            message,
            session,
            user,
            no_retrieval,
        } => {
            let options = RunOptions {
                enable_retrieval: if no_retrieval { Some(false) } else { None },
                ..Default::default()
            };
            let mut stream = runtime.stream(user, session, message, options);
            let mut stdout = std::io::stdout();
            while let Some(event) = stream.next().await {
                match event {
                    AgentEvent::Token { text } => {
                        print!("{}", text);
                        stdout.flush()?;
                    }
                    AgentEvent::ToolStart { name, .. } => {
                        eprintln!("\n[tool: {}]", name);
                    }
                    AgentEvent::ToolEnd { output, is_error, .. } => {
                        if is_error {
                            eprintln!("[tool error: {}]", output);
                        }
                    }
                    AgentEvent::Error { message } => {
                        eprintln!("\nerror: {}", message);
                    }
                    AgentEvent::Done {
                        session_id,
                        iterations,
                    } => {
                        println!();
                        eprintln!("[session: {} | iterations: {}]", session_id, iterations);
                    }
                }
            }
        }

        Commands::Ingest { path, title } => {
            let content = std::fs::read_to_string(&path)?;
            let title = title.unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "untitled".to_string())
            });
            let source = path.to_string_lossy().into_owned();
            let ids = runtime
                .ingest_document(&content, &title, Some(&source), None)
                .await?;
            println!("Ingested '{}': {} chunks", title, ids.len());
        }

        Commands::Search { query, k } => {
            let hits = runtime.retrieve(&query, k).await?;
            if hits.is_empty() {
                println!("No results.");
            } else {
                println!("{}", RetrievalEngine::format_context(&hits));
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
