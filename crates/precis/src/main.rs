use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use precis_common::{logger, AppConfig};
use precis_llm::SummaryService;
use std::io::Read;
use std::path::PathBuf;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "precis")]
#[command(about = "Precis - word-bounded LLM summarization service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        summary: SummaryArgs,
    },

    /// Summarize a file (or stdin) and print the result
    Summarize {
        /// Input file; stdin when omitted
        #[arg(long, short)]
        file: Option<PathBuf>,

        #[command(flatten)]
        summary: SummaryArgs,
    },
}

/// Overrides for the summary window
#[derive(Args)]
struct SummaryArgs {
    /// Fixed number of output lines
    #[arg(long)]
    lines: Option<usize>,

    /// Minimum summary length in words
    #[arg(long)]
    min_words: Option<usize>,

    /// Maximum summary length in words
    #[arg(long)]
    max_words: Option<usize>,
}

impl SummaryArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(lines) = self.lines {
            config.summary_lines = Some(lines);
        }
        if let Some(min) = self.min_words {
            config.summary_min_words = min;
        }
        if let Some(max) = self.max_words {
            config.summary_max_words = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before AppConfig so CLI overrides apply on top of it
    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve { host, port, summary }) => {
            let mut config = AppConfig::from_env()?;
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            summary.apply(&mut config);
            serve(config).await?;
        }
        Some(Commands::Summarize { file, summary }) => {
            let mut config = AppConfig::from_env()?;
            summary.apply(&mut config);
            config.validate()?;
            logger::setup_console_logging(&config.log_level)?;

            let text = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };

            let service = SummaryService::from_config(&config)?;
            let result = service.summarize(&text).await?;
            if result.below_minimum {
                tracing::warn!(
                    "Summary has {} words, below the minimum of {}",
                    result.word_count,
                    config.summary_min_words
                );
            }
            println!("{}", result.text);
        }
        None => {
            let config = AppConfig::from_env()?;
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    config.validate()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Precis starting...");
    tracing::info!("Configuration loaded:");
    tracing::info!("  Provider: {} ({})", config.llm_provider, config.llm_base_url);
    tracing::info!("  Model: {}", config.llm_model);
    tracing::info!(
        "  Summary window: {}-{} words, Lines: {}",
        config.summary_min_words,
        config.summary_max_words,
        config
            .summary_lines
            .map_or_else(|| "paragraph".to_string(), |n| n.to_string())
    );
    tracing::info!("  Log file: {}", config.get_log_path(logger::LOG_FILE_NAME).display());

    println!("Server listening on http://{}", config.server_bind_address());

    precis_server::start_server(config).await?;
    Ok(())
}
