//! CLI bootstrap, argument parsing, and REPL/batch runners. Grounded on
//! `cli/args.rs`, `cli/bootstrap.rs`, and `cli/repl.rs`, collapsed onto the
//! much smaller surface this core actually exposes: a single dispatcher, no
//! workspace/indexer/PTY/sidecar state.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{Config, ConfigOverrides};
use crate::entry::{EntryDispatcher, SessionHandle};
use crate::events::{NullObserver, Observer};
use crate::history::HistoryManager;
use crate::llm::{AnthropicVertexProvider, LlmProvider, LocalProvider, OpenRouterProvider};
use crate::tools::{SearchTool, ToolRegistry};
use crate::tools::search::TavilySearchProvider;

/// Sona CLI - headless interface to the voice-interactive research assistant core.
#[derive(Parser, Debug, Clone)]
#[command(name = "sona-cli")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Execute a single utterance and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Execute utterances from a file (one per line) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<std::path::PathBuf>,

    /// Override the provider selected by configuration
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Override the model selected by configuration
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API key (overrides configuration and environment variables)
    #[arg(long, env = "SONA_API_KEY")]
    pub api_key: Option<String>,

    /// Emit observation events as JSON lines instead of human-readable text
    #[arg(long)]
    pub json: bool,

    /// Only print the final answer, suppressing observation events
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Serve over HTTP instead of running locally
    #[cfg(feature = "server")]
    #[arg(long)]
    pub server: bool,

    /// HTTP server port (0 selects a random available port)
    #[cfg(feature = "server")]
    #[arg(long, default_value = "8080")]
    pub port: u16,
}

/// Everything a CLI (or server handler) needs to dispatch utterances: the
/// wired dispatcher plus the per-conversation history and a fresh
/// cancellation handle per exchange.
pub struct CliContext {
    pub dispatcher: EntryDispatcher,
    pub history: HistoryManager,
    pub config: Config,
    pub args: Args,
}

impl CliContext {
    pub async fn dispatch_once(&mut self, utterance: &str, observer: &dyn Observer) -> Result<String> {
        let session = SessionHandle::new();
        self.dispatcher
            .dispatch(utterance, &mut self.history, &session, observer)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }
}

/// Constructs the `LlmProvider` named by `config.provider`, consulting its
/// provider-specific credentials.
pub async fn build_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.as_str() {
        "local" => {
            let model = config.model.clone().unwrap_or_else(|| "local-model".to_string());
            Ok(Arc::new(LocalProvider::new(
                config.api_key.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
                model,
            )))
        }
        "anthropic_vertex" | "vertex" => {
            let creds = config
                .vertex_credentials_path
                .clone()
                .context("anthropic_vertex provider requires ANTHROPIC_VERTEX_CREDENTIALS_PATH")?;
            let project = config
                .vertex_project_id
                .clone()
                .context("anthropic_vertex provider requires ANTHROPIC_VERTEX_PROJECT_ID")?;
            let location = config.vertex_location.clone().unwrap_or_else(|| "us-east5".to_string());
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| rig_anthropic_vertex::models::CLAUDE_SONNET_4.to_string());
            let provider = AnthropicVertexProvider::from_service_account(&creds, &project, &location, &model)
                .await
                .context("failed to initialize anthropic_vertex provider")?;
            Ok(Arc::new(provider))
        }
        "openrouter" => {
            let api_key = config
                .openrouter_api_key
                .clone()
                .or_else(|| config.api_key.clone())
                .context("openrouter provider requires OPENROUTER_API_KEY")?;
            let model = config.model.clone().unwrap_or_else(|| "anthropic/claude-sonnet-4".to_string());
            Ok(Arc::new(OpenRouterProvider::new(&api_key, &model)))
        }
        other => anyhow::bail!("unknown provider '{other}'"),
    }
}

fn build_tools(config: &Config) -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    if let Some(api_key) = &config.tavily_api_key {
        let provider = Arc::new(TavilySearchProvider::new(api_key.clone()));
        tools.register(Arc::new(SearchTool::new(provider)));
    }
    Arc::new(tools)
}

/// Initialize a `CliContext` from parsed `Args`: resolve configuration,
/// install logging, build the provider and tool registry, and wire the
/// default dispatcher.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    if args.verbose {
        std::env::set_var("RUST_LOG", "sona=debug");
    }
    crate::telemetry::init_tracing();

    let overrides = ConfigOverrides {
        provider: args.provider.clone(),
        model: args.model.clone(),
        api_key: args.api_key.clone(),
    };
    let config = Config::load(overrides);

    let provider = build_provider(&config).await?;
    let tools = build_tools(&config);
    let dispatcher = crate::build_default_dispatcher(provider, tools, &config);

    Ok(CliContext {
        dispatcher,
        history: HistoryManager::new(),
        config,
        args: args.clone(),
    })
}

/// Execute a single utterance and print the result.
pub async fn execute_once(ctx: &mut CliContext, utterance: &str) -> Result<()> {
    let observer = NullObserver;
    let final_text = ctx.dispatch_once(utterance, &observer).await?;
    println!("{final_text}");
    Ok(())
}

/// Execute each non-empty line of `path` as an utterance, in order.
pub async fn execute_batch(ctx: &mut CliContext, path: &std::path::Path) -> Result<()> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        execute_once(ctx, line).await?;
    }
    Ok(())
}

/// REPL command variants, parsed from a raw line of stdin.
#[derive(Debug, Clone, PartialEq)]
enum ReplCommand {
    Quit,
    Unknown(String),
    Utterance(String),
    Empty,
}

impl ReplCommand {
    fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }
        if let Some(rest) = trimmed.strip_prefix('/') {
            match rest.to_lowercase().as_str() {
                "quit" | "exit" | "q" => ReplCommand::Quit,
                _ => ReplCommand::Unknown(trimmed.to_string()),
            }
        } else {
            ReplCommand::Utterance(trimmed.to_string())
        }
    }
}

/// Interactive read-utterance-dispatch-print loop. Exits on `/quit` or EOF.
pub async fn run_repl(ctx: &mut CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("sona-cli interactive mode");
    eprintln!("Type /quit to exit\n");

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            eprintln!("\nGoodbye!");
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                eprintln!("Goodbye!");
                break;
            }
            ReplCommand::Unknown(cmd) => {
                eprintln!("Unknown command: {cmd}");
                eprintln!("Available: /quit, /exit, /q");
                continue;
            }
            ReplCommand::Utterance(text) => match execute_once(ctx, &text).await {
                Ok(()) => {}
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_default_values() {
        let args = Args::parse_from(["sona-cli"]);
        assert!(args.execute.is_none());
        assert!(!args.json);
        assert!(!args.quiet);
        assert!(!args.verbose);
    }

    #[test]
    fn args_execute_flag() {
        let args = Args::parse_from(["sona-cli", "-e", "what is the weather"]);
        assert_eq!(args.execute, Some("what is the weather".to_string()));
    }

    #[test]
    fn repl_command_parses_quit_variants() {
        assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(
            ReplCommand::parse("what time is it"),
            ReplCommand::Utterance("what time is it".to_string())
        );
    }
}
