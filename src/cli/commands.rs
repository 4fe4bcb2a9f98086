//! CLI command definitions for agentforge.
//!
//! Three commands share one configuration: `serve` exposes the event stream
//! over HTTP, `run` writes it to stdout, and `refine` runs the
//! review-and-revise loop.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline::{
    PipelineConfig, PipelineError, PipelineOrchestrator, RefinementLoop, RefinementReport,
    DEFAULT_MAX_ROUNDS,
};
use crate::stream::{self, AppState};

/// Default address for `serve`.
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Multi-agent code generation pipeline with a live event stream.
#[derive(Parser)]
#[command(name = "agentforge")]
#[command(about = "Run a Coder/Tester/TestAgent/Documenter pipeline against a local model")]
#[command(version)]
#[command(
    long_about = "agentforge asks a local model to write code for a task, review it, write unit tests, run them, and document the result.\n\nProgress is streamed as server-sent events.\n\nExample usage:\n  agentforge serve --bind 127.0.0.1:5000\n  agentforge run --model codellama"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Base URL of the generation backend (overrides AGENTFORGE_API_BASE).
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Model used by every agent (overrides AGENTFORGE_MODEL).
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Coding task given to the Coder (overrides AGENTFORGE_TASK).
    #[arg(short, long, global = true)]
    pub task: Option<String>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Serve the event stream over HTTP.
    Serve(ServeArgs),

    /// Run the pipeline once and write the event stream to stdout.
    Run,

    /// Review and revise the code in rounds, then document it.
    Refine(RefineArgs),
}

/// Arguments for `agentforge serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(short, long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,
}

/// Arguments for `agentforge refine`.
#[derive(Parser, Debug)]
pub struct RefineArgs {
    /// Maximum number of review rounds.
    #[arg(short, long, default_value_t = DEFAULT_MAX_ROUNDS)]
    pub rounds: usize,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Applies command-line overrides on top of `config`.
    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(task) = &self.task {
            config.task = task.clone();
        }
        config
    }

    /// Configuration from the environment with command-line overrides.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        self.pipeline_config_from(|key| std::env::var(key).ok())
    }

    /// Configuration from `lookup` with command-line overrides, validated
    /// once the overrides are applied.
    pub fn pipeline_config_from<F>(&self, lookup: F) -> anyhow::Result<PipelineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = self.apply_overrides(PipelineConfig::parse_lookup(lookup)?);
        config.validate()?;
        Ok(config)
    }
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = cli.pipeline_config()?;
    info!(api_base = %config.api_base, model = %config.model, "Loaded configuration");

    match cli.command {
        Commands::Serve(args) => run_serve_command(args, config).await,
        Commands::Run => run_stream_command(config).await,
        Commands::Refine(args) => run_refine_command(args, config).await,
    }
}

async fn run_serve_command(args: ServeArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let orchestrator = PipelineOrchestrator::from_config(config)?;
    stream::serve(args.bind, AppState::new(orchestrator))
        .await
        .with_context(|| format!("Server on {} failed", args.bind))
}

async fn run_stream_command(config: PipelineConfig) -> anyhow::Result<()> {
    let orchestrator = PipelineOrchestrator::from_config(config)?;
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    let pipeline = tokio::spawn(async move { orchestrator.run(tx, cancel).await });

    let mut stdout = tokio::io::stdout();
    let frames = stream::write_frames(rx, &mut stdout)
        .await
        .context("Failed to write event stream")?;

    match pipeline.await.context("Pipeline task panicked")? {
        Ok(output) => {
            info!(
                run_id = %output.run_id,
                frames,
                tests_passed = output.test_outcome.passed(),
                "Run finished"
            );
            Ok(())
        }
        Err(PipelineError::Cancelled) => anyhow::bail!("Run cancelled"),
        Err(e) => Err(e.into()),
    }
}

async fn run_refine_command(args: RefineArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let refine = RefinementLoop::from_config(&config)?.with_max_rounds(args.rounds);
    let report = refine.run(&config.task).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RefinementReport) {
    println!("Task: {}\n", report.task);
    println!("[Coder] Initial code:\n{}\n", report.initial_code);

    for round in &report.rounds {
        println!("[Tester] Review round {}:\n{}\n", round.round, round.feedback);
        match &round.revised_code {
            Some(code) => println!("[Coder] Updated code round {}:\n{}\n", round.round, code),
            None => println!("[Tester] No further issues found.\n"),
        }
    }

    println!("[Documenter] Documentation:\n{}", report.documentation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["agentforge", "serve"]).expect("should parse");
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.bind, "127.0.0.1:5000".parse::<SocketAddr>().expect("addr"))
            }
            other => panic!("Expected Serve command, got {:?}", other),
        }
    }

    #[test]
    fn test_refine_options() {
        let cli = Cli::try_parse_from(["agentforge", "refine", "--rounds", "4", "--json"])
            .expect("should parse");
        match cli.command {
            Commands::Refine(args) => {
                assert_eq!(args.rounds, 4);
                assert!(args.json);
            }
            other => panic!("Expected Refine command, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["agentforge", "refine"]).expect("should parse");
        match cli.command {
            Commands::Refine(args) => {
                assert_eq!(args.rounds, DEFAULT_MAX_ROUNDS);
                assert!(!args.json);
            }
            other => panic!("Expected Refine command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agentforge",
            "run",
            "--model",
            "codellama",
            "--api-base",
            "http://gpu:11434",
            "--task",
            "Write fizzbuzz",
            "-l",
            "debug",
        ])
        .expect("should parse");

        assert!(matches!(cli.command, Commands::Run));
        assert_eq!(cli.log_level, "debug");

        let config = cli.apply_overrides(PipelineConfig::default());
        assert_eq!(config.model, "codellama");
        assert_eq!(config.api_base, "http://gpu:11434");
        assert_eq!(config.task, "Write fizzbuzz");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let cli = Cli::try_parse_from(["agentforge", "run"]).expect("should parse");
        let config = cli.apply_overrides(PipelineConfig::default().with_model("phi3"));
        assert_eq!(config.model, "phi3");
    }

    #[test]
    fn test_flag_overrides_invalid_environment_value() {
        let env = |key: &str| (key == "AGENTFORGE_MODEL").then(String::new);

        let cli = Cli::try_parse_from(["agentforge", "run", "--model", "codellama"])
            .expect("should parse");
        let config = cli.pipeline_config_from(env).expect("flag replaces the empty model");
        assert_eq!(config.model, "codellama");

        let cli = Cli::try_parse_from(["agentforge", "run"]).expect("should parse");
        assert!(cli.pipeline_config_from(env).is_err());
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        assert!(Cli::try_parse_from(["agentforge", "serve", "--bind", "not-an-addr"]).is_err());
    }
}
