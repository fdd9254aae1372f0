//! # agentcraft CLI
//!
//! Command-line interface for running the agentcraft agent.
//!
//! Usage:
//!   agentcraft [--verbose] <prompt words...>
//!
//! Examples:
//!   agentcraft "how does the calculator render results to the console?"
//!   agentcraft --verbose "fix the bug: 3 + 7 * 2 shouldn't be 20"
//!   agentcraft -d ./sandbox --max-iterations 5 "run the tests"
//!
//! Configuration comes from the environment (`GEMINI_API_KEY`, `AGENTCRAFT_*`);
//! flags override it.

use agentcraft_agent::{Agent, AgentConfig};
use agentcraft_error::{ErrorKind, Result};
use agentcraft_runtime::{AnyProvider, LlmProvider};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agentcraft")]
#[command(author, version, about = "agentcraft - a coding agent confined to one directory")]
struct Cli {
    /// Show tool arguments, tool results and token counts
    #[arg(short, long)]
    verbose: bool,

    /// Directory the agent may read, write and run scripts in
    #[arg(short = 'd', long, value_name = "PATH")]
    working_dir: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum model round trips before giving up
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Prompt for the agent
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,
}

impl Cli {
    fn prompt(&self) -> Option<String> {
        let prompt = self.prompt.join(" ");
        if prompt.trim().is_empty() {
            None
        } else {
            Some(prompt)
        }
    }

    /// Environment first, then flags on top
    fn config(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::from_env()?.with_verbose(self.verbose);
        if let Some(dir) = &self.working_dir {
            config = config.with_working_dir(dir);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(max) = self.max_iterations {
            config = config.with_max_iterations(max);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,agentcraft_agent=debug,agentcraft_runtime=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(prompt) = cli.prompt() else {
        eprintln!("Error: A prompt argument is required.");
        eprintln!("Usage: agentcraft [--verbose] <prompt words...>");
        return ExitCode::FAILURE;
    };

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("{}", e.to_model_string());
            return ExitCode::FAILURE;
        }
    };
    let max_iterations = config.max_iterations;

    let provider = match AnyProvider::from_config(config.provider_config()) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(provider = provider.name(), "provider selected");

    let mut agent = match Agent::new(provider, config) {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!("{:?}", e);
            eprintln!("{}", e.to_model_string());
            return ExitCode::FAILURE;
        }
    };

    // Dropping the run future on Ctrl-C also drops any running script,
    // which is spawned kill-on-drop.
    let outcome = tokio::select! {
        outcome = agent.run(&prompt) => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!("\nOperation cancelled by user.");
            return ExitCode::SUCCESS;
        }
    };

    match outcome {
        Ok(result) => {
            if cli.verbose {
                println!(
                    "\nCompleted in {} iteration(s), {} tokens total",
                    result.iterations,
                    result.usage.total_tokens()
                );
            }
            println!("Final response:");
            println!("{}", result.answer);
            ExitCode::SUCCESS
        }
        Err(e) if e.kind() == ErrorKind::IterationExhausted => {
            println!("Reached maximum number of iterations ({}). Stopping.", max_iterations);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{:?}", e);
            eprintln!("{}", e.to_model_string());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_words_joined() {
        let cli = Cli::parse_from(["agentcraft", "fix", "the", "bug"]);
        assert_eq!(cli.prompt().as_deref(), Some("fix the bug"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "agentcraft",
            "--verbose",
            "-d",
            "sandbox",
            "--max-iterations",
            "5",
            "--model",
            "gemini-2.5-pro",
            "run",
            "main.py",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.working_dir, Some(PathBuf::from("sandbox")));
        assert_eq!(cli.max_iterations, Some(5));
        assert_eq!(cli.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(cli.prompt().as_deref(), Some("run main.py"));
    }

    #[test]
    fn test_missing_prompt() {
        let cli = Cli::parse_from(["agentcraft", "--verbose"]);
        assert_eq!(cli.prompt(), None);

        let cli = Cli::parse_from(["agentcraft", "  "]);
        assert_eq!(cli.prompt(), None);
    }
}
