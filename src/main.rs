//! Mech Agent CLI
//!
//! Command-line interface for running the goal-seeking agent and the
//! one-shot function synthesis job.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mech_agent::{run_dynamic_with, run_orchestrator_with, Config, RunResult};

#[derive(Parser)]
#[command(name = "mech-agent")]
#[command(about = "Autonomous tool-calling agent for mech marketplace tasks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pursue a goal until the model signals completion
    Run {
        /// The goal to achieve
        #[arg(short, long)]
        goal: String,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },

    /// Synthesize and evaluate a single function
    Synthesize {
        /// Description of the function to implement
        #[arg(short, long)]
        prompt: String,

        /// Arguments for the generated function, as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Override the configured sampling temperature
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env files (local first, then home directory); both are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Run { goal, model } => {
            let mut kwargs = Map::new();
            kwargs.insert("goal".to_string(), json!(goal));
            if let Some(model) = model {
                kwargs.insert("model".to_string(), json!(model));
            }

            let result = run_orchestrator_with(kwargs, config.runtime()).await;
            print_result(result)?;
        }

        Commands::Synthesize {
            prompt,
            args,
            temperature,
            model,
        } => {
            let mut kwargs = parse_args_object(args.as_deref())?;
            kwargs.insert("prompt".to_string(), json!(prompt));
            if let Some(temperature) = temperature {
                kwargs.insert("temperature".to_string(), json!(temperature));
            }
            if let Some(model) = model {
                kwargs.insert("model".to_string(), json!(model));
            }

            let result = run_dynamic_with(kwargs, config.runtime()).await;
            print_result(result)?;
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Parse the `--args` JSON object into a keyword-argument map
fn parse_args_object(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("--args must be a JSON object"),
    }
}

fn print_result(result: RunResult) -> Result<()> {
    let RunResult(value, ..) = result;
    match value {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("null"),
    }
    Ok(())
}
