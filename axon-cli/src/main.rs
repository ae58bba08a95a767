//! Axon CLI - interactive front end for the agent runtime.
//!
//! Reads free-text prompts from stdin, runs each through the general agent
//! preset (or a flow, with `--flow`), and prints the per-step report.
//! Ctrl-C cancels the in-flight run.

use anyhow::Result;
use axon_agent::presets;
use axon_common::{logging, Settings};
use axon_flow::{create_flow, FlowKind, StepExecutor};
use axon_gateway::{Gateway, OpenAiGateway, RetryGateway};
use axon_tools::{PlanStore, PlanningTool};
use clap::Parser;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Axon - autonomous agent runtime.
#[derive(Parser, Debug)]
#[command(name = "axon")]
#[command(version = "0.1.0")]
#[command(about = "Drive a tool-calling agent from your terminal", long_about = None)]
struct Cli {
    /// Path to a JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Route each prompt through a flow (e.g. "planning") instead of a single agent
    #[arg(long)]
    flow: Option<String>,

    /// Named LLM profile from the settings file
    #[arg(long, default_value = "default")]
    profile: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    logging::init_logging(&settings.runtime.log_level, &settings.runtime.log_format);

    let flow_kind = match cli.flow.as_deref() {
        Some(name) => Some(
            FlowKind::parse(name).ok_or_else(|| anyhow::anyhow!("unknown flow kind: {name}"))?,
        ),
        None => None,
    };

    let gateway: Arc<dyn Gateway> =
        Arc::new(RetryGateway::new(OpenAiGateway::new(settings.llm(&cli.profile))));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let stdin = io::stdin();
    println!("Axon - Enter your prompt (or 'exit' to quit):");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        tracing::info!("processing request");

        // Executors have no reset path once they leave idle, so every
        // prompt gets a freshly built agent over the shared plan store.
        let outcome = match flow_kind {
            Some(kind) => run_flow(kind, &settings, gateway.clone(), prompt, &cancel).await,
            None => run_agent(&settings, gateway.clone(), prompt, &cancel).await,
        };

        match outcome {
            Ok(report) => {
                println!("{report}");
                println!();
            }
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                println!("Error: {e}");
            }
        }
    }

    Ok(())
}

async fn run_agent(
    settings: &Settings,
    gateway: Arc<dyn Gateway>,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let store = PlanStore::new(&settings.runtime.plan_dir)?;
    let mut agent = presets::general(gateway, store)?;
    Ok(agent.run(prompt, cancel).await?)
}

async fn run_flow(
    kind: FlowKind,
    settings: &Settings,
    gateway: Arc<dyn Gateway>,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let agent = presets::general(gateway, PlanStore::new(&settings.runtime.plan_dir)?)?;
    let mut executors: HashMap<String, Box<dyn StepExecutor>> = HashMap::new();
    executors.insert("general".to_string(), Box::new(agent));

    let planning = PlanningTool::new(PlanStore::new(&settings.runtime.plan_dir)?)?;
    let mut flow = create_flow(kind, executors, "general", planning);
    Ok(flow.execute(prompt, cancel).await?)
}
