// Foreman task orchestrator
// Main entry point for the foreman binary

use clap::Parser;
use foreman_engine::agent::controller::{Controller, ControllerSettings, Mode};
use foreman_engine::agent::worker::{Worker, WorkerSettings};
use foreman_engine::capabilities::CapabilitySet;
use foreman_engine::cli::{Cli, Command};
use foreman_engine::config::Config;
use foreman_engine::executor::CommandExecutor;
use foreman_engine::llm::openai::OpenAiEngine;
use foreman_engine::llm::ReasoningEngine;
use foreman_engine::secrets;
use foreman_engine::server::{self, AppState};
use foreman_engine::telemetry::init_telemetry;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(cli.log.as_deref().unwrap_or("info"), cli.json);

    tracing::info!("Foreman v{}", env!("CARGO_PKG_VERSION"));

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Login writes the keychain and needs no credential of its own.
    if let Command::Login = cli.command {
        return handle_login();
    }

    let api_key = secrets::resolve_api_key()?;
    let engine: Arc<dyn ReasoningEngine> =
        Arc::new(OpenAiEngine::new(config.reasoning.clone(), api_key));

    let worker_settings = WorkerSettings {
        max_turns: config.agent.max_turns,
        summarization_threshold: config.agent.summarization_threshold,
        recent_turns_kept: config.agent.recent_turns_kept,
        command_timeout: Duration::from_secs(config.agent.command_timeout_secs),
    };
    let controller_settings = ControllerSettings {
        max_turns: config.agent.max_turns,
        summarization_threshold: config.agent.summarization_threshold,
        recent_turns_kept: config.agent.recent_turns_kept,
    };

    match cli.command {
        Command::Run { repos } => {
            let mut controller = Controller::for_mode(
                Mode::Execute,
                engine,
                repos,
                controller_settings,
                worker_settings,
            );
            let answer = controller.run_mission().await;
            println!("{}", answer);
            Ok(())
        }

        Command::Analyze { repos } => {
            let mut controller = Controller::for_mode(
                Mode::Analyze,
                engine,
                repos,
                controller_settings,
                worker_settings,
            );
            let answer = controller.run_mission().await;
            println!("{}", answer);
            Ok(())
        }

        Command::Chat { repos } => {
            let mut controller = Controller::for_mode(
                Mode::Interactive,
                engine,
                repos,
                controller_settings,
                worker_settings,
            );
            controller
                .run_interactive(tokio::io::BufReader::new(tokio::io::stdin()))
                .await?;
            Ok(())
        }

        Command::Worker { task } => {
            let capabilities = CapabilitySet::shell_only(CommandExecutor::with_default_timeout(
                worker_settings.command_timeout,
            ));
            let worker = Worker::new(engine, capabilities, worker_settings);
            let report = worker.run(&task).await;
            println!("{}", report.render());
            Ok(())
        }

        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            server::serve(addr, AppState::new(engine, worker_settings)).await?;
            Ok(())
        }

        Command::Login => unreachable!("handled above"),
    }
}

fn handle_login() -> anyhow::Result<()> {
    eprint!("Enter API key: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let key = input.trim();

    if key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    secrets::store_api_key(key)?;
    println!("API key stored in the OS keychain.");
    Ok(())
}
