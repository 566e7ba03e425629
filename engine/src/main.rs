// Larder Kitchen Assistant Engine
// Main entry point for the larder binary

use clap::Parser;
use larder_engine::backend::KitchenBackend;
use larder_engine::cli::{Cli, Command};
use larder_engine::config::Config;
use larder_engine::driver::OptimizedStateMachine;
use larder_engine::telemetry::{init_telemetry, init_telemetry_with_level};
use std::io::{BufRead, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Larder Engine v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI or config-driven log level
    let log_level = cli
        .log
        .clone()
        .unwrap_or_else(|| config.core.log_level.clone());
    init_telemetry_with_level(&log_level);

    match cli.command {
        Command::Ask { message, kitchen, user } => {
            let engine = OptimizedStateMachine::from_config(&config)?;
            let kitchen_id = kitchen.unwrap_or(config.core.default_kitchen_id);
            let user_email = user.unwrap_or_else(|| config.core.default_user_email.clone());

            let reply = engine.process_message(&message, kitchen_id, &user_email).await;
            println!("{reply}");
            Ok(())
        }

        Command::Chat { kitchen, user } => {
            let engine = OptimizedStateMachine::from_config(&config)?;
            let kitchen_id = kitchen.unwrap_or(config.core.default_kitchen_id);
            let user_email = user.unwrap_or_else(|| config.core.default_user_email.clone());

            println!("Larder chat. Type 'exit' to quit.");
            let stdin = std::io::stdin();
            loop {
                print!("you> ");
                std::io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let message = line.trim();
                if message.is_empty() {
                    continue;
                }
                if matches!(message, "exit" | "quit") {
                    break;
                }

                let reply = engine.process_message(message, kitchen_id, &user_email).await;
                println!("larder> {reply}\n");
            }

            let stats = engine.stats();
            println!(
                "Session: {} requests, {} early exits, {} model calls, {} direct backend calls ({:.1}% saved)",
                stats.total_requests,
                stats.early_exits,
                stats.llm_calls,
                stats.backend_direct,
                stats.cost_savings_pct
            );
            Ok(())
        }

        Command::Status => {
            println!("Configuration:");
            println!("  Backend:     {}", config.backend.base_url);
            println!("  LLM:         {}", config.llm.base_url);
            println!("  Fast model:  {}", config.llm.fast_model);
            println!("  Smart model: {}", config.llm.smart_model);
            println!(
                "  Governor:    max_plan_steps={}, require_intent_confidence={}",
                config.governor.max_plan_steps, config.governor.require_intent_confidence
            );

            let backend = KitchenBackend::new(&config.backend);
            match backend.get_stats(config.core.default_kitchen_id).await {
                Ok(stats) => println!(
                    "Backend:       reachable ({} items, {} expiring soon)",
                    stats.total_items, stats.expiring_items
                ),
                Err(e) => println!("Backend:       unreachable ({e})"),
            }
            Ok(())
        }
    }
}
