use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use second_opinion_core::{
    gateway::http, Backend, Config, Dispatch, Gateway, GatewayClient, Orchestrator, SubmitError,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "second-opinion")]
#[command(about = "Ask Claude and ChatGPT at the same time", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with both models side by side (default)
    Chat {
        /// Use a running gateway instead of calling the providers directly
        #[arg(short, long)]
        gateway: Option<String>,
    },
    /// Run the HTTP dispatch gateway
    Serve {
        /// Address to bind, overrides the config file
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Ask both models once and print the answers
    Ask {
        /// Your message
        message: String,
        /// Use a running gateway instead of calling the providers directly
        #[arg(short, long)]
        gateway: Option<String>,
    },
    /// Store an API key in the config file
    SetKey {
        /// claude or chatgpt
        backend: String,
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat { gateway: None }) {
        Commands::Chat { gateway } => {
            let log_path = logging::init_file()?;
            let config = Config::load()?;
            tracing::info!(log = %log_path.display(), "starting terminal UI");
            run_chat(&config, gateway.as_deref()).await
        }
        Commands::Serve { addr } => {
            logging::init_stderr();
            let config = Config::load()?;
            let addr = addr.unwrap_or_else(|| config.gateway_addr.clone());
            let gateway = Arc::new(Gateway::from_config(&config));
            println!("Second Opinion gateway on http://{}", addr);
            println!("  POST {}  - dispatch {{message, target}}", http::CHAT_PATH);
            println!("  GET  {}  - configured backends", http::HEALTH_PATH);
            http::serve(gateway, &addr).await
        }
        Commands::Ask { message, gateway } => {
            logging::init_stderr();
            let config = Config::load()?;
            run_ask(&config, gateway.as_deref(), &message).await
        }
        Commands::SetKey { backend, key } => {
            let backend = Backend::from_tag(&backend)
                .ok_or_else(|| anyhow!("Unknown backend '{}', expected claude or chatgpt", backend))?;
            let path = Config::save_api_key(backend, &key)?;
            println!("Saved {} API key to {}", backend.display_name(), path.display());
            Ok(())
        }
    }
}

fn dispatcher(config: &Config, gateway: Option<&str>) -> Arc<dyn Dispatch> {
    match gateway {
        Some(url) => Arc::new(GatewayClient::new(url).with_timeout(config.request_timeout())),
        None => Arc::new(Gateway::from_config(config)),
    }
}

fn orchestrator(config: &Config, gateway: Option<&str>) -> Orchestrator {
    Orchestrator::new(dispatcher(config, gateway))
        .with_policy(config.failure_policy)
        .with_active_backend(config.default_backend)
}

async fn run_chat(config: &Config, gateway: Option<&str>) -> Result<()> {
    let mut app = App::new(orchestrator(config, gateway));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn run_ask(config: &Config, gateway: Option<&str>, message: &str) -> Result<()> {
    let mut orchestrator = orchestrator(config, gateway);
    let submission = match orchestrator.submit(message) {
        Ok(id) => id,
        Err(SubmitError::EmptyMessage) => return Err(anyhow!("Message is empty")),
        Err(e) => return Err(e.into()),
    };
    orchestrator.settle().await;

    for reply in orchestrator.log().replies_to(submission) {
        let label = if reply.is_placeholder() {
            "Error".to_string()
        } else {
            reply.backend().display_name().to_string()
        };
        println!("== {} ==", label);
        println!("{}\n", reply.text());
    }
    Ok(())
}
