//! CLI for RouteMQ
//!
//! Subcommands:
//! - `server`: run the broker
//! - `publish`: send one message to a route
//! - `consume`: declare a route and print what arrives on it

use std::sync::Arc;

use clap::{Parser, Subcommand};
use routemq::broker::RouteRegistry;
use routemq::client::BrokerClient;
use routemq::config::{Settings, load_config, load_config_from};
use routemq::protocol::ServerMessage;
use routemq::transport::start_tcp_server;
use routemq::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "routemq", about = "A minimal route-based message broker")]
struct Cli {
    /// Configuration file (defaults to config/default.* if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker
    Server,
    /// Publish one message to an existing route
    Publish {
        #[arg(long, default_value = "127.0.0.1:5671")]
        addr: String,
        #[arg(long)]
        route: String,
        #[arg(long)]
        body: String,
    },
    /// Declare a route and print deliveries
    Consume {
        #[arg(long, default_value = "127.0.0.1:5671")]
        addr: String,
        #[arg(long)]
        route: String,
        /// Queue type label sent with the declaration
        #[arg(long, default_value = "")]
        kind: String,
        #[arg(long)]
        durable: bool,
        /// Exit after this many deliveries
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match cli.config.as_deref() {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&settings.logging.level);

    let result = match cli.command {
        Command::Server => run_server(settings).await,
        Command::Publish { addr, route, body } => run_publish(&addr, &route, body).await,
        Command::Consume {
            addr,
            route,
            kind,
            durable,
            count,
        } => run_consume(&addr, &route, &kind, durable, count).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = settings.bind_addr();
    let registry = Arc::new(RouteRegistry::new(settings.broker.strict_redeclare));

    tokio::select! {
        result = start_tcp_server(&addr, registry, settings.clone()) => {
            result?;
            error!("Server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_publish(addr: &str, route: &str, body: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = BrokerClient::connect(addr).await?;
    client.publish(route, body).await?;

    // An unknown route is reported straight back; give it a moment to arrive.
    match tokio::time::timeout(std::time::Duration::from_millis(200), client.next_message()).await
    {
        Ok(Ok(ServerMessage::Error(reply))) => Err(reply.message().into()),
        _ => {
            info!(route, "published");
            Ok(())
        }
    }
}

async fn run_consume(
    addr: &str,
    route: &str,
    kind: &str,
    durable: bool,
    count: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = BrokerClient::connect(addr).await?;
    client.declare(route, kind, durable).await?;
    info!(route, "waiting for messages");

    let mut received = 0;
    while count.is_none_or(|limit| received < limit) {
        match client.next_message().await? {
            ServerMessage::Delivery(envelope) => {
                received += 1;
                println!("{}", String::from_utf8_lossy(&envelope.body));
            }
            ServerMessage::Error(reply) => return Err(reply.message().into()),
        }
    }

    Ok(())
}
