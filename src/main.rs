//! CLI for countcast
//!
//! Subcommands:
//! - `server`: run the HTTP/SSE and WebSocket servers
//! - `watch`: follow one timer over WebSocket and print its updates

use clap::Parser;
use countcast::config::{Settings, load_config};
use countcast::timer::TimerHub;
use countcast::transport::{http, websocket};
use countcast::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "countcast")]
enum Command {
    /// Start the HTTP/SSE and WebSocket servers
    Server,
    /// Subscribe to a timer and print every update
    Watch {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:3001")]
        url: String,
        /// Identifier of the timer to follow
        #[arg(long)]
        timer: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            return;
        }
    };
    logging::init(&settings.logging.level);

    match cmd {
        Command::Server => {
            if let Err(e) = run_server(settings).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Watch { url, timer } => {
            if let Err(e) = run_watch(&url, &timer).await {
                error!("Watch failed: {}", e);
            }
        }
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let hub = TimerHub::new();

    tokio::spawn(hub.clone().run_sweeper());

    tokio::select! {
        result = http::start_http_server(settings.server.http_addr(), hub.clone()) => {
            result?;
            error!("HTTP server exited unexpectedly.");
        }
        result = websocket::start_websocket_server(settings.server.ws_addr(), hub) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_watch(url: &str, timer: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    let subscribe = json!({ "type": "subscribe", "timerId": timer });
    ws_stream
        .send(WsMessage::Text(subscribe.to_string().into()))
        .await?;

    while let Some(frame) = ws_stream.next().await {
        if let WsMessage::Text(text) = frame? {
            println!("{text}");
        }
    }

    info!("Server closed the connection.");
    Ok(())
}
