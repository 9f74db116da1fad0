// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use snafu::{ResultExt, Whatever};
use spoolmq_app::Settings;
use spoolmq_common_telemetry as telemetry;
use spoolmq_common_transport::{QueueClient, Transport};
use tracing::info;

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "spoolmq",
about = "Crash-safe single-consumer message queue",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Serve(ServeArgs),
    Gateway(GatewayArgs),
    Peek(ClientArgs),
    Pop(ClientArgs),
    Discard(ClientArgs),
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Settings, Whatever> {
        Settings::load(self.config.as_deref()).whatever_context("Failed to load configuration")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Runs the queue: subscribes to the ingestion channel, persists every message
and answers peek/pop/discard requests.
Examples:

spoolmq serve --config spoolmq.toml

")]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

impl ServeArgs {
    fn run(&self) -> Result<(), Whatever> {
        let settings = self.config.load()?;
        let _guards = telemetry::init_global_logging("spoolmq", &settings.logging)
            .whatever_context("Failed to initialize logging")?;
        telemetry::set_panic_hook();

        // The control loop has no cancellation path; Ctrl+C ends the process.
        // Committed messages are already durable.
        ctrlc::set_handler(|| {
            info!("Received Ctrl+C signal, exiting");
            std::process::exit(130);
        })
        .whatever_context("Failed to install Ctrl+C handler")?;

        info!(version = build_info::FULL_VERSION, "Starting spoolmq queue");
        spoolmq_app::run_queue(&settings).whatever_context("Queue stopped")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Runs the HTTP ingestion gateway.
Examples:

SPOOLMQ__GATEWAY__BASIC_AUTH_USER=station \
SPOOLMQ__GATEWAY__BASIC_AUTH_PASSWORD=secret spoolmq gateway

")]
struct GatewayArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

impl GatewayArgs {
    fn run(&self) -> Result<(), Whatever> {
        let settings = self.config.load()?;
        let _guards = telemetry::init_global_logging("spoolmq-gateway", &settings.logging)
            .whatever_context("Failed to initialize logging")?;
        telemetry::set_panic_hook();

        info!(version = build_info::FULL_VERSION, "Starting spoolmq gateway");
        spoolmq_app::serve_gateway(&settings).whatever_context("Gateway stopped")
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Sends one request to a running queue and prints the JSON response.
Examples:

spoolmq peek --addr tcp://localhost:5557
spoolmq pop --config spoolmq.toml

")]
struct ClientArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Queue endpoint; derived from the server settings when omitted
    #[arg(long)]
    addr: Option<String>,
}

impl ClientArgs {
    fn connect(&self) -> Result<QueueClient, Whatever> {
        let endpoint = match &self.addr {
            Some(addr) => addr.clone(),
            None => self.config.load()?.server.client_endpoint(),
        };
        QueueClient::connect(&Transport::new(), &endpoint)
            .with_whatever_context(|_| format!("Failed to connect to {endpoint}"))
    }

    fn peek(&self) -> Result<(), Whatever> {
        let message = self.connect()?.peek().whatever_context("Peek failed")?;
        print_message(message.as_deref());
        Ok(())
    }

    fn pop(&self) -> Result<(), Whatever> {
        let message = self.connect()?.pop().whatever_context("Pop failed")?;
        print_message(message.as_deref());
        Ok(())
    }

    fn discard(&self) -> Result<(), Whatever> {
        self.connect()?.discard().whatever_context("Discard failed")?;
        print_json(&json!({"result": "ok"}))
    }
}

/// Prints a message exactly as served, or `null` when the queue is empty.
#[allow(clippy::print_stdout)]
fn print_message(message: Option<&[u8]>) {
    match message {
        Some(text) => println!("{}", String::from_utf8_lossy(text)),
        None => println!("{}", Value::Null),
    }
}

#[allow(clippy::print_stdout)]
fn print_json(value: &Value) -> Result<(), Whatever> {
    let text = serde_json::to_string_pretty(value).whatever_context("Failed to encode response")?;
    println!("{text}");
    Ok(())
}

fn main() -> Result<(), Whatever> {
    human_panic::setup_panic!(
        human_panic::Metadata::new(env!("CARGO_PKG_NAME"), build_info::FULL_VERSION)
            .authors(build_info::AUTHOR)
            .homepage(env!("CARGO_PKG_HOMEPAGE"))
    );

    let cli = Cli::parse();
    match cli.commands {
        Commands::Serve(args) => args.run(),
        Commands::Gateway(args) => args.run(),
        Commands::Peek(args) => args.peek(),
        Commands::Pop(args) => args.pop(),
        Commands::Discard(args) => args.discard(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() { Cli::command().debug_assert(); }

    #[test]
    fn test_client_args_parse() {
        let cli = Cli::parse_from(["spoolmq", "pop", "--addr", "tcp://queue:5557"]);
        match cli.commands {
            Commands::Pop(args) => {
                assert_eq!(args.addr.as_deref(), Some("tcp://queue:5557"));
                assert!(args.config.config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_args_parse_config() {
        let cli = Cli::parse_from(["spoolmq", "serve", "--config", "spoolmq.toml"]);
        match cli.commands {
            Commands::Serve(args) => {
                assert_eq!(args.config.config, Some(PathBuf::from("spoolmq.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
