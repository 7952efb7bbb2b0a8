//! `telerover` – rover control-plane server
//!
//! This binary:
//!
//! 1. Loads `~/.telerover/config.toml`, writing the defaults there on first
//!    run.
//! 2. Builds the relay, the rover session and the WebSocket server.
//! 3. Serves Control on `/mission-control` and the Backend on `/simulator`.
//! 4. Intercepts **Ctrl-C** to engage the emergency stop and exit safely.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use tracing::{error, info, warn};

use telerover_middleware::{Relay, Session};
use telerover_server::RoverServer;
use telerover_types::Channel;

#[tokio::main]
async fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"). Set
    // TELEROVER_LOG_FORMAT=json for newline-delimited JSON logs.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("TELEROVER_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let path = config::config_path();
    let mut cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save_to(&cfg, &path) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    config::apply_env_overrides(&mut cfg);

    // ── Rover session ─────────────────────────────────────────────────────
    let relay = Arc::new(Relay::new(cfg.channel_capacity));
    let session = match Session::new(&cfg.layout(), relay) {
        Ok(session) => session.with_peripherals(cfg.announce_peripherals.clone()),
        Err(e) => {
            error!(error = %e, "invalid rover layout");
            return ExitCode::FAILURE;
        }
    };

    let server = RoverServer::new(session.clone())
        .with_bind_address(cfg.bind_address.clone())
        .with_port(cfg.port);

    println!();
    for channel in Channel::ALL {
        println!(
            "  {:<8} ws://{}:{}{}",
            channel.to_string().bold(),
            cfg.bind_address,
            cfg.port,
            channel.path().cyan()
        );
    }
    println!();

    // ── Serve until Ctrl-C ────────────────────────────────────────────────
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server stopped");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            println!();
            println!("{}", "⚠  Ctrl-C received – initiating graceful shutdown …".yellow().bold());

            let stopped = session.emergency_stop().await;
            info!(messages = stopped.len(), "emergency stop engaged on shutdown");
            // Give connection tasks a moment to flush the zero-power frames.
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;

            println!("{}", "  ✓ Emergency stop sent to the Backend.".green());
            println!("{}", "  ✓ Exiting telerover.".green());
            ExitCode::SUCCESS
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  ______     __                         "#.bold().cyan());
    println!("{}", r#" /_  __/__  / /__ _______ _  _____ ____ "#.bold().cyan());
    println!("{}", r#"  / / / -_)/ / -_) __/ _ \ |/ / -_) __/ "#.bold().cyan());
    println!("{}", r#" /_/  \__//_/\__/_/  \___/___/\__/_/    "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "telerover".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Rover control-plane server");
    println!();
}
