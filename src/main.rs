//! MultiKV - A Multi-Database In-Memory Key-Value Server
//!
//! Entry point: reads the configuration, binds every command and runs the
//! server until Ctrl+C or a client's `SHUTDOWN`.

use clap::Parser;
use multikv::{commands, App, Config, Server};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
MultiKV v{} - Multi-Database In-Memory Key-Value Server
──────────────────────────────────────────────────────────────
Listening on {} ({} databases{})

Use Ctrl+C or SHUTDOWN to stop gracefully.
"#,
        multikv::VERSION,
        config.bind_address(),
        config.databases,
        if config.requires_auth() { ", AUTH required" } else { "" },
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse().normalized();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    print_banner(&config);

    let mut app = App::new(config);
    commands::bind_all(&mut app);
    let app = Arc::new(app);
    info!(commands = app.commands().len(), "Commands bound");

    let server = Arc::new(Server::new(Arc::clone(&app)));
    let mut serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.start().await })
    };

    let exited = tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received, stopping server..."),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, stopping server..."),
            }
            None
        }
        _ = app.wait_for_shutdown() => {
            info!("SHUTDOWN requested by a client, stopping server...");
            None
        }
        result = &mut serving => Some(result),
    };

    server.shutdown().await;
    let result = match exited {
        Some(result) => result,
        None => serving.await,
    };
    result??;

    info!("Goodbye");
    Ok(())
}
