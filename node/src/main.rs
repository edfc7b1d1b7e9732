// Copyright (c) 2026 Forge Labs. MIT License.
// See LICENSE for details.

//! # Forge Node
//!
//! Entry point for the `forge-node` binary. `start` boots the full node —
//! RPC server, block production loop, and metrics sampler — while `tx` and
//! `block` act as thin RPC clients against a running node.

mod api;
mod cli;
mod client;
mod logging;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tokio::signal;
use tokio::sync::watch;

use forge_protocol::config::NodeConfig;
use forge_protocol::node::Node;

use cli::{BlockArgs, BlockCommands, Cli, Commands, StartArgs, TxArgs, TxCommands};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => start_node(args).await,
        Commands::Tx(args) => run_tx_command(args).await,
        Commands::Block(args) => run_block_command(args).await,
    }
}

/// Boots the node and runs until SIGINT/SIGTERM.
async fn start_node(args: StartArgs) -> Result<()> {
    logging::init_logging(
        "forge_node=info,forge_protocol=info,tower_http=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let cfg = NodeConfig {
        listen_addr: args.listen.clone(),
        block_interval: Duration::from_millis(args.block_interval_ms),
        gas_limit: args.gas_limit,
        max_tx_per_block: args.max_tx_per_block,
        min_fee: args.min_fee,
    };

    tracing::info!(
        listen = %cfg.listen_addr,
        interval_ms = args.block_interval_ms,
        gas_limit = cfg.gas_limit,
        max_tx_per_block = cfg.max_tx_per_block,
        min_fee = cfg.min_fee,
        "starting forge-node"
    );

    let node = Arc::new(Node::new(cfg));
    let node_metrics = Arc::new(metrics::NodeMetrics::new());

    // One lifetime token for every background task: the production loop,
    // the metrics sampler, and the HTTP server's graceful shutdown.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let loop_handle = tokio::spawn({
        let node = Arc::clone(&node);
        let shutdown = shutdown_rx.clone();
        async move { node.run_block_loop(shutdown).await }
    });

    let sampler_handle = tokio::spawn(metrics::run_sampler(
        Arc::clone(&node),
        Arc::clone(&node_metrics),
        shutdown_rx.clone(),
    ));

    let router = api::create_router(api::AppState {
        node: Arc::clone(&node),
        metrics: node_metrics,
    });
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", args.listen))?;
    tracing::info!("RPC server listening on {}", args.listen);

    let mut serve_shutdown = shutdown_rx.clone();
    let server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    };

    tokio::select! {
        res = server => {
            if let Err(err) = res {
                tracing::error!("RPC server error: {err}");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = loop_handle.await;
    let _ = sampler_handle.await;

    tracing::info!("forge-node stopped");
    Ok(())
}

/// Executes one `tx` subcommand against a running node.
async fn run_tx_command(args: TxArgs) -> Result<()> {
    match args.command {
        TxCommands::Add {
            sender,
            recipient,
            payload,
            fee,
            gas,
        } => {
            let params = json!({
                "sender": sender,
                "recipient": recipient,
                "payload": payload,
                "fee": fee,
                "gas": gas,
            });
            let result = call_or_exit(&args.addr, "tx.add", params).await;
            let tx_id = result["txID"].as_str().unwrap_or_default();
            println!("tx added: {tx_id}");
        }
        TxCommands::Update { id, fee } => {
            call_or_exit(&args.addr, "tx.update", json!({"id": id, "fee": fee})).await;
            println!("tx updated");
        }
        TxCommands::Remove { id } => {
            call_or_exit(&args.addr, "tx.remove", json!({"id": id})).await;
            println!("tx removed");
        }
        TxCommands::List => {
            let result = call_or_exit(&args.addr, "tx.list", json!({})).await;
            print_json(&result["transactions"]);
        }
    }
    Ok(())
}

/// Executes one `block` subcommand against a running node.
async fn run_block_command(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommands::List => {
            let result = call_or_exit(&args.addr, "block.list", json!({})).await;
            print_json(&result["blocks"]);
        }
        BlockCommands::Get { height } => {
            let result = call_or_exit(&args.addr, "block.get", json!({"height": height})).await;
            print_json(&result["block"]);
        }
    }
    Ok(())
}

/// Calls the node, or prints an `error:` line and exits non-zero. Every
/// failure path of the CLI funnels through here.
async fn call_or_exit(addr: &str, method: &str, params: Value) -> Value {
    match client::call(addr, method, params).await {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// Pretty-prints a JSON payload to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
