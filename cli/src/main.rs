//! chaintelemetry CLI — inspect and watch Substrate telemetry nodes.
//!
//! Usage:
//! ```bash
//! # List node names on Kusama
//! chaintelemetry nodes
//!
//! # Dump one node as JSON
//! chaintelemetry node --name my-validator --chain polkadot
//!
//! # Follow a node until Ctrl-C
//! chaintelemetry watch --name my-validator
//! ```

mod config;
mod logging;
mod output;

use std::env;
use std::process;
use std::time::Duration;

use tokio::sync::mpsc;

use chaintelemetry_core::chains;
use chaintelemetry_core::NodeRecord;
use chaintelemetry_geo::IpInfoClient;
use chaintelemetry_ws::TelemetryClient;

use crate::config::{parse_flag, CliConfig, TOKEN_ENV};

const DEFAULT_WAIT_SECS: u64 = 5;
const DEFAULT_DETAIL_WAIT_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "nodes" => cmd_nodes(&args[2..]).await,
        "node" => cmd_node(&args[2..]).await,
        "detail" => cmd_detail(&args[2..]).await,
        "watch" => cmd_watch(&args[2..]).await,
        "stats" => cmd_stats(&args[2..]).await,
        "chains" => {
            cmd_chains();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("chaintelemetry {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chaintelemetry {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect and watch Substrate telemetry nodes\n");
    println!("USAGE:");
    println!("    chaintelemetry <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    nodes      List node names");
    println!("    node       Print one node as JSON (--name)");
    println!("    detail     Print a human-readable summary of the first node");
    println!("    watch      Print a node's state on every change (--name)");
    println!("    stats      Print chain-wide statistics as JSON");
    println!("    chains     List well-known chains");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --url <URL>             Feed endpoint  [default: {}]", chains::DEFAULT_FEED_URL);
    println!("    --chain <NAME|HASH>     kusama, polkadot or a genesis hash  [default: kusama]");
    println!("    --name <NAME>           Node name (node, watch)");
    println!("    --wait <SECS>           Seconds to collect updates before printing");
    println!("    --config <PATH>         JSON config file");
    println!("    --ipinfo-token <TOKEN>  Enable location enrichment (or set {TOKEN_ENV})");
    println!("    --no-reconnect          Do not reconnect after the connection drops");
    println!("    --log-level <LEVEL>     trace | debug | info | warn | error");
    println!("    --json-logs             Emit logs as JSON on stderr");
}

/// Load configuration, set up logging, connect and subscribe.
async fn start(args: &[String]) -> Result<TelemetryClient, String> {
    let config = CliConfig::from_args(args, env::var(TOKEN_ENV).ok())?;
    logging::init_tracing(&config.log);

    let chain_name = config.chain.as_deref().unwrap_or("kusama");
    let chain = chains::by_name(chain_name).ok_or_else(|| format!("unknown chain: {chain_name}"))?;

    let mut client = TelemetryClient::new(config.client.clone());
    if let Some(ip_info) = config.ip_info.clone() {
        let provider = IpInfoClient::new(ip_info).map_err(|e| e.to_string())?;
        client = client.with_location_provider(provider);
    }

    tracing::info!(url = %client.url(), chain = %chain, "connecting");
    client.connect().await.map_err(|e| e.to_string())?;
    client.subscribe(chain);
    Ok(client)
}

fn wait_flag(args: &[String], default: u64) -> Result<Duration, String> {
    let secs = parse_flag(args, "--wait")
        .map(|s| s.parse::<u64>().map_err(|_| format!("invalid --wait value: {s}")))
        .transpose()?
        .unwrap_or(default);
    Ok(Duration::from_secs(secs))
}

fn sorted_names(nodes: &[NodeRecord]) -> Vec<&str> {
    let mut names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    names.sort_unstable();
    names
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

async fn cmd_nodes(args: &[String]) -> Result<(), String> {
    let wait = wait_flag(args, DEFAULT_WAIT_SECS)?;
    let client = start(args).await?;
    tokio::time::sleep(wait).await;

    let nodes = client.nodes();
    println!("{} nodes", nodes.len());
    for name in sorted_names(&nodes) {
        println!("  {name}");
    }
    client.disconnect().await;
    Ok(())
}

async fn cmd_node(args: &[String]) -> Result<(), String> {
    let name = parse_flag(args, "--name").ok_or("--name is required")?;
    let wait = wait_flag(args, DEFAULT_WAIT_SECS)?;
    let client = start(args).await?;
    tokio::time::sleep(wait).await;

    let found = client.nodes_filtered(|n| n.name == name);
    match found.first() {
        Some(node) => println!("{}", to_json(node)?),
        None => {
            println!("Not found.");
            println!("Node names:");
            for n in sorted_names(&client.nodes()) {
                println!("  {n}");
            }
        }
    }
    client.disconnect().await;
    Ok(())
}

async fn cmd_detail(args: &[String]) -> Result<(), String> {
    let wait = wait_flag(args, DEFAULT_DETAIL_WAIT_SECS)?;
    let client = start(args).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = client.on_update(move |nodes: &[NodeRecord]| {
        if let Some(first) = nodes.iter().min_by_key(|n| n.id) {
            let _ = tx.send((nodes.len(), first.clone()));
        }
    });

    let received = tokio::time::timeout(wait, rx.recv()).await;
    handle.unsubscribe();
    client.disconnect().await;

    let Ok(Some((count, node))) = received else {
        return Err(format!("no nodes received within {}s", wait.as_secs()));
    };
    println!("\n=== Connected nodes: {count} ===\n");
    println!("{}", output::render_detail(&node, chrono::Utc::now().timestamp_millis()));
    Ok(())
}

async fn cmd_watch(args: &[String]) -> Result<(), String> {
    let name = parse_flag(args, "--name").ok_or("--name is required")?;
    println!("Watching updates for node: {name}");
    println!("Press Ctrl+C to exit");

    let client = start(args).await?;
    let mut errors = client.errors();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let target = name.clone();
    client.on_update(move |nodes: &[NodeRecord]| {
        if let Some(node) = nodes.iter().find(|n| n.name == target) {
            let _ = tx.send(node.clone());
        }
    });

    let mut previous: Option<NodeRecord> = None;
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            Ok(err) = errors.recv() => break Err(err.to_string()),
            Some(node) = rx.recv() => {
                match &previous {
                    None => println!("Initial state: {}", to_json(&node)?),
                    Some(prev) if changed(prev, &node) => println!("Update: {}", to_json(&node)?),
                    Some(_) => {}
                }
                previous = Some(node);
            }
        }
    };

    println!("\nDisconnecting...");
    client.disconnect().await;
    result
}

/// Whether anything other than the refresh timestamp differs.
fn changed(prev: &NodeRecord, next: &NodeRecord) -> bool {
    let mut next = next.clone();
    next.updated_at = prev.updated_at;
    *prev != next
}

async fn cmd_stats(args: &[String]) -> Result<(), String> {
    let wait = wait_flag(args, DEFAULT_WAIT_SECS)?;
    let client = start(args).await?;
    tokio::time::sleep(wait).await;

    match client.chain_stats() {
        Some(stats) => println!("{}", to_json(&stats)?),
        None => println!("No chain stats received yet."),
    }
    client.disconnect().await;
    Ok(())
}

fn cmd_chains() {
    println!("Well-known chains:\n");
    println!("  kusama    {}", chains::KUSAMA);
    println!("  polkadot  {}", chains::POLKADOT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_flag_parses_seconds() {
        let args: Vec<String> = vec!["--wait".into(), "12".into()];
        assert_eq!(wait_flag(&args, 5).unwrap(), Duration::from_secs(12));
        assert_eq!(wait_flag(&[], 5).unwrap(), Duration::from_secs(5));

        let bad: Vec<String> = vec!["--wait".into(), "soon".into()];
        assert!(wait_flag(&bad, 5).is_err());
    }
}
