// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use witness_node::config::NodeConfig;
use witness_node::events::DocumentLog;
use witness_node::network::{LocalBroker, StaticPeerIdentity};
use witness_node::notifications::NotificationEvent;
use witness_node::persistence::{DocumentStore, MemoryDocumentStore};
use witness_node::telemetry::{get_metrics, init_telemetry};
use witness_node::Peer;

#[derive(Parser, Debug)]
#[command(name = "witness-node", about = "Runs a witness peer")]
struct Args {
    /// Network peer id of this node.
    #[arg(long)]
    peer_id: String,

    /// Secret shared by all peers for citizen id derivation.
    #[arg(long)]
    secret: Option<String>,

    /// Document log file. Documents stay in memory when omitted.
    #[arg(long)]
    store_path: Option<PathBuf>,

    #[arg(long)]
    db_address: Option<String>,
}

#[tokio::main]
async fn main() {
    init_telemetry();
    let args = Args::parse();

    let mut cfg = NodeConfig::default();
    if let Some(secret) = args.secret {
        cfg.identity_secret = secret;
    }
    if let Some(address) = args.db_address {
        cfg.db_address = address;
    }
    cfg.store_path = args.store_path;

    let store: Arc<dyn DocumentStore> = match &cfg.store_path {
        Some(path) => match DocumentLog::open(path).await {
            Ok(log) => {
                let lines = log.line_count().await;
                tracing::info!("Document log at {:?} ({} lines replayed)", log.path(), lines);
                Arc::new(log)
            }
            Err(e) => {
                tracing::error!("Cannot open document log {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Arc::new(MemoryDocumentStore::new()),
    };

    let identity = Arc::new(StaticPeerIdentity(args.peer_id));
    let broker = LocalBroker::new();

    let peer = match Peer::start(cfg, identity, Arc::new(broker), store).await {
        Ok(peer) => peer,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Peer running as citizen {}", peer.citizen_id());

    let mut feed = peer.handle().notification_stream();
    let printer = tokio::spawn(async move {
        while let Some(item) = feed.next().await {
            match item {
                Ok(NotificationEvent::Posted(n)) => {
                    tracing::info!("[{}] {}: {}", n.severity.as_str(), n.header, n.message)
                }
                Ok(NotificationEvent::Expired(_)) => {}
                Err(e) => tracing::warn!("Notification feed: {}", e),
            }
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    printer.abort();
    peer.shutdown().await;
    tracing::debug!("Final metrics:\n{}", get_metrics());
}
