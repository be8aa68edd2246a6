// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Peer bootstrap.
//!
//! Startup order matters: identity first, then topic subscriptions, then the
//! bulk sync from the durable store. Subscribing before the sync means a
//! record published while the sync runs is buffered on the subscription and
//! applied afterwards; the store's monotonic upsert absorbs the overlap.

use std::sync::Arc;

use tokio::task::JoinHandle;
use witness_kernel::{derive_citizen_id, BulkLoadReport, CitizenId, KernelState, Topic};

use crate::config::NodeConfig;
use crate::engine::{Engine, EngineHandle};
use crate::errors::NodeError;
use crate::network::{PeerIdentity, PubSub};
use crate::persistence::DocumentStore;
use crate::replication::ReplicationAdapter;

pub struct Peer {
    handle: EngineHandle,
    report: BulkLoadReport,
    engine_task: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
}

impl Peer {
    pub async fn start(
        cfg: NodeConfig,
        identity: Arc<dyn PeerIdentity>,
        pubsub: Arc<dyn PubSub>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, NodeError> {
        let citizen = resolve_identity(identity.as_ref(), &cfg.identity_secret).await?;
        tracing::info!("Citizen id {}", citizen);

        let adapter = Arc::new(ReplicationAdapter::new(pubsub, store, cfg.db_address.clone(), cfg.retry));

        let mut subscriptions = Vec::with_capacity(Topic::ALL.len());
        for topic in Topic::ALL {
            subscriptions.push((topic, adapter.subscribe(topic).await?));
        }

        tracing::info!("Syncing from {}", adapter.db_address());
        let records = adapter.bulk_sync().await?;
        let mut state = KernelState::new(citizen);
        let report = state.bulk_load(records);
        tracing::info!(
            "Bulk load: {} loaded, {} ignored, {} rejected",
            report.loaded,
            report.ignored,
            report.rejected
        );

        let (engine, handle) = Engine::new(state, adapter.clone(), &cfg);
        let engine_task = tokio::spawn(engine.run());

        let listeners = subscriptions
            .into_iter()
            .map(|(topic, subscription)| adapter.clone().spawn_listener(topic, subscription, handle.clone()))
            .collect();

        Ok(Self {
            handle,
            report,
            engine_task,
            listeners,
        })
    }

    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    pub fn citizen_id(&self) -> &CitizenId {
        self.handle.citizen_id()
    }

    pub fn bulk_load_report(&self) -> BulkLoadReport {
        self.report
    }

    /// Stops the listeners, then waits for the engine to drain.
    ///
    /// Clones of the handle held elsewhere keep the engine running until
    /// they are dropped too.
    pub async fn shutdown(self) {
        for listener in &self.listeners {
            listener.abort();
        }
        for listener in self.listeners {
            let _ = listener.await;
        }
        drop(self.handle);
        if let Err(e) = self.engine_task.await {
            tracing::error!("Engine task failed: {}", e);
        }
    }
}

async fn resolve_identity(identity: &dyn PeerIdentity, secret: &str) -> Result<CitizenId, NodeError> {
    let peer_id = identity
        .peer_id()
        .await
        .map_err(|e| NodeError::IdentityUnavailable(e.to_string()))?;
    derive_citizen_id(&peer_id, secret).map_err(|e| NodeError::IdentityUnavailable(e.to_string()))
}
