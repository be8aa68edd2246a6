// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Single-writer engine.
//!
//! The engine task owns the kernel state and the notification queue. Every
//! mutation, local or remote, and every read arrives as an [`EngineCommand`]
//! on one mpsc queue and is handled to completion before the next, so the
//! replica is never touched concurrently.
//!
//! Nothing in the loop awaits I/O. Persist/publish for local actions runs on
//! one delivery worker in mutation order; it and the notification expiry
//! timers report back through the same queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use witness_kernel::error::KernelError;
use witness_kernel::{Applied, CitizenId, Command, Entry, Event, EventId, IgnoreReason, KernelState, Outcome, Topic, Transition};

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::notifications::{
    Notification, NotificationEvent, NotificationQueue, Severity, ERROR_HEADER, NOTICE_HEADER, SUCCESS_HEADER,
};
use crate::replication::ReplicationAdapter;

const FEED_CAPACITY: usize = 256;

type ReadFn = Box<dyn FnOnce(&KernelState, &NotificationQueue) + Send>;

pub enum EngineCommand {
    Local {
        command: Command,
        reply: oneshot::Sender<Result<ActionOutcome, NodeError>>,
    },
    Inbound {
        topic: Topic,
        event: Event,
        ack: oneshot::Sender<Result<Applied, NodeError>>,
    },
    Delivered {
        action: Action,
        delivery: Delivery,
    },
    Notify {
        severity: Severity,
        header: String,
        message: String,
        reply: oneshot::Sender<Notification>,
    },
    Expire {
        id: u64,
    },
    Read(ReadFn),
}

/// What a caller gets back from a local action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Applied locally, persisted and published.
    Published(Event),
    /// Accepted as a no-op.
    Ignored(IgnoreReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Submit,
    AddDetail,
    Confirm,
}

impl Action {
    fn of(command: &Command) -> Self {
        match command {
            Command::SubmitEvent { .. } => Action::Submit,
            Command::AddDetail { .. } => Action::AddDetail,
            Command::ConfirmRumor { .. } => Action::Confirm,
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Action::Submit => "Event submitted.",
            Action::AddDetail => "Event details added.",
            Action::Confirm => "Rumor confirmed.",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Action::Submit => "Could not create event. Try again later.",
            Action::AddDetail => "Could not add details. Try again later.",
            Action::Confirm => "Could not confirm rumor. Try again later.",
        }
    }
}

/// How far a local action got on its way to the peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Published,
    /// Stored durably; peers pick it up at their next bulk sync.
    StoredOnly,
    Failed,
}

impl Delivery {
    fn of(result: &Result<(), NodeError>) -> Self {
        match result {
            Ok(()) => Delivery::Published,
            Err(NodeError::PublishFailure { .. }) => Delivery::StoredOnly,
            Err(_) => Delivery::Failed,
        }
    }
}

pub struct Engine {
    state: KernelState,
    notifications: NotificationQueue,
    adapter: Arc<ReplicationAdapter>,
    rx: mpsc::Receiver<EngineCommand>,
    // Weak so timers and in-flight deliveries do not keep the engine alive.
    weak_tx: mpsc::WeakSender<EngineCommand>,
    feed: broadcast::Sender<NotificationEvent>,
    notification_ttl: Duration,
    deliveries: mpsc::UnboundedSender<DeliveryJob>,
    delivery_rx: Option<mpsc::UnboundedReceiver<DeliveryJob>>,
}

impl Engine {
    pub fn new(state: KernelState, adapter: Arc<ReplicationAdapter>, cfg: &NodeConfig) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(cfg.command_buffer.max(1));
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let (deliveries, delivery_rx) = mpsc::unbounded_channel();

        let handle = EngineHandle {
            tx: tx.clone(),
            feed: feed.clone(),
            identity: state.identity().clone(),
        };
        let engine = Self {
            state,
            notifications: NotificationQueue::new(),
            adapter,
            rx,
            weak_tx: tx.downgrade(),
            feed,
            notification_ttl: cfg.notification_ttl,
            deliveries,
            delivery_rx: Some(delivery_rx),
        };
        (engine, handle)
    }

    /// Processes commands until every [`EngineHandle`] is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            "Engine started for citizen {} with {} events",
            self.state.identity(),
            self.state.store().len()
        );
        metrics::gauge!("witness_known_events", self.state.store().len() as f64);

        if let Some(jobs) = self.delivery_rx.take() {
            tokio::spawn(deliver_in_order(self.adapter.clone(), self.weak_tx.clone(), jobs));
        }

        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        tracing::info!("Engine stopped at version {}", self.state.version());
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Local { command, reply } => self.handle_local(command, reply),
            EngineCommand::Inbound { topic, event, ack } => {
                let result = self.handle_inbound(topic, event);
                let _ = ack.send(result);
            }
            EngineCommand::Delivered { action, delivery } => self.handle_delivered(action, delivery),
            EngineCommand::Notify { severity, header, message, reply } => {
                let _ = reply.send(self.notify(severity, header, message));
            }
            EngineCommand::Expire { id } => {
                if self.notifications.expire(id).is_some() {
                    let _ = self.feed.send(NotificationEvent::Expired(id));
                }
            }
            EngineCommand::Read(read) => read(&self.state, &self.notifications),
        }
    }

    fn handle_local(&mut self, command: Command, reply: oneshot::Sender<Result<ActionOutcome, NodeError>>) {
        let action = Action::of(&command);
        match self.state.apply(&command) {
            Ok(Outcome::Publish { topic, event, transition }) => {
                tracing::info!("{} applied to event {}", command.kind(), event.id);
                self.on_change(transition);
                self.queue_delivery(action, topic, event, reply);
            }
            Ok(Outcome::Ignored(reason)) => {
                tracing::debug!("{} ignored: {:?}", command.kind(), reason);
                let _ = reply.send(Ok(ActionOutcome::Ignored(reason)));
            }
            Err(e) => {
                tracing::warn!("{} rejected: {}", command.kind(), e);
                self.notify(Severity::Negative, ERROR_HEADER, rejection_message(action, &e));
                let _ = reply.send(Err(NodeError::Kernel(e)));
            }
        }
    }

    fn queue_delivery(
        &self,
        action: Action,
        topic: Topic,
        event: Event,
        reply: oneshot::Sender<Result<ActionOutcome, NodeError>>,
    ) {
        let job = DeliveryJob { action, topic, event, reply };
        if let Err(mpsc::error::SendError(job)) = self.deliveries.send(job) {
            tracing::error!("Delivery worker gone, event {} not persisted", job.event.id);
            let _ = job.reply.send(Err(NodeError::EngineStopped));
        }
    }

    fn handle_inbound(&mut self, topic: Topic, event: Event) -> Result<Applied, NodeError> {
        let id = event.id;
        let applied = self.state.apply_remote(topic, event).map_err(|e| {
            tracing::warn!("Rejected event {} from {}: {}", id, topic, e);
            NodeError::Kernel(e)
        })?;

        match applied {
            Applied::Conflict => {
                tracing::warn!("Event id {} from {} collides with a different local report, keeping local", id, topic)
            }
            _ => tracing::debug!("Event {} from {}: {}", id, topic, applied.as_str()),
        }
        if let Some(transition) = applied.transition() {
            self.on_change(transition);
        }
        Ok(applied)
    }

    fn handle_delivered(&mut self, action: Action, delivery: Delivery) {
        match delivery {
            Delivery::Published => {
                self.notify(Severity::Positive, SUCCESS_HEADER, action.success_message());
            }
            Delivery::StoredOnly => {
                self.notify(
                    Severity::Warning,
                    NOTICE_HEADER,
                    "Saved, peers will see it after their next sync.",
                );
            }
            Delivery::Failed => {
                self.notify(Severity::Negative, ERROR_HEADER, action.failure_message());
            }
        }
    }

    fn on_change(&mut self, transition: Transition) {
        metrics::gauge!("witness_known_events", self.state.store().len() as f64);
        if transition.promoted() {
            metrics::increment_counter!("witness_promotions_total");
            self.notify(Severity::Info, NOTICE_HEADER, "A rumor has been confirmed as news.");
        }
    }

    fn notify(&mut self, severity: Severity, header: impl Into<String>, message: impl Into<String>) -> Notification {
        let notification = self.notifications.enqueue(severity, header, message);
        metrics::increment_counter!("witness_notifications_total", "severity" => severity.as_str());
        let _ = self.feed.send(NotificationEvent::Posted(notification.clone()));
        self.schedule_expiry(notification.id);
        notification
    }

    /// One timer per notification, counted from its own creation.
    fn schedule_expiry(&self, id: u64) {
        let weak_tx = self.weak_tx.clone();
        let ttl = self.notification_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(tx) = weak_tx.upgrade() {
                let _ = tx.send(EngineCommand::Expire { id }).await;
            }
        });
    }
}

/// A local mutation waiting to be persisted and published.
struct DeliveryJob {
    action: Action,
    topic: Topic,
    event: Event,
    reply: oneshot::Sender<Result<ActionOutcome, NodeError>>,
}

/// Persists and publishes local mutations one at a time, in the order the
/// engine applied them, so an older snapshot of an event never overwrites a
/// newer one in the durable store.
async fn deliver_in_order(
    adapter: Arc<ReplicationAdapter>,
    weak_tx: mpsc::WeakSender<EngineCommand>,
    mut jobs: mpsc::UnboundedReceiver<DeliveryJob>,
) {
    while let Some(DeliveryJob { action, topic, event, reply }) = jobs.recv().await {
        let result = adapter.persist_and_publish(topic, &event).await;
        // Report to the engine before replying so the caller's next read
        // already sees the outcome notification.
        if let Some(tx) = weak_tx.upgrade() {
            let delivery = Delivery::of(&result);
            let _ = tx.send(EngineCommand::Delivered { action, delivery }).await;
        }
        let _ = reply.send(result.map(|()| ActionOutcome::Published(event)));
    }
    tracing::debug!("Delivery worker stopped");
}

fn rejection_message(action: Action, error: &KernelError) -> String {
    match error {
        KernelError::NotFound(id) => format!("Event {id} not found."),
        KernelError::EmptyTitle => "Event title is required.".to_string(),
        KernelError::EmptyDetail => "Details cannot be empty.".to_string(),
        _ => action.failure_message().to_string(),
    }
}

/// Cloneable front door to the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    feed: broadcast::Sender<NotificationEvent>,
    identity: CitizenId,
}

impl EngineHandle {
    pub fn citizen_id(&self) -> &CitizenId {
        &self.identity
    }

    async fn send(&self, command: EngineCommand) -> Result<(), NodeError> {
        self.tx.send(command).await.map_err(|_| NodeError::EngineStopped)
    }

    pub async fn execute(&self, command: Command) -> Result<ActionOutcome, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Local { command, reply }).await?;
        rx.await.map_err(|_| NodeError::EngineStopped)?
    }

    pub async fn submit_event(
        &self,
        title: impl Into<String>,
        detail: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<ActionOutcome, NodeError> {
        self.execute(Command::SubmitEvent {
            title: title.into(),
            detail: detail.into(),
            location: location.into(),
        })
        .await
    }

    pub async fn add_detail(&self, id: EventId, text: impl Into<String>) -> Result<ActionOutcome, NodeError> {
        self.execute(Command::AddDetail { id, text: text.into() }).await
    }

    pub async fn confirm_rumor(&self, id: EventId, detail: Option<String>) -> Result<ActionOutcome, NodeError> {
        self.execute(Command::ConfirmRumor { id, detail }).await
    }

    /// Applies a record received from a peer. Resolves once it is applied.
    pub async fn apply_inbound(&self, topic: Topic, event: Event) -> Result<Applied, NodeError> {
        let (ack, rx) = oneshot::channel();
        self.send(EngineCommand::Inbound { topic, event, ack }).await?;
        rx.await.map_err(|_| NodeError::EngineStopped)?
    }

    pub async fn notify(
        &self,
        severity: Severity,
        header: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Notification, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Notify {
            severity,
            header: header.into(),
            message: message.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| NodeError::EngineStopped)
    }

    /// Runs `f` against the current state inside the engine.
    pub async fn read<T, F>(&self, f: F) -> Result<T, NodeError>
    where
        T: Send + 'static,
        F: FnOnce(&KernelState, &NotificationQueue) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Read(Box::new(move |state: &KernelState, queue: &NotificationQueue| {
            let _ = tx.send(f(state, queue));
        })))
        .await?;
        rx.await.map_err(|_| NodeError::EngineStopped)
    }

    pub async fn events(&self) -> Result<Vec<Entry>, NodeError> {
        self.read(|state, _| state.store().iter().cloned().collect()).await
    }

    pub async fn event(&self, id: EventId) -> Result<Option<Entry>, NodeError> {
        self.read(move |state, _| state.store().entry(id).cloned()).await
    }

    pub async fn rumors(&self) -> Result<Vec<Entry>, NodeError> {
        self.read(|state, _| state.store().rumors().cloned().collect()).await
    }

    pub async fn news(&self) -> Result<Vec<Entry>, NodeError> {
        self.read(|state, _| state.store().news().cloned().collect()).await
    }

    pub async fn has_news(&self) -> Result<bool, NodeError> {
        self.read(|state, _| state.store().has_news()).await
    }

    pub async fn state_hash(&self) -> Result<[u8; 32], NodeError> {
        self.read(|state, _| state.store().state_hash()).await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, NodeError> {
        self.read(|_, queue| queue.active().cloned().collect()).await
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.feed.subscribe()
    }

    pub fn notification_stream(&self) -> BroadcastStream<NotificationEvent> {
        BroadcastStream::new(self.feed.subscribe())
    }
}
