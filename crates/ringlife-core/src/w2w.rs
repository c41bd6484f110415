//! Worker-to-worker (W2W) direct messaging.
//!
//! A [`W2WBroker`] owns one bounded channel per registered worker. Each worker
//! holds the receiving half inside its [`W2WEndpoint`], which implements the
//! two-phase [`Transport`] protocol: sends are posted into the destination
//! queue immediately, receives are matched on `(source, tag, sequence)` when
//! the caller waits. Messages that arrive ahead of their matching receive are
//! stashed on the endpoint until asked for.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Phase, Result, RingLifeError};
use crate::message::{MatchKey, MessageEnvelope, Tag, WorkerId};
use crate::transport::{RecvRequest, SendRequest, Transport};

/// Configuration for W2W messaging.
#[derive(Debug, Clone)]
pub struct W2WConfig {
    /// Number of workers taking part in the run.
    pub world_size: usize,
    /// Maximum queued messages per endpoint.
    pub max_pending_messages: usize,
    /// Emit a trace event for every message.
    pub enable_tracing: bool,
}

impl Default for W2WConfig {
    fn default() -> Self {
        Self {
            world_size: 1,
            max_pending_messages: 1024,
            enable_tracing: false,
        }
    }
}

/// Status of message delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Message placed in the destination queue.
    Delivered,
    /// Destination worker not registered or gone.
    NotFound,
    /// Destination queue full.
    QueueFull,
}

/// Receipt for a W2W message delivery.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryReceipt {
    /// Source worker.
    pub source: WorkerId,
    /// Destination worker.
    pub destination: WorkerId,
    /// Delivery status.
    pub status: DeliveryStatus,
}

/// W2W message broker routing envelopes between workers.
pub struct W2WBroker {
    config: W2WConfig,
    endpoints: RwLock<HashMap<WorkerId, mpsc::Sender<MessageEnvelope>>>,
    message_counter: AtomicU64,
}

impl W2WBroker {
    /// Create a new broker.
    pub fn new(config: W2WConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            endpoints: RwLock::new(HashMap::new()),
            message_counter: AtomicU64::new(0),
        })
    }

    /// Register a worker and hand out its endpoint.
    pub fn register(self: &Arc<Self>, worker: WorkerId) -> W2WEndpoint {
        let (sender, receiver) = mpsc::channel(self.config.max_pending_messages.max(1));

        self.endpoints.write().insert(worker, sender);

        W2WEndpoint {
            worker,
            world_size: self.config.world_size,
            receiver,
            stash: HashMap::new(),
            broker: Arc::clone(self),
        }
    }

    /// Unregister a worker.
    pub fn unregister(&self, worker: &WorkerId) {
        self.endpoints.write().remove(worker);
    }

    /// Check if a worker is registered.
    pub fn is_registered(&self, worker: &WorkerId) -> bool {
        self.endpoints.read().contains_key(worker)
    }

    /// Get all registered workers, in rank order.
    pub fn registered_workers(&self) -> Vec<WorkerId> {
        let mut workers: Vec<_> = self.endpoints.read().keys().copied().collect();
        workers.sort();
        workers
    }

    /// World size this broker was built for.
    pub fn world_size(&self) -> usize {
        self.config.world_size
    }

    /// Place an envelope in its destination queue without waiting.
    pub fn deliver(&self, envelope: MessageEnvelope) -> DeliveryReceipt {
        let source = envelope.header.source;
        let destination = envelope.header.destination;

        if self.config.enable_tracing {
            trace!(
                source = %source,
                destination = %destination,
                tag = ?envelope.header.tag,
                sequence = envelope.header.sequence,
                bytes = envelope.payload.len(),
                "w2w deliver"
            );
        }

        let endpoints = self.endpoints.read();
        let status = match endpoints.get(&destination) {
            Some(sender) => match sender.try_send(envelope) {
                Ok(()) => {
                    self.message_counter.fetch_add(1, Ordering::Relaxed);
                    DeliveryStatus::Delivered
                }
                Err(mpsc::error::TrySendError::Full(_)) => DeliveryStatus::QueueFull,
                Err(mpsc::error::TrySendError::Closed(_)) => DeliveryStatus::NotFound,
            },
            None => DeliveryStatus::NotFound,
        };

        if status != DeliveryStatus::Delivered {
            warn!(
                source = %source,
                destination = %destination,
                status = ?status,
                "w2w delivery failed"
            );
        }

        DeliveryReceipt {
            source,
            destination,
            status,
        }
    }

    /// Get statistics.
    pub fn stats(&self) -> W2WStats {
        W2WStats {
            registered_endpoints: self.endpoints.read().len(),
            messages_delivered: self.message_counter.load(Ordering::Relaxed),
        }
    }
}

/// W2W messaging statistics.
#[derive(Debug, Clone, Default)]
pub struct W2WStats {
    /// Number of registered endpoints.
    pub registered_endpoints: usize,
    /// Total messages delivered.
    pub messages_delivered: u64,
}

/// Builder for W2W infrastructure.
pub struct W2WBuilder {
    config: W2WConfig,
}

impl W2WBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: W2WConfig::default(),
        }
    }

    /// Set the number of workers.
    pub fn world_size(mut self, workers: usize) -> Self {
        self.config.world_size = workers;
        self
    }

    /// Set maximum pending messages per endpoint.
    pub fn max_pending_messages(mut self, count: usize) -> Self {
        self.config.max_pending_messages = count;
        self
    }

    /// Enable per-message tracing.
    pub fn enable_tracing(mut self, enable: bool) -> Self {
        self.config.enable_tracing = enable;
        self
    }

    /// Build the broker.
    pub fn build(self) -> Arc<W2WBroker> {
        W2WBroker::new(self.config)
    }
}

impl Default for W2WBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker's view of the broker.
pub struct W2WEndpoint {
    worker: WorkerId,
    world_size: usize,
    receiver: mpsc::Receiver<MessageEnvelope>,
    /// Arrived messages with no matching receive yet.
    stash: HashMap<MatchKey, VecDeque<Vec<u8>>>,
    broker: Arc<W2WBroker>,
}

impl W2WEndpoint {
    /// Number of stashed messages awaiting a matching receive.
    pub fn stashed_count(&self) -> usize {
        self.stash.values().map(VecDeque::len).sum()
    }

    /// Receive the payload matching `key`, stashing anything else that arrives first.
    async fn receive_matching(&mut self, key: MatchKey) -> Result<Vec<u8>> {
        if let Some(queue) = self.stash.get_mut(&key) {
            if let Some(payload) = queue.pop_front() {
                if queue.is_empty() {
                    self.stash.remove(&key);
                }
                return Ok(payload);
            }
        }

        loop {
            let envelope = self.receiver.recv().await.ok_or_else(|| {
                RingLifeError::communication(
                    self.worker,
                    Phase::Exchange,
                    format!(
                        "channel closed while waiting for {:?} #{} from worker {}",
                        key.tag, key.sequence, key.source
                    ),
                )
            })?;

            if !envelope.is_consistent() {
                return Err(RingLifeError::communication(
                    self.worker,
                    Phase::Exchange,
                    format!(
                        "message from worker {} declares {} bytes but carries {}",
                        envelope.header.source,
                        envelope.header.payload_len,
                        envelope.payload.len()
                    ),
                ));
            }

            let arrived = envelope.header.match_key();
            if arrived == key {
                return Ok(envelope.payload);
            }
            self.stash
                .entry(arrived)
                .or_default()
                .push_back(envelope.payload);
        }
    }
}

impl Drop for W2WEndpoint {
    fn drop(&mut self) {
        self.broker.unregister(&self.worker);
    }
}

#[async_trait]
impl Transport for W2WEndpoint {
    fn rank(&self) -> WorkerId {
        self.worker
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn post_send(
        &mut self,
        destination: WorkerId,
        tag: Tag,
        sequence: u64,
        payload: Vec<u8>,
    ) -> Result<SendRequest> {
        if destination.index() >= self.world_size {
            return Err(RingLifeError::communication(
                self.worker,
                Phase::Exchange,
                format!(
                    "destination {} outside world of {} workers",
                    destination, self.world_size
                ),
            ));
        }

        let envelope = MessageEnvelope::new(tag, self.worker, destination, sequence, payload);
        let receipt = self.broker.deliver(envelope);

        Ok(SendRequest {
            destination,
            tag,
            sequence,
            status: receipt.status,
        })
    }

    async fn wait_all(
        &mut self,
        sends: Vec<SendRequest>,
        recvs: Vec<RecvRequest>,
    ) -> Result<Vec<Vec<u8>>> {
        for send in &sends {
            if send.status != DeliveryStatus::Delivered {
                return Err(RingLifeError::communication(
                    self.worker,
                    Phase::Exchange,
                    format!(
                        "send of {:?} #{} to worker {} failed: {:?}",
                        send.tag, send.sequence, send.destination, send.status
                    ),
                ));
            }
        }

        let mut payloads = Vec::with_capacity(recvs.len());
        for recv in recvs {
            payloads.push(self.receive_matching(recv.key).await?);
        }
        Ok(payloads)
    }
}
