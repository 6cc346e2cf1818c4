//! Actor-based persistence for the tangle
//!
//! All durable writes go through one Tokio task that owns the RocksDB write
//! path. Callers hold a cloneable [`StoreHandle`] and talk to the task over a
//! bounded channel, which gives backpressure when storage falls behind.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          IngestionPipeline (many concurrent)          │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ StoreHandle::save()
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │            PersistenceActor (Single Task)             │
//! │  Batch: Vec<(key, value, reply)>                      │
//! │  Timer: batch_timeout or max_batch_size → flush       │
//! └─────────────────────┬────────────────────────────────┘
//!                       ▼
//!             Storage::put / put_batch
//! ```
//!
//! With batching enabled a `save` resolves only once its batch has been
//! written, so a successful reply always means the data is durable.

use crate::{
    config::PersistenceConfig,
    storage::{Storage, TransactionStore},
    Error, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration};

/// Message sent to the persistence actor
#[derive(Debug)]
pub enum StoreMessage {
    /// Persist one key/value pair
    Save {
        key: Vec<u8>,
        value: Vec<u8>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Flush the pending batch immediately
    Flush {
        response: oneshot::Sender<Result<()>>,
    },

    /// Flush and stop
    Shutdown,
}

struct PendingWrite {
    key: Vec<u8>,
    value: Vec<u8>,
    response: oneshot::Sender<Result<()>>,
}

/// Actor that owns the write path
pub struct PersistenceActor {
    storage: Arc<Storage>,
    mailbox: mpsc::Receiver<StoreMessage>,
    batch: Vec<PendingWrite>,
    max_batch_size: usize,
    batch_timeout: Duration,
    batching_enabled: bool,
}

impl PersistenceActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<StoreMessage>,
        config: &PersistenceConfig,
    ) -> Self {
        Self {
            storage,
            mailbox,
            batch: Vec::with_capacity(config.max_batch_size),
            max_batch_size: config.max_batch_size.max(1),
            batch_timeout: Duration::from_millis(config.batch_timeout_ms.max(1)),
            batching_enabled: config.batching_enabled,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let mut batch_timer = interval(self.batch_timeout);
        batch_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(msg) = self.mailbox.recv() => {
                    match msg {
                        StoreMessage::Shutdown => {
                            self.flush_batch();
                            break;
                        }
                        StoreMessage::Save { key, value, response } => {
                            if self.batching_enabled {
                                self.batch.push(PendingWrite { key, value, response });
                                if self.batch.len() >= self.max_batch_size {
                                    self.flush_batch();
                                }
                            } else {
                                let result = self.storage.put(&key, &value);
                                if let Err(ref e) = result {
                                    tracing::error!("Error persisting transaction: {}", e);
                                }
                                let _ = response.send(result);
                            }
                        }
                        StoreMessage::Flush { response } => {
                            self.flush_batch();
                            let _ = response.send(Ok(()));
                        }
                    }
                }

                _ = batch_timer.tick(), if self.batching_enabled && !self.batch.is_empty() => {
                    self.flush_batch();
                }

                else => {
                    self.flush_batch();
                    break;
                }
            }
        }

        tracing::debug!("Persistence actor stopped");
    }

    /// Write the pending batch and answer every waiting caller
    fn flush_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        tracing::debug!("Flushing batch of {} transactions", self.batch.len());

        let pending: Vec<PendingWrite> = self.batch.drain(..).collect();
        let entries: Vec<(Vec<u8>, Vec<u8>)> = pending
            .iter()
            .map(|w| (w.key.clone(), w.value.clone()))
            .collect();

        match self.storage.put_batch(&entries) {
            Ok(()) => {
                for write in pending {
                    let _ = write.response.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::error!("Error flushing batch: {}", e);
                let message = e.to_string();
                for write in pending {
                    let _ = write
                        .response
                        .send(Err(Error::Storage(message.clone())));
                }
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreMessage>,
}

impl StoreHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<StoreMessage>) -> Self {
        Self { sender }
    }

    /// Flush pending writes immediately
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StoreMessage::Flush { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(StoreMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for StoreHandle {
    async fn save(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(StoreMessage::Save {
                key: key.to_vec(),
                value: value.to_vec(),
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }
}

/// Spawn the persistence actor
pub fn spawn_persistence_actor(storage: Arc<Storage>, config: &PersistenceConfig) -> StoreHandle {
    let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
    let actor = PersistenceActor::new(storage, rx, config);

    tokio::spawn(async move {
        actor.run().await;
    });

    StoreHandle::new(tx)
}
