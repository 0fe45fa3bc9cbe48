//! Routes records to the transport selected at startup.

use async_trait::async_trait;

use crate::config::{Config, DeliveryMode, QueueStrategy};
use crate::error::Result;
use crate::types::CanonicalRecord;

use super::broker::{AmqpBroker, Broker};
use super::direct::DirectTransport;
use super::queue::QueueTransport;
use super::retry::RetryPolicy;

/// Destination for normalized records
///
/// Implementations recover from delivery failures themselves and report
/// only whether the record made it.
#[async_trait]
pub trait RecordSink: Send {
    /// Deliver one record; `false` means it was dropped for this cycle.
    async fn deliver(&mut self, record: &CanonicalRecord) -> bool;

    /// Release transport resources. Called once when the loop ends.
    async fn shutdown(&mut self) {}
}

/// The configured transport
pub enum Dispatcher<B: Broker = AmqpBroker> {
    Direct(DirectTransport),
    Queue {
        transport: QueueTransport<B>,
        strategy: QueueStrategy,
        retry: RetryPolicy,
    },
}

impl Dispatcher<AmqpBroker> {
    /// Build the transport for `config.mode`. Does not connect.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.mode {
            DeliveryMode::Direct => Ok(Dispatcher::Direct(DirectTransport::new(&config.direct)?)),
            DeliveryMode::Rabbit => Ok(Dispatcher::Queue {
                transport: QueueTransport::from_config(&config.queue)?,
                strategy: config.queue.strategy,
                retry: RetryPolicy::from_config(&config.queue),
            }),
        }
    }
}

impl<B: Broker> Dispatcher<B> {
    pub fn mode(&self) -> DeliveryMode {
        match self {
            Dispatcher::Direct(_) => DeliveryMode::Direct,
            Dispatcher::Queue { .. } => DeliveryMode::Rabbit,
        }
    }

    /// Establish the persistent broker link ahead of the first cycle.
    ///
    /// Only the persistent queue strategy holds a link; otherwise a no-op.
    pub async fn prepare(&mut self) -> Result<()> {
        match self {
            Dispatcher::Queue {
                transport,
                strategy: QueueStrategy::Persistent,
                ..
            } => transport.connect().await,
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<B: Broker> RecordSink for Dispatcher<B> {
    async fn deliver(&mut self, record: &CanonicalRecord) -> bool {
        let result = match self {
            Dispatcher::Direct(transport) => transport.send(record).await,
            Dispatcher::Queue {
                transport,
                strategy: QueueStrategy::Persistent,
                ..
            } => transport.publish(record).await,
            Dispatcher::Queue {
                transport,
                strategy: QueueStrategy::PerMessage,
                retry,
            } => transport.publish_with_retry(record, retry).await,
        };
        result.is_ok()
    }

    async fn shutdown(&mut self) {
        if let Dispatcher::Queue { transport, .. } = self {
            transport.close().await;
        }
    }
}
