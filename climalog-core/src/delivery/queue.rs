//! Durable queue delivery
//!
//! [`QueueTransport`] keeps one link open across cycles. When a publish
//! fails it drops the link, reconnects once and retries once; nothing more.
//! [`publish_with_retry`] is the connection-per-message alternative with
//! exponential backoff between attempts.

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::types::CanonicalRecord;

use super::broker::{AmqpBroker, Broker, BrokerLink};
use super::retry::RetryPolicy;

/// Connection state owned by a single [`QueueTransport`].
///
/// `connected` implies `link` is present; a link that reports closed is
/// treated as disconnected.
struct QueueConnectionState {
    endpoint: String,
    link: Option<Box<dyn BrokerLink>>,
    connected: bool,
}

impl QueueConnectionState {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            link: None,
            connected: false,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected && self.link.as_ref().is_some_and(|link| link.is_open())
    }

    /// Reset to disconnected, handing back the old link for teardown.
    fn take_link(&mut self) -> Option<Box<dyn BrokerLink>> {
        self.connected = false;
        self.link.take()
    }
}

/// Stateful publisher over a long-lived broker link
pub struct QueueTransport<B: Broker = AmqpBroker> {
    broker: B,
    topic: String,
    state: QueueConnectionState,
}

impl QueueTransport<AmqpBroker> {
    /// Create an AMQP-backed transport from configuration. Does not connect.
    pub fn from_config(config: &QueueConfig) -> Result<Self> {
        Ok(Self::new(AmqpBroker::new(&config.url)?, config.topic.clone()))
    }
}

impl<B: Broker> QueueTransport<B> {
    pub fn new(broker: B, topic: impl Into<String>) -> Self {
        let state = QueueConnectionState::new(broker.endpoint());
        Self {
            broker,
            topic: topic.into(),
            state,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Open a link and declare the durable topic.
    ///
    /// No-op if already connected and the link reports open.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state.is_connected() {
            return Ok(());
        }
        self.discard_link().await;

        tracing::info!(endpoint = %self.state.endpoint, topic = %self.topic, "Connecting to broker");

        match open_declared(&self.broker, &self.topic).await {
            Ok(link) => {
                self.state.link = Some(link);
                self.state.connected = true;
                tracing::info!(endpoint = %self.state.endpoint, "Connected to broker");
                Ok(())
            }
            Err(e) => {
                log_broker_failure(&e, &self.state.endpoint, "connect");
                Err(e)
            }
        }
    }

    /// Publish one record as a persistent JSON message.
    ///
    /// Connects first if needed. A failed publish costs at most one
    /// reconnect and one retry.
    pub async fn publish(&mut self, record: &CanonicalRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)?;

        if !self.state.is_connected() {
            self.connect().await?;
        }

        match self.publish_on_link(&payload).await {
            Ok(()) => {
                tracing::debug!(topic = %self.topic, city = %record.city, "Published record");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    city = %record.city,
                    kind = %e.kind(),
                    error = %e,
                    "Publish failed, reconnecting once"
                );
                self.discard_link().await;
            }
        }

        self.connect().await?;

        match self.publish_on_link(&payload).await {
            Ok(()) => {
                tracing::info!(topic = %self.topic, city = %record.city, "Published record after reconnect");
                Ok(())
            }
            Err(e) => {
                self.discard_link().await;
                log_broker_failure(&e, &self.state.endpoint, "publish");
                Err(e)
            }
        }
    }

    /// Close channel and connection, ignoring teardown errors. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut link) = self.state.take_link() {
            if let Err(e) = link.close().await {
                tracing::debug!(error = %e, "Ignoring error while closing broker link");
            }
            tracing::info!(endpoint = %self.state.endpoint, "Broker connection closed");
        }
    }

    /// Connection-per-message delivery that leaves the persistent link alone.
    pub async fn publish_with_retry(
        &self,
        record: &CanonicalRecord,
        policy: &RetryPolicy,
    ) -> Result<()> {
        publish_with_retry(&self.broker, &self.topic, record, policy).await
    }

    async fn publish_on_link(&mut self, payload: &[u8]) -> Result<()> {
        let topic = &self.topic;
        let link = self
            .state
            .link
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected to broker".to_string()))?;
        link.publish_persistent(topic, payload).await
    }

    async fn discard_link(&mut self) {
        if let Some(mut link) = self.state.take_link() {
            let _ = link.close().await;
        }
    }
}

/// Publish one record over a fresh link per attempt.
///
/// Makes up to `policy.max_attempts` attempts, sleeping the policy's delay
/// between them (never after the last). DNS failures are logged distinctly
/// but retried like any other failure.
pub async fn publish_with_retry<B: Broker + ?Sized>(
    broker: &B,
    topic: &str,
    record: &CanonicalRecord,
    policy: &RetryPolicy,
) -> Result<()> {
    let payload = serde_json::to_vec(record)?;
    let endpoint = broker.endpoint();
    let mut attempt = 1;

    loop {
        tracing::info!(
            attempt,
            max_attempts = policy.max_attempts,
            endpoint = %endpoint,
            "Connecting to broker"
        );

        match publish_once(broker, topic, &payload).await {
            Ok(()) => {
                tracing::info!(topic, city = %record.city, "Published record");
                return Ok(());
            }
            Err(e) => {
                log_broker_failure(&e, &endpoint, "publish");
                match policy.delay_after(attempt) {
                    Some(delay) => {
                        tracing::info!(attempt, ?delay, "Retrying broker publish");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        tracing::error!(
                            attempts = attempt,
                            city = %record.city,
                            "Giving up on broker publish"
                        );
                        return Err(e);
                    }
                }
            }
        }
    }
}

async fn publish_once<B: Broker + ?Sized>(broker: &B, topic: &str, payload: &[u8]) -> Result<()> {
    let mut link = open_declared(broker, topic).await?;
    let published = link.publish_persistent(topic, payload).await;
    let closed = link.close().await;
    published?;
    if let Err(e) = closed {
        tracing::debug!(error = %e, "Ignoring error while closing broker link");
    }
    Ok(())
}

async fn open_declared<B: Broker + ?Sized>(broker: &B, topic: &str) -> Result<Box<dyn BrokerLink>> {
    let mut link = broker.open().await?;
    if let Err(e) = link.declare_durable_topic(topic).await {
        let _ = link.close().await;
        return Err(e);
    }
    Ok(link)
}

fn log_broker_failure(error: &Error, endpoint: &str, operation: &'static str) {
    match error {
        Error::Dns { host, .. } => tracing::error!(
            host = %host,
            endpoint,
            operation,
            hint = error.hint().unwrap_or_default(),
            "Could not resolve broker hostname"
        ),
        other => tracing::error!(
            kind = %other.kind(),
            error = %other,
            endpoint,
            operation,
            "Broker operation failed"
        ),
    }
}
