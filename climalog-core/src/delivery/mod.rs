//! Delivery subsystem
//!
//! Turns a [`CanonicalRecord`](crate::types::CanonicalRecord) into a
//! confirmed delivery over one of two transports:
//!
//! - [`DirectTransport`]: one HTTP POST per record to `{backend}/weather/logs`
//! - [`QueueTransport`]: persistent JSON messages on a durable AMQP queue
//!
//! The [`Dispatcher`] picks one of them once, from configuration, and the
//! collection loop only sees it as a [`RecordSink`].
//!
//! ## Failure handling
//!
//! Every failure is classified as an [`ErrorKind`](crate::error::ErrorKind),
//! logged where it happens, and reported upward as `false`. Nothing is
//! queued for later: a record that fails is counted as failed for its cycle.

mod broker;
mod direct;
mod dispatch;
mod queue;
mod resolve;
mod retry;

pub use broker::{AmqpBroker, Broker, BrokerLink};
pub use direct::{ingest_url, DirectTransport, INGEST_PATH};
pub use dispatch::{Dispatcher, RecordSink};
pub use queue::{publish_with_retry, QueueTransport};
pub use retry::RetryPolicy;
