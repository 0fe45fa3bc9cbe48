//! # climalog-core
//!
//! Core library for climalog - a weather collector for Brazilian capitals.
//!
//! This library provides:
//! - Domain types for samples, records, and delivery outcomes
//! - A weather source collaborator (Open-Meteo)
//! - The delivery subsystem: direct HTTP ingestion or a durable AMQP queue
//! - The collection loop that ties them together
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! `Fetcher` → `RawSample` → [`normalize`] → `CanonicalRecord` →
//! [`Dispatcher`] → transport → `bool`
//!
//! ## Example
//!
//! ```rust,no_run
//! use climalog_core::{CollectionLoop, Config, Dispatcher, OpenMeteoFetcher, ShutdownSignal};
//!
//! # async fn example() -> climalog_core::Result<()> {
//! let config = Config::load(None)?;
//! config.validate()?;
//!
//! let mut dispatcher = Dispatcher::from_config(&config)?;
//! dispatcher.prepare().await?;
//!
//! let fetcher = OpenMeteoFetcher::new(&config.fetch)?;
//! let mut collection = CollectionLoop::new(
//!     fetcher,
//!     dispatcher,
//!     config.locations(),
//!     config.interval(),
//!     ShutdownSignal::new(),
//! );
//! collection.run().await;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, DeliveryMode, QueueStrategy};
pub use cycle::{CollectionLoop, ShutdownSignal};
pub use delivery::{Dispatcher, RecordSink};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{Fetcher, OpenMeteoFetcher};
pub use normalize::normalize;
pub use types::*;

// Public modules
pub mod config;
pub mod cycle;
pub mod delivery;
pub mod error;
pub mod fetch;
pub mod locations;
pub mod logging;
pub mod normalize;
pub mod types;
