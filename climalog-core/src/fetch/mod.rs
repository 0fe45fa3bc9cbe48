//! Weather sources
//!
//! A [`Fetcher`] turns a [`Location`] into a [`RawSample`]. Sources are
//! expected to degrade to a best-effort sample instead of failing, so a
//! monitored location still yields a record when its upstream is down.

mod open_meteo;

pub use open_meteo::OpenMeteoFetcher;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Location, RawSample};

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<RawSample>;
}

/// Current UTC time as RFC 3339 with microseconds and a `Z` suffix.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
