//! Core domain types for climalog
//!
//! | Term | Definition |
//! |------|------------|
//! | **Location** | A monitored point: a city name plus coordinates |
//! | **RawSample** | What the weather source returned for one location, unvalidated |
//! | **CanonicalRecord** | The normalized shape sent to either transport |
//! | **DeliveryOutcome** | Whether one record reached its transport |
//! | **CycleReport** | All outcomes of one collection cycle |

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================
// Locations
// ============================================

/// A monitored geographic point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(city: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            city: city.into(),
            lat,
            lon,
        }
    }
}

// ============================================
// Samples and records
// ============================================

/// Raw sample as produced by a [`Fetcher`](crate::fetch::Fetcher).
///
/// Metric values are kept as untyped JSON because upstream sources are free
/// to send nulls, strings, or nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub humidity: Option<Value>,
    pub city: String,
}

/// Normalized record delivered to the ingestion endpoint or the queue.
///
/// `temperature` and `humidity` are always finite numbers. `timestamp` and
/// `city` are copied from the raw sample unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub timestamp: Option<String>,
    pub temperature: f64,
    pub humidity: f64,
    pub city: String,
}

// ============================================
// Outcomes
// ============================================

/// Result of delivering one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub city: String,
    pub success: bool,
}

/// Summary of one collection cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<DeliveryOutcome>,
    /// Locations whose fetch failed and produced no record
    pub fetch_failures: usize,
    /// True if the cycle stopped early because shutdown was requested
    pub interrupted: bool,
}

impl CycleReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed_cities(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.city.as_str())
    }
}
