//! Tagger Metrics
//!
//! Prometheus counters for the reconciliation loop. The counters are bound to
//! a caller-owned [`Registry`], so tests can build an isolated set without a
//! running scrape endpoint.

use crate::error::Result;
use prometheus::{IntCounter, Opts, Registry};
use serde::{Deserialize, Serialize};

// =============================================================================
// Metric Names
// =============================================================================

pub const EVENTS_PROCESSED: &str = "kubetagger_processed_events_total";
pub const TAGS_ADDED: &str = "kubetagger_volume_tags_added";
pub const TAGS_EXISTING: &str = "kubetagger_volume_tags_existing";
pub const VOLUMES_TAGGED: &str = "kubetagger_volumes_tagged";
pub const PROCESSING_ERRORS: &str = "kubetagger_errors";

// =============================================================================
// Tagger Metrics
// =============================================================================

/// Counters shared between the watch loop and the telemetry server
#[derive(Debug, Clone)]
pub struct TaggerMetrics {
    events_processed: IntCounter,
    tags_added: IntCounter,
    tags_existing: IntCounter,
    volumes_tagged: IntCounter,
    errors: IntCounter,
}

impl TaggerMetrics {
    /// Create the counters and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            events_processed: counter(EVENTS_PROCESSED, "The total number of processed events")?,
            tags_added: counter(TAGS_ADDED, "Number of tags added to volumes")?,
            tags_existing: counter(TAGS_EXISTING, "Number of tags already existing on volumes")?,
            volumes_tagged: counter(VOLUMES_TAGGED, "Number of volumes tagged")?,
            errors: counter(PROCESSING_ERRORS, "Number of errors while processing")?,
        };

        registry.register(Box::new(metrics.events_processed.clone()))?;
        registry.register(Box::new(metrics.tags_added.clone()))?;
        registry.register(Box::new(metrics.tags_existing.clone()))?;
        registry.register(Box::new(metrics.volumes_tagged.clone()))?;
        registry.register(Box::new(metrics.errors.clone()))?;

        Ok(metrics)
    }

    #[inline]
    pub fn record_event(&self) {
        self.events_processed.inc();
    }

    #[inline]
    pub fn record_tag_added(&self) {
        self.tags_added.inc();
    }

    #[inline]
    pub fn record_tag_existing(&self) {
        self.tags_existing.inc();
    }

    #[inline]
    pub fn record_volume_tagged(&self) {
        self.volumes_tagged.inc();
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.inc();
    }

    /// Read all counters at once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_processed: self.events_processed.get(),
            tags_added: self.tags_added.get(),
            tags_existing: self.tags_existing.get(),
            volumes_tagged: self.volumes_tagged.get(),
            errors: self.errors.get(),
        }
    }
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    Ok(IntCounter::with_opts(Opts::new(name, help))?)
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub events_processed: u64,
    pub tags_added: u64,
    pub tags_existing: u64,
    pub volumes_tagged: u64,
    pub errors: u64,
}
