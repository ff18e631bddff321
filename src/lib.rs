//! Kube Tagger - EBS volume tags from PersistentVolumeClaim annotations
//!
//! Watches PersistentVolumeClaims and copies the `key=value` pairs declared in
//! their `volume.beta.kubernetes.io/additional-resource-tags` annotation onto
//! the backing EBS volume.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          Claim Controller                            │
//! │                                                                      │
//! │  PVC watch ─► Claim Filter ─► Tag Spec ─► Volume Resolver ─► Tag     │
//! │  (kube)       (annotations)   Parser      (PersistentVolume)  Recon- │
//! │                                                               ciler  │
//! ├──────────────────────────────────┬───────────────────────────────────┤
//! │            Kubernetes            │               EC2                 │
//! │   PersistentVolumeClaim watch    │   DescribeVolumes / CreateTags    │
//! │   PersistentVolume get           │   (one client per region)         │
//! ├──────────────────────────────────┴───────────────────────────────────┤
//! │   Telemetry: prometheus counters on /metrics, /status, /healthz      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controller`]: Watch loop and per-claim context
//! - [`tagging`]: Annotation parsing, volume ids and tag reconciliation
//! - [`kubernetes`]: API client setup and volume resolution
//! - [`cloud`]: EC2 and in-memory tag stores
//! - [`telemetry`]: Counters and the scrape endpoint
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod cloud;
pub mod controller;
pub mod domain;
pub mod error;
pub mod kubernetes;
pub mod tagging;
pub mod telemetry;

// Re-export commonly used types
pub use controller::{
    ClaimContext, ClaimController, ClaimOutcome, ControllerConfig, EventOutcome,
};

pub use cloud::{Ec2TagStore, InMemoryTagStore};

pub use domain::ports::{
    RemoteTagSet, TagStore, TagStoreRef, VolumeResolver, VolumeResolverRef, VolumeTag,
};

pub use error::{Error, ErrorAction, Result};

pub use kubernetes::{build_client, ClientConfig, KubeVolumeResolver, StaticVolumeResolver};

pub use tagging::{
    is_supported_claim, EbsVolumeId, ParsedTags, ReconcileReport, TagReconciler, TagSpec,
};

pub use telemetry::{MetricsSnapshot, TaggerMetrics, TelemetryConfig, TelemetryServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
