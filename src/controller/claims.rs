//! Claim Controller
//!
//! Consumes the PersistentVolumeClaim watch one event at a time and drives
//! each supported claim through resolve, parse and reconcile.
//!
//! ```text
//!  watch ──► filter ──► tag spec ──► resolve PV ──► parse volume id ──► reconcile
//! ```

use crate::controller::ClaimContext;
use crate::domain::ports::{TagStoreRef, VolumeResolverRef};
use crate::error::{Error, ErrorAction, Result};
use crate::tagging::{is_supported_claim, EbsVolumeId, ReconcileReport, TagReconciler, TagSpec};
use crate::telemetry::TaggerMetrics;
use futures::{Stream, TryStreamExt};
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{Api, WatchEvent, WatchParams};
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, warn, Instrument};

/// Server-side watch window, kept under the client read timeout
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Version the first window starts from: current state, then changes
const INITIAL_VERSION: &str = "0";

// =============================================================================
// Controller Configuration
// =============================================================================

/// Configuration for the claim controller
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Diff and log, but never create tags
    pub dry_run: bool,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of processing one claim
#[derive(Debug)]
pub enum ClaimOutcome {
    /// Not provisioned by the EBS backend
    Unsupported,
    /// No well-formed tags declared
    NoTags,
    /// No PersistentVolume bound yet
    Unbound,
    /// Tags were diffed against the volume
    Reconciled(ReconcileReport),
}

/// Result of handling one watch event
#[derive(Debug)]
pub enum EventOutcome {
    /// Event kind that needs no action
    Ignored,
    Processed(ClaimOutcome),
    /// The claim or event was abandoned; already logged and counted
    Failed(Error),
}

// =============================================================================
// Claim Controller
// =============================================================================

/// Single-consumer event loop over claim notifications
pub struct ClaimController {
    config: ControllerConfig,
    resolver: VolumeResolverRef,
    reconciler: TagReconciler,
    metrics: TaggerMetrics,
}

impl ClaimController {
    /// Create a new controller
    pub fn new(
        config: ControllerConfig,
        resolver: VolumeResolverRef,
        store: TagStoreRef,
        metrics: TaggerMetrics,
    ) -> Self {
        let reconciler = TagReconciler::new(store, metrics.clone(), config.dry_run);

        Self {
            config,
            resolver,
            reconciler,
            metrics,
        }
    }

    /// Watch claims until the connection fails
    ///
    /// The API server closes watches periodically. A cleanly closed window is
    /// reopened from the last resource version seen, so claims already handled
    /// are not replayed. A transport error or an expired version is returned.
    pub async fn watch(&self, client: Client) -> Result<()> {
        let claims: Api<PersistentVolumeClaim> = match &self.config.namespace {
            Some(namespace) => Api::namespaced(client, namespace),
            None => Api::all(client),
        };
        let params = WatchParams::default()
            .timeout(WATCH_TIMEOUT_SECS)
            .allow_bookmarks();
        let mut version = INITIAL_VERSION.to_string();

        loop {
            info!(
                namespace = self.config.namespace.as_deref().unwrap_or("*"),
                resource_version = %version,
                "Opening volume claim watch"
            );
            let stream = claims.watch(&params, &version).await?;
            if let Some(last) = self.run_stream(stream).await? {
                version = last;
            }
            debug!("Watch window closed by the API server");
        }
    }

    /// Process one watch window sequentially
    ///
    /// Returns the last resource version seen in the window, bookmarks
    /// included. Stops at the first error classified as terminal.
    pub async fn run_stream<S>(&self, stream: S) -> Result<Option<String>>
    where
        S: Stream<Item = kube::Result<WatchEvent<PersistentVolumeClaim>>>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut version = None;

        while let Some(event) = stream.try_next().await? {
            if let Some(seen) = event_version(&event) {
                version = Some(seen);
            }

            if let EventOutcome::Failed(e) = self.handle_event(event).await {
                if e.action() == ErrorAction::Terminate {
                    return Err(e);
                }
            }
        }

        Ok(version)
    }

    /// Handle a single watch event
    pub async fn handle_event(&self, event: WatchEvent<PersistentVolumeClaim>) -> EventOutcome {
        self.metrics.record_event();

        match event {
            WatchEvent::Added(claim) | WatchEvent::Modified(claim) => {
                let ctx = ClaimContext::from_claim(&claim);

                match self.process_claim(&ctx, &claim).instrument(ctx.span()).await {
                    Ok(outcome) => EventOutcome::Processed(outcome),
                    Err(e) => {
                        error!(
                            namespace = %ctx.namespace,
                            volume_claim = %ctx.claim,
                            volume_name = %ctx.volume_name(),
                            error = %e,
                            "Error processing volume claim"
                        );
                        self.metrics.record_error();
                        EventOutcome::Failed(e)
                    }
                }
            }
            WatchEvent::Deleted(claim) => {
                debug!(volume_claim = %claim.name_any(), "Ignoring deleted claim");
                EventOutcome::Ignored
            }
            WatchEvent::Bookmark(_) => EventOutcome::Ignored,
            WatchEvent::Error(response) => {
                let e = Error::WatchEvent {
                    code: response.code,
                    reason: response.reason,
                    message: response.message,
                };
                warn!(error = %e, "Unexpected watch event");
                self.metrics.record_error();
                EventOutcome::Failed(e)
            }
        }
    }

    /// Drive one claim through filter, resolve, parse and reconcile
    pub async fn process_claim(
        &self,
        ctx: &ClaimContext,
        claim: &PersistentVolumeClaim,
    ) -> Result<ClaimOutcome> {
        let annotations = claim.annotations();

        if !is_supported_claim(annotations) {
            warn!("Volume is not EBS. Ignoring");
            return Ok(ClaimOutcome::Unsupported);
        }

        let Some(spec) = TagSpec::from_annotations(annotations) else {
            debug!("No additional resource tags declared");
            return Ok(ClaimOutcome::NoTags);
        };

        let Some(volume_name) = ctx.volume.as_deref() else {
            info!("Volume claim is not bound yet");
            return Ok(ClaimOutcome::Unbound);
        };

        info!("Processing volume tags");

        let url = self.resolver.resolve(volume_name).await?;
        let volume = EbsVolumeId::parse(&url)?;

        let parsed = spec.parse();
        for malformed in &parsed.malformed {
            error!(error = %malformed, "Skipping malformed tag");
            self.metrics.record_error();
        }

        if parsed.tags.is_empty() {
            return Ok(ClaimOutcome::NoTags);
        }

        let report = self.reconciler.reconcile(ctx, &volume, &parsed.tags).await?;

        if self.reconciler.dry_run() && !report.skipped.is_empty() {
            info!(
                vol_id = volume.volume_id(),
                tags = spec.raw(),
                "Running in dry run mode, skipped tagging claim"
            );
        }

        Ok(ClaimOutcome::Reconciled(report))
    }
}

/// Resource version carried by a watch event
fn event_version(event: &WatchEvent<PersistentVolumeClaim>) -> Option<String> {
    match event {
        WatchEvent::Added(claim) | WatchEvent::Modified(claim) | WatchEvent::Deleted(claim) => {
            claim.resource_version()
        }
        WatchEvent::Bookmark(bookmark) => Some(bookmark.metadata.resource_version.clone()),
        WatchEvent::Error(_) => None,
    }
}
