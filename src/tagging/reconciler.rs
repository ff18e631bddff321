//! Tag Reconciler
//!
//! Diffs the tags declared on a claim against the tags on its EBS volume and
//! creates the missing ones, one `CreateTags` call per tag.

use crate::controller::ClaimContext;
use crate::domain::ports::{TagStoreRef, VolumeTag};
use crate::error::Result;
use crate::tagging::EbsVolumeId;
use crate::telemetry::TaggerMetrics;
use tracing::{debug, error, info};

// =============================================================================
// Reconcile Report
// =============================================================================

/// What happened to each declared tag during one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub volume: EbsVolumeId,
    /// Created on the volume
    pub applied: Vec<VolumeTag>,
    /// Already present with the same value
    pub existing: Vec<VolumeTag>,
    /// Absent but not created because of dry-run
    pub skipped: Vec<VolumeTag>,
    /// Absent and the create call failed
    pub failed: Vec<VolumeTag>,
}

impl ReconcileReport {
    fn new(volume: EbsVolumeId) -> Self {
        Self {
            volume,
            applied: Vec::new(),
            existing: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True if at least one tag was created
    pub fn volume_tagged(&self) -> bool {
        !self.applied.is_empty()
    }
}

// =============================================================================
// Tag Reconciler
// =============================================================================

/// Applies missing tags to EBS volumes
pub struct TagReconciler {
    store: TagStoreRef,
    metrics: TaggerMetrics,
    dry_run: bool,
}

impl TagReconciler {
    /// Create a new reconciler
    pub fn new(store: TagStoreRef, metrics: TaggerMetrics, dry_run: bool) -> Self {
        Self {
            store,
            metrics,
            dry_run,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Bring `volume` up to date with `tags`
    ///
    /// Fails only if the current tags cannot be fetched. Failed create calls
    /// are counted as errors and reported per tag.
    pub async fn reconcile(
        &self,
        ctx: &ClaimContext,
        volume: &EbsVolumeId,
        tags: &[VolumeTag],
    ) -> Result<ReconcileReport> {
        let remote = self.store.describe_tags(volume).await?;
        let mut report = ReconcileReport::new(volume.clone());

        debug!(
            vol_id = volume.volume_id(),
            region = volume.region(),
            remote_tags = remote.len(),
            "Fetched volume tags from {}",
            self.store.store_name()
        );

        for tag in tags {
            debug!(
                tag_key = %tag.key,
                tag_value = %tag.value,
                vol_id = volume.volume_id(),
                region = volume.region(),
                "Processing EBS volume"
            );

            if remote.contains(tag) {
                info!(
                    tag_key = %tag.key,
                    tag_value = %tag.value,
                    vol_id = volume.volume_id(),
                    "Tag value already exists"
                );
                self.metrics.record_tag_existing();
                report.existing.push(tag.clone());
                continue;
            }

            if self.dry_run {
                info!(
                    claim = %ctx,
                    tag_key = %tag.key,
                    tag_value = %tag.value,
                    vol_id = volume.volume_id(),
                    "Running in dry run mode, not adding tag"
                );
                report.skipped.push(tag.clone());
                continue;
            }

            match self.store.create_tag(volume, tag).await {
                Ok(()) => {
                    info!(
                        tag_key = %tag.key,
                        tag_value = %tag.value,
                        vol_id = volume.volume_id(),
                        "Tag added"
                    );
                    self.metrics.record_tag_added();
                    report.applied.push(tag.clone());
                }
                Err(e) => {
                    error!(
                        error = %e,
                        tag_key = %tag.key,
                        vol_id = volume.volume_id(),
                        "Error creating tag"
                    );
                    self.metrics.record_error();
                    report.failed.push(tag.clone());
                }
            }
        }

        if report.volume_tagged() {
            self.metrics.record_volume_tagged();
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InMemoryTagStore;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use prometheus::Registry;
    use std::sync::Arc;

    fn volume() -> EbsVolumeId {
        EbsVolumeId::new("eu-west-1", "vol-0123456789abcdef0")
    }

    fn ctx() -> ClaimContext {
        ClaimContext::new("db", "data", Some("pvc-1".into()))
    }

    fn setup(dry_run: bool) -> (Arc<InMemoryTagStore>, TaggerMetrics, TagReconciler) {
        let store = Arc::new(InMemoryTagStore::new());
        let metrics = TaggerMetrics::new(&Registry::new()).unwrap();
        let reconciler = TagReconciler::new(store.clone(), metrics.clone(), dry_run);
        (store, metrics, reconciler)
    }

    #[tokio::test]
    async fn test_applies_only_missing_tags() {
        let (store, metrics, reconciler) = setup(false);
        store.insert_volume(&volume(), [VolumeTag::new("env", "prod")]);

        let report = reconciler
            .reconcile(
                &ctx(),
                &volume(),
                &[VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")],
            )
            .await
            .unwrap();

        assert_eq!(report.applied, vec![VolumeTag::new("team", "infra")]);
        assert_eq!(report.existing, vec![VolumeTag::new("env", "prod")]);
        assert_eq!(store.create_calls(), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tags_existing, 1);
        assert_eq!(snapshot.tags_added, 1);
        assert_eq!(snapshot.volumes_tagged, 1);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let (store, metrics, reconciler) = setup(false);
        store.insert_volume(&volume(), []);
        let tags = [VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")];

        reconciler.reconcile(&ctx(), &volume(), &tags).await.unwrap();
        assert_eq!(store.create_calls(), 2);

        let report = reconciler.reconcile(&ctx(), &volume(), &tags).await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.existing.len(), 2);
        assert_eq!(store.create_calls(), 2);
        assert_eq!(metrics.snapshot().volumes_tagged, 1);
    }

    #[tokio::test]
    async fn test_changed_value_is_reapplied() {
        let (store, _, reconciler) = setup(false);
        store.insert_volume(&volume(), [VolumeTag::new("env", "staging")]);

        let report = reconciler
            .reconcile(&ctx(), &volume(), &[VolumeTag::new("env", "prod")])
            .await
            .unwrap();

        assert_eq!(report.applied, vec![VolumeTag::new("env", "prod")]);
        assert!(store
            .tags_of(&volume())
            .unwrap()
            .contains(&VolumeTag::new("env", "prod")));
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_create_calls() {
        let (store, metrics, reconciler) = setup(true);
        store.insert_volume(&volume(), [VolumeTag::new("env", "prod")]);

        let report = reconciler
            .reconcile(
                &ctx(),
                &volume(),
                &[VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")],
            )
            .await
            .unwrap();

        assert_eq!(store.create_calls(), 0);
        assert_eq!(report.skipped, vec![VolumeTag::new("team", "infra")]);
        assert!(!report.volume_tagged());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tags_existing, 1);
        assert_eq!(snapshot.tags_added, 0);
        assert_eq!(snapshot.volumes_tagged, 0);
    }

    #[tokio::test]
    async fn test_describe_failure_aborts() {
        let (store, _, reconciler) = setup(false);

        let result = reconciler
            .reconcile(&ctx(), &volume(), &[VolumeTag::new("env", "prod")])
            .await;

        assert_matches!(result, Err(Error::VolumeNotFound { .. }));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_isolated_per_tag() {
        let (store, metrics, reconciler) = setup(false);
        store.insert_volume(&volume(), []);
        store.fail_creates_for("aws:reserved");

        let report = reconciler
            .reconcile(
                &ctx(),
                &volume(),
                &[
                    VolumeTag::new("aws:reserved", "x"),
                    VolumeTag::new("team", "infra"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.failed, vec![VolumeTag::new("aws:reserved", "x")]);
        assert_eq!(report.applied, vec![VolumeTag::new("team", "infra")]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.tags_added, 1);
        assert_eq!(snapshot.volumes_tagged, 1);
    }
}
