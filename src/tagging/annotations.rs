//! Claim Annotations
//!
//! Recognises claims provisioned by the in-tree EBS provisioner and parses
//! the tag list users declare on them.

use crate::domain::ports::VolumeTag;
use crate::error::Error;
use std::collections::BTreeMap;

// =============================================================================
// Annotation Keys
// =============================================================================

/// Provisioner annotation set by the PV controller
pub const STORAGE_PROVISIONER: &str = "volume.beta.kubernetes.io/storage-provisioner";

/// GA provisioner annotation (Kubernetes 1.23+)
pub const STORAGE_PROVISIONER_GA: &str = "volume.kubernetes.io/storage-provisioner";

/// Provisioner name of the in-tree EBS plugin
pub const AWS_EBS_PROVISIONER: &str = "kubernetes.io/aws-ebs";

/// Separator used between `key=value` pairs
pub const TAGS_SEPARATOR: &str = "volume.beta.kubernetes.io/additional-resource-tags-separator";

/// The `key=value` list to apply to the volume
pub const ADDITIONAL_TAGS: &str = "volume.beta.kubernetes.io/additional-resource-tags";

/// Separator used when the claim does not override it
pub const DEFAULT_SEPARATOR: &str = ",";

// =============================================================================
// Claim Filter
// =============================================================================

/// Check whether a claim was provisioned by the EBS backend
pub fn is_supported_claim(annotations: &BTreeMap<String, String>) -> bool {
    [STORAGE_PROVISIONER, STORAGE_PROVISIONER_GA]
        .iter()
        .any(|key| annotations.get(*key).map(String::as_str) == Some(AWS_EBS_PROVISIONER))
}

// =============================================================================
// Tag Spec
// =============================================================================

/// Tag list and separator declared on a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    separator: String,
    raw: String,
}

/// Result of splitting a [`TagSpec`]
#[derive(Debug, Default)]
pub struct ParsedTags {
    /// Well-formed pairs, in declaration order
    pub tags: Vec<VolumeTag>,
    /// One entry per token that was not exactly `key=value`
    pub malformed: Vec<Error>,
}

impl TagSpec {
    /// Create a spec from a raw tag list and separator
    ///
    /// An empty separator falls back to [`DEFAULT_SEPARATOR`].
    pub fn new(raw: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        Self {
            separator: if separator.is_empty() {
                DEFAULT_SEPARATOR.to_string()
            } else {
                separator
            },
            raw: raw.into(),
        }
    }

    /// Read the tag spec from claim annotations
    ///
    /// Returns `None` when the claim declares no tags.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        let raw = annotations.get(ADDITIONAL_TAGS).filter(|v| !v.is_empty())?;
        let separator = annotations
            .get(TAGS_SEPARATOR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SEPARATOR);

        Some(Self::new(raw.as_str(), separator))
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Split the raw list into tags, collecting malformed tokens separately
    pub fn parse(&self) -> ParsedTags {
        let mut parsed = ParsedTags::default();

        for token in self.raw.split(self.separator.as_str()) {
            let mut parts = token.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) if !key.trim().is_empty() => {
                    parsed.tags.push(VolumeTag::new(key.trim(), value.trim()));
                }
                _ => parsed.malformed.push(Error::MalformedTag {
                    token: token.to_string(),
                }),
            }
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_supported_claim() {
        assert!(is_supported_claim(&annotations(&[(
            STORAGE_PROVISIONER,
            AWS_EBS_PROVISIONER
        )])));
        assert!(is_supported_claim(&annotations(&[(
            STORAGE_PROVISIONER_GA,
            AWS_EBS_PROVISIONER
        )])));
    }

    #[test]
    fn test_unsupported_claim() {
        assert!(!is_supported_claim(&BTreeMap::new()));
        assert!(!is_supported_claim(&annotations(&[(
            STORAGE_PROVISIONER,
            "ebs.csi.aws.com"
        )])));
        // Case-sensitive
        assert!(!is_supported_claim(&annotations(&[(
            STORAGE_PROVISIONER,
            "kubernetes.io/AWS-EBS"
        )])));
        assert!(!is_supported_claim(&annotations(&[(
            "storage-provisioner",
            AWS_EBS_PROVISIONER
        )])));
    }

    #[test]
    fn test_from_annotations_default_separator() {
        let spec = TagSpec::from_annotations(&annotations(&[
            (STORAGE_PROVISIONER, AWS_EBS_PROVISIONER),
            (ADDITIONAL_TAGS, "env=prod,team=infra"),
        ]))
        .unwrap();

        assert_eq!(spec.separator(), ",");
        let parsed = spec.parse();
        assert_eq!(
            parsed.tags,
            vec![VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")]
        );
        assert!(parsed.malformed.is_empty());
    }

    #[test]
    fn test_from_annotations_custom_separator() {
        let spec = TagSpec::from_annotations(&annotations(&[
            (ADDITIONAL_TAGS, "owner=a,b;cost-center=42"),
            (TAGS_SEPARATOR, ";"),
        ]))
        .unwrap();

        assert_eq!(
            spec.parse().tags,
            vec![
                VolumeTag::new("owner", "a,b"),
                VolumeTag::new("cost-center", "42")
            ]
        );
    }

    #[test]
    fn test_from_annotations_without_tags() {
        assert!(TagSpec::from_annotations(&BTreeMap::new()).is_none());
        assert!(TagSpec::from_annotations(&annotations(&[(ADDITIONAL_TAGS, "")])).is_none());
        assert!(TagSpec::from_annotations(&annotations(&[(TAGS_SEPARATOR, ";")])).is_none());
    }

    #[test]
    fn test_empty_separator_uses_default() {
        let spec = TagSpec::new("a=1,b=2", "");
        assert_eq!(spec.separator(), DEFAULT_SEPARATOR);
        assert_eq!(spec.parse().tags.len(), 2);
    }

    #[test]
    fn test_malformed_tokens_are_skipped_individually() {
        let parsed = TagSpec::new("env=prod,broken,a=b=c,team=infra,", ",").parse();

        assert_eq!(
            parsed.tags,
            vec![VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")]
        );
        // "broken", "a=b=c" and the trailing empty token
        assert_eq!(parsed.malformed.len(), 3);
        assert_matches!(&parsed.malformed[0], Error::MalformedTag { token } if token == "broken");
        assert_matches!(&parsed.malformed[1], Error::MalformedTag { token } if token == "a=b=c");
    }

    #[test]
    fn test_empty_key_is_malformed() {
        let parsed = TagSpec::new("=prod, =x,env=", ",").parse();

        assert_eq!(parsed.tags, vec![VolumeTag::new("env", "")]);
        assert_eq!(parsed.malformed.len(), 2);
        assert_matches!(&parsed.malformed[1], Error::MalformedTag { token } if token == " =x");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let parsed = TagSpec::new("env = prod, team=infra ", ",").parse();
        assert_eq!(
            parsed.tags,
            vec![VolumeTag::new("env", "prod"), VolumeTag::new("team", "infra")]
        );
    }

    #[test]
    fn test_empty_value_is_well_formed() {
        let parsed = TagSpec::new("backup=", ",").parse();
        assert_eq!(parsed.tags, vec![VolumeTag::new("backup", "")]);
        assert!(parsed.malformed.is_empty());
    }
}
