//! Tagging
//!
//! Everything between a claim's annotations and its EBS volume's tags:
//! - Claim filter and tag-spec parsing
//! - Volume identifier decomposition
//! - Tag diff and apply

pub mod annotations;
pub mod reconciler;
pub mod volume_id;

pub use annotations::*;
pub use reconciler::*;
pub use volume_id::*;
