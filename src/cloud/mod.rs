//! Cloud Tag Stores
//!
//! Provides implementations of the [`TagStore`](crate::domain::ports::TagStore) port:
//! - EC2: EBS volume tags through the AWS API
//! - Memory: in-process tags for tests and local runs

pub mod ec2;
pub mod memory;

pub use ec2::*;
pub use memory::*;
