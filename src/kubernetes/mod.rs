//! Kubernetes Adapters
//!
//! API client setup and the [`VolumeResolver`](crate::domain::ports::VolumeResolver)
//! implementations.

pub mod client;
pub mod resolver;

pub use client::*;
pub use resolver::*;
