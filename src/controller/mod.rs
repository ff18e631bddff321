//! Claim Controller Module
//!
//! The watch loop and the per-claim correlation context.

pub mod claims;
pub mod context;

pub use claims::*;
pub use context::*;
