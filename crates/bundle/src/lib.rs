//! Bundle generation: changegroup encoding and the versioned container
//!
//! This crate provides:
//! - `CapabilitySet`: strongly-typed part-kind/sub-format declarations
//! - Changegroup (`01`/`02`) chunk encoding
//! - The `HG20` bundle container with framed parts
//! - `BundleWriter`: atomic, all-or-nothing output
//! - `encode` / `create_bundle`: the whole-pipeline entry points

pub mod bundle2;
pub mod caps;
pub mod changegroup;
pub mod encode;
pub mod error;
pub mod writer;

// Re-exports
pub use bundle2::{Bundle, BundlePart, BundleVersion};
pub use caps::{CapabilitySet, CgVersion, PartKind};
pub use encode::{create_bundle, encode, BundleOutcome};
pub use error::BundleError;
pub use writer::BundleWriter;
