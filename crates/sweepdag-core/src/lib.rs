#![deny(missing_docs)]
#![doc = "Core error taxonomy, identifier registries and seed derivation for sweepdag."]

pub mod errors;
pub mod registry;
pub mod seed;

pub use errors::{ErrorInfo, SweepError};
pub use registry::{Case, Registry, KNOWN_DETECTORS, KNOWN_SAMPLERS};
pub use seed::derive_named_seed;
