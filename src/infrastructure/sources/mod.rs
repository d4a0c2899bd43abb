//! In-crate implementations of the acquisition port.
//!
//! Real upstream adapters live outside this crate; these cover local runs
//! and endpoint fallback.

pub mod fallback;
pub mod simulated;

pub use fallback::FallbackSource;
pub use simulated::SimulatedSource;
