//! Deterministic climate-impact narratives.
//!
//! A record holding a current and a projected climate snapshot flows one way
//! through the pipeline: normalization, deltas, severity tiers and evidence
//! gating, section composition, then validation. The same record always
//! yields the same report.

pub mod config;
pub mod deltas;
pub mod error;
pub mod evidence;
pub mod metrics;
pub mod narrative;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod severity;

pub use error::{DataValidationError, NarrativeError};
pub use pipeline::NarrativeEngine;
pub use report::NarrativeReport;
