//! rdiff-prune library: everything behind the `rdiff-prune` binary
//!
//! This crate provides:
//! - The per-run session and its phases
//! - The confirmed plan and its integrity gate
//! - Metadata installation and physical removal
//! - Configuration, review and the prune command itself

pub mod cmd;
pub mod commit;
pub mod config;
pub mod plan;
pub mod review;
pub mod session;
pub mod util;

// Re-exports
pub use cmd::prune::{PruneOptions, PruneSummary, RunOutcome};
pub use commit::{InstallJob, PlanCommitter, VerifiedPlan};
pub use config::PruneConfig;
pub use plan::RewritePlan;
pub use session::{Phase, Session};
