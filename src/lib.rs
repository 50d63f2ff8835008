//! Read-only diagnostics for the Opagax training database.
//!
//! # Intention
//!
//! - Replace the ad-hoc inspection scripts with one set of named checks.
//! - Never write to the inspected database.
//!
//! # Architectural Boundaries
//!
//! - Only read-only SQLite access and report rendering belong here.
//! - Schema migrations and seeding live in the owning application.

pub mod checks;
pub mod config;
pub mod error;
pub mod report;
pub mod sqlite;

pub use checks::Check;
pub use config::InspectorConfig;
pub use error::{InspectError, Result};
pub use report::{CheckReport, Entry, OutputFormat, Section};
pub use sqlite::{Inspector, Value};
