//! Background computations: plane fragments and design rule checks.
//!
//! Jobs run on a worker thread against a snapshot of the document taken
//! when they start. The main sequence only sees their results through
//! [`BackgroundBuilder::poll`], so the document itself is never shared.

mod builder;
pub mod drc;
pub mod planes;

pub use builder::{BackgroundBuilder, BuildJob, BuilderEvent, JobContext};
pub use drc::{DrcJob, DrcReport, RuleCheckMessage, Severity};
pub use planes::{PlaneJob, PlaneResult};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two background builders of an editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderKind {
    Planes,
    Drc,
}

impl BuilderKind {
    pub fn name(self) -> &'static str {
        match self {
            BuilderKind::Planes => "planes",
            BuilderKind::Drc => "drc",
        }
    }
}

impl std::fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors a job run can end with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Canceled")]
    Canceled,

    #[error("{0}")]
    Failed(String),

    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// How a run ended, as published on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Completed,
    Failed(String),
    Canceled,
}

impl<T> From<&Result<T, BuildError>> for BuildOutcome {
    fn from(result: &Result<T, BuildError>) -> Self {
        match result {
            Ok(_) => BuildOutcome::Completed,
            Err(BuildError::Canceled) => BuildOutcome::Canceled,
            Err(e) => BuildOutcome::Failed(e.to_string()),
        }
    }
}
