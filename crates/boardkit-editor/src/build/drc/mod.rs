//! Design rule check.
//!
//! A quick run covers the copper checks that are cheap enough to run after
//! every edit; a full run rebuilds all planes on its snapshot first and adds
//! the remaining manufacturing and connectivity checks.

mod checks;
mod index;

pub use index::{CopperIndex, CopperObject, CopperSource};

use boardkit_core::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::planes::{compute_fragments, PlaneResult};
use super::{BuildError, BuildJob, JobContext};
use crate::model::{ApprovalKey, Document};
use checks::Checker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One finding of a rule check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheckMessage {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub description: String,
    pub locations: Vec<Point>,
    /// Stable identity used to approve the finding
    pub approval: ApprovalKey,
}

/// Result of one rule check run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrcReport {
    pub quick: bool,
    /// Sorted by approval key, keys unique
    pub messages: Vec<RuleCheckMessage>,
    /// Fragments a full run computed on its snapshot
    pub planes: Option<PlaneResult>,
}

impl DrcReport {
    pub fn keys(&self) -> BTreeSet<ApprovalKey> {
        self.messages.iter().map(|m| m.approval.clone()).collect()
    }
}

/// A rule check over a document snapshot
#[derive(Debug, Clone)]
pub struct DrcJob {
    snapshot: Document,
    quick: bool,
}

impl DrcJob {
    pub fn new(doc: &Document, quick: bool) -> Self {
        Self {
            snapshot: doc.clone(),
            quick,
        }
    }

    pub fn is_quick(&self) -> bool {
        self.quick
    }

    /// Runs all checks inline, reporting through `ctx`.
    pub fn execute(mut self, ctx: &JobContext) -> Result<DrcReport, BuildError> {
        ctx.progress(2);
        let planes = if self.quick {
            None
        } else {
            ctx.status("Rebuild planes...");
            let layers = self.snapshot.layers_with_planes();
            let result = compute_fragments(&self.snapshot, &layers, 2..=12, ctx)?;
            self.snapshot
                .apply_fragments(&result.layers, result.fragments.clone());
            Some(result)
        };

        let mut checker = Checker::new(&self.snapshot);
        for (check, progress_end) in checks::plan(self.quick) {
            ctx.check_canceled()?;
            ctx.status(format!("Check {}...", check.title()));
            checker.run(check);
            ctx.progress(progress_end);
        }
        let messages = checker.finish();

        ctx.status(format!("Finished with {} message(s)!", messages.len()));
        ctx.progress(100);
        tracing::info!(
            "{} rule check finished with {} message(s)",
            if self.quick { "Quick" } else { "Full" },
            messages.len()
        );
        Ok(DrcReport {
            quick: self.quick,
            messages,
            planes,
        })
    }
}

impl BuildJob for DrcJob {
    type Output = DrcReport;

    fn run(self, ctx: &JobContext) -> Result<DrcReport, BuildError> {
        self.execute(ctx)
    }
}
