//! # BoardKit Editor
//!
//! The interactive side of a board editor: the tool state machine, the
//! undo log, background builders for plane fragments and design rule
//! checks, and the scheduler that decides when those builders run.
//!
//! [`EditorCoordinator`] ties everything together and is the entry point
//! for a view layer.

pub mod approvals;
pub mod build;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fsm;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod tools;
pub mod undo;

pub use approvals::{ApprovalTracker, DocumentStore, JsonFileStore, MemoryStore};
pub use build::{
    BackgroundBuilder, BuildError, BuildJob, BuildOutcome, BuilderEvent, BuilderKind, DrcJob,
    DrcReport, JobContext, PlaneJob, PlaneResult, RuleCheckMessage, Severity,
};
pub use coordinator::{EditorCoordinator, EditorSnapshot, RuleCheckEntry, RuleCheckStatus};
pub use error::{EditorError, EditorResult};
pub use events::{BuildEvent, DocumentEvent, EditorCategory, EditorEvent};
pub use fsm::ToolFsm;
pub use model::{ApprovalKey, BoardItem, Document, ItemData, LayerId};
pub use scheduler::{ObserverId, RebuildRequest, RebuildScheduler};
pub use session::Session;
pub use tools::{
    Capabilities, Key, Modifiers, RequestOutcome, ToolKind, ToolParameters, ToolRequest,
    ToolSetting,
};
pub use undo::{BoardCommand, UndoLog};
