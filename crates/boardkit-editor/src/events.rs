//! Events the editor publishes for the view layer.

use boardkit_core::{BusEvent, ItemId, StateId};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::build::{BuildOutcome, BuilderKind};
use crate::model::LayerId;
use crate::tools::{Capabilities, CursorShape, Preview, ToolKind, ToolParameters};

/// Changes of the document as seen from outside the undo log
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// Committed content changed
    Modified { state_id: StateId },
    NetsChanged,
    LayersChanged,
    /// New plane fragments were applied for these layers
    FragmentsUpdated { layers: BTreeSet<LayerId> },
    ApprovalsChanged,
}

/// Notifications of the background builders
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    Started {
        builder: BuilderKind,
        generation: u64,
    },
    Progress {
        builder: BuilderKind,
        percent: u8,
    },
    Status {
        builder: BuilderKind,
        text: String,
    },
    Finished {
        builder: BuilderKind,
        generation: u64,
        outcome: BuildOutcome,
    },
}

/// Everything published on the editor bus
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ToolChanged {
        tool: ToolKind,
        capabilities: Capabilities,
        parameters: ToolParameters,
    },
    ParametersChanged(ToolParameters),
    PreviewChanged(Preview),
    OverlayText(Option<String>),
    Cursor(CursorShape),
    StatusMessage {
        text: String,
        /// Clear after this long; `None` keeps the message
        timeout: Option<Duration>,
    },
    PropertiesRequested {
        item: ItemId,
    },
    SelectionChanged(Vec<ItemId>),
    Document(DocumentEvent),
    Build(BuildEvent),
}

/// Coarse event classes for subscription filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCategory {
    Tool,
    View,
    Document,
    Nets,
    Layers,
    Build,
}

impl BusEvent for EditorEvent {
    type Category = EditorCategory;

    fn category(&self) -> EditorCategory {
        match self {
            EditorEvent::ToolChanged { .. } | EditorEvent::ParametersChanged(_) => {
                EditorCategory::Tool
            }
            EditorEvent::PreviewChanged(_)
            | EditorEvent::OverlayText(_)
            | EditorEvent::Cursor(_)
            | EditorEvent::StatusMessage { .. }
            | EditorEvent::PropertiesRequested { .. }
            | EditorEvent::SelectionChanged(_) => EditorCategory::View,
            EditorEvent::Document(DocumentEvent::NetsChanged) => EditorCategory::Nets,
            EditorEvent::Document(DocumentEvent::LayersChanged) => EditorCategory::Layers,
            EditorEvent::Document(_) => EditorCategory::Document,
            EditorEvent::Build(_) => EditorCategory::Build,
        }
    }
}
