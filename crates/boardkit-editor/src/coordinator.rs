//! The editor facade a view layer talks to.
//!
//! The coordinator owns the document, the undo log, the tool state machine
//! and both background builders. Callers forward input events, call
//! [`EditorCoordinator::tick`] periodically and read plain data snapshots;
//! everything else is published on the event bus.

use boardkit_core::{EventBus, ItemId, Point, StateId};
use boardkit_settings::Config;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::approvals::{ApprovalTracker, DocumentStore};
use crate::build::{
    BackgroundBuilder, BuildError, BuildOutcome, BuilderEvent, BuilderKind, DrcJob, DrcReport,
    PlaneJob, PlaneResult, RuleCheckMessage,
};
use crate::error::EditorResult;
use crate::events::{BuildEvent, DocumentEvent, EditorEvent};
use crate::fsm::ToolFsm;
use crate::model::{ApprovalKey, DeviceTemplate, Document, LayerId};
use crate::scheduler::{ObserverId, RebuildScheduler};
use crate::session::Session;
use crate::tools::{
    Capabilities, Key, Modifiers, RequestOutcome, Tool, ToolContext, ToolKind, ToolParameters,
    ToolRequest, ToolSetting,
};
use crate::undo::{BoardCommand, UndoLog};

/// Freshness of the last rule check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCheckStatus {
    NotRunYet,
    Running,
    /// The result was computed for the current content
    UpToDate,
    /// The content changed after the result was computed
    Outdated,
}

/// A rule check finding together with its approval
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCheckEntry {
    pub message: RuleCheckMessage,
    pub approved: bool,
}

/// Everything a view needs to render the editor chrome
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub tool: ToolKind,
    pub capabilities: Capabilities,
    pub parameters: ToolParameters,
    pub state_id: StateId,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_text: Option<String>,
    pub redo_text: Option<String>,
    pub can_save: bool,
    pub rule_check_status: RuleCheckStatus,
    pub message_count: usize,
    pub unapproved_count: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub drc_error: Option<String>,
    pub planes_busy: bool,
    pub drc_busy: bool,
    pub overlay_text: Option<String>,
}

/// Accepted rule check run
#[derive(Debug, Clone)]
struct DrcRecord {
    report: DrcReport,
    state_id: StateId,
    generation: u64,
    status: Vec<String>,
    finished_at: DateTime<Utc>,
}

pub struct EditorCoordinator {
    document: Document,
    undo: UndoLog,
    session: Session,
    fsm: ToolFsm,
    config: Arc<Config>,
    bus: Arc<EventBus<EditorEvent>>,
    pixels_per_mm: f64,
    /// State id the last change notifications were sent for
    notified_state: StateId,

    planes: BackgroundBuilder<PlaneJob>,
    plane_scheduler: RebuildScheduler,
    /// Generation and layers of the running plane job
    plane_run: Option<(u64, BTreeSet<LayerId>)>,
    plane_status: Vec<String>,

    drc: BackgroundBuilder<DrcJob>,
    drc_scheduler: RebuildScheduler,
    drc_status: Vec<String>,
    drc_result: Option<DrcRecord>,
    drc_error: Option<String>,

    approvals: ApprovalTracker,
    store: Option<Box<dyn DocumentStore>>,
}

impl EditorCoordinator {
    pub fn new(document: Document, config: Arc<Config>, bus: Arc<EventBus<EditorEvent>>) -> Self {
        let now = Instant::now();
        let mut coordinator = Self {
            document,
            undo: UndoLog::new(config.tools.undo_limit),
            session: Session::new(),
            fsm: ToolFsm::new(&config),
            pixels_per_mm: 10.0,
            notified_state: StateId::default(),
            planes: BackgroundBuilder::new(BuilderKind::Planes),
            plane_scheduler: RebuildScheduler::new(&config.scheduler),
            plane_run: None,
            plane_status: Vec::new(),
            drc: BackgroundBuilder::new(BuilderKind::Drc),
            drc_scheduler: RebuildScheduler::new(&config.scheduler),
            drc_status: Vec::new(),
            drc_result: None,
            drc_error: None,
            approvals: ApprovalTracker::new(),
            store: None,
            config,
            bus,
        };
        let state_id = coordinator.undo.state_id();
        coordinator.plane_scheduler.note_state(now, state_id, false);
        coordinator.drc_scheduler.note_state(now, state_id, false);
        coordinator.with_tool(|fsm, ctx| fsm.start(ctx));
        tracing::info!("Editor opened for '{}'", coordinator.document.name);
        coordinator
    }

    /// Persists approval changes through `store` from now on.
    pub fn set_store(&mut self, store: Box<dyn DocumentStore>) {
        self.store = Some(store);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus<EditorEvent>> {
        &self.bus
    }

    pub fn current_tool(&self) -> ToolKind {
        self.fsm.current()
    }

    pub fn set_pixels_per_mm(&mut self, pixels_per_mm: f64) {
        if pixels_per_mm.is_finite() && pixels_per_mm > 0.0 {
            self.pixels_per_mm = pixels_per_mm;
        }
    }

    fn publish(&self, event: EditorEvent) {
        let _ = self.bus.publish(event);
    }

    fn status(&self, text: impl Into<String>) {
        self.publish(EditorEvent::StatusMessage {
            text: text.into(),
            timeout: Some(Duration::from_millis(self.config.view.status_timeout_ms)),
        });
    }

    /// Runs `f` with a tool context, then sends change notifications.
    fn with_tool<R>(&mut self, f: impl FnOnce(&mut ToolFsm, &mut ToolContext<'_>) -> R) -> R {
        let mut ctx = ToolContext {
            document: &mut self.document,
            undo: &mut self.undo,
            session: &mut self.session,
            config: &self.config,
            bus: &self.bus,
            pixels_per_mm: self.pixels_per_mm,
            modifiers: self.fsm.modifiers(),
        };
        let result = f(&mut self.fsm, &mut ctx);
        self.after_change(Instant::now());
        result
    }

    fn after_change(&mut self, now: Instant) {
        let state_id = self.undo.state_id();
        let group_active = self.undo.is_group_active();
        self.plane_scheduler.note_state(now, state_id, group_active);
        self.drc_scheduler.note_state(now, state_id, group_active);

        if state_id != self.notified_state {
            self.notified_state = state_id;
            if self.session.retain_existing(&self.document) {
                self.publish(EditorEvent::SelectionChanged(self.session.selected_ids()));
            }
            self.publish(EditorEvent::Document(DocumentEvent::Modified { state_id }));
        }
        let changes = self.undo.take_changes();
        if changes.nets {
            self.publish(EditorEvent::Document(DocumentEvent::NetsChanged));
        }
        if changes.layers {
            self.publish(EditorEvent::Document(DocumentEvent::LayersChanged));
        }
        if changes.nets || changes.layers {
            let mut ctx = ToolContext {
                document: &mut self.document,
                undo: &mut self.undo,
                session: &mut self.session,
                config: &self.config,
                bus: &self.bus,
                pixels_per_mm: self.pixels_per_mm,
                modifiers: self.fsm.modifiers(),
            };
            self.fsm.refresh_availability(&mut ctx);
        }
    }

    // ---- tools ----

    pub fn activate_tool(&mut self, kind: ToolKind) -> bool {
        self.with_tool(|fsm, ctx| fsm.activate(kind, ctx))
    }

    pub fn start_add_device(&mut self, template: DeviceTemplate) -> bool {
        self.with_tool(|fsm, ctx| fsm.start_add_device(template, ctx))
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.fsm.set_modifiers(modifiers);
    }

    pub fn pointer_down(&mut self, pos: Point) -> bool {
        self.with_tool(|fsm, ctx| fsm.pointer_down(pos, ctx))
    }

    pub fn pointer_move(&mut self, pos: Point) -> bool {
        self.with_tool(|fsm, ctx| fsm.pointer_move(pos, ctx))
    }

    pub fn pointer_up(&mut self, pos: Point) -> bool {
        self.with_tool(|fsm, ctx| fsm.pointer_up(pos, ctx))
    }

    pub fn double_click(&mut self, pos: Point) -> bool {
        self.with_tool(|fsm, ctx| fsm.double_click(pos, ctx))
    }

    pub fn right_up(&mut self, pos: Point) -> bool {
        self.with_tool(|fsm, ctx| fsm.right_up(pos, ctx))
    }

    pub fn key_pressed(&mut self, key: Key) -> bool {
        self.with_tool(|fsm, ctx| fsm.key_pressed(key, ctx))
    }

    pub fn key_released(&mut self, key: Key) -> bool {
        self.with_tool(|fsm, ctx| fsm.key_released(key, ctx))
    }

    pub fn abort(&mut self) -> bool {
        self.with_tool(|fsm, ctx| fsm.abort(ctx))
    }

    pub fn request(&mut self, request: &ToolRequest) -> RequestOutcome {
        self.with_tool(|fsm, ctx| fsm.request(request, ctx))
    }

    pub fn configure(&mut self, setting: ToolSetting) -> EditorResult<bool> {
        let result = self.with_tool(|fsm, ctx| fsm.configure(setting, ctx));
        if let Err(e) = &result {
            tracing::warn!("Rejected tool setting: {}", e);
        }
        result
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        if self.session.select(ids, false) {
            self.publish(EditorEvent::SelectionChanged(self.session.selected_ids()));
        }
    }

    // ---- undo log ----

    pub fn undo(&mut self) -> EditorResult<()> {
        self.with_tool(|fsm, ctx| {
            fsm.cancel_operation(ctx);
            ctx.undo.undo(ctx.document)
        })
    }

    pub fn redo(&mut self) -> EditorResult<()> {
        self.with_tool(|fsm, ctx| {
            fsm.cancel_operation(ctx);
            ctx.undo.redo(ctx.document)
        })
    }

    /// Executes an edit that does not come from a tool, e.g. net list changes.
    ///
    /// An operation in progress in the active tool is canceled first.
    pub fn execute(&mut self, cmd: BoardCommand) -> EditorResult<bool> {
        self.with_tool(|fsm, ctx| {
            fsm.cancel_operation(ctx);
            ctx.undo.execute(cmd, ctx.document)
        })
    }

    /// Writes the document and marks the current content as saved.
    pub fn save_json(&mut self, path: &Path) -> EditorResult<()> {
        self.document.save_json(path)?;
        self.undo.set_clean();
        self.document.mark_approvals_saved();
        Ok(())
    }

    // ---- background work ----

    /// Applies finished builds, then starts whatever the schedulers ask for.
    pub fn tick(&mut self, now: Instant) {
        for event in self.planes.poll() {
            self.on_plane_event(event, now);
        }
        for event in self.drc.poll() {
            self.on_drc_event(event, now);
        }
        self.poll_schedulers(now);
    }

    fn poll_schedulers(&mut self, now: Instant) {
        if let Some(request) = self.plane_scheduler.poll(now, self.planes.is_busy()) {
            self.start_planes(request.layers.as_ref(), request.full);
        }
        if self.config.scheduler.auto_quick_check {
            // Automatic checks are always quick, including the first one.
            if self.drc_scheduler.poll(now, self.drc.is_busy()).is_some() {
                tracing::debug!("Automatic quick rule check");
                self.start_drc(true);
            }
        }
    }

    fn start_planes(&mut self, restriction: Option<&BTreeSet<LayerId>>, full: bool) -> bool {
        let Some(job) = PlaneJob::create(&mut self.document, restriction, full) else {
            tracing::debug!("No planes to rebuild");
            return false;
        };
        let layers = job.layers().clone();
        if self.planes.start(job, self.undo.state_id()) {
            tracing::info!("Rebuilding planes on {} layer(s)", layers.len());
            self.plane_run = Some((self.planes.generation(), layers));
            true
        } else {
            tracing::warn!("Plane rebuild could not be started");
            self.document.schedule_plane_layers(layers);
            false
        }
    }

    fn start_drc(&mut self, quick: bool) -> bool {
        let job = DrcJob::new(&self.document, quick);
        let started = self.drc.start(job, self.undo.state_id());
        if started {
            tracing::info!("Starting {} rule check", if quick { "quick" } else { "full" });
        } else {
            tracing::warn!("Rule check could not be started");
        }
        started
    }

    fn on_plane_event(&mut self, event: BuilderEvent<PlaneResult>, now: Instant) {
        let builder = BuilderKind::Planes;
        match event {
            BuilderEvent::Started { generation } => {
                self.plane_status.clear();
                self.publish(EditorEvent::Build(BuildEvent::Started { builder, generation }));
            }
            BuilderEvent::Progress { percent, .. } => {
                self.publish(EditorEvent::Build(BuildEvent::Progress { builder, percent }));
            }
            BuilderEvent::Status { text, .. } => {
                self.plane_status.push(text.clone());
                self.publish(EditorEvent::Build(BuildEvent::Status { builder, text }));
            }
            BuilderEvent::Finished {
                generation,
                state_id,
                result,
            } => {
                self.plane_scheduler.mark_completed(now);
                let outcome = BuildOutcome::from(&result);
                let run_layers = match &self.plane_run {
                    Some((g, layers)) if *g == generation => {
                        let layers = layers.clone();
                        self.plane_run = None;
                        layers
                    }
                    _ => BTreeSet::new(),
                };
                match result {
                    Ok(planes) if state_id == self.undo.state_id() => {
                        tracing::info!("Applying {} plane fragment(s)", planes.fragment_count());
                        self.document.apply_fragments(&planes.layers, planes.fragments);
                        self.publish(EditorEvent::Document(DocumentEvent::FragmentsUpdated {
                            layers: planes.layers,
                        }));
                    }
                    Ok(planes) => {
                        tracing::debug!("Dropping plane result of outdated state {}", state_id);
                        self.document.schedule_plane_layers(planes.layers);
                    }
                    Err(e) => {
                        if e != BuildError::Canceled {
                            tracing::error!("Plane rebuild failed: {}", e);
                            self.status(format!("Plane rebuild failed: {}", e));
                        }
                        self.document.schedule_plane_layers(run_layers);
                    }
                }
                self.publish(EditorEvent::Build(BuildEvent::Finished {
                    builder,
                    generation,
                    outcome,
                }));
            }
        }
    }

    fn on_drc_event(&mut self, event: BuilderEvent<DrcReport>, now: Instant) {
        let builder = BuilderKind::Drc;
        match event {
            BuilderEvent::Started { generation } => {
                self.drc_status.clear();
                self.publish(EditorEvent::Build(BuildEvent::Started { builder, generation }));
            }
            BuilderEvent::Progress { percent, .. } => {
                self.publish(EditorEvent::Build(BuildEvent::Progress { builder, percent }));
            }
            BuilderEvent::Status { text, .. } => {
                self.drc_status.push(text.clone());
                self.publish(EditorEvent::Build(BuildEvent::Status { builder, text }));
            }
            BuilderEvent::Finished {
                generation,
                state_id,
                result,
            } => {
                self.drc_scheduler.mark_completed(now);
                let outcome = BuildOutcome::from(&result);
                if generation != self.drc.generation() {
                    tracing::debug!("Dropping rule check result of generation {}", generation);
                } else {
                    match result {
                        Ok(report) => self.accept_drc(report, state_id, generation),
                        Err(BuildError::Canceled) => {}
                        Err(e) => {
                            tracing::error!("Rule check failed: {}", e);
                            self.status(format!("Design rule check failed: {}", e));
                            self.drc_error = Some(e.to_string());
                        }
                    }
                }
                self.publish(EditorEvent::Build(BuildEvent::Finished {
                    builder,
                    generation,
                    outcome,
                }));
            }
        }
    }

    fn accept_drc(&mut self, mut report: DrcReport, state_id: StateId, generation: u64) {
        let current = state_id == self.undo.state_id();
        if let Some(planes) = report.planes.take().filter(|_| current) {
            self.document.apply_fragments(&planes.layers, planes.fragments);
            self.publish(EditorEvent::Document(DocumentEvent::FragmentsUpdated {
                layers: planes.layers,
            }));
        }
        if self.approvals.apply(&mut self.document, &report.keys(), report.quick) {
            self.publish(EditorEvent::Document(DocumentEvent::ApprovalsChanged));
            self.persist_approvals();
        }
        let unapproved = report
            .messages
            .iter()
            .filter(|m| !self.document.is_approved(&m.approval))
            .count();
        self.status(format!(
            "Finished with {} message(s), {} not approved",
            report.messages.len(),
            unapproved
        ));
        self.drc_error = None;
        self.drc_result = Some(DrcRecord {
            report,
            state_id,
            generation,
            status: std::mem::take(&mut self.drc_status),
            finished_at: Utc::now(),
        });
    }

    /// Forces a full plane rebuild, canceling a running one.
    pub fn rebuild_planes(&mut self) {
        if self.planes.is_busy() {
            if let Some((_, layers)) = self.plane_run.take() {
                self.document.schedule_plane_layers(layers);
            }
            self.planes.cancel();
        }
        self.plane_scheduler.request_forced();
        self.poll_schedulers(Instant::now());
    }

    /// Starts a rule check now, canceling a running one.
    pub fn run_drc(&mut self, quick: bool) -> bool {
        if self.drc.is_busy() {
            self.drc.cancel();
        }
        self.start_drc(quick)
    }

    pub fn planes_busy(&self) -> bool {
        self.planes.is_busy()
    }

    pub fn drc_busy(&self) -> bool {
        self.drc.is_busy()
    }

    /// Ticks until both builders are idle or `timeout` elapsed.
    pub fn wait_for_builds(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.tick(Instant::now());
            if !self.planes.is_busy() && !self.drc.is_busy() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("Timed out waiting for background builds");
                return false;
            }
            if self.planes.is_busy() {
                self.planes.wait_for_finished(remaining);
            } else {
                self.drc.wait_for_finished(remaining);
            }
        }
    }

    pub fn add_plane_observer(&mut self, layers: BTreeSet<LayerId>) -> ObserverId {
        self.plane_scheduler.add_observer(layers)
    }

    pub fn update_plane_observer(&mut self, id: ObserverId, layers: BTreeSet<LayerId>) -> bool {
        self.plane_scheduler.update_observer(id, layers)
    }

    pub fn remove_plane_observer(&mut self, id: ObserverId) -> bool {
        self.plane_scheduler.remove_observer(id)
    }

    pub fn add_drc_observer(&mut self) -> ObserverId {
        self.drc_scheduler.add_observer(BTreeSet::new())
    }

    pub fn remove_drc_observer(&mut self, id: ObserverId) -> bool {
        self.drc_scheduler.remove_observer(id)
    }

    // ---- rule check results ----

    /// Approves or unapproves a finding. Does not touch the undo log.
    pub fn set_approved(&mut self, key: ApprovalKey, approved: bool) -> bool {
        if !self.document.set_approved(key, approved) {
            return false;
        }
        self.publish(EditorEvent::Document(DocumentEvent::ApprovalsChanged));
        self.persist_approvals();
        true
    }

    fn persist_approvals(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        match store.save_approvals(&self.document) {
            Ok(()) => self.document.mark_approvals_saved(),
            Err(e) => {
                tracing::warn!("Failed to save approvals: {}", e);
                self.status(format!("Failed to save approvals: {}", e));
            }
        }
    }

    pub fn rule_check_status(&self) -> RuleCheckStatus {
        if self.drc.is_busy() {
            return RuleCheckStatus::Running;
        }
        match &self.drc_result {
            None => RuleCheckStatus::NotRunYet,
            Some(record) if record.state_id == self.undo.state_id() => RuleCheckStatus::UpToDate,
            Some(_) => RuleCheckStatus::Outdated,
        }
    }

    pub fn drc_messages(&self) -> Vec<RuleCheckEntry> {
        self.drc_result
            .iter()
            .flat_map(|r| r.report.messages.iter())
            .map(|message| RuleCheckEntry {
                approved: self.document.is_approved(&message.approval),
                message: message.clone(),
            })
            .collect()
    }

    pub fn drc_report(&self) -> Option<&DrcReport> {
        self.drc_result.as_ref().map(|r| &r.report)
    }

    /// State id the last accepted rule check ran on.
    pub fn drc_state_id(&self) -> Option<StateId> {
        self.drc_result.as_ref().map(|r| r.state_id)
    }

    pub fn drc_generation(&self) -> Option<u64> {
        self.drc_result.as_ref().map(|r| r.generation)
    }

    /// Status lines of the last accepted rule check.
    pub fn drc_status_history(&self) -> &[String] {
        self.drc_result.as_ref().map(|r| r.status.as_slice()).unwrap_or(&[])
    }

    pub fn plane_status_history(&self) -> &[String] {
        &self.plane_status
    }

    pub fn drc_error(&self) -> Option<&str> {
        self.drc_error.as_deref()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        let tool = self.fsm.current();
        let entries = self.drc_messages();
        EditorSnapshot {
            tool,
            capabilities: tool.capabilities(),
            parameters: self.fsm.tool().parameters(),
            state_id: self.undo.state_id(),
            can_undo: self.undo.can_undo(),
            can_redo: self.undo.can_redo(),
            undo_text: self.undo.undo_text().map(str::to_string),
            redo_text: self.undo.redo_text().map(str::to_string),
            can_save: !self.undo.is_clean() || self.document.approvals_dirty(),
            rule_check_status: self.rule_check_status(),
            message_count: entries.len(),
            unapproved_count: entries.iter().filter(|e| !e.approved).count(),
            last_check: self.drc_result.as_ref().map(|r| r.finished_at),
            drc_error: self.drc_error.clone(),
            planes_busy: self.planes.is_busy(),
            drc_busy: self.drc.is_busy(),
            overlay_text: self.fsm.tool().overlay_text(),
        }
    }
}

impl std::fmt::Debug for EditorCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorCoordinator")
            .field("document", &self.document.name)
            .field("tool", &self.fsm.current())
            .field("state_id", &self.undo.state_id())
            .field("planes_busy", &self.planes.is_busy())
            .field("drc_busy", &self.drc.is_busy())
            .finish()
    }
}
