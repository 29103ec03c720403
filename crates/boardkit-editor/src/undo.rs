//! Command based undo log.
//!
//! Every change to committed document content goes through a [`BoardCommand`]
//! recorded here. The log hands out a [`StateId`] that advances exactly when
//! committed content changes, which is what the rebuild scheduler and the
//! rule check status compare against.
//!
//! Multi-step edits (e.g. a wire being routed) open a command group; the
//! commands appended to it are applied immediately and become one undo step
//! when the group is committed.

use boardkit_core::{ItemId, NetId, Point, StateId};
use std::collections::{HashSet, VecDeque};

use crate::error::{EditorError, EditorResult};
use crate::model::{BoardItem, Document, LayerId, Net};

/// A reversible document mutation
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCommand {
    AddItems(Vec<BoardItem>),
    RemoveItems(Vec<BoardItem>),
    /// Pairs of (old, new) item versions
    UpdateItems(Vec<(BoardItem, BoardItem)>),
    MoveItems { ids: Vec<ItemId>, delta: Point },
    SetLocked { ids: Vec<ItemId>, locked: bool, previous: Vec<bool> },
    AddNet(Net),
    RemoveNet(Net),
    RenameNet { id: NetId, old: String, new: String },
    SetLayerEnabled { layer: LayerId, enabled: bool },
}

impl BoardCommand {
    /// Removes the current versions of `ids` from the document.
    pub fn remove_ids(doc: &Document, ids: &[ItemId]) -> EditorResult<BoardCommand> {
        let items = ids
            .iter()
            .map(|id| doc.item(*id).cloned().ok_or(EditorError::UnknownItem(*id)))
            .collect::<EditorResult<Vec<_>>>()?;
        Ok(BoardCommand::RemoveItems(items))
    }

    /// Lock flag change capturing the previous flags.
    pub fn set_locked(doc: &Document, ids: &[ItemId], locked: bool) -> EditorResult<BoardCommand> {
        let previous = ids
            .iter()
            .map(|id| doc.item(*id).map(|i| i.locked).ok_or(EditorError::UnknownItem(*id)))
            .collect::<EditorResult<Vec<_>>>()?;
        Ok(BoardCommand::SetLocked {
            ids: ids.to_vec(),
            locked,
            previous,
        })
    }

    pub fn description(&self) -> String {
        match self {
            BoardCommand::AddItems(items) => match items.as_slice() {
                [one] => format!("Add {}", one.kind_name()),
                _ => format!("Add {} items", items.len()),
            },
            BoardCommand::RemoveItems(items) => format!("Remove {} item(s)", items.len()),
            BoardCommand::UpdateItems(_) => "Modify items".to_string(),
            BoardCommand::MoveItems { ids, .. } => format!("Move {} item(s)", ids.len()),
            BoardCommand::SetLocked { locked: true, .. } => "Lock items".to_string(),
            BoardCommand::SetLocked { .. } => "Unlock items".to_string(),
            BoardCommand::AddNet(net) => format!("Add net {}", net.name),
            BoardCommand::RemoveNet(net) => format!("Remove net {}", net.name),
            BoardCommand::RenameNet { new, .. } => format!("Rename net to {}", new),
            BoardCommand::SetLayerEnabled { layer, enabled: true } => format!("Enable {}", layer),
            BoardCommand::SetLayerEnabled { layer, .. } => format!("Disable {}", layer),
        }
    }

    /// True if applying this command would leave the document unchanged.
    pub fn is_noop(&self, doc: &Document) -> bool {
        match self {
            BoardCommand::AddItems(items) | BoardCommand::RemoveItems(items) => items.is_empty(),
            BoardCommand::UpdateItems(pairs) => pairs.iter().all(|(old, new)| old == new),
            BoardCommand::MoveItems { ids, delta } => {
                ids.is_empty() || (delta.x == 0.0 && delta.y == 0.0)
            }
            BoardCommand::SetLocked { locked, previous, .. } => {
                previous.iter().all(|p| p == locked)
            }
            BoardCommand::RenameNet { old, new, .. } => old == new,
            BoardCommand::SetLayerEnabled { layer, enabled } => {
                doc.layer(*layer).map_or(true, |l| l.enabled == *enabled)
            }
            BoardCommand::AddNet(_) | BoardCommand::RemoveNet(_) => false,
        }
    }

    /// Checks that every target of the command exists, in the direction
    /// given by `forward`. Nothing is changed on failure.
    fn check(&self, doc: &Document, forward: bool) -> EditorResult<()> {
        match (self, forward) {
            (BoardCommand::AddItems(_), true) | (BoardCommand::RemoveItems(_), false) => Ok(()),
            (BoardCommand::AddItems(items), false) | (BoardCommand::RemoveItems(items), true) => {
                ensure_items(doc, items.iter().map(|i| i.id))
            }
            (BoardCommand::UpdateItems(pairs), true) => ensure_items(doc, pairs.iter().map(|(_, n)| n.id)),
            (BoardCommand::UpdateItems(pairs), false) => ensure_items(doc, pairs.iter().map(|(o, _)| o.id)),
            (BoardCommand::MoveItems { ids, .. }, _) | (BoardCommand::SetLocked { ids, .. }, _) => {
                ensure_items(doc, ids.iter().copied())
            }
            (BoardCommand::AddNet(_), true) | (BoardCommand::RemoveNet(_), false) => Ok(()),
            (BoardCommand::AddNet(net), false) | (BoardCommand::RemoveNet(net), true) => {
                ensure_net(doc, net.id)
            }
            (BoardCommand::RenameNet { id, .. }, _) => ensure_net(doc, *id),
            (BoardCommand::SetLayerEnabled { layer, .. }, _) => match doc.layer(*layer) {
                Some(_) => Ok(()),
                None => Err(EditorError::InvalidLayer(*layer)),
            },
        }
    }

    /// Applies the command. Either every target changes or none does.
    pub fn apply(&mut self, doc: &mut Document) -> EditorResult<()> {
        self.check(doc, true)?;
        match self {
            BoardCommand::AddItems(items) => {
                for item in items.iter() {
                    doc.insert_item(item.clone());
                }
            }
            BoardCommand::RemoveItems(items) => {
                for item in items.iter() {
                    doc.remove_item(item.id).ok_or(EditorError::UnknownItem(item.id))?;
                }
            }
            BoardCommand::UpdateItems(pairs) => {
                for (_, new) in pairs.iter() {
                    doc.replace_item(new.clone())
                        .ok_or(EditorError::UnknownItem(new.id))?;
                }
            }
            BoardCommand::MoveItems { ids, delta } => move_items(doc, ids, *delta)?,
            BoardCommand::SetLocked { ids, locked, .. } => {
                for id in ids.iter() {
                    set_item_locked(doc, *id, *locked)?;
                }
            }
            BoardCommand::AddNet(net) => doc.insert_net(net.clone()),
            BoardCommand::RemoveNet(net) => {
                doc.remove_net(net.id).ok_or(EditorError::UnknownNet(net.id))?;
            }
            BoardCommand::RenameNet { id, new, .. } => {
                doc.net_mut(*id).ok_or(EditorError::UnknownNet(*id))?.name = new.clone();
            }
            BoardCommand::SetLayerEnabled { layer, enabled } => {
                doc.set_layer_enabled(*layer, *enabled)
                    .ok_or(EditorError::InvalidLayer(*layer))?;
            }
        }
        Ok(())
    }

    pub fn revert(&mut self, doc: &mut Document) -> EditorResult<()> {
        self.check(doc, false)?;
        match self {
            BoardCommand::AddItems(items) => {
                for item in items.iter().rev() {
                    doc.remove_item(item.id).ok_or(EditorError::UnknownItem(item.id))?;
                }
            }
            BoardCommand::RemoveItems(items) => {
                for item in items.iter().rev() {
                    doc.insert_item(item.clone());
                }
            }
            BoardCommand::UpdateItems(pairs) => {
                for (old, _) in pairs.iter().rev() {
                    doc.replace_item(old.clone())
                        .ok_or(EditorError::UnknownItem(old.id))?;
                }
            }
            BoardCommand::MoveItems { ids, delta } => move_items(doc, ids, -*delta)?,
            BoardCommand::SetLocked { ids, previous, .. } => {
                for (id, locked) in ids.iter().zip(previous.iter()) {
                    set_item_locked(doc, *id, *locked)?;
                }
            }
            BoardCommand::AddNet(net) => {
                doc.remove_net(net.id).ok_or(EditorError::UnknownNet(net.id))?;
            }
            BoardCommand::RemoveNet(net) => doc.insert_net(net.clone()),
            BoardCommand::RenameNet { id, old, .. } => {
                doc.net_mut(*id).ok_or(EditorError::UnknownNet(*id))?.name = old.clone();
            }
            BoardCommand::SetLayerEnabled { layer, enabled } => {
                doc.set_layer_enabled(*layer, !*enabled)
                    .ok_or(EditorError::InvalidLayer(*layer))?;
            }
        }
        Ok(())
    }

    /// Whether the command touches the net list.
    pub fn changes_nets(&self) -> bool {
        matches!(
            self,
            BoardCommand::AddNet(_) | BoardCommand::RemoveNet(_) | BoardCommand::RenameNet { .. }
        )
    }

    /// Whether the command touches the layer stack.
    pub fn changes_layers(&self) -> bool {
        matches!(self, BoardCommand::SetLayerEnabled { .. })
    }
}

/// Every id must exist and appear once.
fn ensure_items(doc: &Document, ids: impl Iterator<Item = ItemId>) -> EditorResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !doc.contains(id) || !seen.insert(id) {
            return Err(EditorError::UnknownItem(id));
        }
    }
    Ok(())
}

fn ensure_net(doc: &Document, id: NetId) -> EditorResult<()> {
    doc.net(id).map(|_| ()).ok_or(EditorError::UnknownNet(id))
}

/// Applies `commands` in order. On failure the ones already applied are
/// reverted again.
fn apply_all(commands: &mut [BoardCommand], doc: &mut Document) -> EditorResult<()> {
    for i in 0..commands.len() {
        if let Err(e) = commands[i].apply(doc) {
            for done in commands[..i].iter_mut().rev() {
                if let Err(rollback) = done.revert(doc) {
                    tracing::error!("Rollback of '{}' failed: {}", done.description(), rollback);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Reverts `commands` in reverse order, restoring them on failure.
fn revert_all(commands: &mut [BoardCommand], doc: &mut Document) -> EditorResult<()> {
    for i in (0..commands.len()).rev() {
        if let Err(e) = commands[i].revert(doc) {
            for done in commands[i + 1..].iter_mut() {
                if let Err(rollback) = done.apply(doc) {
                    tracing::error!("Rollback of '{}' failed: {}", done.description(), rollback);
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

fn move_items(doc: &mut Document, ids: &[ItemId], delta: Point) -> EditorResult<()> {
    for id in ids {
        let mut item = doc.item(*id).cloned().ok_or(EditorError::UnknownItem(*id))?;
        item.translate(delta);
        doc.replace_item(item);
    }
    Ok(())
}

fn set_item_locked(doc: &mut Document, id: ItemId, locked: bool) -> EditorResult<()> {
    let mut item = doc.item(id).cloned().ok_or(EditorError::UnknownItem(id))?;
    item.locked = locked;
    doc.replace_item(item);
    Ok(())
}

/// One undo step
#[derive(Debug, Clone)]
struct CommandGroup {
    text: String,
    commands: Vec<BoardCommand>,
}

/// What a committed change touched, used to decide which notifications to send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeKinds {
    pub nets: bool,
    pub layers: bool,
}

impl ChangeKinds {
    fn of(commands: &[BoardCommand]) -> Self {
        Self {
            nets: commands.iter().any(BoardCommand::changes_nets),
            layers: commands.iter().any(BoardCommand::changes_layers),
        }
    }

    fn merge(&mut self, other: ChangeKinds) {
        self.nets |= other.nets;
        self.layers |= other.layers;
    }
}

/// Undo/redo stacks with command groups and a committed state id
#[derive(Debug)]
pub struct UndoLog {
    undo_stack: VecDeque<CommandGroup>,
    redo_stack: Vec<CommandGroup>,
    active: Option<CommandGroup>,
    state_id: StateId,
    /// Undo depth at which the content was last saved
    clean_index: Option<usize>,
    limit: usize,
    pending_changes: ChangeKinds,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(200)
    }
}

impl UndoLog {
    /// Creates an empty log keeping at most `limit` undo steps.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            active: None,
            state_id: StateId::default(),
            clean_index: Some(0),
            limit: limit.max(1),
            pending_changes: ChangeKinds::default(),
        }
    }

    pub fn state_id(&self) -> StateId {
        self.state_id
    }

    pub fn is_group_active(&self) -> bool {
        self.active.is_some()
    }

    /// True if the committed content equals the last saved content.
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len()) && self.active.is_none()
    }

    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
    }

    pub fn can_undo(&self) -> bool {
        self.active.is_none() && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.active.is_none() && !self.redo_stack.is_empty()
    }

    pub fn undo_text(&self) -> Option<&str> {
        self.undo_stack.back().map(|g| g.text.as_str())
    }

    pub fn redo_text(&self) -> Option<&str> {
        self.redo_stack.last().map(|g| g.text.as_str())
    }

    /// Kinds of change committed since the last call.
    pub fn take_changes(&mut self) -> ChangeKinds {
        std::mem::take(&mut self.pending_changes)
    }

    /// Executes a single command as its own undo step.
    ///
    /// Returns false if the command did not change anything.
    pub fn execute(&mut self, mut cmd: BoardCommand, doc: &mut Document) -> EditorResult<bool> {
        if self.active.is_some() {
            return Err(EditorError::GroupAlreadyActive);
        }
        if cmd.is_noop(doc) {
            return Ok(false);
        }
        cmd.apply(doc)?;
        let text = cmd.description();
        self.push_committed(CommandGroup {
            text,
            commands: vec![cmd],
        });
        Ok(true)
    }

    pub fn begin_group(&mut self, text: impl Into<String>) -> EditorResult<()> {
        if self.active.is_some() {
            return Err(EditorError::GroupAlreadyActive);
        }
        self.active = Some(CommandGroup {
            text: text.into(),
            commands: Vec::new(),
        });
        Ok(())
    }

    /// Applies `cmd` and records it in the active group.
    pub fn append_to_group(&mut self, mut cmd: BoardCommand, doc: &mut Document) -> EditorResult<()> {
        let group = self.active.as_mut().ok_or(EditorError::NoActiveGroup)?;
        if cmd.is_noop(doc) {
            return Ok(());
        }
        cmd.apply(doc)?;
        group.commands.push(cmd);
        Ok(())
    }

    /// Closes the active group. An empty group is discarded and returns false.
    pub fn commit_group(&mut self) -> EditorResult<bool> {
        let group = self.active.take().ok_or(EditorError::NoActiveGroup)?;
        if group.commands.is_empty() {
            tracing::debug!("Discarding empty command group '{}'", group.text);
            return Ok(false);
        }
        self.push_committed(group);
        Ok(true)
    }

    /// Closes the active group and reverts everything appended to it.
    pub fn abort_group(&mut self, doc: &mut Document) -> EditorResult<()> {
        let group = self.active.as_mut().ok_or(EditorError::NoActiveGroup)?;
        revert_all(&mut group.commands, doc)?;
        self.active = None;
        Ok(())
    }

    /// Number of commands in the active group.
    pub fn active_group_len(&self) -> usize {
        self.active.as_ref().map_or(0, |g| g.commands.len())
    }

    pub fn undo(&mut self, doc: &mut Document) -> EditorResult<()> {
        if self.active.is_some() {
            return Err(EditorError::GroupActive("undo"));
        }
        let group = self.undo_stack.back_mut().ok_or(EditorError::NothingTo("undo"))?;
        revert_all(&mut group.commands, doc)?;
        let Some(group) = self.undo_stack.pop_back() else {
            return Err(EditorError::NothingTo("undo"));
        };
        self.pending_changes.merge(ChangeKinds::of(&group.commands));
        self.redo_stack.push(group);
        self.state_id = self.state_id.next();
        Ok(())
    }

    pub fn redo(&mut self, doc: &mut Document) -> EditorResult<()> {
        if self.active.is_some() {
            return Err(EditorError::GroupActive("redo"));
        }
        let group = self.redo_stack.last_mut().ok_or(EditorError::NothingTo("redo"))?;
        apply_all(&mut group.commands, doc)?;
        let Some(group) = self.redo_stack.pop() else {
            return Err(EditorError::NothingTo("redo"));
        };
        self.pending_changes.merge(ChangeKinds::of(&group.commands));
        self.undo_stack.push_back(group);
        self.state_id = self.state_id.next();
        Ok(())
    }

    fn push_committed(&mut self, group: CommandGroup) {
        // The saved content was only reachable through the redo stack.
        if self.clean_index.is_some_and(|clean| clean > self.undo_stack.len()) {
            self.clean_index = None;
        }
        self.pending_changes.merge(ChangeKinds::of(&group.commands));
        self.undo_stack.push_back(group);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
            self.clean_index = self.clean_index.and_then(|clean| clean.checked_sub(1));
        }
        self.state_id = self.state_id.next();
    }
}
