//! The board document: layers, nets, items, rule settings and approvals.
//!
//! Committed content is only changed through the undo log, which uses the
//! `pub(crate)` mutators below. Plane fragments and the set of layers
//! scheduled for a plane rebuild are derived data and never persisted.

use boardkit_core::{ItemId, NetId, Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::item::{BoardItem, ItemData, PlaneFragment};
use super::layer::{Layer, LayerId};
use crate::error::{EditorError, EditorResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Grid interval in millimetres
    pub interval: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self { interval: 0.5 }
    }
}

impl Grid {
    pub fn snap(&self, p: Point) -> Point {
        p.snapped(self.interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub id: NetId,
    pub name: String,
}

/// Limits used by the design rule check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrcSettings {
    pub min_copper_width: f64,
    pub min_copper_clearance: f64,
    pub min_copper_board_clearance: f64,
    pub min_copper_hole_clearance: f64,
    pub min_drill_drill_clearance: f64,
    pub min_annular_ring: f64,
    pub min_drill_diameter: f64,
    pub min_silkscreen_text_height: f64,
}

impl Default for DrcSettings {
    fn default() -> Self {
        Self {
            min_copper_width: 0.2,
            min_copper_clearance: 0.2,
            min_copper_board_clearance: 0.3,
            min_copper_hole_clearance: 0.25,
            min_drill_drill_clearance: 0.35,
            min_annular_ring: 0.2,
            min_drill_diameter: 0.3,
            min_silkscreen_text_height: 0.8,
        }
    }
}

/// Stable identity of a rule check finding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalKey(pub String);

impl ApprovalKey {
    /// Builds `(rule (layer x) (item a) (item b))` with items sorted.
    pub fn new(rule: &str, layer: Option<LayerId>, items: &[ItemId]) -> Self {
        let mut items: Vec<ItemId> = items.to_vec();
        items.sort();
        items.dedup();
        let mut key = format!("({}", rule);
        if let Some(layer) = layer {
            key.push_str(&format!(" (layer {})", layer.key()));
        }
        for item in items {
            key.push_str(&format!(" (item {})", item));
        }
        key.push(')');
        ApprovalKey(key)
    }

    /// Identity for findings about a net rather than items.
    pub fn for_net(rule: &str, net: NetId, items: &[ItemId]) -> Self {
        let mut key = Self::new(rule, None, items).0;
        key.pop();
        key.push_str(&format!(" (net {}))", net));
        ApprovalKey(key)
    }
}

impl std::fmt::Display for ApprovalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub layers: Vec<Layer>,
    #[serde(default)]
    nets: BTreeMap<NetId, Net>,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub drc_settings: DrcSettings,
    #[serde(default)]
    items: BTreeMap<ItemId, BoardItem>,
    #[serde(default)]
    approvals: BTreeSet<ApprovalKey>,
    #[serde(skip)]
    fragments: BTreeMap<ItemId, Vec<PlaneFragment>>,
    #[serde(skip)]
    scheduled_plane_layers: BTreeSet<LayerId>,
    #[serde(skip)]
    approvals_dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layers: Layer::default_stackup(),
            nets: BTreeMap::new(),
            grid: Grid::default(),
            drc_settings: DrcSettings::default(),
            items: BTreeMap::new(),
            approvals: BTreeSet::new(),
            fragments: BTreeMap::new(),
            scheduled_plane_layers: BTreeSet::new(),
            approvals_dirty: false,
        }
    }

    // ---- persistence ----

    pub fn from_json_str(json: &str) -> EditorResult<Self> {
        let mut doc: Document = serde_json::from_str(json)?;
        // Everything with planes needs fragments after loading.
        doc.scheduled_plane_layers = doc.layers_with_planes();
        Ok(doc)
    }

    pub fn to_json_string(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_json(path: &Path) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EditorError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    pub fn save_json(&self, path: &Path) -> EditorResult<()> {
        std::fs::write(path, self.to_json_string()?).map_err(|e| EditorError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    // ---- layers ----

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn is_layer_enabled(&self, id: LayerId) -> bool {
        self.layer(id).is_some_and(|l| l.enabled)
    }

    pub fn enabled_layers(&self) -> Vec<LayerId> {
        self.layers.iter().filter(|l| l.enabled).map(|l| l.id).collect()
    }

    pub fn enabled_copper_layers(&self) -> Vec<LayerId> {
        LayerId::COPPER
            .into_iter()
            .filter(|&l| self.is_layer_enabled(l))
            .collect()
    }

    pub fn visible_copper_layers(&self) -> BTreeSet<LayerId> {
        self.layers
            .iter()
            .filter(|l| l.enabled && l.visible && l.id.is_copper())
            .map(|l| l.id)
            .collect()
    }

    /// Returns the previous value.
    pub(crate) fn set_layer_enabled(&mut self, id: LayerId, enabled: bool) -> Option<bool> {
        let layer = self.layers.iter_mut().find(|l| l.id == id)?;
        let old = layer.enabled;
        layer.enabled = enabled;
        if id.is_copper() {
            self.scheduled_plane_layers.insert(id);
        }
        Some(old)
    }

    /// Visibility is a view toggle, not committed content.
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.visible = visible;
        }
    }

    // ---- nets ----

    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(&id)
    }

    /// Nets sorted by name, then id.
    pub fn nets(&self) -> Vec<&Net> {
        let mut nets: Vec<&Net> = self.nets.values().collect();
        nets.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        nets
    }

    pub fn net_ids(&self) -> Vec<NetId> {
        self.nets().into_iter().map(|n| n.id).collect()
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.values().find(|n| n.name == name)
    }

    /// The net referenced by the most items; ties go to the first net by name.
    pub fn net_with_most_items(&self) -> Option<NetId> {
        let mut counts: BTreeMap<NetId, usize> = BTreeMap::new();
        for item in self.items.values() {
            for net in item.nets() {
                *counts.entry(net).or_default() += 1;
            }
        }
        let mut best: Option<(NetId, usize)> = None;
        for net in self.nets() {
            let count = counts.get(&net.id).copied().unwrap_or(0);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((net.id, count));
            }
        }
        best.map(|(id, _)| id)
    }

    pub(crate) fn insert_net(&mut self, net: Net) {
        self.nets.insert(net.id, net);
        self.scheduled_plane_layers.extend(LayerId::COPPER);
    }

    pub(crate) fn remove_net(&mut self, id: NetId) -> Option<Net> {
        let removed = self.nets.remove(&id);
        if removed.is_some() {
            self.scheduled_plane_layers.extend(LayerId::COPPER);
        }
        removed
    }

    pub(crate) fn net_mut(&mut self, id: NetId) -> Option<&mut Net> {
        self.nets.get_mut(&id)
    }

    // ---- items ----

    pub fn items(&self) -> impl Iterator<Item = &BoardItem> {
        self.items.values()
    }

    pub fn item(&self, id: ItemId) -> Option<&BoardItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn insert_item(&mut self, item: BoardItem) {
        self.schedule_item_layers(&item);
        self.items.insert(item.id, item);
    }

    pub(crate) fn remove_item(&mut self, id: ItemId) -> Option<BoardItem> {
        let item = self.items.remove(&id)?;
        self.schedule_item_layers(&item);
        self.fragments.remove(&id);
        Some(item)
    }

    /// Replaces an item, returning the previous version.
    pub(crate) fn replace_item(&mut self, item: BoardItem) -> Option<BoardItem> {
        self.schedule_item_layers(&item);
        let old = self.items.insert(item.id, item)?;
        self.schedule_item_layers(&old);
        Some(old)
    }

    fn schedule_item_layers(&mut self, item: &BoardItem) {
        let copper = item.copper_layers();
        self.scheduled_plane_layers.extend(copper);
    }

    pub fn traces(&self) -> impl Iterator<Item = (&BoardItem, &super::item::Trace)> {
        self.items.values().filter_map(|i| match &i.data {
            ItemData::Trace(t) => Some((i, t)),
            _ => None,
        })
    }

    pub fn planes(&self) -> impl Iterator<Item = (&BoardItem, &super::item::Plane)> {
        self.items.values().filter_map(|i| match &i.data {
            ItemData::Plane(p) => Some((i, p)),
            _ => None,
        })
    }

    /// Closed polygons on the outline layer; the first one is the board shape.
    pub fn board_outlines(&self) -> Vec<Vec<Point>> {
        self.items
            .values()
            .filter_map(|i| match &i.data {
                ItemData::Polygon(p) if p.layer == LayerId::BoardOutline && p.is_closed() => {
                    Some(p.area_path())
                }
                _ => None,
            })
            .collect()
    }

    /// Items whose geometry is within `tolerance` of `pos`, nearest first.
    pub fn items_at(&self, pos: &Point, tolerance: f64) -> Vec<ItemId> {
        let mut hits: Vec<(f64, ItemId)> = self
            .items
            .values()
            .filter(|item| self.item_layers_visible(item))
            .filter(|item| {
                item.bounds()
                    .is_some_and(|b| b.expanded(tolerance).contains_point(pos))
            })
            .map(|item| (item.hit_distance(pos), item.id))
            .filter(|(d, _)| *d <= tolerance)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Items entirely inside `rect`.
    pub fn items_in_rect(&self, rect: &Rect) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| self.item_layers_visible(item))
            .filter(|item| item.bounds().is_some_and(|b| rect.contains_rect(&b)))
            .map(|item| item.id)
            .collect()
    }

    fn item_layers_visible(&self, item: &BoardItem) -> bool {
        item.layers()
            .iter()
            .any(|l| self.layer(*l).is_some_and(|layer| layer.visible))
    }

    /// Closest item vertex within `tolerance`.
    pub fn nearest_vertex(&self, pos: &Point, tolerance: f64) -> Option<Point> {
        self.items
            .values()
            .flat_map(|item| item.vertices())
            .map(|v| (v.distance(pos), v))
            .filter(|(d, _)| *d <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, v)| v)
    }

    /// Closest copper connection point on `layer`: trace ends, vias and pads.
    pub fn copper_anchor_at(
        &self,
        pos: &Point,
        tolerance: f64,
        layer: LayerId,
    ) -> Option<(Point, Option<NetId>)> {
        let mut best: Option<(f64, Point, Option<NetId>)> = None;
        let mut consider = |p: Point, net: Option<NetId>, reach: f64| {
            let d = p.distance(pos);
            if d <= tolerance.max(reach) && best.map_or(true, |(bd, _, _)| d < bd) {
                best = Some((d, p, net));
            }
        };
        for item in self.items.values() {
            match &item.data {
                ItemData::Trace(t) if t.layer == layer => {
                    consider(t.start, t.net, t.width / 2.0);
                    consider(t.end, t.net, t.width / 2.0);
                }
                ItemData::Via(v) => consider(v.position, v.net, v.size / 2.0),
                ItemData::Device(d) => {
                    for pad in d.placed_pads().iter().filter(|p| p.on_layer(layer)) {
                        consider(pad.center, pad.pad.net, pad.pad.width.min(pad.pad.height) / 2.0);
                    }
                }
                _ => {}
            }
        }
        best.map(|(_, p, net)| (p, net))
    }

    // ---- planes ----

    pub fn layers_with_planes(&self) -> BTreeSet<LayerId> {
        self.planes().map(|(_, p)| p.layer).collect()
    }

    pub fn fragments(&self, plane: ItemId) -> &[PlaneFragment] {
        self.fragments.get(&plane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_fragments(&self) -> &BTreeMap<ItemId, Vec<PlaneFragment>> {
        &self.fragments
    }

    /// Replaces fragments of all planes on `layers`. Planes no longer present are ignored.
    pub fn apply_fragments(
        &mut self,
        layers: &BTreeSet<LayerId>,
        fragments: BTreeMap<ItemId, Vec<PlaneFragment>>,
    ) {
        let on_layers: Vec<ItemId> = self
            .planes()
            .filter(|(_, p)| layers.contains(&p.layer))
            .map(|(i, _)| i.id)
            .collect();
        for id in on_layers {
            let frags = fragments.get(&id).cloned().unwrap_or_default();
            self.fragments.insert(id, frags);
        }
        let existing: BTreeSet<ItemId> = self.planes().map(|(i, _)| i.id).collect();
        self.fragments.retain(|id, _| existing.contains(id));
    }

    pub fn scheduled_plane_layers(&self) -> &BTreeSet<LayerId> {
        &self.scheduled_plane_layers
    }

    pub fn schedule_plane_layers(&mut self, layers: impl IntoIterator<Item = LayerId>) {
        self.scheduled_plane_layers.extend(layers);
    }

    pub(crate) fn unschedule_plane_layers(&mut self, layers: &BTreeSet<LayerId>) {
        self.scheduled_plane_layers.retain(|l| !layers.contains(l));
    }

    // ---- approvals ----

    pub fn approvals(&self) -> &BTreeSet<ApprovalKey> {
        &self.approvals
    }

    pub fn is_approved(&self, key: &ApprovalKey) -> bool {
        self.approvals.contains(key)
    }

    /// Returns true if the set changed.
    pub fn set_approved(&mut self, key: ApprovalKey, approved: bool) -> bool {
        let changed = if approved {
            self.approvals.insert(key)
        } else {
            self.approvals.remove(&key)
        };
        self.approvals_dirty |= changed;
        changed
    }

    pub fn replace_approvals(&mut self, approvals: BTreeSet<ApprovalKey>) -> bool {
        let changed = approvals != self.approvals;
        if changed {
            self.approvals = approvals;
            self.approvals_dirty = true;
        }
        changed
    }

    /// True while approval changes have not been written to storage.
    pub fn approvals_dirty(&self) -> bool {
        self.approvals_dirty
    }

    pub fn mark_approvals_saved(&mut self) {
        self.approvals_dirty = false;
    }
}
