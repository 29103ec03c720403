use boardkit_core::geometry::point_in_polygon;
use boardkit_core::{ItemId, NetId, Point, Rect};
use std::collections::{BTreeMap, BTreeSet};

use super::index::{CopperIndex, CopperObject, CopperSource};
use super::{RuleCheckMessage, Severity};
use crate::model::{ApprovalKey, Document, DrcSettings, ItemData, LayerId, Shape};

/// Below this, copper is considered touching.
const TOUCH: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Check {
    MinCopperWidth,
    CopperClearance,
    BoardClearance,
    HoleClearance,
    PlaneClearance,
    DrillClearance,
    AnnularRing,
    DrillDiameter,
    SilkscreenTextHeight,
    Zones,
    BoardOutline,
    EmptyPlanes,
    MissingConnections,
}

impl Check {
    pub(super) fn title(self) -> &'static str {
        match self {
            Check::MinCopperWidth => "minimum copper width",
            Check::CopperClearance => "copper clearances",
            Check::BoardClearance => "board clearances",
            Check::HoleClearance => "hole clearances",
            Check::PlaneClearance => "plane clearances",
            Check::DrillClearance => "drill clearances",
            Check::AnnularRing => "PTH annular rings",
            Check::DrillDiameter => "drill diameters",
            Check::SilkscreenTextHeight => "silkscreen text heights",
            Check::Zones => "keepout zones",
            Check::BoardOutline => "board outline",
            Check::EmptyPlanes => "for empty planes",
            Check::MissingConnections => "for missing connections",
        }
    }
}

/// Checks to run with the progress reached after each.
pub(super) fn plan(quick: bool) -> Vec<(Check, u8)> {
    let mut plan = vec![
        (Check::MinCopperWidth, 14),
        (Check::CopperClearance, 24),
        (Check::BoardClearance, 34),
        (Check::HoleClearance, 44),
    ];
    if !quick {
        plan.extend([
            (Check::PlaneClearance, 50),
            (Check::DrillClearance, 56),
            (Check::AnnularRing, 62),
            (Check::DrillDiameter, 68),
            (Check::SilkscreenTextHeight, 74),
            (Check::Zones, 80),
            (Check::BoardOutline, 86),
            (Check::EmptyPlanes, 90),
            (Check::MissingConnections, 98),
        ]);
    }
    plan
}

pub(super) struct Checker<'a> {
    doc: &'a Document,
    settings: &'a DrcSettings,
    copper: CopperIndex,
    messages: Vec<RuleCheckMessage>,
}

impl<'a> Checker<'a> {
    pub(super) fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            settings: &doc.drc_settings,
            copper: CopperIndex::build(doc, false),
            messages: Vec::new(),
        }
    }

    pub(super) fn run(&mut self, check: Check) {
        match check {
            Check::MinCopperWidth => self.min_copper_width(),
            Check::CopperClearance => self.copper_clearance(),
            Check::BoardClearance => self.board_clearance(),
            Check::HoleClearance => self.hole_clearance(),
            Check::PlaneClearance => self.plane_clearance(),
            Check::DrillClearance => self.drill_clearance(),
            Check::AnnularRing => self.annular_rings(),
            Check::DrillDiameter => self.drill_diameters(),
            Check::SilkscreenTextHeight => self.silkscreen_text_heights(),
            Check::Zones => self.zones(),
            Check::BoardOutline => self.board_outline(),
            Check::EmptyPlanes => self.empty_planes(),
            Check::MissingConnections => self.missing_connections(),
        }
    }

    /// Messages sorted by approval key, one per key.
    pub(super) fn finish(mut self) -> Vec<RuleCheckMessage> {
        self.messages.sort_by(|a, b| a.approval.cmp(&b.approval));
        self.messages.dedup_by(|b, a| a.approval == b.approval);
        self.messages
    }

    fn push(
        &mut self,
        severity: Severity,
        rule: &str,
        message: String,
        description: &str,
        locations: Vec<Point>,
        approval: ApprovalKey,
    ) {
        tracing::trace!("{}: {}", rule, message);
        self.messages.push(RuleCheckMessage {
            severity,
            rule: rule.to_string(),
            message,
            description: description.to_string(),
            locations,
            approval,
        });
    }

    fn net_name(&self, net: Option<NetId>) -> String {
        net.and_then(|id| self.doc.net(id))
            .map(|n| n.name.clone())
            .unwrap_or_else(|| "no net".to_string())
    }

    fn min_copper_width(&mut self) {
        let min = self.settings.min_copper_width;
        let mut found = Vec::new();
        for item in self.doc.items() {
            match &item.data {
                ItemData::Trace(t) if t.width < min => found.push((
                    item.id,
                    t.layer,
                    t.width,
                    (t.start + t.end) * 0.5,
                )),
                ItemData::Polygon(p)
                    if p.layer.is_copper() && !(p.filled && p.is_closed()) && p.width < min =>
                {
                    let at = p.path.first().copied().unwrap_or_default();
                    found.push((item.id, p.layer, p.width, at))
                }
                _ => {}
            }
        }
        for (id, layer, width, at) in found {
            self.push(
                Severity::Error,
                "min_copper_width",
                format!(
                    "Min. copper width ({:.3} mm) on {} below {:.3} mm",
                    width, layer, min
                ),
                "Thin copper may be etched away or break during manufacturing.",
                vec![at],
                ApprovalKey::new("min_copper_width", Some(layer), &[id]),
            );
        }
    }

    fn copper_clearance(&mut self) {
        let min = self.settings.min_copper_clearance;
        if min <= 0.0 {
            return;
        }
        let mut found = Vec::new();
        for (a, b) in self.copper.candidate_pairs(min) {
            if a.item == b.item && a.source != CopperSource::Pad {
                continue;
            }
            if a.net.is_some() && a.net == b.net {
                continue;
            }
            let gap = a.shape.distance(&b.shape);
            if gap < min - TOUCH {
                found.push((
                    a.layer,
                    [a.item, b.item],
                    format!(
                        "Clearance between {} ({}) and {} ({}) on {} is {:.3} mm, below {:.3} mm",
                        a.source.name(),
                        self.net_name(a.net),
                        b.source.name(),
                        self.net_name(b.net),
                        a.layer,
                        gap.max(0.0),
                        min
                    ),
                    (a.shape.anchor() + b.shape.anchor()) * 0.5,
                ));
            }
        }
        for (layer, items, message, at) in found {
            self.push(
                Severity::Error,
                "copper_clearance",
                message,
                "Copper of different nets is too close, which may cause short circuits.",
                vec![at],
                ApprovalKey::new("copper_clearance", Some(layer), &items),
            );
        }
    }

    fn board_clearance(&mut self) {
        let min = self.settings.min_copper_board_clearance;
        let edges = outline_edges(self.doc);
        if edges.is_empty() || min <= 0.0 {
            return;
        }
        let mut found: BTreeMap<(ItemId, LayerId), (f64, Point)> = BTreeMap::new();
        for object in self.copper.all() {
            for edge in &edges {
                if !edge.bounds().intersects(&object.bounds.expanded(min)) {
                    continue;
                }
                let gap = object.shape.distance(edge);
                if gap < min - TOUCH {
                    let entry = found
                        .entry((object.item, object.layer))
                        .or_insert((gap, object.shape.anchor()));
                    entry.0 = entry.0.min(gap);
                }
            }
        }
        for ((item, layer), (gap, at)) in found {
            self.push(
                Severity::Error,
                "copper_board_clearance",
                format!(
                    "Clearance copper to board edge on {} is {:.3} mm, below {:.3} mm",
                    layer,
                    gap.max(0.0),
                    min
                ),
                "Copper too close to the board edge may be exposed when the board is milled.",
                vec![at],
                ApprovalKey::new("copper_board_clearance", Some(layer), &[item]),
            );
        }
    }

    fn hole_clearance(&mut self) {
        let min = self.settings.min_copper_hole_clearance;
        let mut found = Vec::new();
        for item in self.doc.items() {
            let ItemData::Hole(hole) = &item.data else {
                continue;
            };
            let circle = Shape::Circle {
                center: hole.position,
                radius: hole.diameter / 2.0,
            };
            let area = circle.bounds().expanded(min);
            for layer in self.copper.layers() {
                for object in self.copper.near(layer, &area) {
                    let gap = object.shape.distance(&circle);
                    if gap < min - TOUCH {
                        found.push((layer, [item.id, object.item], gap, hole.position));
                    }
                }
            }
        }
        for (layer, items, gap, at) in found {
            self.push(
                Severity::Error,
                "copper_hole_clearance",
                format!(
                    "Clearance copper to hole on {} is {:.3} mm, below {:.3} mm",
                    layer,
                    gap.max(0.0),
                    min
                ),
                "Copper too close to a non-plated hole may be damaged when drilling.",
                vec![at],
                ApprovalKey::new("copper_hole_clearance", Some(layer), &items),
            );
        }
    }

    fn plane_clearance(&mut self) {
        let min = self.settings.min_copper_clearance;
        let mut found = Vec::new();
        for (item, plane) in self.doc.planes() {
            let fragments = self.doc.fragments(item.id);
            if fragments.is_empty() {
                continue;
            }
            if plane.clearance < min {
                found.push((
                    Severity::Warning,
                    format!(
                        "Plane clearance ({:.3} mm) on {} below {:.3} mm",
                        plane.clearance, plane.layer, min
                    ),
                    plane.layer,
                    vec![item.id],
                    plane.outline.first().copied().unwrap_or_default(),
                ));
            }
            for fragment in fragments {
                let Some(bounds) = fragment.bounds() else {
                    continue;
                };
                for object in self.copper.near(plane.layer, &bounds) {
                    if object.net.is_some() && object.net == plane.net {
                        continue;
                    }
                    let at = object.shape.anchor();
                    if fragment.contains(&at) {
                        found.push((
                            Severity::Error,
                            format!(
                                "Plane of {} overlaps {} of {} on {}",
                                self.net_name(plane.net),
                                object.source.name(),
                                self.net_name(object.net),
                                plane.layer
                            ),
                            plane.layer,
                            vec![item.id, object.item],
                            at,
                        ));
                    }
                }
            }
        }
        for (severity, message, layer, items, at) in found {
            self.push(
                severity,
                "plane_clearance",
                message,
                "Planes must keep their clearance to copper of other nets.",
                vec![at],
                ApprovalKey::new("plane_clearance", Some(layer), &items),
            );
        }
    }

    fn drill_clearance(&mut self) {
        let min = self.settings.min_drill_drill_clearance;
        let drills: Vec<(ItemId, Point, f64)> = self
            .doc
            .items()
            .flat_map(|item| {
                item.drills()
                    .into_iter()
                    .map(move |(center, diameter)| (item.id, center, diameter))
            })
            .collect();
        let mut found = Vec::new();
        for (i, a) in drills.iter().enumerate() {
            for b in &drills[i + 1..] {
                if a.0 == b.0 {
                    continue;
                }
                let gap = a.1.distance(&b.1) - (a.2 + b.2) / 2.0;
                if gap < min - TOUCH {
                    found.push(([a.0, b.0], gap, (a.1 + b.1) * 0.5));
                }
            }
        }
        for (items, gap, at) in found {
            self.push(
                Severity::Error,
                "drill_clearance",
                format!("Drill clearance is {:.3} mm, below {:.3} mm", gap.max(0.0), min),
                "Drills too close to each other may break the material between them.",
                vec![at],
                ApprovalKey::new("drill_clearance", None, &items),
            );
        }
    }

    fn annular_rings(&mut self) {
        let min = self.settings.min_annular_ring;
        let mut found = Vec::new();
        for item in self.doc.items() {
            match &item.data {
                ItemData::Via(v) if (v.size - v.drill) / 2.0 < min => {
                    let ring = (v.size - v.drill) / 2.0;
                    found.push((item.id, format!("via ({:.3} mm)", ring), v.position))
                }
                ItemData::Device(d) => {
                    let pads: Vec<_> = d
                        .placed_pads()
                        .into_iter()
                        .filter(|p| {
                            let size = p.pad.width.min(p.pad.height);
                            p.pad.drill.is_some_and(|drill| (size - drill) / 2.0 < min)
                        })
                        .collect();
                    if let Some(first) = pads.first() {
                        let names: Vec<&str> = pads.iter().map(|p| p.pad.name.as_str()).collect();
                        found.push((
                            item.id,
                            format!("pad(s) {} of {}", names.join(", "), d.name),
                            first.center,
                        ));
                    }
                }
                _ => {}
            }
        }
        for (id, what, at) in found {
            self.push(
                Severity::Error,
                "annular_ring",
                format!("Annular ring of {} below {:.3} mm", what, min),
                "Small annular rings may be drilled away completely.",
                vec![at],
                ApprovalKey::new("annular_ring", None, &[id]),
            );
        }
    }

    fn drill_diameters(&mut self) {
        let min = self.settings.min_drill_diameter;
        let mut found = Vec::new();
        for item in self.doc.items() {
            let small: Vec<(Point, f64)> = item
                .drills()
                .into_iter()
                .filter(|(_, diameter)| *diameter < min)
                .collect();
            if let Some(&(at, diameter)) = small.first() {
                found.push((item.id, item.kind_name(), small.len(), diameter, at));
            }
        }
        for (id, kind, count, diameter, at) in found {
            let message = if count == 1 {
                format!("Drill of {} ({:.3} mm) below {:.3} mm", kind, diameter, min)
            } else {
                format!("{} drills of {} below {:.3} mm", count, kind, min)
            };
            self.push(
                Severity::Error,
                "min_drill_diameter",
                message,
                "The manufacturer may not be able to drill holes this small.",
                vec![at],
                ApprovalKey::new("min_drill_diameter", None, &[id]),
            );
        }
    }

    fn silkscreen_text_heights(&mut self) {
        let min = self.settings.min_silkscreen_text_height;
        let mut found = Vec::new();
        for item in self.doc.items() {
            match &item.data {
                ItemData::StrokeText(t) if t.layer.is_silkscreen() && t.height < min => {
                    found.push((item.id, t.layer, format!("\"{}\"", t.text), t.height, t.position))
                }
                ItemData::Device(d) => {
                    if let Some(text) = d.texts.iter().find(|t| t.height < min) {
                        found.push((
                            item.id,
                            d.silkscreen_side(),
                            format!("\"{}\" of {}", text.text, d.name),
                            text.height,
                            d.map(text.offset),
                        ));
                    }
                }
                _ => {}
            }
        }
        for (id, layer, what, height, at) in found {
            self.push(
                Severity::Warning,
                "silkscreen_text_height",
                format!(
                    "Height of text {} ({:.3} mm) below {:.3} mm",
                    what, height, min
                ),
                "Small silkscreen text may not be readable.",
                vec![at],
                ApprovalKey::new("silkscreen_text_height", Some(layer), &[id]),
            );
        }
    }

    fn zones(&mut self) {
        let mut found = Vec::new();
        for zone_item in self.doc.items() {
            let ItemData::Zone(zone) = &zone_item.data else {
                continue;
            };
            let Some(bounds) = Rect::from_points(&zone.outline) else {
                continue;
            };
            let area = Shape::Polygon {
                path: zone.outline.clone(),
                margin: 0.0,
            };
            for &layer in zone.layers.iter().filter(|l| l.is_copper()) {
                for object in self.copper.near(layer, &bounds) {
                    if object.item == zone_item.id || object.shape.distance(&area) > TOUCH {
                        continue;
                    }
                    let outer = matches!(layer, LayerId::TopCopper | LayerId::BottomCopper);
                    let violation = if zone.rules.no_copper {
                        Some(("zone_copper", "copper"))
                    } else if zone.rules.no_exposure && outer && object.source == CopperSource::Pad
                    {
                        Some(("zone_exposure", "exposed copper"))
                    } else {
                        None
                    };
                    if let Some((rule, what)) = violation {
                        let at = object.shape.anchor();
                        found.push((rule, what, Some(layer), zone_item.id, object.item, at));
                    }
                }
                if zone.rules.no_planes {
                    let center = bounds.center();
                    for (plane_item, plane) in self.doc.planes() {
                        if plane.layer == layer
                            && self
                                .doc
                                .fragments(plane_item.id)
                                .iter()
                                .any(|f| f.contains(&center))
                        {
                            let item = plane_item.id;
                            found.push(("zone_plane", "plane", Some(layer), zone_item.id, item, center));
                        }
                    }
                }
            }
            if zone.rules.no_devices {
                for item in self.doc.items() {
                    let ItemData::Device(d) = &item.data else {
                        continue;
                    };
                    let sides = [d.copper_side(), d.silkscreen_side()];
                    if sides.iter().any(|l| zone.layers.contains(l))
                        && point_in_polygon(&d.position, &zone.outline)
                    {
                        let at = d.position;
                        found.push(("zone_device", "device", None, zone_item.id, item.id, at));
                    }
                }
            }
        }
        for (rule, what, layer, zone, item, at) in found {
            let on = layer.map(|l| format!(" on {}", l)).unwrap_or_default();
            self.push(
                Severity::Error,
                rule,
                format!("Keepout zone violated by {}{}", what, on),
                "The zone forbids this kind of object in its area.",
                vec![at],
                ApprovalKey::new(rule, layer, &[zone, item]),
            );
        }
    }

    fn board_outline(&mut self) {
        let mut open = Vec::new();
        let mut closed = 0;
        for item in self.doc.items() {
            if let ItemData::Polygon(p) = &item.data {
                if p.layer == LayerId::BoardOutline {
                    if p.is_closed() {
                        closed += 1;
                    } else {
                        open.push((item.id, p.path.first().copied().unwrap_or_default()));
                    }
                }
            }
        }
        if closed == 0 {
            self.push(
                Severity::Error,
                "missing_board_outline",
                "Missing board outline".to_string(),
                "The board needs a closed outline on the board outline layer.",
                Vec::new(),
                ApprovalKey::new("missing_board_outline", None, &[]),
            );
        }
        for (id, at) in open {
            self.push(
                Severity::Error,
                "open_board_outline",
                "Open board outline polygon".to_string(),
                "Board outline polygons must be closed.",
                vec![at],
                ApprovalKey::new("open_board_outline", Some(LayerId::BoardOutline), &[id]),
            );
        }
    }

    fn empty_planes(&mut self) {
        let empty: Vec<_> = self
            .doc
            .planes()
            .filter(|(item, _)| self.doc.fragments(item.id).is_empty())
            .map(|(item, p)| {
                (item.id, p.layer, p.net, p.outline.first().copied().unwrap_or_default())
            })
            .collect();
        for (id, layer, net, at) in empty {
            self.push(
                Severity::Warning,
                "empty_plane",
                format!("Plane of {} on {} is empty", self.net_name(net), layer),
                "The plane has no copper after clipping, clearances and orphan removal.",
                vec![at],
                ApprovalKey::new("empty_plane", Some(layer), &[id]),
            );
        }
    }

    fn missing_connections(&mut self) {
        let index = CopperIndex::build(self.doc, true);
        let mut per_net: BTreeMap<NetId, Vec<&CopperObject>> = BTreeMap::new();
        for object in index.all() {
            if let Some(net) = object.net {
                per_net.entry(net).or_default().push(object);
            }
        }
        let mut found = Vec::new();
        for (net, objects) in per_net {
            let slot: BTreeMap<usize, usize> =
                objects.iter().enumerate().map(|(i, o)| (o.index, i)).collect();
            let mut sets = DisjointSets::new(objects.len());
            for (i, a) in objects.iter().enumerate() {
                for b in index.near(a.layer, &a.bounds.expanded(TOUCH)) {
                    if let Some(&j) = slot.get(&b.index) {
                        if a.shape.distance(&b.shape) <= TOUCH {
                            sets.union(i, j);
                        }
                    }
                }
                // Vias and plated pads connect their layers.
                for (j, b) in objects.iter().enumerate().skip(i + 1) {
                    if a.item == b.item
                        && a.layer != b.layer
                        && (a.source == CopperSource::Via
                            || (a.source == CopperSource::Pad && a.shape == b.shape))
                    {
                        sets.union(i, j);
                    }
                }
            }
            let mut roots: BTreeSet<usize> = BTreeSet::new();
            let mut locations = Vec::new();
            for i in 0..objects.len() {
                if roots.insert(sets.find(i)) {
                    locations.push(objects[i].shape.anchor());
                }
            }
            if roots.len() > 1 {
                found.push((net, roots.len() - 1, locations));
            }
        }
        for (net, missing, locations) in found {
            self.push(
                Severity::Error,
                "missing_connection",
                format!(
                    "Missing {} connection(s) in net {}",
                    missing,
                    self.net_name(Some(net))
                ),
                "Parts of the net are not connected by copper yet.",
                locations,
                ApprovalKey::for_net("missing_connection", net, &[]),
            );
        }
    }
}

/// Outline edges as zero width segments.
fn outline_edges(doc: &Document) -> Vec<Shape> {
    doc.items()
        .filter_map(|item| match &item.data {
            ItemData::Polygon(p) if p.layer == LayerId::BoardOutline => Some(p),
            _ => None,
        })
        .flat_map(|p| {
            let mut path = p.path.clone();
            if p.filled && p.is_closed() {
                path.extend(p.path.first().copied());
            }
            path.windows(2)
                .map(|w| Shape::Stadium {
                    a: w[0],
                    b: w[1],
                    radius: 0.0,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}
