//! Plane fragment computation.
//!
//! A fragment is the copper a plane actually gets: its outline clipped to
//! the board, with clearance-inflated holes around foreign copper. Every
//! plane is computed from its own layer only, so a job restricted to some
//! layers produces exactly the fragments a full job would for those layers.

use boardkit_core::geometry::{clip_polygon_convex, polygon_is_convex};
use boardkit_core::{ItemId, NetId, Point, Rect};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use super::{BuildError, BuildJob, JobContext};
use crate::model::{Document, ItemData, LayerId, Plane, PlaneFragment, Shape};

/// Fragments computed for some layers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaneResult {
    pub layers: BTreeSet<LayerId>,
    pub fragments: BTreeMap<ItemId, Vec<PlaneFragment>>,
}

impl PlaneResult {
    pub fn fragment_count(&self) -> usize {
        self.fragments.values().map(Vec::len).sum()
    }
}

/// Snapshot of a document plus the layers to compute
#[derive(Debug, Clone)]
pub struct PlaneJob {
    snapshot: Document,
    layers: BTreeSet<LayerId>,
}

impl PlaneJob {
    /// Takes the scheduled layers out of `doc` and snapshots it.
    ///
    /// Only layers that carry planes are computed; `restriction` narrows
    /// them further. A `full` job adds every layer with planes. Returns
    /// `None` if there is nothing to compute.
    pub fn create(
        doc: &mut Document,
        restriction: Option<&BTreeSet<LayerId>>,
        full: bool,
    ) -> Option<PlaneJob> {
        let with_planes = doc.layers_with_planes();
        let mut layers: BTreeSet<LayerId> = if full {
            with_planes
        } else {
            doc.scheduled_plane_layers()
                .intersection(&with_planes)
                .copied()
                .collect()
        };
        if let Some(restriction) = restriction {
            layers.retain(|l| restriction.contains(l));
        }
        if layers.is_empty() {
            return None;
        }
        doc.unschedule_plane_layers(&layers);
        Some(PlaneJob {
            snapshot: doc.clone(),
            layers,
        })
    }

    pub fn layers(&self) -> &BTreeSet<LayerId> {
        &self.layers
    }

    /// Computes synchronously, checking `ctx` for cancellation between planes.
    pub fn compute(&self, ctx: &JobContext) -> Result<PlaneResult, BuildError> {
        compute_fragments(&self.snapshot, &self.layers, 0..=100, ctx)
    }
}

impl BuildJob for PlaneJob {
    type Output = PlaneResult;

    fn run(self, ctx: &JobContext) -> Result<PlaneResult, BuildError> {
        ctx.status("Rebuild planes...");
        let result = self.compute(ctx)?;
        tracing::debug!(
            "Computed {} fragment(s) on {} layer(s)",
            result.fragment_count(),
            result.layers.len()
        );
        Ok(result)
    }
}

/// Fragments of every plane on `layers`, highest priority first.
///
/// Progress is reported within `progress`, which lets a caller embed the
/// computation in a longer run.
pub fn compute_fragments(
    doc: &Document,
    layers: &BTreeSet<LayerId>,
    progress: RangeInclusive<u8>,
    ctx: &JobContext,
) -> Result<PlaneResult, BuildError> {
    let mut planes: Vec<(ItemId, &Plane)> = doc
        .planes()
        .filter(|(_, p)| layers.contains(&p.layer))
        .map(|(item, p)| (item.id, p))
        .collect();
    planes.sort_by(|a, b| b.1.priority.cmp(&a.1.priority).then(a.0.cmp(&b.0)));

    let board = board_clip(doc);
    let mut result = PlaneResult {
        layers: layers.clone(),
        fragments: BTreeMap::new(),
    };
    // Fragments already computed per layer, with their net.
    let mut done: BTreeMap<LayerId, Vec<(Option<NetId>, PlaneFragment)>> = BTreeMap::new();
    let total = planes.len().max(1);
    let start = *progress.start() as usize;
    let span = progress.end().saturating_sub(*progress.start()) as usize;

    for (index, (id, plane)) in planes.iter().enumerate() {
        ctx.check_canceled()?;
        let earlier = done.get(&plane.layer).map(Vec::as_slice).unwrap_or(&[]);
        let fragments: Vec<PlaneFragment> =
            plane_fragment(doc, plane, board.as_deref(), earlier).into_iter().collect();
        done.entry(plane.layer)
            .or_default()
            .extend(fragments.iter().cloned().map(|f| (plane.net, f)));
        result.fragments.insert(*id, fragments);
        ctx.progress((start + (index + 1) * span / total) as u8);
    }
    Ok(result)
}

/// The board outline if it can be used for clipping.
fn board_clip(doc: &Document) -> Option<Vec<Point>> {
    let outline = doc.board_outlines().into_iter().next()?;
    if polygon_is_convex(&outline) {
        Some(outline)
    } else {
        tracing::debug!("Board outline is not convex, planes are not clipped to it");
        None
    }
}

fn plane_fragment(
    doc: &Document,
    plane: &Plane,
    board: Option<&[Point]>,
    earlier: &[(Option<NetId>, PlaneFragment)],
) -> Option<PlaneFragment> {
    let outline = match board {
        Some(board) => clip_polygon_convex(&plane.outline, board),
        None => plane.outline.clone(),
    };
    let bounds = Rect::from_points(&outline)?;
    if bounds.width().min(bounds.height()) < plane.min_width {
        return None;
    }

    let mut cutouts: Vec<Shape> = Vec::new();
    let mut anchors: Vec<Point> = Vec::new();
    for item in doc.items() {
        match &item.data {
            ItemData::Hole(h) => cutouts.push(
                Shape::Circle {
                    center: h.position,
                    radius: h.diameter / 2.0,
                }
                .grown(plane.clearance),
            ),
            ItemData::Zone(z) if z.rules.no_planes && z.layers.contains(&plane.layer) => {
                cutouts.push(Shape::Polygon {
                    path: z.outline.clone(),
                    margin: 0.0,
                })
            }
            _ => {}
        }
        for (net, shape) in item.copper_shapes(plane.layer) {
            if net.is_some() && net == plane.net {
                anchors.extend(connection_points(&item.data, &shape));
            } else {
                cutouts.push(shape.grown(plane.clearance));
            }
        }
    }
    for (net, fragment) in earlier {
        if *net != plane.net {
            cutouts.push(Shape::Polygon {
                path: fragment.outline.clone(),
                margin: plane.clearance,
            });
        }
    }
    cutouts.retain(|c| c.bounds().intersects(&bounds));

    let fragment = PlaneFragment { outline, cutouts };
    if !plane.keep_orphans && !anchors.iter().any(|p| fragment.contains(p)) {
        return None;
    }
    Some(fragment)
}

/// Points where same-net copper connects to a plane.
fn connection_points(data: &ItemData, shape: &Shape) -> Vec<Point> {
    match (data, shape) {
        (ItemData::Trace(t), _) => vec![t.start, t.end],
        (_, Shape::Circle { center, .. }) => vec![*center],
        (_, Shape::Polygon { path, .. }) => {
            Rect::from_points(path).map(|r| r.center()).into_iter().collect()
        }
        (_, Shape::Stadium { a, b, .. }) => vec![*a, *b],
    }
}
