//! Spatial index of copper primitives per layer.

use boardkit_core::{ItemId, NetId, Rect};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::BTreeMap;

use crate::model::{Document, ItemData, LayerId, Shape};

/// What a copper primitive belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopperSource {
    Trace,
    Via,
    Pad,
    Polygon,
    PlaneFragment,
}

impl CopperSource {
    pub fn name(self) -> &'static str {
        match self {
            CopperSource::Trace => "trace",
            CopperSource::Via => "via",
            CopperSource::Pad => "pad",
            CopperSource::Polygon => "polygon",
            CopperSource::PlaneFragment => "plane",
        }
    }
}

/// One copper primitive on one layer
#[derive(Debug, Clone, PartialEq)]
pub struct CopperObject {
    /// Position in insertion order; used to visit each pair once
    pub index: usize,
    pub item: ItemId,
    pub layer: LayerId,
    pub net: Option<NetId>,
    pub source: CopperSource,
    pub shape: Shape,
    pub bounds: Rect,
}

impl RTreeObject for CopperObject {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// R-trees of copper, one per copper layer
#[derive(Default)]
pub struct CopperIndex {
    layers: BTreeMap<LayerId, RTree<CopperObject>>,
}

impl CopperIndex {
    /// Indexes every copper primitive of `doc`. Plane fragments are only
    /// included when `with_planes` is set.
    pub fn build(doc: &Document, with_planes: bool) -> Self {
        let mut per_layer: BTreeMap<LayerId, Vec<CopperObject>> = BTreeMap::new();
        let mut index = 0;
        for layer in doc.enabled_copper_layers() {
            let objects = per_layer.entry(layer).or_default();
            for item in doc.items() {
                let source = match &item.data {
                    ItemData::Trace(_) => CopperSource::Trace,
                    ItemData::Via(_) => CopperSource::Via,
                    ItemData::Device(_) => CopperSource::Pad,
                    ItemData::Polygon(_) => CopperSource::Polygon,
                    _ => continue,
                };
                for (net, shape) in item.copper_shapes(layer) {
                    objects.push(CopperObject {
                        index,
                        item: item.id,
                        layer,
                        net,
                        source,
                        bounds: shape.bounds(),
                        shape,
                    });
                    index += 1;
                }
            }
            if with_planes {
                for (item, plane) in doc.planes().filter(|(_, p)| p.layer == layer) {
                    for fragment in doc.fragments(item.id) {
                        let Some(bounds) = fragment.bounds() else {
                            continue;
                        };
                        objects.push(CopperObject {
                            index,
                            item: item.id,
                            layer,
                            net: plane.net,
                            source: CopperSource::PlaneFragment,
                            shape: Shape::Polygon {
                                path: fragment.outline.clone(),
                                margin: 0.0,
                            },
                            bounds,
                        });
                        index += 1;
                    }
                }
            }
        }
        let layers = per_layer
            .into_iter()
            .map(|(layer, objects)| (layer, RTree::bulk_load(objects)))
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.keys().copied()
    }

    pub fn objects(&self, layer: LayerId) -> impl Iterator<Item = &CopperObject> {
        self.layers.get(&layer).into_iter().flat_map(|tree| tree.iter())
    }

    pub fn all(&self) -> impl Iterator<Item = &CopperObject> {
        self.layers.values().flat_map(|tree| tree.iter())
    }

    /// Objects on `layer` whose bounds intersect `rect`.
    pub fn near(&self, layer: LayerId, rect: &Rect) -> Vec<&CopperObject> {
        let Some(tree) = self.layers.get(&layer) else {
            return Vec::new();
        };
        let envelope = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        tree.locate_in_envelope_intersecting(&envelope).collect()
    }

    /// Pairs on the same layer whose bounds come within `distance`, each pair once.
    pub fn candidate_pairs(&self, distance: f64) -> Vec<(&CopperObject, &CopperObject)> {
        let mut pairs = Vec::new();
        for layer in self.layers() {
            for a in self.objects(layer) {
                for b in self.near(layer, &a.bounds.expanded(distance)) {
                    if a.index < b.index {
                        pairs.push((a, b));
                    }
                }
            }
        }
        pairs.sort_by_key(|(a, b)| (a.index, b.index));
        pairs
    }
}
