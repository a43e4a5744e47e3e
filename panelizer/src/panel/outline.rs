//! Board outline resolution.
//!
//! The outline is every piece of geometry on the outline layer, from
//! placed components (shifted into board space) and from the drawing plane.
//! Its bounding box is the board size that tiling steps by. The original
//! outline nodes are detached afterwards since the panel gets a single
//! synthesized border instead.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::PanelizerError;
use crate::geometry::element::GeometricElement;
use crate::panel::library::PackageIndex;
use crate::parser::board::BoardLayout;
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

/// Bounding box of the board outline, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlineBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl OutlineBox {
    /// Box over all elements; `None` for an empty set.
    pub fn from_elements(elements: &[GeometricElement]) -> Option<Self> {
        let first = elements.first()?;
        let mut bbox = Self {
            min_x: first.min_x(),
            min_y: first.min_y(),
            max_x: first.max_x(),
            max_y: first.max_y(),
        };
        for el in &elements[1..] {
            bbox.min_x = bbox.min_x.min(el.min_x());
            bbox.min_y = bbox.min_y.min(el.min_y());
            bbox.max_x = bbox.max_x.max(el.max_x());
            bbox.max_y = bbox.max_y.max(el.max_y());
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Outline box plus the nodes that were detached to produce it.
#[derive(Debug, Clone)]
pub struct ResolvedOutline {
    pub bbox: OutlineBox,
    pub removed: Vec<NodeId>,
}

pub struct OutlineResolver<'a> {
    index: &'a PackageIndex,
    unit: Unit,
    layer: i32,
}

impl<'a> OutlineResolver<'a> {
    pub fn new(index: &'a PackageIndex, unit: Unit, layer: i32) -> Self {
        Self { index, unit, layer }
    }

    /// All outline-layer geometry of the board, without touching the tree.
    pub fn collect(
        &self,
        doc: &XmlDocument,
        layout: &BoardLayout,
    ) -> Result<Vec<GeometricElement>, PanelizerError> {
        let mut outline = Vec::new();

        for placement in layout.placed_elements(doc) {
            for element in self.index.placed_geometry(doc, placement, self.unit)? {
                // templates detached by an earlier run no longer count
                if element.layer() == Some(self.layer) && doc.is_attached(element.source()) {
                    outline.push(element);
                }
            }
        }

        for plain in &layout.plains {
            for primitive in doc.child_elements(*plain) {
                if let Some(element) = GeometricElement::extract(doc, primitive, self.unit)?.found() {
                    if element.layer() == Some(self.layer) {
                        outline.push(element);
                    }
                }
            }
        }

        Ok(outline)
    }

    /// Compute the outline box and detach every contributing node. Nothing
    /// is detached when the outline is missing or has zero width or height.
    ///
    /// Not idempotent: a second run over the same document finds no outline.
    pub fn resolve(
        &self,
        doc: &mut XmlDocument,
        layout: &BoardLayout,
    ) -> Result<ResolvedOutline, PanelizerError> {
        let outline = self.collect(doc, layout)?;
        let bbox = OutlineBox::from_elements(&outline)
            .ok_or(PanelizerError::MissingOutline { layer: self.layer })?;
        if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(PanelizerError::DegenerateOutline {
                width: bbox.width(),
                height: bbox.height(),
            });
        }

        // templates shared by several placements are detached once
        let removed: BTreeSet<NodeId> = outline.iter().map(|el| el.source()).collect();
        for node in &removed {
            tracing::debug!(
                "Detaching outline node {} ({})",
                node.index(),
                doc.name(*node).unwrap_or_default()
            );
            doc.detach(*node);
        }

        tracing::info!(
            "Original board: size=({}, {}), ({}, {}) - ({}, {})",
            bbox.width(),
            bbox.height(),
            bbox.min_x,
            bbox.min_y,
            bbox.max_x,
            bbox.max_y
        );

        Ok(ResolvedOutline {
            bbox,
            removed: removed.into_iter().collect(),
        })
    }
}
