//! Tile duplication.
//!
//! Source node lists are captured once, before the first tile is produced,
//! so clones appended to a container are never picked up as sources for a
//! later tile. Each clone is rewritten node by node:
//!
//! 1. silkscreen name layers 25/26 become placement layers 21/22
//! 2. a `NAME` attribute becomes a literal text in the primary plain
//! 3. `element` references get the tile suffix
//! 4. `x`/`x1`/`x2` and `y`/`y1`/`y2` are offset
//!
//! and finally the clone root's `name` gets the tile suffix.

use serde::Serialize;

use crate::core::PanelizerError;
use crate::panel::tiling::{TileGrid, TileOffset};
use crate::parser::board::{format_number, layer_attribute, number_attribute, BoardLayout, PrimaryContainers};
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

const X_ATTRIBUTES: [&str; 3] = ["x", "x1", "x2"];
const Y_ATTRIBUTES: [&str; 3] = ["y", "y1", "y2"];

/// Top/bottom name layers and the placement layers they move to.
const NAME_LAYER_REMAP: [(i32, i32); 2] = [(25, 21), (26, 22)];

/// Source nodes of every collection, captured before tiling.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    /// Each plain container with its children at capture time.
    pub plains: Vec<(NodeId, Vec<NodeId>)>,
    pub elements: Vec<NodeId>,
    pub signals: Vec<NodeId>,
}

impl SourceSnapshot {
    pub fn capture(doc: &XmlDocument, layout: &BoardLayout) -> Self {
        Self {
            plains: layout
                .plains
                .iter()
                .map(|plain| (*plain, doc.child_elements(*plain).collect()))
                .collect(),
            elements: layout
                .elements
                .iter()
                .flat_map(|section| doc.child_elements(*section))
                .collect(),
            signals: layout
                .signals
                .iter()
                .flat_map(|section| doc.child_elements(*section))
                .collect(),
        }
    }

    pub fn plain_count(&self) -> usize {
        self.plains.iter().map(|(_, list)| list.len()).sum()
    }
}

/// Counters over all generated tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DuplicationStats {
    pub plain: usize,
    pub elements: usize,
    pub signals: usize,
    pub realized_names: usize,
}

/// Extent of the finished panel, in millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PanelExtent {
    pub width: f64,
    pub height: f64,
    pub max_x_offset: f64,
    pub max_y_offset: f64,
}

/// Result of running the engine over a grid.
#[derive(Debug, Clone)]
pub struct Duplication {
    pub extent: PanelExtent,
    pub tiles: Vec<TileOffset>,
    pub stats: DuplicationStats,
}

pub struct DuplicationEngine<'a> {
    unit: Unit,
    primary: &'a PrimaryContainers,
}

impl<'a> DuplicationEngine<'a> {
    pub fn new(unit: Unit, primary: &'a PrimaryContainers) -> Self {
        Self { unit, primary }
    }

    /// Duplicate every snapshot collection once per tile of `grid`.
    pub fn run(
        &self,
        doc: &mut XmlDocument,
        snapshot: &SourceSnapshot,
        grid: &TileGrid,
    ) -> Result<Duplication, PanelizerError> {
        let mut stats = DuplicationStats::default();
        let mut tiles = Vec::with_capacity(grid.tile_count());

        for tile in grid {
            self.duplicate_tile(doc, snapshot, &tile, &mut stats)?;
            tracing::debug!("Dup[{}]: ({}, {})", tile.index, tile.x_offset, tile.y_offset);
            tiles.push(tile);
        }

        let (max_x_offset, max_y_offset) = tiles.iter().fold((0.0f64, 0.0f64), |(mx, my), t| {
            (mx.max(t.x_offset), my.max(t.y_offset))
        });
        let extent = PanelExtent {
            width: grid.board_width() + max_x_offset,
            height: grid.board_height() + max_y_offset,
            max_x_offset,
            max_y_offset,
        };

        tracing::info!(
            "Panelized: tiles={}, size=({}, {})",
            tiles.len(),
            extent.width,
            extent.height
        );

        Ok(Duplication { extent, tiles, stats })
    }

    fn duplicate_tile(
        &self,
        doc: &mut XmlDocument,
        snapshot: &SourceSnapshot,
        tile: &TileOffset,
        stats: &mut DuplicationStats,
    ) -> Result<(), PanelizerError> {
        for (container, sources) in &snapshot.plains {
            for source in sources {
                stats.realized_names += self.duplicate(doc, *source, *container, tile)?.realized_names;
                stats.plain += 1;
            }
        }

        if !snapshot.elements.is_empty() {
            let target = self.primary.elements.ok_or_else(|| {
                PanelizerError::InvalidStructure("no elements section for duplicated components".to_string())
            })?;
            for source in &snapshot.elements {
                stats.realized_names += self.duplicate(doc, *source, target, tile)?.realized_names;
                stats.elements += 1;
            }
        }

        if !snapshot.signals.is_empty() {
            let target = self.primary.signals.ok_or_else(|| {
                PanelizerError::InvalidStructure("no signals section for duplicated signals".to_string())
            })?;
            for source in &snapshot.signals {
                stats.realized_names += self.duplicate(doc, *source, target, tile)?.realized_names;
                stats.signals += 1;
            }
        }

        Ok(())
    }

    /// Clone `source`, rewrite the clone for `tile` and append it to
    /// `target`.
    pub fn duplicate(
        &self,
        doc: &mut XmlDocument,
        source: NodeId,
        target: NodeId,
        tile: &TileOffset,
    ) -> Result<DuplicatedNode, PanelizerError> {
        let clone = doc.deep_clone(source);
        let root_name = doc.attribute(clone, "name").map(str::to_string);
        let suffix = tile.suffix();
        let dx = self.unit.from_millimeters(tile.x_offset);
        let dy = self.unit.from_millimeters(tile.y_offset);
        let mut realized_names = 0;

        for node in doc.descendants_and_self(clone) {
            remap_name_layer(doc, node)?;

            if let Some(name) = &root_name {
                if node != clone && realize_name(doc, node, name, self.primary.plain) {
                    realized_names += 1;
                }
            }

            if let Some(reference) = doc.attribute(node, "element") {
                let updated = format!("{}{}", reference, suffix);
                doc.set_attribute(node, "element", updated);
            }

            for attribute in X_ATTRIBUTES {
                offset_attribute(doc, node, attribute, dx)?;
            }
            for attribute in Y_ATTRIBUTES {
                offset_attribute(doc, node, attribute, dy)?;
            }
        }

        if let Some(name) = root_name {
            doc.set_attribute(clone, "name", format!("{}{}", name, suffix));
        }

        doc.append_child(target, clone);
        Ok(DuplicatedNode {
            root: clone,
            realized_names,
        })
    }
}

/// A clone appended by [`DuplicationEngine::duplicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatedNode {
    pub root: NodeId,
    pub realized_names: usize,
}

fn remap_name_layer(doc: &mut XmlDocument, node: NodeId) -> Result<(), PanelizerError> {
    let Some(layer) = layer_attribute(doc, node)? else {
        return Ok(());
    };
    if let Some((_, to)) = NAME_LAYER_REMAP.iter().find(|(from, _)| *from == layer) {
        doc.set_attribute(node, "layer", to.to_string());
    }
    Ok(())
}

/// Turn `<attribute name="NAME" .../>` into `<text ...>{name}</text>` and
/// move it to the primary plain container.
fn realize_name(doc: &mut XmlDocument, node: NodeId, name: &str, plain: NodeId) -> bool {
    if doc.name(node) != Some("attribute") || doc.attribute(node, "name") != Some("NAME") {
        return false;
    }
    doc.rename(node, "text");
    doc.set_text(node, name);
    doc.remove_attribute(node, "name");
    doc.append_child(plain, node);
    true
}

fn offset_attribute(
    doc: &mut XmlDocument,
    node: NodeId,
    attribute: &str,
    offset: f64,
) -> Result<(), PanelizerError> {
    if let Some(value) = number_attribute(doc, node, attribute)? {
        doc.set_attribute(node, attribute, format_number(value + offset));
    }
    Ok(())
}
