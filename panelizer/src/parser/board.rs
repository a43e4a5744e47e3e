//! Board section resolution and typed attribute access.
//!
//! A board document is shaped like:
//!
//! ```text
//! eagle
//! └── drawing
//!     ├── grid[unitdist]
//!     └── board
//!         ├── plain/*                               drawing-plane primitives
//!         ├── libraries/library/packages/package/*  package templates
//!         ├── elements/element                      placed components
//!         └── signals/signal/*                      nets
//! ```
//!
//! The sections are located once and handed to the pipeline as plain
//! [`NodeId`]s.

use crate::core::PanelizerError;
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

/// Located sections of the first board in a document.
#[derive(Debug, Clone)]
pub struct BoardLayout {
    pub drawing: NodeId,
    pub board: NodeId,
    pub libraries: Option<NodeId>,
    pub plains: Vec<NodeId>,
    pub elements: Vec<NodeId>,
    pub signals: Vec<NodeId>,
}

/// Shared insertion targets for duplicated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryContainers {
    pub plain: NodeId,
    pub elements: Option<NodeId>,
    pub signals: Option<NodeId>,
}

impl BoardLayout {
    pub fn resolve(doc: &XmlDocument) -> Result<Self, PanelizerError> {
        let drawing = doc
            .first_child_named(doc.root(), "drawing")
            .ok_or_else(|| PanelizerError::InvalidStructure("missing drawing section".to_string()))?;

        let mut boards = doc.children_named(drawing, "board");
        let board = boards
            .next()
            .ok_or_else(|| PanelizerError::InvalidStructure("missing board section".to_string()))?;
        let extra = boards.count();
        if extra > 0 {
            tracing::warn!("Document has {} additional board section(s); only the first is panelized", extra);
        }

        Ok(Self {
            drawing,
            board,
            libraries: doc.first_child_named(board, "libraries"),
            plains: doc.children_named(board, "plain").collect(),
            elements: doc.children_named(board, "elements").collect(),
            signals: doc.children_named(board, "signals").collect(),
        })
    }

    /// First plain/elements/signals container of the board.
    pub fn primary(&self) -> Result<PrimaryContainers, PanelizerError> {
        let plain = self.plains.first().copied().ok_or_else(|| {
            PanelizerError::InvalidStructure("board has no plain section".to_string())
        })?;
        Ok(PrimaryContainers {
            plain,
            elements: self.elements.first().copied(),
            signals: self.signals.first().copied(),
        })
    }

    /// All placed component nodes, across every elements section.
    pub fn placed_elements<'a>(&'a self, doc: &'a XmlDocument) -> impl Iterator<Item = NodeId> + 'a {
        self.elements
            .iter()
            .flat_map(move |section| doc.children_named(*section, "element"))
    }
}

/// Unit declared by the first `grid[unitdist]`; millimeters when absent.
pub fn declared_unit(doc: &XmlDocument, layout: &BoardLayout) -> Result<Unit, PanelizerError> {
    doc.children_named(layout.drawing, "grid")
        .find_map(|grid| doc.attribute(grid, "unitdist"))
        .map(str::parse::<Unit>)
        .unwrap_or(Ok(Unit::Millimeter))
}

fn malformed(doc: &XmlDocument, id: NodeId, attribute: &str, value: &str) -> PanelizerError {
    PanelizerError::MalformedNumericAttribute {
        element: doc.name(id).unwrap_or_default().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// Raw numeric attribute. Missing is `None`; present but unparseable (or
/// non-finite) is an error.
pub fn number_attribute(
    doc: &XmlDocument,
    id: NodeId,
    attribute: &str,
) -> Result<Option<f64>, PanelizerError> {
    match doc.attribute(id, attribute) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(malformed(doc, id, attribute, raw)),
        },
    }
}

/// Numeric attribute scaled to millimeters.
pub fn length_attribute(
    doc: &XmlDocument,
    id: NodeId,
    attribute: &str,
    unit: Unit,
) -> Result<Option<f64>, PanelizerError> {
    Ok(number_attribute(doc, id, attribute)?.map(|v| unit.to_millimeters(v)))
}

/// Optional integer `layer` attribute.
pub fn layer_attribute(doc: &XmlDocument, id: NodeId) -> Result<Option<i32>, PanelizerError> {
    match doc.attribute(id, "layer") {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| malformed(doc, id, "layer", raw)),
    }
}

/// Shortest round-trip text for a number written into an attribute.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}
