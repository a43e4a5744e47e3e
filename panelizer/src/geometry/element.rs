//! Geometric elements extracted from document nodes.
//!
//! A node is geometric when it carries either a full segment
//! (`x1`, `y1`, `x2`, `y2`) or a point (`x`, `y`). Everything else (texts
//! without position, descriptions, attributes without coordinates) is simply
//! not applicable and is skipped by callers.

use crate::core::PanelizerError;
use crate::parser::board::{layer_attribute, length_attribute};
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

/// Two-endpoint bounding primitive in millimeters.
///
/// Coordinates are fixed at construction, so `min_x() <= max_x()` and
/// `min_y() <= max_y()` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricElement {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    layer: Option<i32>,
    source: NodeId,
    placement: Option<NodeId>,
}

/// Result of one extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extraction {
    Found(GeometricElement),
    NotApplicable,
}

impl Extraction {
    pub fn found(self) -> Option<GeometricElement> {
        match self {
            Extraction::Found(element) => Some(element),
            Extraction::NotApplicable => None,
        }
    }
}

type Strategy = fn(&XmlDocument, NodeId, Unit) -> Result<Extraction, PanelizerError>;

/// Tried in order; first match wins.
const STRATEGIES: [Strategy; 2] = [segment_shape, point_shape];

fn segment_shape(doc: &XmlDocument, id: NodeId, unit: Unit) -> Result<Extraction, PanelizerError> {
    let x1 = length_attribute(doc, id, "x1", unit)?;
    let y1 = length_attribute(doc, id, "y1", unit)?;
    let x2 = length_attribute(doc, id, "x2", unit)?;
    let y2 = length_attribute(doc, id, "y2", unit)?;
    match (x1, y1, x2, y2) {
        (Some(x1), Some(y1), Some(x2), Some(y2)) => Ok(Extraction::Found(GeometricElement::new(
            x1,
            y1,
            x2,
            y2,
            layer_attribute(doc, id)?,
            id,
        ))),
        _ => Ok(Extraction::NotApplicable),
    }
}

fn point_shape(doc: &XmlDocument, id: NodeId, unit: Unit) -> Result<Extraction, PanelizerError> {
    let x = length_attribute(doc, id, "x", unit)?;
    let y = length_attribute(doc, id, "y", unit)?;
    match (x, y) {
        (Some(x), Some(y)) => Ok(Extraction::Found(GeometricElement::point(
            x,
            y,
            layer_attribute(doc, id)?,
            id,
        ))),
        _ => Ok(Extraction::NotApplicable),
    }
}

/// Which way an origin shift moves coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    /// Package-relative template into absolute board space.
    ToBoard,
    /// Absolute board space back into package-relative coordinates.
    ToPackage,
}

impl ShiftDirection {
    fn sign(self) -> f64 {
        match self {
            ShiftDirection::ToBoard => 1.0,
            ShiftDirection::ToPackage => -1.0,
        }
    }
}

impl GeometricElement {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, layer: Option<i32>, source: NodeId) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            layer,
            source,
            placement: None,
        }
    }

    pub fn point(x: f64, y: f64, layer: Option<i32>, source: NodeId) -> Self {
        Self::new(x, y, x, y, layer, source)
    }

    /// Run the extraction strategies against a node.
    pub fn extract(doc: &XmlDocument, id: NodeId, unit: Unit) -> Result<Extraction, PanelizerError> {
        for strategy in STRATEGIES {
            if let found @ Extraction::Found(_) = strategy(doc, id, unit)? {
                return Ok(found);
            }
        }
        Ok(Extraction::NotApplicable)
    }

    /// Shift by the `(x, y)` of a placement node. `None` when the placement
    /// has no position.
    pub fn shifted_by(
        &self,
        doc: &XmlDocument,
        placement: NodeId,
        direction: ShiftDirection,
        unit: Unit,
    ) -> Result<Option<GeometricElement>, PanelizerError> {
        let ox = length_attribute(doc, placement, "x", unit)?;
        let oy = length_attribute(doc, placement, "y", unit)?;
        let (Some(ox), Some(oy)) = (ox, oy) else {
            return Ok(None);
        };
        let dx = ox * direction.sign();
        let dy = oy * direction.sign();
        Ok(Some(Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
            layer: self.layer,
            source: self.source,
            placement: Some(placement),
        }))
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn layer(&self) -> Option<i32> {
        self.layer
    }

    /// Node the coordinates were read from. For placed-component geometry
    /// this is the package template node.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Placement that supplied the origin shift, if any.
    pub fn placement(&self) -> Option<NodeId> {
        self.placement
    }

    pub fn min_x(&self) -> f64 {
        self.x1.min(self.x2)
    }

    pub fn min_y(&self) -> f64 {
        self.y1.min(self.y2)
    }

    pub fn max_x(&self) -> f64 {
        self.x1.max(self.x2)
    }

    pub fn max_y(&self) -> f64 {
        self.y1.max(self.y2)
    }

    pub fn is_point(&self) -> bool {
        self.x1 == self.x2 && self.y1 == self.y2
    }
}
