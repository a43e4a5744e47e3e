//! Orientation-independent equality for two-endpoint geometry.
//!
//! Two nodes are the same segment when both extract as geometry and their
//! endpoints match in either direction. The hash XORs per-coordinate hashes,
//! which is symmetric under an endpoint swap and therefore consistent with
//! the equality.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::core::PanelizerError;
use crate::geometry::element::GeometricElement;
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

/// Hashable view of a [`GeometricElement`] keyed only by its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct SegmentKey {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl SegmentKey {
    pub fn new(element: &GeometricElement) -> Self {
        Self {
            x1: element.x1(),
            y1: element.y1(),
            x2: element.x2(),
            y2: element.y2(),
        }
    }
}

impl PartialEq for SegmentKey {
    fn eq(&self, other: &Self) -> bool {
        (self.x1 == other.x1 && self.y1 == other.y1 && self.x2 == other.x2 && self.y2 == other.y2)
            || (self.x1 == other.x2
                && self.y1 == other.y2
                && self.x2 == other.x1
                && self.y2 == other.y1)
    }
}

impl Eq for SegmentKey {}

fn coordinate_hash(v: f64) -> u64 {
    // 0.0 and -0.0 compare equal, so they must hash equal too
    let normalized = if v == 0.0 { 0.0f64 } else { v };
    let mut hasher = DefaultHasher::new();
    normalized.to_bits().hash(&mut hasher);
    hasher.finish()
}

impl Hash for SegmentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = coordinate_hash(self.x1)
            ^ coordinate_hash(self.y1)
            ^ coordinate_hash(self.x2)
            ^ coordinate_hash(self.y2);
        combined.hash(state);
    }
}

/// Compares document nodes by their extracted geometry.
pub struct SameGeometry {
    unit: Unit,
}

impl SameGeometry {
    pub fn new(unit: Unit) -> Self {
        Self { unit }
    }

    fn key(&self, doc: &XmlDocument, id: NodeId) -> Result<Option<SegmentKey>, PanelizerError> {
        Ok(GeometricElement::extract(doc, id, self.unit)?
            .found()
            .map(|el| SegmentKey::new(&el)))
    }

    /// Nodes without geometry are never equal to anything.
    pub fn equals(&self, doc: &XmlDocument, lhs: NodeId, rhs: NodeId) -> Result<bool, PanelizerError> {
        match (self.key(doc, lhs)?, self.key(doc, rhs)?) {
            (Some(l), Some(r)) => Ok(l == r),
            _ => Ok(false),
        }
    }

    pub fn hash(&self, doc: &XmlDocument, id: NodeId) -> Result<u64, PanelizerError> {
        let mut hasher = DefaultHasher::new();
        match self.key(doc, id)? {
            Some(key) => key.hash(&mut hasher),
            None => 0u64.hash(&mut hasher),
        }
        Ok(hasher.finish())
    }

    /// Detach every `wire` child of `container` that coincides with an
    /// earlier wire on the same layer. Returns the number removed.
    pub fn merge_coincident_wires(
        &self,
        doc: &mut XmlDocument,
        container: NodeId,
    ) -> Result<usize, PanelizerError> {
        let wires: Vec<NodeId> = doc.children_named(container, "wire").collect();
        let mut seen: HashSet<(Option<i32>, SegmentKey)> = HashSet::new();
        let mut duplicates = Vec::new();

        for wire in wires {
            let Some(element) = GeometricElement::extract(doc, wire, self.unit)?.found() else {
                continue;
            };
            if !seen.insert((element.layer(), SegmentKey::new(&element))) {
                duplicates.push(wire);
            }
        }

        for wire in &duplicates {
            tracing::debug!("Removing coincident wire node {}", wire.index());
            doc.detach(*wire);
        }
        Ok(duplicates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"<plain>
        <wire x1="0" y1="0" x2="10" y2="0" layer="20"/>
        <wire x1="10" y1="0" x2="0" y2="0" layer="20"/>
        <wire x1="10" y1="0" x2="0" y2="0" layer="46"/>
        <wire x1="0" y1="0" x2="10" y2="1" layer="20"/>
        <text size="1">no geometry</text>
        <wire x1="-0" y1="0" x2="10" y2="0" layer="20"/>
    </plain>"#;

    fn children(doc: &XmlDocument) -> Vec<NodeId> {
        doc.child_elements(doc.root()).collect()
    }

    #[test]
    fn test_equal_in_either_orientation() {
        let doc = XmlDocument::parse(PLAIN).unwrap();
        let c = children(&doc);
        let cmp = SameGeometry::new(Unit::Millimeter);

        assert!(cmp.equals(&doc, c[0], c[1]).unwrap());
        assert!(cmp.equals(&doc, c[1], c[0]).unwrap());
        assert!(!cmp.equals(&doc, c[0], c[3]).unwrap());
        assert_eq!(cmp.hash(&doc, c[0]).unwrap(), cmp.hash(&doc, c[1]).unwrap());
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        let doc = XmlDocument::parse(PLAIN).unwrap();
        let c = children(&doc);
        let cmp = SameGeometry::new(Unit::Millimeter);
        assert!(cmp.equals(&doc, c[0], c[5]).unwrap());
        assert_eq!(cmp.hash(&doc, c[0]).unwrap(), cmp.hash(&doc, c[5]).unwrap());
    }

    #[test]
    fn test_no_geometry_never_equal() {
        let doc = XmlDocument::parse(PLAIN).unwrap();
        let c = children(&doc);
        let cmp = SameGeometry::new(Unit::Millimeter);
        assert!(!cmp.equals(&doc, c[4], c[4]).unwrap());
    }

    #[test]
    fn test_merge_coincident_wires_respects_layer() {
        let mut doc = XmlDocument::parse(PLAIN).unwrap();
        let c = children(&doc);
        let root = doc.root();
        let cmp = SameGeometry::new(Unit::Millimeter);

        let removed = cmp.merge_coincident_wires(&mut doc, root).unwrap();
        assert_eq!(removed, 2);
        assert!(doc.is_attached(c[0]));
        assert!(!doc.is_attached(c[1]));
        assert!(doc.is_attached(c[2]));
        assert!(doc.is_attached(c[3]));
        assert!(!doc.is_attached(c[5]));
    }
}
