//! Panel border and cut-guide synthesis.
//!
//! Segment positions are computed in millimeters by pure functions and
//! only converted to document units when the wires are written.

use serde::Serialize;

use crate::panel::duplicate::PanelExtent;
use crate::panel::outline::OutlineBox;
use crate::panel::tiling::TileGrid;
use crate::parser::board::format_number;
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

pub const MARKER_TEXT: &str = "V-CUT";
pub const MARKER_SIZE: f64 = 1.27;
/// Distance between a guide's outer end and its marker.
pub const MARKER_GAP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Segment {
    fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Guide {
    pub segment: Segment,
    pub orientation: Orientation,
}

/// Panel rectangle as bottom, right, top, left.
pub fn border_segments(origin_x: f64, origin_y: f64, extent: &PanelExtent) -> [Segment; 4] {
    let (x0, y0) = (origin_x, origin_y);
    let (x1, y1) = (origin_x + extent.width, origin_y + extent.height);
    [
        Segment::new(x0, y0, x1, y0),
        Segment::new(x1, y0, x1, y1),
        Segment::new(x1, y1, x0, y1),
        Segment::new(x0, y1, x0, y0),
    ]
}

/// One guide per internal row and column boundary, overhanging the panel
/// by `post_length` on both ends. Horizontal guides come first.
pub fn guide_segments(
    bbox: &OutlineBox,
    grid: &TileGrid,
    extent: &PanelExtent,
    post_length: f64,
) -> Vec<Guide> {
    let left = bbox.min_x - post_length;
    let right = bbox.min_x + extent.width + post_length;
    let bottom = bbox.min_y - post_length;
    let top = bbox.min_y + extent.height + post_length;

    let horizontal = grid.row_boundaries().map(|offset| {
        let y = bbox.min_y + offset;
        Guide {
            segment: Segment::new(left, y, right, y),
            orientation: Orientation::Horizontal,
        }
    });
    let vertical = grid.column_boundaries().map(|offset| {
        let x = bbox.min_x + offset;
        Guide {
            segment: Segment::new(x, bottom, x, top),
            orientation: Orientation::Vertical,
        }
    });
    horizontal.chain(vertical).collect()
}

/// Anchor of the marker for `guide`: past the right end of a horizontal
/// guide, past the top end of a vertical one.
pub fn marker_position(guide: &Guide) -> (f64, f64) {
    let s = &guide.segment;
    match guide.orientation {
        Orientation::Horizontal => (s.x1.max(s.x2) + MARKER_GAP, s.y1),
        Orientation::Vertical => (s.x1, s.y1.max(s.y2) + MARKER_GAP),
    }
}

/// Counts of generated nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuideSummary {
    pub border: usize,
    pub guides: usize,
    pub markers: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GuideStyle {
    pub outline_layer: i32,
    pub guide_layer: i32,
    pub stroke_width: f64,
    pub post_length: f64,
    pub markers: bool,
}

pub struct GuideGenerator {
    unit: Unit,
    style: GuideStyle,
}

impl GuideGenerator {
    pub fn new(unit: Unit, style: GuideStyle) -> Self {
        Self { unit, style }
    }

    /// Append border wires, guide wires and optional markers to `plain`.
    pub fn generate(
        &self,
        doc: &mut XmlDocument,
        plain: NodeId,
        bbox: &OutlineBox,
        grid: &TileGrid,
        extent: &PanelExtent,
    ) -> GuideSummary {
        let mut summary = GuideSummary::default();

        for segment in border_segments(bbox.min_x, bbox.min_y, extent) {
            self.append_wire(doc, plain, &segment, self.style.outline_layer);
            summary.border += 1;
        }

        for guide in guide_segments(bbox, grid, extent, self.style.post_length) {
            self.append_wire(doc, plain, &guide.segment, self.style.guide_layer);
            summary.guides += 1;
            if self.style.markers {
                self.append_marker(doc, plain, &guide);
                summary.markers += 1;
            }
        }

        tracing::info!(
            "Generated border ({} wires), {} guide(s), {} marker(s)",
            summary.border,
            summary.guides,
            summary.markers
        );
        summary
    }

    fn length(&self, mm: f64) -> String {
        format_number(self.unit.from_millimeters(mm))
    }

    fn append_wire(&self, doc: &mut XmlDocument, plain: NodeId, segment: &Segment, layer: i32) {
        let wire = doc.create_element(
            "wire",
            [
                ("x1", self.length(segment.x1)),
                ("y1", self.length(segment.y1)),
                ("x2", self.length(segment.x2)),
                ("y2", self.length(segment.y2)),
                ("width", self.length(self.style.stroke_width)),
                ("layer", layer.to_string()),
            ],
        );
        doc.append_child(plain, wire);
    }

    fn append_marker(&self, doc: &mut XmlDocument, plain: NodeId, guide: &Guide) {
        let (x, y) = marker_position(guide);
        let mut attributes = vec![
            ("x", self.length(x)),
            ("y", self.length(y)),
            ("size", self.length(MARKER_SIZE)),
            ("layer", self.style.guide_layer.to_string()),
        ];
        if guide.orientation == Orientation::Vertical {
            attributes.push(("rot", "R90".to_string()));
        }
        let text = doc.create_element("text", attributes);
        doc.set_text(text, MARKER_TEXT);
        doc.append_child(plain, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> (OutlineBox, TileGrid, PanelExtent) {
        let bbox = OutlineBox { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 8.0 };
        let grid = TileGrid::new(10.0, 8.0, 35.0, 30.0).unwrap();
        let extent = PanelExtent { width: 30.0, height: 24.0, max_x_offset: 20.0, max_y_offset: 16.0 };
        (bbox, grid, extent)
    }

    fn style(markers: bool) -> GuideStyle {
        GuideStyle {
            outline_layer: 20,
            guide_layer: 46,
            stroke_width: 0.254,
            post_length: 5.0,
            markers,
        }
    }

    #[test]
    fn test_border_traversal_order() {
        let (_, _, extent) = reference();
        let border = border_segments(0.0, 0.0, &extent);
        assert_eq!(border[0], Segment::new(0.0, 0.0, 30.0, 0.0));
        assert_eq!(border[1], Segment::new(30.0, 0.0, 30.0, 24.0));
        assert_eq!(border[2], Segment::new(30.0, 24.0, 0.0, 24.0));
        assert_eq!(border[3], Segment::new(0.0, 24.0, 0.0, 0.0));
    }

    #[test]
    fn test_border_respects_origin() {
        let extent = PanelExtent { width: 4.0, height: 2.0, ..Default::default() };
        let border = border_segments(-1.0, 3.0, &extent);
        assert_eq!(border[0], Segment::new(-1.0, 3.0, 3.0, 3.0));
        assert_eq!(border[2], Segment::new(3.0, 5.0, -1.0, 5.0));
    }

    #[test]
    fn test_guides_at_internal_boundaries() {
        let (bbox, grid, extent) = reference();
        let guides = guide_segments(&bbox, &grid, &extent, 5.0);
        assert_eq!(guides.len(), 4);

        let horizontal: Vec<_> = guides
            .iter()
            .filter(|g| g.orientation == Orientation::Horizontal)
            .map(|g| g.segment)
            .collect();
        assert_eq!(
            horizontal,
            vec![Segment::new(-5.0, 8.0, 35.0, 8.0), Segment::new(-5.0, 16.0, 35.0, 16.0)]
        );

        let vertical: Vec<_> = guides
            .iter()
            .filter(|g| g.orientation == Orientation::Vertical)
            .map(|g| g.segment)
            .collect();
        assert_eq!(
            vertical,
            vec![Segment::new(10.0, -5.0, 10.0, 29.0), Segment::new(20.0, -5.0, 20.0, 29.0)]
        );
    }

    #[test]
    fn test_no_guides_for_single_board() {
        let bbox = OutlineBox { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 8.0 };
        let grid = TileGrid::new(10.0, 8.0, 5.0, 5.0).unwrap();
        let extent = PanelExtent { width: 10.0, height: 8.0, ..Default::default() };
        assert!(guide_segments(&bbox, &grid, &extent, 5.0).is_empty());
    }

    #[test]
    fn test_no_guides_outside_single_column() {
        let bbox = OutlineBox { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 8.0 };
        let grid = TileGrid::new(10.0, 8.0, 5.0, 30.0).unwrap();
        let extent = PanelExtent { width: 10.0, height: 8.0, ..Default::default() };
        assert!(guide_segments(&bbox, &grid, &extent, 5.0).is_empty());
    }

    #[test]
    fn test_marker_positions() {
        let (bbox, grid, extent) = reference();
        let guides = guide_segments(&bbox, &grid, &extent, 5.0);
        assert_eq!(marker_position(&guides[0]), (35.5, 8.0));
        assert_eq!(marker_position(&guides[2]), (10.0, 29.5));
    }

    #[test]
    fn test_generate_writes_wires() {
        let (bbox, grid, extent) = reference();
        let mut doc = XmlDocument::new("plain");
        let plain = doc.root();

        let summary = GuideGenerator::new(Unit::Millimeter, style(false))
            .generate(&mut doc, plain, &bbox, &grid, &extent);
        assert_eq!(summary, GuideSummary { border: 4, guides: 4, markers: 0 });

        let wires: Vec<_> = doc.children_named(plain, "wire").collect();
        assert_eq!(wires.len(), 8);
        assert_eq!(doc.attribute(wires[0], "layer"), Some("20"));
        assert_eq!(doc.attribute(wires[0], "width"), Some("0.254"));
        assert_eq!(doc.attribute(wires[1], "x1"), Some("30"));
        assert_eq!(doc.attribute(wires[4], "layer"), Some("46"));
        assert_eq!(doc.attribute(wires[4], "x1"), Some("-5"));
        assert_eq!(doc.attribute(wires[4], "y1"), Some("8"));
    }

    #[test]
    fn test_generate_markers() {
        let (bbox, grid, extent) = reference();
        let mut doc = XmlDocument::new("plain");
        let plain = doc.root();

        let summary = GuideGenerator::new(Unit::Millimeter, style(true))
            .generate(&mut doc, plain, &bbox, &grid, &extent);
        assert_eq!(summary.markers, 4);

        let texts: Vec<_> = doc.children_named(plain, "text").collect();
        assert_eq!(texts.len(), 4);
        assert!(texts.iter().all(|t| doc.text(*t) == MARKER_TEXT));
        assert!(!doc.has_attribute(texts[0], "rot"));
        assert_eq!(doc.attribute(texts[3], "rot"), Some("R90"));
        assert_eq!(doc.attribute(texts[3], "layer"), Some("46"));
    }

    #[test]
    fn test_generate_converts_to_document_unit() {
        let bbox = OutlineBox { min_x: 0.0, min_y: 0.0, max_x: 25.4, max_y: 25.4 };
        let grid = TileGrid::new(25.4, 25.4, 20.0, 20.0).unwrap();
        let extent = PanelExtent { width: 25.4, height: 25.4, ..Default::default() };
        let mut doc = XmlDocument::new("plain");
        let plain = doc.root();

        GuideGenerator::new(Unit::Inch, style(false)).generate(&mut doc, plain, &bbox, &grid, &extent);
        let first = doc.children_named(plain, "wire").next().unwrap();
        assert_eq!(doc.attribute(first, "x2"), Some("1"));
        assert_eq!(doc.attribute(first, "y1"), Some("0"));
    }
}
