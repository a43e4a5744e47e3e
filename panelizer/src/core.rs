//! Panelization pipeline shared by the CLI and library callers.
//! Holds the options, the crate error type and the run report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::compare::SameGeometry;
use crate::panel::duplicate::{DuplicationEngine, DuplicationStats, PanelExtent, SourceSnapshot};
use crate::panel::guides::{GuideGenerator, GuideStyle, GuideSummary};
use crate::panel::library::PackageIndex;
use crate::panel::outline::{OutlineBox, OutlineResolver};
use crate::panel::tiling::{TileGrid, TileOffset};
use crate::parser::board::{declared_unit, BoardLayout};
use crate::parser::units::Unit;
use crate::parser::xml::{XmlDocument, XmlError};

#[derive(Debug, thiserror::Error)]
pub enum PanelizerError {
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),
    #[error("Element {element} references undefined package {library}/{package}")]
    UndefinedPackageReference {
        library: String,
        package: String,
        element: String,
    },
    #[error("No board outline found on layer {layer}")]
    MissingOutline { layer: i32 },
    #[error("Malformed numeric attribute {attribute}=\"{value}\" on <{element}>")]
    MalformedNumericAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("Board outline has no area ({width} x {height})")]
    DegenerateOutline { width: f64, height: f64 },
    #[error("Invalid board structure: {0}")]
    InvalidStructure(String),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_outline_layer() -> i32 {
    20
}

fn default_guide_layer() -> i32 {
    46
}

fn default_stroke_width() -> f64 {
    0.254
}

fn default_post_length() -> f64 {
    5.0
}

/// Options for a panelization run. Lengths are millimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanelOptions {
    pub target_width: f64,
    pub target_height: f64,
    #[serde(default = "default_outline_layer")]
    pub outline_layer: i32,
    #[serde(default = "default_guide_layer")]
    pub guide_layer: i32,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_post_length")]
    pub post_length: f64,
    #[serde(default)]
    pub markers: bool,
    #[serde(default)]
    pub merge_coincident: bool,
    /// Overrides the unit declared by the document.
    #[serde(default)]
    pub unit: Option<Unit>,
}

impl PanelOptions {
    pub fn new(target_width: f64, target_height: f64) -> Self {
        Self {
            target_width,
            target_height,
            outline_layer: default_outline_layer(),
            guide_layer: default_guide_layer(),
            stroke_width: default_stroke_width(),
            post_length: default_post_length(),
            markers: false,
            merge_coincident: false,
            unit: None,
        }
    }

    pub fn with_outline_layer(mut self, layer: i32) -> Self {
        self.outline_layer = layer;
        self
    }

    pub fn with_guide_layer(mut self, layer: i32) -> Self {
        self.guide_layer = layer;
        self
    }

    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = width;
        self
    }

    pub fn with_post_length(mut self, length: f64) -> Self {
        self.post_length = length;
        self
    }

    pub fn with_markers(mut self, enabled: bool) -> Self {
        self.markers = enabled;
        self
    }

    pub fn with_merge_coincident(mut self, enabled: bool) -> Self {
        self.merge_coincident = enabled;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn validate(&self) -> Result<(), PanelizerError> {
        let positive = [
            ("target width", self.target_width),
            ("target height", self.target_height),
            ("stroke width", self.stroke_width),
        ];
        for (label, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PanelizerError::InvalidOptions(format!(
                    "{} must be a positive number, got {}",
                    label, value
                )));
            }
        }
        if !(self.post_length.is_finite() && self.post_length >= 0.0) {
            return Err(PanelizerError::InvalidOptions(format!(
                "post length must not be negative, got {}",
                self.post_length
            )));
        }
        Ok(())
    }

    fn guide_style(&self) -> GuideStyle {
        GuideStyle {
            outline_layer: self.outline_layer,
            guide_layer: self.guide_layer,
            stroke_width: self.stroke_width,
            post_length: self.post_length,
            markers: self.markers,
        }
    }
}

/// Summary of one run. Lengths are millimeters.
#[derive(Debug, Clone, Serialize)]
pub struct PanelReport {
    pub unit: Unit,
    pub board: OutlineBox,
    pub board_width: f64,
    pub board_height: f64,
    pub columns: usize,
    pub rows: usize,
    pub panel: PanelExtent,
    pub tiles: Vec<TileOffset>,
    pub removed_outline_nodes: usize,
    pub duplicated: DuplicationStats,
    pub guides: GuideSummary,
    pub merged_wires: usize,
}

impl PanelReport {
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Panelization API used by the CLI.
pub struct PanelizerCore;

impl PanelizerCore {
    /// Tile the first board of `doc` in place.
    ///
    /// Errors raised before tiling leave the document untouched; a failure
    /// during duplication leaves it partially transformed.
    pub fn panelize(
        doc: &mut XmlDocument,
        options: &PanelOptions,
    ) -> Result<PanelReport, PanelizerError> {
        options.validate()?;

        let layout = BoardLayout::resolve(doc)?;
        let unit = match options.unit {
            Some(unit) => unit,
            None => declared_unit(doc, &layout)?,
        };
        let primary = layout.primary()?;
        tracing::debug!("Document unit: {}", unit);

        let index = PackageIndex::build(doc, layout.libraries, unit)?;
        let outline = OutlineResolver::new(&index, unit, options.outline_layer).resolve(doc, &layout)?;
        let bbox = outline.bbox;
        let grid = TileGrid::new(
            bbox.width(),
            bbox.height(),
            options.target_width,
            options.target_height,
        )?;

        let snapshot = SourceSnapshot::capture(doc, &layout);
        let duplication = DuplicationEngine::new(unit, &primary).run(doc, &snapshot, &grid)?;

        let guides = GuideGenerator::new(unit, options.guide_style()).generate(
            doc,
            primary.plain,
            &bbox,
            &grid,
            &duplication.extent,
        );

        let merged_wires = if options.merge_coincident {
            let merged = SameGeometry::new(unit).merge_coincident_wires(doc, primary.plain)?;
            tracing::info!("Merged {} coincident wire(s)", merged);
            merged
        } else {
            0
        };

        Ok(PanelReport {
            unit,
            board: bbox,
            board_width: bbox.width(),
            board_height: bbox.height(),
            columns: grid.columns(),
            rows: grid.rows(),
            panel: duplication.extent,
            tiles: duplication.tiles,
            removed_outline_nodes: outline.removed.len(),
            duplicated: duplication.stats,
            guides,
            merged_wires,
        })
    }

    /// Load `input`, panelize it and write the result to `output`. Nothing
    /// is written unless the whole run succeeds.
    pub fn panelize_file(
        input: &Path,
        output: &Path,
        options: &PanelOptions,
    ) -> Result<PanelReport, PanelizerError> {
        let mut doc = crate::load_board(input)?;
        let report = Self::panelize(&mut doc, options)?;
        crate::save_board(output, &doc)?;
        tracing::info!("Wrote panel to {}", output.display());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PanelOptions::new(100.0, 80.0);
        assert_eq!(options.outline_layer, 20);
        assert_eq!(options.guide_layer, 46);
        assert_eq!(options.stroke_width, 0.254);
        assert_eq!(options.post_length, 5.0);
        assert!(!options.markers);
        assert!(!options.merge_coincident);
        assert!(options.unit.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = PanelOptions::new(100.0, 80.0)
            .with_outline_layer(47)
            .with_guide_layer(48)
            .with_stroke_width(0.1)
            .with_post_length(0.0)
            .with_markers(true)
            .with_merge_coincident(true)
            .with_unit(Unit::Mil);
        assert_eq!(options.outline_layer, 47);
        assert_eq!(options.guide_layer, 48);
        assert_eq!(options.unit, Some(Unit::Mil));
        assert!(options.markers && options.merge_coincident);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        for options in [
            PanelOptions::new(0.0, 10.0),
            PanelOptions::new(10.0, -1.0),
            PanelOptions::new(f64::NAN, 10.0),
            PanelOptions::new(10.0, 10.0).with_stroke_width(0.0),
            PanelOptions::new(10.0, 10.0).with_post_length(-0.1),
            PanelOptions::new(10.0, 10.0).with_post_length(f64::INFINITY),
        ] {
            assert!(matches!(options.validate(), Err(PanelizerError::InvalidOptions(_))));
        }
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: PanelOptions =
            serde_json::from_str(r#"{"target_width": 50, "target_height": 40, "unit": "mil"}"#).unwrap();
        assert_eq!(options, PanelOptions::new(50.0, 40.0).with_unit(Unit::Mil));
    }

    #[test]
    fn test_invalid_options_leave_document_untouched() {
        let mut doc = XmlDocument::parse(
            r#"<eagle><drawing><board><plain>
                <wire x1="0" y1="0" x2="10" y2="8" width="0" layer="20"/>
            </plain></board></drawing></eagle>"#,
        )
        .unwrap();
        let before = doc.to_string();
        let err = PanelizerCore::panelize(&mut doc, &PanelOptions::new(-5.0, 10.0)).unwrap_err();
        assert!(matches!(err, PanelizerError::InvalidOptions(_)));
        assert_eq!(doc.to_string(), before);
    }

    #[test]
    fn test_error_messages() {
        let err = PanelizerError::UndefinedPackageReference {
            library: "rcl".into(),
            package: "R0603".into(),
            element: "R1".into(),
        };
        assert_eq!(err.to_string(), "Element R1 references undefined package rcl/R0603");
        assert_eq!(
            PanelizerError::MissingOutline { layer: 20 }.to_string(),
            "No board outline found on layer 20"
        );
    }
}
