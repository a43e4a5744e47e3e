//! Panelizer - board artwork panelization library
//!
//! Tiles an EAGLE-style board layout across a larger panel: the board
//! outline is measured, every drawing-plane primitive, placed component and
//! signal is duplicated per tile with offset coordinates and suffixed
//! names, and a single panel border plus cut guides are synthesized.
//!
//! # Quick Start
//!
//! ```no_run
//! use panelizer::{PanelOptions, PanelizerCore};
//! use std::path::Path;
//!
//! let options = PanelOptions::new(100.0, 80.0).with_markers(true);
//! let report = PanelizerCore::panelize_file(
//!     Path::new("board.brd"),
//!     Path::new("panel.brd"),
//!     &options,
//! ).unwrap();
//!
//! println!("{} tiles, panel {} x {} mm",
//!     report.tile_count(), report.panel.width, report.panel.height);
//! ```
//!
//! # Pipeline
//!
//! - **Package index**: library-relative footprint geometry
//! - **Outline resolver**: board bounding box on the outline layer
//! - **Duplication**: per-tile clones with offsets, suffixes, layer remap
//! - **Guides**: panel border, V-cut guides and optional markers

pub mod core;
pub mod geometry;
pub mod panel;
pub mod parser;

use std::path::Path;

// Re-export main types
pub use crate::core::{PanelOptions, PanelReport, PanelizerCore, PanelizerError};
pub use geometry::{GeometricElement, SameGeometry};
pub use panel::{OutlineBox, PanelExtent, TileGrid, TileOffset};
pub use parser::{NodeId, Unit, XmlDocument};

/// Read and parse a board file.
pub fn load_board(path: &Path) -> Result<XmlDocument, PanelizerError> {
    let text = std::fs::read_to_string(path)?;
    Ok(XmlDocument::parse(&text)?)
}

/// Serialize `doc` to `path`, replacing any existing file.
pub fn save_board(path: &Path, doc: &XmlDocument) -> Result<(), PanelizerError> {
    std::fs::write(path, doc.to_string())?;
    Ok(())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        load_board, save_board, PanelOptions, PanelReport, PanelizerCore, PanelizerError, Unit,
        XmlDocument,
    };
}
