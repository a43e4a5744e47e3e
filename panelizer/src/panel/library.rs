//! Package library index.
//!
//! Every package template's local geometry, keyed by `"<library>/<package>"`.
//! Built once before any mutation; placed components look their footprint
//! up here and shift it into board coordinates.

use std::collections::HashMap;

use crate::core::PanelizerError;
use crate::geometry::element::{GeometricElement, ShiftDirection};
use crate::parser::units::Unit;
use crate::parser::xml::{NodeId, XmlDocument};

#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    packages: HashMap<String, Vec<GeometricElement>>,
}

pub fn package_key(library: &str, package: &str) -> String {
    format!("{}/{}", library, package)
}

impl PackageIndex {
    /// Index `libraries/library[name]/packages/package[name]/*`.
    /// Template nodes without coordinates are skipped.
    pub fn build(
        doc: &XmlDocument,
        libraries: Option<NodeId>,
        unit: Unit,
    ) -> Result<Self, PanelizerError> {
        let mut packages = HashMap::new();
        let Some(libraries) = libraries else {
            return Ok(Self { packages });
        };

        for library in doc.children_named(libraries, "library") {
            let library_name = doc.attribute(library, "name").unwrap_or_default();
            for section in doc.children_named(library, "packages") {
                for package in doc.children_named(section, "package") {
                    let package_name = doc.attribute(package, "name").unwrap_or_default();
                    let mut geometry = Vec::new();
                    for primitive in doc.child_elements(package) {
                        if let Some(element) = GeometricElement::extract(doc, primitive, unit)?.found() {
                            geometry.push(element);
                        }
                    }
                    packages.insert(package_key(library_name, package_name), geometry);
                }
            }
        }

        tracing::debug!("Indexed {} package(s)", packages.len());
        Ok(Self { packages })
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Package-relative geometry of one template.
    pub fn get(&self, library: &str, package: &str) -> Option<&[GeometricElement]> {
        self.packages
            .get(&package_key(library, package))
            .map(|v| v.as_slice())
    }

    /// Absolute geometry of a placed component. Templates whose shift fails
    /// are dropped; an unknown library/package is fatal.
    pub fn placed_geometry(
        &self,
        doc: &XmlDocument,
        placement: NodeId,
        unit: Unit,
    ) -> Result<Vec<GeometricElement>, PanelizerError> {
        let library = doc.attribute(placement, "library").unwrap_or_default();
        let package = doc.attribute(placement, "package").unwrap_or_default();
        let templates = self.get(library, package).ok_or_else(|| {
            PanelizerError::UndefinedPackageReference {
                library: library.to_string(),
                package: package.to_string(),
                element: doc.attribute(placement, "name").unwrap_or_default().to_string(),
            }
        })?;

        if let Some(rot) = doc.attribute(placement, "rot") {
            if rot != "R0" {
                tracing::warn!(
                    "Placement {} has rotation {}; rotation is not applied to its geometry",
                    doc.attribute(placement, "name").unwrap_or("?"),
                    rot
                );
            }
        }

        let mut placed = Vec::with_capacity(templates.len());
        for template in templates {
            if let Some(shifted) = template.shifted_by(doc, placement, ShiftDirection::ToBoard, unit)? {
                placed.push(shifted);
            }
        }
        Ok(placed)
    }
}
