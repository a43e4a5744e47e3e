pub mod compare;
pub mod element;

pub use compare::{SameGeometry, SegmentKey};
pub use element::{Extraction, GeometricElement, ShiftDirection};
