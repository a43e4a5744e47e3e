pub mod board;
pub mod units;
pub mod xml;

pub use board::{declared_unit, BoardLayout, PrimaryContainers};
pub use units::{convert, Unit};
pub use xml::{NodeId, NodeKind, XmlDocument, XmlError};
