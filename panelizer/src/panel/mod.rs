pub mod duplicate;
pub mod guides;
pub mod library;
pub mod outline;
pub mod tiling;

// Re-export pipeline stages
pub use duplicate::{Duplication, DuplicationEngine, DuplicationStats, PanelExtent, SourceSnapshot};
pub use guides::{GuideGenerator, GuideStyle, GuideSummary};
pub use library::PackageIndex;
pub use outline::{OutlineBox, OutlineResolver, ResolvedOutline};
pub use tiling::{TileGrid, TileOffset};
