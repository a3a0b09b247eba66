//! coremap: GPU-free half of the core-sample tile viewer.
//!
//! - `metadata`: tile rectangles in the packed atlas and the section id list.
//! - `layout`: column and Archimedean-spiral placement of tiles, and the vertex
//!   streams (downscaled triangles, punchcard samples, accent strips) built from it.
//! - `ease`: the single easing curve and the transition timers driven per frame.
//! - `palette`: per-channel colour resolution and a CPU mirror of the blend shader.
//! - `pick`: tile index <-> flat RG colour codec for offscreen picking.
//!
//! Everything here is deterministic; the viewer crate uploads the results.

pub mod ease;
pub mod layout;
pub mod metadata;
pub mod palette;
pub mod pick;

pub use ease::{ease, Transition};
pub use layout::{
    Bounds, LayoutEngine, LayoutParams, Shape, ShapePair, Spacing, TileVertices, ViewMode,
};
pub use metadata::{MetadataError, SectionIdMetadata, TileRect, TileTextureMetadata};
pub use palette::{BlendMode, BlendParams, Palette, Rgb};
pub use pick::PickTable;
