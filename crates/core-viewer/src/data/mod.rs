//! Asset loading for one core sample.
//!
//! Everything here runs before the renderer exists: metadata is parsed and
//! validated, and every mineral channel is decoded to 8-bit luminance. Any
//! failure aborts startup.

pub mod loader;
pub mod types;

pub use self::loader::{list_channels, load_channels, load_core, load_palette};
pub use self::types::{CoreAssets, MineralChannel};
