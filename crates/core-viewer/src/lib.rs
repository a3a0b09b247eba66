//! Drill-core scan viewer.
//!
//! Lays the scanned sections of one core out as paginated columns or a
//! spiral, colours them by blending mineral abundance maps on the GPU, and
//! resolves hover and selection through an offscreen picking pass.

pub mod app;
pub mod camera;
pub mod config;
pub mod data;
pub mod error;
pub mod renderer;
pub mod ui;

pub use error::{Result, ViewerError};
