use coremap::MetadataError;
use thiserror::Error;

/// Failures raised by the core renderer.
///
/// Construction errors are fatal for the instance. Errors from the per-frame
/// and mutation calls indicate a layout/shader mismatch and are not retried.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("shader `{label}` failed validation: {message}")]
    Shader { label: String, message: String },
    #[error("mineral blender needs at least one channel image")]
    NoChannels,
    #[error("channel `{name}` is {got:?}, expected {expected:?} like the other channels")]
    ChannelSizeMismatch {
        name: String,
        got: (u32, u32),
        expected: (u32, u32),
    },
    #[error("channel `{name}` holds {got} bytes, expected {expected}")]
    ChannelDataLength { name: String, got: usize, expected: usize },
    #[error("texture `{name}` is {size:?}, the device allows at most {max} px per side")]
    TextureTooLarge {
        name: String,
        size: (u32, u32),
        max: u32,
    },
    #[error("{tiles} tiles exceed the pick codec limit of {max}")]
    TooManyTiles { tiles: usize, max: usize },
    #[error("buffer `{label}` holds {expected} vertices, update has {got}")]
    VertexCountMismatch {
        label: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("GPU read-back failed: {0}")]
    Readback(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
