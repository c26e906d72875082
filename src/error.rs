//! Error kinds for the blur pipeline.
//!
//! Compile/link errors are unrecoverable for the session: pipeline
//! construction aborts rather than attempting a partial draw. Per-request
//! errors (asset, readback) abort only the request; previously published
//! output stays valid.

use std::fmt;

pub type BlurResult<T> = Result<T, BlurError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug)]
pub enum BlurError {
    /// A shader stage failed to compile. Fatal to pipeline initialization.
    ShaderCompile { stage: ShaderStage, log: String },
    /// The combined module failed validation (stage interface mismatch).
    ShaderLink(String),
    /// Texture/framebuffer/buffer allocation failed for the current request.
    ResourceCreation(String),
    /// The source image could not be loaded or decoded. Recoverable: the
    /// request aborts and any prior output remains valid.
    AssetUnavailable { source: String, cause: String },
    /// Snapshot extraction failed. Recoverable: no partial output published.
    Readback(String),
    /// No usable GPU adapter was found.
    NoAdapter(String),
    /// The adapter refused the device request.
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for BlurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurError::ShaderCompile { stage, log } => {
                write!(f, "{stage} shader failed to compile:\n{log}")
            }
            BlurError::ShaderLink(log) => write!(f, "shader program failed to link:\n{log}"),
            BlurError::ResourceCreation(what) => write!(f, "failed to create {what}"),
            BlurError::AssetUnavailable { source, cause } => {
                write!(f, "source image {source} unavailable: {cause}")
            }
            BlurError::Readback(cause) => write!(f, "framebuffer readback failed: {cause}"),
            BlurError::NoAdapter(detail) => write!(f, "no suitable GPU adapter: {detail}"),
            BlurError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for BlurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlurError::DeviceRequest(e) => Some(e),
            _ => None,
        }
    }
}
