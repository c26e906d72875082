//! Offscreen GPU Gaussian blur for still images.
//!
//! One source image is uploaded once; blur requests at varying radii reuse
//! the compiled pipeline and render into offscreen targets, two separable
//! passes (vertical then horizontal) or a single naive 2-D pass. Results
//! come back as raw RGBA pixels or a PNG base64 data URI.

pub mod assets;
pub mod blur;
pub mod coalesce;
pub mod error;
pub mod gpu;
pub mod kernel;
pub mod pipeline;
pub mod reference;
pub mod snapshot;
pub mod validation;
pub mod wgsl;

pub use blur::{BlurConfig, BlurRenderer, BlurService};
pub use error::{BlurError, BlurResult};
pub use gpu::GpuContext;
pub use kernel::{MAX_RADIUS, SigmaPolicy, WeightNormalization};
pub use pipeline::ConvolutionStrategy;
pub use snapshot::{Snapshot, SnapshotFormat};
