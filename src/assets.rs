//! Image source providers.
//!
//! Collaborator boundary: the pipeline only needs decoded RGBA pixels and
//! dimensions. Load/decode failures propagate as `AssetUnavailable`, never
//! a silently blank texture.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{BlurError, BlurResult};

/// A logical handle that can produce the source image.
pub trait ImageSource {
    /// Human-readable identity for error messages and logs.
    fn describe(&self) -> String;
    fn load(&self) -> BlurResult<RgbaImage>;
}

/// Image loaded from a file on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImageSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> BlurResult<RgbaImage> {
        let img = image::open(&self.path).map_err(|e| BlurError::AssetUnavailable {
            source: self.describe(),
            cause: e.to_string(),
        })?;
        Ok(img.to_rgba8())
    }
}

/// Image decoded from bytes already in memory (bundled asset, downloaded
/// blob). The download itself is the host's concern.
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        MemorySource {
            name: name.into(),
            bytes,
        }
    }
}

impl ImageSource for MemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> BlurResult<RgbaImage> {
        let img = image::load_from_memory(&self.bytes).map_err(|e| BlurError::AssetUnavailable {
            source: self.describe(),
            cause: e.to_string(),
        })?;
        Ok(img.to_rgba8())
    }
}
