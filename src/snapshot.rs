//! Snapshot bridge: read the final render target back into host memory.
//!
//! The readback is synchronous: the orchestrator hands over a
//! fully flushed target and expects either complete pixels or a `Readback`
//! error, never a torn frame. On hosts without binary-blob support the
//! pixels can be re-encoded as a PNG base64 data URI, which callers treat
//! as an opaque output handle.

use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{BlurError, BlurResult};
use crate::gpu::GpuContext;
use crate::pipeline::OffscreenTarget;

/// Round `value` up to the next multiple of `alignment`.
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// The finished blur result, in whichever form the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Pixels(RgbaImage),
    DataUri(String),
}

/// Requested snapshot form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotFormat {
    #[default]
    Pixels,
    DataUri,
}

/// Copy a completed render target into a mappable buffer and return its
/// pixels with row padding stripped.
///
/// Copy rows must be 256-byte aligned, so the staging buffer is wider than
/// the image unless `4 * width` already lands on the boundary.
pub fn read_target_pixels(ctx: &GpuContext, target: &OffscreenTarget) -> BlurResult<RgbaImage> {
    let bytes_per_row = 4 * target.width;
    let aligned_bytes_per_row = align_to(bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let buffer_size = (aligned_bytes_per_row * target.height) as u64;

    let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("blur_readback"),
        size: buffer_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blur_readback"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bytes_per_row),
                rows_per_image: Some(target.height),
            },
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(Some(encoder.finish()));

    // Map asynchronously, then block until the queue (including the render
    // passes submitted before this copy) has drained.
    let slice = readback.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| BlurError::Readback(format!("device poll failed: {e}")))?;
    receiver
        .recv()
        .map_err(|_| BlurError::Readback("map callback never fired".into()))?
        .map_err(|e| BlurError::Readback(format!("buffer map failed: {e}")))?;

    let mapped = slice.get_mapped_range();
    let mut pixels = vec![0u8; (bytes_per_row * target.height) as usize];
    for y in 0..target.height as usize {
        let src_start = y * aligned_bytes_per_row as usize;
        let dst_start = y * bytes_per_row as usize;
        pixels[dst_start..dst_start + bytes_per_row as usize]
            .copy_from_slice(&mapped[src_start..src_start + bytes_per_row as usize]);
    }
    drop(mapped);
    readback.unmap();

    RgbaImage::from_raw(target.width, target.height, pixels)
        .ok_or_else(|| BlurError::Readback("pixel buffer has unexpected length".into()))
}

/// Encode an image as a `data:image/png;base64,` URI.
pub fn to_png_data_uri(image: &RgbaImage) -> BlurResult<String> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| BlurError::Readback(format!("png encode failed: {e}")))?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&png)
    ))
}

impl Snapshot {
    pub fn from_pixels(image: RgbaImage, format: SnapshotFormat) -> BlurResult<Snapshot> {
        match format {
            SnapshotFormat::Pixels => Ok(Snapshot::Pixels(image)),
            SnapshotFormat::DataUri => Ok(Snapshot::DataUri(to_png_data_uri(&image)?)),
        }
    }
}
