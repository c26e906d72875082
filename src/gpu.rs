//! Headless wgpu context acquisition.
//!
//! No window or surface is involved: the pipeline renders into offscreen
//! textures only. Adapter and device requests are the async seams of wgpu's
//! API; we block on them with pollster since there is nothing else to do
//! until a device exists.

use crate::error::{BlurError, BlurResult};

/// The GPU context: device, queue, and the adapter it came from.
///
/// Create once and keep for the process lifetime; acquisition is expensive,
/// everything downstream only borrows `device`/`queue`.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub fn new() -> BlurResult<Self> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> BlurResult<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| BlurError::NoAdapter(e.to_string()))?;

        let adapter_info = adapter.get_info();
        eprintln!(
            "[gpu-blur] adapter: {} ({:?}, {:?})",
            adapter_info.name, adapter_info.backend, adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gpu-blur"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(BlurError::DeviceRequest)?;

        Ok(GpuContext {
            device,
            queue,
            adapter_info,
        })
    }
}
