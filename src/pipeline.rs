//! Pipeline setup: compiled program, static quad, source texture, per-pass
//! uniform buffers, and offscreen color targets.
//!
//! Everything here is created once per source image and reused across blur
//! requests; only uniform contents change per request.

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;

use crate::error::{BlurError, BlurResult};
use crate::gpu::GpuContext;
use crate::kernel::{SigmaPolicy, WeightNormalization, inv_weight_sum};
use crate::validation::validate_bundle;
use crate::wgsl::{ShaderBundle, build_naive_blur_bundle, build_separable_blur_bundle};

/// Which convolution the fragment stage runs. The two-pass separable path is
/// the production mode; the naive 2-D grid is a slower reference mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvolutionStrategy {
    #[default]
    Separable,
    Naive2d,
}

impl ConvolutionStrategy {
    pub fn bundle(self) -> ShaderBundle {
        match self {
            ConvolutionStrategy::Separable => build_separable_blur_bundle(),
            ConvolutionStrategy::Naive2d => build_naive_blur_bundle(),
        }
    }
}

/// Axis selector for one separable pass. The numeric values are the `axis`
/// uniform the shader branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassAxis {
    Vertical = 0,
    Horizontal = 1,
}

/// Fully describes the uniform state of one draw. Built fresh per pass and
/// written to that pass's own uniform buffer before encoding; uniform state
/// is never assumed to carry over between draws on the shared program.
#[derive(Debug, Clone, Copy)]
pub struct PassConfig {
    pub radius: u32,
    pub sigma: f32,
    pub inv_weight_sum: f32,
    pub axis: PassAxis,
}

impl PassConfig {
    /// Per-pass parameters for the separable path. Both passes share radius
    /// and sigma; only the axis differs.
    pub fn separable(
        radius: u32,
        policy: SigmaPolicy,
        normalization: WeightNormalization,
    ) -> [PassConfig; 2] {
        let sigma = policy.sigma(radius);
        let inv = inv_weight_sum(radius, sigma, normalization);
        let pass = |axis| PassConfig {
            radius,
            sigma,
            inv_weight_sum: inv,
            axis,
        };
        [pass(PassAxis::Vertical), pass(PassAxis::Horizontal)]
    }

    /// Parameters for the single naive 2-D pass. The normalization factor is
    /// squared because the shader's weight is a product of two 1-D kernels.
    pub fn naive(
        radius: u32,
        policy: SigmaPolicy,
        normalization: WeightNormalization,
    ) -> PassConfig {
        let sigma = policy.sigma(radius);
        let inv = inv_weight_sum(radius, sigma, normalization);
        PassConfig {
            radius,
            sigma,
            inv_weight_sum: inv * inv,
            axis: PassAxis::Vertical,
        }
    }
}

/// GPU-side mirror of the WGSL `BlurParams` block. 32 bytes, 16-aligned.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BlurUniforms {
    size: [f32; 2],
    sigma: f32,
    inv_weight_sum: f32,
    radius: i32,
    axis: u32,
    _pad: [u32; 2],
}

impl BlurUniforms {
    fn new(config: &PassConfig, width: u32, height: u32) -> Self {
        BlurUniforms {
            size: [width as f32, height as f32],
            sigma: config.sigma,
            inv_weight_sum: config.inv_weight_sum,
            radius: config.radius as i32,
            axis: config.axis as u32,
            _pad: [0; 2],
        }
    }
}

/// An offscreen color texture usable as both render target and sample source.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl OffscreenTarget {
    fn create(device: &wgpu::Device, width: u32, height: u32, label: &str) -> BlurResult<Self> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(BlurError::ResourceCreation(format!(
                "{label} texture ({width}x{height}, device limit {max})"
            )));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(OffscreenTarget {
            texture,
            view,
            width,
            height,
        })
    }

    fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

/// Linear RGBA, so readback bytes match the uploaded source bytes.
/// No color management happens anywhere in the pipeline.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// The two-triangle full-screen quad, in clip space. Allocated once as an
/// immutable vertex buffer and shared by every pass.
const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [-1.0, 1.0],
    [1.0, 1.0],
];

/// Compiled program plus the static resources every blur request reuses.
pub struct BlurPipeline {
    strategy: ConvolutionStrategy,
    pipeline: wgpu::RenderPipeline,
    quad: wgpu::Buffer,
    sampler: wgpu::Sampler,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    /// One uniform buffer per pass so pass B never races pass A's state.
    pass_uniforms: [wgpu::Buffer; 2],
    source: OffscreenTarget,
    source_width: u32,
    source_height: u32,
    intermediate: Option<OffscreenTarget>,
    output: Option<OffscreenTarget>,
}

impl BlurPipeline {
    /// Compile and link the shader pair, allocate the quad, and upload the
    /// source image. Compile/link failures abort construction; no partial
    /// pipeline is usable.
    pub fn new(
        ctx: &GpuContext,
        source: &RgbaImage,
        strategy: ConvolutionStrategy,
    ) -> BlurResult<Self> {
        let bundle = strategy.bundle();
        // Host-side validation turns a bad generated shader into a readable
        // compile log instead of a device-side validation panic.
        validate_bundle(&bundle)?;

        let device = &ctx.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(bundle.label),
            source: wgpu::ShaderSource::Wgsl(bundle.module.as_str().into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur_params_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur_texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blur_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(bundle.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blur_quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Nearest in both directions: blur quality comes from the
        // convolution, and nearest avoids an extra implicit bilinear blur.
        // Clamp-to-edge backs up the shader's manual coordinate clamp.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blur_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pass_uniforms = ["blur_params_pass_a", "blur_params_pass_b"].map(|label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BlurUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let (width, height) = source.dimensions();
        let source_target = Self::upload_source(ctx, source)?;

        Ok(BlurPipeline {
            strategy,
            pipeline,
            quad,
            sampler,
            uniform_layout,
            texture_layout,
            pass_uniforms,
            source: source_target,
            source_width: width,
            source_height: height,
            intermediate: None,
            output: None,
        })
    }

    fn upload_source(ctx: &GpuContext, source: &RgbaImage) -> BlurResult<OffscreenTarget> {
        let (width, height) = source.dimensions();
        let max = ctx.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(BlurError::ResourceCreation(format!(
                "source texture ({width}x{height}, device limit {max})"
            )));
        }
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("blur_source"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            source.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(OffscreenTarget {
            texture,
            view,
            width,
            height,
        })
    }

    pub fn strategy(&self) -> ConvolutionStrategy {
        self.strategy
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// The intermediate target between the two separable passes. Reused when
    /// dimensions still match the source, recreated otherwise.
    pub fn ensure_intermediate(&mut self, device: &wgpu::Device) -> BlurResult<&OffscreenTarget> {
        let (w, h) = (self.source_width, self.source_height);
        let target = match self.intermediate.take() {
            Some(t) if t.matches(w, h) => t,
            _ => OffscreenTarget::create(device, w, h, "blur_intermediate")?,
        };
        Ok(self.intermediate.insert(target))
    }

    /// The final offscreen target handed to the snapshot bridge.
    pub fn ensure_output(&mut self, device: &wgpu::Device) -> BlurResult<&OffscreenTarget> {
        let (w, h) = (self.source_width, self.source_height);
        let target = match self.output.take() {
            Some(t) if t.matches(w, h) => t,
            _ => OffscreenTarget::create(device, w, h, "blur_output")?,
        };
        Ok(self.output.insert(target))
    }

    /// The output target, once `ensure_output` has allocated it.
    pub fn output(&self) -> BlurResult<&OffscreenTarget> {
        self.output
            .as_ref()
            .ok_or_else(|| BlurError::ResourceCreation("output target not allocated".into()))
    }

    pub fn source_view(&self) -> &wgpu::TextureView {
        &self.source.view
    }

    /// Write `config` into the uniform buffer for pass `pass_index` and
    /// encode one full-screen draw sampling `src_view` into `target_view`.
    ///
    /// The uniform write goes through the queue and therefore lands before
    /// any subsequently submitted draw on the same queue.
    pub fn encode_pass(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        pass_index: usize,
        config: &PassConfig,
        src_view: &wgpu::TextureView,
        target_view: &wgpu::TextureView,
    ) {
        let uniforms = BlurUniforms::new(config, self.source_width, self.source_height);
        ctx.queue.write_buffer(
            &self.pass_uniforms[pass_index],
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let params_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur_params_group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.pass_uniforms[pass_index].as_entire_binding(),
            }],
        });
        let texture_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur_texture_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("blur_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &params_group, &[]);
        pass.set_bind_group(1, &texture_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_32_bytes() {
        // Must match the WGSL BlurParams block layout.
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 32);
    }

    #[test]
    fn pass_configs_share_kernel_but_differ_by_axis() {
        let [a, b] = PassConfig::separable(
            5,
            SigmaPolicy::SmallRadiusBoost,
            WeightNormalization::Normalized,
        );
        assert_eq!(a.axis, PassAxis::Vertical);
        assert_eq!(b.axis, PassAxis::Horizontal);
        assert_eq!(a.sigma, b.sigma);
        assert_eq!(a.inv_weight_sum, b.inv_weight_sum);
    }

    #[test]
    fn naive_config_squares_the_normalization() {
        let [sep, _] = PassConfig::separable(
            4,
            SigmaPolicy::SmallRadiusBoost,
            WeightNormalization::Normalized,
        );
        let naive = PassConfig::naive(
            4,
            SigmaPolicy::SmallRadiusBoost,
            WeightNormalization::Normalized,
        );
        let expected = sep.inv_weight_sum * sep.inv_weight_sum;
        assert!((naive.inv_weight_sum - expected).abs() < 1e-6);
    }

    #[test]
    fn legacy_normalization_is_the_identity_multiplier() {
        let naive = PassConfig::naive(3, SigmaPolicy::SmallRadiusBoost, WeightNormalization::Legacy);
        assert_eq!(naive.inv_weight_sum, 1.0);
    }

    #[test]
    fn quad_covers_clip_space_with_two_triangles() {
        assert_eq!(QUAD_VERTICES.len(), 6);
        for v in QUAD_VERTICES {
            assert!(v.iter().all(|c| c.abs() == 1.0));
        }
    }
}
