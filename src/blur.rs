//! Blur orchestration: per-request pass sequencing, radius clamping, and the
//! keep-latest service wrapper around the renderer.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::coalesce::LatestOnly;
use crate::error::BlurResult;
use crate::gpu::GpuContext;
use crate::kernel::{MAX_RADIUS, SigmaPolicy, WeightNormalization};
use crate::pipeline::{BlurPipeline, ConvolutionStrategy, PassConfig};
use crate::snapshot::{Snapshot, SnapshotFormat, read_target_pixels};

/// A full blur request description. Deserializes from the JSON config file
/// with every field optional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BlurConfig {
    pub radius: u32,
    pub strategy: ConvolutionStrategy,
    pub sigma_policy: SigmaPolicy,
    pub normalization: WeightNormalization,
    pub output: SnapshotFormat,
}

impl Default for BlurConfig {
    fn default() -> Self {
        BlurConfig {
            radius: 10,
            strategy: ConvolutionStrategy::default(),
            sigma_policy: SigmaPolicy::default(),
            normalization: WeightNormalization::default(),
            output: SnapshotFormat::default(),
        }
    }
}

/// Owns a pipeline bound to one source image and renders it at any radius.
///
/// Radius may change per call; the strategy, kernel policy, and source are
/// fixed at construction. A fresh radius means fresh uniforms only, no
/// pipeline or texture churn.
pub struct BlurRenderer {
    ctx: GpuContext,
    pipeline: BlurPipeline,
    sigma_policy: SigmaPolicy,
    normalization: WeightNormalization,
}

impl BlurRenderer {
    pub fn new(ctx: GpuContext, source: &RgbaImage, config: &BlurConfig) -> BlurResult<Self> {
        let pipeline = BlurPipeline::new(&ctx, source, config.strategy)?;
        Ok(BlurRenderer {
            ctx,
            pipeline,
            sigma_policy: config.sigma_policy,
            normalization: config.normalization,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        self.pipeline.source_dimensions()
    }

    /// Render the source at `radius` and read the result back.
    ///
    /// Radius 0 still runs the draw; the shader passes pixels through, so the
    /// output equals the source. Radii beyond the kernel's fixed loop bound
    /// are clamped down to it.
    pub fn render(&mut self, radius: u32) -> BlurResult<RgbaImage> {
        let radius = radius.min(MAX_RADIUS);
        match self.pipeline.strategy() {
            ConvolutionStrategy::Separable => self.render_separable(radius),
            ConvolutionStrategy::Naive2d => self.render_naive(radius),
        }
    }

    /// Vertical into the intermediate target, then horizontal into the
    /// output. Both draws go into one encoder so a single submit covers the
    /// whole request and the passes cannot interleave with anything else.
    fn render_separable(&mut self, radius: u32) -> BlurResult<RgbaImage> {
        let [vertical, horizontal] =
            PassConfig::separable(radius, self.sigma_policy, self.normalization);

        let intermediate_view = self
            .pipeline
            .ensure_intermediate(&self.ctx.device)?
            .view
            .clone();
        let output_view = self.pipeline.ensure_output(&self.ctx.device)?.view.clone();
        let source_view = self.pipeline.source_view().clone();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blur_separable"),
            });
        self.pipeline.encode_pass(
            &self.ctx,
            &mut encoder,
            0,
            &vertical,
            &source_view,
            &intermediate_view,
        );
        self.pipeline.encode_pass(
            &self.ctx,
            &mut encoder,
            1,
            &horizontal,
            &intermediate_view,
            &output_view,
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        read_target_pixels(&self.ctx, self.pipeline.output()?)
    }

    fn render_naive(&mut self, radius: u32) -> BlurResult<RgbaImage> {
        let config = PassConfig::naive(radius, self.sigma_policy, self.normalization);
        let output_view = self.pipeline.ensure_output(&self.ctx.device)?.view.clone();
        let source_view = self.pipeline.source_view().clone();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("blur_naive"),
            });
        self.pipeline.encode_pass(
            &self.ctx,
            &mut encoder,
            0,
            &config,
            &source_view,
            &output_view,
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        read_target_pixels(&self.ctx, self.pipeline.output()?)
    }
}

/// Serialized front door for interactive callers.
///
/// Requests arrive through a keep-latest slot, so a slider burst costs one
/// render. The last successful snapshot is retained; a failed render keeps
/// the previous image visible and surfaces the error to the caller.
pub struct BlurService {
    renderer: BlurRenderer,
    format: SnapshotFormat,
    pending: LatestOnly<u32>,
    last_good: Option<Snapshot>,
}

impl BlurService {
    pub fn new(renderer: BlurRenderer, format: SnapshotFormat) -> Self {
        BlurService {
            renderer,
            format,
            pending: LatestOnly::new(),
            last_good: None,
        }
    }

    /// Queue a radius change. Never blocks; an unrendered earlier request is
    /// superseded.
    pub fn request(&self, radius: u32) {
        self.pending.submit(radius);
    }

    /// Render the most recent pending request, if any.
    ///
    /// `Ok(None)` means nothing was pending. On error the previous snapshot
    /// stays available through `last_good`.
    pub fn render_pending(&mut self) -> BlurResult<Option<&Snapshot>> {
        let Some(radius) = self.pending.take() else {
            return Ok(None);
        };
        let pixels = self.renderer.render(radius)?;
        let snapshot = Snapshot::from_pixels(pixels, self.format)?;
        self.last_good = Some(snapshot);
        Ok(self.last_good.as_ref())
    }

    pub fn last_good(&self) -> Option<&Snapshot> {
        self.last_good.as_ref()
    }
}
