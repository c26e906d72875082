//! WGSL shader generation for the blur pipeline.
//!
//! Bundles are built as strings: a shared `common` block
//! (uniform struct, bindings, varyings), one vertex entry, and one fragment
//! entry per convolution strategy. The per-stage sources exist so validation
//! can attribute a failure to the stage that produced it.
//!
//! The fragment stages iterate a compile-time `[-MAX_RADIUS, MAX_RADIUS]`
//! range and mask taps by the runtime radius uniform; WGSL forbids
//! data-dependent loop bounds in portable code, and the fixed bound keeps a
//! single compiled module usable across all radii.

use crate::kernel::MAX_RADIUS;

/// A generated WGSL program: shared declarations plus per-stage sources.
///
/// `module` is what gets handed to `wgpu`; `vertex` and `fragment` are the
/// same code split per stage for validation/attribution.
#[derive(Debug, Clone)]
pub struct ShaderBundle {
    pub label: &'static str,
    pub common: String,
    pub vertex: String,
    pub fragment: String,
    pub module: String,
}

/// Uniform block layout shared with `pipeline::BlurUniforms`. One instance
/// per pass; uniform state is never assumed to persist across draws.
fn blur_common() -> String {
    r#"
struct BlurParams {
    // Source dimensions in texels.
    size: vec2f,
    sigma: f32,
    // 1 / sum of tap weights, or 1.0 when normalization is disabled.
    inv_weight_sum: f32,
    radius: i32,
    // 0 = vertical pass, 1 = horizontal pass. Unused by the naive variant.
    axis: u32,
    _pad: vec2u,
};

@group(0) @binding(0)
var<uniform> params: BlurParams;

@group(1) @binding(0)
var src_tex: texture_2d<f32>;
@group(1) @binding(1)
var src_samp: sampler;

struct VSOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
};

const TAU: f32 = 6.28318530718;

fn gauss(x: f32, sigma: f32) -> f32 {
    let s2 = sigma * sigma;
    return (1.0 / sqrt(TAU * s2)) * exp(-0.5 * x * x / s2);
}
"#
    .to_string()
}

/// Full-screen quad passthrough. The y sign flip makes texel row 0 land at
/// the top of the target, matching the raster image origin.
fn vertex_entry() -> String {
    r#"
@vertex
fn vs_main(@location(0) position: vec2f) -> VSOut {
    var out: VSOut;
    out.position = vec4f(position, 0.0, 1.0);
    out.uv = vec2f(position.x, -position.y) * 0.5 + vec2f(0.5, 0.5);
    return out;
}
"#
    .to_string()
}

/// Build the separable 1-D blur program. The active axis is selected per pass
/// by the `axis` uniform, so both passes share one compiled module.
pub fn build_separable_blur_bundle() -> ShaderBundle {
    let max = MAX_RADIUS as i32;
    let fragment_entry = format!(
        r#"
@fragment
fn fs_main(in: VSOut) -> @location(0) vec4f {{
    if (params.radius <= 0) {{
        return textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
    }}
    var acc = vec4f(0.0);
    for (var i: i32 = -{max}; i <= {max}; i = i + 1) {{
        if (i < -params.radius || i > params.radius) {{
            continue;
        }}
        let offset = f32(i);
        var uv = in.uv;
        if (params.axis == 0u) {{
            uv.y = clamp((in.uv.y * params.size.y + offset) / params.size.y, 0.0, 1.0);
        }} else {{
            uv.x = clamp((in.uv.x * params.size.x + offset) / params.size.x, 0.0, 1.0);
        }}
        acc = acc + textureSampleLevel(src_tex, src_samp, uv, 0.0) * gauss(offset, params.sigma);
    }}
    return acc * params.inv_weight_sum;
}}
"#
    );
    assemble("separable_blur", fragment_entry)
}

/// Build the naive 2-D blur program: one pass over the full `(i, j)` offset
/// grid, O(r²) per pixel. Kept as a simpler/slower reference mode.
pub fn build_naive_blur_bundle() -> ShaderBundle {
    let max = MAX_RADIUS as i32;
    let fragment_entry = format!(
        r#"
@fragment
fn fs_main(in: VSOut) -> @location(0) vec4f {{
    if (params.radius <= 0) {{
        return textureSampleLevel(src_tex, src_samp, in.uv, 0.0);
    }}
    var acc = vec4f(0.0);
    for (var i: i32 = -{max}; i <= {max}; i = i + 1) {{
        if (i < -params.radius || i > params.radius) {{
            continue;
        }}
        for (var j: i32 = -{max}; j <= {max}; j = j + 1) {{
            if (j < -params.radius || j > params.radius) {{
                continue;
            }}
            let x = clamp((in.uv.x * params.size.x + f32(i)) / params.size.x, 0.0, 1.0);
            let y = clamp((in.uv.y * params.size.y + f32(j)) / params.size.y, 0.0, 1.0);
            let w = gauss(f32(i), params.sigma) * gauss(f32(j), params.sigma);
            acc = acc + textureSampleLevel(src_tex, src_samp, vec2f(x, y), 0.0) * w;
        }}
    }}
    return acc * params.inv_weight_sum;
}}
"#
    );
    assemble("naive_blur", fragment_entry)
}

fn assemble(label: &'static str, fragment_entry: String) -> ShaderBundle {
    let common = blur_common();
    let vertex_entry = vertex_entry();
    let vertex = format!("{common}{vertex_entry}");
    let fragment = format!("{common}{fragment_entry}");
    let module = format!("{common}{vertex_entry}{fragment_entry}");
    ShaderBundle {
        label,
        common,
        vertex,
        fragment,
        module,
    }
}
