//! CPU reference implementation of the blur.
//!
//! Mirrors the fragment shaders tap for tap: same center-tap inclusion, same
//! index clamp at the image edge, same normalization multiplier. Used as the
//! oracle in tests and for verifying GPU output; not a fast path.

use image::RgbaImage;

use crate::kernel::{WeightNormalization, gauss, inv_weight_sum};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

fn to_planar(src: &RgbaImage) -> Vec<[f32; 4]> {
    src.pixels()
        .map(|p| {
            [
                p.0[0] as f32 / 255.0,
                p.0[1] as f32 / 255.0,
                p.0[2] as f32 / 255.0,
                p.0[3] as f32 / 255.0,
            ]
        })
        .collect()
}

fn to_rgba(data: &[[f32; 4]], width: u32, height: u32) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    for (px, src) in out.pixels_mut().zip(data) {
        for c in 0..4 {
            px.0[c] = (src[c].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
    out
}

/// One 1-D pass along `axis`. Out-of-range taps clamp to the edge texel,
/// matching the shader's coordinate clamp plus clamp-to-edge sampling.
pub fn blur_axis(
    data: &[[f32; 4]],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
    normalization: WeightNormalization,
    axis: Axis,
) -> Vec<[f32; 4]> {
    if radius == 0 {
        return data.to_vec();
    }
    let r = radius as i64;
    let inv = inv_weight_sum(radius, sigma, normalization);
    let (w, h) = (width as i64, height as i64);
    let mut out = vec![[0.0f32; 4]; data.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for i in -r..=r {
                let (sx, sy) = match axis {
                    Axis::Vertical => (x, (y + i).clamp(0, h - 1)),
                    Axis::Horizontal => ((x + i).clamp(0, w - 1), y),
                };
                let g = gauss(i as f32, sigma);
                let src = &data[(sy * w + sx) as usize];
                for c in 0..4 {
                    acc[c] += src[c] * g;
                }
            }
            let dst = &mut out[(y * w + x) as usize];
            for c in 0..4 {
                dst[c] = acc[c] * inv;
            }
        }
    }
    out
}

/// Separable two-pass blur: vertical, then horizontal on the intermediate.
pub fn blur_separable(
    src: &RgbaImage,
    radius: u32,
    sigma: f32,
    normalization: WeightNormalization,
) -> RgbaImage {
    let (w, h) = src.dimensions();
    let planar = to_planar(src);
    let pass_a = blur_axis(&planar, w, h, radius, sigma, normalization, Axis::Vertical);
    let pass_b = blur_axis(&pass_a, w, h, radius, sigma, normalization, Axis::Horizontal);
    to_rgba(&pass_b, w, h)
}

/// Naive single-pass 2-D blur over the full offset grid.
pub fn blur_naive(
    src: &RgbaImage,
    radius: u32,
    sigma: f32,
    normalization: WeightNormalization,
) -> RgbaImage {
    let (width, height) = src.dimensions();
    let planar = to_planar(src);
    if radius == 0 {
        return to_rgba(&planar, width, height);
    }
    let r = radius as i64;
    let inv_1d = inv_weight_sum(radius, sigma, normalization);
    let inv = inv_1d * inv_1d;
    let (w, h) = (width as i64, height as i64);
    let mut out = vec![[0.0f32; 4]; planar.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for i in -r..=r {
                for j in -r..=r {
                    let sx = (x + i).clamp(0, w - 1);
                    let sy = (y + j).clamp(0, h - 1);
                    let g = gauss(i as f32, sigma) * gauss(j as f32, sigma);
                    let src_px = &planar[(sy * w + sx) as usize];
                    for c in 0..4 {
                        acc[c] += src_px[c] * g;
                    }
                }
            }
            let dst = &mut out[(y * w + x) as usize];
            for c in 0..4 {
                dst[c] = acc[c] * inv;
            }
        }
    }
    to_rgba(&out, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SigmaPolicy;
    use image::Rgba;

    fn flat(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn radius_zero_is_identity() {
        let mut src = flat(5, 4, 40);
        src.put_pixel(2, 1, Rgba([200, 10, 60, 255]));
        let sigma = SigmaPolicy::SmallRadiusBoost.sigma(0);
        let out = blur_separable(&src, 0, sigma, WeightNormalization::Normalized);
        assert_eq!(src, out);
        let out = blur_naive(&src, 0, sigma, WeightNormalization::Normalized);
        assert_eq!(src, out);
    }

    #[test]
    fn flat_color_is_preserved_when_normalized() {
        let src = flat(8, 8, 120);
        for radius in [1, 3, 7] {
            let sigma = SigmaPolicy::SmallRadiusBoost.sigma(radius);
            let out = blur_separable(&src, radius, sigma, WeightNormalization::Normalized);
            for px in out.pixels() {
                assert_eq!(px.0, [120, 120, 120, 255], "radius {radius}");
            }
        }
    }

    #[test]
    fn separable_equals_naive_on_point_source() {
        // Separability: two 1-D passes match the full 2-D kernel.
        let mut src = flat(9, 9, 0);
        src.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let sigma = SigmaPolicy::SmallRadiusBoost.sigma(2);
        let sep = blur_separable(&src, 2, sigma, WeightNormalization::Normalized);
        let naive = blur_naive(&src, 2, sigma, WeightNormalization::Normalized);
        for (a, b) in sep.pixels().zip(naive.pixels()) {
            for c in 0..4 {
                assert!(a.0[c].abs_diff(b.0[c]) <= 1);
            }
        }
    }

    #[test]
    fn edge_contributions_clamp_instead_of_wrapping() {
        // Sentinel on the far right edge; blur a pixel on the left edge.
        // With clamp-to-edge the sentinel must not contribute.
        let mut src = flat(16, 1, 0);
        src.put_pixel(15, 0, Rgba([255, 0, 0, 255]));
        let sigma = SigmaPolicy::SmallRadiusBoost.sigma(3);
        let out = blur_separable(&src, 3, sigma, WeightNormalization::Normalized);
        assert_eq!(out.get_pixel(0, 0).0[0], 0, "sentinel wrapped around");
        // And the edge pixel's own neighborhood reads the clamped edge texel.
        assert!(out.get_pixel(15, 0).0[0] > 0);
    }
}
