//! Gaussian kernel math: radius → sigma mapping and discrete weights.
//!
//! Pure functions, no GPU dependency. The fragment shader evaluates the same
//! weight function per tap (see `wgsl.rs`); host-side evaluation exists for
//! the normalization uniform and for the CPU reference oracle.

use serde::{Deserialize, Serialize};

/// Largest radius a single compiled shader supports. The fragment stage
/// iterates a fixed `[-MAX_RADIUS, MAX_RADIUS]` range and masks taps outside
/// the runtime radius, so no recompilation happens when the radius changes.
pub const MAX_RADIUS: u32 = 50;

/// Sigma used when radius is 0, to keep `gauss` finite. Radius 0 renders
/// pass-through and never actually weights neighbors.
pub const SIGMA_EPSILON: f32 = 1e-3;

/// How sigma is derived from the blur radius.
///
/// Baseline is `sigma = 0.5 * radius`; both policies correct the visibly
/// too-sharp result at small radii, in different ways. They produce visibly
/// different softness, so the choice is part of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigmaPolicy {
    /// Multiplicative boost at r = 1 (×1.8) and r = 2 (×1.2). Default.
    #[default]
    SmallRadiusBoost,
    /// Additive decaying correction term: `sigma += exp(-0.05 * r)`.
    /// Historical variant, kept selectable but not merged with the default.
    DecayCorrected,
}

impl SigmaPolicy {
    /// Map a radius to a Gaussian standard deviation. Always positive.
    pub fn sigma(self, radius: u32) -> f32 {
        if radius == 0 {
            return SIGMA_EPSILON;
        }
        let base = 0.5 * radius as f32;
        match self {
            SigmaPolicy::SmallRadiusBoost => match radius {
                1 => base * 1.8,
                2 => base * 1.2,
                _ => base,
            },
            SigmaPolicy::DecayCorrected => base + (-0.05 * radius as f32).exp(),
        }
    }
}

/// Whether accumulated tap weights are renormalized to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightNormalization {
    /// Divide by the actual weight sum. Conserves brightness at every radius.
    #[default]
    Normalized,
    /// No division; total weight is assumed ≈ 1 by construction. Carries a
    /// slight brightness drift at small sigma from the truncated tails.
    Legacy,
}

/// The discrete Gaussian weight for integer offset `x`.
pub fn gauss(x: f32, sigma: f32) -> f32 {
    let s2 = sigma * sigma;
    (1.0 / (std::f32::consts::TAU * s2).sqrt()) * (-0.5 * x * x / s2).exp()
}

/// Sum of weights over `[-radius, radius]`, center tap included.
pub fn weight_sum(radius: u32, sigma: f32) -> f32 {
    let r = radius as i32;
    (-r..=r).map(|i| gauss(i as f32, sigma)).sum()
}

/// The multiplier applied to the accumulated color for one 1-D pass.
pub fn inv_weight_sum(radius: u32, sigma: f32, normalization: WeightNormalization) -> f32 {
    match normalization {
        WeightNormalization::Normalized => 1.0 / weight_sum(radius, sigma),
        WeightNormalization::Legacy => 1.0,
    }
}

/// All weights for offsets `-radius..=radius`, in offset order.
/// Used by the CPU reference oracle; the shader evaluates `gauss` directly.
pub fn weights(radius: u32, sigma: f32) -> Vec<f32> {
    let r = radius as i32;
    (-r..=r).map(|i| gauss(i as f32, sigma)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sigma_baseline_is_half_radius() {
        assert_eq!(SigmaPolicy::SmallRadiusBoost.sigma(10), 5.0);
        assert_eq!(SigmaPolicy::SmallRadiusBoost.sigma(50), 25.0);
    }

    #[test]
    fn sigma_small_radius_boost() {
        assert!((SigmaPolicy::SmallRadiusBoost.sigma(1) - 0.9).abs() < 1e-6);
        assert!((SigmaPolicy::SmallRadiusBoost.sigma(2) - 1.2).abs() < 1e-6);
        // No boost from r = 3 on.
        assert_eq!(SigmaPolicy::SmallRadiusBoost.sigma(3), 1.5);
    }

    #[test]
    fn sigma_decay_corrected_adds_decaying_term() {
        let s1 = SigmaPolicy::DecayCorrected.sigma(1);
        assert!((s1 - (0.5 + (-0.05f32).exp())).abs() < 1e-6);
        // The correction decays: at large radii it contributes < 0.1.
        let s50 = SigmaPolicy::DecayCorrected.sigma(50);
        assert!(s50 - 25.0 < 0.1);
        assert!(s50 > 25.0);
    }

    #[test]
    fn sigma_zero_radius_is_positive_epsilon() {
        for policy in [SigmaPolicy::SmallRadiusBoost, SigmaPolicy::DecayCorrected] {
            let s = policy.sigma(0);
            assert!(s > 0.0);
            assert!(s <= 1e-2);
        }
    }

    #[test]
    fn weights_match_gauss_and_peak_at_center() {
        let w = weights(3, 1.5);
        assert_eq!(w.len(), 7);
        for (k, &wk) in w.iter().enumerate() {
            let x = k as f32 - 3.0;
            assert_eq!(wk, gauss(x, 1.5));
        }
        let center = w[3];
        assert!(w.iter().all(|&wk| wk <= center));
    }

    #[test]
    fn normalized_inverse_sum_normalizes() {
        let sigma = SigmaPolicy::SmallRadiusBoost.sigma(5);
        let inv = inv_weight_sum(5, sigma, WeightNormalization::Normalized);
        let total: f32 = weights(5, sigma).iter().map(|w| w * inv).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn legacy_drift_is_bounded() {
        // Without normalization the truncated-tail weight sum stays within 8%
        // of 1 for the radii the boost policy produces. The worst case is
        // radius 1 (sigma 0.9), where the sum is about 0.92.
        for r in 1..=MAX_RADIUS {
            let sigma = SigmaPolicy::SmallRadiusBoost.sigma(r);
            let total = weight_sum(r, sigma);
            assert!(
                (total - 1.0).abs() < 0.08,
                "radius {r}: weight sum {total} drifts more than documented"
            );
        }
    }

    proptest! {
        #[test]
        fn gauss_is_symmetric(x in 0.0f32..64.0, sigma in 0.1f32..30.0) {
            let a = gauss(x, sigma);
            let b = gauss(-x, sigma);
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }

        #[test]
        fn gauss_decreases_away_from_center(x in 0.0f32..63.0, sigma in 0.1f32..30.0) {
            prop_assert!(gauss(x, sigma) >= gauss(x + 1.0, sigma));
        }

        #[test]
        fn sigma_is_always_positive(r in 0u32..=MAX_RADIUS) {
            for policy in [SigmaPolicy::SmallRadiusBoost, SigmaPolicy::DecayCorrected] {
                prop_assert!(policy.sigma(r) > 0.0);
            }
        }
    }
}
