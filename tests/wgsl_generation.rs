use gpu_blur::validation::{validate_bundle, validate_wgsl};
use gpu_blur::wgsl::{ShaderBundle, build_naive_blur_bundle, build_separable_blur_bundle};

fn all_bundles() -> Vec<ShaderBundle> {
    vec![build_separable_blur_bundle(), build_naive_blur_bundle()]
}

#[test]
fn generated_modules_parse_as_wgsl() {
    for bundle in all_bundles() {
        validate_wgsl(&bundle.module)
            .unwrap_or_else(|log| panic!("{} failed validation:\n{log}", bundle.label));
    }
}

#[test]
fn stage_sources_validate_individually() {
    for bundle in all_bundles() {
        validate_bundle(&bundle)
            .unwrap_or_else(|e| panic!("{} failed stage validation: {e}", bundle.label));
    }
}

#[test]
fn bundles_declare_the_shared_interface() {
    for bundle in all_bundles() {
        assert!(
            bundle.common.contains("struct BlurParams"),
            "{} missing uniform struct",
            bundle.label
        );
        assert!(bundle.common.contains("@group(0) @binding(0)"));
        assert!(bundle.common.contains("@group(1) @binding(0)"));
        assert!(bundle.common.contains("@group(1) @binding(1)"));
        assert!(bundle.module.contains("fn vs_main"));
        assert!(bundle.module.contains("fn fs_main"));
    }
}

#[test]
fn fragment_stages_mask_by_runtime_radius() {
    // The loop bound is compile-time; radius masking must be in the body so
    // one compiled module serves every radius.
    for bundle in all_bundles() {
        assert!(
            bundle.fragment.contains("params.radius"),
            "{} does not reference the radius uniform",
            bundle.label
        );
        assert!(bundle.fragment.contains("continue"));
    }
}

#[test]
fn naive_fragment_nests_both_offset_loops() {
    let bundle = build_naive_blur_bundle();
    assert!(bundle.fragment.contains("var i: i32"));
    assert!(bundle.fragment.contains("var j: i32"));
    // Separable has only the single offset loop.
    let sep = build_separable_blur_bundle();
    assert!(!sep.fragment.contains("var j: i32"));
}

#[test]
fn broken_module_reports_numbered_source() {
    let mut bundle = build_separable_blur_bundle();
    bundle.module.push_str("\nfn broken( -> f32 {}\n");
    let log = validate_wgsl(&bundle.module).unwrap_err();
    assert!(log.contains("Generated WGSL:"));
    assert!(log.contains("   1 | "));
}
