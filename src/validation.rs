//! WGSL validation using the naga library.
//!
//! Generated shaders are validated on the host before any GPU object is
//! built, so a bad bundle fails fast with a readable log instead of a
//! driver-side panic. Stage sources are checked individually to attribute
//! the failure; the combined module check catches interface mismatches
//! between the stages (the link step).

use crate::error::{BlurError, BlurResult, ShaderStage};
use crate::wgsl::ShaderBundle;

/// Validate WGSL source code using naga's parser.
pub fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
    naga::front::wgsl::parse_str(source).map_err(|e| format_naga_error(source, &e))
}

/// Validate a generated bundle stage by stage, then as a whole program.
///
/// A stage failure maps to `ShaderCompile` naming that stage; a failure only
/// the combined module exhibits maps to `ShaderLink`.
pub fn validate_bundle(bundle: &ShaderBundle) -> BlurResult<()> {
    validate_wgsl(&bundle.vertex).map_err(|log| BlurError::ShaderCompile {
        stage: ShaderStage::Vertex,
        log,
    })?;
    validate_wgsl(&bundle.fragment).map_err(|log| BlurError::ShaderCompile {
        stage: ShaderStage::Fragment,
        log,
    })?;
    validate_wgsl(&bundle.module).map_err(BlurError::ShaderLink)?;
    Ok(())
}

/// Format a naga parse error with numbered source context.
fn format_naga_error(source: &str, error: &naga::front::wgsl::ParseError) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {}\n", error));
    output.push_str("\nGenerated WGSL:\n");
    output.push_str("---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}
