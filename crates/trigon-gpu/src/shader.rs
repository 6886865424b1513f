//! Shader bytecode loading and module creation.

use std::fs::File;
use std::path::Path;

use ash::util::read_spv;
use ash::vk;

use crate::error::{GpuError, Result};

/// Load SPIR-V bytecode from disk.
///
/// A missing or unreadable file is the single most common setup failure
/// and aborts the whole sequence; the caller unwinds everything created
/// so far.
pub fn load_shader_bytecode(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path).map_err(|_| GpuError::ShaderNotFound(path.to_path_buf()))?;
    read_spv(&mut file).map_err(|_| GpuError::ShaderNotFound(path.to_path_buf()))
}

/// Create a shader module from loaded bytecode.
///
/// # Safety
/// The device must be valid and the code must be valid SPIR-V.
pub unsafe fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    let module = device
        .create_shader_module(&create_info, None)
        .map_err(|e| GpuError::PipelineCreation(format!("shader module: {e}")))?;
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_shader_not_found() {
        let path = Path::new("does/not/exist.spv");
        match load_shader_bytecode(path) {
            Err(GpuError::ShaderNotFound(reported)) => assert_eq!(reported, path),
            other => panic!("expected ShaderNotFound, got {other:?}"),
        }
    }
}
