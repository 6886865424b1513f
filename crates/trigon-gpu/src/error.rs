//! GPU error types.

use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
///
/// Every creation-phase variant is fatal: setup unwinds all previously
/// created resources in reverse order before the error propagates out.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Raw Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No compatible rendering adapter found.
    #[error("no compatible rendering adapter found")]
    NoAdapter,

    /// Instance creation failed or a required extension/layer is missing.
    #[error("instance creation failed: {0}")]
    ContextCreation(String),

    /// Logical device creation failed.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// The surface is not presentable from the selected queue family.
    #[error("surface not supported by queue family {0}")]
    SurfaceUnsupported(u32),

    /// Swapchain creation failed.
    #[error("swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Framebuffer creation failed.
    #[error("framebuffer creation failed: {0}")]
    FramebufferCreation(String),

    /// Shader bytecode file missing or unreadable.
    #[error("shader bytecode not found: {}", .0.display())]
    ShaderNotFound(PathBuf),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Command buffer recording failed.
    #[error("command recording failed: {0}")]
    CommandRecording(String),

    /// Image acquisition or presentation failed.
    #[error("presentation failed: {0}")]
    Presentation(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
