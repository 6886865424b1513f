//! Vulkan layer for the Trigon renderer.
//!
//! This crate provides:
//! - instance and logical device management with ownership-ordered
//!   teardown
//! - adapter scoring and queue family selection
//! - surface, swapchain, and render target construction
//! - one-shot command recording and frame synchronization

pub mod adapter;
pub mod command;
pub mod device;
pub mod error;
pub mod instance;
pub mod pipeline;
pub mod release;
pub mod render_target;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use adapter::{AdapterInfo, GraphicsQueueMode, QueueFamilyDescriptor};
pub use command::CommandPool;
pub use device::LogicalContext;
pub use error::{GpuError, Result};
pub use instance::Context;
pub use pipeline::GraphicsPipeline;
pub use release::ReleaseStack;
pub use surface::{Surface, SurfaceCapabilities};
pub use swapchain::Swapchain;
pub use sync::{FrameSlots, FrameSync};
