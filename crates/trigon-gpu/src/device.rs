//! Logical device and queue ownership.

use std::sync::Arc;

use ash::vk;

use crate::adapter::{GraphicsQueueMode, QueueFamilyDescriptor};
use crate::error::{GpuError, Result};
use crate::instance::Context;

/// The process's execution context on a chosen adapter.
///
/// Owns the logical device and the drawing/presenting queues, created
/// eagerly at construction. Holds an `Arc<Context>` so the instance
/// outlives the device; `Drop` waits for the device to go idle before
/// destroying it.
pub struct LogicalContext {
    context: Arc<Context>,
    device: ash::Device,
    drawing_queue: vk::Queue,
    presenting_queue: vk::Queue,
}

impl LogicalContext {
    /// Create the logical device with its queue(s).
    ///
    /// `Exclusive` mode creates one queue reused for presentation;
    /// `Shared` creates two queues in the same family. `Unsupported`
    /// (a family with zero queues) is a driver-contract violation and
    /// rejected outright.
    pub fn new(
        context: Arc<Context>,
        adapter: vk::PhysicalDevice,
        family: &QueueFamilyDescriptor,
        mode: GraphicsQueueMode,
    ) -> Result<Self> {
        let queue_count = match mode {
            GraphicsQueueMode::Exclusive => 1,
            GraphicsQueueMode::Shared => 2,
            GraphicsQueueMode::Unsupported => {
                return Err(GpuError::DeviceCreation(format!(
                    "queue family {} reports zero queues",
                    family.index
                )));
            }
        };

        let queue_priorities = [1.0_f32, 1.0_f32];
        let queue_create_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(family.index)
            .queue_priorities(&queue_priorities[..queue_count]);

        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extension_names);

        let device = unsafe {
            context
                .instance()
                .create_device(adapter, &create_info, None)
        }
        .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        let drawing_queue = unsafe { device.get_device_queue(family.index, 0) };
        let presenting_queue = match mode {
            GraphicsQueueMode::Exclusive => drawing_queue,
            _ => unsafe { device.get_device_queue(family.index, 1) },
        };

        tracing::debug!(
            "Logical device created on queue family {} ({:?})",
            family.index,
            mode
        );

        Ok(Self {
            context,
            device,
            drawing_queue,
            presenting_queue,
        })
    }

    /// Get the owning top-level context.
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the drawing queue.
    pub fn drawing_queue(&self) -> vk::Queue {
        self.drawing_queue
    }

    /// Get the presenting queue (the drawing queue in `Exclusive` mode).
    pub fn presenting_queue(&self) -> vk::Queue {
        self.presenting_queue
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for LogicalContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}
