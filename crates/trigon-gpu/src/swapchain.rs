//! Swapchain management.

use ash::vk;

use crate::adapter::GraphicsQueueMode;
use crate::device::LogicalContext;
use crate::error::{GpuError, Result};

/// Number of swapchain images to request: one more than the minimum,
/// clamped to the maximum when the surface reports one (zero means
/// unbounded).
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

/// The ordered ring of presentable images tied to a surface.
///
/// Format and extent are fixed for the swapchain's lifetime; a window
/// resize invalidates it (recreation is out of scope here).
pub struct Swapchain {
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::SurfaceFormatKHR,
}

impl Swapchain {
    /// Create a new swapchain.
    ///
    /// Sharing mode is exclusive for a single queue and concurrent when
    /// drawing and presentation use two queues.
    ///
    /// # Safety
    /// The surface must be presentable from the device's queue family
    /// and must outlive the swapchain.
    pub unsafe fn new(
        gpu: &LogicalContext,
        surface: vk::SurfaceKHR,
        capabilities: &vk::SurfaceCapabilitiesKHR,
        format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        extent: vk::Extent2D,
        queue_mode: GraphicsQueueMode,
    ) -> Result<Self> {
        let loader =
            ash::khr::swapchain::Device::new(gpu.context().instance(), gpu.device());

        // TODO: derive the concurrent-mode indices from the actually
        // selected drawing/presenting families instead of assuming 0
        // and 1.
        let shared_family_indices = [0u32, 1u32];

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count(capabilities))
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        create_info = if queue_mode == GraphicsQueueMode::Shared {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&shared_family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = loader
            .create_swapchain(&create_info, None)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let images = match loader.get_swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                loader.destroy_swapchain(swapchain, None);
                return Err(GpuError::SwapchainCreation(e.to_string()));
            }
        };

        Ok(Self {
            loader,
            swapchain,
            images,
            format,
        })
    }

    /// Get the swapchain images (owned by the swapchain itself).
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Get the raw swapchain handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the swapchain extension loader.
    pub fn loader(&self) -> &ash::khr::swapchain::Device {
        &self.loader
    }

    /// Create one image view per swapchain image: 2D, identity swizzle,
    /// a single mip level, color aspect only.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn create_image_views(&self, device: &ash::Device) -> Result<Vec<vk::ImageView>> {
        let mut views = Vec::with_capacity(self.images.len());

        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            match device.create_image_view(&view_info, None) {
                Ok(view) => views.push(view),
                Err(e) => {
                    for view in views {
                        device.destroy_image_view(view, None);
                    }
                    return Err(GpuError::SwapchainCreation(format!(
                        "image view creation failed: {e}"
                    )));
                }
            }
        }

        Ok(views)
    }

    /// Acquire the next image, signaling `semaphore` once it is usable.
    ///
    /// Any acquisition failure (including an out-of-date surface) is
    /// fatal in this design.
    ///
    /// # Safety
    /// The semaphore must be valid and unsignaled.
    pub unsafe fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<(u32, bool)> {
        self.loader
            .acquire_next_image(self.swapchain, timeout_ns, semaphore, vk::Fence::null())
            .map_err(|e| GpuError::Presentation(format!("image acquisition failed: {e}")))
    }

    /// Present an image on `queue` after `wait_semaphores` signal.
    ///
    /// # Safety
    /// The image index must come from a successful acquisition on this
    /// swapchain.
    pub unsafe fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        self.loader
            .queue_present(queue, &present_info)
            .map_err(|e| GpuError::Presentation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn one_more_than_minimum() {
        assert_eq!(image_count(&caps(2, 8)), 3);
    }

    #[test]
    fn clamped_to_maximum() {
        assert_eq!(image_count(&caps(3, 3)), 3);
    }

    #[test]
    fn zero_maximum_means_unbounded() {
        assert_eq!(image_count(&caps(7, 0)), 8);
    }

    #[test]
    fn count_stays_within_reported_bounds() {
        for min in 1..8 {
            for max in [min, min + 1, min + 4, 0] {
                let count = image_count(&caps(min, max));
                assert!(count >= min + 1 || count == max);
                if max > 0 {
                    assert!(count <= max);
                }
            }
        }
    }
}
