//! Presentation surface management.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{GpuError, Result};
use crate::instance::Context;

/// A window-bound drawable surface.
///
/// Jointly owned by the window and the instance: the window handles must
/// stay valid for its lifetime, and it must be released before the
/// instance and after the swapchain built on it.
pub struct Surface {
    surface: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Bind a window to a Vulkan surface.
    ///
    /// # Safety
    /// The window's display and window handles must remain valid for the
    /// lifetime of the surface.
    pub unsafe fn bind<W>(context: &Context, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::ContextCreation(format!("no display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::ContextCreation(format!("no window handle: {e}")))?;

        let surface = ash_window::create_surface(
            context.entry(),
            context.instance(),
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )?;

        let loader = ash::khr::surface::Instance::new(context.entry(), context.instance());

        Ok(Self { surface, loader })
    }

    /// Get the raw surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface extension loader.
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }

    /// Whether the adapter can present to this surface from the given
    /// queue family. `false` is fatal for setup in this design.
    pub fn supports(&self, adapter: vk::PhysicalDevice, queue_family_index: u32) -> Result<bool> {
        let supported = unsafe {
            self.loader.get_physical_device_surface_support(
                adapter,
                queue_family_index,
                self.surface,
            )?
        };
        Ok(supported)
    }

    /// Snapshot the surface's capabilities, formats, and present modes.
    pub fn capabilities(&self, adapter: vk::PhysicalDevice) -> Result<SurfaceCapabilities> {
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(adapter, self.surface)?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(adapter, self.surface)?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(adapter, self.surface)?;

            Ok(SurfaceCapabilities {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

/// Surface capabilities query result.
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Pick the surface format: the first one reported.
///
/// Deterministic but not quality-optimal; good enough for a single
/// fixed-function pass that never samples its own output.
pub fn best_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats[0]
}

/// Pick the present mode: MAILBOX when offered, else FIFO.
///
/// FIFO is the only mode Vulkan guarantees, so it is the fallback.
pub fn best_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Pick the swapchain extent: component-wise minimum of the surface's
/// current extent and the window's framebuffer size.
pub fn best_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_size: (u32, u32),
) -> vk::Extent2D {
    let (width, height) = framebuffer_size;
    vk::Extent2D {
        width: capabilities.current_extent.width.min(width),
        height: capabilities.current_extent.height.min(height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn caps_with_extent(width: u32, height: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width, height },
            ..Default::default()
        }
    }

    #[test]
    fn first_format_wins() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM),
            format(vk::Format::B8G8R8A8_SRGB),
        ];
        assert_eq!(best_format(&formats).format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(best_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_fallback_without_mailbox() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(best_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_never_exceeds_either_input() {
        let caps = caps_with_extent(800, 600);

        let extent = best_extent(&caps, (600, 900));
        assert_eq!(extent.width, 600);
        assert_eq!(extent.height, 600);

        let extent = best_extent(&caps, (1024, 400));
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 400);
    }

    #[test]
    fn extent_matches_when_window_equals_surface() {
        let caps = caps_with_extent(600, 600);
        let extent = best_extent(&caps, (600, 600));
        assert_eq!((extent.width, extent.height), (600, 600));
    }
}
