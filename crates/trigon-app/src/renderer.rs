//! Renderer setup, frame loop, and teardown.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::HasDisplayHandle;
use tracing::info;
use winit::window::Window;

use trigon_gpu::adapter::{
    enumerate_adapters, enumerate_queue_families, graphics_queue_mode, score_and_select,
    select_graphics_family, AdapterInfo,
};
use trigon_gpu::command::{record_draw_sequence, submit_command_buffers, CommandPool};
use trigon_gpu::instance::required_window_extensions;
use trigon_gpu::render_target::{create_framebuffers, create_render_pass};
use trigon_gpu::shader::load_shader_bytecode;
use trigon_gpu::surface::{best_extent, best_format, best_present_mode};
use trigon_gpu::sync::{reset_fence, wait_for_fence};
use trigon_gpu::{
    Context, FrameSlots, FrameSync, GpuError, GraphicsPipeline, LogicalContext, ReleaseStack,
    Result, Surface, Swapchain,
};

use crate::runner::AppConfig;

/// Number of frames the CPU may run ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// The full resource chain and the presentation state machine.
///
/// Every GPU resource created during setup is registered in the release
/// registry; a failure at any stage unwinds the registry in reverse
/// creation order before the error propagates, and normal teardown
/// follows the same path after a device-idle wait.
pub struct Renderer {
    release: ReleaseStack,
    slots: FrameSlots,
    frames: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    swapchain: Swapchain,
    gpu: Arc<LogicalContext>,
    frame_count: u64,
}

struct Parts {
    slots: FrameSlots,
    frames: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    swapchain: Swapchain,
    gpu: Arc<LogicalContext>,
}

impl Renderer {
    /// Build the full chain: context, device, surface, swapchain, render
    /// targets, pipeline, recorded commands, and synchronization.
    pub fn new(window: &Window, config: &AppConfig) -> Result<Self> {
        let mut release = ReleaseStack::new();

        match Self::build(&mut release, window, config) {
            Ok(parts) => Ok(Self {
                release,
                slots: parts.slots,
                frames: parts.frames,
                command_buffers: parts.command_buffers,
                swapchain: parts.swapchain,
                gpu: parts.gpu,
                frame_count: 0,
            }),
            Err(e) => {
                release.unwind();
                Err(e)
            }
        }
    }

    fn build(release: &mut ReleaseStack, window: &Window, config: &AppConfig) -> Result<Parts> {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::ContextCreation(format!("no display handle: {e}")))?;
        let required_extensions = required_window_extensions(display.as_raw())?;

        let context = Arc::new(Context::new(
            &config.title,
            vk::make_api_version(0, 0, 1, 0),
            required_extensions,
            config.validation,
        )?);

        let adapters = enumerate_adapters(&context)?;
        let infos: Vec<AdapterInfo> = adapters
            .iter()
            // SAFETY: Instance and enumerated adapters are valid
            .map(|&adapter| unsafe { AdapterInfo::query(context.instance(), adapter) })
            .collect();
        let selected = score_and_select(&infos);
        let adapter = adapters[selected];
        info!("Adapter: {}", infos[selected].summary());

        let families = enumerate_queue_families(&context, adapter);
        let family = families[select_graphics_family(&families)?];
        let mode = graphics_queue_mode(&family);

        let gpu = Arc::new(LogicalContext::new(
            Arc::clone(&context),
            adapter,
            &family,
            mode,
        )?);

        // SAFETY: The window outlives the renderer; winit keeps its
        // handles valid until the window is dropped
        let surface = unsafe { Surface::bind(&context, window)? };
        release.defer("surface", {
            let context = Arc::clone(&context);
            let loader = surface.loader().clone();
            let handle = surface.handle();
            move || {
                // SAFETY: Swapchain entries unwind first; the captured
                // Arc keeps the instance alive until here
                unsafe { loader.destroy_surface(handle, None) };
                drop(context);
            }
        });

        if !surface.supports(adapter, family.index)? {
            return Err(GpuError::SurfaceUnsupported(family.index));
        }

        let caps = surface.capabilities(adapter)?;
        let format = best_format(&caps.formats);
        let present_mode = best_present_mode(&caps.present_modes);
        let size = window.inner_size();
        let extent = best_extent(&caps.capabilities, (size.width, size.height));

        // SAFETY: Surface support was checked above; the surface
        // outlives the swapchain through the release registry order
        let swapchain = unsafe {
            Swapchain::new(
                &gpu,
                surface.handle(),
                &caps.capabilities,
                format,
                present_mode,
                extent,
                mode,
            )?
        };
        release.defer("swapchain", {
            let gpu = Arc::clone(&gpu);
            let loader = swapchain.loader().clone();
            let handle = swapchain.handle();
            move || {
                // SAFETY: Teardown waits for device idle first; image
                // views unwind before this entry
                unsafe { loader.destroy_swapchain(handle, None) };
                drop(gpu);
            }
        });

        // SAFETY: Device and swapchain images are valid
        let image_views = unsafe { swapchain.create_image_views(gpu.device())? };
        release.defer("image views", {
            let gpu = Arc::clone(&gpu);
            let views = image_views.clone();
            move || {
                for view in views {
                    // SAFETY: Views are unused once teardown reaches here
                    unsafe { gpu.device().destroy_image_view(view, None) };
                }
            }
        });

        info!(
            "Swapchain: {}x{} ({} images, {:?}, {:?})",
            extent.width,
            extent.height,
            swapchain.images().len(),
            format.format,
            present_mode,
        );

        // SAFETY: Device is valid
        let render_pass = unsafe { create_render_pass(gpu.device(), format.format)? };
        release.defer("render pass", {
            let gpu = Arc::clone(&gpu);
            move || {
                // SAFETY: Framebuffers and the pipeline unwind first
                unsafe { gpu.device().destroy_render_pass(render_pass, None) };
            }
        });

        // SAFETY: Device, render pass, and views are valid
        let framebuffers =
            unsafe { create_framebuffers(gpu.device(), render_pass, extent, &image_views)? };
        release.defer("framebuffers", {
            let gpu = Arc::clone(&gpu);
            let framebuffers = framebuffers.clone();
            move || {
                for framebuffer in framebuffers {
                    // SAFETY: No command buffer references these once
                    // teardown reaches here
                    unsafe { gpu.device().destroy_framebuffer(framebuffer, None) };
                }
            }
        });

        let vertex_code = load_shader_bytecode(&config.vertex_shader)?;
        let fragment_code = load_shader_bytecode(&config.fragment_shader)?;

        // SAFETY: Device and render pass are valid; the loader returned
        // well-formed SPIR-V words
        let pipeline = unsafe {
            GraphicsPipeline::new(gpu.device(), &vertex_code, &fragment_code, render_pass, extent)?
        };
        let pipeline_handle = pipeline.pipeline;
        release.defer("pipeline", {
            let gpu = Arc::clone(&gpu);
            move || {
                // SAFETY: Teardown waits for device idle first
                unsafe { pipeline.destroy(gpu.device()) };
            }
        });

        // SAFETY: Device is valid and the family index was selected from
        // this adapter's enumeration
        let pool = unsafe { CommandPool::new(gpu.device(), family.index)? };
        let pool_handle = pool.handle();
        release.defer("command pool", {
            let gpu = Arc::clone(&gpu);
            move || {
                // SAFETY: Destroying the pool frees its buffers; all
                // submissions completed before teardown
                unsafe { gpu.device().destroy_command_pool(pool_handle, None) };
            }
        });

        let image_count = swapchain.images().len();
        // SAFETY: Device and pool are valid
        let command_buffers = unsafe { pool.allocate(gpu.device(), image_count as u32)? };
        // SAFETY: All recorded handles stay alive for the renderer's
        // lifetime; buffers are freshly allocated
        unsafe {
            record_draw_sequence(
                gpu.device(),
                &command_buffers,
                render_pass,
                &framebuffers,
                extent,
                pipeline_handle,
            )?;
        }

        let mut frames = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            // SAFETY: Device is valid
            let frame = unsafe { FrameSync::new(gpu.device())? };
            release.defer("frame sync", {
                let gpu = Arc::clone(&gpu);
                move || {
                    // SAFETY: Teardown waits for device idle first
                    unsafe { frame.destroy(gpu.device()) };
                }
            });
            frames.push(frame);
        }

        let slots = FrameSlots::new(FRAMES_IN_FLIGHT, image_count);

        Ok(Parts {
            slots,
            frames,
            command_buffers,
            swapchain,
            gpu,
        })
    }

    /// Run one iteration of the presentation loop.
    ///
    /// Waits for the current frame slot, acquires an image, submits the
    /// prerecorded commands for it, presents, and advances the slot.
    /// Acquire and present failures are fatal.
    pub fn draw_frame(&mut self) -> Result<()> {
        let device = self.gpu.device();
        let slot = self.slots.begin_frame();
        let frame = self.frames[slot];

        // SAFETY: Fence belongs to this device; the unbounded wait is
        // the slot-reuse barrier
        unsafe {
            wait_for_fence(device, frame.in_flight, u64::MAX)?;
            reset_fence(device, frame.in_flight)?;
        }

        // SAFETY: The semaphore is unsignaled: its previous signal was
        // consumed by the submission this slot's fence just resolved
        let (image_index, _suboptimal) =
            unsafe { self.swapchain.acquire_next_image(frame.image_available, u64::MAX)? };

        // The image may still be bound to another in-flight slot when
        // fewer slots than swapchain images exist.
        if let Some(previous) = self.slots.claim_image(image_index as usize) {
            // SAFETY: The previous slot's fence is either signaled or
            // pending a submitted batch; the wait cannot hang
            unsafe {
                wait_for_fence(device, self.frames[previous].in_flight, u64::MAX)?;
            }
        }

        let wait_semaphores = [frame.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [frame.render_finished];
        let command_buffers = [self.command_buffers[image_index as usize]];

        // SAFETY: The command buffer was recorded against this
        // swapchain's framebuffers and is not pending: its image's
        // prior use was resolved above
        unsafe {
            submit_command_buffers(
                device,
                self.gpu.drawing_queue(),
                &command_buffers,
                &wait_semaphores,
                &wait_stages,
                &signal_semaphores,
                frame.in_flight,
            )?;
        }

        // SAFETY: The image index comes from the acquisition above
        let _suboptimal = unsafe {
            self.swapchain.present(
                self.gpu.presenting_queue(),
                image_index,
                &signal_semaphores,
            )?
        };

        self.slots.advance();
        self.frame_count += 1;

        Ok(())
    }

    /// Total frames presented so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Let submitted work from the final iteration complete before
        // releasing anything.
        if let Err(e) = self.gpu.wait_idle() {
            tracing::error!("Failed to wait for device idle: {e}");
        }
        self.release.unwind();
    }
}
