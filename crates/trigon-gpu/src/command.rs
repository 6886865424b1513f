//! Command pool and one-shot draw recording.

use ash::vk;

use crate::error::{GpuError, Result};

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// No reset flag: buffers from this pool are recorded exactly once.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Allocate primary command buffers, one per swapchain image.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate(
        &self,
        device: &ash::Device,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers)
    }
}

/// Record the static draw sequence into each buffer, matched 1:1 with
/// the framebuffers: begin the render pass, bind the pipeline, draw the
/// three generated vertices, end. Buffers are never reset or
/// re-recorded afterwards.
///
/// # Safety
/// All handles must be valid and the buffers must be freshly allocated.
pub unsafe fn record_draw_sequence(
    device: &ash::Device,
    buffers: &[vk::CommandBuffer],
    render_pass: vk::RenderPass,
    framebuffers: &[vk::Framebuffer],
    extent: vk::Extent2D,
    pipeline: vk::Pipeline,
) -> Result<()> {
    for (&cmd, &framebuffer) in buffers.iter().zip(framebuffers) {
        let begin_info = vk::CommandBufferBeginInfo::default();
        device
            .begin_command_buffer(cmd, &begin_info)
            .map_err(|e| GpuError::CommandRecording(e.to_string()))?;

        let render_area = vk::Rect2D::default().extent(extent);
        let render_pass_begin = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area);

        device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        device.cmd_draw(cmd, 3, 1, 0, 0);
        device.cmd_end_render_pass(cmd);

        device
            .end_command_buffer(cmd)
            .map_err(|e| GpuError::CommandRecording(e.to_string()))?;
    }

    Ok(())
}

/// Submit command buffers to a queue with the frame's synchronization
/// hooks.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    device.queue_submit(queue, &[submit_info], fence)?;
    Ok(())
}
