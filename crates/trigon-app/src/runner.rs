//! Application runner and event loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::renderer::Renderer;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Path to the vertex shader bytecode.
    pub vertex_shader: PathBuf,
    /// Path to the fragment shader bytecode.
    pub fragment_shader: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Triangle".to_string(),
            width: 600,
            height: 600,
            validation: cfg!(debug_assertions),
            vertex_shader: PathBuf::from("shaders/triangle.vert.spv"),
            fragment_shader: PathBuf::from("shaders/triangle.frag.spv"),
        }
    }
}

/// Run the renderer with the given configuration.
///
/// Creates the window and the full resource chain, then drives the
/// presentation loop until the window is closed or a termination signal
/// arrives. Both exits take the same orderly teardown path.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst)) {
            warn!("Could not install termination handler: {e}");
        }
    }

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        shutdown,
        state: None,
        failure: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

/// Internal application runner implementing winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    shutdown: Arc<AtomicBool>,
    state: Option<AppState>,
    failure: Option<anyhow::Error>,
}

struct AppState {
    window: Arc<Window>,
    renderer: Renderer,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Renderer ready");
            }
            Err(e) => {
                error!("Failed to initialize renderer: {e}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.finish(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    match state.renderer.draw_frame() {
                        Ok(()) => state.window.request_redraw(),
                        Err(e) => {
                            error!("Render error: {e}");
                            self.failure = Some(e.into());
                            self.finish(event_loop);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // The termination signal takes the same orderly path as a
        // window close, checked once per loop iteration.
        if self.shutdown.load(Ordering::SeqCst) {
            info!("Termination signal received");
            self.finish(event_loop);
            return;
        }

        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        center_window(&window);

        let renderer = Renderer::new(&window, &self.config)?;

        Ok(AppState { window, renderer })
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            info!("Rendered {} frames", state.renderer.frame_count());
            // Dropping the renderer waits for in-flight GPU work and
            // releases every resource in reverse creation order.
            drop(state);
        }
        event_loop.exit();
    }
}

fn center_window(window: &Window) {
    if let Some(monitor) = window.primary_monitor() {
        let monitor_size = monitor.size();
        let window_size = window.outer_size();
        let position = PhysicalPosition::new(
            monitor.position().x
                + (monitor_size.width.saturating_sub(window_size.width) / 2) as i32,
            monitor.position().y
                + (monitor_size.height.saturating_sub(window_size.height) / 2) as i32,
        );
        window.set_outer_position(position);
    }
}
