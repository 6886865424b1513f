//! Window and frame-loop driver for the Trigon renderer.
//!
//! Builds the full resource chain (instance to recorded command
//! buffers), drives the steady-state presentation loop, and tears
//! everything down in exact reverse creation order.

pub mod renderer;
pub mod runner;

pub use renderer::Renderer;
pub use runner::{run, AppConfig};
