//! Trigon demo viewer.
//!
//! Brings up a Vulkan context on the best available adapter and
//! presents a fixed triangle in a 600x600 window until the window is
//! closed or the process is interrupted.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p trigon-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--verbosity <LEVEL>`: quiet, fatal, err, warn, info, debug, trace
//! - `--vertex-shader <PATH>`: vertex shader bytecode
//!   (default: `shaders/triangle.vert.spv`)
//! - `--fragment-shader <PATH>`: fragment shader bytecode
//!   (default: `shaders/triangle.frag.spv`)
//!
//! The shader sources under `shaders/` are compiled externally, e.g.:
//!
//! ```bash
//! glslc shaders/triangle.vert -o shaders/triangle.vert.spv
//! glslc shaders/triangle.frag -o shaders/triangle.frag.spv
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: overrides `--verbosity` when set

use tracing_subscriber::EnvFilter;
use trigon_app::{run, AppConfig};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity_directive(&args))),
        )
        .init();

    run(config_from_args(&args))
}

fn config_from_args(args: &[String]) -> AppConfig {
    let mut config = AppConfig::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--vertex-shader" => {
                if let Some(path) = iter.next() {
                    config.vertex_shader = path.into();
                }
            }
            "--fragment-shader" => {
                if let Some(path) = iter.next() {
                    config.fragment_shader = path.into();
                }
            }
            _ => {}
        }
    }

    config
}

/// Map the `--verbosity` flag onto a tracing filter directive.
fn verbosity_directive(args: &[String]) -> &'static str {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--verbosity" {
            if let Some(level) = iter.next() {
                return match level.to_lowercase().as_str() {
                    "quiet" => "off",
                    "fatal" | "err" => "error",
                    "warn" => "warn",
                    "debug" => "debug",
                    "trace" => "trace",
                    _ => "info",
                };
            }
        }
    }

    "info"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn verbosity_levels_map_onto_filter_directives() {
        assert_eq!(verbosity_directive(&args(&["--verbosity", "quiet"])), "off");
        assert_eq!(verbosity_directive(&args(&["--verbosity", "err"])), "error");
        assert_eq!(
            verbosity_directive(&args(&["--verbosity", "TRACE"])),
            "trace"
        );
    }

    #[test]
    fn missing_flag_defaults_to_info() {
        assert_eq!(verbosity_directive(&args(&[])), "info");
        assert_eq!(verbosity_directive(&args(&["--verbosity"])), "info");
    }

    #[test]
    fn shader_paths_are_overridable() {
        let config = config_from_args(&args(&["--vertex-shader", "out/tri.vert.spv"]));
        assert_eq!(config.vertex_shader, std::path::Path::new("out/tri.vert.spv"));
        assert_eq!(
            config.fragment_shader,
            std::path::Path::new("shaders/triangle.frag.spv")
        );
    }
}
