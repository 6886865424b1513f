//! Vulkan instance creation and ownership.

use std::ffi::{c_char, CStr, CString};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{GpuError, Result};

/// Validation layers requested in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Instance extensions required to present to the given display.
pub fn required_window_extensions(
    display: RawDisplayHandle,
) -> Result<&'static [*const c_char]> {
    ash_window::enumerate_required_extensions(display)
        .map_err(|e| GpuError::ContextCreation(format!("window-system extensions: {e}")))
}

/// Top-level Vulkan context: the loaded entry point and the instance.
///
/// Everything else in this crate is a child of a `Context`; children hold
/// an `Arc<Context>` so the instance can only be destroyed last.
pub struct Context {
    // Entry must be kept alive for the lifetime of the instance
    entry: ash::Entry,
    instance: ash::Instance,
}

impl Context {
    /// Create the Vulkan instance.
    ///
    /// Supported instance extensions and layers are queried first: a
    /// missing window-system extension, or (when validation is enabled)
    /// a missing validation layer, fails fast with a descriptive error
    /// instead of attempting creation with an unsupported configuration.
    pub fn new(
        app_name: &str,
        app_version: u32,
        required_extensions: &[*const c_char],
        enable_validation: bool,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::ContextCreation(format!("failed to load Vulkan: {e}")))?;

        let app_name = CString::new(app_name)
            .map_err(|_| GpuError::ContextCreation("application name contains NUL".to_string()))?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(app_version)
            .api_version(vk::API_VERSION_1_0);

        let mut extension_names: Vec<*const c_char> = required_extensions.to_vec();

        // Required for MoltenVK on macOS
        if cfg!(target_os = "macos") {
            extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());
        }

        check_extension_support(&entry, &extension_names)?;

        let layers = if enable_validation {
            validation_layers()
        } else {
            vec![]
        };
        check_layer_support(&entry, &layers)?;
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let create_flags = if cfg!(target_os = "macos") {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(|e| GpuError::ContextCreation(e.to_string()))?;

        Ok(Self { entry, instance })
    }

    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}

fn check_extension_support(entry: &ash::Entry, requested: &[*const c_char]) -> Result<()> {
    let available = unsafe { entry.enumerate_instance_extension_properties(None)? };

    for &extension in requested {
        let name = unsafe { CStr::from_ptr(extension) };
        let found = available
            .iter()
            .any(|props| unsafe { CStr::from_ptr(props.extension_name.as_ptr()) } == name);
        if !found {
            return Err(GpuError::ContextCreation(format!(
                "required instance extension {} not supported",
                name.to_string_lossy()
            )));
        }
    }

    Ok(())
}

fn check_layer_support(entry: &ash::Entry, requested: &[&CStr]) -> Result<()> {
    let available = unsafe { entry.enumerate_instance_layer_properties()? };

    for &layer in requested {
        let found = available
            .iter()
            .any(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) } == layer);
        if !found {
            return Err(GpuError::ContextCreation(format!(
                "requested layer {} not available on this host",
                layer.to_string_lossy()
            )));
        }
    }

    Ok(())
}
