//! Adapter enumeration and queue family selection.

use std::ffi::CStr;

use ash::vk;

use crate::error::{GpuError, Result};
use crate::instance::Context;

/// Selection-relevant properties of an enumerated adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Device name as reported by the driver.
    pub name: String,
    /// Device type (discrete, integrated, ...).
    pub device_type: vk::PhysicalDeviceType,
    /// Device-local memory in MB.
    pub device_local_memory_mb: u64,
}

impl AdapterInfo {
    /// Query selection-relevant properties from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, adapter: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(adapter);
        let memory = instance.get_physical_device_memory_properties(adapter);

        let name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory
            .memory_heaps
            .iter()
            .take(memory.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        Self {
            name,
            device_type: properties.device_type,
            device_local_memory_mb,
        }
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - {} MB VRAM",
            self.name, self.device_type, self.device_local_memory_mb
        )
    }
}

/// One queue family of an adapter.
///
/// Present capability is only knowable against a live surface and is
/// checked separately once one exists (see [`crate::surface::Surface::supports`]).
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilyDescriptor {
    /// Family index as enumerated by the driver.
    pub index: u32,
    /// Number of queues the family exposes.
    pub queue_count: u32,
    /// Whether the family accepts graphics work.
    pub supports_graphics: bool,
}

/// How drawing and presentation map onto the selected queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsQueueMode {
    /// A single queue, reused for presentation.
    Exclusive,
    /// Two queues in the same family, one drawing and one presenting.
    Shared,
    /// The family exposes no queues. Unreachable with a conforming
    /// driver; fatal when observed.
    Unsupported,
}

/// Enumerate all adapters visible to the instance.
pub fn enumerate_adapters(context: &Context) -> Result<Vec<vk::PhysicalDevice>> {
    let adapters = unsafe { context.instance().enumerate_physical_devices()? };

    if adapters.is_empty() {
        return Err(GpuError::NoAdapter);
    }

    Ok(adapters)
}

/// Pick the best adapter: discrete preferred over integrated, integrated
/// over anything else, ties broken by the lowest enumeration index.
///
/// Deterministic for a given input ordering.
pub fn score_and_select(adapters: &[AdapterInfo]) -> usize {
    let mut best_index = 0;
    let mut best_score = 0u32;

    for (index, info) in adapters.iter().enumerate() {
        let score = score_adapter(info);
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }

    best_index
}

fn score_adapter(info: &AdapterInfo) -> u32 {
    match info.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 2,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        _ => 0,
    }
}

/// Enumerate the queue families of an adapter.
pub fn enumerate_queue_families(
    context: &Context,
    adapter: vk::PhysicalDevice,
) -> Vec<QueueFamilyDescriptor> {
    let properties = unsafe {
        context
            .instance()
            .get_physical_device_queue_family_properties(adapter)
    };

    properties
        .iter()
        .enumerate()
        .map(|(index, family)| QueueFamilyDescriptor {
            index: index as u32,
            queue_count: family.queue_count,
            supports_graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
        })
        .collect()
}

/// Select the graphics family: among graphics-capable families the
/// highest queue count wins, ties broken by the lowest index.
pub fn select_graphics_family(families: &[QueueFamilyDescriptor]) -> Result<usize> {
    let mut best: Option<usize> = None;

    for (index, family) in families.iter().enumerate() {
        if !family.supports_graphics {
            continue;
        }

        match best {
            Some(current) if families[current].queue_count >= family.queue_count => {}
            _ => best = Some(index),
        }
    }

    best.ok_or(GpuError::NoAdapter)
}

/// Classify how the selected family's queue count maps onto drawing and
/// presentation.
pub fn graphics_queue_mode(family: &QueueFamilyDescriptor) -> GraphicsQueueMode {
    match family.queue_count {
        0 => GraphicsQueueMode::Unsupported,
        1 => GraphicsQueueMode::Exclusive,
        _ => GraphicsQueueMode::Shared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(device_type: vk::PhysicalDeviceType) -> AdapterInfo {
        AdapterInfo {
            name: "test".to_string(),
            device_type,
            device_local_memory_mb: 1024,
        }
    }

    fn family(index: u32, queue_count: u32, graphics: bool) -> QueueFamilyDescriptor {
        QueueFamilyDescriptor {
            index,
            queue_count,
            supports_graphics: graphics,
        }
    }

    #[test]
    fn discrete_preferred_over_integrated() {
        let adapters = [
            info(vk::PhysicalDeviceType::INTEGRATED_GPU),
            info(vk::PhysicalDeviceType::DISCRETE_GPU),
        ];
        assert_eq!(score_and_select(&adapters), 1);
    }

    #[test]
    fn first_adapter_wins_ties() {
        let adapters = [
            info(vk::PhysicalDeviceType::DISCRETE_GPU),
            info(vk::PhysicalDeviceType::DISCRETE_GPU),
        ];
        assert_eq!(score_and_select(&adapters), 0);

        let adapters = [
            info(vk::PhysicalDeviceType::CPU),
            info(vk::PhysicalDeviceType::VIRTUAL_GPU),
        ];
        assert_eq!(score_and_select(&adapters), 0);
    }

    #[test]
    fn selection_is_idempotent() {
        let adapters = [
            info(vk::PhysicalDeviceType::CPU),
            info(vk::PhysicalDeviceType::INTEGRATED_GPU),
            info(vk::PhysicalDeviceType::DISCRETE_GPU),
            info(vk::PhysicalDeviceType::DISCRETE_GPU),
        ];
        let first = score_and_select(&adapters);
        assert_eq!(first, score_and_select(&adapters));
        assert_eq!(first, 2);
    }

    #[test]
    fn graphics_family_with_most_queues_wins() {
        let families = [
            family(0, 1, true),
            family(1, 4, true),
            family(2, 8, false),
        ];
        let selected = select_graphics_family(&families).unwrap();
        assert_eq!(selected, 1);
        assert!(families[selected].supports_graphics);
    }

    #[test]
    fn graphics_family_ties_break_to_lowest_index() {
        let families = [family(0, 2, true), family(1, 2, true)];
        assert_eq!(select_graphics_family(&families).unwrap(), 0);
    }

    #[test]
    fn no_graphics_family_is_an_error() {
        let families = [family(0, 4, false), family(1, 2, false)];
        assert!(select_graphics_family(&families).is_err());
    }

    #[test]
    fn queue_mode_classification() {
        assert_eq!(
            graphics_queue_mode(&family(0, 1, true)),
            GraphicsQueueMode::Exclusive
        );
        assert_eq!(
            graphics_queue_mode(&family(0, 2, true)),
            GraphicsQueueMode::Shared
        );
        assert_eq!(
            graphics_queue_mode(&family(0, 0, true)),
            GraphicsQueueMode::Unsupported
        );
    }

    #[test]
    fn single_family_with_spare_queues_presents_from_second_queue() {
        // One family, three queues, graphics-capable: drawing and
        // presentation split across two queues of the same family.
        let families = [family(0, 3, true)];
        let selected = select_graphics_family(&families).unwrap();
        assert_eq!(selected, 0);
        assert_eq!(
            graphics_queue_mode(&families[selected]),
            GraphicsQueueMode::Shared
        );
    }
}
