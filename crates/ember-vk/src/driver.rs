// SPDX-License-Identifier: CEPL-1.0
//! The seam between the negotiation logic and the Vulkan driver.
//!
//! Everything the context does to the driver goes through [`Driver`]: read-only
//! adapter/surface queries plus creation and destruction of the handles the
//! context owns. Handles cross the seam as raw `vk` handles; the implementation
//! keeps whatever function tables it needs behind them.

use std::ffi::CString;

use ash::vk;

use crate::config::ContextConfig;
use crate::error::Result;
use crate::swapchain::SwapchainPlan;

/// Static properties of one adapter, flattened from the driver's property and
/// memory structs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    /// Size in bytes of every memory heap, in driver order.
    pub heap_sizes: Vec<vk::DeviceSize>,
}

impl AdapterInfo {
    pub fn largest_heap(&self) -> vk::DeviceSize {
        self.heap_sizes.iter().copied().max().unwrap_or(0)
    }

    pub fn api_version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version)
        )
    }
}

/// What the logical device is created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Unique queue family indices in ascending order; one queue is created
    /// per entry.
    pub queue_families: Vec<u32>,
    pub extensions: Vec<CString>,
}

pub trait Driver {
    /// Creates the instance (and anything instance-scoped the driver needs,
    /// such as a debug messenger).
    fn create_instance(&mut self, config: &ContextConfig) -> Result<vk::Instance>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// Surfaces are created by the windowing side; only destruction goes
    /// through the driver because it must happen before the instance dies.
    fn destroy_surface(&mut self, surface: vk::SurfaceKHR);

    fn enumerate_adapters(&self) -> Result<Vec<vk::PhysicalDevice>, vk::Result>;
    fn adapter_info(&self, adapter: vk::PhysicalDevice) -> Result<AdapterInfo, vk::Result>;
    fn queue_families(
        &self,
        adapter: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result>;
    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result>;
    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> Result<Vec<CString>, vk::Result>;
    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result>;
    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::Result>;
    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::Result>;

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> Result<vk::Device, vk::Result>;
    fn device_queue(&self, family: u32, index: u32) -> Result<vk::Queue, vk::Result>;
    fn destroy_device(&mut self, device: vk::Device);

    fn create_swapchain(
        &mut self,
        surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
    ) -> Result<vk::SwapchainKHR, vk::Result>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>, vk::Result>;
    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR);

    fn create_image_view(
        &mut self,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView, vk::Result>;
    fn destroy_image_view(&mut self, view: vk::ImageView);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_heap_picks_max_and_defaults_to_zero() {
        let info = AdapterInfo {
            heap_sizes: vec![256 << 20, 8 << 30, 1 << 30],
            ..Default::default()
        };
        assert_eq!(info.largest_heap(), 8 << 30);
        assert_eq!(AdapterInfo::default().largest_heap(), 0);
    }

    #[test]
    fn api_version_is_dotted() {
        let info = AdapterInfo {
            api_version: vk::make_api_version(0, 1, 3, 250),
            ..Default::default()
        };
        assert_eq!(info.api_version_string(), "1.3.250");
    }
}
