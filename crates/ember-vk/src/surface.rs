// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

use crate::driver::Driver;
use crate::error::{ContextError, Result};

/// What a surface supports on one adapter.
#[derive(Clone, Debug, Default)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// In driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

pub fn query_swapchain_support<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SwapchainSupportDetails> {
    let capabilities = driver
        .surface_capabilities(adapter, surface)
        .map_err(ContextError::query("get_physical_device_surface_capabilities"))?;
    let formats = driver
        .surface_formats(adapter, surface)
        .map_err(ContextError::query("get_physical_device_surface_formats"))?;
    let present_modes = driver
        .surface_present_modes(adapter, surface)
        .map_err(ContextError::query("get_physical_device_surface_present_modes"))?;

    Ok(SwapchainSupportDetails {
        capabilities,
        formats,
        present_modes,
    })
}
