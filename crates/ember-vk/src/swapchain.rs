// SPDX-License-Identifier: CEPL-1.0
//! Turns probed surface support into concrete swapchain parameters.

use ash::vk;
use ember_core::RenderSize;

use crate::error::{ContextError, Result};
use crate::queue_family::QueueFamilies;
use crate::surface::SwapchainSupportDetails;

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// `current_extent` value meaning "the surface takes the swapchain's size".
pub const ADAPT_TO_WINDOW: u32 = u32::MAX;

/// How swapchain images are shared between the graphics and present queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sharing {
    Exclusive,
    Concurrent([u32; 2]),
}

impl Sharing {
    pub fn for_families(families: QueueFamilies) -> Self {
        if families.is_shared() {
            Sharing::Exclusive
        } else {
            Sharing::Concurrent([families.graphics, families.present])
        }
    }

    pub fn mode(&self) -> vk::SharingMode {
        match self {
            Sharing::Exclusive => vk::SharingMode::EXCLUSIVE,
            Sharing::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    pub fn family_indices(&self) -> &[u32] {
        match self {
            Sharing::Exclusive => &[],
            Sharing::Concurrent(indices) => indices,
        }
    }
}

/// Everything needed to create the swapchain for one surface.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    /// Minimum image count requested; the driver may create more.
    pub image_count: u32,
    pub sharing: Sharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub image_usage: vk::ImageUsageFlags,
    pub clipped: bool,
}

/// Preferred BGRA8/sRGB-nonlinear pair if offered, else the driver's first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        })
        .or_else(|| formats.first().copied())
}

pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != ADAPT_TO_WINDOW {
        return caps.current_extent;
    }
    // max/min rather than clamp: a driver reporting min > max must not panic
    vk::Extent2D {
        width: window
            .width
            .max(caps.min_image_extent.width)
            .min(caps.max_image_extent.width),
        height: window
            .height
            .max(caps.min_image_extent.height)
            .min(caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by a non-zero maximum.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count.saturating_add(1);
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

pub fn negotiate(
    support: &SwapchainSupportDetails,
    families: QueueFamilies,
    window: RenderSize,
) -> Result<SwapchainPlan> {
    let surface_format = choose_surface_format(&support.formats)
        .ok_or(ContextError::SwapchainCreationFailed(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;
    let caps = &support.capabilities;

    Ok(SwapchainPlan {
        surface_format,
        present_mode: choose_present_mode(&support.present_modes),
        extent: choose_extent(caps, window),
        image_count: choose_image_count(caps),
        sharing: Sharing::for_families(families),
        pre_transform: caps.current_transform,
        composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
        clipped: true,
    })
}
