// SPDX-License-Identifier: CEPL-1.0
use std::collections::BTreeSet;

use ash::vk;

use crate::driver::Driver;
use crate::error::{ContextError, Result};

/// Queue family candidates for one (adapter, surface) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    pub fn resolved(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// A complete assignment of queue families. May name the same family twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct families in ascending order; equal indices collapse to one
    /// entry.
    pub fn unique(&self) -> BTreeSet<u32> {
        BTreeSet::from([self.graphics, self.present])
    }

    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// Walks families in driver order and keeps the first graphics-capable one and
/// the first one that can present to `surface`. Stops as soon as both are set.
pub fn find_queue_families<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilyIndices> {
    let families = driver
        .queue_families(adapter)
        .map_err(ContextError::query("get_physical_device_queue_family_properties"))?;

    let mut indices = QueueFamilyIndices::default();
    for (i, family) in families.iter().enumerate() {
        let index = i as u32;
        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }
        if indices.present.is_none()
            && driver
                .surface_support(adapter, index, surface)
                .map_err(ContextError::query("get_physical_device_surface_support"))?
        {
            indices.present = Some(index);
        }
        if indices.is_complete() {
            break;
        }
    }
    Ok(indices)
}
