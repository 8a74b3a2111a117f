// SPDX-License-Identifier: CEPL-1.0
//! Adapter enumeration, suitability and ranking.

use std::ffi::CString;
use std::fmt;

use ash::vk;
use tracing::{debug, info};

use crate::driver::{AdapterInfo, Driver};
use crate::error::{ContextError, Result};
use crate::extensions::supports_extensions;
use crate::queue_family::{find_queue_families, QueueFamilies, QueueFamilyIndices};
use crate::surface::query_swapchain_support;

pub const DISCRETE_BONUS: u64 = 300;
pub const INTEGRATED_BONUS: u64 = 200;
pub const OTHER_BONUS: u64 = 100;

const MIB: u64 = 1024 * 1024;

/// Ranking value: device-class bonus plus the largest heap in MiB.
///
/// The two terms are not normalised against each other, so an integrated
/// adapter with a very large heap can outrank a small discrete one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct AdapterScore(pub u64);

impl fmt::Display for AdapterScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub fn score_adapter(info: &AdapterInfo) -> AdapterScore {
    let bonus = match info.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => DISCRETE_BONUS,
        vk::PhysicalDeviceType::INTEGRATED_GPU => INTEGRATED_BONUS,
        _ => OTHER_BONUS,
    };
    AdapterScore(bonus + info.largest_heap() / MIB)
}

/// Why an adapter was or was not accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Suitable(QueueFamilies),
    MissingQueues(QueueFamilyIndices),
    MissingExtensions,
    InadequateSwapchain,
}

impl Verdict {
    pub fn is_suitable(&self) -> bool {
        matches!(self, Verdict::Suitable(_))
    }
}

/// The adapter the context runs on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedAdapter {
    pub handle: vk::PhysicalDevice,
    pub info: AdapterInfo,
    pub score: AdapterScore,
    pub families: QueueFamilies,
}

/// Checks queues, then extensions, then swapchain adequacy. Later checks are
/// skipped once one fails; surface queries are only valid on adapters that
/// offer the swapchain extension.
pub fn evaluate_adapter<D: Driver + ?Sized>(
    driver: &D,
    adapter: vk::PhysicalDevice,
    required: &[CString],
    surface: vk::SurfaceKHR,
) -> Result<Verdict> {
    let indices = find_queue_families(driver, adapter, surface)?;
    let Some(families) = indices.resolved() else {
        return Ok(Verdict::MissingQueues(indices));
    };
    if !supports_extensions(driver, adapter, required)? {
        return Ok(Verdict::MissingExtensions);
    }
    if !query_swapchain_support(driver, adapter, surface)?.is_adequate() {
        return Ok(Verdict::InadequateSwapchain);
    }
    Ok(Verdict::Suitable(families))
}

fn enumerate<D: Driver + ?Sized>(driver: &D) -> Result<Vec<vk::PhysicalDevice>> {
    let adapters = driver
        .enumerate_adapters()
        .map_err(ContextError::query("enumerate_physical_devices"))?;
    if adapters.is_empty() {
        return Err(ContextError::NoAdaptersFound);
    }
    Ok(adapters)
}

fn info_of<D: Driver + ?Sized>(driver: &D, adapter: vk::PhysicalDevice) -> Result<AdapterInfo> {
    driver
        .adapter_info(adapter)
        .map_err(ContextError::query("get_physical_device_properties"))
}

/// Picks the highest-scoring suitable adapter. Ties go to the adapter
/// enumerated first.
pub fn select_best<D: Driver + ?Sized>(
    driver: &D,
    required: &[CString],
    surface: vk::SurfaceKHR,
) -> Result<SelectedAdapter> {
    let mut best: Option<SelectedAdapter> = None;

    for adapter in enumerate(driver)? {
        let info = info_of(driver, adapter)?;
        let families = match evaluate_adapter(driver, adapter, required, surface)? {
            Verdict::Suitable(families) => families,
            rejected => {
                debug!(name = %info.name, verdict = ?rejected, "adapter rejected");
                continue;
            }
        };

        let score = score_adapter(&info);
        debug!(name = %info.name, %score, "adapter suitable");
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(SelectedAdapter {
                handle: adapter,
                info,
                score,
                families,
            });
        }
    }

    let best = best.ok_or(ContextError::NoSuitableAdapterFound)?;
    info!(
        "selected adapter {} ({:?}, score {}, graphics family {}, present family {})",
        best.info.name, best.info.device_type, best.score, best.families.graphics, best.families.present
    );
    Ok(best)
}

/// Every adapter with its properties and score, in enumeration order. Needs
/// no surface, so suitability is not checked.
pub fn describe_adapters<D: Driver + ?Sized>(
    driver: &D,
) -> Result<Vec<(vk::PhysicalDevice, AdapterInfo, AdapterScore)>> {
    enumerate(driver)?
        .into_iter()
        .map(|adapter| {
            let info = info_of(driver, adapter)?;
            let score = score_adapter(&info);
            Ok((adapter, info, score))
        })
        .collect()
}
