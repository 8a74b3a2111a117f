// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Vulkan context bring-up: adapter selection, queue families, surface
//! negotiation and the owned device/swapchain lifecycle.

mod ash_driver;
mod config;
mod context;
mod debug;
mod driver;
mod error;
mod extensions;
mod queue_family;
mod selector;
mod surface;
mod swapchain;

#[cfg(test)]
mod testing;

pub use ash;
pub use ash_driver::AshDriver;
pub use config::ContextConfig;
pub use context::{LifecycleState, Queues, SwapchainState, VkContext};
pub use driver::{AdapterInfo, DeviceRequest, Driver};
pub use ember_core::RenderSize;
pub use error::{ContextError, Result};
pub use extensions::{missing_extensions, supports_extensions};
pub use queue_family::{find_queue_families, QueueFamilies, QueueFamilyIndices};
pub use selector::{
    describe_adapters, evaluate_adapter, score_adapter, select_best, AdapterScore, SelectedAdapter,
    Verdict,
};
pub use surface::{query_swapchain_support, SwapchainSupportDetails};
pub use swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, negotiate,
    Sharing, SwapchainPlan, ADAPT_TO_WINDOW, PREFERRED_FORMAT,
};
