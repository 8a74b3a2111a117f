// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

use crate::context::LifecycleState;

/// Every way bringing up a [`VkContext`](crate::VkContext) can fail.
///
/// Each variant names the stage that failed; driver failures keep the
/// `vk::Result` as their source.
#[derive(thiserror::Error, Debug)]
pub enum ContextError {
    #[error("vulkan loader unavailable: {0}")]
    LoaderUnavailable(#[from] ash::LoadingError),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("instance creation failed")]
    InstanceCreationFailed(#[source] vk::Result),

    #[error("surface creation failed")]
    SurfaceCreationFailed(#[source] vk::Result),

    #[error("no vulkan adapters found")]
    NoAdaptersFound,

    #[error("no suitable adapter found (need graphics + present queues, required extensions and a usable swapchain)")]
    NoSuitableAdapterFound,

    #[error("logical device creation failed")]
    LogicalDeviceCreationFailed(#[source] vk::Result),

    #[error("swapchain creation failed")]
    SwapchainCreationFailed(#[source] vk::Result),

    #[error("image view creation failed")]
    ImageViewCreationFailed(#[source] vk::Result),

    #[error("driver query `{what}` failed")]
    DriverQuery {
        what: &'static str,
        #[source]
        result: vk::Result,
    },

    #[error("`{step}` cannot run while the context is {state:?}")]
    OutOfOrder {
        step: &'static str,
        state: LifecycleState,
    },
}

impl ContextError {
    pub(crate) fn query(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| ContextError::DriverQuery { what, result }
    }
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;
