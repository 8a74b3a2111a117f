// SPDX-License-Identifier: CEPL-1.0
//! Owns every long-lived handle and walks them through a fixed bring-up order.
//!
//! ```text
//! Uninitialized -> InstanceReady -> SurfaceAcquired -> DeviceSelected
//!               -> LogicalDeviceReady -> SwapchainReady
//! ```
//!
//! Each step only runs from the state directly before it. A failed step
//! leaves the state (and the set of live handles) as it was. Teardown walks
//! back in reverse and only destroys what is still live, so it is safe after a
//! partial bring-up and safe to repeat.

use ash::vk;
use ember_core::RenderSize;
use tracing::{debug, info, warn};

use crate::config::ContextConfig;
use crate::driver::{DeviceRequest, Driver};
use crate::error::{ContextError, Result};
use crate::selector::{select_best, SelectedAdapter};
use crate::surface::query_swapchain_support;
use crate::swapchain::{negotiate, SwapchainPlan};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    InstanceReady,
    SurfaceAcquired,
    DeviceSelected,
    LogicalDeviceReady,
    SwapchainReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// The swapchain as created, with the image list read back from the driver.
#[derive(Clone, Debug)]
pub struct SwapchainState {
    pub handle: vk::SwapchainKHR,
    pub plan: SwapchainPlan,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
}

impl SwapchainState {
    pub fn format(&self) -> vk::Format {
        self.plan.surface_format.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.plan.extent
    }
}

pub struct VkContext<D: Driver> {
    driver: D,
    config: ContextConfig,
    state: LifecycleState,

    instance: Option<vk::Instance>,
    surface: Option<vk::SurfaceKHR>,
    adapter: Option<SelectedAdapter>,
    device: Option<vk::Device>,
    queues: Option<Queues>,
    swapchain: Option<SwapchainState>,
}

impl<D: Driver> VkContext<D> {
    pub fn new(driver: D, config: ContextConfig) -> Self {
        Self {
            driver,
            config,
            state: LifecycleState::Uninitialized,
            instance: None,
            surface: None,
            adapter: None,
            device: None,
            queues: None,
            swapchain: None,
        }
    }

    /// Runs every step in order. The surface is produced by `make_surface`
    /// once the instance exists. On failure the context is dropped, which tears
    /// down whatever was already built.
    pub fn initialize<F>(
        driver: D,
        config: ContextConfig,
        make_surface: F,
        window: RenderSize,
    ) -> Result<Self>
    where
        F: FnOnce(&D) -> Result<vk::SurfaceKHR>,
    {
        let mut ctx = Self::new(driver, config);
        ctx.create_instance()?;
        let surface = make_surface(&ctx.driver)?;
        ctx.set_surface(surface)?;
        ctx.select_adapter()?;
        ctx.create_logical_device()?;
        ctx.create_swapchain(window)?;
        Ok(ctx)
    }

    fn require_state(&self, step: &'static str, state: LifecycleState) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(ContextError::OutOfOrder {
                step,
                state: self.state,
            })
        }
    }

    pub fn create_instance(&mut self) -> Result<vk::Instance> {
        self.require_state("create_instance", LifecycleState::Uninitialized)?;
        let instance = self.driver.create_instance(&self.config)?;
        self.instance = Some(instance);
        self.state = LifecycleState::InstanceReady;
        debug!("instance ready");
        Ok(instance)
    }

    /// Hands over a surface created against [`instance`](Self::instance). From
    /// here on the context destroys it; the backing window must outlive the
    /// context.
    pub fn set_surface(&mut self, surface: vk::SurfaceKHR) -> Result<()> {
        self.require_state("set_surface", LifecycleState::InstanceReady)?;
        self.surface = Some(surface);
        self.state = LifecycleState::SurfaceAcquired;
        debug!("surface acquired");
        Ok(())
    }

    pub fn select_adapter(&mut self) -> Result<&SelectedAdapter> {
        self.require_state("select_adapter", LifecycleState::SurfaceAcquired)?;
        let surface = self.live_surface("select_adapter")?;
        let selected = select_best(&self.driver, &self.config.required_extensions, surface)?;
        self.state = LifecycleState::DeviceSelected;
        let selected: &SelectedAdapter = self.adapter.insert(selected);
        Ok(selected)
    }

    pub fn create_logical_device(&mut self) -> Result<()> {
        self.require_state("create_logical_device", LifecycleState::DeviceSelected)?;
        let (adapter, families) = {
            let selected = self.selected("create_logical_device")?;
            (selected.handle, selected.families)
        };
        let request = DeviceRequest {
            queue_families: families.unique().into_iter().collect(),
            extensions: self.config.required_extensions.clone(),
        };

        let device = self
            .driver
            .create_device(adapter, &request)
            .map_err(ContextError::LogicalDeviceCreationFailed)?;
        self.device = Some(device);

        let queues = match (
            self.driver.device_queue(families.graphics, 0),
            self.driver.device_queue(families.present, 0),
        ) {
            (Ok(graphics), Ok(present)) => Queues { graphics, present },
            (Err(result), _) | (_, Err(result)) => {
                self.destroy_device();
                return Err(ContextError::query("get_device_queue")(result));
            }
        };

        self.queues = Some(queues);
        self.state = LifecycleState::LogicalDeviceReady;
        info!(families = ?request.queue_families, "logical device ready");
        Ok(())
    }

    pub fn create_swapchain(&mut self, window: RenderSize) -> Result<()> {
        self.require_state("create_swapchain", LifecycleState::LogicalDeviceReady)?;
        let surface = self.live_surface("create_swapchain")?;
        let (adapter, families) = {
            let selected = self.selected("create_swapchain")?;
            (selected.handle, selected.families)
        };
        if window.is_empty() {
            warn!(?window, "window has no area, extent falls back to the surface minimum");
        }
        let support = query_swapchain_support(&self.driver, adapter, surface)?;
        let plan = negotiate(&support, families, window)?;

        let handle = self
            .driver
            .create_swapchain(surface, &plan)
            .map_err(ContextError::SwapchainCreationFailed)?;

        // The driver may create more images than requested.
        let images = match self.driver.swapchain_images(handle) {
            Ok(images) => images,
            Err(result) => {
                self.driver.destroy_swapchain(handle);
                return Err(ContextError::query("get_swapchain_images")(result));
            }
        };

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            match self.driver.create_image_view(image, plan.surface_format.format) {
                Ok(view) => views.push(view),
                Err(result) => {
                    for view in views.drain(..) {
                        self.driver.destroy_image_view(view);
                    }
                    self.driver.destroy_swapchain(handle);
                    return Err(ContextError::ImageViewCreationFailed(result));
                }
            }
        }

        info!(
            "swapchain ready ({}x{}, {:?}/{:?}, {:?}, {} images, {:?} sharing)",
            plan.extent.width,
            plan.extent.height,
            plan.surface_format.format,
            plan.surface_format.color_space,
            plan.present_mode,
            images.len(),
            plan.sharing.mode()
        );
        self.swapchain = Some(SwapchainState {
            handle,
            plan,
            images,
            views,
        });
        self.state = LifecycleState::SwapchainReady;
        Ok(())
    }

    fn live_surface(&self, step: &'static str) -> Result<vk::SurfaceKHR> {
        self.surface.ok_or(ContextError::OutOfOrder {
            step,
            state: self.state,
        })
    }

    fn selected(&self, step: &'static str) -> Result<&SelectedAdapter> {
        self.adapter.as_ref().ok_or(ContextError::OutOfOrder {
            step,
            state: self.state,
        })
    }

    fn destroy_swapchain(&mut self) {
        if let Some(swapchain) = self.swapchain.take() {
            for view in swapchain.views {
                self.driver.destroy_image_view(view);
            }
            self.driver.destroy_swapchain(swapchain.handle);
            debug!("swapchain destroyed");
        }
    }

    fn destroy_device(&mut self) {
        self.queues = None;
        if let Some(device) = self.device.take() {
            self.driver.destroy_device(device);
            debug!("logical device destroyed");
        }
    }

    fn destroy_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
            debug!("surface destroyed");
        }
    }

    fn destroy_instance(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.driver.destroy_instance(instance);
            debug!("instance destroyed");
        }
    }

    /// Destroys live handles in reverse creation order: swapchain, device,
    /// surface, instance. Returns the context to `Uninitialized`.
    pub fn teardown(&mut self) {
        self.destroy_swapchain();
        self.destroy_device();
        self.adapter = None;
        self.destroy_surface();
        self.destroy_instance();
        self.state = LifecycleState::Uninitialized;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// For the windowing side to create a surface against.
    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn adapter(&self) -> Option<&SelectedAdapter> {
        self.adapter.as_ref()
    }

    pub fn device(&self) -> Option<vk::Device> {
        self.device
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.queues.map(|q| q.graphics)
    }

    pub fn present_queue(&self) -> Option<vk::Queue> {
        self.queues.map(|q| q.present)
    }

    pub fn swapchain(&self) -> Option<&SwapchainState> {
        self.swapchain.as_ref()
    }

    pub fn swapchain_format(&self) -> Option<vk::Format> {
        self.swapchain.as_ref().map(SwapchainState::format)
    }

    pub fn swapchain_extent(&self) -> Option<vk::Extent2D> {
        self.swapchain.as_ref().map(SwapchainState::extent)
    }

    pub fn swapchain_images(&self) -> &[vk::Image] {
        self.swapchain.as_ref().map_or(&[], |s| &s.images)
    }
}

impl<D: Driver> Drop for VkContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
