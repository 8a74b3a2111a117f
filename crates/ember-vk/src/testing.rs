// SPDX-License-Identifier: CEPL-1.0
//! In-memory driver for exercising selection and lifecycle logic without a GPU.

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::rc::Rc;

use ash::khr::swapchain;
use ash::vk::{self, Handle};

use crate::config::ContextConfig;
use crate::driver::{AdapterInfo, DeviceRequest, Driver};
use crate::error::{ContextError, Result};
use crate::swapchain::{SwapchainPlan, PREFERRED_FORMAT};

pub fn surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(0x5afe)
}

const MIB: u64 = 1024 * 1024;

pub fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

#[derive(Clone, Debug)]
pub struct FakeAdapter {
    pub info: AdapterInfo,
    /// Family properties paired with "can present to the test surface".
    pub families: Vec<(vk::QueueFamilyProperties, bool)>,
    pub extensions: Vec<CString>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl FakeAdapter {
    fn new(name: &str, device_type: vk::PhysicalDeviceType, heap_mib: u64) -> Self {
        Self {
            info: AdapterInfo {
                name: name.to_owned(),
                device_type,
                api_version: vk::API_VERSION_1_3,
                heap_sizes: vec![heap_mib * MIB],
                ..Default::default()
            },
            families: vec![(family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE), true)],
            extensions: vec![swapchain::NAME.to_owned()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![PREFERRED_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    pub fn discrete(name: &str, heap_mib: u64) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU, heap_mib)
    }

    pub fn integrated(name: &str, heap_mib: u64) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU, heap_mib)
    }

    pub fn other(name: &str, heap_mib: u64) -> Self {
        Self::new(name, vk::PhysicalDeviceType::CPU, heap_mib)
    }

    pub fn with_families(mut self, families: Vec<(vk::QueueFamilyProperties, bool)>) -> Self {
        self.families = families;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<CString>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }
}

/// Records every create/destroy call by name, shared so a test can inspect it
/// after the driver has moved into a context.
pub type CallLog = Rc<RefCell<Vec<String>>>;

#[derive(Default)]
pub struct FakeDriver {
    adapters: Vec<FakeAdapter>,
    log: CallLog,
    family_queries: Cell<usize>,
    next_handle: u64,
    fail_instance: bool,
    fail_enumerate: bool,
    fail_device: bool,
    fail_queue: bool,
    fail_surface_queries: bool,
    fail_swapchain: bool,
    fail_images: bool,
    /// Image view creation fails on this call (0-based).
    fail_view_at: Option<usize>,
    /// Images the driver hands back, if different from the requested count.
    extra_images: u32,
    views_created: usize,
    pub device_request: Option<DeviceRequest>,
    pub plan: Option<SwapchainPlan>,
}

impl FakeDriver {
    pub fn new(adapters: Vec<FakeAdapter>) -> Self {
        Self {
            adapters,
            next_handle: 0x100,
            ..Default::default()
        }
    }

    pub fn handle(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    pub fn log(&self) -> CallLog {
        Rc::clone(&self.log)
    }

    pub fn family_queries(&self) -> usize {
        self.family_queries.get()
    }

    pub fn fail_instance(mut self) -> Self {
        self.fail_instance = true;
        self
    }

    pub fn fail_enumerate(mut self) -> Self {
        self.fail_enumerate = true;
        self
    }

    pub fn fail_device(mut self) -> Self {
        self.fail_device = true;
        self
    }

    pub fn fail_queue(mut self) -> Self {
        self.fail_queue = true;
        self
    }

    pub fn fail_swapchain(mut self) -> Self {
        self.fail_swapchain = true;
        self
    }

    pub fn fail_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub fn fail_surface_queries(mut self) -> Self {
        self.fail_surface_queries = true;
        self
    }

    pub fn fail_view_at(mut self, call: usize) -> Self {
        self.fail_view_at = Some(call);
        self
    }

    pub fn extra_images(mut self, extra: u32) -> Self {
        self.extra_images = extra;
        self
    }

    fn adapter(&self, handle: vk::PhysicalDevice) -> Result<&FakeAdapter, vk::Result> {
        (handle.as_raw() as usize)
            .checked_sub(1)
            .and_then(|i| self.adapters.get(i))
            .ok_or(vk::Result::ERROR_DEVICE_LOST)
    }

    fn surface_query(&self) -> Result<(), vk::Result> {
        if self.fail_surface_queries {
            Err(vk::Result::ERROR_SURFACE_LOST_KHR)
        } else {
            Ok(())
        }
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn record(&self, call: impl Into<String>) {
        self.log.borrow_mut().push(call.into());
    }
}

impl Driver for FakeDriver {
    fn create_instance(&mut self, _config: &ContextConfig) -> Result<vk::Instance> {
        if self.fail_instance {
            return Err(ContextError::InstanceCreationFailed(
                vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            ));
        }
        self.record("create_instance");
        Ok(vk::Instance::from_raw(self.next()))
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.record("destroy_instance");
    }

    fn destroy_surface(&mut self, _surface: vk::SurfaceKHR) {
        self.record("destroy_surface");
    }

    fn enumerate_adapters(&self) -> Result<Vec<vk::PhysicalDevice>, vk::Result> {
        if self.fail_enumerate {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        Ok((0..self.adapters.len()).map(|i| self.handle(i)).collect())
    }

    fn adapter_info(&self, adapter: vk::PhysicalDevice) -> Result<AdapterInfo, vk::Result> {
        Ok(self.adapter(adapter)?.info.clone())
    }

    fn queue_families(
        &self,
        adapter: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result> {
        Ok(self.adapter(adapter)?.families.iter().map(|(f, _)| *f).collect())
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        self.surface_query()?;
        self.family_queries.set(self.family_queries.get() + 1);
        let families = &self.adapter(adapter)?.families;
        Ok(families.get(family as usize).is_some_and(|(_, present)| *present))
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> Result<Vec<CString>, vk::Result> {
        Ok(self.adapter(adapter)?.extensions.clone())
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result> {
        self.surface_query()?;
        Ok(self.adapter(adapter)?.capabilities)
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::Result> {
        self.surface_query()?;
        Ok(self.adapter(adapter)?.formats.clone())
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::Result> {
        self.surface_query()?;
        Ok(self.adapter(adapter)?.present_modes.clone())
    }

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> Result<vk::Device, vk::Result> {
        if self.fail_device {
            return Err(vk::Result::ERROR_FEATURE_NOT_PRESENT);
        }
        self.adapter(adapter)?;
        self.device_request = Some(request.clone());
        self.record("create_device");
        Ok(vk::Device::from_raw(self.next()))
    }

    fn device_queue(&self, family: u32, index: u32) -> Result<vk::Queue, vk::Result> {
        if self.fail_queue {
            return Err(vk::Result::ERROR_DEVICE_LOST);
        }
        Ok(vk::Queue::from_raw(0x1000 + u64::from(family) * 16 + u64::from(index)))
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.record("destroy_device");
    }

    fn create_swapchain(
        &mut self,
        _surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
    ) -> Result<vk::SwapchainKHR, vk::Result> {
        if self.fail_swapchain {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        self.plan = Some(*plan);
        self.record("create_swapchain");
        Ok(vk::SwapchainKHR::from_raw(self.next()))
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>, vk::Result> {
        if self.fail_images {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        let requested = self.plan.map_or(0, |p| p.image_count);
        Ok((0..requested + self.extra_images)
            .map(|i| vk::Image::from_raw(0x2000 + u64::from(i)))
            .collect())
    }

    fn destroy_swapchain(&mut self, _swapchain: vk::SwapchainKHR) {
        self.record("destroy_swapchain");
    }

    fn create_image_view(
        &mut self,
        _image: vk::Image,
        _format: vk::Format,
    ) -> Result<vk::ImageView, vk::Result> {
        if self.fail_view_at == Some(self.views_created) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        self.views_created += 1;
        self.record("create_image_view");
        Ok(vk::ImageView::from_raw(self.next()))
    }

    fn destroy_image_view(&mut self, _view: vk::ImageView) {
        self.record("destroy_image_view");
    }
}
