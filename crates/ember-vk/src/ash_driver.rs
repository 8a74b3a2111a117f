// SPDX-License-Identifier: CEPL-1.0
//! [`Driver`] backed by the system Vulkan loader through `ash`.

use std::ffi::{c_char, CStr, CString};

use ash::khr::{surface, swapchain};
use ash::{vk, Entry, Instance};
use ember_core::RenderSize;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use tracing::{debug, info, warn};

use crate::config::ContextConfig;
use crate::context::VkContext;
use crate::debug::DebugMessenger;
use crate::driver::{AdapterInfo, DeviceRequest, Driver};
use crate::error::{ContextError, Result};
use crate::swapchain::SwapchainPlan;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Returned by calls that need a function table that does not exist yet.
const NOT_READY: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

pub struct AshDriver {
    entry: Entry,
    display: Option<RawDisplayHandle>,

    instance: Option<Instance>,
    surface_loader: Option<surface::Instance>,
    debug: Option<DebugMessenger>,

    device: Option<ash::Device>,
    swapchain_loader: Option<swapchain::Device>,
}

impl AshDriver {
    /// Loads the Vulkan loader. With a display handle the instance enables the
    /// platform surface extensions for it; without one it is headless and can
    /// only enumerate adapters.
    pub fn load(display: Option<RawDisplayHandle>) -> Result<Self> {
        let entry = unsafe { Entry::load()? };
        Ok(Self {
            entry,
            display,
            instance: None,
            surface_loader: None,
            debug: None,
            device: None,
            swapchain_loader: None,
        })
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn surface_loader(&self) -> Option<&surface::Instance> {
        self.surface_loader.as_ref()
    }

    pub fn device(&self) -> Option<&ash::Device> {
        self.device.as_ref()
    }

    pub fn swapchain_loader(&self) -> Option<&swapchain::Device> {
        self.swapchain_loader.as_ref()
    }

    /// Creates a surface for a window against the live instance.
    pub fn create_surface(
        &self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR> {
        let instance = self
            .instance
            .as_ref()
            .ok_or(ContextError::SurfaceCreationFailed(NOT_READY))?;
        unsafe { ash_window::create_surface(&self.entry, instance, display, window, None) }
            .map_err(ContextError::SurfaceCreationFailed)
    }

    fn instance_fns(&self) -> Result<&Instance, vk::Result> {
        self.instance.as_ref().ok_or(NOT_READY)
    }

    fn surface_fns(&self) -> Result<&surface::Instance, vk::Result> {
        self.surface_loader.as_ref().ok_or(NOT_READY)
    }

    fn device_fns(&self) -> Result<&ash::Device, vk::Result> {
        self.device.as_ref().ok_or(NOT_READY)
    }

    fn swapchain_fns(&self) -> Result<&swapchain::Device, vk::Result> {
        self.swapchain_loader.as_ref().ok_or(NOT_READY)
    }
}

fn c_name(raw: &[c_char]) -> &CStr {
    // SAFETY: the driver fills these fixed arrays with NUL-terminated strings
    unsafe { CStr::from_ptr(raw.as_ptr()) }
}

impl Driver for AshDriver {
    fn create_instance(&mut self, config: &ContextConfig) -> Result<vk::Instance> {
        let available_exts = unsafe { self.entry.enumerate_instance_extension_properties(None) }
            .map_err(ContextError::InstanceCreationFailed)?;
        let available_layers = unsafe { self.entry.enumerate_instance_layer_properties() }
            .map_err(ContextError::InstanceCreationFailed)?;
        for e in &available_exts {
            debug!("instance extension: {:?}", c_name(&e.extension_name));
        }
        for l in &available_layers {
            debug!("instance layer: {:?}", c_name(&l.layer_name));
        }

        let has_ext = |name: &CStr| available_exts.iter().any(|e| c_name(&e.extension_name) == name);
        let has_layer = available_layers
            .iter()
            .any(|l| c_name(&l.layer_name) == VALIDATION_LAYER);

        let mut ext_ptrs: Vec<*const c_char> = match self.display {
            Some(dh) => ash_window::enumerate_required_extensions(dh)
                .map_err(ContextError::InstanceCreationFailed)?
                .to_vec(),
            None => Vec::new(),
        };

        let validation = config.validation && has_layer;
        if config.validation && !has_layer {
            warn!("validation requested but {VALIDATION_LAYER:?} is not installed");
        }
        let debug_utils = validation && has_ext(ash::ext::debug_utils::NAME);
        if debug_utils {
            ext_ptrs.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        let layer_ptrs: Vec<*const c_char> = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let app = CString::new(config.app_name.as_str()).unwrap_or_else(|_| c"ember".to_owned());
        let app_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_application_name: app.as_ptr(),
            application_version: 0,
            p_engine_name: c"ember".as_ptr(),
            engine_version: 0,
            api_version: vk::API_VERSION_1_0,
            ..Default::default()
        };
        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_application_info: &app_info,
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            enabled_layer_count: layer_ptrs.len() as u32,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            ..Default::default()
        };

        let instance = unsafe { self.entry.create_instance(&create_info, None) }
            .map_err(ContextError::InstanceCreationFailed)?;
        info!(validation, "vulkan instance created");

        if debug_utils {
            match DebugMessenger::new(&self.entry, &instance) {
                Ok(messenger) => self.debug = Some(messenger),
                Err(e) => warn!("debug messenger unavailable: {e}"),
            }
        }

        self.surface_loader = Some(surface::Instance::new(&self.entry, &instance));
        let handle = instance.handle();
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        if let Some(messenger) = self.debug.take() {
            messenger.destroy();
        }
        self.surface_loader = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }

    fn destroy_surface(&mut self, surface: vk::SurfaceKHR) {
        if let Some(loader) = &self.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn enumerate_adapters(&self) -> Result<Vec<vk::PhysicalDevice>, vk::Result> {
        unsafe { self.instance_fns()?.enumerate_physical_devices() }
    }

    fn adapter_info(&self, adapter: vk::PhysicalDevice) -> Result<AdapterInfo, vk::Result> {
        let instance = self.instance_fns()?;
        let props = unsafe { instance.get_physical_device_properties(adapter) };
        let mem = unsafe { instance.get_physical_device_memory_properties(adapter) };
        let heap_count = (mem.memory_heap_count as usize).min(mem.memory_heaps.len());

        let info = AdapterInfo {
            name: c_name(&props.device_name).to_string_lossy().into_owned(),
            device_type: props.device_type,
            api_version: props.api_version,
            driver_version: props.driver_version,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            heap_sizes: mem.memory_heaps[..heap_count].iter().map(|h| h.size).collect(),
        };
        debug!(
            "adapter {} ({:?}) api {} vendor 0x{:04x} device 0x{:04x} heaps {:?}",
            info.name,
            info.device_type,
            info.api_version_string(),
            info.vendor_id,
            info.device_id,
            info.heap_sizes
        );
        Ok(info)
    }

    fn queue_families(
        &self,
        adapter: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result> {
        Ok(unsafe { self.instance_fns()?.get_physical_device_queue_family_properties(adapter) })
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        unsafe { self.surface_fns()?.get_physical_device_surface_support(adapter, family, surface) }
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> Result<Vec<CString>, vk::Result> {
        let props = unsafe { self.instance_fns()?.enumerate_device_extension_properties(adapter)? };
        Ok(props
            .iter()
            .map(|e| c_name(&e.extension_name).to_owned())
            .collect())
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::Result> {
        unsafe { self.surface_fns()?.get_physical_device_surface_capabilities(adapter, surface) }
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::Result> {
        unsafe { self.surface_fns()?.get_physical_device_surface_formats(adapter, surface) }
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::Result> {
        unsafe { self.surface_fns()?.get_physical_device_surface_present_modes(adapter, surface) }
    }

    fn create_device(
        &mut self,
        adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> Result<vk::Device, vk::Result> {
        let instance = self.instance_fns()?;

        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = request
            .queue_families
            .iter()
            .map(|&family| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                queue_family_index: family,
                queue_count: 1,
                p_queue_priorities: priorities.as_ptr(),
                ..Default::default()
            })
            .collect();
        let ext_ptrs: Vec<*const c_char> = request.extensions.iter().map(|e| e.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let dinfo = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            queue_create_info_count: queue_infos.len() as u32,
            p_queue_create_infos: queue_infos.as_ptr(),
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            p_enabled_features: &features,
            ..Default::default()
        };

        let device = unsafe { instance.create_device(adapter, &dinfo, None)? };
        let swapchain_loader = swapchain::Device::new(instance, &device);
        let handle = device.handle();
        self.swapchain_loader = Some(swapchain_loader);
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, family: u32, index: u32) -> Result<vk::Queue, vk::Result> {
        Ok(unsafe { self.device_fns()?.get_device_queue(family, index) })
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            unsafe {
                device.device_wait_idle().ok();
                device.destroy_device(None);
            }
        }
    }

    fn create_swapchain(
        &mut self,
        surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
    ) -> Result<vk::SwapchainKHR, vk::Result> {
        let families = plan.sharing.family_indices();
        let info = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface,
            min_image_count: plan.image_count,
            image_format: plan.surface_format.format,
            image_color_space: plan.surface_format.color_space,
            image_extent: plan.extent,
            image_array_layers: 1,
            image_usage: plan.image_usage,
            image_sharing_mode: plan.sharing.mode(),
            queue_family_index_count: families.len() as u32,
            p_queue_family_indices: families.as_ptr(),
            pre_transform: plan.pre_transform,
            composite_alpha: plan.composite_alpha,
            present_mode: plan.present_mode,
            clipped: if plan.clipped { vk::TRUE } else { vk::FALSE },
            ..Default::default()
        };
        unsafe { self.swapchain_fns()?.create_swapchain(&info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>, vk::Result> {
        unsafe { self.swapchain_fns()?.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&mut self, swapchain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn create_image_view(
        &mut self,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView, vk::Result> {
        let sub = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let iv_info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            format,
            components: vk::ComponentMapping::default(),
            subresource_range: sub,
            ..Default::default()
        };
        unsafe { self.device_fns()?.create_image_view(&iv_info, None) }
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        if let Some(device) = &self.device {
            unsafe { device.destroy_image_view(view, None) };
        }
    }
}

impl VkContext<AshDriver> {
    /// Full bring-up for a window: loads Vulkan, creates the instance and a
    /// surface for the window, then selects an adapter and builds the device
    /// and swapchain.
    pub fn for_window(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        config: ContextConfig,
    ) -> Result<Self> {
        let dh = display.display_handle()?.as_raw();
        let wh = window.window_handle()?.as_raw();
        let driver = AshDriver::load(Some(dh))?;
        VkContext::initialize(driver, config, |d| d.create_surface(dh, wh), size)
    }
}
