//! A Vulkan device claimed for a single SDL window.
//!
//! Claiming creates the instance, the window surface, the logical device and
//! a swapchain sized to the window. Rendering on top of it is left to the
//! application.

pub mod selection;
pub mod swapchain;

use selection::QueueIndices;
use swapchain::{ Swapchain, SurfaceTarget };

use ash::{
    Device,
    Entry,
    Instance,
    extensions::{ ext, khr },
    vk::{
        self,
        Handle,
        PresentModeKHR,
    },
};

use std::{
    ffi::{ CStr, CString, c_void },
    os::raw::c_char,
    str::Utf8Error,
};

use crate::{
    config::{ GpuConfig, ShaderFormat },
    error::GpuError,
    window::Window,
};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";
const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";

pub struct DeviceQueues
{
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

pub struct GpuDevice
{
    // kept alive for the loaded function pointers
    _entry: Entry,
    pub instance: Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_indices: QueueIndices,
    pub device_queues: DeviceQueues,

    pub surface_loader: khr::Surface,
    pub surface: vk::SurfaceKHR,
    pub swapchain: Swapchain,

    device_name: String,

    debug: Option<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl GpuDevice
{
    /// Creates a device able to present to `window` and claims the window for it.
    pub fn claim(window: &Window, config: &GpuConfig) -> Result<Self, GpuError>
    {
        check_shader_formats(&config.shader_formats)?;

        let entry = unsafe{ Entry::new() }
            .map_err(|err| GpuError::Loading(format!("{:?}", err)))?;

        let required_exts = window.required_instance_extensions()
            .map_err(GpuError::Surface)?;

        let (instance, debug_enabled) = create_instance(&entry, &required_exts, config.validation)?;

        // from here on every handle must be released on the error path
        let mut partial = PartialDevice {
            instance: &instance,
            surface_loader: khr::Surface::new(&entry, &instance),
            surface: vk::SurfaceKHR::null(),
            debug: None,
        };

        if debug_enabled {
            partial.debug = Some(create_debug_messenger(&entry, &instance)?);
        }

        partial.surface = vk::SurfaceKHR::from_raw(
            window.window.vulkan_create_surface(instance.handle().as_raw() as usize)
                .map_err(GpuError::Surface)?
        );

        let (physical_device, queue_indices) = unsafe{
            choose_physical_device(&instance, &partial.surface_loader, partial.surface)
        }?;

        let device_name = unsafe{
            let props = instance.get_physical_device_properties(physical_device);
            string_from_slice(&props.device_name).unwrap_or("<unnamed>").to_owned()
        };
        log::info!("Device: {}", device_name);

        let device = unsafe{ create_logical_device(&instance, physical_device, queue_indices) }?;

        let device_queues = unsafe{
            DeviceQueues {
                graphics: device.get_device_queue(queue_indices.graphics, 0),
                present: device.get_device_queue(queue_indices.present, 0),
            }
        };

        let target = SurfaceTarget {
            surface_loader: &partial.surface_loader,
            surface: partial.surface,
            physical_device,
            queues: queue_indices,
        };

        let swapchain = match unsafe{ Swapchain::new(&instance, &device, &target, window.drawable_size()) } {
            Ok(swapchain) => swapchain,
            Err(err) => {
                unsafe{ device.destroy_device(None) };
                return Err(err);
            }
        };

        let (surface_loader, surface, debug) = partial.release();

        Ok(Self {
            _entry: entry,
            instance,
            physical_device,
            device,
            queue_indices,
            device_queues,
            surface_loader,
            surface,
            swapchain,
            device_name,
            debug,
        })
    }

    pub fn device_name(&self) -> &str { &self.device_name }

    pub fn present_mode(&self) -> PresentModeKHR { self.swapchain.present_mode }

    pub fn swap_extent(&self) -> vk::Extent2D { self.swapchain.extent }

    pub fn wait_idle(&self) -> Result<(), GpuError>
    {
        unsafe{ self.device.device_wait_idle() }?;
        Ok(())
    }

    /// Rebuilds the swapchain after the window changed size.
    ///
    /// Returns `false` without touching anything while the drawable area is
    /// empty (minimized window).
    pub fn resize(&mut self, window: &Window) -> Result<bool, GpuError>
    {
        let (width, height) = window.drawable_size();
        if width == 0 || height == 0 {
            log::debug!("Drawable area is empty, deferring swapchain rebuild");
            return Ok(false);
        }

        self.wait_idle()?;

        let target = SurfaceTarget {
            surface_loader: &self.surface_loader,
            surface: self.surface,
            physical_device: self.physical_device,
            queues: self.queue_indices,
        };

        unsafe{ self.swapchain.recreate(&self.device, &target, (width, height)) }?;
        Ok(true)
    }
}

impl Drop for GpuDevice
{
    fn drop(&mut self)
    {
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                log::warn!("Device failed to go idle before release: {}", err);
            }

            self.swapchain.destroy(&self.device);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }

        log::info!("GPU device released");
    }
}

/// Instance-level handles created during a claim that has not finished yet.
/// Dropping it undoes whatever was created, instance included.
struct PartialDevice<'a>
{
    instance: &'a Instance,
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
    debug: Option<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl PartialDevice<'_>
{
    fn release(self) -> (khr::Surface, vk::SurfaceKHR, Option<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)>)
    {
        let mut this = std::mem::ManuallyDrop::new(self);
        let surface_loader = this.surface_loader.clone();
        (surface_loader, this.surface, this.debug.take())
    }
}

impl Drop for PartialDevice<'_>
{
    fn drop(&mut self)
    {
        unsafe {
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// The Vulkan backend consumes SPIR-V only.
pub fn check_shader_formats(requested: &[ShaderFormat]) -> Result<(), GpuError>
{
    if requested.contains(&ShaderFormat::Spirv) {
        Ok(())
    } else {
        Err(GpuError::UnsupportedShaderFormats(requested.to_vec()))
    }
}

/// Returns the instance and whether the debug messenger extension was enabled.
fn create_instance(entry: &Entry, window_exts: &[&str], validation: bool) -> Result<(Instance, bool), GpuError>
{
    let mut wanted_exts: Vec<&str> = window_exts.to_vec();
    let mut wanted_layers: Vec<&str> = Vec::new();

    if validation {
        wanted_exts.push(DEBUG_UTILS_EXTENSION);
        wanted_layers.push(VALIDATION_LAYER);
    }

    let available_exts: Vec<String> = entry.enumerate_instance_extension_properties()?
        .iter()
        .filter_map(|e| string_from_slice(&e.extension_name).ok().map(str::to_owned))
        .collect();
    let available_layers: Vec<String> = entry.enumerate_instance_layer_properties()?
        .iter()
        .filter_map(|l| string_from_slice(&l.layer_name).ok().map(str::to_owned))
        .collect();

    let (exts, missing_exts) = selection::filter_available(&wanted_exts, &available_exts);
    let (layers, missing_layers) = selection::filter_available(&wanted_layers, &available_layers);

    for name in missing_exts.iter().chain(missing_layers.iter()) {
        log::warn!("Requested but unavailable: {}", name);
    }

    let exts = NameList::new(&exts);
    let layers = NameList::new(&layers);

    log::info!("Enabled Extensions:");
    for e in &exts.names {
        log::info!("\t{}", e.to_string_lossy());
    }

    log::info!("Enabled Layers:");
    for l in &layers.names {
        log::info!("\t{}", l.to_string_lossy());
    }

    let app_name = CString::new(crate::PROGRAM_NAME).unwrap_or_default();
    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .engine_name(&app_name)
        .api_version(vk::make_api_version(0, 1, 0, 0));

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(&exts.ptrs)
        .enabled_layer_names(&layers.ptrs);

    let instance = unsafe{ entry.create_instance(&create_info, None) }
        .map_err(|err| GpuError::InstanceCreation(format!("{:?}", err)))?;

    Ok((instance, exts.contains(DEBUG_UTILS_EXTENSION)))
}

fn create_debug_messenger(entry: &Entry, instance: &Instance) -> Result<(ext::DebugUtils, vk::DebugUtilsMessengerEXT), GpuError>
{
    use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;
    use vk::DebugUtilsMessageTypeFlagsEXT as MessageType;

    unsafe extern "system" fn debug_callback(
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        _msg_type: vk::DebugUtilsMessageTypeFlagsEXT,
        cb: *const vk::DebugUtilsMessengerCallbackDataEXT,
        _data: *mut c_void,
    ) -> vk::Bool32
    {
        if cb.is_null() || (*cb).p_message.is_null() {
            return vk::FALSE;
        }

        let msg = CStr::from_ptr((*cb).p_message).to_string_lossy();
        let level = if severity.contains(Severity::ERROR) {
            log::Level::Error
        } else if severity.contains(Severity::WARNING) {
            log::Level::Warn
        } else if severity.contains(Severity::INFO) {
            log::Level::Info
        } else {
            log::Level::Debug
        };

        log::log!(target: "vulkan", level, "{}", msg);

        vk::FALSE
    }

    let info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(Severity::WARNING | Severity::ERROR)
        .message_type(MessageType::GENERAL | MessageType::VALIDATION | MessageType::PERFORMANCE)
        .pfn_user_callback(Some(debug_callback));

    let debug_utils_loader = ext::DebugUtils::new(entry, instance);
    let debug = unsafe{ debug_utils_loader.create_debug_utils_messenger(&info, None) }?;

    Ok((debug_utils_loader, debug))
}

unsafe fn choose_physical_device(instance: &Instance, surface_loader: &khr::Surface, surface: vk::SurfaceKHR)
    -> Result<(vk::PhysicalDevice, QueueIndices), GpuError>
{
    let physical_devices = instance.enumerate_physical_devices()?;
    let mut candidates = Vec::with_capacity(physical_devices.len());

    for pd in physical_devices {
        let props = instance.get_physical_device_properties(pd);
        let name = string_from_slice(&props.device_name).unwrap_or("<unnamed>").to_owned();

        if !supports_swapchain(instance, pd)? {
            log::debug!("Skipping {}: no {}", name, SWAPCHAIN_EXTENSION);
            continue;
        }

        let families = instance.get_physical_device_queue_family_properties(pd);
        let queues = selection::select_queue_families(&families, |index| {
            surface_loader.get_physical_device_surface_support(pd, index, surface)
        })?;

        match queues {
            Some(queues) => {
                let score = selection::device_type_score(props.device_type);
                log::debug!("Candidate {} ({:?}), score {}", name, props.device_type, score);
                candidates.push(((pd, queues), score));
            },
            None => log::debug!("Skipping {}: no graphics/present queue", name),
        }
    }

    selection::pick_best(candidates).ok_or(GpuError::NoSuitableDevice)
}

unsafe fn supports_swapchain(instance: &Instance, physical_device: vk::PhysicalDevice) -> Result<bool, vk::Result>
{
    let props = instance.enumerate_device_extension_properties(physical_device)?;

    Ok(props.iter().any(|p| string_from_slice(&p.extension_name) == Ok(SWAPCHAIN_EXTENSION)))
}

unsafe fn create_logical_device(instance: &Instance, physical_device: vk::PhysicalDevice, queues: QueueIndices)
    -> Result<Device, GpuError>
{
    let priorities = [1.0f32];
    let queue_infos: Vec<_> = queues.unique()
        .into_iter()
        .map(|index| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(index)
                .queue_priorities(&priorities)
                .build()
        })
        .collect();

    let device_exts = NameList::new(&[SWAPCHAIN_EXTENSION]);
    let device_features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&device_exts.ptrs)
        .enabled_features(&device_features);

    Ok(instance.create_device(physical_device, &create_info, None)?)
}

/// Owned, nul-terminated names plus the pointer array Vulkan wants.
struct NameList
{
    names: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl NameList
{
    fn new(names: &[&str]) -> Self
    {
        let names: Vec<CString> = names.iter()
            .filter_map(|n| CString::new(*n).ok())
            .collect();
        let ptrs = names.iter().map(|n| n.as_ptr()).collect();

        Self { names, ptrs }
    }

    fn contains(&self, name: &str) -> bool
    {
        self.names.iter().any(|n| n.as_bytes() == name.as_bytes())
    }
}

fn string_from_slice(slice: &[c_char]) -> Result<&str, Utf8Error>
{
    unsafe{ CStr::from_ptr(slice.as_ptr()) }
        .to_str()
}
