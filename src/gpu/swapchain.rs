use ash::{
    Device,
    Instance,
    extensions::khr,
    vk::{
        self,
        Extent2D,
        PresentModeKHR,
        SurfaceCapabilitiesKHR,
        SurfaceFormatKHR,
    },
};

use super::selection::QueueIndices;
use crate::error::GpuError;

/// Everything the swapchain needs to know about the surface it presents to.
pub struct SurfaceTarget<'a>
{
    pub surface_loader: &'a khr::Surface,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub queues: QueueIndices,
}

impl SurfaceTarget<'_>
{
    unsafe fn capabilities(&self) -> Result<SurfaceCapabilitiesKHR, vk::Result>
    {
        self.surface_loader.get_physical_device_surface_capabilities(self.physical_device, self.surface)
    }
}

pub struct Swapchain
{
    loader: khr::Swapchain,
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: SurfaceFormatKHR,
    pub present_mode: PresentModeKHR,
    pub extent: Extent2D,
}

impl Swapchain
{
    pub unsafe fn new(
        instance: &Instance,
        device: &Device,
        target: &SurfaceTarget,
        drawable_size: (u32, u32),
    ) -> Result<Self, GpuError>
    {
        let formats = target.surface_loader
            .get_physical_device_surface_formats(target.physical_device, target.surface)?;
        let present_modes = target.surface_loader
            .get_physical_device_surface_present_modes(target.physical_device, target.surface)?;

        let format = choose_format(&formats).ok_or(GpuError::NoSurfaceFormat)?;
        let present_mode = choose_present_mode(&present_modes);

        let capabilities = target.capabilities()?;
        let extent = choose_swap_extent(&capabilities, drawable_size);

        let loader = khr::Swapchain::new(instance, device);
        let handle = create_swapchain(&loader, target, &capabilities, format, present_mode, extent, vk::SwapchainKHR::null())?;

        let mut swapchain = Self {
            loader,
            handle,
            images: Vec::new(),
            image_views: Vec::new(),
            format,
            present_mode,
            extent,
        };
        let fetched = swapchain.fetch_images(device);
        release_on_err(fetched, || swapchain.destroy(device))?;

        log::info!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            extent.width, extent.height, swapchain.images.len(), format.format, present_mode
        );

        Ok(swapchain)
    }

    /// Rebuilds the swapchain for a new drawable size. The caller must make
    /// sure the device is idle.
    pub unsafe fn recreate(&mut self, device: &Device, target: &SurfaceTarget, drawable_size: (u32, u32)) -> Result<(), GpuError>
    {
        let capabilities = target.capabilities()?;
        let extent = choose_swap_extent(&capabilities, drawable_size);

        let old_swapchain = self.handle;
        let handle = create_swapchain(&self.loader, target, &capabilities, self.format, self.present_mode, extent, old_swapchain)?;

        self.destroy_views(device);
        self.loader.destroy_swapchain(old_swapchain, None);

        self.handle = handle;
        self.extent = extent;

        let fetched = self.fetch_images(device);
        release_on_err(fetched, || self.destroy(device))?;

        log::debug!("Swapchain recreated at {}x{}", extent.width, extent.height);

        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &Device)
    {
        self.destroy_views(device);

        //images destroyed by destroy_swapchain
        self.loader.destroy_swapchain(self.handle, None);
        self.handle = vk::SwapchainKHR::null();
        self.images.clear();
    }

    unsafe fn fetch_images(&mut self, device: &Device) -> Result<(), GpuError>
    {
        self.images = self.loader.get_swapchain_images(self.handle)?;
        self.image_views = Vec::with_capacity(self.images.len());

        for image in &self.images {
            match create_image_view(device, self.format, *image) {
                Ok(view) => self.image_views.push(view),
                Err(err) => {
                    self.destroy_views(device);
                    return Err(err.into());
                }
            }
        }

        Ok(())
    }

    unsafe fn destroy_views(&mut self, device: &Device)
    {
        for view in self.image_views.drain(..) {
            device.destroy_image_view(view, None);
        }
    }
}

/// Runs `release` when `result` is an error, so a half-built object does not
/// outlive the call that failed to finish it.
fn release_on_err<T, E>(result: Result<T, E>, release: impl FnOnce()) -> Result<T, E>
{
    if result.is_err() {
        release();
    }
    result
}

unsafe fn create_swapchain(
    loader: &khr::Swapchain,
    target: &SurfaceTarget,
    capabilities: &SurfaceCapabilitiesKHR,
    surface_format: SurfaceFormatKHR,
    present_mode: PresentModeKHR,
    extent: Extent2D,
    old_swapchain: vk::SwapchainKHR,
) -> Result<vk::SwapchainKHR, vk::Result>
{
    let queue_family_indices = target.queues.unique();
    let sharing_mode = if target.queues.is_shared() {
        vk::SharingMode::EXCLUSIVE
    } else {
        vk::SharingMode::CONCURRENT
    };

    let mut create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(target.surface)
        .min_image_count(choose_image_count(capabilities))
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    if sharing_mode == vk::SharingMode::CONCURRENT {
        create_info = create_info.queue_family_indices(&queue_family_indices);
    }

    loader.create_swapchain(&create_info, None)
}

unsafe fn create_image_view(device: &Device, surface_format: SurfaceFormatKHR, image: vk::Image) -> Result<vk::ImageView, vk::Result>
{
    let components = vk::ComponentMapping {
        r: vk::ComponentSwizzle::IDENTITY,
        g: vk::ComponentSwizzle::IDENTITY,
        b: vk::ComponentSwizzle::IDENTITY,
        a: vk::ComponentSwizzle::IDENTITY,
    };

    let subresource_range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    };

    let view_info = vk::ImageViewCreateInfo {
        format: surface_format.format,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        components,
        subresource_range,

        ..Default::default()
    };

    device.create_image_view(&view_info, None)
}

/// One more than the minimum, capped by the maximum when the surface has one.
pub fn choose_image_count(capabilities: &SurfaceCapabilitiesKHR) -> u32
{
    let count = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

pub fn choose_swap_extent(capabilities: &SurfaceCapabilitiesKHR, size: (u32, u32)) -> Extent2D
{
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let width = size.0.clamp(
        capabilities.min_image_extent.width,
        capabilities.max_image_extent.width
    );

    let height = size.1.clamp(
        capabilities.min_image_extent.height,
        capabilities.max_image_extent.height
    );

    Extent2D { width, height }
}

pub fn choose_format(formats: &[SurfaceFormatKHR]) -> Option<SurfaceFormatKHR>
{
    formats.iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

pub fn choose_present_mode(modes: &[PresentModeKHR]) -> PresentModeKHR
{
    if modes.contains(&PresentModeKHR::FIFO) {
        PresentModeKHR::FIFO
    } else {
        PresentModeKHR::IMMEDIATE
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn capabilities(min: u32, max: u32) -> SurfaceCapabilitiesKHR
    {
        SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: Extent2D { width: 1, height: 1 },
            max_image_extent: Extent2D { width: 4096, height: 2048 },
            ..Default::default()
        }
    }

    #[test]
    fn failed_step_releases_what_was_built()
    {
        let mut released = false;
        let result: Result<(), vk::Result> = release_on_err(
            Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            || released = true
        );

        assert_eq!(result, Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        assert!(released);
    }

    #[test]
    fn successful_step_keeps_what_was_built()
    {
        let mut released = false;
        let result: Result<u32, vk::Result> = release_on_err(Ok(3), || released = true);

        assert_eq!(result, Ok(3));
        assert!(!released);
    }

    #[test]
    fn image_count_respects_maximum()
    {
        assert_eq!(choose_image_count(&capabilities(2, 0)), 3);
        assert_eq!(choose_image_count(&capabilities(2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities(3, 3)), 3);
    }

    #[test]
    fn current_extent_wins_when_defined()
    {
        let mut caps = capabilities(2, 0);
        caps.current_extent = Extent2D { width: 800, height: 600 };

        assert_eq!(choose_swap_extent(&caps, (1920, 1080)), Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn drawable_size_is_clamped_when_extent_undefined()
    {
        let caps = capabilities(2, 0);

        assert_eq!(choose_swap_extent(&caps, (1280, 720)), Extent2D { width: 1280, height: 720 });
        assert_eq!(choose_swap_extent(&caps, (8000, 0)), Extent2D { width: 4096, height: 1 });
    }

    #[test]
    fn srgb_format_is_preferred()
    {
        let unorm = SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let srgb = SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };

        let chosen = |formats: &[SurfaceFormatKHR]| choose_format(formats).map(|f| f.format);

        assert_eq!(chosen(&[unorm, srgb]), Some(vk::Format::B8G8R8A8_SRGB));
        assert_eq!(chosen(&[unorm]), Some(vk::Format::B8G8R8A8_UNORM));
        assert_eq!(chosen(&[]), None);
    }

    #[test]
    fn fifo_is_preferred_over_immediate()
    {
        assert_eq!(choose_present_mode(&[PresentModeKHR::IMMEDIATE, PresentModeKHR::FIFO]), PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&[PresentModeKHR::MAILBOX]), PresentModeKHR::IMMEDIATE);
    }
}
