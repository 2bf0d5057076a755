use sdl2::{
    EventPump,
    Sdl,
    VideoSubsystem,
    video,
};

use crate::{
    config::WindowConfig,
    error::WindowError,
};

/// The SDL context together with the one window the application owns.
///
/// Field order is drop order: the window goes before the video subsystem and
/// the context, which shuts SDL down last.
pub struct Window
{
    pub window: video::Window,
    _video: VideoSubsystem,
    pub sdl_context: Sdl,
}

impl Window
{
    pub fn new(config: &WindowConfig) -> Result<Self, WindowError>
    {
        let sdl_context = sdl2::init().map_err(WindowError::Init)?;
        let video = sdl_context.video().map_err(WindowError::Video)?;

        let mut builder = video.window(&config.title, config.width, config.height);
        builder
            .position_centered()
            .vulkan();

        if config.resizable {
            builder.resizable();
        }

        let window = builder.build()
            .map_err(|err| WindowError::Creation(err.to_string()))?;

        log::info!("Window \"{}\" created ({}x{})", config.title, config.width, config.height);

        Ok(Self {
            window,
            _video: video,
            sdl_context,
        })
    }

    pub fn event_pump(&self) -> Result<EventPump, WindowError>
    {
        self.sdl_context.event_pump().map_err(WindowError::EventPump)
    }

    pub fn id(&self) -> u32 { self.window.id() }

    /// Size in pixels of the area a swapchain renders into.
    pub fn drawable_size(&self) -> (u32, u32) { self.window.vulkan_drawable_size() }

    pub fn required_instance_extensions(&self) -> Result<Vec<&'static str>, String>
    {
        self.window.vulkan_instance_extensions()
    }
}
