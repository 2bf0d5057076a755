use ash::vk;
use thiserror::Error;

use crate::config::ShaderFormat;

#[derive(Error, Debug)]
pub enum ConfigError
{
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum WindowError
{
    #[error("SDL initialization failed: {0}")]
    Init(String),

    #[error("SDL video subsystem unavailable: {0}")]
    Video(String),

    #[error("window creation failed: {0}")]
    Creation(String),

    #[error("event pump unavailable: {0}")]
    EventPump(String),
}

#[derive(Error, Debug)]
pub enum GpuError
{
    #[error("failed to load the Vulkan library: {0}")]
    Loading(String),

    #[error("failed to create Vulkan instance: {0}")]
    InstanceCreation(String),

    #[error("window cannot host a Vulkan surface: {0}")]
    Surface(String),

    #[error("none of the requested shader formats {0:?} is consumable by the Vulkan backend")]
    UnsupportedShaderFormats(Vec<ShaderFormat>),

    #[error("no GPU with graphics, present and swapchain support was found")]
    NoSuitableDevice,

    #[error("surface reports no formats")]
    NoSurfaceFormat,

    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}

#[derive(Error, Debug)]
pub enum AppError
{
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}
