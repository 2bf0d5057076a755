//! Startup configuration, read from an optional TOML file.
//!
//! Every field has a default, so a missing file, an empty file, or a file
//! that sets only a few keys are all valid.

use std::path::{ Path, PathBuf };

use serde::Deserialize;

use crate::{
    cli::CliArgs,
    error::ConfigError,
};

pub const CONFIG_ENV_VAR: &str = "SDL_GPU_STARTER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "starter.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig
{
    pub window: WindowConfig,
    pub gpu: GpuConfig,
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig
{
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig
{
    fn default() -> Self
    {
        Self {
            title: crate::PROGRAM_NAME.into(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Shader bytecode formats an application may intend to feed the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderFormat
{
    Spirv,
    Dxil,
    Msl,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuConfig
{
    pub shader_formats: Vec<ShaderFormat>,
    pub validation: bool,
}

impl Default for GpuConfig
{
    fn default() -> Self
    {
        Self {
            shader_formats: vec![ShaderFormat::Spirv],
            validation: cfg!(feature = "validation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig
{
    /// Frame rate cap for non-vsync present modes. `0` disables pacing.
    pub target_fps: u32,
}

impl Default for FrameConfig
{
    fn default() -> Self
    {
        Self { target_fps: 60 }
    }
}

impl AppConfig
{
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError>
    {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError>
    {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;

        Self::from_toml_str(&contents)
    }

    /// Loads the file named on the command line (or by
    /// `SDL_GPU_STARTER_CONFIG`), else `starter.toml` in the working
    /// directory. Falls back to defaults when none is present.
    pub fn discover(args: &CliArgs) -> Result<Self, ConfigError>
    {
        let path = resolve_path(args.config.clone(), Path::new(DEFAULT_CONFIG_FILE).is_file());

        match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)
            },
            None => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError>
    {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if self.gpu.shader_formats.is_empty() {
            return Err(ConfigError::Invalid("gpu.shader_formats must name at least one format".into()));
        }

        Ok(())
    }
}

fn resolve_path(requested: Option<PathBuf>, default_exists: bool) -> Option<PathBuf>
{
    requested
        .or_else(|| default_exists.then(|| PathBuf::from(DEFAULT_CONFIG_FILE)))
}
