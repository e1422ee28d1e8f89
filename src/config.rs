use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "pinmap.toml";

/// Map extent used when neither the config nor the image provides one.
pub const FALLBACK_MAP_SIZE: (f64, f64) = (7200.0, 3600.0);

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub image: PathBuf,
    pub pins: PathBuf,
    pub map_width: Option<f64>,
    pub map_height: Option<f64>,
    pub layers: Vec<OverlayLayer>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("mapa.png"),
            pins: PathBuf::from("pins.json"),
            map_width: None,
            map_height: None,
            layers: vec![OverlayLayer::new("layer1.png")],
        }
    }
}

impl MapConfig {
    /// Reads `path`, or returns the defaults if the file does not exist.
    /// Relative paths inside the file are taken relative to its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for layer in &self.layers {
            if !(0.0..=1.0).contains(&layer.opacity) {
                return Err(ConfigError::Opacity(layer.opacity));
            }
        }
        Ok(())
    }

    /// Configured map extent, falling back to `image_size` and then to
    /// [`FALLBACK_MAP_SIZE`].
    pub fn map_size(&self, image_size: Option<(f64, f64)>) -> (f64, f64) {
        let (fallback_w, fallback_h) = image_size.unwrap_or(FALLBACK_MAP_SIZE);
        (
            self.map_width.unwrap_or(fallback_w),
            self.map_height.unwrap_or(fallback_h),
        )
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.image);
        resolve(&mut self.pins);
        for layer in &mut self.layers {
            resolve(&mut layer.file);
        }
    }
}

/// An auxiliary image drawn over the map, toggled and faded independently.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OverlayLayer {
    pub file: PathBuf,
    #[serde(default)]
    pub visible: bool,
    #[serde(default = "full_opacity")]
    pub opacity: f32,
}

fn full_opacity() -> f32 {
    1.0
}

impl OverlayLayer {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            visible: false,
            opacity: full_opacity(),
        }
    }

    /// File name without its extension.
    pub fn display_name(&self) -> String {
        self.file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Opacity as the 0..=100 percentage shown on the slider.
    pub fn opacity_percent(&self) -> u8 {
        (self.opacity * 100.0).round() as u8
    }

    pub fn set_opacity_percent(&mut self, percent: u8) {
        self.opacity = f32::from(percent.min(100)) / 100.0;
    }
}
