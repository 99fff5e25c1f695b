//! Engine configuration
//!
//! Strongly-typed configuration tree with named fields and defaults for every
//! value. Files may be TOML or RON; an absent file means defaults. Malformed
//! values fail the parse as a whole rather than degrading silently — the
//! caller decides whether that is fatal.

use serde::{Deserialize, Serialize};

/// Configuration trait for file-backed config types
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Window surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// VSync setting
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ember Engine".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Defaults used when a scene supplies no camera of its own
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDefaults {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Root directories for on-disk assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Directory containing shader source files
    pub shader_dir: String,
    /// Directory containing texture image files
    pub texture_dir: String,
    /// Directory containing scene documents
    pub scene_dir: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            shader_dir: "resources/shaders".to_string(),
            texture_dir: "resources/textures".to_string(),
            scene_dir: "resources/scenes".to_string(),
        }
    }
}

/// Post-processing tuning constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostFxConfig {
    /// Number of downsample iterations in the bloom chain
    pub num_down_samples: usize,
    /// Number of horizontal+vertical blur passes at the smallest resolution
    pub blur_passes: usize,
    /// Luminance threshold for the bloom bright-pass
    pub bloom_threshold: f32,
    /// Strength of the additive bloom blend
    pub bloom_intensity: f32,
}

impl Default for PostFxConfig {
    fn default() -> Self {
        Self {
            num_down_samples: 4,
            blur_passes: 4,
            bloom_threshold: 1.0,
            bloom_intensity: 0.6,
        }
    }
}

/// Shadow map tuning constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Shadow map resolution (square)
    pub map_size: u32,
    /// World-space extent covered by the directional shadow frustum
    pub ortho_extent: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 2048,
            ortho_extent: 50.0,
        }
    }
}

/// Image-based lighting tuning constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IblConfig {
    /// Face resolution of converted environment cube maps
    pub cube_size: u32,
    /// Number of roughness mip levels in the pre-filtered map
    pub prefilter_mip_levels: u32,
    /// Resolution of the BRDF integration lookup texture
    pub brdf_lut_size: u32,
}

impl Default for IblConfig {
    fn default() -> Self {
        Self {
            cube_size: 256,
            prefilter_mip_levels: 5,
            brdf_lut_size: 512,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window surface configuration
    pub window: WindowConfig,
    /// Fallback camera parameters
    pub camera: CameraDefaults,
    /// Asset root directories
    pub paths: AssetPaths,
    /// Post-processing constants
    pub post_fx: PostFxConfig,
    /// Shadow constants
    pub shadows: ShadowConfig,
    /// Image-based lighting constants
    pub ibl: IblConfig,
    /// Fixed simulation step in seconds
    pub fixed_step_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraDefaults::default(),
            paths: AssetPaths::default(),
            post_fx: PostFxConfig::default(),
            shadows: ShadowConfig::default(),
            ibl: IblConfig::default(),
            fixed_step_seconds: 1.0 / 60.0,
        }
    }
}

impl EngineConfig {
    /// Configuration with every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Aspect ratio of the configured window surface
    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = EngineConfig::new();
        assert!(config.window.width > 0 && config.window.height > 0);
        assert!(config.camera.near < config.camera.far);
        assert!(config.post_fx.num_down_samples >= 1);
        assert!(config.fixed_step_seconds > 0.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::new();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let back: EngineConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back.window.width, config.window.width);
        assert_eq!(back.post_fx.num_down_samples, config.post_fx.num_down_samples);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let text = "[window]\nwidth = 640\nheight = 480\ntitle = \"t\"\nvsync = false\n";
        let config: EngineConfig = toml::from_str(text).expect("parse");
        assert_eq!(config.window.width, 640);
        // Unspecified sections fall back to defaults
        assert_eq!(config.shadows.map_size, ShadowConfig::default().map_size);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let result = EngineConfig::load_from_file("engine.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
