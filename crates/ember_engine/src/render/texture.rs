//! Texture resource with an explicit create → buffer → bind → destroy lifecycle
//!
//! A texture owns its CPU texel storage until buffered to the GPU. Buffering
//! allocates storage (mip chain sized from the larger dimension), uploads,
//! generates mipmaps, and configures wrap/filter state on both the texture
//! object and a paired sampler object.

use crate::gpu::{
    mip_level_count, FilterMode, GraphicsDevice, SamplerId, TextureFormat, TextureId,
    TextureTarget, WrapMode,
};
use thiserror::Error;

/// Texture loading and lifecycle errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// File could not be read
    #[error("failed to read texture file '{path}': {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// File contents could not be decoded
    #[error("failed to decode texture '{path}': {message}")]
    Decode {
        /// Offending path
        path: String,
        /// Decoder message
        message: String,
    },
}

/// GPU-side names owned by a buffered texture
#[derive(Debug, Clone, Copy)]
struct GpuState {
    texture: TextureId,
    sampler: SamplerId,
    width: u32,
    height: u32,
}

/// A texture resource (2D, or a cube map sharing one GPU name across faces)
#[derive(Debug)]
pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    format: TextureFormat,
    target: TextureTarget,
    min_filter: FilterMode,
    mag_filter: FilterMode,
    wrap: WrapMode,
    pixels: Option<Vec<u8>>,
    gpu: Option<GpuState>,
}

impl Texture {
    /// Create a texture with the given CPU pixel buffer
    pub fn from_pixels(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            format,
            target: TextureTarget::Tex2D,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            wrap: WrapMode::Repeat,
            pixels: Some(pixels),
            gpu: None,
        }
    }

    /// Create a 1x1 solid-color texture
    pub fn solid(name: impl Into<String>, color: [u8; 4]) -> Self {
        Self::from_pixels(name, 1, 1, TextureFormat::Rgba8, color.to_vec())
    }

    /// Create a texture filled with a bilinear gradient between four corner
    /// colors, ordered top-left, top-right, bottom-left, bottom-right
    pub fn four_corner_gradient(
        name: impl Into<String>,
        width: u32,
        height: u32,
        corners: [[u8; 4]; 4],
    ) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let ty = if height > 1 {
                y as f32 / (height - 1) as f32
            } else {
                0.0
            };
            for x in 0..width {
                let tx = if width > 1 {
                    x as f32 / (width - 1) as f32
                } else {
                    0.0
                };
                for channel in 0..4 {
                    let top = lerp_u8(corners[0][channel], corners[1][channel], tx);
                    let bottom = lerp_u8(corners[2][channel], corners[3][channel], tx);
                    pixels.push(lerp_u8(top, bottom, ty));
                }
            }
        }
        Self::from_pixels(name, width, height, TextureFormat::Rgba8, pixels)
    }

    /// The engine's designated error texture: a magenta/black checker
    pub fn error(name: impl Into<String>) -> Self {
        const CHECKER: u32 = 8;
        let mut pixels = Vec::with_capacity((CHECKER * CHECKER * 4) as usize);
        for y in 0..CHECKER {
            for x in 0..CHECKER {
                let magenta = (x + y) % 2 == 0;
                if magenta {
                    pixels.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
        Self::from_pixels(name, CHECKER, CHECKER, TextureFormat::Rgba8, pixels)
    }

    /// Create a texture without CPU pixels (render-target storage)
    pub fn empty(name: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            format,
            target: TextureTarget::Tex2D,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
            pixels: None,
            gpu: None,
        }
    }

    /// Create a cube-map texture without CPU pixels; all six logical faces
    /// share the one GPU texture name this resource owns
    pub fn empty_cube(name: impl Into<String>, size: u32, format: TextureFormat) -> Self {
        let mut texture = Self::empty(name, size, size, format);
        texture.target = TextureTarget::CubeMap;
        texture
    }

    /// Load and decode a texture file (PNG/JPEG)
    pub fn from_file(path: &str) -> Result<Self, TextureError> {
        let decoded = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => TextureError::Io {
                path: path.to_string(),
                source,
            },
            other => TextureError::Decode {
                path: path.to_string(),
                message: other.to_string(),
            },
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::from_pixels(
            path,
            width,
            height,
            TextureFormat::Rgba8,
            rgba.into_raw(),
        ))
    }

    /// Texture name (asset path for file-backed textures)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared width and height in texels
    pub fn texel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Storage format
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Binding target (2D or cube map)
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Whether GPU storage currently exists
    pub fn is_buffered(&self) -> bool {
        self.gpu.is_some()
    }

    /// GPU texture name, once buffered
    pub fn gpu_texture(&self) -> Option<TextureId> {
        self.gpu.map(|g| g.texture)
    }

    /// Override filtering before buffering
    pub fn set_filtering(&mut self, min: FilterMode, mag: FilterMode) {
        self.min_filter = min;
        self.mag_filter = mag;
    }

    /// Override wrap mode before buffering
    pub fn set_wrap(&mut self, wrap: WrapMode) {
        self.wrap = wrap;
    }

    /// Change the declared resolution; the next `buffer` reallocates storage
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        // CPU pixels for the old size no longer apply
        self.pixels = None;
    }

    /// Allocate/upload GPU storage and configure texture + sampler state
    ///
    /// Re-buffering at an unchanged resolution re-uploads without
    /// reallocating; a resolution change reallocates storage exactly once.
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) -> crate::gpu::GpuResult<()> {
        let mips = mip_level_count(self.width, self.height);

        let needs_alloc = match self.gpu {
            Some(gpu) => gpu.width != self.width || gpu.height != self.height,
            None => true,
        };

        if needs_alloc {
            if let Some(old) = self.gpu {
                device.destroy_texture(old.texture);
            }
            let texture = device.create_texture(self.target);
            device.alloc_texture_storage(texture, self.format, self.width, self.height, mips)?;

            let sampler = match self.gpu {
                Some(old) => old.sampler,
                None => device.create_sampler(),
            };
            self.gpu = Some(GpuState {
                texture,
                sampler,
                width: self.width,
                height: self.height,
            });
        }

        let Some(gpu) = self.gpu else {
            return Err(crate::gpu::GpuError::UnknownHandle("texture"));
        };
        if let Some(pixels) = &self.pixels {
            device.upload_texture_pixels(gpu.texture, None, 0, self.width, self.height, pixels)?;
            device.generate_mipmaps(gpu.texture)?;
        }

        device.set_texture_filtering(gpu.texture, self.min_filter, self.mag_filter)?;
        device.set_texture_wrap(gpu.texture, self.wrap)?;
        device.set_sampler_filtering(gpu.sampler, self.min_filter, self.mag_filter)?;
        device.set_sampler_wrap(gpu.sampler, self.wrap)?;
        Ok(())
    }

    /// Attach (`enable`) or detach this texture and its sampler at a unit
    ///
    /// Detaching is safe regardless of current binding state; binding an
    /// unbuffered texture logs and does nothing.
    pub fn bind(&self, device: &mut dyn GraphicsDevice, unit: u32, enable: bool) {
        if !enable {
            device.bind_texture(unit, self.target, None);
            device.bind_sampler(unit, None);
            return;
        }
        match self.gpu {
            Some(gpu) => {
                device.bind_texture(unit, self.target, Some(gpu.texture));
                device.bind_sampler(unit, Some(gpu.sampler));
            }
            None => log::warn!("bind of unbuffered texture '{}' skipped", self.name),
        }
    }

    /// Release GPU names and CPU pixel storage; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(gpu) = self.gpu.take() {
            device.destroy_texture(gpu.texture);
            device.destroy_sampler(gpu.sampler);
        }
        self.pixels = None;
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_texel_size_round_trip() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::four_corner_gradient(
            "gradient",
            64,
            32,
            [
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 255, 255],
            ],
        );
        texture.buffer(&mut device).unwrap();
        assert_eq!(texture.texel_size(), (64, 32));
    }

    #[test]
    fn test_rebuffer_same_size_does_not_reallocate() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::solid("white", [255, 255, 255, 255]);
        texture.buffer(&mut device).unwrap();
        texture.buffer(&mut device).unwrap();
        assert_eq!(device.count_calls_containing("alloc_texture_storage"), 1);
    }

    #[test]
    fn test_rebuffer_after_resize_reallocates_exactly_once() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::empty("target", 128, 128, TextureFormat::Rgba16F);
        texture.buffer(&mut device).unwrap();
        texture.set_resolution(256, 256);
        texture.buffer(&mut device).unwrap();
        assert_eq!(device.count_calls_containing("alloc_texture_storage"), 2);
        // One texture name alive: the old one was released on resize
        assert_eq!(device.alive_texture_count(), 1);
    }

    #[test]
    fn test_unbind_when_already_unbound_is_harmless() {
        let mut device = RecordingDevice::new();
        let texture = Texture::solid("white", [255, 255, 255, 255]);
        texture.bind(&mut device, 0, false);
        texture.bind(&mut device, 0, false);
        assert_eq!(device.count_calls_containing("bind_texture unit=0"), 2);
    }

    #[test]
    fn test_destroy_twice_does_not_double_free() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::solid("white", [255, 255, 255, 255]);
        texture.buffer(&mut device).unwrap();
        let id = texture.gpu_texture().unwrap();

        texture.destroy(&mut device);
        texture.destroy(&mut device);
        assert_eq!(device.destroy_count("texture", id.0), 1);
    }

    #[test]
    fn test_gradient_corners() {
        let texture = Texture::four_corner_gradient(
            "g",
            2,
            2,
            [
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 255, 255],
            ],
        );
        let pixels = texture.pixels.as_ref().unwrap();
        assert_eq!(&pixels[0..4], &[255, 0, 0, 255]); // top-left
        assert_eq!(&pixels[4..8], &[0, 255, 0, 255]); // top-right
        assert_eq!(&pixels[8..12], &[0, 0, 255, 255]); // bottom-left
    }

    #[test]
    fn test_mip_count_follows_larger_dimension() {
        let mut device = RecordingDevice::new();
        let mut texture = Texture::empty("t", 256, 16, TextureFormat::Rgba8);
        texture.buffer(&mut device).unwrap();
        assert_eq!(device.count_calls_containing("mips=9"), 1);
    }
}
