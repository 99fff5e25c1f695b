//! Image-based lighting conversion
//!
//! Converts an equirectangular HDR source into an irradiance cube map (IEM)
//! and a pre-filtered mip chain (PMREM) by rendering six oriented unit-cube
//! views with conversion shaders, plus a 2-channel BRDF integration lookup
//! rendered once with a fullscreen quad. Every stage degrades gracefully:
//! a missing asset or shader leaves the object reporting `is_valid() ==
//! false` and dependents must check before binding.

use super::binding;
use super::mesh::{CubePrimitive, ScreenQuad};
use super::render_texture::RenderTexture;
use super::shader::Shader;
use super::texture::Texture;
use crate::config::IblConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::gpu::{ClearFlags, CubeFace, GpuResult, GraphicsDevice, TextureFormat};
use std::path::Path;

/// Pre-computed environment lighting resources
pub struct ImageBasedLight {
    valid: bool,
    irradiance: Option<RenderTexture>,
    prefiltered: Option<RenderTexture>,
    brdf_lut: Option<RenderTexture>,
    prefilter_mip_levels: u32,
}

impl ImageBasedLight {
    /// Convert the HDR environment at `hdr_path`
    ///
    /// Failure of any stage (missing asset, missing conversion shader)
    /// produces an invalid IBL object instead of an error.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shader_dir: &Path,
        config: &IblConfig,
        hdr_path: &str,
    ) -> Self {
        let invalid = Self {
            valid: false,
            irradiance: None,
            prefiltered: None,
            brdf_lut: None,
            prefilter_mip_levels: config.prefilter_mip_levels,
        };

        let Some(equirect) = load_equirect(device, hdr_path) else {
            return invalid;
        };

        let Ok(mut cube_shader) = Shader::try_load(device, shader_dir, "ibl_equirect_to_cube", &[])
        else {
            log::warn!("equirect conversion shader missing; environment lighting disabled");
            return invalid;
        };
        let Ok(mut irradiance_shader) = Shader::try_load(device, shader_dir, "ibl_irradiance", &[])
        else {
            log::warn!("irradiance shader missing; environment lighting disabled");
            return invalid;
        };
        let Ok(mut prefilter_shader) = Shader::try_load(device, shader_dir, "ibl_prefilter", &[])
        else {
            log::warn!("prefilter shader missing; environment lighting disabled");
            return invalid;
        };
        let Ok(mut brdf_shader) = Shader::try_load(device, shader_dir, "ibl_brdf", &[]) else {
            log::warn!("BRDF integration shader missing; environment lighting disabled");
            return invalid;
        };

        let mut cube = CubePrimitive::new();
        cube.buffer(device);
        let mut quad = ScreenQuad::new();
        quad.buffer(device);

        let result = Self::convert(
            device,
            config,
            &equirect,
            &mut cube_shader,
            &mut irradiance_shader,
            &mut prefilter_shader,
            &mut brdf_shader,
            &mut cube,
            &mut quad,
        );

        cube.destroy(device);
        quad.destroy(device);
        cube_shader.destroy(device);
        irradiance_shader.destroy(device);
        prefilter_shader.destroy(device);
        brdf_shader.destroy(device);

        let mut source = equirect;
        source.destroy(device);

        match result {
            Ok((environment, irradiance, prefiltered, brdf_lut)) => {
                // The raw environment cube is folded into the prefiltered
                // chain's base level; release the intermediate
                let mut environment = environment;
                environment.destroy(device);
                Self {
                    valid: true,
                    irradiance: Some(irradiance),
                    prefiltered: Some(prefiltered),
                    brdf_lut: Some(brdf_lut),
                    prefilter_mip_levels: config.prefilter_mip_levels,
                }
            }
            Err(e) => {
                log::warn!("environment conversion failed: {e}");
                invalid
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn convert(
        device: &mut dyn GraphicsDevice,
        config: &IblConfig,
        equirect: &Texture,
        cube_shader: &mut Shader,
        irradiance_shader: &mut Shader,
        prefilter_shader: &mut Shader,
        brdf_shader: &mut Shader,
        cube: &mut CubePrimitive,
        quad: &mut ScreenQuad,
    ) -> GpuResult<(RenderTexture, RenderTexture, RenderTexture, RenderTexture)> {
        // Equirect -> raw environment cube
        let mut environment =
            RenderTexture::new_cube("ibl_environment", config.cube_size, TextureFormat::Rgba16F);
        environment.buffer(device)?;
        cube_shader.bind(device);
        equirect.bind(device, binding::POSTFX_SOURCE, true);
        cube_shader.set_i32(device, "equirectImage", binding::POSTFX_SOURCE as i32);
        for face in CubeFace::ALL {
            environment.bind_framebuffer(device, 0)?;
            environment.attach_to_framebuffer(device, Some(face), 0)?;
            device.clear(ClearFlags::COLOR, [0.0; 4]);
            cube_shader.set_mat4(device, "faceView", &cube_face_view(face));
            cube.draw(device);
        }
        equirect.bind(device, binding::POSTFX_SOURCE, false);

        // Environment cube -> irradiance cube (IEM)
        let mut irradiance =
            RenderTexture::new_cube("ibl_irradiance", config.cube_size / 4, TextureFormat::Rgba16F);
        irradiance.buffer(device)?;
        irradiance_shader.bind(device);
        environment.bind(device, binding::environment::SKY, true);
        for face in CubeFace::ALL {
            irradiance.bind_framebuffer(device, 0)?;
            irradiance.attach_to_framebuffer(device, Some(face), 0)?;
            device.clear(ClearFlags::COLOR, [0.0; 4]);
            irradiance_shader.set_mat4(device, "faceView", &cube_face_view(face));
            cube.draw(device);
        }

        // Environment cube -> pre-filtered mip chain (PMREM), roughness per mip
        let mut prefiltered =
            RenderTexture::new_cube("ibl_prefiltered", config.cube_size, TextureFormat::Rgba16F);
        prefiltered.buffer(device)?;
        prefilter_shader.bind(device);
        let mip_levels = config.prefilter_mip_levels.max(1);
        for mip in 0..mip_levels {
            let roughness = if mip_levels > 1 {
                mip as f32 / (mip_levels - 1) as f32
            } else {
                0.0
            };
            prefilter_shader.set_f32(device, "roughness", roughness);
            for face in CubeFace::ALL {
                prefiltered.bind_framebuffer(device, mip)?;
                prefiltered.attach_to_framebuffer(device, Some(face), mip)?;
                device.clear(ClearFlags::COLOR, [0.0; 4]);
                prefilter_shader.set_mat4(device, "faceView", &cube_face_view(face));
                cube.draw(device);
            }
        }
        environment.bind(device, binding::environment::SKY, false);

        // BRDF integration lookup, rendered once
        let mut brdf_lut = RenderTexture::new(
            "ibl_brdf_lut",
            config.brdf_lut_size,
            config.brdf_lut_size,
            TextureFormat::Rg16F,
        );
        brdf_lut.buffer(device)?;
        brdf_lut.bind_framebuffer(device, 0)?;
        brdf_lut.attach_to_framebuffer(device, None, 0)?;
        device.clear(ClearFlags::COLOR, [0.0; 4]);
        brdf_shader.bind(device);
        quad.draw(device);
        brdf_shader.unbind(device);

        Ok((environment, irradiance, prefiltered, brdf_lut))
    }

    /// Whether conversion completed and the maps may be bound
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Number of roughness mips in the pre-filtered map
    pub fn prefilter_mip_levels(&self) -> u32 {
        self.prefilter_mip_levels
    }

    /// Bind irradiance, pre-filtered, and BRDF maps at their fixed units
    ///
    /// Invalid IBL objects log and bind nothing.
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        if !self.valid {
            log::warn!("bind of invalid image-based light skipped");
            return;
        }
        if let Some(irradiance) = &self.irradiance {
            irradiance.bind(device, binding::environment::IRRADIANCE, true);
        }
        if let Some(prefiltered) = &self.prefiltered {
            prefiltered.bind(device, binding::environment::PREFILTERED, true);
        }
        if let Some(brdf_lut) = &self.brdf_lut {
            brdf_lut.bind(device, binding::environment::BRDF_LUT, true);
        }
    }

    /// Detach the environment maps
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        if let Some(irradiance) = &self.irradiance {
            irradiance.bind(device, binding::environment::IRRADIANCE, false);
        }
        if let Some(prefiltered) = &self.prefiltered {
            prefiltered.bind(device, binding::environment::PREFILTERED, false);
        }
        if let Some(brdf_lut) = &self.brdf_lut {
            brdf_lut.bind(device, binding::environment::BRDF_LUT, false);
        }
    }

    /// Release every owned resource; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(mut irradiance) = self.irradiance.take() {
            irradiance.destroy(device);
        }
        if let Some(mut prefiltered) = self.prefiltered.take() {
            prefiltered.destroy(device);
        }
        if let Some(mut brdf_lut) = self.brdf_lut.take() {
            brdf_lut.destroy(device);
        }
        self.valid = false;
    }
}

/// View matrix looking through one cube face from the origin
fn cube_face_view(face: CubeFace) -> Mat4 {
    let (target, up) = match face {
        CubeFace::PositiveX => (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
        CubeFace::NegativeX => (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
        CubeFace::PositiveY => (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        CubeFace::NegativeY => (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
        CubeFace::PositiveZ => (Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0)),
        CubeFace::NegativeZ => (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0)),
    };
    Mat4::look_at(Vec3::zeros(), target, up)
}

/// Decode an equirectangular HDR image into a half-float texture
fn load_equirect(device: &mut dyn GraphicsDevice, path: &str) -> Option<Texture> {
    let decoded = match image::open(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("HDR environment '{path}' unavailable ({e}); lighting disabled");
            return None;
        }
    };
    let rgb = decoded.to_rgb32f();
    let (width, height) = rgb.dimensions();

    let mut texels = Vec::with_capacity((width * height) as usize * 8);
    for pixel in rgb.pixels() {
        for channel in [pixel.0[0], pixel.0[1], pixel.0[2], 1.0] {
            texels.extend_from_slice(&f32_to_f16_bits(channel).to_le_bytes());
        }
    }

    let mut texture = Texture::from_pixels(path, width, height, TextureFormat::Rgba16F, texels);
    texture.set_wrap(crate::gpu::WrapMode::ClampToEdge);
    match texture.buffer(device) {
        Ok(()) => Some(texture),
        Err(e) => {
            log::warn!("failed to buffer HDR environment '{path}': {e}");
            None
        }
    }
}

/// IEEE 754 binary32 → binary16 conversion (round-to-nearest-even omitted;
/// truncation is sufficient for environment radiance)
fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        // Inf/NaN
        return sign | 0x7c00 | if mantissa != 0 { 0x0200 } else { 0 };
    }
    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1f {
        return sign | 0x7c00; // overflow to infinity
    }
    if half_exponent <= 0 {
        if half_exponent < -10 {
            return sign; // underflow to zero
        }
        let mantissa = mantissa | 0x0080_0000;
        return sign | (mantissa >> (14 - half_exponent)) as u16;
    }
    sign | ((half_exponent as u16) << 10) | (mantissa >> 13) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_missing_hdr_asset_reports_invalid() {
        let mut device = RecordingDevice::new();
        let config = IblConfig::default();
        let ibl = ImageBasedLight::new(
            &mut device,
            Path::new("no_such_dir"),
            &config,
            "missing_environment.hdr",
        );
        assert!(!ibl.is_valid());
    }

    #[test]
    fn test_invalid_ibl_binds_nothing() {
        let mut device = RecordingDevice::new();
        let config = IblConfig::default();
        let ibl = ImageBasedLight::new(&mut device, Path::new("nowhere"), &config, "missing.hdr");

        device.clear_log();
        ibl.bind(&mut device);
        assert_eq!(device.count_calls_containing("bind_texture"), 0);
    }

    #[test]
    fn test_f16_conversion_basics() {
        assert_eq!(f32_to_f16_bits(0.0), 0);
        assert_eq!(f32_to_f16_bits(1.0), 0x3c00);
        assert_eq!(f32_to_f16_bits(-2.0), 0xc000);
        assert_eq!(f32_to_f16_bits(f32::INFINITY), 0x7c00);
        assert_eq!(f32_to_f16_bits(65536.0), 0x7c00); // overflow clamps to inf
    }

    #[test]
    fn test_cube_face_views_are_distinct() {
        let mut seen = Vec::new();
        for face in CubeFace::ALL {
            let view = cube_face_view(face);
            assert!(!seen.contains(&view));
            seen.push(view);
        }
    }
}
