//! Bloom-style post-processing over the HDR scene output
//!
//! Pass order: luminance threshold (full → half resolution) → downsample
//! blits through the pingpong chain → repeated separable horizontal+vertical
//! blur at the smallest resolution → upsample blits back toward full
//! resolution → one additive blend onto the original full-resolution target
//! → tonemap to the backbuffer. A target is never read and written in the
//! same draw.

use super::mesh::ScreenQuad;
use super::render_texture::RenderTexture;
use super::shader::Shader;
use crate::config::PostFxConfig;
use crate::gpu::{BlendMode, ClearFlags, GpuResult, GraphicsDevice, TextureFormat};
use crate::render::binding;
use std::path::Path;

/// Multi-pass bloom + tonemap pipeline
pub struct PostFxManager {
    config: PostFxConfig,
    threshold_shader: Shader,
    blit_shader: Shader,
    blur_shader: Shader,
    combine_shader: Shader,
    tonemap_shader: Shader,
    targets: Vec<RenderTexture>,
    quad: ScreenQuad,
    width: u32,
    height: u32,
}

impl PostFxManager {
    /// Build the pipeline and allocate the pingpong chain
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shader_dir: &Path,
        config: PostFxConfig,
        width: u32,
        height: u32,
    ) -> GpuResult<Self> {
        let threshold_shader = Shader::load(device, shader_dir, "postfx_threshold", &[]);
        let blit_shader = Shader::load(device, shader_dir, "postfx_blit", &[]);
        let blur_shader = Shader::load(device, shader_dir, "postfx_blur", &[]);
        let combine_shader = Shader::load(device, shader_dir, "postfx_combine", &[]);
        let tonemap_shader = Shader::load(device, shader_dir, "postfx_tonemap", &[]);

        let mut quad = ScreenQuad::new();
        quad.buffer(device);

        let mut manager = Self {
            config,
            threshold_shader,
            blit_shader,
            blur_shader,
            combine_shader,
            tonemap_shader,
            targets: Vec::new(),
            quad,
            width,
            height,
        };
        manager.allocate_targets(device)?;
        Ok(manager)
    }

    /// Sizes of the pingpong chain for a given full resolution
    ///
    /// The chain holds `num_down_samples + 1` targets starting at half
    /// resolution; each step halves except the last, which repeats the
    /// previous size so the smallest pair can ping-pong during blurring.
    pub fn chain_sizes(config: &PostFxConfig, width: u32, height: u32) -> Vec<(u32, u32)> {
        let mut sizes = Vec::with_capacity(config.num_down_samples + 1);
        let mut current = ((width / 2).max(1), (height / 2).max(1));
        sizes.push(current);
        for step in 1..=config.num_down_samples {
            if step < config.num_down_samples {
                current = ((current.0 / 2).max(1), (current.1 / 2).max(1));
            }
            sizes.push(current);
        }
        sizes
    }

    /// Current pingpong target sizes
    pub fn target_sizes(&self) -> Vec<(u32, u32)> {
        self.targets.iter().map(RenderTexture::texel_size).collect()
    }

    fn allocate_targets(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        for target in &mut self.targets {
            target.destroy(device);
        }
        self.targets.clear();

        for (index, (w, h)) in Self::chain_sizes(&self.config, self.width, self.height)
            .into_iter()
            .enumerate()
        {
            let mut target =
                RenderTexture::new(format!("postfx_pingpong_{index}"), w, h, TextureFormat::Rgba16F);
            target.buffer(device)?;
            self.targets.push(target);
        }
        Ok(())
    }

    /// Reallocate the chain for a new full resolution
    pub fn resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> GpuResult<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        self.allocate_targets(device)
    }

    /// Run the full post-processing sequence
    ///
    /// Reads `hdr`, additively blends the blurred bloom back onto it, then
    /// tonemaps onto the backbuffer.
    pub fn run(&mut self, device: &mut dyn GraphicsDevice, hdr: &mut RenderTexture) -> GpuResult<()> {
        if self.targets.is_empty() {
            return Ok(());
        }
        let last = self.targets.len() - 1;

        // Bright-pass: full resolution -> half
        self.targets[0].bind_framebuffer(device, 0)?;
        self.targets[0].attach_to_framebuffer(device, None, 0)?;
        device.clear(ClearFlags::COLOR, [0.0, 0.0, 0.0, 1.0]);
        self.threshold_shader.bind(device);
        self.threshold_shader
            .set_f32(device, "luminanceThreshold", self.config.bloom_threshold);
        hdr.bind(device, binding::POSTFX_SOURCE, true);
        self.threshold_shader
            .set_i32(device, "sourceImage", binding::POSTFX_SOURCE as i32);
        self.quad.draw(device);
        hdr.bind(device, binding::POSTFX_SOURCE, false);

        // Downsample blits toward the smallest target
        self.blit_shader.bind(device);
        self.blit_shader
            .set_i32(device, "sourceImage", binding::POSTFX_SOURCE as i32);
        for i in 1..=last {
            self.blit_pass(device, i - 1, i)?;
        }

        // Separable blur ping-pong across the smallest pair
        if last >= 1 {
            self.blur_shader.bind(device);
            self.blur_shader
                .set_i32(device, "sourceImage", binding::POSTFX_SOURCE as i32);
            for _ in 0..self.config.blur_passes {
                self.blur_pass(device, last, last - 1, [1.0, 0.0])?;
                self.blur_pass(device, last - 1, last, [0.0, 1.0])?;
            }
        }

        // Upsample back toward half resolution
        self.blit_shader.bind(device);
        for i in (0..last).rev() {
            self.blit_pass(device, i + 1, i)?;
        }

        // One additive blend of the bloom onto the original full-res image
        hdr.bind_framebuffer(device, 0)?;
        hdr.attach_to_framebuffer(device, None, 0)?;
        device.set_blend(BlendMode::Additive);
        self.combine_shader.bind(device);
        self.combine_shader
            .set_f32(device, "bloomIntensity", self.config.bloom_intensity);
        self.combine_shader
            .set_i32(device, "sourceImage", binding::POSTFX_SOURCE as i32);
        self.targets[0].bind(device, binding::POSTFX_SOURCE, true);
        self.quad.draw(device);
        self.targets[0].bind(device, binding::POSTFX_SOURCE, false);
        device.set_blend(BlendMode::Disabled);

        // Tonemap to the backbuffer
        device.bind_framebuffer(None);
        device.set_viewport(0, 0, self.width, self.height);
        self.tonemap_shader.bind(device);
        self.tonemap_shader
            .set_i32(device, "sourceImage", binding::POSTFX_SOURCE as i32);
        hdr.bind(device, binding::POSTFX_SOURCE, true);
        self.quad.draw(device);
        hdr.bind(device, binding::POSTFX_SOURCE, false);
        self.tonemap_shader.unbind(device);

        Ok(())
    }

    fn blit_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: usize,
        destination: usize,
    ) -> GpuResult<()> {
        self.targets[destination].bind_framebuffer(device, 0)?;
        self.targets[destination].attach_to_framebuffer(device, None, 0)?;
        self.targets[source].bind(device, binding::POSTFX_SOURCE, true);
        self.quad.draw(device);
        self.targets[source].bind(device, binding::POSTFX_SOURCE, false);
        Ok(())
    }

    fn blur_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: usize,
        destination: usize,
        direction: [f32; 2],
    ) -> GpuResult<()> {
        self.targets[destination].bind_framebuffer(device, 0)?;
        self.targets[destination].attach_to_framebuffer(device, None, 0)?;
        self.blur_shader.set_f32(device, "blurDirectionX", direction[0]);
        self.blur_shader.set_f32(device, "blurDirectionY", direction[1]);
        self.targets[source].bind(device, binding::POSTFX_SOURCE, true);
        self.quad.draw(device);
        self.targets[source].bind(device, binding::POSTFX_SOURCE, false);
        Ok(())
    }

    /// Release the chain, shaders, and quad
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for target in &mut self.targets {
            target.destroy(device);
        }
        self.targets.clear();
        self.threshold_shader.destroy(device);
        self.blit_shader.destroy(device);
        self.blur_shader.destroy(device);
        self.combine_shader.destroy(device);
        self.tonemap_shader.destroy(device);
        self.quad.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    fn config(num_down_samples: usize) -> PostFxConfig {
        PostFxConfig {
            num_down_samples,
            blur_passes: 2,
            bloom_threshold: 1.0,
            bloom_intensity: 0.5,
        }
    }

    #[test]
    fn test_two_downsamples_allocate_three_targets() {
        // Half, quarter, quarter: the last two iterations don't halve further
        let sizes = PostFxManager::chain_sizes(&config(2), 1280, 720);
        assert_eq!(sizes, vec![(640, 360), (320, 180), (320, 180)]);
    }

    #[test]
    fn test_chain_never_reaches_zero() {
        let sizes = PostFxManager::chain_sizes(&config(8), 16, 16);
        assert!(sizes.iter().all(|&(w, h)| w >= 1 && h >= 1));
    }

    #[test]
    fn test_run_blends_onto_hdr_exactly_once() {
        let mut device = RecordingDevice::new();
        let mut manager = PostFxManager::new(
            &mut device,
            Path::new("no_such_dir"),
            config(2),
            1280,
            720,
        )
        .unwrap();

        let mut hdr = RenderTexture::new("hdr", 1280, 720, TextureFormat::Rgba16F);
        hdr.buffer(&mut device).unwrap();

        device.clear_log();
        manager.run(&mut device, &mut hdr).unwrap();

        // Exactly one additive pass in the whole sequence
        assert_eq!(device.count_calls_containing("set_blend mode=Additive"), 1);
        // The sequence ends on the backbuffer
        assert_eq!(device.count_calls_containing("bind_framebuffer id=None"), 1);
    }

    #[test]
    fn test_pingpong_never_reads_and_writes_same_target() {
        let mut device = RecordingDevice::new();
        let mut manager = PostFxManager::new(
            &mut device,
            Path::new("no_such_dir"),
            config(3),
            1024,
            1024,
        )
        .unwrap();
        let mut hdr = RenderTexture::new("hdr", 1024, 1024, TextureFormat::Rgba16F);
        hdr.buffer(&mut device).unwrap();

        device.clear_log();
        manager.run(&mut device, &mut hdr).unwrap();

        // Replay the log: track the bound framebuffer and the texture bound
        // for reading; they must never belong to the same target
        let mut current_fb: Option<String> = None;
        let mut bound_sources: Vec<String> = Vec::new();
        for call in device.calls() {
            if let Some(rest) = call.strip_prefix("bind_framebuffer id=") {
                current_fb = Some(rest.to_string());
                bound_sources.clear();
            } else if call.starts_with("bind_texture unit=0")
                && !call.ends_with("id=None")
            {
                bound_sources.push(call.clone());
            } else if call.starts_with("draw_indexed") {
                if let Some(fb) = &current_fb {
                    for source in &bound_sources {
                        assert!(
                            !source_matches_framebuffer(source, fb, device.calls()),
                            "draw reads and writes the same target: fb={fb} source={source}"
                        );
                    }
                }
            }
        }
    }

    // Maps a bound source texture back to the framebuffer it belongs to by
    // scanning attach calls, then compares against the active framebuffer
    fn source_matches_framebuffer(source_bind: &str, active_fb: &str, calls: &[String]) -> bool {
        let Some(tex_id) = source_bind.split("id=Some(").nth(1).and_then(|s| s.strip_suffix(')'))
        else {
            return false;
        };
        let fb_id = active_fb.trim_start_matches("Some(").trim_end_matches(')');
        calls.iter().any(|c| {
            c.starts_with("attach_texture")
                && c.contains(&format!("fb={fb_id} "))
                && c.contains(&format!("tex={tex_id} "))
        })
    }
}
