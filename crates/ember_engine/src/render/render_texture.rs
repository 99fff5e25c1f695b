//! Framebuffer-backed texture used as both read source and write target
//!
//! A render texture pairs a [`Texture`] with a framebuffer name and
//! attachment configuration. The GPU texture and framebuffer must both exist
//! (via [`RenderTexture::buffer`]) before any attach or draw operation; the
//! methods here enforce that with errors rather than debug assertions.

use super::texture::Texture;
use crate::gpu::{
    AttachmentPoint, CubeFace, FilterMode, FramebufferId, FramebufferStatus, GpuError, GpuResult,
    GraphicsDevice, RenderbufferId, TextureFormat, TextureTarget, WrapMode,
};

/// A texture renderable via an owned framebuffer
#[derive(Debug)]
pub struct RenderTexture {
    texture: Texture,
    framebuffer: Option<FramebufferId>,
    depth: Option<RenderbufferId>,
    attachment: AttachmentPoint,
}

impl RenderTexture {
    /// Create a 2D render target of the given size and format
    pub fn new(name: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            texture: Texture::empty(name, width, height, format),
            framebuffer: None,
            depth: None,
            attachment: AttachmentPoint::Color(0),
        }
    }

    /// Create a cube-map render target; six faces share one texture and one
    /// framebuffer name
    pub fn new_cube(name: impl Into<String>, size: u32, format: TextureFormat) -> Self {
        Self {
            texture: Texture::empty_cube(name, size, format),
            framebuffer: None,
            depth: None,
            attachment: AttachmentPoint::Color(0),
        }
    }

    /// Change the attachment point this target attaches at
    pub fn set_attachment(&mut self, attachment: AttachmentPoint) {
        self.attachment = attachment;
    }

    /// Attachment point this target attaches at
    pub fn attachment(&self) -> AttachmentPoint {
        self.attachment
    }

    /// The wrapped texture (for sampling binds)
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Mutable access to the wrapped texture
    pub fn texture_mut(&mut self) -> &mut Texture {
        &mut self.texture
    }

    /// Width and height in texels
    pub fn texel_size(&self) -> (u32, u32) {
        self.texture.texel_size()
    }

    /// Override filtering before buffering
    pub fn set_filtering(&mut self, min: FilterMode, mag: FilterMode) {
        self.texture.set_filtering(min, mag);
    }

    /// Override wrap mode before buffering
    pub fn set_wrap(&mut self, wrap: WrapMode) {
        self.texture.set_wrap(wrap);
    }

    /// Resize the target; the next `buffer` reallocates storage once
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.texture.set_resolution(width, height);
    }

    /// Allocate the GPU texture storage and the framebuffer name
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        self.texture.buffer(device)?;
        if self.framebuffer.is_none() {
            self.framebuffer = Some(device.create_framebuffer());
        }
        Ok(())
    }

    /// Attach a depth renderbuffer sized to the current resolution
    pub fn attach_depth_scratch(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        let framebuffer = self.require_framebuffer()?;
        let (width, height) = self.texture.texel_size();
        let renderbuffer = match self.depth {
            Some(existing) => existing,
            None => {
                let created = device.create_renderbuffer(TextureFormat::Depth24, width, height);
                self.depth = Some(created);
                created
            }
        };
        device.attach_renderbuffer(framebuffer, AttachmentPoint::Depth, renderbuffer)
    }

    /// Bind this target's framebuffer for rendering and set the viewport to
    /// the given mip level's extent
    pub fn bind_framebuffer(&self, device: &mut dyn GraphicsDevice, mip_level: u32) -> GpuResult<()> {
        let framebuffer = self.require_framebuffer()?;
        device.bind_framebuffer(Some(framebuffer));
        let (width, height) = self.texture.texel_size();
        let mip_w = (width >> mip_level).max(1);
        let mip_h = (height >> mip_level).max(1);
        device.set_viewport(0, 0, mip_w, mip_h);
        Ok(())
    }

    /// Attach the texture at the configured attachment point
    ///
    /// `face` selects one cube face for cube targets (`None` for 2D);
    /// `mip_level` permits rendering into a specific mip, used by
    /// filtered-importance-sampling passes.
    pub fn attach_to_framebuffer(
        &self,
        device: &mut dyn GraphicsDevice,
        face: Option<CubeFace>,
        mip_level: u32,
    ) -> GpuResult<()> {
        let framebuffer = self.require_framebuffer()?;
        let Some(texture) = self.texture.gpu_texture() else {
            return Err(GpuError::UnknownHandle("texture"));
        };
        if self.texture.target() == TextureTarget::CubeMap && face.is_none() {
            log::warn!(
                "cube render texture '{}' attached without a face selector",
                self.texture.name()
            );
        }
        device.attach_texture(framebuffer, self.attachment, texture, face, mip_level)?;
        device.set_draw_buffers(framebuffer, &[self.attachment])?;
        device.set_read_buffer(framebuffer, Some(self.attachment))?;

        let status = device.framebuffer_status(framebuffer);
        if status != FramebufferStatus::Complete {
            return Err(GpuError::FramebufferIncomplete(status));
        }
        Ok(())
    }

    /// Bind the color texture for sampling at a unit
    pub fn bind(&self, device: &mut dyn GraphicsDevice, unit: u32, enable: bool) {
        self.texture.bind(device, unit, enable);
    }

    /// Release framebuffer, depth scratch, and texture; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(framebuffer) = self.framebuffer.take() {
            device.destroy_framebuffer(framebuffer);
        }
        if let Some(depth) = self.depth.take() {
            device.destroy_renderbuffer(depth);
        }
        self.texture.destroy(device);
    }

    fn require_framebuffer(&self) -> GpuResult<FramebufferId> {
        self.framebuffer.ok_or(GpuError::UnknownHandle("framebuffer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_attach_before_buffer_is_an_error() {
        let mut device = RecordingDevice::new();
        let target = RenderTexture::new("hdr", 640, 360, TextureFormat::Rgba16F);
        let result = target.attach_to_framebuffer(&mut device, None, 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_buffer_then_attach_reaches_completeness() {
        let mut device = RecordingDevice::new();
        let mut target = RenderTexture::new("hdr", 640, 360, TextureFormat::Rgba16F);
        target.buffer(&mut device).unwrap();
        target.attach_to_framebuffer(&mut device, None, 0).unwrap();
        assert_eq!(device.count_calls_containing("attach_texture"), 1);
        assert_eq!(device.count_calls_containing("set_draw_buffers"), 1);
    }

    #[test]
    fn test_cube_faces_share_one_texture_and_framebuffer() {
        let mut device = RecordingDevice::new();
        let mut cube = RenderTexture::new_cube("env", 256, TextureFormat::Rgba16F);
        cube.buffer(&mut device).unwrap();

        for face in CubeFace::ALL {
            cube.attach_to_framebuffer(&mut device, Some(face), 0).unwrap();
        }

        assert_eq!(device.count_calls_containing("create_texture"), 1);
        assert_eq!(device.count_calls_containing("create_framebuffer"), 1);
        assert_eq!(device.count_calls_containing("attach_texture"), 6);
    }

    #[test]
    fn test_mip_level_viewport_halves() {
        let mut device = RecordingDevice::new();
        let mut target = RenderTexture::new("pmrem", 256, 256, TextureFormat::Rgba16F);
        target.buffer(&mut device).unwrap();
        target.bind_framebuffer(&mut device, 2).unwrap();
        assert_eq!(device.count_calls_containing("set_viewport 0,0 64x64"), 1);
    }

    #[test]
    fn test_destroy_releases_all_names_once() {
        let mut device = RecordingDevice::new();
        let mut target = RenderTexture::new("hdr", 64, 64, TextureFormat::Rgba16F);
        target.buffer(&mut device).unwrap();
        target.attach_depth_scratch(&mut device).unwrap();

        target.destroy(&mut device);
        target.destroy(&mut device);

        assert_eq!(device.count_calls_containing("destroy_framebuffer"), 1);
        assert_eq!(device.count_calls_containing("destroy_renderbuffer"), 1);
    }
}
