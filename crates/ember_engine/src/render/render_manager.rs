//! Per-frame deferred rendering
//!
//! Frame state machine: Clear → geometry pass over the material→mesh index
//! (shader and material state bound once per material, then every mesh using
//! that material draws inside the bind scope) → deferred lighting resolve
//! reading the G-buffer at its fixed units into the HDR target → post-FX →
//! present. Meshes are never drawn outside their owning material's bind
//! scope; that grouping is what amortizes shader/texture binds.

use super::binding;
use super::mesh::ScreenQuad;
use super::postfx::PostFxManager;
use super::render_texture::RenderTexture;
use super::shader::Shader;
use crate::config::EngineConfig;
use crate::foundation::math::{utils, Vec3};
use crate::gpu::{
    AttachmentPoint, ClearFlags, FramebufferId, FramebufferStatus, GpuError, GpuResult,
    GraphicsDevice, RenderbufferId, TextureFormat,
};
use crate::render::texture::Texture;
use crate::scene::scene_manager::RenderView;
use std::path::{Path, PathBuf};

/// The deferred G-buffer: one framebuffer, four color targets, depth scratch
pub struct GBuffer {
    framebuffer: Option<FramebufferId>,
    depth: Option<RenderbufferId>,
    position: Texture,
    normal: Texture,
    albedo: Texture,
    emissive: Texture,
    width: u32,
    height: u32,
}

impl GBuffer {
    /// Create an unallocated G-buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: None,
            depth: None,
            position: Texture::empty("gbuffer_position", width, height, TextureFormat::Rgba16F),
            normal: Texture::empty("gbuffer_normal", width, height, TextureFormat::Rgba16F),
            albedo: Texture::empty("gbuffer_albedo", width, height, TextureFormat::Rgba8),
            emissive: Texture::empty("gbuffer_emissive", width, height, TextureFormat::Rgba16F),
            width,
            height,
        }
    }

    /// Allocate targets and wire the framebuffer attachments
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        self.position.buffer(device)?;
        self.normal.buffer(device)?;
        self.albedo.buffer(device)?;
        self.emissive.buffer(device)?;

        let framebuffer = match self.framebuffer {
            Some(existing) => existing,
            None => {
                let created = device.create_framebuffer();
                self.framebuffer = Some(created);
                created
            }
        };

        let attachments = [
            (AttachmentPoint::Color(0), &self.position),
            (AttachmentPoint::Color(1), &self.normal),
            (AttachmentPoint::Color(2), &self.albedo),
            (AttachmentPoint::Color(3), &self.emissive),
        ];
        for (attachment, texture) in attachments {
            let Some(id) = texture.gpu_texture() else {
                return Err(GpuError::UnknownHandle("texture"));
            };
            device.attach_texture(framebuffer, attachment, id, None, 0)?;
        }

        let depth = match self.depth {
            Some(existing) => existing,
            None => {
                let created =
                    device.create_renderbuffer(TextureFormat::Depth24, self.width, self.height);
                self.depth = Some(created);
                created
            }
        };
        device.attach_renderbuffer(framebuffer, AttachmentPoint::Depth, depth)?;
        device.set_draw_buffers(
            framebuffer,
            &[
                AttachmentPoint::Color(0),
                AttachmentPoint::Color(1),
                AttachmentPoint::Color(2),
                AttachmentPoint::Color(3),
            ],
        )?;

        let status = device.framebuffer_status(framebuffer);
        if status != FramebufferStatus::Complete {
            return Err(GpuError::FramebufferIncomplete(status));
        }
        Ok(())
    }

    /// Bind for the geometry pass
    pub fn bind_for_writing(&self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        let framebuffer = self.framebuffer.ok_or(GpuError::UnknownHandle("framebuffer"))?;
        device.bind_framebuffer(Some(framebuffer));
        device.set_viewport(0, 0, self.width, self.height);
        Ok(())
    }

    /// Bind every target at its contractual unit for the lighting resolve
    pub fn bind_for_reading(&self, device: &mut dyn GraphicsDevice) {
        self.position.bind(device, binding::gbuffer::POSITION, true);
        self.normal.bind(device, binding::gbuffer::NORMAL, true);
        self.albedo.bind(device, binding::gbuffer::ALBEDO, true);
        self.emissive.bind(device, binding::gbuffer::EMISSIVE, true);
    }

    /// Detach every target
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        self.position.bind(device, binding::gbuffer::POSITION, false);
        self.normal.bind(device, binding::gbuffer::NORMAL, false);
        self.albedo.bind(device, binding::gbuffer::ALBEDO, false);
        self.emissive.bind(device, binding::gbuffer::EMISSIVE, false);
    }

    /// Release all GPU names; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(framebuffer) = self.framebuffer.take() {
            device.destroy_framebuffer(framebuffer);
        }
        if let Some(depth) = self.depth.take() {
            device.destroy_renderbuffer(depth);
        }
        self.position.destroy(device);
        self.normal.destroy(device);
        self.albedo.destroy(device);
        self.emissive.destroy(device);
    }
}

/// Owns the frame pipeline: G-buffer, HDR target, lighting, post-FX
pub struct RenderManager {
    width: u32,
    height: u32,
    clear_color: [f32; 4],
    shader_dir: PathBuf,
    gbuffer: GBuffer,
    hdr_target: RenderTexture,
    lighting_shader: Shader,
    postfx: PostFxManager,
    quad: ScreenQuad,
}

impl RenderManager {
    /// Build the frame pipeline from engine configuration
    pub fn new(device: &mut dyn GraphicsDevice, config: &EngineConfig) -> GpuResult<Self> {
        let width = config.window.width;
        let height = config.window.height;
        let shader_dir = PathBuf::from(&config.paths.shader_dir);

        let mut gbuffer = GBuffer::new(width, height);
        gbuffer.buffer(device)?;

        let mut hdr_target = RenderTexture::new("scene_hdr", width, height, TextureFormat::Rgba16F);
        hdr_target.buffer(device)?;
        hdr_target.attach_depth_scratch(device)?;

        let lighting_shader = Shader::load(device, &shader_dir, "deferred_lighting", &[]);

        let postfx = PostFxManager::new(
            device,
            Path::new(&config.paths.shader_dir),
            config.post_fx.clone(),
            width,
            height,
        )?;

        let mut quad = ScreenQuad::new();
        quad.buffer(device);

        Ok(Self {
            width,
            height,
            clear_color: [0.02, 0.02, 0.03, 1.0],
            shader_dir,
            gbuffer,
            hdr_target,
            lighting_shader,
            postfx,
            quad,
        })
    }

    /// Current render resolution
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The post-FX pipeline
    pub fn postfx(&self) -> &PostFxManager {
        &self.postfx
    }

    /// Shader directory this manager loads passes from
    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }

    /// Reallocate every resolution-dependent target
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

        self.gbuffer.destroy(device);
        self.gbuffer = GBuffer::new(width, height);
        self.gbuffer.buffer(device)?;

        self.hdr_target.set_resolution(width, height);
        self.hdr_target.buffer(device)?;
        self.hdr_target.attach_depth_scratch(device)?;

        self.postfx.resize(device, width, height)
    }

    /// Render one frame and present it
    pub fn render_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        view: RenderView<'_>,
    ) -> GpuResult<()> {
        let Some(camera) = view.scene.main_camera() else {
            log::warn!("no main camera; frame skipped");
            device.present();
            return Ok(());
        };

        let aspect = self.width as f32 / self.height.max(1) as f32;
        let view_matrix = camera.view_matrix(&view.scene.transforms);
        let projection = camera.projection(aspect);
        let camera_world = view.scene.transforms.world(camera.transform());
        let camera_position = utils::translation_of(&camera_world);

        let (key_direction, key_color) = match view.scene.key_light() {
            Some(light) => (
                light.direction(&view.scene.transforms),
                light.color * light.intensity,
            ),
            None => (Vec3::new(0.0, -1.0, 0.0), Vec3::zeros()),
        };
        let ambient = match view.scene.ambient_light() {
            Some(light) => light.color * light.intensity,
            None => Vec3::zeros(),
        };

        // Geometry pass
        self.gbuffer.bind_for_writing(device)?;
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, self.clear_color);

        for (material_index, mesh_indices) in view.material_meshes.iter().enumerate() {
            if mesh_indices.is_empty() {
                continue;
            }
            let Some(material) = view.materials.get(material_index) else {
                continue;
            };
            let Some(shader) = view.shaders.get_mut(material.shader()) else {
                log::warn!("material '{}' has no shader; batch skipped", material.name());
                continue;
            };

            shader.bind(device);
            material.bind_all_textures(device, view.textures);

            // Camera-independent uniforms once per material
            shader.set_mat4(device, "viewMatrix", &view_matrix);
            shader.set_vec3(device, "keyLightDirection", &key_direction);
            shader.set_vec3(device, "keyLightColor", &key_color);
            shader.set_vec3(device, "ambientColor", &ambient);
            material.upload_properties(device, shader);

            for &mesh_index in mesh_indices {
                let Some(mesh) = view.scene.meshes().get(mesh_index) else {
                    continue;
                };
                mesh.bind(device);

                let model = view.scene.transforms.world(mesh.transform());
                let model_view = view_matrix * model;
                let model_view_projection = projection * model_view;
                shader.set_mat4(device, "modelMatrix", &model);
                shader.set_mat4(device, "modelView", &model_view);
                shader.set_mat4(device, "modelViewProjection", &model_view_projection);

                mesh.draw(device);
                mesh.unbind(device);
            }

            material.unbind_all_textures(device, view.textures);
            shader.unbind(device);
        }

        // Deferred lighting resolve into the HDR target
        self.hdr_target.bind_framebuffer(device, 0)?;
        self.hdr_target.attach_to_framebuffer(device, None, 0)?;
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, [0.0, 0.0, 0.0, 1.0]);

        self.lighting_shader.bind(device);
        self.gbuffer.bind_for_reading(device);
        self.lighting_shader
            .set_vec3(device, "keyLightDirection", &key_direction);
        self.lighting_shader.set_vec3(device, "keyLightColor", &key_color);
        self.lighting_shader.set_vec3(device, "ambientColor", &ambient);
        self.lighting_shader
            .set_vec3(device, "cameraPosition", &camera_position);
        self.quad.draw(device);
        self.gbuffer.unbind(device);
        self.lighting_shader.unbind(device);

        // Post-processing and present
        self.postfx.run(device, &mut self.hdr_target)?;
        device.present();
        Ok(())
    }

    /// Release every owned GPU resource; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.gbuffer.destroy(device);
        self.hdr_target.destroy(device);
        self.lighting_shader.destroy(device);
        self.postfx.destroy(device);
        self.quad.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;
    use crate::scene::document::{DocMaterial, DocMesh, SceneDocument};
    use crate::scene::scene_manager::SceneManager;

    fn document_with_meshes(material_names: &[&str], meshes: &[(&str, usize)]) -> SceneDocument {
        let mut document = SceneDocument::new("frame_test");
        document.materials = material_names
            .iter()
            .map(|name| DocMaterial::named(*name, [1.0, 1.0, 1.0, 1.0]))
            .collect();
        document.meshes = meshes
            .iter()
            .map(|(name, material_index)| DocMesh {
                name: (*name).to_string(),
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                uv_channels: vec![vec![[0.0, 0.0]; 3]],
                indices: vec![0, 1, 2],
                node: None,
                material_index: *material_index,
                ..Default::default()
            })
            .collect();
        document
    }

    #[test]
    fn test_meshes_draw_inside_material_bind_scope() {
        let mut device = RecordingDevice::new();
        let config = EngineConfig::new();
        let mut scene_manager = SceneManager::new(&mut device, &config);
        let mut render_manager = RenderManager::new(&mut device, &config).unwrap();

        let document = document_with_meshes(
            &["A_lambert", "B_lambert"],
            &[("m0", 0), ("m1", 0), ("m2", 1)],
        );
        scene_manager.import_document(&mut device, &document);

        device.clear_log();
        let view = scene_manager.render_view().unwrap();
        render_manager.render_frame(&mut device, view).unwrap();

        // Three scene meshes drawn, plus resolve + postfx fullscreen draws
        assert!(device.draw_call_count() > 3);
        assert_eq!(device.present_count(), 1);

        // Replay: every mesh draw happens with a program bound
        let mut program_bound = false;
        let mut geometry_draws = 0;
        for call in device.calls() {
            if call.starts_with("use_program id=Some") {
                program_bound = true;
            } else if call.starts_with("use_program id=None") {
                program_bound = false;
            } else if call.starts_with("draw_indexed count=3") {
                assert!(program_bound, "mesh drawn outside a shader bind scope");
                geometry_draws += 1;
            }
        }
        assert_eq!(geometry_draws, 3);
    }

    #[test]
    fn test_frame_without_scene_meshes_still_presents() {
        let mut device = RecordingDevice::new();
        let config = EngineConfig::new();
        let mut scene_manager = SceneManager::new(&mut device, &config);
        let mut render_manager = RenderManager::new(&mut device, &config).unwrap();

        scene_manager.import_document(&mut device, &SceneDocument::new("empty"));
        let view = scene_manager.render_view().unwrap();
        render_manager.render_frame(&mut device, view).unwrap();
        assert_eq!(device.present_count(), 1);
    }

    #[test]
    fn test_gbuffer_reads_at_contract_units() {
        let mut device = RecordingDevice::new();
        let config = EngineConfig::new();
        let mut scene_manager = SceneManager::new(&mut device, &config);
        let mut render_manager = RenderManager::new(&mut device, &config).unwrap();
        scene_manager.import_document(&mut device, &SceneDocument::new("units"));

        device.clear_log();
        let view = scene_manager.render_view().unwrap();
        render_manager.render_frame(&mut device, view).unwrap();

        for unit in [
            binding::gbuffer::POSITION,
            binding::gbuffer::NORMAL,
            binding::gbuffer::ALBEDO,
            binding::gbuffer::EMISSIVE,
        ] {
            assert!(
                device.count_calls_containing(&format!("bind_texture unit={unit} ")) >= 1,
                "gbuffer unit {unit} never bound"
            );
        }
    }

    #[test]
    fn test_resize_reallocates_targets() {
        let mut device = RecordingDevice::new();
        let config = EngineConfig::new();
        let mut render_manager = RenderManager::new(&mut device, &config).unwrap();

        device.clear_log();
        render_manager.resize(&mut device, 1920, 1080).unwrap();
        assert!(device.count_calls_containing("alloc_texture_storage") > 0);
        assert_eq!(render_manager.resolution(), (1920, 1080));

        // Same size again is a no-op
        device.clear_log();
        render_manager.resize(&mut device, 1920, 1080).unwrap();
        assert_eq!(device.count_calls_containing("alloc_texture_storage"), 0);
    }

    #[test]
    fn test_destroy_twice_is_safe() {
        let mut device = RecordingDevice::new();
        let config = EngineConfig::new();
        let mut render_manager = RenderManager::new(&mut device, &config).unwrap();
        render_manager.destroy(&mut device);
        render_manager.destroy(&mut device);
    }
}
