//! Call-recording sentinel implementation of [`GraphicsDevice`]
//!
//! Assigns handles, tracks which are alive, and appends a line per call to an
//! inspectable log. Tests assert on the log instead of a live GPU; headless
//! runs (CI, the demo app) drive the whole engine through it.

use super::{
    AttachmentPoint, BlendMode, BufferId, ClearFlags, CubeFace, FilterMode, FramebufferId,
    FramebufferStatus, GpuError, GpuResult, GraphicsDevice, ProgramId, RenderbufferId, SamplerId,
    ShaderStage, TextureFormat, TextureId, TextureTarget, UniformLocation, WrapMode,
};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use std::collections::{HashMap, HashSet};

/// Sentinel GPU device that records every call it receives
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u64,
    calls: Vec<String>,

    alive_textures: HashSet<u64>,
    alive_samplers: HashSet<u64>,
    alive_framebuffers: HashSet<u64>,
    alive_renderbuffers: HashSet<u64>,
    alive_buffers: HashSet<u64>,
    alive_programs: HashSet<u64>,

    destroy_counts: HashMap<(&'static str, u64), u32>,
    uniforms: HashMap<u64, HashMap<String, u32>>,
    fail_compile_substrings: Vec<String>,

    draw_calls: u32,
    presents: u32,
}

impl RecordingDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `compile_program` to fail for any name containing `fragment`
    pub fn fail_compiles_matching(&mut self, fragment: impl Into<String>) {
        self.fail_compile_substrings.push(fragment.into());
    }

    /// Every recorded call, in order
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Number of recorded calls containing the given fragment
    pub fn count_calls_containing(&self, fragment: &str) -> usize {
        self.calls.iter().filter(|c| c.contains(fragment)).count()
    }

    /// How many times a destroy was issued for one resource
    pub fn destroy_count(&self, kind: &'static str, raw_id: u64) -> u32 {
        self.destroy_counts.get(&(kind, raw_id)).copied().unwrap_or(0)
    }

    /// Total indexed draw calls issued
    pub fn draw_call_count(&self) -> u32 {
        self.draw_calls
    }

    /// Total presents issued
    pub fn present_count(&self) -> u32 {
        self.presents
    }

    /// Number of texture names currently alive
    pub fn alive_texture_count(&self) -> usize {
        self.alive_textures.len()
    }

    /// Number of program names currently alive
    pub fn alive_program_count(&self) -> usize {
        self.alive_programs.len()
    }

    /// Forget recorded calls (alive-resource tracking is kept)
    pub fn clear_log(&mut self) {
        self.calls.clear();
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, line: String) {
        self.calls.push(line);
    }

    fn note_destroy(&mut self, kind: &'static str, raw_id: u64, was_alive: bool) {
        *self.destroy_counts.entry((kind, raw_id)).or_insert(0) += 1;
        if !was_alive {
            log::warn!("destroy of dead {kind} handle {raw_id}");
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_texture(&mut self, target: TextureTarget) -> TextureId {
        let id = self.alloc_id();
        self.alive_textures.insert(id);
        self.record(format!("create_texture id={id} target={target:?}"));
        TextureId(id)
    }

    fn alloc_texture_storage(
        &mut self,
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> GpuResult<()> {
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!(
            "alloc_texture_storage id={} format={format:?} {width}x{height} mips={mip_levels}",
            texture.0
        ));
        Ok(())
    }

    fn upload_texture_pixels(
        &mut self,
        texture: TextureId,
        face: Option<CubeFace>,
        mip_level: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GpuResult<()> {
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!(
            "upload_texture_pixels id={} face={face:?} mip={mip_level} {width}x{height} bytes={}",
            texture.0,
            pixels.len()
        ));
        Ok(())
    }

    fn generate_mipmaps(&mut self, texture: TextureId) -> GpuResult<()> {
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!("generate_mipmaps id={}", texture.0));
        Ok(())
    }

    fn set_texture_filtering(
        &mut self,
        texture: TextureId,
        min: FilterMode,
        mag: FilterMode,
    ) -> GpuResult<()> {
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!(
            "set_texture_filtering id={} min={min:?} mag={mag:?}",
            texture.0
        ));
        Ok(())
    }

    fn set_texture_wrap(&mut self, texture: TextureId, wrap: WrapMode) -> GpuResult<()> {
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!("set_texture_wrap id={} wrap={wrap:?}", texture.0));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<TextureId>) {
        self.record(format!(
            "bind_texture unit={unit} target={target:?} id={:?}",
            texture.map(|t| t.0)
        ));
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        let was_alive = self.alive_textures.remove(&texture.0);
        self.note_destroy("texture", texture.0, was_alive);
        self.record(format!("destroy_texture id={}", texture.0));
    }

    fn create_sampler(&mut self) -> SamplerId {
        let id = self.alloc_id();
        self.alive_samplers.insert(id);
        self.record(format!("create_sampler id={id}"));
        SamplerId(id)
    }

    fn set_sampler_filtering(
        &mut self,
        sampler: SamplerId,
        min: FilterMode,
        mag: FilterMode,
    ) -> GpuResult<()> {
        if !self.alive_samplers.contains(&sampler.0) {
            return Err(GpuError::UnknownHandle("sampler"));
        }
        self.record(format!(
            "set_sampler_filtering id={} min={min:?} mag={mag:?}",
            sampler.0
        ));
        Ok(())
    }

    fn set_sampler_wrap(&mut self, sampler: SamplerId, wrap: WrapMode) -> GpuResult<()> {
        if !self.alive_samplers.contains(&sampler.0) {
            return Err(GpuError::UnknownHandle("sampler"));
        }
        self.record(format!("set_sampler_wrap id={} wrap={wrap:?}", sampler.0));
        Ok(())
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<SamplerId>) {
        self.record(format!(
            "bind_sampler unit={unit} id={:?}",
            sampler.map(|s| s.0)
        ));
    }

    fn destroy_sampler(&mut self, sampler: SamplerId) {
        let was_alive = self.alive_samplers.remove(&sampler.0);
        self.note_destroy("sampler", sampler.0, was_alive);
        self.record(format!("destroy_sampler id={}", sampler.0));
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = self.alloc_id();
        self.alive_framebuffers.insert(id);
        self.record(format!("create_framebuffer id={id}"));
        FramebufferId(id)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.record(format!(
            "bind_framebuffer id={:?}",
            framebuffer.map(|f| f.0)
        ));
    }

    fn attach_texture(
        &mut self,
        framebuffer: FramebufferId,
        attachment: AttachmentPoint,
        texture: TextureId,
        face: Option<CubeFace>,
        mip_level: u32,
    ) -> GpuResult<()> {
        if !self.alive_framebuffers.contains(&framebuffer.0) {
            return Err(GpuError::UnknownHandle("framebuffer"));
        }
        if !self.alive_textures.contains(&texture.0) {
            return Err(GpuError::UnknownHandle("texture"));
        }
        self.record(format!(
            "attach_texture fb={} attachment={attachment:?} tex={} face={face:?} mip={mip_level}",
            framebuffer.0, texture.0
        ));
        Ok(())
    }

    fn create_renderbuffer(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> RenderbufferId {
        let id = self.alloc_id();
        self.alive_renderbuffers.insert(id);
        self.record(format!(
            "create_renderbuffer id={id} format={format:?} {width}x{height}"
        ));
        RenderbufferId(id)
    }

    fn attach_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        attachment: AttachmentPoint,
        renderbuffer: RenderbufferId,
    ) -> GpuResult<()> {
        if !self.alive_framebuffers.contains(&framebuffer.0) {
            return Err(GpuError::UnknownHandle("framebuffer"));
        }
        if !self.alive_renderbuffers.contains(&renderbuffer.0) {
            return Err(GpuError::UnknownHandle("renderbuffer"));
        }
        self.record(format!(
            "attach_renderbuffer fb={} attachment={attachment:?} rb={}",
            framebuffer.0, renderbuffer.0
        ));
        Ok(())
    }

    fn set_draw_buffers(
        &mut self,
        framebuffer: FramebufferId,
        buffers: &[AttachmentPoint],
    ) -> GpuResult<()> {
        if !self.alive_framebuffers.contains(&framebuffer.0) {
            return Err(GpuError::UnknownHandle("framebuffer"));
        }
        self.record(format!(
            "set_draw_buffers fb={} buffers={buffers:?}",
            framebuffer.0
        ));
        Ok(())
    }

    fn set_read_buffer(
        &mut self,
        framebuffer: FramebufferId,
        buffer: Option<AttachmentPoint>,
    ) -> GpuResult<()> {
        if !self.alive_framebuffers.contains(&framebuffer.0) {
            return Err(GpuError::UnknownHandle("framebuffer"));
        }
        self.record(format!(
            "set_read_buffer fb={} buffer={buffer:?}",
            framebuffer.0
        ));
        Ok(())
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        if self.alive_framebuffers.contains(&framebuffer.0) {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::MissingAttachment
        }
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        let was_alive = self.alive_framebuffers.remove(&framebuffer.0);
        self.note_destroy("framebuffer", framebuffer.0, was_alive);
        self.record(format!("destroy_framebuffer id={}", framebuffer.0));
    }

    fn destroy_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        let was_alive = self.alive_renderbuffers.remove(&renderbuffer.0);
        self.note_destroy("renderbuffer", renderbuffer.0, was_alive);
        self.record(format!("destroy_renderbuffer id={}", renderbuffer.0));
    }

    fn compile_program(
        &mut self,
        name: &str,
        stages: &[(ShaderStage, &str)],
    ) -> GpuResult<ProgramId> {
        if self
            .fail_compile_substrings
            .iter()
            .any(|s| name.contains(s.as_str()))
        {
            self.record(format!("compile_program name={name} FAILED"));
            return Err(GpuError::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: format!("forced failure for '{name}'"),
            });
        }
        let id = self.alloc_id();
        self.alive_programs.insert(id);
        self.uniforms.insert(id, HashMap::new());
        let stage_names: Vec<_> = stages.iter().map(|(stage, _)| stage).collect();
        self.record(format!(
            "compile_program name={name} id={id} stages={stage_names:?}"
        ));
        Ok(ProgramId(id))
    }

    fn validate_program(&mut self, program: ProgramId) -> GpuResult<()> {
        if !self.alive_programs.contains(&program.0) {
            return Err(GpuError::UnknownHandle("program"));
        }
        self.record(format!("validate_program id={}", program.0));
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.record(format!("use_program id={:?}", program.map(|p| p.0)));
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let slots = self.uniforms.get_mut(&program.0)?;
        let next = slots.len() as u32;
        let location = *slots.entry(name.to_string()).or_insert(next);
        Some(UniformLocation(location))
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, _value: &Mat4) {
        self.record(format!("set_uniform_mat4 loc={}", location.0));
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: &Vec4) {
        self.record(format!(
            "set_uniform_vec4 loc={} value=[{}, {}, {}, {}]",
            location.0, value.x, value.y, value.z, value.w
        ));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3) {
        self.record(format!(
            "set_uniform_vec3 loc={} value=[{}, {}, {}]",
            location.0, value.x, value.y, value.z
        ));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.record(format!("set_uniform_f32 loc={} value={value}", location.0));
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.record(format!("set_uniform_i32 loc={} value={value}", location.0));
    }

    fn destroy_program(&mut self, program: ProgramId) {
        let was_alive = self.alive_programs.remove(&program.0);
        self.uniforms.remove(&program.0);
        self.note_destroy("program", program.0, was_alive);
        self.record(format!("destroy_program id={}", program.0));
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> BufferId {
        let id = self.alloc_id();
        self.alive_buffers.insert(id);
        self.record(format!("create_vertex_buffer id={id} bytes={}", data.len()));
        BufferId(id)
    }

    fn create_index_buffer(&mut self, data: &[u32]) -> BufferId {
        let id = self.alloc_id();
        self.alive_buffers.insert(id);
        self.record(format!(
            "create_index_buffer id={id} indices={}",
            data.len()
        ));
        BufferId(id)
    }

    fn bind_geometry(&mut self, vertex: Option<BufferId>, index: Option<BufferId>) {
        self.record(format!(
            "bind_geometry vb={:?} ib={:?}",
            vertex.map(|b| b.0),
            index.map(|b| b.0)
        ));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.draw_calls += 1;
        self.record(format!("draw_indexed count={index_count}"));
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        let was_alive = self.alive_buffers.remove(&buffer.0);
        self.note_destroy("buffer", buffer.0, was_alive);
        self.record(format!("destroy_buffer id={}", buffer.0));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record(format!("set_viewport {x},{y} {width}x{height}"));
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.record(format!("set_blend mode={mode:?}"));
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]) {
        self.record(format!("clear flags={flags:?} color={color:?}"));
    }

    fn present(&mut self) {
        self.presents += 1;
        self.record("present".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut device = RecordingDevice::new();
        let a = device.create_texture(TextureTarget::Tex2D);
        let b = device.create_texture(TextureTarget::Tex2D);
        assert_ne!(a, b);
        assert_eq!(device.alive_texture_count(), 2);
    }

    #[test]
    fn test_destroy_tracking() {
        let mut device = RecordingDevice::new();
        let tex = device.create_texture(TextureTarget::Tex2D);
        device.destroy_texture(tex);
        device.destroy_texture(tex);
        assert_eq!(device.destroy_count("texture", tex.0), 2);
        assert_eq!(device.alive_texture_count(), 0);
    }

    #[test]
    fn test_forced_compile_failure() {
        let mut device = RecordingDevice::new();
        device.fail_compiles_matching("lambert");

        let failed = device.compile_program("lambert", &[(ShaderStage::Vertex, "void main(){}")]);
        assert!(failed.is_err());

        let ok = device.compile_program("error", &[(ShaderStage::Vertex, "void main(){}")]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_uniform_locations_stable_per_name() {
        let mut device = RecordingDevice::new();
        let program = device
            .compile_program("basic", &[(ShaderStage::Vertex, "")])
            .unwrap();
        let a = device.uniform_location(program, "uModel").unwrap();
        let b = device.uniform_location(program, "uView").unwrap();
        let a_again = device.uniform_location(program, "uModel").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }
}
