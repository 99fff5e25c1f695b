//! GPU resource-binding surface
//!
//! The render core never talks to a graphics API directly; it drives this
//! trait. A production backend implements it over the platform's GL context;
//! [`RecordingDevice`] implements it as a call-recording sentinel for tests
//! and headless runs.
//!
//! Handles are opaque, device-assigned names. The engine-side resource
//! wrappers ([`crate::render::Texture`], [`crate::render::Shader`], ...) own
//! exactly one handle each and release it exactly once.

mod recording;

pub use recording::RecordingDevice;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use thiserror::Error;

/// Result type for device operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Errors surfaced by the resource-binding layer
#[derive(Error, Debug)]
pub enum GpuError {
    /// A shader stage failed to compile
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompile {
        /// Stage that failed
        stage: ShaderStage,
        /// Compiler output
        log: String,
    },

    /// Program link step failed
    #[error("program link failed: {0}")]
    ProgramLink(String),

    /// Program validation step failed
    #[error("program validation failed: {0}")]
    ProgramValidate(String),

    /// A framebuffer was used before reaching completeness
    #[error("framebuffer incomplete: {0:?}")]
    FramebufferIncomplete(FramebufferStatus),

    /// A handle referred to a resource the device no longer knows
    #[error("stale or unknown {0} handle")]
    UnknownHandle(&'static str),

    /// Backend-specific failure
    #[error("device error: {0}")]
    Device(String),
}

/// Handle to a GPU texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Handle to a GPU sampler object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub u64);

/// Handle to a GPU framebuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u64);

/// Handle to a GPU renderbuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u64);

/// Handle to a GPU vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u64);

/// Resolved uniform location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Shader pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Optional geometry stage
    Geometry,
    /// Fragment stage
    Fragment,
}

/// Texture binding targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// Standard 2D texture
    Tex2D,
    /// Six-faced cube map sharing one texture name
    CubeMap,
}

/// Cube map face selectors, in attachment-offset order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// +X face
    PositiveX,
    /// -X face
    NegativeX,
    /// +Y face
    PositiveY,
    /// -Y face
    NegativeY,
    /// +Z face
    PositiveZ,
    /// -Z face
    NegativeZ,
}

impl CubeFace {
    /// All six faces in attachment-offset order
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Zero-based offset of this face from the first face enum
    pub fn index(self) -> usize {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }
}

/// Texel storage formats used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, the standard material texture format
    Rgba8,
    /// Half-float RGBA for HDR render targets
    Rgba16F,
    /// Two-channel half-float (BRDF integration lookup)
    Rg16F,
    /// 24-bit depth
    Depth24,
}

impl TextureFormat {
    /// Bytes per texel of the CPU-side representation
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rg16F => 4,
            TextureFormat::Depth24 => 4,
        }
    }
}

/// Texture and sampler filtering modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest-texel sampling
    Nearest,
    /// Bilinear sampling
    Linear,
    /// Trilinear sampling through the mip chain
    LinearMipmapLinear,
}

/// Texture coordinate wrap modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Tile the texture
    Repeat,
    /// Clamp coordinates to the edge texel
    ClampToEdge,
}

/// Framebuffer attachment points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// Indexed color attachment
    Color(u32),
    /// Depth attachment
    Depth,
}

/// Framebuffer completeness states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// Ready to render into
    Complete,
    /// An attachment is invalid
    IncompleteAttachment,
    /// No attachment present at all
    MissingAttachment,
    /// Attachment combination unsupported by the device
    Unsupported,
}

/// Fixed-function blend states the engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source overwrites destination
    Disabled,
    /// Source adds onto destination (bloom combine)
    Additive,
}

bitflags::bitflags! {
    /// Buffer planes selected by a clear operation
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color planes
        const COLOR = 1 << 0;
        /// Depth plane
        const DEPTH = 1 << 1;
        /// Stencil plane
        const STENCIL = 1 << 2;
    }
}

/// Abstract GPU device the render core binds resources through
///
/// The texture-unit numbering passed to `bind_texture`/`bind_sampler` is the
/// contract defined in [`crate::render::binding`]; shader sampler uniforms
/// are configured to the same units after link.
pub trait GraphicsDevice {
    // === Textures ===

    /// Create an empty texture object
    fn create_texture(&mut self, target: TextureTarget) -> TextureId;

    /// Allocate immutable storage, including `mip_levels` mip levels
    fn alloc_texture_storage(
        &mut self,
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> GpuResult<()>;

    /// Upload texels into one mip level (one face for cube maps)
    fn upload_texture_pixels(
        &mut self,
        texture: TextureId,
        face: Option<CubeFace>,
        mip_level: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GpuResult<()>;

    /// Populate the mip chain from the base level
    fn generate_mipmaps(&mut self, texture: TextureId) -> GpuResult<()>;

    /// Configure filtering state on the texture object itself
    fn set_texture_filtering(
        &mut self,
        texture: TextureId,
        min: FilterMode,
        mag: FilterMode,
    ) -> GpuResult<()>;

    /// Configure wrap state on the texture object itself
    fn set_texture_wrap(&mut self, texture: TextureId, wrap: WrapMode) -> GpuResult<()>;

    /// Attach (`Some`) or detach (`None`) a texture at a texture unit
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<TextureId>);

    /// Release the texture name
    fn destroy_texture(&mut self, texture: TextureId);

    // === Samplers ===

    /// Create a sampler object
    fn create_sampler(&mut self) -> SamplerId;

    /// Configure sampler filtering
    fn set_sampler_filtering(
        &mut self,
        sampler: SamplerId,
        min: FilterMode,
        mag: FilterMode,
    ) -> GpuResult<()>;

    /// Configure sampler wrap mode
    fn set_sampler_wrap(&mut self, sampler: SamplerId, wrap: WrapMode) -> GpuResult<()>;

    /// Attach (`Some`) or detach (`None`) a sampler at a texture unit
    fn bind_sampler(&mut self, unit: u32, sampler: Option<SamplerId>);

    /// Release the sampler name
    fn destroy_sampler(&mut self, sampler: SamplerId);

    // === Framebuffers ===

    /// Create a framebuffer object
    fn create_framebuffer(&mut self) -> FramebufferId;

    /// Bind a framebuffer as the render target, or `None` for the backbuffer
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Attach a texture (optionally one cube face, at a mip level)
    fn attach_texture(
        &mut self,
        framebuffer: FramebufferId,
        attachment: AttachmentPoint,
        texture: TextureId,
        face: Option<CubeFace>,
        mip_level: u32,
    ) -> GpuResult<()>;

    /// Create a renderbuffer for depth scratch storage
    fn create_renderbuffer(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> RenderbufferId;

    /// Attach a renderbuffer to a framebuffer
    fn attach_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        attachment: AttachmentPoint,
        renderbuffer: RenderbufferId,
    ) -> GpuResult<()>;

    /// Select which color attachments fragment output writes to
    fn set_draw_buffers(
        &mut self,
        framebuffer: FramebufferId,
        buffers: &[AttachmentPoint],
    ) -> GpuResult<()>;

    /// Select the attachment read operations source from
    fn set_read_buffer(
        &mut self,
        framebuffer: FramebufferId,
        buffer: Option<AttachmentPoint>,
    ) -> GpuResult<()>;

    /// Query completeness of a framebuffer
    fn framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus;

    /// Release the framebuffer name
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Release the renderbuffer name
    fn destroy_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    // === Shader programs ===

    /// Compile the given stages and link them into a program
    fn compile_program(
        &mut self,
        name: &str,
        stages: &[(ShaderStage, &str)],
    ) -> GpuResult<ProgramId>;

    /// Validate a linked program against current state
    fn validate_program(&mut self, program: ProgramId) -> GpuResult<()>;

    /// Make a program current, or `None` to unbind
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Look up a uniform location; `None` when unused or absent
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Upload a 4x4 matrix uniform
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Upload a vec4 uniform
    fn set_uniform_vec4(&mut self, location: UniformLocation, value: &Vec4);

    /// Upload a vec3 uniform
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3);

    /// Upload a float uniform
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);

    /// Upload an integer uniform (texture units are set this way)
    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32);

    /// Release the program name
    fn destroy_program(&mut self, program: ProgramId);

    // === Geometry buffers ===

    /// Create and fill a vertex buffer
    fn create_vertex_buffer(&mut self, data: &[u8]) -> BufferId;

    /// Create and fill an index buffer
    fn create_index_buffer(&mut self, data: &[u32]) -> BufferId;

    /// Bind (`Some`) or unbind (`None`) the active vertex/index buffers
    fn bind_geometry(&mut self, vertex: Option<BufferId>, index: Option<BufferId>);

    /// Issue an indexed triangle draw over the bound geometry
    fn draw_indexed(&mut self, index_count: u32);

    /// Release a buffer name
    fn destroy_buffer(&mut self, buffer: BufferId);

    // === Frame operations ===

    /// Set the viewport rectangle
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Switch the fixed-function blend state
    fn set_blend(&mut self, mode: BlendMode);

    /// Clear the selected planes of the bound target
    fn clear(&mut self, flags: ClearFlags, color: [f32; 4]);

    /// Swap buffers / present the frame
    fn present(&mut self);
}

/// Mip level count for a texture, derived from the larger dimension
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}
