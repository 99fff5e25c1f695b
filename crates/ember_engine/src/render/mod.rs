//! Rendering system
//!
//! Resource wrappers with explicit create → buffer → bind → destroy
//! lifecycles, the texture-unit binding contract, and the per-frame deferred
//! draw loop with post-processing and image-based lighting.

pub mod binding;
pub mod camera;
pub mod ibl;
pub mod light;
pub mod material;
pub mod mesh;
pub mod postfx;
pub mod render_manager;
pub mod render_texture;
pub mod shader;
pub mod texture;

pub use camera::{Camera, CameraRole};
pub use ibl::ImageBasedLight;
pub use light::{Light, LightKind};
pub use material::{Material, TextureHandle};
pub use mesh::{CubePrimitive, Mesh, MeshError, ScreenQuad, Vertex};
pub use postfx::PostFxManager;
pub use render_manager::{GBuffer, RenderManager};
pub use render_texture::RenderTexture;
pub use shader::{Shader, ShaderCatalog, ShaderError, ShaderHandle};
pub use texture::{Texture, TextureError};
