//! Scene management
//!
//! The transform hierarchy, the owning scene aggregate, the importer
//! boundary, and the scene manager's import pipeline and registries.
//!
//! ## Data flow
//!
//! ```text
//! asset file -> SceneImporter -> SceneDocument
//!            -> SceneManager import -> Scene (entities + transform graph)
//!            -> material→mesh index -> RenderManager per-frame traversal
//! ```

pub mod bounds;
pub mod document;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod scene_manager;
pub mod transform;

pub use bounds::Aabb;
pub use document::{
    DocCamera, DocLight, DocLightKind, DocMaterial, DocMesh, DocNode, DocTextureSet, ImportError,
    SceneDocument, SceneImporter,
};
pub use scene::{GameObject, Scene, Skybox};
pub use scene_manager::{
    ImportOptions, MaterialRegistry, RenderView, SceneManager, TextureRegistry,
};
pub use transform::{TransformError, TransformGraph, TransformId};
