//! Importer boundary
//!
//! The engine consumes a read-only scene-graph document produced by an
//! external importer; the on-disk encoding is never parsed here. A
//! [`SceneImporter`] hands back a [`SceneDocument`]: flat, index-linked
//! lists of materials, meshes, lights, cameras, and hierarchy nodes.

use crate::foundation::math::Mat4;
use thiserror::Error;

/// Importer failures
#[derive(Error, Debug)]
pub enum ImportError {
    /// The scene file could not be read at all
    #[error("unreadable scene file '{path}': {source}")]
    Unreadable {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The scene file was read but could not be understood
    #[error("malformed scene file '{path}': {message}")]
    Malformed {
        /// Offending path
        path: String,
        /// Importer diagnostic
        message: String,
    },
}

/// Produces scene documents from authored asset files
pub trait SceneImporter {
    /// Parse the file at `path` into a document
    fn import(&self, path: &str) -> Result<SceneDocument, ImportError>;
}

/// Texture asset references a material carries, by semantic channel
#[derive(Debug, Clone, Default)]
pub struct DocTextureSet {
    /// Albedo color with alpha
    pub albedo: Option<String>,
    /// Tangent-space normal map
    pub normal: Option<String>,
    /// Emissive color
    pub emissive: Option<String>,
    /// Packed roughness/metallic/ambient-occlusion
    pub surface: Option<String>,
}

/// A material as authored
#[derive(Debug, Clone)]
pub struct DocMaterial {
    /// Material name; the trailing token after the last `_` selects the shader
    pub name: String,
    /// Base color with alpha, the fallback when no albedo texture exists
    pub base_color: [f32; 4],
    /// Texture channel references
    pub textures: DocTextureSet,
    /// Additional named scalar properties
    pub scalars: Vec<(String, f32)>,
}

impl DocMaterial {
    /// A material with only a name and base color
    pub fn named(name: impl Into<String>, base_color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            base_color,
            textures: DocTextureSet::default(),
            scalars: Vec::new(),
        }
    }
}

/// A mesh as authored; attribute arrays may be empty when the channel is
/// missing from the source
#[derive(Debug, Clone, Default)]
pub struct DocMesh {
    /// Mesh name
    pub name: String,
    /// Vertex positions (required)
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals, or empty
    pub normals: Vec<[f32; 3]>,
    /// Tangents, or empty
    pub tangents: Vec<[f32; 3]>,
    /// Bitangents, or empty
    pub bitangents: Vec<[f32; 3]>,
    /// Vertex colors, or empty
    pub colors: Vec<[f32; 4]>,
    /// Up to four UV channels
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Owning hierarchy node, when the mesh sits inside the node tree
    pub node: Option<usize>,
    /// Index into the document's material list
    pub material_index: usize,
}

/// A hierarchy node as authored
#[derive(Debug, Clone)]
pub struct DocNode {
    /// Node name
    pub name: String,
    /// Local transformation
    pub local: Mat4,
    /// Parent node index, `None` at the root
    pub parent: Option<usize>,
    /// Child node indices
    pub children: Vec<usize>,
}

impl DocNode {
    /// A root node with the given name and local matrix
    pub fn new(name: impl Into<String>, local: Mat4) -> Self {
        Self {
            name: name.into(),
            local,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Light types the importer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocLightKind {
    /// Directional light
    Directional,
    /// Ambient term
    Ambient,
    /// Point light
    Point,
    /// Spot light
    Spot,
    /// Area light
    Area,
    /// Tube light
    Tube,
}

/// A light as authored
#[derive(Debug, Clone)]
pub struct DocLight {
    /// Light name
    pub name: String,
    /// Light type
    pub kind: DocLightKind,
    /// Light color
    pub color: [f32; 3],
    /// Light intensity
    pub intensity: f32,
    /// Transform-bearing node
    pub node: Option<usize>,
}

/// A camera as authored
#[derive(Debug, Clone)]
pub struct DocCamera {
    /// Camera name
    pub name: String,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Transform-bearing node
    pub node: Option<usize>,
}

/// A complete imported scene description
#[derive(Debug, Clone, Default)]
pub struct SceneDocument {
    /// Scene name
    pub name: String,
    /// Authored materials
    pub materials: Vec<DocMaterial>,
    /// Authored meshes
    pub meshes: Vec<DocMesh>,
    /// Authored lights
    pub lights: Vec<DocLight>,
    /// Authored cameras
    pub cameras: Vec<DocCamera>,
    /// Hierarchy nodes, index-linked
    pub nodes: Vec<DocNode>,
}

impl SceneDocument {
    /// An empty document with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
