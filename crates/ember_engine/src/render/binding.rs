//! Texture-unit numbering contract
//!
//! Sampler uniform names map 1:1 to fixed texture units, declared per texture
//! category rather than per material instance. [`crate::render::Shader`]
//! configures sampler uniforms to these units after link, and
//! [`crate::render::RenderManager`] binds textures to the same units per
//! draw. Both sides read this table; nothing else may hardcode a unit.

/// Semantic texture slots a standard material exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    /// Albedo color with alpha in the fourth channel
    Albedo,
    /// Tangent-space normal map
    Normal,
    /// Emissive color
    Emissive,
    /// Packed roughness/metallic/ambient-occlusion
    Surface,
}

impl MaterialSlot {
    /// All material slots in unit order
    pub const ALL: [MaterialSlot; 4] = [
        MaterialSlot::Albedo,
        MaterialSlot::Normal,
        MaterialSlot::Emissive,
        MaterialSlot::Surface,
    ];

    /// Number of slots a standard material carries
    pub const COUNT: usize = 4;

    /// Slot array index
    pub fn index(self) -> usize {
        match self {
            MaterialSlot::Albedo => 0,
            MaterialSlot::Normal => 1,
            MaterialSlot::Emissive => 2,
            MaterialSlot::Surface => 3,
        }
    }

    /// Fixed texture unit for this slot
    pub fn unit(self) -> u32 {
        self.index() as u32
    }

    /// Fixed sampler uniform name for this slot
    pub fn sampler_name(self) -> &'static str {
        match self {
            MaterialSlot::Albedo => "albedoMap",
            MaterialSlot::Normal => "normalMap",
            MaterialSlot::Emissive => "emissiveMap",
            MaterialSlot::Surface => "surfaceMap",
        }
    }
}

/// Units for the deferred G-buffer render textures read by the lighting pass
pub mod gbuffer {
    /// World-space position target
    pub const POSITION: u32 = 4;
    /// World-space normal target
    pub const NORMAL: u32 = 5;
    /// Albedo + specular target
    pub const ALBEDO: u32 = 6;
    /// Emissive + material-flags target
    pub const EMISSIVE: u32 = 7;

    /// Sampler names in unit order, paired with their units
    pub const SAMPLERS: [(u32, &str); 4] = [
        (POSITION, "gPosition"),
        (NORMAL, "gNormal"),
        (ALBEDO, "gAlbedo"),
        (EMISSIVE, "gEmissive"),
    ];
}

/// Units for depth and shadow textures
pub mod depth {
    /// Scene depth readback
    pub const SCENE: u32 = 8;
    /// Directional shadow map
    pub const SHADOW: u32 = 9;

    /// Sampler names in unit order, paired with their units
    pub const SAMPLERS: [(u32, &str); 2] = [(SCENE, "depthMap"), (SHADOW, "shadowMap")];
}

/// Units for cube maps and the BRDF integration lookup
pub mod environment {
    /// Skybox / source environment cube
    pub const SKY: u32 = 10;
    /// Irradiance (IEM) cube
    pub const IRRADIANCE: u32 = 11;
    /// Pre-filtered (PMREM) cube
    pub const PREFILTERED: u32 = 12;
    /// BRDF integration lookup (2D)
    pub const BRDF_LUT: u32 = 13;

    /// Sampler names in unit order, paired with their units
    pub const SAMPLERS: [(u32, &str); 4] = [
        (SKY, "skyMap"),
        (IRRADIANCE, "irradianceMap"),
        (PREFILTERED, "prefilteredMap"),
        (BRDF_LUT, "brdfLut"),
    ];
}

/// Unit used by single-input post-processing passes
pub const POSTFX_SOURCE: u32 = 0;
/// Unit used by two-input post-processing passes for the second image
pub const POSTFX_BLEND: u32 = 1;

/// The complete sampler-name → unit table configured after every link
///
/// One table for every shader keeps the contract single-sourced; programs
/// that do not declare a given sampler simply have no location for it and
/// the assignment is skipped.
pub fn all_sampler_bindings() -> impl Iterator<Item = (u32, &'static str)> {
    MaterialSlot::ALL
        .into_iter()
        .map(|slot| (slot.unit(), slot.sampler_name()))
        .chain(gbuffer::SAMPLERS)
        .chain(depth::SAMPLERS)
        .chain(environment::SAMPLERS)
}
