//! Scene Manager - import pipeline and resource registries
//!
//! The scene manager turns an externally-parsed [`SceneDocument`] into the
//! engine's entity graph and owns the registries everything else references
//! by handle: the shader catalog, the material registry, and the texture
//! registry (both deduplicated by name/path and capacity-bounded). After
//! geometry import it rebuilds the material→mesh index the render manager
//! batches draws with.
//!
//! Import ordering invariants:
//! 1. Materials and textures first (meshes bind materials by index)
//! 2. Hierarchy, folding baked-transform nodes into real ancestors
//! 3. Geometry, synthesizing grouping objects where the source has none
//! 4. Material→mesh index, skipping out-of-range material references
//! 5. Lights (singleton key/ambient, first wins)
//! 6. Cameras (first wins; none at all synthesizes a default)
//! 7. Player rig under the main camera, yaw on the rig, pitch on the camera

use super::document::{DocLightKind, DocMesh, ImportError, SceneDocument, SceneImporter};
use super::scene::{GameObject, Scene};
use super::transform::TransformId;
use crate::config::{CameraDefaults, EngineConfig};
use crate::events::{EngineEvent, EventQueue, Priority};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::gpu::GraphicsDevice;
use crate::render::binding::MaterialSlot;
use crate::render::camera::{Camera, CameraRole};
use crate::render::light::{Light, LightKind};
use crate::render::material::{Material, TextureHandle};
use crate::render::mesh::{Mesh, Vertex};
use crate::render::shader::{ShaderCatalog, ERROR_SHADER_NAME};
use crate::render::texture::Texture;
use std::collections::HashMap;
use std::path::PathBuf;

/// Upper bound on distinct materials per loaded scene set
pub const MAX_MATERIALS: usize = 256;

/// Upper bound on distinct textures per loaded scene set
pub const MAX_TEXTURES: usize = 512;

/// Options governing document import
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Marker identifying importer-internal baked-transform nodes; such
    /// nodes never become entities, their transforms fold into the nearest
    /// real ancestor
    pub baked_node_marker: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            baked_node_marker: "$AssimpFbx$".to_string(),
        }
    }
}

/// Owning, capacity-bounded texture store deduplicated by name/path
///
/// Handle 0 is always the designated error texture, so degraded lookups have
/// a guaranteed target.
pub struct TextureRegistry {
    textures: Vec<Texture>,
    by_name: HashMap<String, usize>,
    capacity: usize,
}

impl TextureRegistry {
    /// Create a registry seeded with the error texture at handle 0
    pub fn new(device: &mut dyn GraphicsDevice, capacity: usize) -> Self {
        let mut error = Texture::error("texture:error");
        if let Err(e) = error.buffer(device) {
            log::error!("failed to buffer the error texture: {e}");
        }
        let mut by_name = HashMap::new();
        by_name.insert(error.name().to_string(), 0);
        Self {
            textures: vec![error],
            by_name,
            capacity,
        }
    }

    /// Handle of the designated error texture
    pub fn error_handle() -> TextureHandle {
        TextureHandle(0)
    }

    /// Handle of a stored texture by name, when present
    pub fn find(&self, name: &str) -> Option<TextureHandle> {
        self.by_name.get(name).copied().map(TextureHandle)
    }

    /// Buffer and store a texture under a name
    ///
    /// At capacity, or on a buffering failure, the texture is dropped and
    /// the error handle returned.
    pub fn insert(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        mut texture: Texture,
    ) -> TextureHandle {
        if let Some(existing) = self.find(name) {
            return existing;
        }
        if self.textures.len() >= self.capacity {
            log::error!("texture registry full ({}); '{name}' degraded", self.capacity);
            return Self::error_handle();
        }
        if let Err(e) = texture.buffer(device) {
            log::warn!("failed to buffer texture '{name}': {e}");
            return Self::error_handle();
        }
        let index = self.textures.len();
        self.textures.push(texture);
        self.by_name.insert(name.to_string(), index);
        TextureHandle(index)
    }

    /// Look up by name, or build-buffer-and-store a new entry
    pub fn get_or_insert_with(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        build: impl FnOnce() -> Texture,
    ) -> TextureHandle {
        if let Some(existing) = self.find(name) {
            return existing;
        }
        let texture = build();
        self.insert(device, name, texture)
    }

    /// The owned textures, indexable by handle
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Number of stored textures (including the error texture)
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether only the error texture exists
    pub fn is_empty(&self) -> bool {
        self.textures.len() <= 1
    }

    /// Release every texture
    pub fn destroy_all(&mut self, device: &mut dyn GraphicsDevice) {
        for texture in &mut self.textures {
            texture.destroy(device);
        }
    }
}

/// Owning, capacity-bounded material store deduplicated by name
#[derive(Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    by_name: HashMap<String, usize>,
    capacity: usize,
}

impl MaterialRegistry {
    /// Create an empty registry
    pub fn new(capacity: usize) -> Self {
        Self {
            materials: Vec::new(),
            by_name: HashMap::new(),
            capacity,
        }
    }

    /// Index of a material by name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Register a material; `None` when the registry is full
    pub fn register(&mut self, material: Material) -> Option<usize> {
        if let Some(&existing) = self.by_name.get(material.name()) {
            return Some(existing);
        }
        if self.materials.len() >= self.capacity {
            log::error!(
                "material registry full ({}); '{}' dropped",
                self.capacity,
                material.name()
            );
            return None;
        }
        let index = self.materials.len();
        self.by_name.insert(material.name().to_string(), index);
        self.materials.push(material);
        Some(index)
    }

    /// The owned materials, indexable by registry index
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Number of registered materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether no materials are registered
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Sentinel registry index for meshes whose material reference was invalid
const INVALID_MATERIAL: usize = usize::MAX;

/// Borrows of everything the render manager consumes per frame
pub struct RenderView<'a> {
    /// The loaded scene
    pub scene: &'a Scene,
    /// Shader catalog (mutable: uniform uploads cache locations)
    pub shaders: &'a mut ShaderCatalog,
    /// Materials indexable by registry index
    pub materials: &'a [Material],
    /// Textures indexable by handle
    pub textures: &'a [Texture],
    /// Material→mesh grouping
    pub material_meshes: &'a [Vec<usize>],
}

/// Orchestrates scene import and owns the shared resource registries
pub struct SceneManager {
    options: ImportOptions,
    camera_defaults: CameraDefaults,
    texture_dir: PathBuf,
    shaders: ShaderCatalog,
    textures: TextureRegistry,
    materials: MaterialRegistry,
    material_meshes: Vec<Vec<usize>>,
    scene: Option<Scene>,
}

impl SceneManager {
    /// Create a scene manager from engine configuration
    pub fn new(device: &mut dyn GraphicsDevice, config: &EngineConfig) -> Self {
        Self {
            options: ImportOptions::default(),
            camera_defaults: config.camera.clone(),
            texture_dir: PathBuf::from(&config.paths.texture_dir),
            shaders: ShaderCatalog::new(&config.paths.shader_dir),
            textures: TextureRegistry::new(device, MAX_TEXTURES),
            materials: MaterialRegistry::new(MAX_MATERIALS),
            material_meshes: Vec::new(),
            scene: None,
        }
    }

    /// Override import options
    pub fn set_import_options(&mut self, options: ImportOptions) {
        self.options = options;
    }

    /// The loaded scene, when one exists
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Mutable access to the loaded scene
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// The material registry
    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// The texture registry
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// The shader catalog
    pub fn shaders(&self) -> &ShaderCatalog {
        &self.shaders
    }

    /// Mutable shader catalog access (uniform uploads cache locations)
    pub fn shaders_mut(&mut self) -> &mut ShaderCatalog {
        &mut self.shaders
    }

    /// The material→mesh grouping rebuilt at import
    ///
    /// Entry `i` lists scene mesh indices rendered with registry material
    /// `i`; meshes with invalid material references appear nowhere.
    pub fn material_meshes(&self) -> &[Vec<usize>] {
        &self.material_meshes
    }

    /// Split borrows for one frame of rendering, or `None` with no scene
    pub fn render_view(&mut self) -> Option<RenderView<'_>> {
        let Self {
            shaders,
            textures,
            materials,
            material_meshes,
            scene,
            ..
        } = self;
        let scene = scene.as_ref()?;
        Some(RenderView {
            scene,
            shaders,
            materials: materials.materials(),
            textures: textures.textures(),
            material_meshes,
        })
    }

    /// Load a scene through the importer boundary
    ///
    /// An unreadable document is fatal to the load: a quit request is posted
    /// with front-of-queue priority and the error returned. Missing
    /// individual assets inside a readable document merely degrade.
    pub fn load_scene(
        &mut self,
        device: &mut dyn GraphicsDevice,
        events: &mut EventQueue,
        importer: &dyn SceneImporter,
        path: &str,
    ) -> Result<(), ImportError> {
        let document = match importer.import(path) {
            Ok(document) => document,
            Err(e) => {
                log::error!("scene load failed: {e}");
                events.post_with_priority(EngineEvent::QuitRequested, Priority::Urgent);
                events.post(EngineEvent::SceneLoadFailed {
                    path: path.to_string(),
                });
                return Err(e);
            }
        };
        self.import_document(device, &document);
        events.post(EngineEvent::SceneLoaded {
            name: document.name.clone(),
        });
        Ok(())
    }

    /// Import a parsed document, replacing any loaded scene
    pub fn import_document(&mut self, device: &mut dyn GraphicsDevice, document: &SceneDocument) {
        log::info!(
            "importing scene '{}': {} materials, {} meshes, {} lights, {} cameras",
            document.name,
            document.materials.len(),
            document.meshes.len(),
            document.lights.len(),
            document.cameras.len()
        );

        let mut scene = Scene::new(&document.name);

        let material_map = self.import_materials(device, document);
        let node_map = self.import_hierarchy(&mut scene, document);
        self.import_geometry(device, &mut scene, document, &material_map, &node_map);
        self.rebuild_material_index(&scene);
        self.import_lights(&mut scene, document, &node_map);
        self.import_cameras(&mut scene, document, &node_map);
        self.spawn_player_rig(&mut scene);

        if let Some(mut old) = self.scene.take() {
            old.destroy(device);
        }
        self.scene = Some(scene);
    }

    /// Release the scene and every registry resource
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(mut scene) = self.scene.take() {
            scene.destroy(device);
        }
        self.material_meshes.clear();
        self.textures.destroy_all(device);
        self.shaders.destroy_all(device);
    }

    // === Step 1-2: materials and textures ===

    fn import_materials(
        &mut self,
        device: &mut dyn GraphicsDevice,
        document: &SceneDocument,
    ) -> Vec<usize> {
        document
            .materials
            .iter()
            .map(|doc_material| {
                if let Some(existing) = self.materials.find(&doc_material.name) {
                    return existing;
                }

                let shader = match shader_name_from_material(&doc_material.name) {
                    Some(shader_name) => self.shaders.load_or_get(device, shader_name, &[]),
                    None => {
                        log::warn!(
                            "material '{}' has no shader naming convention; using error shader",
                            doc_material.name
                        );
                        self.shaders.load_or_get(device, ERROR_SHADER_NAME, &[])
                    }
                };

                let mut material = Material::standard(&doc_material.name, shader);
                material.set_vec4_property(
                    "baseColor",
                    Vec4::new(
                        doc_material.base_color[0],
                        doc_material.base_color[1],
                        doc_material.base_color[2],
                        doc_material.base_color[3],
                    ),
                );
                for (name, value) in &doc_material.scalars {
                    material.set_scalar_property(name, *value);
                }

                let channels = [
                    (MaterialSlot::Albedo, doc_material.textures.albedo.as_deref()),
                    (MaterialSlot::Normal, doc_material.textures.normal.as_deref()),
                    (MaterialSlot::Emissive, doc_material.textures.emissive.as_deref()),
                    (MaterialSlot::Surface, doc_material.textures.surface.as_deref()),
                ];
                for (slot, path) in channels {
                    match path {
                        Some(path) => {
                            let handle = self.load_texture_asset(device, path);
                            material.set_texture(slot, handle);
                        }
                        None if slot == MaterialSlot::Albedo => {
                            // No albedo asset: 1x1 swatch from the base color
                            let handle = self.solid_swatch(
                                device,
                                &doc_material.name,
                                doc_material.base_color,
                            );
                            material.set_texture(slot, handle);
                        }
                        None => {}
                    }
                }

                self.materials.register(material).unwrap_or(INVALID_MATERIAL)
            })
            .collect()
    }

    fn load_texture_asset(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: &str,
    ) -> TextureHandle {
        let full_path = self.texture_dir.join(path);
        let key = full_path.display().to_string();
        if let Some(existing) = self.textures.find(&key) {
            return existing;
        }
        match Texture::from_file(&key) {
            Ok(texture) => self.textures.insert(device, &key, texture),
            Err(e) => {
                log::warn!("texture '{key}' unavailable ({e}); using error texture");
                TextureRegistry::error_handle()
            }
        }
    }

    fn solid_swatch(
        &mut self,
        device: &mut dyn GraphicsDevice,
        material_name: &str,
        color: [f32; 4],
    ) -> TextureHandle {
        let key = format!("swatch:{material_name}");
        self.textures.get_or_insert_with(device, &key, || {
            let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            Texture::solid(
                &key,
                [
                    to_byte(color[0]),
                    to_byte(color[1]),
                    to_byte(color[2]),
                    to_byte(color[3]),
                ],
            )
        })
    }

    // === Step 2.5: hierarchy, folding baked nodes ===

    fn import_hierarchy(
        &self,
        scene: &mut Scene,
        document: &SceneDocument,
    ) -> Vec<Option<TransformId>> {
        let mut map: Vec<Option<TransformId>> = vec![None; document.nodes.len()];
        for index in 0..document.nodes.len() {
            self.resolve_node(scene, document, index, &mut map);
        }
        map
    }

    fn is_baked_node(&self, name: &str) -> bool {
        name.contains(&self.options.baked_node_marker)
    }

    /// Create the transform node for one real hierarchy node, folding any
    /// chain of baked ancestors into its local matrix
    fn resolve_node(
        &self,
        scene: &mut Scene,
        document: &SceneDocument,
        index: usize,
        map: &mut Vec<Option<TransformId>>,
    ) -> Option<TransformId> {
        if map[index].is_some() {
            return map[index];
        }
        let node = &document.nodes[index];
        if self.is_baked_node(&node.name) {
            return None;
        }

        // Fold baked ancestors between this node and its nearest real one
        let mut local = node.local;
        let mut parent = node.parent;
        while let Some(parent_index) = parent {
            let parent_node = &document.nodes[parent_index];
            if !self.is_baked_node(&parent_node.name) {
                break;
            }
            local = parent_node.local * local;
            parent = parent_node.parent;
        }

        let id = scene.transforms.insert(local);
        if let Some(parent_index) = parent {
            if let Some(parent_id) = self.resolve_node(scene, document, parent_index, map) {
                if let Err(e) = scene.transforms.set_parent(id, parent_id) {
                    log::error!("hierarchy import parenting failed: {e}");
                }
            }
        }
        map[index] = Some(id);
        map[index]
    }

    // === Step 3: geometry ===

    fn import_geometry(
        &mut self,
        device: &mut dyn GraphicsDevice,
        scene: &mut Scene,
        document: &SceneDocument,
        material_map: &[usize],
        node_map: &[Option<TransformId>],
    ) {
        let mut objects_by_node: HashMap<TransformId, usize> = HashMap::new();

        for doc_mesh in &document.meshes {
            let Some(vertices) = build_vertices(doc_mesh) else {
                continue;
            };

            let registry_material = match material_map.get(doc_mesh.material_index) {
                Some(&mapped) => mapped,
                None => {
                    log::warn!(
                        "mesh '{}' references material index {} outside the document",
                        doc_mesh.name,
                        doc_mesh.material_index
                    );
                    INVALID_MATERIAL
                }
            };

            // Grouping node: the mesh's enclosing real hierarchy node, or a
            // synthesized one at the mesh's own placement
            let (transform, object_name) = match doc_mesh.node.and_then(|n| node_map.get(n).copied().flatten()) {
                Some(id) => {
                    let name = doc_mesh
                        .node
                        .map(|n| document.nodes[n].name.clone())
                        .unwrap_or_else(|| doc_mesh.name.clone());
                    (id, name)
                }
                None => {
                    let id = scene.transforms.insert_identity();
                    log::debug!(
                        "mesh '{}' has no grouping node; synthesizing one",
                        doc_mesh.name
                    );
                    (id, doc_mesh.name.clone())
                }
            };

            let mesh = match Mesh::new(
                &doc_mesh.name,
                vertices,
                doc_mesh.indices.clone(),
                transform,
                registry_material,
            ) {
                Ok(mesh) => mesh,
                Err(e) => {
                    log::warn!("mesh '{}' skipped: {e}", doc_mesh.name);
                    continue;
                }
            };

            let mesh_index = scene.add_mesh(mesh);
            if let Err(e) = scene.meshes_mut()[mesh_index].buffer(device) {
                log::warn!("mesh '{}' failed to buffer: {e}", doc_mesh.name);
            }

            let object_index = *objects_by_node.entry(transform).or_insert_with(|| {
                scene.add_game_object(GameObject::new(object_name.clone(), transform))
            });
            if let Some(object) = scene.game_object_mut(object_index) {
                object.meshes.push(mesh_index);
            }
        }
    }

    // === Step 4: material→mesh index ===

    fn rebuild_material_index(&mut self, scene: &Scene) {
        self.material_meshes = vec![Vec::new(); self.materials.len()];
        for object in scene.game_objects() {
            for &mesh_index in &object.meshes {
                let Some(mesh) = scene.meshes().get(mesh_index) else {
                    continue;
                };
                match self.material_meshes.get_mut(mesh.material_index()) {
                    Some(bucket) => bucket.push(mesh_index),
                    None => log::warn!(
                        "mesh '{}' has out-of-range material index {}; excluded from batching",
                        mesh.name(),
                        mesh.material_index()
                    ),
                }
            }
        }
    }

    // === Step 5: lights ===

    fn import_lights(
        &self,
        scene: &mut Scene,
        document: &SceneDocument,
        node_map: &[Option<TransformId>],
    ) {
        for doc_light in &document.lights {
            let mut kind = match doc_light.kind {
                DocLightKind::Directional => LightKind::Directional,
                DocLightKind::Ambient => LightKind::Ambient,
                DocLightKind::Point => LightKind::Point,
                DocLightKind::Spot => LightKind::Spot,
                DocLightKind::Area => LightKind::Area,
                DocLightKind::Tube => LightKind::Tube,
            };
            // Naming convention override: anything called "...ambient..." is
            // the ambient term regardless of source type
            if doc_light.name.to_lowercase().contains("ambient") {
                kind = LightKind::Ambient;
            }

            let transform = doc_light
                .node
                .and_then(|n| node_map.get(n).copied().flatten())
                .unwrap_or_else(|| scene.transforms.insert_identity());

            let color = Vec3::new(doc_light.color[0], doc_light.color[1], doc_light.color[2]);
            scene.add_light(Light::new(
                &doc_light.name,
                kind,
                color,
                doc_light.intensity,
                transform,
            ));
        }
    }

    // === Step 6: cameras ===

    fn import_cameras(
        &self,
        scene: &mut Scene,
        document: &SceneDocument,
        node_map: &[Option<TransformId>],
    ) {
        for (index, doc_camera) in document.cameras.iter().enumerate() {
            if index > 0 {
                log::warn!(
                    "additional camera '{}' is unsupported; first camera wins",
                    doc_camera.name
                );
                continue;
            }
            let transform = doc_camera
                .node
                .and_then(|n| node_map.get(n).copied().flatten())
                .unwrap_or_else(|| scene.transforms.insert_identity());
            scene.set_camera(Camera::new(
                &doc_camera.name,
                CameraRole::Main,
                doc_camera.fov_y_degrees,
                doc_camera.near,
                doc_camera.far,
                transform,
            ));
        }

        if scene.main_camera().is_none() {
            log::info!("scene has no camera; synthesizing default");
            let transform = scene.transforms.insert_identity();
            scene.set_camera(Camera::new(
                "default_camera",
                CameraRole::Main,
                self.camera_defaults.fov_y_degrees,
                self.camera_defaults.near,
                self.camera_defaults.far,
                transform,
            ));
        }
    }

    // === Step 7: player rig ===

    /// Split the main camera's orientation into yaw (rig) and pitch (camera)
    /// so free-look rotation decomposes correctly afterwards
    fn spawn_player_rig(&self, scene: &mut Scene) {
        let Some(camera) = scene.main_camera() else {
            return;
        };
        let camera_node = camera.transform();

        let world = scene.transforms.world(camera_node);
        let forward = world.transform_vector(&Vec3::new(0.0, 0.0, -1.0));
        let (yaw, pitch) = utils::yaw_pitch_from_forward(forward);
        let position = utils::translation_of(&world);

        let rig_node = scene
            .transforms
            .insert(Mat4::translation(position) * Mat4::rotation_y(yaw));
        scene.transforms.unparent(camera_node);
        scene.transforms.set_local(camera_node, Mat4::rotation_x(pitch));
        if let Err(e) = scene.transforms.set_parent(camera_node, rig_node) {
            log::error!("player rig parenting failed: {e}");
            return;
        }
        scene.add_game_object(GameObject::new("player_rig", rig_node));
    }
}

/// Shader selection convention: the material name's trailing token after the
/// last separator names the shader ("Foo_lambert" compiles "lambert")
pub fn shader_name_from_material(material_name: &str) -> Option<&str> {
    material_name
        .rsplit_once('_')
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// Assemble interleaved vertices, substituting logged defaults for missing
/// channels; a mesh without positions is rejected
fn build_vertices(doc_mesh: &DocMesh) -> Option<Vec<Vertex>> {
    if doc_mesh.positions.is_empty() {
        log::warn!("mesh '{}' has no positions; skipped", doc_mesh.name);
        return None;
    }
    let count = doc_mesh.positions.len();

    if doc_mesh.normals.is_empty() {
        log::warn!("mesh '{}' has no normals; defaulting to zero", doc_mesh.name);
    }
    if doc_mesh.tangents.is_empty() || doc_mesh.bitangents.is_empty() {
        log::debug!("mesh '{}' has no tangent frame; defaulting to zero", doc_mesh.name);
    }
    if doc_mesh.colors.is_empty() {
        log::debug!("mesh '{}' has no vertex colors; defaulting to white", doc_mesh.name);
    }
    if doc_mesh.uv_channels.is_empty() {
        log::warn!("mesh '{}' has no UV channels; defaulting to zero", doc_mesh.name);
    }

    let vertices = (0..count)
        .map(|i| {
            let mut vertex = Vertex::at(doc_mesh.positions[i]);
            if let Some(normal) = doc_mesh.normals.get(i) {
                vertex.normal = *normal;
            }
            if let Some(tangent) = doc_mesh.tangents.get(i) {
                vertex.tangent = *tangent;
            }
            if let Some(bitangent) = doc_mesh.bitangents.get(i) {
                vertex.bitangent = *bitangent;
            }
            vertex.color = doc_mesh.colors.get(i).copied().unwrap_or([1.0, 1.0, 1.0, 1.0]);
            for (channel, uvs) in doc_mesh.uv_channels.iter().take(4).enumerate() {
                if let Some(uv) = uvs.get(i) {
                    vertex.uv[channel] = *uv;
                }
            }
            vertex
        })
        .collect();
    Some(vertices)
}
