//! Scene: the owning aggregate for one loaded level
//!
//! A scene owns every imported entity — meshes, game objects, lights,
//! cameras, the optional skybox — plus the transform graph placing them, and
//! tracks an expand-only world bounding box. Teardown releases GPU resources
//! in a fixed order: meshes, game objects, lights, cameras, skybox.

use super::bounds::Aabb;
use super::transform::{TransformGraph, TransformId};
use crate::gpu::GraphicsDevice;
use crate::render::camera::{Camera, CameraRole};
use crate::render::light::Light;
use crate::render::material::TextureHandle;
use crate::render::mesh::Mesh;

/// A named entity grouping meshes under one transform node
#[derive(Debug)]
pub struct GameObject {
    /// Entity name (usually the source hierarchy node's)
    pub name: String,
    /// Placement node
    pub transform: TransformId,
    /// Indices into the scene's mesh list
    pub meshes: Vec<usize>,
}

impl GameObject {
    /// Create a game object with no meshes yet
    pub fn new(name: impl Into<String>, transform: TransformId) -> Self {
        Self {
            name: name.into(),
            transform,
            meshes: Vec::new(),
        }
    }
}

/// Sky backdrop: a cube mesh and the environment map it samples
#[derive(Debug)]
pub struct Skybox {
    /// The cube geometry
    pub mesh: Mesh,
    /// Environment cube map handle in the texture registry
    pub texture: Option<TextureHandle>,
}

/// All state owned by one loaded level
pub struct Scene {
    name: String,
    /// Placement hierarchy for every entity in the scene
    pub transforms: TransformGraph,
    game_objects: Vec<GameObject>,
    meshes: Vec<Mesh>,
    cameras: [Option<Camera>; CameraRole::COUNT],
    lights: Vec<Light>,
    key_light: Option<usize>,
    ambient_light: Option<usize>,
    skybox: Option<Skybox>,
    world_bounds: Aabb,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transforms: TransformGraph::new(),
            game_objects: Vec::new(),
            meshes: Vec::new(),
            cameras: [None, None, None],
            lights: Vec::new(),
            key_light: None,
            ambient_light: None,
            skybox: None,
            world_bounds: Aabb::empty(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take ownership of a mesh; the world bounds grow by the mesh's
    /// transformed local bounds and never shrink
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        let world = self.transforms.world(mesh.transform());
        let mesh_bounds = mesh.local_bounds().transformed(&world);
        self.world_bounds.expand_box(&mesh_bounds);

        let index = self.meshes.len();
        self.meshes.push(mesh);
        index
    }

    /// Owned meshes
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Mutable access to the owned meshes
    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    /// Take ownership of a game object
    pub fn add_game_object(&mut self, object: GameObject) -> usize {
        let index = self.game_objects.len();
        self.game_objects.push(object);
        index
    }

    /// Owned game objects
    pub fn game_objects(&self) -> &[GameObject] {
        &self.game_objects
    }

    /// Mutable access to a game object
    pub fn game_object_mut(&mut self, index: usize) -> Option<&mut GameObject> {
        self.game_objects.get_mut(index)
    }

    /// Find a game object by name
    pub fn find_game_object(&self, name: &str) -> Option<&GameObject> {
        self.game_objects.iter().find(|o| o.name == name)
    }

    /// Install a camera into its role slot; an occupied slot keeps its
    /// first occupant and the newcomer is dropped with a log
    pub fn set_camera(&mut self, camera: Camera) -> bool {
        let slot = &mut self.cameras[camera.role().index()];
        if slot.is_some() {
            log::warn!(
                "scene '{}' already has a {:?} camera; '{}' ignored",
                self.name,
                camera.role(),
                camera.name()
            );
            return false;
        }
        *slot = Some(camera);
        true
    }

    /// Camera occupying a role slot
    pub fn camera(&self, role: CameraRole) -> Option<&Camera> {
        self.cameras[role.index()].as_ref()
    }

    /// Mutable camera access by role
    pub fn camera_mut(&mut self, role: CameraRole) -> Option<&mut Camera> {
        self.cameras[role.index()].as_mut()
    }

    /// The main view camera
    pub fn main_camera(&self) -> Option<&Camera> {
        self.camera(CameraRole::Main)
    }

    /// Take ownership of a light
    ///
    /// Singleton kinds (directional key, ambient) admit one instance; the
    /// first wins and duplicates are dropped with a log.
    pub fn add_light(&mut self, light: Light) -> Option<usize> {
        use crate::render::light::LightKind;
        let singleton_slot = match light.kind {
            LightKind::Directional => Some(&mut self.key_light),
            LightKind::Ambient => Some(&mut self.ambient_light),
            _ => None,
        };
        if let Some(slot) = singleton_slot {
            if slot.is_some() {
                log::warn!(
                    "scene '{}' already has a {:?} light; '{}' ignored",
                    self.name,
                    light.kind,
                    light.name
                );
                return None;
            }
            let index = self.lights.len();
            *slot = Some(index);
            self.lights.push(light);
            return Some(index);
        }

        let index = self.lights.len();
        self.lights.push(light);
        Some(index)
    }

    /// Owned lights
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// The key directional light, when one was imported
    pub fn key_light(&self) -> Option<&Light> {
        self.key_light.and_then(|i| self.lights.get(i))
    }

    /// The ambient light, when one was imported
    pub fn ambient_light(&self) -> Option<&Light> {
        self.ambient_light.and_then(|i| self.lights.get(i))
    }

    /// Install the skybox
    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = Some(skybox);
    }

    /// The skybox, when present
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// Running union of every added mesh's transformed bounds
    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    /// Release everything this scene owns, in teardown order:
    /// meshes → game objects → lights → cameras → skybox
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for mesh in &mut self.meshes {
            mesh.destroy(device);
        }
        self.meshes.clear();
        self.game_objects.clear();
        self.lights.clear();
        self.key_light = None;
        self.ambient_light = None;
        self.cameras = [None, None, None];
        if let Some(mut skybox) = self.skybox.take() {
            skybox.mesh.destroy(device);
        }
        log::debug!("scene '{}' destroyed", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::gpu::RecordingDevice;
    use crate::render::light::LightKind;
    use crate::render::mesh::Vertex;
    use approx::assert_relative_eq;

    fn unit_mesh(scene: &mut Scene, offset: Vec3) -> Mesh {
        let node = scene.transforms.insert(Mat4::translation(offset));
        Mesh::new(
            "m",
            vec![
                Vertex::at([-1.0, -1.0, -1.0]),
                Vertex::at([1.0, 1.0, 1.0]),
                Vertex::at([0.0, 0.0, 0.0]),
            ],
            vec![0, 1, 2],
            node,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_world_bounds_union_is_order_independent() {
        let offsets = [
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(-3.0, 2.0, 0.0),
            Vec3::new(0.0, 0.0, -7.0),
        ];

        let mut forward = Scene::new("a");
        for offset in offsets {
            let mesh = unit_mesh(&mut forward, offset);
            forward.add_mesh(mesh);
        }

        let mut reversed = Scene::new("b");
        for offset in offsets.into_iter().rev() {
            let mesh = unit_mesh(&mut reversed, offset);
            reversed.add_mesh(mesh);
        }

        assert_relative_eq!(
            forward.world_bounds().min,
            reversed.world_bounds().min,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            forward.world_bounds().max,
            reversed.world_bounds().max,
            epsilon = 1e-6
        );
        // Union of unit boxes at the given offsets
        assert_relative_eq!(forward.world_bounds().min.x, -4.0, epsilon = 1e-6);
        assert_relative_eq!(forward.world_bounds().max.x, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_duplicate_key_light_first_wins() {
        let mut scene = Scene::new("lit");
        let node_a = scene.transforms.insert_identity();
        let node_b = scene.transforms.insert_identity();

        let first = scene.add_light(Light::new(
            "sun",
            LightKind::Directional,
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
            node_a,
        ));
        let second = scene.add_light(Light::new(
            "second_sun",
            LightKind::Directional,
            Vec3::new(1.0, 0.0, 0.0),
            1.0,
            node_b,
        ));

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(scene.key_light().map(|l| l.name.as_str()), Some("sun"));
    }

    #[test]
    fn test_point_lights_are_unrestricted() {
        let mut scene = Scene::new("lit");
        for i in 0..4 {
            let node = scene.transforms.insert_identity();
            let added = scene.add_light(Light::new(
                format!("bulb{i}"),
                LightKind::Point,
                Vec3::new(1.0, 1.0, 1.0),
                1.0,
                node,
            ));
            assert!(added.is_some());
        }
        assert_eq!(scene.lights().len(), 4);
    }

    #[test]
    fn test_second_main_camera_rejected() {
        let mut scene = Scene::new("cams");
        let node_a = scene.transforms.insert_identity();
        let node_b = scene.transforms.insert_identity();

        assert!(scene.set_camera(Camera::new("main", CameraRole::Main, 60.0, 0.1, 100.0, node_a)));
        assert!(!scene.set_camera(Camera::new("extra", CameraRole::Main, 45.0, 0.1, 10.0, node_b)));
        assert_eq!(scene.main_camera().map(Camera::name), Some("main"));
    }

    #[test]
    fn test_destroy_releases_mesh_buffers() {
        let mut device = RecordingDevice::new();
        let mut scene = Scene::new("gone");
        let mesh = unit_mesh(&mut scene, Vec3::zeros());
        let index = scene.add_mesh(mesh);
        scene.meshes_mut()[index].buffer(&mut device).unwrap();

        scene.destroy(&mut device);
        scene.destroy(&mut device);
        assert_eq!(device.count_calls_containing("destroy_buffer"), 2);
        assert!(scene.meshes().is_empty());
    }
}
