//! Atrium demo application
//!
//! Builds a small authored scene (a lit courtyard of crates), imports it
//! through the scene manager, and drives the engine loop headless against
//! the call-recording device. Useful for watching the full frame protocol
//! in a terminal without a window or GPU.

use ember_engine::prelude::*;
use ember_engine::scene::{DocCamera, DocLight, DocLightKind, DocMaterial, DocMesh, DocNode};

/// In-memory importer handing back the authored atrium document
struct AtriumImporter;

impl SceneImporter for AtriumImporter {
    fn import(&self, _path: &str) -> Result<SceneDocument, ember_engine::scene::ImportError> {
        Ok(build_atrium())
    }
}

fn build_atrium() -> SceneDocument {
    let mut document = SceneDocument::new("atrium");

    document.materials = vec![
        DocMaterial::named("Floor_lambert", [0.55, 0.5, 0.45, 1.0]),
        DocMaterial::named("Crate_phong", [0.8, 0.6, 0.3, 1.0]),
    ];

    document.nodes = vec![
        DocNode::new("atrium_root", Mat4::identity()),
        DocNode {
            name: "crate_row".to_string(),
            local: Mat4::new_translation(&Vec3::new(0.0, 0.5, -4.0)),
            parent: Some(0),
            children: Vec::new(),
        },
    ];
    document.nodes[0].children = vec![1];

    document.meshes = vec![
        quad_mesh("floor", 0, Some(0), 12.0),
        box_mesh("crate_a", 1, Some(1)),
    ];

    document.lights = vec![
        DocLight {
            name: "sun".to_string(),
            kind: DocLightKind::Directional,
            color: [1.0, 0.96, 0.9],
            intensity: 1.2,
            node: Some(0),
        },
        DocLight {
            name: "sky_ambient".to_string(),
            kind: DocLightKind::Ambient,
            color: [0.4, 0.45, 0.55],
            intensity: 0.25,
            node: None,
        },
    ];

    document.cameras = vec![DocCamera {
        name: "overview".to_string(),
        fov_y_degrees: 55.0,
        near: 0.1,
        far: 200.0,
        node: None,
    }];

    document
}

fn quad_mesh(name: &str, material_index: usize, node: Option<usize>, half_size: f32) -> DocMesh {
    DocMesh {
        name: name.to_string(),
        positions: vec![
            [-half_size, 0.0, -half_size],
            [half_size, 0.0, -half_size],
            [half_size, 0.0, half_size],
            [-half_size, 0.0, half_size],
        ],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        uv_channels: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
        indices: vec![0, 1, 2, 2, 3, 0],
        node,
        material_index,
        ..Default::default()
    }
}

fn box_mesh(name: &str, material_index: usize, node: Option<usize>) -> DocMesh {
    let corners = [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    DocMesh {
        name: name.to_string(),
        positions: corners.to_vec(),
        normals: vec![[0.0, 1.0, 0.0]; 8],
        uv_channels: vec![vec![[0.0, 0.0]; 8]],
        indices: vec![
            0, 1, 2, 2, 3, 0, 4, 6, 5, 6, 4, 7, 0, 3, 7, 7, 4, 0, 1, 5, 6, 6, 2, 1, 3, 2, 6, 6,
            7, 3, 0, 4, 5, 5, 1, 0,
        ],
        node,
        material_index,
        ..Default::default()
    }
}

struct AtriumApp {
    frames_left: u32,
}

impl Application for AtriumApp {
    fn initialize(&mut self, context: &mut EngineContext<'_>) -> Result<(), EngineError> {
        log::info!("loading the atrium scene");
        context
            .scene_manager
            .load_scene(context.device, context.events, &AtriumImporter, "atrium.scene")
            .map_err(|e| EngineError::Application(e.to_string()))?;

        if let Some(scene) = context.scene_manager.scene() {
            let bounds = scene.world_bounds();
            log::info!(
                "scene ready: {} objects, bounds min {:?} max {:?}",
                scene.game_objects().len(),
                bounds.min,
                bounds.max
            );
        }
        Ok(())
    }

    fn fixed_update(&mut self, context: &mut EngineContext<'_>, _step_seconds: f32) {
        if self.frames_left == 0 {
            context.events.post(EngineEvent::QuitRequested);
            return;
        }
        self.frames_left -= 1;

        // Slowly orbit the player rig
        if let Some(scene) = context.scene_manager.scene_mut() {
            let rig_node = scene.find_game_object("player_rig").map(|rig| rig.transform);
            if let Some(node) = rig_node {
                scene.transforms.rotate_y(node, 0.01);
            }
        }
    }

    fn shutdown(&mut self, _context: &mut EngineContext<'_>) {
        log::info!("atrium demo finished");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = EngineConfig::default();
    config.window.title = "Atrium".to_string();
    config.fixed_step_seconds = 1.0 / 120.0;

    let mut device = RecordingDevice::new();
    let mut engine = Engine::new(&mut device, config)?;
    let mut platform = NullPlatform;
    let mut app = AtriumApp { frames_left: 240 };

    engine.run(&mut device, &mut platform, &mut app)?;

    log::info!(
        "recorded {} device calls across {} presents",
        device.calls().len(),
        device.present_count()
    );
    Ok(())
}
