//! End-to-end import and frame pipeline scenarios

use ember_engine::config::{EngineConfig, PostFxConfig};
use ember_engine::gpu::{RecordingDevice, TextureFormat};
use ember_engine::prelude::*;
use ember_engine::render::binding::MaterialSlot;
use ember_engine::render::material::TextureHandle;
use ember_engine::render::{Material, PostFxManager, RenderTexture};
use ember_engine::scene::{DocLight, DocLightKind, DocMaterial, DocMesh, SceneDocument};
use std::path::Path;

fn triangle_mesh(name: &str, material_index: usize) -> DocMesh {
    DocMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        uv_channels: vec![vec![[0.0, 0.0]; 3]],
        indices: vec![0, 1, 2],
        node: None,
        material_index,
        ..Default::default()
    }
}

/// One directional light, one mesh with material "Foo_lambert", no camera.
/// Expect: key light assigned, one material compiled against "lambert" (the
/// error shader stands in when the files are absent), and a synthesized
/// default camera at the origin with configured parameters.
#[test]
fn scenario_key_light_named_material_no_camera() {
    let mut device = RecordingDevice::new();
    let config = EngineConfig::new();
    let mut scene_manager = SceneManager::new(&mut device, &config);

    let mut document = SceneDocument::new("scenario_one");
    document.materials = vec![DocMaterial::named("Foo_lambert", [0.7, 0.7, 0.7, 1.0])];
    document.meshes = vec![triangle_mesh("tri", 0)];
    document.lights = vec![DocLight {
        name: "sun".to_string(),
        kind: DocLightKind::Directional,
        color: [1.0, 1.0, 1.0],
        intensity: 1.0,
        node: None,
    }];

    scene_manager.import_document(&mut device, &document);
    let scene = scene_manager.scene().expect("scene imported");

    // Key light assigned
    let key = scene.key_light().expect("key light");
    assert_eq!(key.name, "sun");

    // One material, compiled against the "lambert" naming convention; with
    // no shader files on disk the deterministic error shader stands in
    assert_eq!(scene_manager.materials().len(), 1);
    let material = &scene_manager.materials().materials()[0];
    let shader = scene_manager.shaders().get(material.shader()).expect("shader");
    assert!(shader.is_error_fallback());

    // Synthesized default camera at identity with configured parameters
    let camera = scene.main_camera().expect("synthesized camera");
    assert_eq!(camera.name(), "default_camera");
    assert!((camera.fov_y().to_degrees() - config.camera.fov_y_degrees).abs() < 1e-3);
    assert_eq!(camera.near(), config.camera.near);
    assert_eq!(camera.far(), config.camera.far);
    let world = scene.transforms.world(camera.transform());
    let position = ember_engine::foundation::math::utils::translation_of(&world);
    assert!(position.magnitude() < 1e-5);
}

/// A material constructed with four texture slots and none bound performs
/// zero texture binds; sampler uniforms keep their configured units.
#[test]
fn scenario_empty_material_binds_nothing() {
    let mut device = RecordingDevice::new();
    let material = Material::new("hollow", ember_engine::render::ShaderHandle(0), 4);
    assert_eq!(material.texture_count(), 4);

    let textures: Vec<Texture> = Vec::new();
    material.bind_all_textures(&mut device, &textures);
    material.unbind_all_textures(&mut device, &textures);

    assert_eq!(
        device
            .calls()
            .iter()
            .filter(|c| c.starts_with("bind_texture"))
            .count(),
        0
    );
}

/// PostFX with two downsamples allocates exactly three pingpong targets at
/// half, quarter, and quarter resolution, and the additive upsample writes
/// back to the original full-resolution target exactly once.
#[test]
fn scenario_postfx_two_downsamples() {
    let mut device = RecordingDevice::new();
    let config = PostFxConfig {
        num_down_samples: 2,
        blur_passes: 3,
        bloom_threshold: 1.0,
        bloom_intensity: 0.7,
    };
    let mut postfx = PostFxManager::new(&mut device, Path::new("absent"), config, 1920, 1080)
        .expect("postfx allocation");

    assert_eq!(
        postfx.target_sizes(),
        vec![(960, 540), (480, 270), (480, 270)]
    );

    let mut hdr = RenderTexture::new("hdr", 1920, 1080, TextureFormat::Rgba16F);
    hdr.buffer(&mut device).unwrap();
    let hdr_texture = hdr.texture().gpu_texture().unwrap();

    device.clear_log();
    postfx.run(&mut device, &mut hdr).unwrap();

    // Exactly one additive pass, and it attaches the full-resolution target
    assert_eq!(device.count_calls_containing("set_blend mode=Additive"), 1);
    let attach_to_hdr = device.count_calls_containing(&format!("tex={} ", hdr_texture.0));
    assert_eq!(attach_to_hdr, 1, "bloom must write back to the HDR target once");
}

/// Importing a full document and rendering through the engine presents a
/// frame with every mesh drawn inside a material bind scope.
#[test]
fn scenario_full_frame_through_engine() {
    struct DocImporter(SceneDocument);
    impl SceneImporter for DocImporter {
        fn import(
            &self,
            _path: &str,
        ) -> Result<SceneDocument, ember_engine::scene::ImportError> {
            Ok(self.0.clone())
        }
    }

    let mut device = RecordingDevice::new();
    let config = EngineConfig::new();
    let mut engine = Engine::new(&mut device, config).unwrap();

    let mut document = SceneDocument::new("drive");
    document.materials = vec![
        DocMaterial::named("A_lambert", [1.0, 0.0, 0.0, 1.0]),
        DocMaterial::named("B_phong", [0.0, 1.0, 0.0, 1.0]),
    ];
    document.meshes = vec![
        triangle_mesh("one", 0),
        triangle_mesh("two", 1),
        triangle_mesh("three", 0),
    ];

    let mut events = EventQueue::new();
    engine
        .scene_manager_mut()
        .load_scene(&mut device, &mut events, &DocImporter(document), "drive.scene")
        .unwrap();

    device.clear_log();
    engine.step(&mut device).unwrap();
    assert_eq!(device.present_count(), 1);
    assert_eq!(
        device
            .calls()
            .iter()
            .filter(|c| c.starts_with("draw_indexed count=3"))
            .count(),
        3
    );
}

/// Every mesh's material index is either valid or the mesh is excluded from
/// the material grouping without a crash.
#[test]
fn scenario_invalid_material_index_tolerated() {
    let mut device = RecordingDevice::new();
    let config = EngineConfig::new();
    let mut scene_manager = SceneManager::new(&mut device, &config);

    let mut document = SceneDocument::new("tolerant");
    document.materials = vec![DocMaterial::named("Only_lambert", [1.0; 4])];
    document.meshes = vec![triangle_mesh("valid", 0), triangle_mesh("invalid", 99)];

    scene_manager.import_document(&mut device, &document);

    let grouped: usize = scene_manager.material_meshes().iter().map(Vec::len).sum();
    assert_eq!(grouped, 1);
    assert_eq!(scene_manager.scene().unwrap().meshes().len(), 2);
}

/// Texture slot handles out of registry range bind nothing and do not crash.
#[test]
fn scenario_dangling_texture_handle_tolerated() {
    let mut device = RecordingDevice::new();
    let mut material = Material::standard("dangling", ember_engine::render::ShaderHandle(0));
    material.set_texture(MaterialSlot::Albedo, TextureHandle(999));

    let textures: Vec<Texture> = Vec::new();
    material.bind_all_textures(&mut device, &textures);
    assert_eq!(device.count_calls_containing("bind_texture"), 0);
}
