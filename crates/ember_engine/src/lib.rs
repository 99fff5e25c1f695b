//! # Ember Engine
//!
//! A hobby real-time 3D rendering engine with a deferred, post-processed
//! pipeline.
//!
//! ## Features
//!
//! - **Scene graph**: hierarchical transforms with on-demand world
//!   composition
//! - **Asset import pipeline**: external scene documents become entities,
//!   materials, and batched draw groups
//! - **Explicit resource lifecycles**: create → buffer → bind → destroy for
//!   every GPU wrapper, single-owner teardown
//! - **Deferred shading**: G-buffer geometry pass, fullscreen lighting
//!   resolve, bloom post-processing, image-based lighting
//! - **Headless testing**: the GPU boundary is a trait; a call-recording
//!   device drives the whole engine without a window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, _context: &mut EngineContext<'_>) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!
//!     fn fixed_update(&mut self, _context: &mut EngineContext<'_>, _step_seconds: f32) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut device = RecordingDevice::new();
//!     let mut engine = Engine::new(&mut device, config)?;
//!     let mut platform = NullPlatform;
//!     engine.run(&mut device, &mut platform, &mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod gpu;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{
    Application, Engine, EngineContext, EngineError, NullPlatform, Platform, PlatformEvent,
};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EngineConfig},
        events::{EngineEvent, EventQueue, Priority},
        foundation::{
            math::{Mat4, Mat4Ext, Quat, Vec3, Vec4},
            time::{FrameClock, Stopwatch},
        },
        gpu::{GraphicsDevice, RecordingDevice},
        render::{
            Camera, CameraRole, ImageBasedLight, Light, LightKind, Material, Mesh,
            PostFxManager, RenderManager, RenderTexture, Shader, Texture,
        },
        scene::{
            Aabb, Scene, SceneDocument, SceneImporter, SceneManager, TransformGraph, TransformId,
        },
        Application, Engine, EngineContext, EngineError, NullPlatform, Platform, PlatformEvent,
    };
}
