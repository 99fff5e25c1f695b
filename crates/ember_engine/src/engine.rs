//! Core engine: fixed-timestep loop and subsystem ownership
//!
//! The engine owns every subsystem explicitly — event queue, scene manager,
//! render manager — and passes them by reference to collaborators; there is
//! no global state, and tests construct isolated instances. Each outer
//! iteration runs Input → Time → {fixed steps: event drain, update} →
//! Render in strict single-threaded sequence.

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventQueue};
use crate::foundation::time::FrameClock;
use crate::gpu::{GpuError, GraphicsDevice};
use crate::render::RenderManager;
use crate::scene::SceneManager;
use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("engine initialization failed: {0}")]
    InitializationFailed(String),

    /// Rendering error
    #[error("rendering error: {0}")]
    Render(#[from] GpuError),

    /// Application error
    #[error("application error: {0}")]
    Application(String),
}

/// Discrete input/window notifications delivered by the platform boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The window close button was pressed
    CloseRequested,
    /// The window surface changed size
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// A key changed state
    Key {
        /// Platform scan code
        code: u32,
        /// Pressed or released
        pressed: bool,
    },
    /// The pointer moved
    PointerMoved {
        /// Horizontal delta
        dx: f32,
        /// Vertical delta
        dy: f32,
    },
}

/// Windowing/input boundary
///
/// The engine never pumps OS events itself; the host supplies them here.
pub trait Platform {
    /// Collect pending events since the last poll
    fn poll_events(&mut self, out: &mut Vec<PlatformEvent>);
}

/// Headless platform that never produces events
#[derive(Debug, Default)]
pub struct NullPlatform;

impl Platform for NullPlatform {
    fn poll_events(&mut self, _out: &mut Vec<PlatformEvent>) {}
}

/// Application hooks driven by the engine loop
pub trait Application {
    /// Called once before the loop starts
    fn initialize(&mut self, context: &mut EngineContext<'_>) -> Result<(), EngineError>;

    /// Called once per fixed step with the step length in seconds
    fn fixed_update(&mut self, context: &mut EngineContext<'_>, step_seconds: f32);

    /// Called once as the loop exits
    fn shutdown(&mut self, _context: &mut EngineContext<'_>) {}
}

/// Mutable engine state handed to application hooks
pub struct EngineContext<'a> {
    /// The GPU device
    pub device: &'a mut dyn GraphicsDevice,
    /// The event queue
    pub events: &'a mut EventQueue,
    /// The scene manager
    pub scene_manager: &'a mut SceneManager,
    /// The render manager
    pub render_manager: &'a mut RenderManager,
}

/// The engine: subsystem owner and loop driver
pub struct Engine {
    config: EngineConfig,
    events: EventQueue,
    scene_manager: SceneManager,
    render_manager: RenderManager,
    clock: FrameClock,
    running: bool,
}

impl Engine {
    /// Construct every subsystem from configuration
    pub fn new(device: &mut dyn GraphicsDevice, config: EngineConfig) -> Result<Self, EngineError> {
        log::info!("initializing engine ({}x{})", config.window.width, config.window.height);
        let scene_manager = SceneManager::new(device, &config);
        let render_manager = RenderManager::new(device, &config)?;
        let clock = FrameClock::new(config.fixed_step_seconds);
        Ok(Self {
            config,
            events: EventQueue::new(),
            scene_manager,
            render_manager,
            clock,
            running: true,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The scene manager
    pub fn scene_manager(&self) -> &SceneManager {
        &self.scene_manager
    }

    /// Mutable scene manager access
    pub fn scene_manager_mut(&mut self) -> &mut SceneManager {
        &mut self.scene_manager
    }

    /// The event queue
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Whether the loop will keep running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Request shutdown at the end of the current iteration
    pub fn quit(&mut self) {
        log::info!("engine shutdown requested");
        self.running = false;
    }

    /// Run the loop until a quit request arrives
    pub fn run<A: Application>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        platform: &mut dyn Platform,
        app: &mut A,
    ) -> Result<(), EngineError> {
        {
            let mut context = EngineContext {
                device: &mut *device,
                events: &mut self.events,
                scene_manager: &mut self.scene_manager,
                render_manager: &mut self.render_manager,
            };
            app.initialize(&mut context)?;
        }

        log::info!("starting main loop");
        let mut platform_events = Vec::new();

        while self.running {
            // Input
            platform_events.clear();
            platform.poll_events(&mut platform_events);
            for event in platform_events.drain(..) {
                self.handle_platform_event(event);
            }

            // Time
            self.clock.tick();

            // Fixed steps: drain events once per step, then update
            while self.clock.consume_step() {
                self.drain_engine_events(device)?;
                let mut context = EngineContext {
                    device: &mut *device,
                    events: &mut self.events,
                    scene_manager: &mut self.scene_manager,
                    render_manager: &mut self.render_manager,
                };
                app.fixed_update(&mut context, self.clock.step_seconds());
                if !self.running {
                    break;
                }
            }

            // Render
            if self.running {
                if let Some(view) = self.scene_manager.render_view() {
                    self.render_manager.render_frame(device, view)?;
                } else {
                    device.present();
                }
            }
        }

        let mut context = EngineContext {
            device: &mut *device,
            events: &mut self.events,
            scene_manager: &mut self.scene_manager,
            render_manager: &mut self.render_manager,
        };
        app.shutdown(&mut context);

        self.scene_manager.shutdown(device);
        self.render_manager.destroy(device);
        log::info!("engine shutdown complete");
        Ok(())
    }

    /// Drive a single outer iteration manually (harness/test entry point)
    pub fn step(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), EngineError> {
        self.clock.tick();
        while self.clock.consume_step() {
            self.drain_engine_events(device)?;
            if !self.running {
                return Ok(());
            }
        }
        if let Some(view) = self.scene_manager.render_view() {
            self.render_manager.render_frame(device, view)?;
        }
        Ok(())
    }

    fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::CloseRequested => {
                self.events
                    .post_with_priority(EngineEvent::QuitRequested, crate::events::Priority::Urgent);
            }
            PlatformEvent::Resized { width, height } => {
                self.events.post(EngineEvent::WindowResized { width, height });
            }
            PlatformEvent::Key { .. } | PlatformEvent::PointerMoved { .. } => {
                // Discrete input state is the application's concern; the
                // engine only routes lifecycle events
            }
        }
    }

    fn drain_engine_events(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), EngineError> {
        for event in self.events.drain() {
            match event {
                EngineEvent::QuitRequested => {
                    self.running = false;
                }
                EngineEvent::WindowResized { width, height } => {
                    self.render_manager.resize(device, width, height)?;
                }
                EngineEvent::SceneLoaded { name } => {
                    log::info!("scene '{name}' ready");
                }
                EngineEvent::SceneLoadFailed { path } => {
                    log::error!("scene '{path}' failed to load");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    struct QuitAfter {
        steps_left: u32,
    }

    impl Application for QuitAfter {
        fn initialize(&mut self, _context: &mut EngineContext<'_>) -> Result<(), EngineError> {
            Ok(())
        }

        fn fixed_update(&mut self, context: &mut EngineContext<'_>, _step_seconds: f32) {
            if self.steps_left == 0 {
                context.events.post(EngineEvent::QuitRequested);
            } else {
                self.steps_left -= 1;
            }
        }
    }

    #[test]
    fn test_loop_exits_on_quit_event() {
        let mut device = RecordingDevice::new();
        let mut config = EngineConfig::new();
        config.fixed_step_seconds = 0.0001; // steps accumulate immediately
        let mut engine = Engine::new(&mut device, config).unwrap();
        let mut platform = NullPlatform;
        let mut app = QuitAfter { steps_left: 3 };

        engine
            .run(&mut device, &mut platform, &mut app)
            .unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_close_request_posts_urgent_quit() {
        let mut device = RecordingDevice::new();
        let mut engine = Engine::new(&mut device, EngineConfig::new()).unwrap();

        engine.events_mut().post(EngineEvent::SceneLoaded {
            name: "pending".to_string(),
        });
        engine.handle_platform_event(PlatformEvent::CloseRequested);

        let drained: Vec<_> = engine.events_mut().drain().into_iter().collect();
        assert_eq!(drained[0], EngineEvent::QuitRequested);
    }

    #[test]
    fn test_resize_event_propagates_to_render_manager() {
        let mut device = RecordingDevice::new();
        let mut engine = Engine::new(&mut device, EngineConfig::new()).unwrap();

        engine.events_mut().post(EngineEvent::WindowResized {
            width: 800,
            height: 600,
        });
        engine.drain_engine_events(&mut device).unwrap();
        assert!(engine.is_running());
    }
}
