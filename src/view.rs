// view.rs — the 360° video view: scene, playback and sensor wiring

use crate::camera::{CameraRig, GazeTarget};
use crate::gaze::{map_gaze, ScreenRotationSource};
use crate::media::{AssetBundle, MediaEngine};
use crate::scene::VideoScene;
use crate::sensor::{MotionEvent, MotionService};
use crate::video::{VideoError, VideoPlayer, VideoSurface};
use glam::Quat;
use log::{debug, info};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const SENSOR_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("cannot load video: {0}")]
    Video(#[from] VideoError),
}

/// View bounds in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrame {
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

impl ViewFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Handed to the renderer untouched.
    pub render_options: Map<String, Value>,
    pub looping: bool,
    pub sensor_interval: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            render_options: Map::new(),
            looping: false,
            sensor_interval: SENSOR_INTERVAL,
        }
    }
}

/// The camera follows the sensor only; touch and drag never move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionPolicy {
    pub camera_control: bool,
    pub user_interaction: bool,
}

impl InteractionPolicy {
    /// Whether pointer and touch input may reach the camera at all.
    pub fn accepts_pointer(&self) -> bool {
        self.user_interaction && self.camera_control
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Running,
    TornDown,
}

/// External collaborators the view is built against.
pub struct ViewServices {
    pub assets: AssetBundle,
    pub engine: Arc<dyn MediaEngine>,
    pub motion: Box<dyn MotionService>,
    pub rotation: Arc<dyn ScreenRotationSource>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Applied(Quat),
    Skipped,
    Expired,
}

/// Per-sample handler: maps the attitude and overwrites the camera orientation.
pub struct GazeTick {
    target: GazeTarget,
    rotation: Arc<dyn ScreenRotationSource>,
}

impl GazeTick {
    pub(crate) fn new(camera: &CameraRig, rotation: Arc<dyn ScreenRotationSource>) -> Self {
        Self {
            target: camera.gaze_target(),
            rotation,
        }
    }

    pub fn on_event(&self, event: MotionEvent) -> TickOutcome {
        let attitude = match event {
            Ok(attitude) => attitude,
            Err(e) => {
                debug!("skipping motion tick: {}", e);
                return TickOutcome::Skipped;
            }
        };
        let q = map_gaze(attitude, self.rotation.current());
        if self.target.write(q) {
            TickOutcome::Applied(q)
        } else {
            TickOutcome::Expired
        }
    }
}

pub struct Video360View {
    frame: ViewFrame,
    options: ViewOptions,
    interaction: InteractionPolicy,
    player: VideoPlayer,
    scene: VideoScene,
    motion: Box<dyn MotionService>,
    state: ViewState,
}

impl Video360View {
    /// Build the view and start playback and motion updates.
    ///
    /// The only failure is a missing or unreadable video; sensor trouble later
    /// on never reaches the caller.
    pub fn new(
        frame: ViewFrame,
        video_name: &str,
        services: ViewServices,
        options: ViewOptions,
    ) -> Result<Self, ViewError> {
        let ViewServices {
            assets,
            engine,
            mut motion,
            rotation,
        } = services;

        let player = VideoPlayer::open(&assets, video_name, engine, options.looping)?;
        let scene = VideoScene::new(player.surface().clone());

        let tick = GazeTick::new(scene.camera(), rotation);
        motion.subscribe(
            options.sensor_interval,
            Box::new(move |event| {
                tick.on_event(event);
            }),
        );

        info!(
            "360 view running: {} in {}x{}",
            player.path().display(),
            frame.width,
            frame.height
        );

        Ok(Self {
            frame,
            options,
            interaction: InteractionPolicy {
                camera_control: false,
                user_interaction: false,
            },
            player,
            scene,
            motion,
            state: ViewState::Running,
        })
    }

    pub fn frame(&self) -> ViewFrame {
        self.frame
    }

    pub fn set_frame(&mut self, frame: ViewFrame) {
        self.frame = frame;
    }

    pub fn interaction(&self) -> InteractionPolicy {
        self.interaction
    }

    pub fn render_options(&self) -> &Map<String, Value> {
        &self.options.render_options
    }

    pub fn scene(&self) -> &VideoScene {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        self.scene.camera()
    }

    pub fn surface(&self) -> &VideoSurface {
        self.player.surface()
    }

    pub fn player(&self) -> &VideoPlayer {
        &self.player
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Stop motion updates. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.state == ViewState::TornDown {
            return;
        }
        self.motion.unsubscribe();
        self.state = ViewState::TornDown;
        info!("360 view torn down");
    }
}

impl Drop for Video360View {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::{AttitudeSample, ScreenRotation, SharedScreenRotation};
    use crate::media::tests::write_gif;
    use crate::media::ImageMediaEngine;
    use crate::sensor::{ManualMotion, MotionFeed, SensorError, SimulatedMotion};
    use glam::DQuat;
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        view: Video360View,
        feed: MotionFeed,
        rotation: SharedScreenRotation,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        write_gif(&dir.path().join("tour.gif"), &[[40, 80, 120, 255]], 16, 8);

        let motion = ManualMotion::new();
        let feed = motion.feed();
        let rotation = SharedScreenRotation::new(ScreenRotation::Portrait);
        let services = ViewServices {
            assets: AssetBundle::new(dir.path(), "gif"),
            engine: Arc::new(ImageMediaEngine),
            motion: Box::new(motion),
            rotation: Arc::new(rotation.clone()),
        };
        let view = Video360View::new(ViewFrame::new(800, 600), "tour", services, ViewOptions::default())
            .unwrap();
        Fixture {
            _dir: dir,
            view,
            feed,
            rotation,
        }
    }

    fn pitched() -> AttitudeSample {
        AttitudeSample::from_quat(DQuat::from_rotation_x(0.5))
    }

    #[test]
    fn construction_wires_scene_and_policy() {
        let f = fixture();
        assert_eq!(f.view.state(), ViewState::Running);
        assert!(f.view.scene().sphere().diffuse().same_surface(f.view.surface()));
        assert_eq!(
            f.view.interaction(),
            InteractionPolicy {
                camera_control: false,
                user_interaction: false,
            }
        );
        assert_eq!(f.view.camera().orientation(), Quat::IDENTITY);
        assert!(!f.view.interaction().accepts_pointer());
    }

    #[test]
    fn pointer_needs_both_interaction_and_camera_control() {
        let policy = |camera_control, user_interaction| InteractionPolicy {
            camera_control,
            user_interaction,
        };
        assert!(policy(true, true).accepts_pointer());
        assert!(!policy(true, false).accepts_pointer());
        assert!(!policy(false, true).accepts_pointer());
    }

    #[test]
    fn sample_updates_camera_with_current_rotation() {
        let f = fixture();
        assert!(f.feed.deliver(Ok(pitched())));
        assert_eq!(
            f.view.camera().orientation(),
            map_gaze(pitched(), ScreenRotation::Portrait)
        );

        f.rotation.set(ScreenRotation::LandscapeLeft);
        f.feed.deliver(Ok(pitched()));
        assert_eq!(
            f.view.camera().orientation(),
            map_gaze(pitched(), ScreenRotation::LandscapeLeft)
        );
    }

    #[test]
    fn sensor_error_leaves_orientation_unchanged() {
        let f = fixture();
        f.feed.deliver(Ok(pitched()));
        let before = f.view.camera().orientation();

        f.feed.deliver(Err(SensorError::Unavailable));
        f.feed.deliver(Err(SensorError::MissingSample));
        assert_eq!(f.view.camera().orientation(), before);
    }

    #[test]
    fn teardown_stops_updates_and_is_idempotent() {
        let mut f = fixture();
        f.view.teardown();
        f.view.teardown();
        assert_eq!(f.view.state(), ViewState::TornDown);

        assert!(!f.feed.deliver(Ok(pitched())));
        assert_eq!(f.view.camera().orientation(), Quat::IDENTITY);
    }

    #[test]
    fn late_tick_after_camera_is_gone_is_a_no_op() {
        let rotation: Arc<dyn ScreenRotationSource> = Arc::new(SharedScreenRotation::default());
        let camera = CameraRig::new();
        let tick = GazeTick::new(&camera, rotation);
        assert!(matches!(tick.on_event(Ok(pitched())), TickOutcome::Applied(_)));

        drop(camera);
        assert_eq!(tick.on_event(Ok(pitched())), TickOutcome::Expired);
        assert_eq!(tick.on_event(Err(SensorError::Unavailable)), TickOutcome::Skipped);
    }

    #[test]
    fn missing_video_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let services = ViewServices {
            assets: AssetBundle::new(dir.path(), "gif"),
            engine: Arc::new(ImageMediaEngine),
            motion: Box::new(ManualMotion::new()),
            rotation: Arc::new(SharedScreenRotation::default()),
        };
        let result = Video360View::new(ViewFrame::new(10, 10), "ghost", services, ViewOptions::default());
        assert!(matches!(result, Err(ViewError::Video(VideoError::Asset(_)))));
    }

    #[test]
    fn render_options_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        write_gif(&dir.path().join("a.gif"), &[[0, 0, 0, 255]], 4, 2);
        let mut options = ViewOptions::default();
        options
            .render_options
            .insert("vsync".into(), Value::Bool(false));
        let services = ViewServices {
            assets: AssetBundle::new(dir.path(), "gif"),
            engine: Arc::new(ImageMediaEngine),
            motion: Box::new(ManualMotion::new()),
            rotation: Arc::new(SharedScreenRotation::default()),
        };
        let view = Video360View::new(ViewFrame::new(10, 10), "a", services, options).unwrap();
        assert_eq!(view.render_options().get("vsync"), Some(&Value::Bool(false)));
    }

    #[test]
    fn teardown_freezes_a_threaded_motion_source() {
        let dir = tempfile::tempdir().unwrap();
        write_gif(&dir.path().join("sweep.gif"), &[[0, 0, 0, 255]], 4, 2);
        let services = ViewServices {
            assets: AssetBundle::new(dir.path(), "gif"),
            engine: Arc::new(ImageMediaEngine),
            motion: Box::new(SimulatedMotion::new(30.0)),
            rotation: Arc::new(SharedScreenRotation::default()),
        };
        let options = ViewOptions {
            sensor_interval: Duration::from_millis(2),
            ..ViewOptions::default()
        };
        let mut view = Video360View::new(ViewFrame::new(10, 10), "sweep", services, options).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while view.camera().orientation() == Quat::IDENTITY && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert_ne!(view.camera().orientation(), Quat::IDENTITY);

        view.teardown();
        let frozen = view.camera().orientation();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(view.camera().orientation(), frozen);
        assert_eq!(view.state(), ViewState::TornDown);
    }
}
