// main.rs — desktop host for the 360° video view

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod renderer;

use renderer::Renderer;

use anyhow::Context;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use video360_viewer::config::ViewerConfig;
use video360_viewer::media::{AssetBundle, ImageMediaEngine, MediaEngine};
use video360_viewer::sensor::SimulatedMotion;
use video360_viewer::video::VideoError;
use video360_viewer::{
    ScreenRotation, ScreenRotationSource, SharedScreenRotation, Video360View, ViewError,
    ViewFrame, ViewOptions, ViewServices,
};
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

/// Everything needed to (re)build a view.
struct Host {
    config: ViewerConfig,
    engine: Arc<dyn MediaEngine>,
    rotation: SharedScreenRotation,
}

impl Host {
    fn open_view(
        &self,
        assets: AssetBundle,
        name: &str,
        frame: ViewFrame,
    ) -> Result<Video360View, ViewError> {
        let services = ViewServices {
            assets,
            engine: self.engine.clone(),
            motion: Box::new(SimulatedMotion::new(self.config.sweep_deg_per_sec)),
            rotation: Arc::new(self.rotation.clone()),
        };
        let options = ViewOptions {
            render_options: self.config.render_options.clone(),
            looping: self.config.looping,
            sensor_interval: self.config.sensor_interval(),
        };
        Video360View::new(frame, name, services, options)
    }

    fn open_file(&self, path: &Path, frame: ViewFrame) -> Result<Video360View, ViewError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.open_view(
            AssetBundle::new(dir, self.config.asset_extension.clone()),
            &name,
            frame,
        )
    }
}

fn pick_media() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Media", &["gif", "jpg", "jpeg", "png", "bmp"])
        .pick_file()
}

fn is_pointer_event(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::CursorMoved { .. }
            | WindowEvent::CursorEntered { .. }
            | WindowEvent::CursorLeft { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. }
            | WindowEvent::Touch(_)
            | WindowEvent::TouchpadMagnify { .. }
            | WindowEvent::TouchpadRotate { .. }
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::load(std::env::args())?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Video 360")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );
    let size = window.inner_size();
    let frame = ViewFrame::new(size.width, size.height);

    let host = Host {
        rotation: SharedScreenRotation::new(ScreenRotation::from_viewport(size.width, size.height)),
        engine: Arc::new(ImageMediaEngine),
        config,
    };

    let assets = AssetBundle::new(
        host.config.asset_dir.clone(),
        host.config.asset_extension.clone(),
    );
    // A missing default video falls back to the file picker; a broken one is fatal.
    let mut view = match host.open_view(assets, &host.config.video, frame) {
        Ok(view) => view,
        Err(ViewError::Video(VideoError::Asset(e))) => {
            warn!("{}; asking for a video instead", e);
            let path = pick_media()
                .with_context(|| format!("no video chosen in place of `{}`", host.config.video))?;
            host.open_file(&path, frame)
                .with_context(|| format!("opening video {}", path.display()))?
        }
        Err(e) => {
            return Err(e).with_context(|| format!("opening video `{}`", host.config.video));
        }
    };

    let mut renderer = pollster::block_on(Renderer::new(
        window.clone(),
        view.scene().sphere(),
        view.render_options(),
    ))?;

    let mut is_fullscreen = false;
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }
                if is_pointer_event(&event) && !view.interaction().accepts_pointer() {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        view.teardown();
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        view.set_frame(ViewFrame::new(new_size.width, new_size.height));
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state != ElementState::Pressed {
                            return;
                        }
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::R) => {
                                let next = host.rotation.current().next();
                                host.rotation.set(next);
                                info!("screen rotation: {:?}", next);
                            }
                            Some(VirtualKeyCode::O) => {
                                if let Some(path) = pick_media() {
                                    match host.open_file(&path, view.frame()) {
                                        Ok(next) => {
                                            view = next;
                                            renderer.reset_video();
                                        }
                                        Err(e) => error!("{}", e),
                                    }
                                }
                            }
                            Some(VirtualKeyCode::F11) => {
                                is_fullscreen = !is_fullscreen;
                                if is_fullscreen {
                                    window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                                } else {
                                    window.set_fullscreen(None);
                                }
                            }
                            _ => {}
                        }
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_frame_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_frame_time).as_secs_f32();
                    frame_count = 0;
                    last_frame_time = now;
                }

                renderer.upload_video(view.surface());
                renderer.update_camera(view.camera());

                let rotation = host.rotation.current();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_status(ctx, &view, rotation, fps);
                });

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        view.teardown();
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => error!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn draw_status(ctx: &egui::Context, view: &Video360View, rotation: ScreenRotation, fps: f32) {
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let player = view.player();
            let name = player
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            ui.label(name);
            let info = player.info();
            ui.label(format!("{}×{}", info.width, info.height));
            if !player.is_playing() {
                ui.label(egui::RichText::new("(ended)").color(egui::Color32::YELLOW));
            }
            ui.label("|");

            ui.label(format!("Rotation: {:?}", rotation));
            ui.label("|");

            let q = view.camera().orientation();
            ui.label(format!("q: ({:.3}, {:.3}, {:.3}, {:.3})", q.x, q.y, q.z, q.w));
            ui.label("|");

            let camera = view.camera();
            ui.label(format!("FOV: {:.0}°×{:.0}°", camera.x_fov, camera.y_fov));
            ui.label("|");
            ui.label(egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN));
            ui.label("|");
            ui.label("R: rotate screen  O: open  F11: fullscreen");
        });
    });
}
