// video.rs — decoded frames painted onto a fixed equirectangular canvas

use crate::media::{AssetBundle, AssetError, MediaEngine, MediaError, MediaInfo};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// 2:1 equirectangular canvas size.
pub const SURFACE_WIDTH: u32 = 1024;
pub const SURFACE_HEIGHT: u32 = 512;

const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum VideoError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

struct SurfaceFrame {
    pixels: RgbaImage,
    generation: u64,
}

/// Shared handle to the canvas the player paints into and the renderer samples from.
#[derive(Clone)]
pub struct VideoSurface {
    inner: Arc<Mutex<SurfaceFrame>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SurfaceFrame {
                pixels: RgbaImage::from_pixel(SURFACE_WIDTH, SURFACE_HEIGHT, Rgba([0, 0, 0, 255])),
                generation: 0,
            })),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (SURFACE_WIDTH, SURFACE_HEIGHT)
    }

    /// Replace the canvas with `frame`, rescaled to the surface size if needed.
    pub fn paint(&self, frame: &RgbaImage) {
        let scaled;
        let frame = if frame.dimensions() == (SURFACE_WIDTH, SURFACE_HEIGHT) {
            frame
        } else {
            scaled = imageops::resize(frame, SURFACE_WIDTH, SURFACE_HEIGHT, FilterType::Triangle);
            &scaled
        };

        if let Ok(mut surface) = self.inner.lock() {
            surface.pixels.copy_from_slice(frame.as_raw());
            surface.generation += 1;
        }
    }

    /// Number of frames painted so far.
    pub fn generation(&self) -> u64 {
        self.inner.lock().map(|s| s.generation).unwrap_or(0)
    }

    /// Run `f` on the pixels if they changed since `seen`; returns the new generation.
    pub fn with_newer<F: FnOnce(&RgbaImage)>(&self, seen: u64, f: F) -> Option<u64> {
        let surface = self.inner.lock().ok()?;
        if surface.generation == seen {
            return None;
        }
        f(&surface.pixels);
        Some(surface.generation)
    }

    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.inner.lock().ok().map(|s| s.pixels.clone())
    }

    /// Identity of the underlying canvas, shared by all clones.
    pub fn same_surface(&self, other: &VideoSurface) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Autoplaying media source bound to a [`VideoSurface`].
///
/// Construction fails if the asset is missing or unreadable; once built,
/// playback runs on its own thread until the media ends or the player drops.
pub struct VideoPlayer {
    surface: VideoSurface,
    path: PathBuf,
    info: MediaInfo,
    playing: Arc<AtomicBool>,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl VideoPlayer {
    pub fn open(
        assets: &AssetBundle,
        name: &str,
        engine: Arc<dyn MediaEngine>,
        looping: bool,
    ) -> Result<Self, VideoError> {
        let path = assets.resolve(name)?;
        let info = engine.probe(&path)?;
        info!(
            "opened {} ({}x{}, animated: {})",
            path.display(),
            info.width,
            info.height,
            info.animated
        );

        let surface = VideoSurface::new();
        let playing = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = channel::<()>();

        let handle = {
            let surface = surface.clone();
            let playing = playing.clone();
            let path = path.clone();
            thread::Builder::new()
                .name("video360-playback".into())
                .spawn(move || {
                    playback_loop(engine.as_ref(), &path, &surface, looping, &stop_rx);
                    playing.store(false, Ordering::SeqCst);
                })
                .map_err(MediaError::Io)?
        };

        Ok(Self {
            surface,
            path,
            info,
            playing,
            worker: Some((stop_tx, handle)),
        })
    }

    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> MediaInfo {
        self.info
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                warn!("playback thread panicked");
            }
        }
    }
}

/// Wait out a frame's display time. Returns `false` when asked to stop.
fn hold(stop: &Receiver<()>, delay: Duration) -> bool {
    matches!(
        stop.recv_timeout(delay.max(MIN_FRAME_DELAY)),
        Err(RecvTimeoutError::Timeout)
    )
}

fn playback_loop(
    engine: &dyn MediaEngine,
    path: &Path,
    surface: &VideoSurface,
    looping: bool,
    stop: &Receiver<()>,
) {
    let mut stream = match engine.open(path) {
        Ok(s) => s,
        Err(e) => {
            warn!("cannot start playback of {}: {}", path.display(), e);
            return;
        }
    };
    let mut frames_this_pass = 0u64;

    loop {
        match stream.next_frame() {
            Some(Ok(frame)) => {
                surface.paint(&frame.image);
                frames_this_pass += 1;
                if !hold(stop, frame.delay) {
                    break;
                }
            }
            Some(Err(e)) => {
                warn!("decode failed in {}: {}", path.display(), e);
                break;
            }
            // A single still frame never needs re-decoding.
            None if looping && frames_this_pass > 1 => {
                debug!("looping {}", path.display());
                stream = match engine.open(path) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("cannot restart {}: {}", path.display(), e);
                        break;
                    }
                };
                frames_this_pass = 0;
            }
            None => {
                debug!("end of media {}", path.display());
                break;
            }
        }
    }
}
