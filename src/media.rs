// media.rs — bundled asset lookup and frame decoding

use image::codecs::gif::GifDecoder;
use image::io::Reader as ImageReader;
use image::{AnimationDecoder, Frames, ImageDecoder, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{name}` not found at {}", path.display())]
    NotFound { name: String, path: PathBuf },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("cannot read media: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decode media: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported media format: {0}")]
    Unsupported(String),
    #[error("media has no frames: {0}")]
    Empty(String),
}

/// Directory of bundled media plus the default extension used when a name has none.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    root: PathBuf,
    extension: String,
}

impl AssetBundle {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Resolve `name` to an existing file under the bundle root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let mut path = self.root.join(name);
        if path.extension().is_none() && !self.extension.is_empty() {
            path.set_extension(&self.extension);
        }
        if path.is_file() {
            Ok(path)
        } else {
            Err(AssetError::NotFound {
                name: name.to_string(),
                path,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub animated: bool,
}

pub struct DecodedFrame {
    pub image: RgbaImage,
    /// How long this frame stays on screen.
    pub delay: Duration,
}

/// A sequence of decoded frames. `None` marks the end of the media.
pub trait FrameStream {
    fn next_frame(&mut self) -> Option<Result<DecodedFrame, MediaError>>;
}

/// Decoding backend. `open` runs on the playback thread, so the stream itself need not be `Send`.
pub trait MediaEngine: Send + Sync {
    /// Check that `path` is readable and decodable without starting playback.
    fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError>;
    fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>, MediaError>;
}

const STILL_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Engine backed by the `image` crate: animated GIF plays frame by frame,
/// any still format shows as a single frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageMediaEngine;

impl ImageMediaEngine {
    fn format_of(path: &Path) -> Result<ImageFormat, MediaError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .format()
            .ok_or_else(|| MediaError::Unsupported(path.display().to_string()))
    }
}

impl MediaEngine for ImageMediaEngine {
    fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        let format = Self::format_of(path)?;
        if format == ImageFormat::Gif {
            let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
            let (width, height) = decoder.dimensions();
            // A readable header is not enough: the first frame must decode too.
            match decoder.into_frames().next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(MediaError::Empty(path.display().to_string())),
            }
            return Ok(MediaInfo {
                width,
                height,
                animated: true,
            });
        }
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(MediaInfo {
            width,
            height,
            animated: false,
        })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>, MediaError> {
        if Self::format_of(path)? == ImageFormat::Gif {
            let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
            return Ok(Box::new(GifStream {
                frames: decoder.into_frames(),
            }));
        }
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_rgba8();
        Ok(Box::new(StillStream { image: Some(image) }))
    }
}

struct GifStream {
    frames: Frames<'static>,
}

impl FrameStream for GifStream {
    fn next_frame(&mut self) -> Option<Result<DecodedFrame, MediaError>> {
        let frame = match self.frames.next()? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e.into())),
        };
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay = Duration::from_micros(numer as u64 * 1000 / denom.max(1) as u64);
        Some(Ok(DecodedFrame {
            image: frame.into_buffer(),
            delay,
        }))
    }
}

struct StillStream {
    image: Option<RgbaImage>,
}

impl FrameStream for StillStream {
    fn next_frame(&mut self) -> Option<Result<DecodedFrame, MediaError>> {
        self.image.take().map(|image| {
            Ok(DecodedFrame {
                image,
                delay: STILL_FRAME_DELAY,
            })
        })
    }
}
