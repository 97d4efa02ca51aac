// gaze.rs — device attitude to camera orientation

use glam::{DQuat, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// How the host currently presents its content relative to the physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenRotation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    Unknown,
}

impl ScreenRotation {
    pub const ALL: [ScreenRotation; 5] = [
        ScreenRotation::Portrait,
        ScreenRotation::PortraitUpsideDown,
        ScreenRotation::LandscapeLeft,
        ScreenRotation::LandscapeRight,
        ScreenRotation::Unknown,
    ];

    /// Guess the rotation from a viewport: wider than tall reads as landscape.
    pub fn from_viewport(width: u32, height: u32) -> Self {
        if width > height {
            ScreenRotation::LandscapeRight
        } else {
            ScreenRotation::Portrait
        }
    }

    /// Next variant in a fixed cycle, `Unknown` included.
    pub fn next(self) -> Self {
        match self {
            ScreenRotation::Portrait => ScreenRotation::LandscapeRight,
            ScreenRotation::LandscapeRight => ScreenRotation::PortraitUpsideDown,
            ScreenRotation::PortraitUpsideDown => ScreenRotation::LandscapeLeft,
            ScreenRotation::LandscapeLeft => ScreenRotation::Unknown,
            ScreenRotation::Unknown => ScreenRotation::Portrait,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ScreenRotation::Portrait => 0,
            ScreenRotation::PortraitUpsideDown => 1,
            ScreenRotation::LandscapeLeft => 2,
            ScreenRotation::LandscapeRight => 3,
            ScreenRotation::Unknown => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ScreenRotation::Portrait,
            1 => ScreenRotation::PortraitUpsideDown,
            2 => ScreenRotation::LandscapeLeft,
            3 => ScreenRotation::LandscapeRight,
            _ => ScreenRotation::Unknown,
        }
    }
}

/// Something the tick handler can ask for the rotation in effect right now.
pub trait ScreenRotationSource: Send + Sync {
    fn current(&self) -> ScreenRotation;
}

/// Rotation cell written by the host and read on the sensor thread.
#[derive(Debug, Clone, Default)]
pub struct SharedScreenRotation {
    value: Arc<AtomicU8>,
}

impl SharedScreenRotation {
    pub fn new(rotation: ScreenRotation) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(rotation.to_u8())),
        }
    }

    pub fn set(&self, rotation: ScreenRotation) {
        self.value.store(rotation.to_u8(), Ordering::Relaxed);
    }
}

impl ScreenRotationSource for SharedScreenRotation {
    fn current(&self) -> ScreenRotation {
        ScreenRotation::from_u8(self.value.load(Ordering::Relaxed))
    }
}

/// Device attitude as reported by the motion sensor. Assumed unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl AttitudeSample {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    pub fn from_quat(q: DQuat) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }

    /// Narrow to single precision; the mapping runs in f32.
    pub fn to_quat(self) -> Quat {
        Quat::from_xyzw(self.x as f32, self.y as f32, self.z as f32, self.w as f32)
    }
}

/// Corrective rotation plus the axis remap applied after it.
struct GazeCorrection {
    axis: Vec3,
    angle: f32,
    remap: fn(Quat) -> Quat,
}

fn correction_for(rotation: ScreenRotation) -> GazeCorrection {
    match rotation {
        ScreenRotation::LandscapeRight => GazeCorrection {
            axis: Vec3::Y,
            angle: FRAC_PI_2,
            remap: |q| Quat::from_xyzw(-q.y, q.x, q.z, q.w),
        },
        ScreenRotation::LandscapeLeft => GazeCorrection {
            axis: Vec3::Y,
            angle: -FRAC_PI_2,
            remap: |q| Quat::from_xyzw(q.y, -q.x, q.z, q.w),
        },
        ScreenRotation::PortraitUpsideDown => GazeCorrection {
            axis: Vec3::X,
            angle: FRAC_PI_2,
            remap: |q| Quat::from_xyzw(-q.x, -q.y, q.z, q.w),
        },
        // One row for both: an unknown rotation is read as portrait.
        ScreenRotation::Portrait | ScreenRotation::Unknown => GazeCorrection {
            axis: Vec3::X,
            angle: FRAC_PI_2,
            remap: |q| q,
        },
    }
}

/// Map a device attitude into the camera orientation for the given screen rotation.
///
/// The sensor frame is fixed to the physical device while the OS rotates the
/// screen content, so the attitude is first corrected by a quarter turn
/// (`q = cq * aq`) and then its x/y axes are permuted into the screen frame.
/// `z` and `w` pass through untouched.
pub fn map_gaze(attitude: AttitudeSample, rotation: ScreenRotation) -> Quat {
    let correction = correction_for(rotation);
    let cq = Quat::from_axis_angle(correction.axis, correction.angle);
    let q = cq * attitude.to_quat();
    (correction.remap)(q)
}
