// camera.rs — camera rig at the sphere centre

use glam::{Mat4, Quat, Vec3};
use std::sync::{Arc, RwLock, Weak};

pub const DEFAULT_FOV_DEGREES: f32 = 60.0;

/// Camera node fixed at the world origin. Only its orientation changes,
/// and only through a [`GazeTarget`] handed out by the view.
pub struct CameraRig {
    position: Vec3,
    /// Horizontal field of view in degrees.
    pub x_fov: f32,
    /// Vertical field of view in degrees.
    pub y_fov: f32,
    orientation: Arc<RwLock<Quat>>,
}

impl CameraRig {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            x_fov: DEFAULT_FOV_DEGREES,
            y_fov: DEFAULT_FOV_DEGREES,
            orientation: Arc::new(RwLock::new(Quat::IDENTITY)),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Latest orientation written by the sensor tick.
    pub fn orientation(&self) -> Quat {
        match self.orientation.read() {
            Ok(q) => *q,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Non-owning write handle for the tick handler.
    pub(crate) fn gaze_target(&self) -> GazeTarget {
        GazeTarget {
            orientation: Arc::downgrade(&self.orientation),
        }
    }

    /// View matrix (inverse of the camera's world transform; position is the origin).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.orientation().conjugate())
    }

    /// Right-handed, depth 0..1 perspective using independent horizontal and vertical FOV.
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        let w = 1.0 / (self.x_fov.to_radians() * 0.5).tan();
        let h = 1.0 / (self.y_fov.to_radians() * 0.5).tan();
        let r = far / (near - far);
        Mat4::from_cols(
            glam::Vec4::new(w, 0.0, 0.0, 0.0),
            glam::Vec4::new(0.0, h, 0.0, 0.0),
            glam::Vec4::new(0.0, 0.0, r, -1.0),
            glam::Vec4::new(0.0, 0.0, r * near, 0.0),
        )
    }

    pub fn view_projection(&self, near: f32, far: f32) -> Mat4 {
        self.projection_matrix(near, far) * self.view_matrix()
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak back-reference from the sensor tick to the camera orientation.
/// Writes after the rig is gone are ignored.
#[derive(Clone)]
pub(crate) struct GazeTarget {
    orientation: Weak<RwLock<Quat>>,
}

impl GazeTarget {
    /// Overwrite the orientation. Returns `false` if the rig no longer exists.
    pub(crate) fn write(&self, q: Quat) -> bool {
        let Some(cell) = self.orientation.upgrade() else {
            return false;
        };
        match cell.write() {
            Ok(mut slot) => *slot = q,
            Err(poisoned) => *poisoned.into_inner() = q,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rig_starts_at_origin_with_fixed_fov() {
        let rig = CameraRig::new();
        assert_eq!(rig.position(), Vec3::ZERO);
        assert_eq!(rig.x_fov, 60.0);
        assert_eq!(rig.y_fov, 60.0);
        assert_eq!(rig.orientation(), Quat::IDENTITY);
    }

    #[test]
    fn target_writes_through_until_rig_dropped() {
        let rig = CameraRig::new();
        let target = rig.gaze_target();
        let q = Quat::from_rotation_y(0.3);
        assert!(target.write(q));
        assert_eq!(rig.orientation(), q);

        drop(rig);
        assert!(!target.write(Quat::IDENTITY));
    }

    #[test]
    fn identity_camera_looks_down_negative_z() {
        let rig = CameraRig::new();
        let clip = rig.view_projection(0.1, 100.0) * glam::Vec4::new(0.0, 0.0, -10.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn sixty_degree_frustum_edges() {
        let rig = CameraRig::new();
        let edge = (30f32).to_radians().tan() * 10.0;
        let clip = rig.projection_matrix(0.1, 100.0) * glam::Vec4::new(edge, edge, -10.0, 1.0);
        assert!((clip.x / clip.w - 1.0).abs() < 1e-5);
        assert!((clip.y / clip.w - 1.0).abs() < 1e-5);
    }
}
