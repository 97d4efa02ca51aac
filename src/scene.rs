// scene.rs — the two-node scene: video sphere and camera rig

use crate::camera::CameraRig;
use crate::mesh::{build_sphere, SphereMesh, DEFAULT_LATITUDE_BANDS, DEFAULT_LONGITUDE_BANDS};
use crate::video::VideoSurface;
use glam::Vec3;

pub const SPHERE_RADIUS: f32 = 20.0;

/// Shape and material flags of the sphere, independent of the bound surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereGeometry {
    pub radius: f32,
    pub position: Vec3,
    pub double_sided: bool,
}

/// Sphere mesh whose diffuse material is the video surface.
pub struct SphereNode {
    geometry: SphereGeometry,
    mesh: SphereMesh,
    diffuse: VideoSurface,
}

impl SphereNode {
    /// Build the fixed video sphere: radius 20, at the origin, visible from inside.
    pub fn build(diffuse: VideoSurface) -> Self {
        let geometry = SphereGeometry {
            radius: SPHERE_RADIUS,
            position: Vec3::ZERO,
            double_sided: true,
        };
        Self {
            mesh: build_sphere(geometry.radius, DEFAULT_LATITUDE_BANDS, DEFAULT_LONGITUDE_BANDS),
            geometry,
            diffuse,
        }
    }

    pub fn geometry(&self) -> SphereGeometry {
        self.geometry
    }

    pub fn mesh(&self) -> &SphereMesh {
        &self.mesh
    }

    pub fn diffuse(&self) -> &VideoSurface {
        &self.diffuse
    }
}

/// Scene root. Holds exactly one sphere and one camera; neither can be added twice
/// because the root is only ever built whole.
pub struct VideoScene {
    sphere: SphereNode,
    camera: CameraRig,
}

impl VideoScene {
    pub fn new(surface: VideoSurface) -> Self {
        Self {
            sphere: SphereNode::build(surface),
            camera: CameraRig::new(),
        }
    }

    pub fn sphere(&self) -> &SphereNode {
        &self.sphere
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_is_built_identically_twice() {
        let surface = VideoSurface::new();
        let a = SphereNode::build(surface.clone());
        let b = SphereNode::build(surface.clone());

        assert_eq!(a.geometry(), b.geometry());
        assert_eq!(a.mesh(), b.mesh());
        assert!(a.diffuse().same_surface(b.diffuse()));
    }

    #[test]
    fn sphere_geometry_constants() {
        let node = SphereNode::build(VideoSurface::new());
        assert_eq!(
            node.geometry(),
            SphereGeometry {
                radius: 20.0,
                position: Vec3::ZERO,
                double_sided: true,
            }
        );
    }

    #[test]
    fn camera_sits_at_sphere_centre() {
        let scene = VideoScene::new(VideoSurface::new());
        assert_eq!(scene.camera().position(), scene.sphere().geometry().position);
    }
}
