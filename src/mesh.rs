// mesh.rs — UV sphere tessellation for the inside-out video globe

pub const DEFAULT_LATITUDE_BANDS: usize = 64;
pub const DEFAULT_LONGITUDE_BANDS: usize = 128;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub vertices: Vec<SphereVertex>,
    pub indices: Vec<u32>,
}

/// Latitude/longitude sphere centred on the origin.
///
/// Seen from the centre with +Y up, U grows to the viewer's right so an
/// equirectangular frame reads unmirrored; V runs top (0) to bottom (1)
/// to match image row order.
pub fn build_sphere(radius: f32, lat: usize, lon: usize) -> SphereMesh {
    let lat = lat.max(2);
    let lon = lon.max(3);
    let mut vertices = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let theta = std::f32::consts::PI * (i as f32) / (lat as f32);
        let y = radius * theta.cos();
        let sin_t = theta.sin();

        for j in 0..=lon {
            let phi = 2.0 * std::f32::consts::PI * (j as f32) / (lon as f32);

            let x = radius * phi.cos() * sin_t;
            let z = radius * phi.sin() * sin_t;

            let u = (j as f32) / (lon as f32);
            let v = (i as f32) / (lat as f32);

            vertices.push(SphereVertex {
                position: [x, y, z],
                uv: [u, v],
            });
        }
    }

    for i in 0..lat {
        for j in 0..lon {
            let a = (i * (lon + 1) + j) as u32;
            let b = a + (lon + 1) as u32;

            indices.extend_from_slice(&[
                a, b, a + 1,
                b, b + 1, a + 1,
            ]);
        }
    }

    SphereMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vertex_lies_on_the_radius() {
        let mesh = build_sphere(20.0, 16, 32);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            let r = (x * x + y * y + z * z).sqrt();
            assert!((r - 20.0).abs() < 1e-3, "radius {r}");
        }
    }

    #[test]
    fn counts_and_index_bounds() {
        let mesh = build_sphere(1.0, 8, 16);
        assert_eq!(mesh.vertices.len(), 9 * 17);
        assert_eq!(mesh.indices.len(), 8 * 16 * 6);
        let max = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max < mesh.vertices.len());
    }

    #[test]
    fn uvs_cover_the_whole_frame() {
        let mesh = build_sphere(1.0, 4, 8);
        let (mut umin, mut umax, mut vmin, mut vmax) = (1.0f32, 0.0f32, 1.0f32, 0.0f32);
        for v in &mesh.vertices {
            umin = umin.min(v.uv[0]);
            umax = umax.max(v.uv[0]);
            vmin = vmin.min(v.uv[1]);
            vmax = vmax.max(v.uv[1]);
        }
        assert_eq!((umin, umax, vmin, vmax), (0.0, 1.0, 0.0, 1.0));
        // north pole row samples the top of the image
        assert_eq!(mesh.vertices[0].uv[1], 0.0);
        assert!(mesh.vertices[0].position[1] > 0.0);
    }

    #[test]
    fn degenerate_tessellation_is_clamped() {
        let mesh = build_sphere(1.0, 0, 0);
        assert_eq!(mesh.vertices.len(), 3 * 4);
    }
}
