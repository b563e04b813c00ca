use glam::{Mat4, Vec3};
use std::f32::consts::PI;

const DEFAULT_FOV: f32 = PI / 2.0;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 100.0;

/// Fixed camera looking down -z; the benchmark never moves or turns it.
pub struct RenderCamera {
    position: Vec3,
    fov: f32,
    width: f32,
    height: f32,
    near: f32,
    far: f32,
    // Cached matrices
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_project_matrix: Mat4,
}

impl RenderCamera {
    /// Camera at `position` with a 90 degree vertical field of view.
    pub fn new(position: Vec3, width: f32, height: f32) -> Self {
        let mut camera = Self {
            position,
            fov: DEFAULT_FOV,
            width,
            height,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_project_matrix: Mat4::IDENTITY,
        };
        camera.update_matrices();
        camera
    }

    fn update_matrices(&mut self) {
        self.view_matrix = Mat4::from_translation(-self.position);
        self.projection_matrix = self.compute_projection_matrix();
        self.view_project_matrix = self.projection_matrix * self.view_matrix;
    }

    // Right-handed with depth mapped to [0, 1]
    fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.width / self.height, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn to_ndc(camera: &RenderCamera, point: Vec3) -> Vec3 {
        let clip = camera.view_project_matrix * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn point_ahead_lands_mid_screen_inside_depth_range() {
        let camera = RenderCamera::new(Vec3::ZERO, 640.0, 480.0);
        let ndc = to_ndc(&camera, Vec3::new(0.0, 0.0, -10.0));
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn point_behind_near_plane_leaves_depth_range() {
        let camera = RenderCamera::new(Vec3::ZERO, 100.0, 100.0);
        let clip = camera.view_project_matrix * Vec4::new(0.0, 0.0, -0.05, 1.0);
        assert!((clip.z / clip.w) < 0.0);
    }

    #[test]
    fn backing_off_along_z_keeps_the_origin_centered_and_farther() {
        let near = RenderCamera::new(Vec3::new(0.0, 0.0, 2.0), 100.0, 100.0);
        let far = RenderCamera::new(Vec3::new(0.0, 0.0, 4.0), 100.0, 100.0);
        assert_eq!(far.view_matrix, Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0)));

        let (a, b) = (to_ndc(&near, Vec3::ZERO), to_ndc(&far, Vec3::ZERO));
        assert!(a.truncate().length() < 1e-6 && b.truncate().length() < 1e-6);
        assert!(a.z < b.z && b.z < 1.0);

        // A point off to the right shrinks toward the center as the camera backs away
        let (a, b) = (to_ndc(&near, Vec3::X), to_ndc(&far, Vec3::X));
        assert!(a.x > b.x && b.x > 0.0);
    }
}
