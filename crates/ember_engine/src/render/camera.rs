//! Camera primitive
//!
//! A camera is placed by a node in the scene's transform graph and carries
//! projection parameters. Scenes hold one camera per role slot; exactly one
//! main camera exists per scene.

use crate::foundation::math::{utils, Mat4, Mat4Ext};
use crate::scene::transform::{TransformGraph, TransformId};

/// Fixed camera roles a scene can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraRole {
    /// Shadow-map rendering camera
    Shadow,
    /// Planar-reflection rendering camera
    Reflection,
    /// The main view camera
    Main,
}

impl CameraRole {
    /// Number of role slots a scene carries
    pub const COUNT: usize = 3;

    /// Slot index of this role
    pub fn index(self) -> usize {
        match self {
            CameraRole::Shadow => 0,
            CameraRole::Reflection => 1,
            CameraRole::Main => 2,
        }
    }
}

/// A perspective camera
#[derive(Debug)]
pub struct Camera {
    name: String,
    role: CameraRole,
    fov_y: f32,
    near: f32,
    far: f32,
    transform: TransformId,
}

impl Camera {
    /// Create a camera; `fov_y_degrees` is converted to radians internally
    pub fn new(
        name: impl Into<String>,
        role: CameraRole,
        fov_y_degrees: f32,
        near: f32,
        far: f32,
        transform: TransformId,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            fov_y: utils::deg_to_rad(fov_y_degrees),
            near,
            far,
            transform,
        }
    }

    /// Camera name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role slot this camera fills
    pub fn role(&self) -> CameraRole {
        self.role
    }

    /// Vertical field of view in radians
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Near clip distance
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Placement node in the scene's transform graph
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    /// Re-seat the camera on a different transform node
    pub fn set_transform(&mut self, transform: TransformId) {
        self.transform = transform;
    }

    /// Perspective projection matrix for the given aspect ratio
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(self.fov_y, aspect, self.near, self.far)
    }

    /// View matrix: inverse of the camera node's world matrix
    ///
    /// A non-invertible placement (zero scale) degrades to identity with a
    /// log instead of propagating NaNs into the frame.
    pub fn view_matrix(&self, graph: &TransformGraph) -> Mat4 {
        let world = graph.world(self.transform);
        match world.try_inverse() {
            Some(view) => view,
            None => {
                log::warn!("camera '{}' world matrix is singular", self.name);
                Mat4::identity()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_projection_uses_fov_and_clip_planes() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        let camera = Camera::new("main", CameraRole::Main, 90.0, 0.1, 100.0, node);

        let projection = camera.projection(1.0);
        // 90-degree vertical FOV at aspect 1: unit focal length
        assert_relative_eq!(projection[(0, 0)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(projection[(1, 1)], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_inverts_placement() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        graph.translate(node, Vec3::new(0.0, 0.0, 5.0));

        let camera = Camera::new("main", CameraRole::Main, 60.0, 0.1, 100.0, node);
        let view = camera.view_matrix(&graph);

        let origin = view.transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(origin.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_role_indices_are_distinct() {
        let roles = [CameraRole::Shadow, CameraRole::Reflection, CameraRole::Main];
        for (i, role) in roles.into_iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }
}
