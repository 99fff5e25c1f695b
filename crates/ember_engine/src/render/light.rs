//! Light sources

use crate::foundation::math::Vec3;
use crate::scene::transform::{TransformGraph, TransformId};

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Directional key light (like sunlight); at most one per scene
    Directional,
    /// Constant ambient term; at most one per scene
    Ambient,
    /// Point light
    Point,
    /// Spot light
    Spot,
    /// Rectangular area light
    Area,
    /// Capsule/tube light
    Tube,
}

/// Light source placed by a transform node
#[derive(Debug, Clone)]
pub struct Light {
    /// Light name from the source document
    pub name: String,
    /// Light type
    pub kind: LightKind,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Placement node (position and orientation)
    pub transform: TransformId,
}

impl Light {
    /// Create a light
    pub fn new(
        name: impl Into<String>,
        kind: LightKind,
        color: Vec3,
        intensity: f32,
        transform: TransformId,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            color,
            intensity,
            transform,
        }
    }

    /// World-space emission direction (directional/spot): the node's -Z axis
    pub fn direction(&self, graph: &TransformGraph) -> Vec3 {
        let world = graph.world(self.transform);
        let forward = world.transform_vector(&Vec3::new(0.0, 0.0, -1.0));
        if forward.magnitude_squared() > 0.0 {
            forward.normalize()
        } else {
            Vec3::new(0.0, -1.0, 0.0)
        }
    }

    /// Whether only one instance of this kind may exist in a scene
    pub fn is_singleton_kind(&self) -> bool {
        matches!(self.kind, LightKind::Directional | LightKind::Ambient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants, Mat4, Mat4Ext};
    use approx::assert_relative_eq;

    #[test]
    fn test_direction_follows_node_rotation() {
        let mut graph = TransformGraph::new();
        let node = graph.insert(Mat4::rotation_y(constants::HALF_PI));
        let light = Light::new("sun", LightKind::Directional, Vec3::new(1.0, 1.0, 1.0), 1.0, node);

        // -Z rotated a quarter turn around Y points along -X
        let direction = light.direction(&graph);
        assert_relative_eq!(direction, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_singleton_kinds() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        let sun = Light::new("sun", LightKind::Directional, Vec3::zeros(), 1.0, node);
        let bulb = Light::new("bulb", LightKind::Point, Vec3::zeros(), 1.0, node);
        assert!(sun.is_singleton_kind());
        assert!(!bulb.is_singleton_kind());
    }
}
