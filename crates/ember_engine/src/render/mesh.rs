//! Mesh resource: vertex/index data with GPU buffer lifecycle
//!
//! A mesh owns its geometry and a placement node in the scene's transform
//! graph; the material is referenced by index into the scene manager's
//! registry, never owned. Index data must be triangle-aligned and in range,
//! validated at construction.

use crate::gpu::{BufferId, GpuResult, GraphicsDevice};
use crate::scene::bounds::Aabb;
use crate::scene::transform::TransformId;
use thiserror::Error;

/// Geometry validation errors
#[derive(Error, Debug)]
pub enum MeshError {
    /// The index count was not a multiple of three
    #[error("mesh '{name}' index count {count} is not triangle-aligned")]
    NotTriangleAligned {
        /// Offending mesh
        name: String,
        /// Index count found
        count: usize,
    },

    /// An index referenced a vertex outside the buffer
    #[error("mesh '{name}' index {index} exceeds vertex count {vertex_count}")]
    IndexOutOfRange {
        /// Offending mesh
        name: String,
        /// Offending index value
        index: u32,
        /// Vertex buffer length
        vertex_count: usize,
    },

    /// A mesh carried no vertices at all
    #[error("mesh '{name}' has no vertices")]
    Empty {
        /// Offending mesh
        name: String,
    },
}

/// Interleaved vertex attributes: position, normal, tangent frame, color,
/// and up to four UV channels
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Tangent
    pub tangent: [f32; 3],
    /// Bitangent
    pub bitangent: [f32; 3],
    /// Vertex color
    pub color: [f32; 4],
    /// UV channels 0-3
    pub uv: [[f32; 2]; 4],
}

impl Vertex {
    /// A vertex with the given position and every other channel zeroed
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..bytemuck::Zeroable::zeroed()
        }
    }
}

/// A triangle mesh with explicit GPU buffer lifecycle
#[derive(Debug)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    transform: TransformId,
    material_index: usize,
    local_bounds: Aabb,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
}

impl Mesh {
    /// Create a mesh, validating index alignment and range
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        transform: TransformId,
        material_index: usize,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if vertices.is_empty() {
            return Err(MeshError::Empty { name });
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangleAligned {
                name,
                count: indices.len(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange {
                name,
                index: bad,
                vertex_count: vertices.len(),
            });
        }

        let mut local_bounds = Aabb::empty();
        for vertex in &vertices {
            local_bounds.expand_point(crate::foundation::math::Vec3::new(
                vertex.position[0],
                vertex.position[1],
                vertex.position[2],
            ));
        }

        Ok(Self {
            name,
            vertices,
            indices,
            transform,
            material_index,
            local_bounds,
            vertex_buffer: None,
            index_buffer: None,
        })
    }

    /// A unit cube centered at the origin (skybox and IBL conversion geometry)
    pub fn unit_cube(
        name: impl Into<String>,
        transform: TransformId,
        material_index: usize,
    ) -> Self {
        let corners = [
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ];
        let vertices = corners.into_iter().map(Vertex::at).collect();
        let indices = vec![
            0, 1, 2, 2, 3, 0, // back
            4, 6, 5, 6, 4, 7, // front
            0, 3, 7, 7, 4, 0, // left
            1, 5, 6, 6, 2, 1, // right
            3, 2, 6, 6, 7, 3, // top
            0, 4, 5, 5, 1, 0, // bottom
        ];
        // Construction over literal geometry cannot fail validation
        match Self::new(name, vertices, indices, transform, material_index) {
            Ok(mesh) => mesh,
            Err(_) => unreachable!("unit cube geometry is statically valid"),
        }
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placement node in the scene's transform graph
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    /// Index into the material registry (non-owning)
    pub fn material_index(&self) -> usize {
        self.material_index
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Object-space bounding box
    pub fn local_bounds(&self) -> Aabb {
        self.local_bounds
    }

    /// Whether GPU buffers exist
    pub fn is_buffered(&self) -> bool {
        self.vertex_buffer.is_some()
    }

    /// Upload vertex and index data to the device
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) -> GpuResult<()> {
        if self.vertex_buffer.is_none() {
            self.vertex_buffer =
                Some(device.create_vertex_buffer(bytemuck::cast_slice(&self.vertices)));
            self.index_buffer = Some(device.create_index_buffer(&self.indices));
        }
        Ok(())
    }

    /// Bind vertex and index buffers for drawing
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        match (self.vertex_buffer, self.index_buffer) {
            (Some(vb), Some(ib)) => device.bind_geometry(Some(vb), Some(ib)),
            _ => log::warn!("bind of unbuffered mesh '{}' skipped", self.name),
        }
    }

    /// Unbind the active geometry buffers
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        device.bind_geometry(None, None);
    }

    /// Issue the indexed draw for this mesh's full index range
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.draw_indexed(self.index_count());
    }

    /// Release GPU buffers; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(vb) = self.vertex_buffer.take() {
            device.destroy_buffer(vb);
        }
        if let Some(ib) = self.index_buffer.take() {
            device.destroy_buffer(ib);
        }
    }
}

/// Standalone unit-cube geometry for passes that render cube-map faces
///
/// Unlike [`Mesh`] this carries no scene placement; conversion passes supply
/// their own view matrices per face.
#[derive(Debug, Default)]
pub struct CubePrimitive {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
}

impl CubePrimitive {
    /// Create an unbuffered cube
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the cube geometry
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) {
        if self.vertex_buffer.is_some() {
            return;
        }
        let corners = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        let vertices: Vec<Vertex> = corners.into_iter().map(Vertex::at).collect();
        let indices: [u32; 36] = [
            0, 1, 2, 2, 3, 0, 4, 6, 5, 6, 4, 7, 0, 3, 7, 7, 4, 0, 1, 5, 6, 6, 2, 1, 3, 2, 6, 6,
            7, 3, 0, 4, 5, 5, 1, 0,
        ];
        self.vertex_buffer = Some(device.create_vertex_buffer(bytemuck::cast_slice(&vertices)));
        self.index_buffer = Some(device.create_index_buffer(&indices));
    }

    /// Bind, draw, and unbind the cube
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        match (self.vertex_buffer, self.index_buffer) {
            (Some(vb), Some(ib)) => {
                device.bind_geometry(Some(vb), Some(ib));
                device.draw_indexed(36);
                device.bind_geometry(None, None);
            }
            _ => log::warn!("draw of unbuffered cube primitive skipped"),
        }
    }

    /// Release GPU buffers; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(vb) = self.vertex_buffer.take() {
            device.destroy_buffer(vb);
        }
        if let Some(ib) = self.index_buffer.take() {
            device.destroy_buffer(ib);
        }
    }
}

/// Fullscreen triangle pair used by post-processing and lighting resolves
#[derive(Debug, Default)]
pub struct ScreenQuad {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
}

impl ScreenQuad {
    /// Create an unbuffered quad
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the quad geometry
    pub fn buffer(&mut self, device: &mut dyn GraphicsDevice) {
        if self.vertex_buffer.is_some() {
            return;
        }
        let vertices = [
            Vertex::at([-1.0, -1.0, 0.0]),
            Vertex::at([1.0, -1.0, 0.0]),
            Vertex::at([1.0, 1.0, 0.0]),
            Vertex::at([-1.0, 1.0, 0.0]),
        ];
        let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
        self.vertex_buffer = Some(device.create_vertex_buffer(bytemuck::cast_slice(&vertices)));
        self.index_buffer = Some(device.create_index_buffer(&indices));
    }

    /// Bind, draw, and unbind the quad
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        match (self.vertex_buffer, self.index_buffer) {
            (Some(vb), Some(ib)) => {
                device.bind_geometry(Some(vb), Some(ib));
                device.draw_indexed(6);
                device.bind_geometry(None, None);
            }
            _ => log::warn!("draw of unbuffered screen quad skipped"),
        }
    }

    /// Release GPU buffers; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(vb) = self.vertex_buffer.take() {
            device.destroy_buffer(vb);
        }
        if let Some(ib) = self.index_buffer.take() {
            device.destroy_buffer(ib);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;
    use crate::scene::transform::TransformGraph;

    fn triangle(graph: &mut TransformGraph) -> Mesh {
        let node = graph.insert_identity();
        Mesh::new(
            "tri",
            vec![
                Vertex::at([0.0, 0.0, 0.0]),
                Vertex::at([1.0, 0.0, 0.0]),
                Vertex::at([0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2],
            node,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_non_triangle_aligned_indices_rejected() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        let result = Mesh::new(
            "bad",
            vec![Vertex::at([0.0, 0.0, 0.0]); 3],
            vec![0, 1],
            node,
            0,
        );
        assert!(matches!(result, Err(MeshError::NotTriangleAligned { .. })));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        let result = Mesh::new(
            "bad",
            vec![Vertex::at([0.0, 0.0, 0.0]); 3],
            vec![0, 1, 9],
            node,
            0,
        );
        assert!(matches!(result, Err(MeshError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_local_bounds_cover_vertices() {
        let mut graph = TransformGraph::new();
        let mesh = triangle(&mut graph);
        let bounds = mesh.local_bounds();
        assert_eq!(bounds.min.x, 0.0);
        assert_eq!(bounds.max.x, 1.0);
        assert_eq!(bounds.max.y, 1.0);
    }

    #[test]
    fn test_buffer_once_then_draw() {
        let mut device = RecordingDevice::new();
        let mut graph = TransformGraph::new();
        let mut mesh = triangle(&mut graph);

        mesh.buffer(&mut device).unwrap();
        mesh.buffer(&mut device).unwrap();
        assert_eq!(device.count_calls_containing("create_vertex_buffer"), 1);

        mesh.bind(&mut device);
        mesh.draw(&mut device);
        mesh.unbind(&mut device);
        assert_eq!(device.draw_call_count(), 1);
    }

    #[test]
    fn test_destroy_twice_releases_once() {
        let mut device = RecordingDevice::new();
        let mut graph = TransformGraph::new();
        let mut mesh = triangle(&mut graph);
        mesh.buffer(&mut device).unwrap();

        mesh.destroy(&mut device);
        mesh.destroy(&mut device);
        assert_eq!(device.count_calls_containing("destroy_buffer"), 2); // vb + ib, once each
    }

    #[test]
    fn test_unit_cube_is_valid() {
        let mut graph = TransformGraph::new();
        let node = graph.insert_identity();
        let cube = Mesh::unit_cube("sky", node, 0);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.vertex_count(), 8);
    }
}
