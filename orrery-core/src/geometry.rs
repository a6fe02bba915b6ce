/// Interleaved vertex data shared between the OBJ loader and the GPU backend
use crate::math::Vec3;

/// Floats per vertex: position (3) followed by texture coordinates (2).
pub const FLOATS_PER_VERTEX: usize = 5;
/// Offset of the texture coordinates inside one vertex, in floats.
pub const UV_OFFSET: usize = 3;
/// Byte stride of one vertex.
pub const VERTEX_STRIDE_BYTES: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();

/// A single vertex with position and texture coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Flat triangle list, five floats per vertex, three vertices per triangle.
///
/// Drawn as-is with no index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexStream {
    data: Vec<f32>,
}

impl VertexStream {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn push(&mut self, vertex: Vertex) {
        let p = vertex.position;
        self.data
            .extend_from_slice(&[p.x, p.y, p.z, vertex.uv[0], vertex.uv[1]]);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / FLOATS_PER_VERTEX
    }

    /// Number of complete triangles.
    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        let start = index * FLOATS_PER_VERTEX;
        let v = self.data.get(start..start + FLOATS_PER_VERTEX)?;
        Some(Vertex::new(Vec3::new(v[0], v[1], v[2]), [v[3], v[4]]))
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.data
            .chunks_exact(FLOATS_PER_VERTEX)
            .map(|v| Vertex::new(Vec3::new(v[0], v[1], v[2]), [v[3], v[4]]))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_interleaves_position_and_uv() {
        let mut stream = VertexStream::new();
        stream.push(Vertex::new(Vec3::new(1.0, 2.0, 3.0), [0.25, 0.75]));
        stream.push(Vertex::new(Vec3::new(4.0, 5.0, 6.0), [1.0, 0.0]));

        assert_eq!(
            stream.as_slice(),
            &[1.0, 2.0, 3.0, 0.25, 0.75, 4.0, 5.0, 6.0, 1.0, 0.0]
        );
        assert_eq!(stream.vertex_count(), 2);
        assert_eq!(stream.triangle_count(), 0);
        assert_eq!(stream.vertex(1).map(|v| v.uv), Some([1.0, 0.0]));
        assert!(stream.vertex(2).is_none());
    }

    #[test]
    fn test_stride_matches_layout() {
        assert_eq!(VERTEX_STRIDE_BYTES, 20);
        assert_eq!(UV_OFFSET * std::mem::size_of::<f32>(), 12);
    }
}
