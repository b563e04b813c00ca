use crate::scene::{Mesh, Vertex};
use glam::{Mat4, Vec4};

/// Z range kept by the trivial clip. Anything outside is discarded whole.
const CLIP_Z: f32 = 1.0;

/// Transforms a mesh vertex into screen space.
///
/// `mvp` is the mesh's full `projection * view * world` product, `world` its world matrix.
/// The normal is rotated by `world` alone (uniform scale is assumed, so no inverse
/// transpose) and re-normalized. Screen y grows downward.
#[inline]
pub fn transform_vertex(mvp: &Mat4, world: &Mat4, vertex: &Vertex, width: f32, height: f32) -> Vertex {
    // Apply the projection, then the perspective divide
    let clip = *mvp * vertex.position;
    let ndc = clip.truncate() / clip.w;

    let normal = world.transform_vector3a(vertex.normal).normalize_or_zero();

    // Map normalized device coordinates to pixels and flip y
    let screen_x = (ndc.x + 1.0) * 0.5 * width;
    let screen_y = height - (ndc.y + 1.0) * 0.5 * height;

    Vertex {
        position: Vec4::new(screen_x, screen_y, ndc.z, 1.0),
        normal,
        color: vertex.color,
    }
}

/// Transforms the three corners of one mesh triangle.
///
/// Returns `None` when any corner's depth leaves [-1, 1]; the triangle is clipped for
/// this frame and the rest of the mesh is unaffected.
#[inline]
pub fn transform_triangle(
    mvp: &Mat4,
    mesh: &Mesh,
    indices: [u32; 3],
    width: f32,
    height: f32,
) -> Option<[Vertex; 3]> {
    let corners = indices.map(|i| transform_vertex(mvp, &mesh.world, &mesh.vertices[i as usize], width, height));
    // Negated so a NaN depth (w == 0) is clipped too
    if corners.iter().any(|v| !(v.position.z.abs() <= CLIP_Z)) {
        return None;
    }
    Some(corners)
}
