use crate::util::Color;
use glam::{EulerRot, Mat4, Vec3, Vec3A, Vec4};
use std::f32::consts::PI;

const DEFAULT_KA: f32 = 0.75;
const DEFAULT_KD: f32 = 0.75;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    /// Homogeneous position. Local space in a mesh, screen space after transform.
    pub position: Vec4,
    /// Direction (w = 0). Local space in a mesh, world space after transform.
    pub normal: Vec3A,
    pub color: Color,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, color: Color) -> Self {
        Self {
            position: position.extend(1.0),
            normal: Vec3A::from(normal),
            color,
        }
    }
}

pub struct Mesh {
    pub world: Mat4, // Local to world matrix
    pub ka: f32,     // Ambient coefficient
    pub kd: f32,     // Diffuse coefficient
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            world: Mat4::IDENTITY,
            ka: DEFAULT_KA,
            kd: DEFAULT_KD,
            vertices,
            triangles,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// UV sphere centred on the origin. The pole rows produce zero-area triangles.
    pub fn make_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for r in 0..=rings {
            let theta = PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let phi = 2.0 * PI * s as f32 / segments as f32;
                let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                // Colour drifts with latitude so neighbouring spheres are distinguishable
                let color = Vec3A::new(
                    0.5 + 0.5 * normal.x.abs(),
                    0.5 + 0.5 * normal.y.abs(),
                    0.5 + 0.5 * normal.z.abs(),
                );
                vertices.push(Vertex::new(normal * radius, normal, color));
            }
        }

        let stride = segments + 1;
        let mut triangles = Vec::with_capacity((rings * segments * 2) as usize);
        for r in 0..rings {
            for s in 0..segments {
                let i0 = r * stride + s;
                let i1 = i0 + stride;
                triangles.push([i0, i1, i0 + 1]);
                triangles.push([i0 + 1, i1, i1 + 1]);
            }
        }
        Self::new(vertices, triangles)
    }

    /// Axis-aligned cube with one flat colour per face.
    pub fn make_cube(size: f32) -> Self {
        const FACES: [(Vec3, Vec3, Vec3, Vec3A); 6] = [
            // normal, u axis, v axis, colour
            (Vec3::X, Vec3::NEG_Z, Vec3::Y, Vec3A::new(1.0, 0.2, 0.2)),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y, Vec3A::new(0.2, 1.0, 0.2)),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z, Vec3A::new(0.2, 0.2, 1.0)),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z, Vec3A::new(1.0, 1.0, 0.2)),
            (Vec3::Z, Vec3::X, Vec3::Y, Vec3A::new(1.0, 0.2, 1.0)),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y, Vec3A::new(0.2, 1.0, 1.0)),
        ];
        let half = size * 0.5;
        let mut vertices = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(12);
        for (normal, u, v, color) in FACES {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (normal + u * su + v * sv) * half;
                vertices.push(Vertex::new(p, normal, color));
            }
            triangles.push([base, base + 1, base + 2]);
            triangles.push([base, base + 2, base + 3]);
        }
        Self::new(vertices, triangles)
    }
}

pub struct Light {
    pub direction: Vec3A, // Normalized by the renderer at the start of every frame
    pub diffuse: Color,
    pub ambient: Color,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3A::new(0.0, 1.0, 1.0),
            diffuse: Vec3A::ONE,
            ambient: Vec3A::splat(0.1),
        }
    }
}

/// A list of meshes with a per-mesh spin applied every animation step.
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub spins: Vec<Vec3>,
    pub light: Light,
}

impl Scene {
    /// Grid of spheres receding into -z, each spinning by a small fixed amount per step.
    pub fn sphere_grid(count_x: i32, count_y: i32, count_z: i32, spacing: f32) -> Self {
        let mut rng = XorShift32::new(0x2545_f491);
        let mut meshes = Vec::new();
        let mut spins = Vec::new();
        for i in 0..count_x {
            for j in 0..count_y {
                for k in 0..count_z {
                    let mut mesh = Mesh::make_sphere(1.0, 10, 10);
                    mesh.world = Mat4::from_translation(Vec3::new(
                        (i - count_x / 2) as f32 * spacing,
                        (j - count_y / 2) as f32 * spacing,
                        -k as f32 * spacing - 4.0,
                    ));
                    meshes.push(mesh);
                    spins.push(Vec3::new(
                        rng.next_range(-0.1, 0.1),
                        rng.next_range(-0.1, 0.1),
                        rng.next_range(-0.1, 0.1),
                    ));
                }
            }
        }
        Self {
            meshes,
            spins,
            light: Light::default(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Advances every mesh's rotation by one step.
    pub fn animate(&mut self) {
        for (mesh, spin) in self.meshes.iter_mut().zip(self.spins.iter()) {
            mesh.world = mesh.world * Mat4::from_euler(EulerRot::XYZ, spin.x, spin.y, spin.z);
        }
    }
}

// Small deterministic generator so benchmark runs are repeatable
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn next_range(&mut self, min: f32, max: f32) -> f32 {
        let unit = (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32;
        min + (max - min) * unit
    }
}
