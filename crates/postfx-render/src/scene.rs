//! Minimal triangle-mesh scene rendered by the scene and normal passes.

use glam::{Mat3, Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::camera::Camera;

/// Interleaved vertex uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    /// Vertex buffer layout matching `scene.wgsl`.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// GPU representation of per-frame scene uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// xyz = direction the light travels, w = ambient term.
    pub light: [f32; 4],
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            light: [0.0, -1.0, 0.0, 0.15],
        }
    }
}

/// An indexed triangle mesh with a single color.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub color: Vec3,
    pub transform: Mat4,
}

impl Mesh {
    /// Creates a mesh from per-vertex positions and normals.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            normals,
            indices,
            color: Vec3::splat(0.8),
            transform: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// An axis-aligned cube centered at the origin with flat-shaded faces.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, side) in faces {
            let base = positions.len() as u32;
            let center = normal * h;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(center + side * (u * h) + up * (v * h));
                normals.push(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new("cube", positions, normals, indices)
    }

    /// A UV sphere centered at the origin.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                positions.push(normal * radius);
                normals.push(normal);
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self::new("sphere", positions, normals, indices)
    }

    /// A square in the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        Self::new("plane", positions, vec![Vec3::Y; 4], vec![0, 2, 1, 0, 3, 2])
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertices in world space with the mesh color applied.
    pub fn vertices(&self) -> Vec<Vertex> {
        let normal_matrix = Mat3::from_mat4(self.transform).inverse().transpose();
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(&position, &normal)| Vertex {
                position: self.transform.transform_point3(position).to_array(),
                normal: (normal_matrix * normal).normalize_or_zero().to_array(),
                color: self.color.to_array(),
            })
            .collect()
    }

    /// World-space bounding box, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self
            .positions
            .iter()
            .map(|&p| self.transform.transform_point3(p));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

/// Meshes, background and a directional light.
#[derive(Debug, Clone)]
pub struct Scene {
    background: Vec4,
    light_direction: Vec3,
    ambient: f32,
    meshes: Vec<Mesh>,
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            background: Vec4::new(0.1, 0.1, 0.12, 1.0),
            light_direction: Vec3::new(-0.4, -1.0, -0.6).normalize(),
            ambient: 0.15,
            meshes: Vec::new(),
            revision: 0,
        }
    }

    #[must_use]
    pub fn with_background(mut self, background: Vec4) -> Self {
        self.background = background;
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.add_mesh(mesh);
        self
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.revision += 1;
        self.meshes.len() - 1
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    /// Mutable access to a mesh. Marks the geometry for re-upload.
    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut Mesh> {
        self.revision += 1;
        self.meshes.get_mut(index)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
        self.revision += 1;
    }

    pub fn background(&self) -> Vec4 {
        self.background
    }

    pub fn set_background(&mut self, background: Vec4) {
        self.background = background;
    }

    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light_direction = direction.normalize_or_zero();
    }

    /// Counter bumped on every geometry change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bounding box over all meshes.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.meshes
            .iter()
            .filter_map(Mesh::bounds)
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
    }

    pub(crate) fn clear_color(&self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.background.x),
            g: f64::from(self.background.y),
            b: f64::from(self.background.z),
            a: f64::from(self.background.w),
        }
    }

    /// Uniforms for drawing this scene from `camera`.
    pub fn uniforms(&self, camera: &Camera) -> SceneUniforms {
        SceneUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            light: self.light_direction.extend(self.ambient).to_array(),
        }
    }
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// GPU copies of a scene's meshes, re-uploaded when the scene revision changes.
#[derive(Default)]
pub(crate) struct SceneGeometry {
    revision: Option<u64>,
    meshes: Vec<GpuMesh>,
}

impl SceneGeometry {
    pub fn sync(&mut self, device: &wgpu::Device, scene: &Scene) {
        if self.revision == Some(scene.revision()) {
            return;
        }

        self.meshes = scene
            .meshes()
            .iter()
            .filter(|mesh| !mesh.indices.is_empty())
            .map(|mesh| GpuMesh {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} vertices", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.vertices()),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} indices", mesh.name)),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
            })
            .collect();
        self.revision = Some(scene.revision());
        log::debug!("uploaded {} mesh(es) at revision {}", self.meshes.len(), scene.revision());
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        for mesh in &self.meshes {
            render_pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
