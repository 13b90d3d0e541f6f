//! Replays a [`WgpuGl`] frame on the GPU.
//!
//! Recorded draws arrive already transformed to window coordinates. They are
//! assembled into triangle and line lists, clipped against the enabled user
//! clip planes, converted to NDC and submitted with one pipeline per
//! (topology, blend) pair. A full-surface clear starts a new
//! render pass; a scissored clear is drawn as an unblended quad.

use std::collections::HashMap;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::gl::{BlendEquation, BlendFactor, PrimitiveType};
use crate::headless::Captured;
use crate::headless::raster::{BlendSetup, RasterState, RasterVertex};

use super::gpu::{Gpu, GpuFrame};
use super::wgpu_gl::WgpuGl;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct GpuVertex {
    pos: [f32; 2],
    color: [f32; 4],
}

impl GpuVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos (NDC)
        1 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// How recorded vertices connect once strips, fans, quads and polygons are
/// flattened.
#[derive(Debug, Clone, PartialEq)]
enum Assembly {
    Points,
    Lines(Vec<[usize; 2]>),
    Triangles(Vec<[usize; 3]>),
}

/// Indices into `n` recorded vertices for `mode`. `outline` is the line
/// polygon mode: faces become their edges, quads and polygons their
/// perimeter.
fn assemble(mode: PrimitiveType, outline: bool, n: usize) -> Assembly {
    let perimeter = |start: usize, len: usize| (0..len).map(move |i| [start + i, start + (i + 1) % len]);
    let triangles: Vec<[usize; 3]> = match mode {
        PrimitiveType::Points => return Assembly::Points,
        PrimitiveType::Lines => return Assembly::Lines((0..n / 2).map(|i| [2 * i, 2 * i + 1]).collect()),
        PrimitiveType::LineStrip => return Assembly::Lines((1..n).map(|i| [i - 1, i]).collect()),
        PrimitiveType::LineLoop => {
            let mut lines: Vec<_> = (1..n).map(|i| [i - 1, i]).collect();
            if n > 2 {
                lines.push([n - 1, 0]);
            }
            return Assembly::Lines(lines);
        }
        PrimitiveType::Quads if outline => {
            return Assembly::Lines((0..n / 4).flat_map(|q| perimeter(4 * q, 4)).collect());
        }
        PrimitiveType::Polygon if outline => {
            return Assembly::Lines(if n > 2 { perimeter(0, n).collect() } else { Vec::new() });
        }
        PrimitiveType::Triangles => (0..n / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect(),
        PrimitiveType::TriangleStrip => (2..n)
            .map(|i| if i % 2 == 0 { [i - 2, i - 1, i] } else { [i - 1, i - 2, i] })
            .collect(),
        PrimitiveType::TriangleFan | PrimitiveType::Polygon => (2..n).map(|i| [0, i - 1, i]).collect(),
        PrimitiveType::Quads => (0..n / 4)
            .flat_map(|q| {
                let b = 4 * q;
                [[b, b + 1, b + 2], [b, b + 2, b + 3]]
            })
            .collect(),
    };
    if outline {
        Assembly::Lines(triangles.iter().flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]]).collect())
    } else {
        Assembly::Triangles(triangles)
    }
}

fn to_ndc(win: [f32; 2], size: (u32, u32)) -> [f32; 2] {
    [win[0] / size.0 as f32 * 2.0 - 1.0, win[1] / size.1 as f32 * 2.0 - 1.0]
}

/// GL scissor box (bottom-left origin) as a wgpu scissor rect (top-left
/// origin), clamped to the surface. `None` when nothing is left.
fn scissor_rect(s: [i32; 4], size: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (size.0 as i32, size.1 as i32);
    let x0 = s[0].clamp(0, w);
    let x1 = s[0].saturating_add(s[2]).clamp(0, w);
    let y0 = s[1].clamp(0, h);
    let y1 = s[1].saturating_add(s[3]).clamp(0, h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, (h - y1) as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

fn covers_surface(s: [i32; 4], size: (u32, u32)) -> bool {
    s[0] <= 0 && s[1] <= 0 && s[0] + s[2] >= size.0 as i32 && s[1] + s[3] >= size.1 as i32
}

fn blend_factor(f: BlendFactor) -> wgpu::BlendFactor {
    match f {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

fn blend_component(src: BlendFactor, dst: BlendFactor, eq: BlendEquation) -> wgpu::BlendComponent {
    let operation = match eq {
        BlendEquation::Add => wgpu::BlendOperation::Add,
        BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
        BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendEquation::Min => wgpu::BlendOperation::Min,
        BlendEquation::Max => wgpu::BlendOperation::Max,
    };
    // Min/max require unit factors.
    let (src, dst) = match eq {
        BlendEquation::Min | BlendEquation::Max => (BlendFactor::One, BlendFactor::One),
        _ => (src, dst),
    };
    wgpu::BlendComponent {
        src_factor: blend_factor(src),
        dst_factor: blend_factor(dst),
        operation,
    }
}

fn blend_state(b: &BlendSetup) -> wgpu::BlendState {
    wgpu::BlendState {
        color: blend_component(b.src_rgb, b.dst_rgb, b.eq_rgb),
        alpha: blend_component(b.src_alpha, b.dst_alpha, b.eq_alpha),
    }
}

type PipelineKey = (wgpu::PrimitiveTopology, Option<wgpu::BlendState>);

#[derive(Debug, Clone, PartialEq)]
struct DrawRange {
    key: PipelineKey,
    scissor: Option<(u32, u32, u32, u32)>,
    vertices: Range<u32>,
}

#[derive(Debug, Clone, PartialEq)]
struct Pass {
    load: wgpu::LoadOp<wgpu::Color>,
    draws: Vec<DrawRange>,
}

#[derive(Debug, Default)]
struct FrameGeometry {
    vertices: Vec<GpuVertex>,
    passes: Vec<Pass>,
}

fn clear_value(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: c[0] as f64,
        g: c[1] as f64,
        b: c[2] as f64,
        a: c[3] as f64,
    }
}

impl FrameGeometry {
    fn build(commands: Vec<Captured>, size: (u32, u32)) -> Self {
        let mut g = Self {
            vertices: Vec::new(),
            passes: vec![Pass {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                draws: Vec::new(),
            }],
        };

        for cmd in commands {
            match cmd {
                Captured::Clear { color, scissor } => match scissor {
                    Some(s) if !covers_surface(s, size) => {
                        let Some(rect) = scissor_rect(s, size) else { continue };
                        let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
                        let verts = corners.map(|pos| GpuVertex { pos, color });
                        g.push((wgpu::PrimitiveTopology::TriangleList, None), Some(rect), &verts);
                    }
                    _ => g.clear(clear_value(color)),
                },
                Captured::Draw {
                    mode,
                    outline,
                    vertices,
                    state,
                } => {
                    let scissor = match state.scissor {
                        Some(s) => match scissor_rect(s, size) {
                            Some(r) => Some(r),
                            None => continue,
                        },
                        None => None,
                    };
                    let blend = state.blend.as_ref().map(blend_state);
                    let (topology, verts) = tessellate(mode, outline, &vertices, &state, size);
                    g.push((topology, blend), scissor, &verts);
                }
            }
        }
        g
    }

    fn clear(&mut self, color: wgpu::Color) {
        match self.passes.last_mut() {
            Some(pass) if pass.draws.is_empty() => pass.load = wgpu::LoadOp::Clear(color),
            _ => self.passes.push(Pass {
                load: wgpu::LoadOp::Clear(color),
                draws: Vec::new(),
            }),
        }
    }

    fn push(&mut self, key: PipelineKey, scissor: Option<(u32, u32, u32, u32)>, verts: &[GpuVertex]) {
        if verts.is_empty() {
            return;
        }
        let start = self.vertices.len() as u32;
        self.vertices.extend_from_slice(verts);
        let end = self.vertices.len() as u32;
        if let Some(pass) = self.passes.last_mut() {
            pass.draws.push(DrawRange {
                key,
                scissor,
                vertices: start..end,
            });
        }
    }
}

fn dot(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

/// Point on `a..b` where `plane` is crossed; `da`/`db` are the plane
/// distances of the ends.
fn crossing(a: &RasterVertex, b: &RasterVertex, da: f32, db: f32) -> RasterVertex {
    let t = da / (da - db);
    RasterVertex {
        win: [a.win[0] + (b.win[0] - a.win[0]) * t, a.win[1] + (b.win[1] - a.win[1]) * t],
        color: lerp4(a.color, b.color, t),
        eye: lerp4(a.eye, b.eye, t),
    }
}

/// Sutherland-Hodgman against every plane; keeps `dot(plane, eye) >= 0`.
fn clip_polygon(mut poly: Vec<RasterVertex>, planes: &[[f32; 4]]) -> Vec<RasterVertex> {
    for &plane in planes {
        if poly.len() < 3 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(poly.len() + 1);
        for i in 0..poly.len() {
            let a = &poly[i];
            let b = &poly[(i + 1) % poly.len()];
            let (da, db) = (dot(plane, a.eye), dot(plane, b.eye));
            if da >= 0.0 {
                out.push(*a);
            }
            if (da >= 0.0) != (db >= 0.0) {
                out.push(crossing(a, b, da, db));
            }
        }
        poly = out;
    }
    if poly.len() < 3 { Vec::new() } else { poly }
}

fn clip_segment(mut a: RasterVertex, mut b: RasterVertex, planes: &[[f32; 4]]) -> Option<[RasterVertex; 2]> {
    for &plane in planes {
        let (da, db) = (dot(plane, a.eye), dot(plane, b.eye));
        match (da >= 0.0, db >= 0.0) {
            (true, true) => {}
            (false, false) => return None,
            (true, false) => b = crossing(&a, &b, da, db),
            (false, true) => a = crossing(&a, &b, da, db),
        }
    }
    Some([a, b])
}

/// Flattens one recorded draw into list vertices in NDC. Points become
/// squares of `point_size` pixels. Geometry outside an enabled clip plane is
/// cut away here since the replay pipeline has no clip distances.
fn tessellate(
    mode: PrimitiveType,
    outline: bool,
    v: &[RasterVertex],
    state: &RasterState,
    size: (u32, u32),
) -> (wgpu::PrimitiveTopology, Vec<GpuVertex>) {
    let planes = state.clip_planes.as_slice();
    let gpu = |r: &RasterVertex| GpuVertex {
        pos: to_ndc(r.win, size),
        color: r.color,
    };
    match assemble(mode, outline, v.len()) {
        Assembly::Points => {
            let half = state.point_size.max(1.0) * 0.5;
            let verts = v
                .iter()
                .filter(|p| planes.iter().all(|&plane| dot(plane, p.eye) >= 0.0))
                .flat_map(|p| {
                    let [x, y] = p.win;
                    let c = [[x - half, y - half], [x + half, y - half], [x + half, y + half], [x - half, y + half]];
                    [0, 1, 2, 0, 2, 3].map(|i| GpuVertex {
                        pos: to_ndc(c[i], size),
                        color: p.color,
                    })
                })
                .collect();
            (wgpu::PrimitiveTopology::TriangleList, verts)
        }
        Assembly::Lines(lines) => (
            wgpu::PrimitiveTopology::LineList,
            lines
                .iter()
                .filter_map(|&[a, b]| clip_segment(v[a], v[b], planes))
                .flat_map(|seg| seg.map(|r| gpu(&r)))
                .collect(),
        ),
        Assembly::Triangles(tris) if planes.is_empty() => (
            wgpu::PrimitiveTopology::TriangleList,
            tris.iter().flat_map(|t| t.map(|i| gpu(&v[i]))).collect(),
        ),
        Assembly::Triangles(tris) => {
            let mut verts = Vec::with_capacity(tris.len() * 3);
            for t in &tris {
                let poly = clip_polygon(t.iter().map(|&i| v[i]).collect(), planes);
                for i in 2..poly.len() {
                    verts.extend([gpu(&poly[0]), gpu(&poly[i - 1]), gpu(&poly[i])]);
                }
            }
            (wgpu::PrimitiveTopology::TriangleList, verts)
        }
    }
}

/// GPU side of a [`WgpuGl`]: pipelines and the streaming vertex buffer.
#[derive(Default)]
pub struct GlReplay {
    format: Option<wgpu::TextureFormat>,
    shader: Option<wgpu::ShaderModule>,
    layout: Option<wgpu::PipelineLayout>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    vbo: Option<wgpu::Buffer>,
    vbo_capacity: usize,
}

impl GlReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records everything `gl` captured since the last call into `frame`.
    pub fn render(&mut self, gpu: &Gpu<'_>, frame: &mut GpuFrame, gl: &mut WgpuGl) {
        let geometry = FrameGeometry::build(gl.take_frame(), gl.size());

        self.ensure_shader(gpu);
        for pass in &geometry.passes {
            for draw in &pass.draws {
                self.ensure_pipeline(gpu, draw.key);
            }
        }
        self.ensure_vertex_capacity(gpu, geometry.vertices.len());
        if let Some(vbo) = self.vbo.as_ref() {
            if !geometry.vertices.is_empty() {
                gpu.queue().write_buffer(vbo, 0, bytemuck::cast_slice(&geometry.vertices));
            }
        }

        let Some(vbo) = self.vbo.as_ref() else { return };
        let surface = gpu.size();
        let (width, height) = (surface.width.max(1), surface.height.max(1));

        for pass in &geometry.passes {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kestrel gl pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: pass.load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_vertex_buffer(0, vbo.slice(..));
            for draw in &pass.draws {
                let Some(pipeline) = self.pipelines.get(&draw.key) else { continue };
                rpass.set_pipeline(pipeline);
                let (x, y, w, h) = draw.scissor.unwrap_or((0, 0, width, height));
                let (x, y) = (x.min(width - 1), y.min(height - 1));
                rpass.set_scissor_rect(x, y, w.min(width - x), h.min(height - y));
                rpass.draw(draw.vertices.clone(), 0..1);
            }
        }
    }

    fn ensure_shader(&mut self, gpu: &Gpu<'_>) {
        let format = gpu.surface_format();
        if self.format == Some(format) && self.shader.is_some() {
            return;
        }

        let shader = gpu.device().create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kestrel gl shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gl.wgsl").into()),
        });
        let layout = gpu.device().create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kestrel gl pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        self.format = Some(format);
        self.shader = Some(shader);
        self.layout = Some(layout);
        self.pipelines.clear();
    }

    fn ensure_pipeline(&mut self, gpu: &Gpu<'_>, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let (Some(format), Some(shader), Some(layout)) = (self.format, self.shader.as_ref(), self.layout.as_ref())
        else {
            return;
        };
        let (topology, blend) = key;

        let pipeline = gpu.device().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("kestrel gl pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[GpuVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        log::debug!("wgpu gl: created pipeline {topology:?} blend={}", blend.is_some());
        self.pipelines.insert(key, pipeline);
    }

    fn ensure_vertex_capacity(&mut self, gpu: &Gpu<'_>, required: usize) {
        if required <= self.vbo_capacity && self.vbo.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(1024);
        self.vbo = Some(gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("kestrel gl vbo"),
            size: (capacity * std::mem::size_of::<GpuVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vbo_capacity = capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32) -> RasterVertex {
        RasterVertex {
            win: [x, y],
            color: [1.0, 0.0, 0.0, 1.0],
            eye: [x, y, 0.0, 1.0],
        }
    }

    fn draw(mode: PrimitiveType, vertices: Vec<RasterVertex>) -> Captured {
        Captured::Draw {
            mode,
            outline: false,
            vertices,
            state: RasterState {
                point_size: 1.0,
                ..RasterState::default()
            },
        }
    }

    // ── assembly ──────────────────────────────────────────────────────────

    #[test]
    fn fans_and_polygons_share_assembly() {
        let fan = assemble(PrimitiveType::TriangleFan, false, 5);
        assert_eq!(fan, Assembly::Triangles(vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]));
        assert_eq!(assemble(PrimitiveType::Polygon, false, 5), fan);
    }

    #[test]
    fn quads_split_like_the_rasterizer() {
        assert_eq!(
            assemble(PrimitiveType::Quads, false, 8),
            Assembly::Triangles(vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]])
        );
    }

    #[test]
    fn line_loop_closes_only_past_two_points() {
        assert_eq!(assemble(PrimitiveType::LineLoop, false, 2), Assembly::Lines(vec![[0, 1]]));
        assert_eq!(
            assemble(PrimitiveType::LineLoop, false, 3),
            Assembly::Lines(vec![[0, 1], [1, 2], [2, 0]])
        );
    }

    #[test]
    fn outline_mode_draws_edges() {
        assert_eq!(
            assemble(PrimitiveType::Triangles, true, 3),
            Assembly::Lines(vec![[0, 1], [1, 2], [2, 0]])
        );
        assert_eq!(
            assemble(PrimitiveType::Polygon, true, 4),
            Assembly::Lines(vec![[0, 1], [1, 2], [2, 3], [3, 0]])
        );
    }

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(
            assemble(PrimitiveType::TriangleStrip, false, 4),
            Assembly::Triangles(vec![[0, 1, 2], [2, 1, 3]])
        );
    }

    // ── coordinates ───────────────────────────────────────────────────────

    #[test]
    fn scissor_flips_to_top_left() {
        assert_eq!(scissor_rect([0, 0, 10, 5], (100, 50)), Some((0, 45, 10, 5)));
        assert_eq!(scissor_rect([90, 40, 20, 20], (100, 50)), Some((90, 0, 10, 10)));
        assert_eq!(scissor_rect([200, 0, 10, 10], (100, 50)), None);
    }

    #[test]
    fn window_corners_map_to_ndc() {
        assert_eq!(to_ndc([0.0, 0.0], (64, 32)), [-1.0, -1.0]);
        assert_eq!(to_ndc([64.0, 32.0], (64, 32)), [1.0, 1.0]);
    }

    // ── frame building ────────────────────────────────────────────────────

    #[test]
    fn full_clear_replaces_the_load_op_until_something_is_drawn() {
        let red = [1.0, 0.0, 0.0, 1.0];
        let commands = vec![
            Captured::Clear { color: red, scissor: None },
            draw(PrimitiveType::Triangles, vec![vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(0.0, 4.0)]),
            Captured::Clear { color: red, scissor: None },
        ];
        let g = FrameGeometry::build(commands, (8, 8));
        assert_eq!(g.passes.len(), 2);
        assert_eq!(g.passes[0].load, wgpu::LoadOp::Clear(clear_value(red)));
        assert_eq!(g.passes[0].draws.len(), 1);
        assert_eq!(g.passes[0].draws[0].vertices, 0..3);
        assert!(g.passes[1].draws.is_empty());
    }

    #[test]
    fn scissored_clear_is_an_unblended_quad() {
        let commands = vec![Captured::Clear {
            color: [0.0, 1.0, 0.0, 1.0],
            scissor: Some([2, 2, 4, 4]),
        }];
        let g = FrameGeometry::build(commands, (8, 8));
        assert_eq!(g.passes.len(), 1);
        let d = &g.passes[0].draws[0];
        assert_eq!(d.key, (wgpu::PrimitiveTopology::TriangleList, None));
        assert_eq!(d.scissor, Some((2, 2, 4, 4)));
        assert_eq!(g.vertices.len(), 6);
    }

    #[test]
    fn points_become_squares() {
        let commands = vec![draw(PrimitiveType::Points, vec![vertex(4.0, 4.0), vertex(1.0, 1.0)])];
        let g = FrameGeometry::build(commands, (8, 8));
        assert_eq!(g.vertices.len(), 12);
        assert_eq!(g.passes[0].draws[0].key.0, wgpu::PrimitiveTopology::TriangleList);
    }

    fn clipped(mode: PrimitiveType, vertices: Vec<RasterVertex>, plane: [f32; 4]) -> Captured {
        Captured::Draw {
            mode,
            outline: false,
            vertices,
            state: RasterState {
                clip_planes: vec![plane],
                point_size: 1.0,
                ..RasterState::default()
            },
        }
    }

    // ── clip planes ───────────────────────────────────────────────────────

    #[test]
    fn lines_are_cut_at_the_plane() {
        // keep x >= 2
        let cmd = clipped(PrimitiveType::Lines, vec![vertex(0.0, 0.0), vertex(4.0, 4.0)], [1.0, 0.0, 0.0, -2.0]);
        let g = FrameGeometry::build(vec![cmd], (8, 8));
        assert_eq!(g.vertices.len(), 2);
        assert_eq!(g.vertices[0].pos, to_ndc([2.0, 2.0], (8, 8)));
        assert_eq!(g.vertices[1].pos, to_ndc([4.0, 4.0], (8, 8)));
    }

    #[test]
    fn triangles_outside_the_plane_vanish() {
        let tri = vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)];
        let g = FrameGeometry::build(vec![clipped(PrimitiveType::Triangles, tri, [1.0, 0.0, 0.0, -2.0])], (8, 8));
        assert!(g.vertices.is_empty());
        assert!(g.passes[0].draws.is_empty());
    }

    #[test]
    fn clipped_triangle_corner_becomes_a_quad() {
        // Right triangle cut by x <= 2 leaves a quad: two triangles.
        let tri = vec![vertex(0.0, 0.0), vertex(4.0, 0.0), vertex(0.0, 4.0)];
        let g = FrameGeometry::build(vec![clipped(PrimitiveType::Triangles, tri, [-1.0, 0.0, 0.0, 2.0])], (8, 8));
        assert_eq!(g.vertices.len(), 6);
        let max_x = g.vertices.iter().map(|v| v.pos[0]).fold(f32::MIN, f32::max);
        assert_eq!(max_x, to_ndc([2.0, 0.0], (8, 8))[0]);
    }

    #[test]
    fn points_outside_the_plane_are_dropped() {
        let pts = vec![vertex(1.0, 1.0), vertex(5.0, 5.0)];
        let g = FrameGeometry::build(vec![clipped(PrimitiveType::Points, pts, [1.0, 0.0, 0.0, -2.0])], (8, 8));
        assert_eq!(g.vertices.len(), 6);
    }

    #[test]
    fn alpha_blend_maps_to_wgpu_factors() {
        let b = BlendSetup {
            src_rgb: BlendFactor::SrcAlpha,
            dst_rgb: BlendFactor::OneMinusSrcAlpha,
            ..BlendSetup::default()
        };
        let s = blend_state(&b);
        assert_eq!(s.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(s.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(s.alpha.dst_factor, wgpu::BlendFactor::Zero);

        let max = BlendSetup {
            eq_rgb: BlendEquation::Max,
            ..b
        };
        assert_eq!(blend_state(&max).color.src_factor, wgpu::BlendFactor::One);
    }
}
