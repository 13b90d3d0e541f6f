use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use kestrel_gfx::batch::{BatchConfig, BatchRenderer};
use kestrel_gfx::coords::{Rect, Vec2};
use kestrel_gfx::core::{App, AppControl, FrameCtx};
use kestrel_gfx::device::{GpuInit, WgpuGl};
use kestrel_gfx::gl::{BufferUsage, FillMode, GlContext, PrimitiveType};
use kestrel_gfx::logging::{init_logging, LoggingConfig};
use kestrel_gfx::paint::{BlendMode, Color};
use kestrel_gfx::primitives::{Polygon, Primitives, Triangle};
use kestrel_gfx::vertex::{VertexBuffer, VertexFlags};
use kestrel_gfx::window::{Runtime, RuntimeConfig};

const GRID: u32 = 8;
const CELL: f32 = 18.0;

/// Shape gallery: batched primitives, a vertex-buffer grid and a clipped
/// region. `Space` toggles outlines, `Escape` quits.
struct Studio {
    batch: BatchRenderer,
    prims: Primitives,
    grid: Option<VertexBuffer>,
    angle: f32,
    time: f32,
    outline: bool,
    next_title: f32,
}

impl Studio {
    fn new() -> Self {
        Self {
            batch: BatchRenderer::new(BatchConfig::default()),
            prims: Primitives::new(),
            grid: None,
            angle: 0.0,
            time: 0.0,
            outline: false,
            next_title: 0.0,
        }
    }

    fn draw(&mut self, gl: &mut GlContext<WgpuGl>, width: f32, height: f32) {
        let fill = if self.outline { FillMode::Line } else { FillMode::Fill };
        let prims = &mut self.prims;
        let batch = &mut self.batch;

        // Accumulate everything into as few draws as the state allows.
        prims.set_force_draw(gl, batch, false);
        prims.set_fill_mode(fill);
        prims.set_blend_mode(BlendMode::Alpha);

        prims.set_color(Color::rgb(230, 80, 70));
        prims.draw_rectangle(gl, batch, Rect::new(40.0, 40.0, 120.0, 80.0), self.angle, Vec2::splat(1.0));

        prims.draw_rounded_rectangle_colors(
            gl,
            batch,
            Rect::new(200.0, 40.0, 160.0, 90.0),
            18.0,
            6,
            [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE],
            0.0,
            Vec2::splat(1.0),
        );

        prims.set_color(Color::rgba(90, 170, 250, 200));
        prims.draw_circle(gl, batch, Vec2::new(480.0, 90.0), 50.0, None);
        prims.set_color(Color::rgb(250, 210, 90));
        prims.draw_arc(gl, batch, Vec2::new(620.0, 90.0), 50.0, 48, 270.0, self.angle);

        let t = Triangle::new(Vec2::new(60.0, 260.0), Vec2::new(160.0, 260.0), Vec2::new(110.0, 170.0));
        prims.draw_triangle_colors(gl, batch, t, [Color::RED, Color::GREEN, Color::BLUE]);

        let mut star = Polygon::new(
            (0..10)
                .map(|i| {
                    let r = if i % 2 == 0 { 50.0 } else { 22.0 };
                    let a = (i as f32 * 36.0 - 90.0).to_radians();
                    Vec2::new(r * a.cos(), r * a.sin())
                })
                .collect(),
        );
        star.translate(Vec2::new(260.0, 220.0));
        star.rotate(self.angle * 0.5, Vec2::new(260.0, 220.0));
        prims.set_color(Color::rgb(180, 120, 240));
        prims.draw_polygon(gl, batch, &star);

        prims.set_line_width(1.0);
        prims.set_color(Color::WHITE);
        prims.draw_line(gl, batch, Vec2::new(20.0, height - 20.0), Vec2::new(width - 20.0, height - 20.0));

        // Only the part of the spinning quad inside the clip survives.
        let clip = Rect::new(360.0, 180.0, 120.0, 120.0);
        prims.set_color(Color::rgb(60, 60, 70));
        prims.draw_rectangle(gl, batch, clip, 0.0, Vec2::splat(1.0));
        batch.draw(gl);
        if gl.clip_2d_plane_enable(clip) {
            prims.set_color(Color::rgb(120, 220, 140));
            prims.draw_rectangle(gl, batch, Rect::new(370.0, 190.0, 140.0, 60.0), -self.angle, Vec2::splat(1.2));
            batch.draw(gl);
            gl.clip_2d_plane_disable();
        }

        prims.set_force_draw(gl, batch, true);

        self.draw_grid(gl);
    }

    /// Color-cycling quad grid kept in a dynamic vertex buffer.
    fn draw_grid(&mut self, gl: &mut GlContext<WgpuGl>) {
        let grid = self.grid.get_or_insert_with(|| {
            let mut vb = VertexBuffer::new(
                gl,
                VertexFlags::PRIMITIVE,
                PrimitiveType::Quads,
                (GRID * GRID * 4) as usize,
                0,
                BufferUsage::Dynamic,
            );
            vb.set_grid_size(GRID, GRID);
            for y in 0..GRID {
                for x in 0..GRID {
                    let pos = Vec2::new(540.0 + x as f32 * (CELL + 2.0), 170.0 + y as f32 * (CELL + 2.0));
                    vb.set_quad(x, y, pos, Vec2::splat(CELL), Color::WHITE);
                }
            }
            vb
        });

        for y in 0..GRID {
            for x in 0..GRID {
                let phase = self.time * 2.0 + (x + y) as f32 * 0.4;
                let v = ((phase.sin() * 0.5 + 0.5) * 255.0) as u8;
                grid.set_quad_color(x, y, Color::rgb(v, 255 - v, 200));
            }
        }

        if grid.is_compiled() {
            grid.update(gl, VertexFlags::COLOR, false);
        }
        grid.bind(gl);
        grid.draw(gl);
        grid.unbind(gl);
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => AppControl::Exit,
            PhysicalKey::Code(KeyCode::Space) => {
                self.outline = !self.outline;
                log::info!("outline mode {}", if self.outline { "on" } else { "off" });
                AppControl::Continue
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.time += ctx.time.dt;
        self.angle = (self.angle + 45.0 * ctx.time.dt) % 360.0;

        if self.time >= self.next_title {
            ctx.window
                .window
                .set_title(&format!("kestrel studio · {:.0} fps · {} flushes", ctx.time.fps, self.batch.flush_count()));
            self.next_title = self.time + 1.0;
        }

        let (w, h) = ctx.window.physical_size();
        ctx.render(Color::rgb(24, 26, 32), |gl| self.draw(gl, w as f32, h as f32))
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "kestrel studio".to_string(),
        initial_size: winit::dpi::LogicalSize::new(800.0, 480.0),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), Studio::new())
}
