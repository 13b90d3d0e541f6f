use winit::window::{Window, WindowId};

use crate::device::{GlReplay, Gpu, SurfaceErrorAction, WgpuGl};
use crate::gl::GlContext;
use crate::paint::Color;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` is the callback; `'w` is the window borrow carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    /// The window's graphics context. Survives across frames.
    pub gl: &'a mut GlContext<WgpuGl>,
    pub replay: &'a mut GlReplay,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Runs one frame: pixel-space 2D projection over the whole surface,
    /// clear to `clear`, `draw`, then replay and present.
    ///
    /// Surface errors skip the frame; an out-of-memory surface asks to exit.
    pub fn render<F>(&mut self, clear: Color, draw: F) -> AppControl
    where
        F: FnOnce(&mut GlContext<WgpuGl>),
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                if self.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        let size = self.gpu.size();
        self.gl.native_mut().resize(size.width, size.height);
        self.gl.set_ortho_2d(self.gpu.viewport());
        self.gl.clear_color(clear.to_f32());
        self.gl.clear();

        draw(&mut *self.gl);

        self.replay.render(self.gpu, &mut frame, self.gl.native_mut());

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
