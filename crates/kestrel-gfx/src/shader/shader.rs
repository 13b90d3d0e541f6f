use std::path::Path;

use anyhow::Context;

use crate::gl::{GlContext, NativeGl, ShaderKind};

use super::{convert, Dialect};

/// One shader stage. The source is kept so the stage can be rebuilt after a
/// context loss.
#[derive(Debug)]
pub struct Shader {
    kind: ShaderKind,
    handle: u32,
    source: String,
    log: String,
    compiled: bool,
}

impl Shader {
    /// Adapts `source` to the context's GLSL dialect and compiles it.
    /// Check [`is_valid`](Self::is_valid) for the outcome.
    pub fn new<N: NativeGl>(gl: &mut GlContext<N>, kind: ShaderKind, source: &str) -> Self {
        let dialect = Dialect::from_version(gl.version());
        let mut shader = Self {
            kind,
            handle: 0,
            source: convert::ensure_version(source, kind, dialect).into_owned(),
            log: String::new(),
            compiled: false,
        };
        shader.compile(gl);
        shader
    }

    pub fn from_file<N: NativeGl>(gl: &mut GlContext<N>, kind: ShaderKind, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {kind:?} shader {}", path.display()))?;
        Ok(Self::new(gl, kind, &source))
    }

    /// Compiles the stored source. A stage compiles once; later calls are
    /// refused with a warning until [`reload`](Self::reload).
    pub fn compile<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        if self.compiled {
            log::warn!("{:?} shader {} is already compiled", self.kind, self.handle);
            return false;
        }
        if !gl.shaders_supported() {
            log::error!("cannot compile a {:?} shader: shaders are not supported", self.kind);
            return false;
        }
        if self.handle == 0 {
            let Some(handle) = gl.create_shader(self.kind) else {
                log::error!("failed to create a {:?} shader object", self.kind);
                return false;
            };
            self.handle = handle;
        }

        self.compiled = gl.compile_shader(self.handle, &self.source);
        self.log = gl.shader_info_log(self.handle);
        if !self.compiled {
            log::error!("{:?} shader {} failed to compile:\n{}", self.kind, self.handle, self.log);
        } else if !self.log.is_empty() {
            log::debug!("{:?} shader {} compiled:\n{}", self.kind, self.handle, self.log);
        }
        self.compiled
    }

    /// Recreates the stage; handles from before a context loss are dropped
    /// without being deleted.
    pub fn reload<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        self.handle = 0;
        self.compiled = false;
        self.log.clear();
        self.compile(gl)
    }

    pub fn release<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        gl.delete_shader(self.handle);
        self.handle = 0;
        self.compiled = false;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.compiled && self.handle != 0
    }

    #[inline]
    pub fn handle(&self) -> u32 {
        self.handle
    }

    #[inline]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Source as compiled, after dialect conversion.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn log(&self) -> &str {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::GlConfig;
    use crate::headless::HeadlessGl;

    #[test]
    fn compiles_once() {
        let mut gl = GlContext::new(HeadlessGl::legacy(4, 4), GlConfig::default());
        let mut s = Shader::new(&mut gl, ShaderKind::Fragment, "void main() { gl_FragColor = gl_Color; }");
        assert!(s.is_valid());
        assert!(!s.compile(&mut gl));
        assert!(s.is_valid());
    }

    #[test]
    fn failure_keeps_log() {
        let mut gl = GlContext::new(HeadlessGl::core(4, 4), GlConfig::default());
        let s = Shader::new(&mut gl, ShaderKind::Fragment, "#error broken\nvoid main() {}");
        assert!(!s.is_valid());
        assert!(!s.log().is_empty());
    }

    #[test]
    fn legacy_fragment_source_is_converted_on_core() {
        let mut gl = GlContext::new(HeadlessGl::core(4, 4), GlConfig::default());
        let s = Shader::new(&mut gl, ShaderKind::Fragment, "void main() { gl_FragColor = gl_Color; }");
        assert!(s.is_valid());
        assert!(s.source().starts_with("#version 330"));
        assert!(s.source().contains("dgl_FragColor = dgl_Color"));
    }

    #[test]
    fn reload_after_context_loss() {
        let mut gl = GlContext::new(HeadlessGl::mobile(4, 4), GlConfig::default());
        let mut s = Shader::new(&mut gl, ShaderKind::Vertex, "void main() { gl_Position = ftransform(); }");
        let old = s.handle();
        gl.native_mut().lose_context();
        gl.native_mut().restore_context();
        gl.reload();
        assert!(s.reload(&mut gl));
        assert_ne!(s.handle(), old);
    }
}
