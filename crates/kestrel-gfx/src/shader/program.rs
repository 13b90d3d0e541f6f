use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::coords::Mat4;
use crate::gl::{GlContext, NativeGl, ShaderKind};

use super::Shader;

/// A linked vertex + fragment program with cached uniform and attribute
/// locations.
///
/// Sources are retained so the program can be rebuilt after a context loss
/// with [`reload`](Self::reload).
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    handle: u32,
    vertex_source: String,
    fragment_source: String,
    shaders: Vec<Shader>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, Option<i32>>,
    attributes: HashMap<String, Option<u32>>,
}

impl ShaderProgram {
    pub fn from_sources<N: NativeGl>(gl: &mut GlContext<N>, name: &str, vertex: &str, fragment: &str) -> Self {
        let mut program = Self {
            name: name.to_owned(),
            handle: 0,
            vertex_source: vertex.to_owned(),
            fragment_source: fragment.to_owned(),
            shaders: Vec::with_capacity(2),
            linked: false,
            log: String::new(),
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
        };
        program.build(gl);
        program
    }

    pub fn from_files<N: NativeGl>(
        gl: &mut GlContext<N>,
        name: &str,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let (vertex, fragment) = (vertex.as_ref(), fragment.as_ref());
        let vs = std::fs::read_to_string(vertex)
            .with_context(|| format!("failed to read vertex shader {}", vertex.display()))?;
        let fs = std::fs::read_to_string(fragment)
            .with_context(|| format!("failed to read fragment shader {}", fragment.display()))?;
        Ok(Self::from_sources(gl, name, &vs, &fs))
    }

    fn build<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        if !gl.shaders_supported() {
            log::error!("program '{}': shaders are not supported by this context", self.name);
            return;
        }
        let Some(handle) = gl.create_program() else {
            log::error!("program '{}': failed to create a program object", self.name);
            return;
        };
        self.handle = handle;

        self.shaders.clear();
        for (kind, source) in [
            (ShaderKind::Vertex, self.vertex_source.as_str()),
            (ShaderKind::Fragment, self.fragment_source.as_str()),
        ] {
            let shader = Shader::new(gl, kind, source);
            if shader.is_valid() {
                gl.attach_shader(handle, shader.handle());
            }
            self.shaders.push(shader);
        }
        self.link(gl);
    }

    /// Links the attached stages. A program links once; later calls are
    /// refused with a warning.
    pub fn link<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        if self.linked {
            log::warn!("program '{}' is already linked", self.name);
            return false;
        }
        if self.handle == 0 {
            return false;
        }

        self.linked = gl.link_program(self.handle);
        self.log = gl.program_info_log(self.handle);
        if !self.linked {
            log::error!("program '{}' failed to link:\n{}", self.name, self.log);
        } else if !self.log.is_empty() {
            log::warn!("program '{}' linked with warnings:\n{}", self.name, self.log);
        } else {
            log::debug!("program '{}' linked (id {})", self.name, self.handle);
        }
        self.linked
    }

    pub fn uniform_location<N: NativeGl>(&mut self, gl: &GlContext<N>, name: &str) -> Option<i32> {
        if !self.is_valid() {
            return None;
        }
        if let Some(&loc) = self.uniforms.get(name) {
            return loc;
        }
        let loc = gl.uniform_location(self.handle, name);
        if loc.is_none() {
            log::debug!("program '{}' has no uniform '{name}'", self.name);
        }
        self.uniforms.insert(name.to_owned(), loc);
        loc
    }

    pub fn attribute_location<N: NativeGl>(&mut self, gl: &GlContext<N>, name: &str) -> Option<u32> {
        if !self.is_valid() {
            return None;
        }
        if let Some(&loc) = self.attributes.get(name) {
            return loc;
        }
        let loc = gl.attrib_location(self.handle, name);
        self.attributes.insert(name.to_owned(), loc);
        loc
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    pub fn set_uniform_i32<N: NativeGl>(&mut self, gl: &mut GlContext<N>, name: &str, v: i32) -> bool {
        let Some(loc) = self.uniform_location(gl, name) else { return false };
        gl.with_program(self.handle, |n| n.uniform_1i(loc, v));
        true
    }

    pub fn set_uniform_f32<N: NativeGl>(&mut self, gl: &mut GlContext<N>, name: &str, v: f32) -> bool {
        let Some(loc) = self.uniform_location(gl, name) else { return false };
        gl.with_program(self.handle, |n| n.uniform_1f(loc, v));
        true
    }

    pub fn set_uniform_vec2<N: NativeGl>(&mut self, gl: &mut GlContext<N>, name: &str, v: [f32; 2]) -> bool {
        let Some(loc) = self.uniform_location(gl, name) else { return false };
        gl.with_program(self.handle, |n| n.uniform_2f(loc, v));
        true
    }

    pub fn set_uniform_vec4<N: NativeGl>(&mut self, gl: &mut GlContext<N>, name: &str, v: [f32; 4]) -> bool {
        let Some(loc) = self.uniform_location(gl, name) else { return false };
        gl.with_program(self.handle, |n| n.uniform_4f(loc, v));
        true
    }

    pub fn set_uniform_mat4<N: NativeGl>(&mut self, gl: &mut GlContext<N>, name: &str, m: &Mat4) -> bool {
        let Some(loc) = self.uniform_location(gl, name) else { return false };
        gl.with_program(self.handle, |n| n.uniform_matrix4(loc, &m.m));
        true
    }

    // ── binding ───────────────────────────────────────────────────────────

    pub fn bind<N: NativeGl>(&self, gl: &mut GlContext<N>) -> bool {
        if !self.is_valid() {
            log::error!("program '{}' is not valid and can't be bound", self.name);
            return false;
        }
        gl.set_shader(Some(self.handle))
    }

    /// Restores the default pipeline if this program is current.
    pub fn unbind<N: NativeGl>(&self, gl: &mut GlContext<N>) {
        if gl.state().shader == Some(self.handle) {
            gl.set_shader(None);
        }
    }

    /// Rebuilds the program from its retained sources. Old handles are
    /// assumed dead and aren't deleted.
    pub fn reload<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        self.handle = 0;
        self.linked = false;
        self.log.clear();
        self.uniforms.clear();
        self.attributes.clear();
        self.build(gl);
        self.is_valid()
    }

    /// Deletes the native objects. The program is invalid afterwards.
    pub fn release<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        for shader in &mut self.shaders {
            shader.release(gl);
        }
        self.shaders.clear();
        if self.handle != 0 {
            gl.delete_program(self.handle);
        }
        self.handle = 0;
        self.linked = false;
        self.uniforms.clear();
        self.attributes.clear();
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.linked && self.handle != 0
    }

    #[inline]
    pub fn handle(&self) -> u32 {
        self.handle
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn shaders(&self) -> &[Shader] {
        &self.shaders
    }
}
