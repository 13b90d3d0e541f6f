use std::collections::HashSet;
use std::fmt;

/// API generation a context runs on. Selected once per context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlVersion {
    /// Fixed-function GL 2 class API.
    Legacy,
    /// GL 3 core profile: shaders only, no quads, no client arrays.
    Core,
    /// GLES 2 class API: shaders only, no quads, no polygon mode.
    Mobile,
}

impl GlVersion {
    /// Parses a requested version name.
    ///
    /// Accepts the short numeric forms (`"2"`, `"3"`) and the usual aliases
    /// (`"gl3cp"`, `"core profile"`, `"es2"`, `"opengl es 2"`, …).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "2" | "gl2" | "opengl 2" | "opengl2" | "legacy" => Some(GlVersion::Legacy),
            "3" | "gl3" | "gl3cp" | "opengl 3" | "opengl3" | "core profile" | "core" | "cp"
            | "opengl 3 core profile" => Some(GlVersion::Core),
            "es2" | "gles2" | "opengl es 2" | "opengles2" | "mobile" => Some(GlVersion::Mobile),
            _ => None,
        }
    }

    /// Derives the version from a device `VERSION` string.
    pub fn detect(version_string: &str) -> Self {
        let v = version_string.trim();
        if v.starts_with("OpenGL ES") {
            return GlVersion::Mobile;
        }
        let major = v
            .split(|c: char| !c.is_ascii_digit())
            .find(|p| !p.is_empty())
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(2);
        if major >= 3 { GlVersion::Core } else { GlVersion::Legacy }
    }

    /// Whether fixed-function behavior is emulated with shaders.
    #[inline]
    pub fn is_emulated(self) -> bool {
        !matches!(self, GlVersion::Legacy)
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GlVersion::Legacy => "OpenGL 2",
            GlVersion::Core => "OpenGL 3 Core Profile",
            GlVersion::Mobile => "OpenGL ES 2",
        })
    }
}

/// Extensions the state layer and its callers branch on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    TextureNonPowerOfTwo,
    PointParameters,
    PointSprite,
    ShadingLanguage100,
    ShaderObjects,
    VertexShader,
    FragmentShader,
    FramebufferObject,
    Multitexture,
    TextureCompressionS3tc,
    VertexBufferObject,
    PixelBufferObject,
    VertexArrayObject,
    BlendFuncSeparate,
    BlendMinmax,
    BlendSubtract,
}

impl Extension {
    pub const ALL: [Extension; 16] = [
        Extension::TextureNonPowerOfTwo,
        Extension::PointParameters,
        Extension::PointSprite,
        Extension::ShadingLanguage100,
        Extension::ShaderObjects,
        Extension::VertexShader,
        Extension::FragmentShader,
        Extension::FramebufferObject,
        Extension::Multitexture,
        Extension::TextureCompressionS3tc,
        Extension::VertexBufferObject,
        Extension::PixelBufferObject,
        Extension::VertexArrayObject,
        Extension::BlendFuncSeparate,
        Extension::BlendMinmax,
        Extension::BlendSubtract,
    ];

    /// Driver names that advertise this extension; the first one is canonical.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Extension::TextureNonPowerOfTwo => {
                &["GL_ARB_texture_non_power_of_two", "GL_OES_texture_npot"]
            }
            Extension::PointParameters => &["GL_ARB_point_parameters"],
            Extension::PointSprite => &["GL_ARB_point_sprite", "GL_OES_point_sprite"],
            Extension::ShadingLanguage100 => &["GL_ARB_shading_language_100"],
            Extension::ShaderObjects => &["GL_ARB_shader_objects"],
            Extension::VertexShader => &["GL_ARB_vertex_shader"],
            Extension::FragmentShader => &["GL_ARB_fragment_shader"],
            Extension::FramebufferObject => {
                &["GL_EXT_framebuffer_object", "GL_ARB_framebuffer_object", "GL_OES_framebuffer_object"]
            }
            Extension::Multitexture => &["GL_ARB_multitexture"],
            Extension::TextureCompressionS3tc => {
                &["GL_EXT_texture_compression_s3tc", "GL_EXT_texture_compression_dxt1"]
            }
            Extension::VertexBufferObject => &["GL_ARB_vertex_buffer_object"],
            Extension::PixelBufferObject => &["GL_ARB_pixel_buffer_object"],
            Extension::VertexArrayObject => &["GL_ARB_vertex_array_object", "GL_OES_vertex_array_object"],
            Extension::BlendFuncSeparate => &["GL_EXT_blend_func_separate", "GL_OES_blend_func_separate"],
            Extension::BlendMinmax => &["GL_EXT_blend_minmax"],
            Extension::BlendSubtract => &["GL_EXT_blend_subtract", "GL_OES_blend_subtract"],
        }
    }

    /// Extensions that are core functionality of `version`, whatever the driver lists.
    fn implied_by(version: GlVersion) -> &'static [Extension] {
        match version {
            GlVersion::Legacy => &[],
            GlVersion::Core => &[
                Extension::TextureNonPowerOfTwo,
                Extension::PointSprite,
                Extension::ShadingLanguage100,
                Extension::ShaderObjects,
                Extension::VertexShader,
                Extension::FragmentShader,
                Extension::FramebufferObject,
                Extension::Multitexture,
                Extension::VertexBufferObject,
                Extension::PixelBufferObject,
                Extension::VertexArrayObject,
                Extension::BlendFuncSeparate,
                Extension::BlendMinmax,
                Extension::BlendSubtract,
            ],
            GlVersion::Mobile => &[
                Extension::ShadingLanguage100,
                Extension::ShaderObjects,
                Extension::VertexShader,
                Extension::FragmentShader,
                Extension::FramebufferObject,
                Extension::Multitexture,
                Extension::VertexBufferObject,
                Extension::BlendFuncSeparate,
                Extension::BlendSubtract,
            ],
        }
    }
}

/// Immutable capability set of a context: the API version plus the parsed
/// extension string.
#[derive(Debug, Clone)]
pub struct Capabilities {
    version: GlVersion,
    names: HashSet<String>,
    known: HashSet<Extension>,
}

impl Capabilities {
    pub fn detect(version: GlVersion, extensions: &str) -> Self {
        let names: HashSet<String> = extensions.split_whitespace().map(str::to_owned).collect();

        let mut known: HashSet<Extension> = Extension::ALL
            .into_iter()
            .filter(|e| e.names().iter().any(|n| names.contains(*n)))
            .collect();
        known.extend(Extension::implied_by(version).iter().copied());

        log::debug!(
            "capabilities: {version}, {} extensions listed, {} recognized",
            names.len(),
            known.len()
        );

        Self { version, names, known }
    }

    #[inline]
    pub fn version(&self) -> GlVersion {
        self.version
    }

    /// Whether the driver listed `name` verbatim.
    #[inline]
    pub fn is_extension(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether `ext` is usable, either listed or implied by the version.
    #[inline]
    pub fn has(&self, ext: Extension) -> bool {
        self.known.contains(&ext)
    }

    pub fn shaders_supported(&self) -> bool {
        self.version.is_emulated()
            || (self.has(Extension::ShaderObjects)
                && self.has(Extension::VertexShader)
                && self.has(Extension::FragmentShader))
    }

    #[inline]
    pub fn quads_supported(&self) -> bool {
        self.version == GlVersion::Legacy
    }

    /// Vertices emitted per quad by the batcher: 4 natively, 6 when emulated.
    #[inline]
    pub fn quad_vertex_count(&self) -> usize {
        if self.quads_supported() { 4 } else { 6 }
    }

    #[inline]
    pub fn buffer_objects_supported(&self) -> bool {
        self.has(Extension::VertexBufferObject)
    }

    /// Whether client memory can be handed straight to pointer calls.
    #[inline]
    pub fn client_arrays_supported(&self) -> bool {
        self.version != GlVersion::Core
    }

    #[inline]
    pub fn blend_func_separate_supported(&self) -> bool {
        self.has(Extension::BlendFuncSeparate)
    }

    #[inline]
    pub fn point_sprite_supported(&self) -> bool {
        self.has(Extension::PointSprite)
    }

    #[inline]
    pub fn polygon_mode_supported(&self) -> bool {
        self.version != GlVersion::Mobile
    }

    /// Wide (> 1px) lines; core profiles reject them.
    #[inline]
    pub fn wide_lines_supported(&self) -> bool {
        self.version != GlVersion::Core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_aliases() {
        assert_eq!(GlVersion::parse("gl3cp"), Some(GlVersion::Core));
        assert_eq!(GlVersion::parse("Core Profile"), Some(GlVersion::Core));
        assert_eq!(GlVersion::parse("ES2"), Some(GlVersion::Mobile));
        assert_eq!(GlVersion::parse("2"), Some(GlVersion::Legacy));
        assert_eq!(GlVersion::parse("vulkan"), None);
    }

    #[test]
    fn detects_version_from_driver_string() {
        assert_eq!(GlVersion::detect("2.1 Mesa 23.0"), GlVersion::Legacy);
        assert_eq!(GlVersion::detect("4.6.0 NVIDIA 535.54"), GlVersion::Core);
        assert_eq!(GlVersion::detect("OpenGL ES 2.0 Mesa"), GlVersion::Mobile);
        assert_eq!(GlVersion::detect(""), GlVersion::Legacy);
    }

    #[test]
    fn extension_string_is_parsed_once_into_a_set() {
        let caps = Capabilities::detect(
            GlVersion::Legacy,
            "GL_ARB_vertex_buffer_object  GL_EXT_blend_func_separate GL_VENDOR_thing",
        );
        assert!(caps.is_extension("GL_VENDOR_thing"));
        assert!(!caps.is_extension("GL_ARB_vertex"));
        assert!(caps.has(Extension::VertexBufferObject));
        assert!(caps.blend_func_separate_supported());
        assert!(!caps.shaders_supported());
        assert!(caps.quads_supported());
        assert_eq!(caps.quad_vertex_count(), 4);
    }

    #[test]
    fn legacy_shaders_need_all_three_extensions() {
        let partial = Capabilities::detect(GlVersion::Legacy, "GL_ARB_shader_objects GL_ARB_vertex_shader");
        assert!(!partial.shaders_supported());
        let full = Capabilities::detect(
            GlVersion::Legacy,
            "GL_ARB_shader_objects GL_ARB_vertex_shader GL_ARB_fragment_shader",
        );
        assert!(full.shaders_supported());
    }

    #[test]
    fn emulated_versions_imply_core_features() {
        let core = Capabilities::detect(GlVersion::Core, "");
        assert!(core.shaders_supported());
        assert!(core.buffer_objects_supported());
        assert!(!core.quads_supported());
        assert!(!core.client_arrays_supported());
        assert_eq!(core.quad_vertex_count(), 6);

        let mobile = Capabilities::detect(GlVersion::Mobile, "GL_OES_point_sprite");
        assert!(mobile.point_sprite_supported());
        assert!(!mobile.has(Extension::BlendMinmax));
        assert!(!mobile.polygon_mode_supported());
    }
}
