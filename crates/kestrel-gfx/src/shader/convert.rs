//! Rewrites legacy GLSL for the emulation backends.

use std::borrow::Cow;

use crate::gl::ShaderKind;

use super::{builtin, Dialect};

/// Adapts `source` to `dialect`.
///
/// - Legacy (`Glsl120`) sources are returned untouched.
/// - Vertex shaders relying on `ftransform()` or not reading `dgl_Vertex` are
///   replaced by the dialect's base vertex shader; the fixed-function inputs
///   they would need don't exist on emulated backends.
/// - Fragment shaders written against `gl_Color` / `gl_TexCoord` /
///   `gl_FragColor` get the dialect header and the `dgl_` names, unless they
///   already read `dgl_Color`.
pub fn ensure_version(source: &str, kind: ShaderKind, dialect: Dialect) -> Cow<'_, str> {
    if dialect == Dialect::Glsl120 {
        return Cow::Borrowed(source);
    }

    match kind {
        ShaderKind::Vertex => {
            if source.contains("ftransform") || !source.contains(builtin::ATTR_VERTEX) {
                log::debug!("vertex shader replaced by the {dialect:?} base shader");
                Cow::Borrowed(builtin::base_vertex_shader(dialect))
            } else {
                Cow::Borrowed(source)
            }
        }
        ShaderKind::Fragment => {
            let legacy = ["gl_Color", "gl_TexCoord", "gl_FragColor", "texture2D"]
                .iter()
                .any(|name| contains_ident(source, name));
            if !legacy || contains_ident(source, "dgl_Color") {
                return Cow::Borrowed(source);
            }
            Cow::Owned(convert_fragment(source, dialect))
        }
    }
}

fn convert_fragment(source: &str, dialect: Dialect) -> String {
    // Drop any existing version directive; the header supplies one.
    let body: String = source
        .lines()
        .filter(|l| !l.trim_start().starts_with("#version"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut body = replace_ident(&body, "gl_Color", "dgl_Color");
    body = replace_ident(&body, "gl_TexCoord", "dgl_TexCoord");

    let header = match dialect {
        Dialect::Glsl330 => {
            body = replace_ident(&body, "gl_FragColor", "dgl_FragColor");
            body = replace_ident(&body, "texture2D", "texture");
            "#version 330\nin vec4 dgl_Color;\nin vec4 dgl_TexCoord[1];\nin vec4 dgl_EyeVertex;\nout vec4 dgl_FragColor;\n"
        }
        Dialect::GlslEs100 => {
            "#ifdef GL_ES\nprecision mediump float;\n#endif\nvarying vec4 dgl_Color;\nvarying vec4 dgl_TexCoord[1];\nvarying vec4 dgl_EyeVertex;\n"
        }
        Dialect::Glsl120 => "",
    };

    let mut out = String::with_capacity(header.len() + body.len() + 1);
    out.push_str(header);
    out.push_str(&body);
    out.push('\n');
    out
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident_matches(source: &str, name: &str) -> Vec<usize> {
    source
        .match_indices(name)
        .filter(|(i, _)| {
            let before = source[..*i].chars().next_back();
            let after = source[i + name.len()..].chars().next();
            !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
        })
        .map(|(i, _)| i)
        .collect()
}

fn contains_ident(source: &str, name: &str) -> bool {
    !ident_matches(source, name).is_empty()
}

/// Replaces whole-identifier occurrences only, so `gl_Color` never matches
/// inside `dgl_Color`.
fn replace_ident(source: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for i in ident_matches(source, from) {
        out.push_str(&source[last..i]);
        out.push_str(to);
        last = i + from.len();
    }
    out.push_str(&source[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_FS: &str = "#version 120\nuniform sampler2D tex;\nvoid main() {\n    gl_FragColor = gl_Color * texture2D(tex, gl_TexCoord[0].xy);\n}\n";

    #[test]
    fn legacy_dialect_is_untouched() {
        assert!(matches!(
            ensure_version(LEGACY_FS, ShaderKind::Fragment, Dialect::Glsl120),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn core_fragment_gets_header_and_renamed_builtins() {
        let out = ensure_version(LEGACY_FS, ShaderKind::Fragment, Dialect::Glsl330);
        assert!(out.starts_with("#version 330\n"));
        assert!(!out.contains("#version 120"));
        assert!(out.contains("dgl_FragColor = dgl_Color * texture(tex, dgl_TexCoord[0].xy);"));
        assert!(!contains_ident(&out, "gl_Color"));
    }

    #[test]
    fn mobile_fragment_keeps_frag_color() {
        let out = ensure_version(LEGACY_FS, ShaderKind::Fragment, Dialect::GlslEs100);
        assert!(out.contains("precision mediump float;"));
        assert!(out.contains("gl_FragColor = dgl_Color * texture2D(tex, dgl_TexCoord[0].xy);"));
    }

    #[test]
    fn ftransform_vertex_shader_is_replaced() {
        let vs = "void main() { gl_Position = ftransform(); }";
        let out = ensure_version(vs, ShaderKind::Vertex, Dialect::Glsl330);
        assert_eq!(out, builtin::base_vertex_shader(Dialect::Glsl330));
    }

    #[test]
    fn emulation_ready_sources_pass_through() {
        let vs = builtin::base_vertex_shader(Dialect::Glsl330);
        assert!(matches!(ensure_version(vs, ShaderKind::Vertex, Dialect::Glsl330), Cow::Borrowed(_)));
        // Already written against dgl_Color, even though it uses gl_FragColor.
        let fs = builtin::base_fragment_shader(Dialect::GlslEs100);
        assert!(matches!(ensure_version(fs, ShaderKind::Fragment, Dialect::GlslEs100), Cow::Borrowed(_)));
    }

    #[test]
    fn identifier_replacement_respects_boundaries() {
        assert_eq!(replace_ident("dgl_Color gl_Color gl_Colors", "gl_Color", "X"), "dgl_Color X gl_Colors");
    }
}
