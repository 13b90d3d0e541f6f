//! Minimal GLSL declaration scanner.
//!
//! The software and wgpu devices don't run GLSL; they only need the names a
//! program declares to hand out uniform and attribute locations.

use crate::gl::ShaderKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Declarations {
    /// `(name, array length)`; plain uniforms have length 1.
    pub uniforms: Vec<(String, usize)>,
    /// Vertex inputs, vertex shaders only.
    pub attributes: Vec<String>,
}

impl Declarations {
    /// Adds names from `other` that aren't declared yet.
    pub fn merge(&mut self, other: Declarations) {
        for u in other.uniforms {
            if !self.uniforms.iter().any(|(n, _)| *n == u.0) {
                self.uniforms.push(u);
            }
        }
        for a in other.attributes {
            if !self.attributes.contains(&a) {
                self.attributes.push(a);
            }
        }
    }
}

pub(crate) fn scan(source: &str, kind: ShaderKind) -> Declarations {
    let mut out = Declarations::default();

    for statement in source.split(';') {
        // Strip line comments and preprocessor lines.
        let cleaned: String = statement
            .lines()
            .map(|l| l.split("//").next().unwrap_or(""))
            .filter(|l| !l.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join(" ");

        let mut tokens = cleaned.split_whitespace().peekable();
        // Skip a layout qualifier such as `layout(location = 0)`.
        if tokens.peek().is_some_and(|t| t.starts_with("layout")) {
            for t in tokens.by_ref() {
                if t.ends_with(')') {
                    break;
                }
            }
        }

        let Some(qualifier) = tokens.next() else { continue };
        let is_uniform = qualifier == "uniform";
        let is_attribute = kind == ShaderKind::Vertex && (qualifier == "attribute" || qualifier == "in");
        if !is_uniform && !is_attribute {
            continue;
        }

        let rest: Vec<&str> = tokens
            .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp" | "flat" | "smooth"))
            .collect();
        if rest.len() < 2 || rest.iter().any(|t| t.contains('(') || t.contains('{')) {
            continue;
        }

        // `type a, b[4]` → declarators after the type.
        let declarators = rest[1..].join(" ");
        for decl in declarators.split(',') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }
            let (name, len) = match decl.split_once('[') {
                Some((n, tail)) => {
                    let len = tail.trim_end_matches(']').trim().parse::<usize>().unwrap_or(1);
                    (n.trim(), len.max(1))
                }
                None => (decl, 1),
            };
            if is_uniform {
                out.uniforms.push((name.to_owned(), len));
            } else {
                out.attributes.push(name.to_owned());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{builtin, Dialect};

    #[test]
    fn finds_uniforms_and_vertex_inputs() {
        let src = "#version 330\nin vec4 pos;\nlayout(location = 1) in vec2 uv;\nuniform mediump float a, b[3];\nout vec4 c;\nvoid main() { gl_Position = pos; }\n";
        let d = scan(src, ShaderKind::Vertex);
        assert_eq!(d.attributes, vec!["pos".to_string(), "uv".to_string()]);
        assert_eq!(d.uniforms, vec![("a".to_string(), 1), ("b".to_string(), 3)]);
    }

    #[test]
    fn fragment_inputs_are_not_attributes() {
        let d = scan("in vec4 dgl_Color;\nuniform int dgl_TexActive;\n", ShaderKind::Fragment);
        assert!(d.attributes.is_empty());
        assert_eq!(d.uniforms.len(), 1);
    }

    #[test]
    fn base_programs_declare_the_emulation_contract() {
        for dialect in [Dialect::Glsl330, Dialect::GlslEs100] {
            let mut d = scan(builtin::base_vertex_shader(dialect), ShaderKind::Vertex);
            d.merge(scan(builtin::base_fragment_shader(dialect), ShaderKind::Fragment));
            assert!(d.attributes.iter().any(|a| a == builtin::ATTR_VERTEX));
            assert!(d.attributes.iter().any(|a| a == builtin::ATTR_COLOR));
            assert!(d.uniforms.iter().any(|(n, l)| n == builtin::UNIFORM_CLIP_PLANE && *l == 6));
            assert!(d.uniforms.iter().any(|(n, _)| n == builtin::UNIFORM_PROJECTION));
        }
    }
}
