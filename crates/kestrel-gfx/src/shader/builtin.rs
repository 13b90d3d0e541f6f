//! Base programs of the emulation backends.
//!
//! They reproduce the fixed-function subset the 2D layer relies on:
//! model-view/projection transform, per-vertex color, one texture unit,
//! point sprites and six user clip planes. The `dgl_*` names are the
//! contract between these sources, the backends and the native devices.

use super::Dialect;

pub const ATTR_VERTEX: &str = "dgl_Vertex";
pub const ATTR_COLOR: &str = "dgl_FrontColor";
pub const ATTR_TEXCOORD: [&str; 4] = [
    "dgl_MultiTexCoord0",
    "dgl_MultiTexCoord1",
    "dgl_MultiTexCoord2",
    "dgl_MultiTexCoord3",
];

pub const UNIFORM_PROJECTION: &str = "dgl_ProjectionMatrix";
pub const UNIFORM_MODELVIEW: &str = "dgl_ModelViewMatrix";
pub const UNIFORM_TEX_ACTIVE: &str = "dgl_TexActive";
pub const UNIFORM_POINT_SPRITE: &str = "dgl_PointSpriteActive";
pub const UNIFORM_POINT_SIZE: &str = "dgl_PointSize";
pub const UNIFORM_CLIPPING: &str = "dgl_ClippingEnabled";
pub const UNIFORM_CLIP_ENABLED: &str = "dgl_ClipEnabled";
pub const UNIFORM_CLIP_PLANE: &str = "dgl_ClipPlane";

const VS_330: &str = r#"#version 330
in vec4 dgl_Vertex;
in vec4 dgl_FrontColor;
in vec4 dgl_MultiTexCoord0;
uniform mat4 dgl_ProjectionMatrix;
uniform mat4 dgl_ModelViewMatrix;
uniform float dgl_PointSize;
out vec4 dgl_Color;
out vec4 dgl_TexCoord[1];
out vec4 dgl_EyeVertex;
void main() {
    dgl_EyeVertex = dgl_ModelViewMatrix * dgl_Vertex;
    dgl_Color = dgl_FrontColor;
    dgl_TexCoord[0] = dgl_MultiTexCoord0;
    gl_PointSize = dgl_PointSize;
    gl_Position = dgl_ProjectionMatrix * dgl_EyeVertex;
}
"#;

const FS_330: &str = r#"#version 330
uniform sampler2D textureUnit0;
uniform int dgl_TexActive;
uniform int dgl_PointSpriteActive;
uniform int dgl_ClippingEnabled;
uniform int dgl_ClipEnabled[6];
uniform vec4 dgl_ClipPlane[6];
in vec4 dgl_Color;
in vec4 dgl_TexCoord[1];
in vec4 dgl_EyeVertex;
out vec4 dgl_FragColor;
void main() {
    if (dgl_ClippingEnabled == 1) {
        for (int i = 0; i < 6; i++) {
            if (dgl_ClipEnabled[i] == 1 && dot(dgl_ClipPlane[i], dgl_EyeVertex) < 0.0) {
                discard;
            }
        }
    }
    if (dgl_TexActive == 1) {
        vec2 uv = dgl_PointSpriteActive == 1 ? gl_PointCoord : dgl_TexCoord[0].xy;
        dgl_FragColor = dgl_Color * texture(textureUnit0, uv);
    } else {
        dgl_FragColor = dgl_Color;
    }
}
"#;

const VS_ES100: &str = r#"#ifdef GL_ES
precision mediump float;
#endif
attribute vec4 dgl_Vertex;
attribute vec4 dgl_FrontColor;
attribute vec4 dgl_MultiTexCoord0;
uniform mat4 dgl_ProjectionMatrix;
uniform mat4 dgl_ModelViewMatrix;
uniform float dgl_PointSize;
varying vec4 dgl_Color;
varying vec4 dgl_TexCoord[1];
varying vec4 dgl_EyeVertex;
void main() {
    dgl_EyeVertex = dgl_ModelViewMatrix * dgl_Vertex;
    dgl_Color = dgl_FrontColor;
    dgl_TexCoord[0] = dgl_MultiTexCoord0;
    gl_PointSize = dgl_PointSize;
    gl_Position = dgl_ProjectionMatrix * dgl_EyeVertex;
}
"#;

const FS_ES100: &str = r#"#ifdef GL_ES
precision mediump float;
#endif
uniform sampler2D textureUnit0;
uniform int dgl_TexActive;
uniform int dgl_PointSpriteActive;
uniform int dgl_ClippingEnabled;
uniform int dgl_ClipEnabled[6];
uniform vec4 dgl_ClipPlane[6];
varying vec4 dgl_Color;
varying vec4 dgl_TexCoord[1];
varying vec4 dgl_EyeVertex;
void main() {
    if (dgl_ClippingEnabled == 1) {
        for (int i = 0; i < 6; i++) {
            if (dgl_ClipEnabled[i] == 1 && dot(dgl_ClipPlane[i], dgl_EyeVertex) < 0.0) {
                discard;
            }
        }
    }
    if (dgl_TexActive == 1) {
        vec2 uv = dgl_PointSpriteActive == 1 ? gl_PointCoord : dgl_TexCoord[0].xy;
        gl_FragColor = dgl_Color * texture2D(textureUnit0, uv);
    } else {
        gl_FragColor = dgl_Color;
    }
}
"#;

const VS_120: &str = r#"#version 120
void main() {
    gl_FrontColor = gl_Color;
    gl_TexCoord[0] = gl_MultiTexCoord0;
    gl_Position = ftransform();
}
"#;

const FS_120: &str = r#"#version 120
uniform sampler2D textureUnit0;
uniform int dgl_TexActive;
void main() {
    if (dgl_TexActive == 1) {
        gl_FragColor = gl_Color * texture2D(textureUnit0, gl_TexCoord[0].xy);
    } else {
        gl_FragColor = gl_Color;
    }
}
"#;

/// Base vertex shader for `dialect`.
pub fn base_vertex_shader(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Glsl120 => VS_120,
        Dialect::Glsl330 => VS_330,
        Dialect::GlslEs100 => VS_ES100,
    }
}

/// Base fragment shader for `dialect`.
pub fn base_fragment_shader(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Glsl120 => FS_120,
        Dialect::Glsl330 => FS_330,
        Dialect::GlslEs100 => FS_ES100,
    }
}
