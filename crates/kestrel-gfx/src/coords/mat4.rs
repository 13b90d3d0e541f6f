use core::ops::Mul;

use super::Vec2;

/// Column-major 4×4 matrix with GL conventions (`m[col * 4 + row]`, column vectors).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub m: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[inline]
    pub const fn from_cols_array(m: [f32; 16]) -> Self {
        Self { m }
    }

    #[inline]
    pub const fn to_cols_array(&self) -> [f32; 16] {
        self.m
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[col * 4 + row]
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0] = x;
        out.m[5] = y;
        out.m[10] = z;
        out
    }

    /// Rotation of `degrees` around the axis `(x, y, z)`, as `glRotatef`.
    ///
    /// A zero-length axis yields the identity.
    pub fn rotation(degrees: f32, x: f32, y: f32, z: f32) -> Self {
        let len = (x * x + y * y + z * z).sqrt();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let (x, y, z) = (x / len, y / len, z / len);
        let (s, c) = degrees.to_radians().sin_cos();
        let t = 1.0 - c;

        Self::from_cols_array([
            x * x * t + c,
            y * x * t + z * s,
            x * z * t - y * s,
            0.0,
            x * y * t - z * s,
            y * y * t + c,
            y * z * t + x * s,
            0.0,
            x * z * t + y * s,
            y * z * t - x * s,
            z * z * t + c,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// Orthographic projection, as `glOrtho`.
    pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let (rl, tb, fnr) = (right - left, top - bottom, far - near);
        let mut out = Self::IDENTITY;
        out.m[0] = 2.0 / rl;
        out.m[5] = 2.0 / tb;
        out.m[10] = -2.0 / fnr;
        out.m[12] = -(right + left) / rl;
        out.m[13] = -(top + bottom) / tb;
        out.m[14] = -(far + near) / fnr;
        out
    }

    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = self.m[col * 4 + row];
            }
        }
        Self::from_cols_array(out)
    }

    /// Gauss-Jordan inverse with partial pivoting; `None` when singular.
    pub fn inverse(&self) -> Option<Self> {
        // Inverting the transpose and transposing back is the same as inverting,
        // so the column-major storage is treated as rows here.
        let mut a = [[0.0f64; 8]; 4];
        for (i, row) in a.iter_mut().enumerate() {
            for j in 0..4 {
                row[j] = self.m[i * 4 + j] as f64;
            }
            row[4 + i] = 1.0;
        }

        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&p, &q| a[p][col].abs().total_cmp(&a[q][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < 1e-12 {
                return None;
            }
            a.swap(col, pivot);

            let inv = 1.0 / a[col][col];
            for v in a[col].iter_mut() {
                *v *= inv;
            }
            for row in 0..4 {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor != 0.0 {
                    for k in 0..8 {
                        a[row][k] -= factor * a[col][k];
                    }
                }
            }
        }

        let mut out = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                out[i * 4 + j] = a[i][4 + j] as f32;
            }
        }
        Some(Self::from_cols_array(out))
    }

    #[inline]
    pub fn transform(&self, v: [f32; 4]) -> [f32; 4] {
        let m = &self.m;
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = m[row] * v[0] + m[4 + row] * v[1] + m[8 + row] * v[2] + m[12 + row] * v[3];
        }
        out
    }

    /// Transforms a 2D point (z = 0, w = 1) and drops z/w.
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let o = self.transform([p.x, p.y, 0.0, 1.0]);
        Vec2::new(o[0], o[1])
    }

    /// Row vector times matrix (`p * M`), the rule used to move plane equations
    /// between coordinate spaces.
    #[inline]
    pub fn transform_plane(&self, p: [f32; 4]) -> [f32; 4] {
        let m = &self.m;
        let mut out = [0.0; 4];
        for (col, o) in out.iter_mut().enumerate() {
            *o = p[0] * m[col * 4] + p[1] * m[col * 4 + 1] + p[2] * m[col * 4 + 2] + p[3] * m[col * 4 + 3];
        }
        out
    }

    /// Maps an object-space point to window coordinates, as `gluProject`.
    ///
    /// `mvp` is `projection * modelview`; `viewport` is `[x, y, width, height]`.
    pub fn project(mvp: &Mat4, p: [f32; 3], viewport: [f32; 4]) -> Option<[f32; 3]> {
        let c = mvp.transform([p[0], p[1], p[2], 1.0]);
        if c[3] == 0.0 {
            return None;
        }
        let ndc = [c[0] / c[3], c[1] / c[3], c[2] / c[3]];
        Some([
            viewport[0] + (ndc[0] + 1.0) * 0.5 * viewport[2],
            viewport[1] + (ndc[1] + 1.0) * 0.5 * viewport[3],
            (ndc[2] + 1.0) * 0.5,
        ])
    }

    /// Inverse of [`project`](Self::project), as `gluUnProject`.
    pub fn unproject(mvp: &Mat4, win: [f32; 3], viewport: [f32; 4]) -> Option<[f32; 3]> {
        let inv = mvp.inverse()?;
        let ndc = [
            (win[0] - viewport[0]) / viewport[2] * 2.0 - 1.0,
            (win[1] - viewport[1]) / viewport[3] * 2.0 - 1.0,
            win[2] * 2.0 - 1.0,
            1.0,
        ];
        let o = inv.transform(ndc);
        if o[3] == 0.0 {
            return None;
        }
        Some([o[0] / o[3], o[1] / o[3], o[2] / o[3]])
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f32) -> bool {
        self.m.iter().zip(other.m.iter()).all(|(a, b)| (a - b).abs() <= eps)
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut acc = 0.0;
                for k in 0..4 {
                    acc += self.m[k * 4 + row] * rhs.m[col * 4 + k];
                }
                out[col * 4 + row] = acc;
            }
        }
        Mat4::from_cols_array(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn translation_moves_points() {
        let p = Mat4::translation(3.0, -2.0, 0.0).transform_point(Vec2::new(1.0, 1.0));
        assert_eq!(p, Vec2::new(4.0, -1.0));
    }

    #[test]
    fn rotation_about_z_is_counter_clockwise() {
        let p = Mat4::rotation(90.0, 0.0, 0.0, 1.0).transform_point(Vec2::new(1.0, 0.0));
        assert!((p.x - 0.0).abs() < EPS);
        assert!((p.y - 1.0).abs() < EPS);
    }

    #[test]
    fn product_applies_right_operand_first() {
        // T * S: scale, then translate.
        let m = Mat4::translation(10.0, 0.0, 0.0) * Mat4::scaling(2.0, 2.0, 1.0);
        assert_eq!(m.transform_point(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 2.0));
    }

    #[test]
    fn inverse_round_trips() {
        let m = Mat4::translation(5.0, 7.0, 0.0)
            * Mat4::rotation(33.0, 0.0, 0.0, 1.0)
            * Mat4::scaling(2.0, 0.5, 1.0);
        let inv = m.inverse().unwrap();
        assert!((m * inv).approx_eq(&Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(Mat4::scaling(0.0, 1.0, 1.0).inverse().is_none());
    }

    #[test]
    fn ortho_maps_top_left_to_ndc_corner() {
        let p = Mat4::ortho(0.0, 200.0, 100.0, 0.0, -1.0, 1.0);
        let tl = p.transform([0.0, 0.0, 0.0, 1.0]);
        let br = p.transform([200.0, 100.0, 0.0, 1.0]);
        assert!((tl[0] + 1.0).abs() < EPS && (tl[1] - 1.0).abs() < EPS);
        assert!((br[0] - 1.0).abs() < EPS && (br[1] + 1.0).abs() < EPS);
    }

    #[test]
    fn plane_transform_preserves_point_side() {
        // x >= 4 in object space; the modelview shifts everything by +10.
        let mv = Mat4::translation(10.0, 0.0, 0.0);
        let plane = [1.0, 0.0, 0.0, -4.0];
        let eye_plane = mv.inverse().unwrap().transform_plane(plane);
        let eye = mv.transform([5.0, 0.0, 0.0, 1.0]);
        let d: f32 = (0..4).map(|i| eye_plane[i] * eye[i]).sum();
        assert!((d - 1.0).abs() < EPS);
    }

    #[test]
    fn project_unproject_round_trip() {
        let mvp = Mat4::ortho(0.0, 64.0, 64.0, 0.0, -1.0, 1.0);
        let vp = [0.0, 0.0, 64.0, 64.0];
        let w = Mat4::project(&mvp, [16.0, 8.0, 0.0], vp).unwrap();
        let o = Mat4::unproject(&mvp, w, vp).unwrap();
        assert!((o[0] - 16.0).abs() < 1e-3 && (o[1] - 8.0).abs() < 1e-3);
    }
}
