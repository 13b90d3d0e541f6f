use crate::coords::{Rect, Vec2};

/// Three corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle(pub [Vec2; 3]);

impl Triangle {
    pub const fn new(a: Vec2, b: Vec2, c: Vec2) -> Self {
        Self([a, b, c])
    }
}

/// Four corners in perimeter order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad(pub [Vec2; 4]);

impl Quad {
    pub const fn new(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Self {
        Self([a, b, c, d])
    }

    /// Corners of `r`, counter-clockwise on screen from the top-left.
    pub fn from_rect(r: Rect) -> Self {
        let (x0, y0) = (r.origin.x, r.origin.y);
        let (x1, y1) = (x0 + r.size.x, y0 + r.size.y);
        Self([Vec2::new(x0, y0), Vec2::new(x0, y1), Vec2::new(x1, y1), Vec2::new(x1, y0)])
    }

    pub fn translated(self, offset: Vec2) -> Self {
        Self(self.0.map(|p| p + offset))
    }

    pub fn center(&self) -> Vec2 {
        self.0.iter().fold(Vec2::zero(), |acc, p| acc + *p) * 0.25
    }
}

/// Closed outline; filled shapes treat it as convex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    pub points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn from_rect(r: Rect) -> Self {
        Self::new(Quad::from_rect(r).0.to_vec())
    }

    /// Rectangle with corners rounded to `radius`, each corner subdivided into
    /// `segments` steps. The radius is clamped to half the shorter side.
    pub fn rounded_rectangle(r: Rect, radius: f32, segments: u32) -> Self {
        let radius = radius.clamp(0.0, r.size.x.abs().min(r.size.y.abs()) * 0.5);
        if radius == 0.0 || segments == 0 {
            return Self::from_rect(r);
        }

        let (x0, y0) = (r.origin.x, r.origin.y);
        let (x1, y1) = (x0 + r.size.x, y0 + r.size.y);
        // Arc centers and start angles, walking the same way as `Quad::from_rect`.
        let corners = [
            (Vec2::new(x0 + radius, y0 + radius), 270.0f32),
            (Vec2::new(x0 + radius, y1 - radius), 180.0),
            (Vec2::new(x1 - radius, y1 - radius), 90.0),
            (Vec2::new(x1 - radius, y0 + radius), 0.0),
        ];

        let mut points = Vec::with_capacity(corners.len() * (segments as usize + 1));
        for (center, start) in corners {
            for i in 0..=segments {
                let a = (start - 90.0 * i as f32 / segments as f32).to_radians();
                points.push(Vec2::new(center.x + radius * a.cos(), center.y + radius * a.sin()));
            }
        }
        Self::new(points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.points.iter_mut().for_each(|p| *p = *p + offset);
    }

    /// Rotates by `degrees` around `center`.
    pub fn rotate(&mut self, degrees: f32, center: Vec2) {
        self.points.iter_mut().for_each(|p| *p = p.rotated_around(center, degrees));
    }

    pub fn scale(&mut self, factor: Vec2, center: Vec2) {
        self.points.iter_mut().for_each(|p| *p = p.scaled_around(center, factor));
    }

    /// Average of the points.
    pub fn centroid(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::zero();
        }
        self.points.iter().fold(Vec2::zero(), |acc, p| acc + *p) / self.points.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn rounded_rectangle_stays_inside() {
        let r = Rect::new(10.0, 20.0, 40.0, 30.0);
        let poly = Polygon::rounded_rectangle(r, 5.0, 4);
        assert_eq!(poly.len(), 4 * 5);
        for p in &poly.points {
            assert!(p.x >= 10.0 - 1e-4 && p.x <= 50.0 + 1e-4);
            assert!(p.y >= 20.0 - 1e-4 && p.y <= 50.0 + 1e-4);
        }
        // First arc runs from the top edge down to the left edge.
        assert!(approx(poly.points[0], Vec2::new(15.0, 20.0)));
        assert!(approx(poly.points[4], Vec2::new(10.0, 25.0)));
    }

    #[test]
    fn zero_radius_is_plain_rect() {
        let r = Rect::new(0.0, 0.0, 4.0, 2.0);
        assert_eq!(Polygon::rounded_rectangle(r, 0.0, 8), Polygon::from_rect(r));
        // Radius clamps to half the short side.
        let p = Polygon::rounded_rectangle(r, 10.0, 2);
        assert!(p.points.iter().all(|v| v.y >= -1e-4 && v.y <= 2.0 + 1e-4));
    }

    #[test]
    fn rotate_about_centroid() {
        let mut p = Polygon::from_rect(Rect::new(0.0, 0.0, 2.0, 2.0));
        let c = p.centroid();
        assert!(approx(c, Vec2::new(1.0, 1.0)));
        p.rotate(90.0, c);
        assert!(approx(p.centroid(), c));
        assert!(approx(p.points[0], Vec2::new(2.0, 0.0)));
    }
}
