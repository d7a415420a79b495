use crate::Vec3;

/// A unit direction paired with the surface normal it leaves from.
///
/// Connections between path vertices are validated with this type: a
/// direction is rejected when it is degenerate (zero-length segment, NaN) or
/// points into the lower hemisphere of its surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Direction {
    v: Vec3,
    cos: f32,
}

impl Direction {
    /// `v` must be unit length (or NaN for a degenerate segment).
    #[inline]
    pub fn new(v: Vec3, n: Vec3) -> Self {
        Self { v, cos: v.dot(n) }
    }

    /// The same vector measured against another surface, reversed.
    #[inline]
    pub fn reversed(&self, n: Vec3) -> Self {
        Self::new(-self.v, n)
    }

    #[inline]
    pub fn is_invalid(&self) -> bool {
        !self.v.is_finite() || !self.cos.is_finite() || self.v == Vec3::ZERO
    }

    #[inline]
    pub fn in_lower_hemisphere(&self) -> bool {
        self.cos <= 0.0
    }

    #[inline]
    pub fn cos(&self) -> f32 {
        self.cos
    }

    #[inline]
    pub fn abs_cos(&self) -> f32 {
        self.cos.abs()
    }

    #[inline]
    pub fn vector(&self) -> Vec3 {
        self.v
    }
}
