use crate::Vec3;

/// Orthonormal basis around a surface normal.
#[derive(Debug, Copy, Clone)]
pub struct Frame {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// Build a frame whose `z` axis is `n` (unit length).
    pub fn from_normal(n: Vec3) -> Self {
        let (x, y) = n.any_orthonormal_pair();
        Self { x, y, z: n }
    }

    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    pub fn from_local(&self, v: Vec3) -> Vec3 {
        v.x * self.x + v.y * self.y + v.z * self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_roundtrip() {
        let n = Vec3::new(1.0, 2.0, -0.5).normalize();
        let frame = Frame::from_normal(n);
        let v = Vec3::new(0.3, -0.2, 0.9);
        let back = frame.from_local(frame.to_local(v));
        assert!((back - v).length() < 1e-5);
        assert!((frame.from_local(Vec3::Z) - n).length() < 1e-6);
    }
}
