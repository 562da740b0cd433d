//! Joint angles and vertical alignment on normalized landmark coordinates.

use super::keypoint::Landmark;

/// 既定の水平判定許容差（正規化座標）
pub const DEFAULT_LEVEL_TOLERANCE: f32 = 0.05;

/// Angle at vertex `b` between the rays `b→a` and `b→c`, in degrees within [0, 180].
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let radians = f32::atan2(c.y - b.y, c.x - b.x) - f32::atan2(a.y - b.y, a.x - b.x);
    let degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// 2点のY座標差が許容差未満か
pub fn is_level(p1: &Landmark, p2: &Landmark, tolerance: f32) -> bool {
    vertical_separation(p1, p2) < tolerance
}

/// 2点のY座標差（片足立ちの判定などに使用）
pub fn vertical_separation(p1: &Landmark, p2: &Landmark) -> f32 {
    (p1.y - p2.y).abs()
}
