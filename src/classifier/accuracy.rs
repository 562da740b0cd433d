/// Deviation-penalized score in [0, 100] of `current` against `ideal`.
///
/// Each degree (or unit) of deviation costs `penalty` points.
pub fn accuracy(current: f32, ideal: f32, penalty: f32) -> f32 {
    (100.0 - (current - ideal).abs() * penalty).clamp(0.0, 100.0)
}

/// 表示・記録用の整数スコア
pub fn to_percent(score: f32) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}
