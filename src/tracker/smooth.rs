use std::collections::{HashMap, VecDeque};

use crate::config::SmoothingConfig;

/// 既定の移動平均ウィンドウ幅
pub const DEFAULT_WINDOW: usize = 5;

/// 信号キーごとの移動平均フィルタ
///
/// キーは初回観測時に生成され、`reset` まで保持される。
pub struct WindowSmoother {
    capacity: usize,
    windows: HashMap<String, VecDeque<f32>>,
}

impl WindowSmoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: HashMap::new(),
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.window)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 値を追加し、現在のウィンドウ平均を返す
    pub fn update(&mut self, key: &str, value: f32) -> f32 {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        window.push_back(value);
        while window.len() > capacity {
            window.pop_front();
        }

        window.iter().sum::<f32>() / window.len() as f32
    }

    /// 現在の平均（未観測なら None）
    pub fn current(&self, key: &str) -> Option<f32> {
        let window = self.windows.get(key)?;
        if window.is_empty() {
            return None;
        }
        Some(window.iter().sum::<f32>() / window.len() as f32)
    }

    pub fn reset(&mut self) {
        self.windows.clear();
    }
}

impl Default for WindowSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
