use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::DEFAULT_LEVEL_TOLERANCE;
use crate::session::DEFAULT_MIN_ACCURACY;
use crate::tracker::smooth::DEFAULT_WINDOW;
use crate::tracker::stability::DEFAULT_THRESHOLD;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothingConfig {
    /// 移動平均のウィンドウ幅（フレーム数）
    #[serde(default = "default_window")]
    pub window: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StabilityConfig {
    /// このフレーム数を超えて連続したラベルを確定する
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// 足首の最低可視度（未満なら分類しない）
    #[serde(default = "default_min_ankle_visibility")]
    pub min_ankle_visibility: f32,
    /// 肩-手首の水平判定許容差（正規化座標）
    #[serde(default = "default_level_tolerance")]
    pub level_tolerance: f32,
    /// 戦士のポーズ: 膝角度の下限（度、開区間）
    #[serde(default = "default_knee_bend_min")]
    pub knee_bend_min: f32,
    /// 戦士のポーズ: 膝角度の上限（度、開区間）
    #[serde(default = "default_knee_bend_max")]
    pub knee_bend_max: f32,
    /// 木のポーズ: 足首のY差の閾値（正規化座標）
    #[serde(default = "default_balance_threshold")]
    pub balance_threshold: f32,
    /// Tポーズ: 肘角度の下限（度）
    #[serde(default = "default_arm_extended_min")]
    pub arm_extended_min: f32,
    /// 木のポーズ: 軸足スコアがこれを超えた場合のみ一致とする
    #[serde(default = "default_tree_min_accuracy")]
    pub tree_min_accuracy: f32,
    #[serde(default = "default_warrior_penalty")]
    pub warrior_penalty: f32,
    #[serde(default = "default_tree_penalty")]
    pub tree_penalty: f32,
    #[serde(default = "default_tpose_penalty")]
    pub tpose_penalty: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// この精度を超えた確定ポーズのみ記録する
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: u8,
    /// 記録の保存先ディレクトリ
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// 記録時刻のフォーマット (chrono strftime)
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    /// 音声フィードバックを有効にする
    #[serde(default = "default_feedback_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_window() -> usize { DEFAULT_WINDOW }
fn default_threshold() -> u32 { DEFAULT_THRESHOLD }
fn default_min_ankle_visibility() -> f32 { 0.5 }
fn default_level_tolerance() -> f32 { DEFAULT_LEVEL_TOLERANCE }
fn default_knee_bend_min() -> f32 { 70.0 }
fn default_knee_bend_max() -> f32 { 130.0 }
fn default_balance_threshold() -> f32 { 0.15 }
fn default_arm_extended_min() -> f32 { 140.0 }
fn default_tree_min_accuracy() -> f32 { 60.0 }
fn default_warrior_penalty() -> f32 { 2.0 }
fn default_tree_penalty() -> f32 { 2.0 }
fn default_tpose_penalty() -> f32 { 1.5 }
fn default_min_accuracy() -> u8 { DEFAULT_MIN_ACCURACY }
fn default_storage_dir() -> String { "data".to_string() }
fn default_time_format() -> String { "%Y/%m/%d %H:%M:%S".to_string() }
fn default_feedback_enabled() -> bool { true }
fn default_rate() -> f32 { 0.95 }
fn default_pitch() -> f32 { 1.0 }
fn default_volume() -> f32 { 1.0 }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window: default_window() }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self { threshold: default_threshold() }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_ankle_visibility: default_min_ankle_visibility(),
            level_tolerance: default_level_tolerance(),
            knee_bend_min: default_knee_bend_min(),
            knee_bend_max: default_knee_bend_max(),
            balance_threshold: default_balance_threshold(),
            arm_extended_min: default_arm_extended_min(),
            tree_min_accuracy: default_tree_min_accuracy(),
            warrior_penalty: default_warrior_penalty(),
            tree_penalty: default_tree_penalty(),
            tpose_penalty: default_tpose_penalty(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_accuracy: default_min_accuracy(),
            storage_dir: default_storage_dir(),
            time_format: default_time_format(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_feedback_enabled(),
            rate: default_rate(),
            pitch: default_pitch(),
            volume: default_volume(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config")?;
        Ok(config)
    }

    /// 読み込みに失敗した場合は既定値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::info!("Using default config ({:#})", e);
                Self::default()
            }
        }
    }
}
