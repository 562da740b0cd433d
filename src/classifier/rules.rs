use crate::config::ClassifierConfig;

use super::accuracy::accuracy;
use super::features::Measurements;
use super::label::PoseLabel;

/// 戦士のポーズの理想膝角度
pub const WARRIOR_KNEE_IDEAL: f32 = 90.0;
/// 木のポーズの軸足の理想膝角度
pub const TREE_STANDING_KNEE_IDEAL: f32 = 170.0;
/// Tポーズの理想肘角度
pub const TPOSE_ARM_IDEAL: f32 = 180.0;

pub const NO_POSE_ADVICE: &str = "Adjust your posture";

/// 1フレーム分の分類候補
#[derive(Debug, Clone, PartialEq)]
pub struct PoseCandidate {
    pub label: PoseLabel,
    /// 0〜100
    pub raw_score: f32,
    pub advice: &'static str,
}

impl PoseCandidate {
    pub fn no_pose() -> Self {
        Self {
            label: PoseLabel::NoPose,
            raw_score: 0.0,
            advice: NO_POSE_ADVICE,
        }
    }
}

type Predicate = fn(&Measurements, &ClassifierConfig) -> bool;
type Scorer = fn(&Measurements, &ClassifierConfig) -> f32;
type Advisor = fn(&Measurements, &ClassifierConfig, f32) -> &'static str;

/// 判定条件・スコア・助言をまとめた分類ルール
pub struct PoseRule {
    pub label: PoseLabel,
    matches: Predicate,
    score: Scorer,
    advise: Advisor,
}

impl PoseRule {
    pub fn matches(&self, m: &Measurements, config: &ClassifierConfig) -> bool {
        (self.matches)(m, config)
    }

    pub fn evaluate(&self, m: &Measurements, config: &ClassifierConfig) -> PoseCandidate {
        let raw_score = (self.score)(m, config);
        PoseCandidate {
            label: self.label,
            raw_score,
            advice: (self.advise)(m, config, raw_score),
        }
    }
}

/// 優先順位順のルール表。先に一致したルールを採用する。
///
/// 膝を曲げた戦士のポーズは片足立ちより、片足立ちは腕を水平に広げる姿勢より
/// 特徴が限定的なので、この順で評価する。
pub static RULES: [PoseRule; 3] = [
    PoseRule {
        label: PoseLabel::WarriorII,
        matches: warrior_matches,
        score: warrior_score,
        advise: warrior_advice,
    },
    PoseRule {
        label: PoseLabel::TreePose,
        matches: tree_matches,
        score: tree_score,
        advise: tree_advice,
    },
    PoseRule {
        label: PoseLabel::TPose,
        matches: tpose_matches,
        score: tpose_score,
        advise: tpose_advice,
    },
];

// --- Warrior II (penalty: warrior_penalty, default 2.0) ---

fn warrior_matches(m: &Measurements, config: &ClassifierConfig) -> bool {
    m.left_arm_level && m.right_arm_level && m.bent_knees(config).next().is_some()
}

fn warrior_score(m: &Measurements, config: &ClassifierConfig) -> f32 {
    m.bent_knees(config)
        .map(|k| accuracy(k, WARRIOR_KNEE_IDEAL, config.warrior_penalty))
        .fold(100.0, f32::min)
}

/// 曲げている膝のうち理想から最も外れている膝
///
/// 助言は膝を 90° に近づける向き: 浅ければ曲げる、深ければ伸ばす。
fn front_knee(m: &Measurements, config: &ClassifierConfig) -> Option<f32> {
    m.bent_knees(config).max_by(|a, b| {
        (a - WARRIOR_KNEE_IDEAL)
            .abs()
            .total_cmp(&(b - WARRIOR_KNEE_IDEAL).abs())
    })
}

fn warrior_advice(m: &Measurements, config: &ClassifierConfig, _score: f32) -> &'static str {
    match front_knee(m, config) {
        Some(k) if k > 100.0 => "Bend your front knee more",
        Some(k) if k < 80.0 => "Straighten your front knee slightly",
        _ => "Perfect Warrior Two posture",
    }
}

// --- Tree Pose (penalty: tree_penalty, default 2.0) ---

/// 片足が上がっていて、かつ軸足がほぼ伸びていること
fn tree_matches(m: &Measurements, config: &ClassifierConfig) -> bool {
    m.ankle_separation > config.balance_threshold && tree_score(m, config) > config.tree_min_accuracy
}

fn tree_score(m: &Measurements, config: &ClassifierConfig) -> f32 {
    accuracy(m.standing_knee, TREE_STANDING_KNEE_IDEAL, config.tree_penalty)
}

fn tree_advice(_m: &Measurements, _config: &ClassifierConfig, score: f32) -> &'static str {
    if score < 80.0 {
        "Focus ahead and steady your balance"
    } else {
        "Excellent balance, hold the pose"
    }
}

// --- T-Pose (penalty: tpose_penalty, default 1.5) ---

fn tpose_matches(m: &Measurements, config: &ClassifierConfig) -> bool {
    m.angles.left_arm > config.arm_extended_min
        && m.angles.right_arm > config.arm_extended_min
        && m.left_arm_level
        && m.right_arm_level
}

fn tpose_score(m: &Measurements, config: &ClassifierConfig) -> f32 {
    let left = accuracy(m.angles.left_arm, TPOSE_ARM_IDEAL, config.tpose_penalty);
    let right = accuracy(m.angles.right_arm, TPOSE_ARM_IDEAL, config.tpose_penalty);
    (left + right) / 2.0
}

fn tpose_advice(_m: &Measurements, _config: &ClassifierConfig, score: f32) -> &'static str {
    if score > 75.0 {
        "Arms straight and level"
    } else {
        "Straighten your arms"
    }
}

/// ルール表による姿勢分類器
pub struct PoseClassifier {
    config: ClassifierConfig,
}

impl PoseClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// 最初に一致したルールの候補。どれにも一致しなければ NoPose
    pub fn classify(&self, m: &Measurements) -> PoseCandidate {
        RULES
            .iter()
            .find(|rule| rule.matches(m, &self.config))
            .map(|rule| rule.evaluate(m, &self.config))
            .unwrap_or_else(PoseCandidate::no_pose)
    }
}

impl Default for PoseClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
