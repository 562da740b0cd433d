use crate::config::StabilityConfig;

/// 既定の確定フレーム数閾値
pub const DEFAULT_THRESHOLD: u32 = 10;

/// ゲートの内部状態
#[derive(Debug, Clone, PartialEq)]
pub enum GateState<L> {
    Idle,
    Tracking { label: L, count: u32 },
}

/// 1フレーム分のゲート判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// 閾値未満。フィードバック・記録に流してはいけない
    Provisional,
    /// このフレームで閾値を超えた（確定イベント）
    Committed,
    /// 確定済みラベルが継続中
    Locked,
}

impl GateOutcome {
    /// 確定した、または確定済みのラベルが続いている
    pub fn is_locked_in(&self) -> bool {
        !matches!(self, GateOutcome::Provisional)
    }
}

/// 連続フレーム数によるラベル確定ゲート
///
/// 同じラベルが `threshold` を超えて連続した時点で確定する。
/// 途中で異なるラベルが1フレームでも入ると、そのラベルのカウント1からやり直し。
pub struct StabilityGate<L> {
    threshold: u32,
    state: GateState<L>,
}

impl<L: Clone + PartialEq> StabilityGate<L> {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            state: GateState::Idle,
        }
    }

    pub fn from_config(config: &StabilityConfig) -> Self {
        Self::new(config.threshold)
    }

    pub fn state(&self) -> &GateState<L> {
        &self.state
    }

    /// 確定済みのラベル
    pub fn committed_label(&self) -> Option<&L> {
        match &self.state {
            GateState::Tracking { label, count } if *count > self.threshold => Some(label),
            _ => None,
        }
    }

    /// 候補ラベルを1フレーム分入力する
    pub fn observe(&mut self, candidate: &L) -> GateOutcome {
        let count = match &mut self.state {
            GateState::Tracking { label, count } if *label == *candidate => {
                *count = count.saturating_add(1);
                *count
            }
            _ => {
                self.state = GateState::Tracking {
                    label: candidate.clone(),
                    count: 1,
                };
                1
            }
        };

        if count == self.threshold.saturating_add(1) {
            GateOutcome::Committed
        } else if count > self.threshold {
            GateOutcome::Locked
        } else {
            GateOutcome::Provisional
        }
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

impl<L: Clone + PartialEq> Default for StabilityGate<L> {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
