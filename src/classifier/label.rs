/// 分類ラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLabel {
    WarriorII,
    TreePose,
    TPose,
    NoPose,
}

impl PoseLabel {
    /// 記録用の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            PoseLabel::WarriorII => "Warrior II",
            PoseLabel::TreePose => "Tree Pose",
            PoseLabel::TPose => "T-Pose",
            PoseLabel::NoPose => "No pose detected",
        }
    }

    /// 画面表示用の名前（バッジ付き）
    pub fn display_name(&self) -> &'static str {
        match self {
            PoseLabel::WarriorII => "⚔️ Warrior II",
            PoseLabel::TreePose => "🌳 Tree Pose",
            PoseLabel::TPose => "🧍 T-Pose",
            PoseLabel::NoPose => "No pose detected",
        }
    }

    pub fn is_pose(&self) -> bool {
        !matches!(self, PoseLabel::NoPose)
    }
}

impl std::fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
