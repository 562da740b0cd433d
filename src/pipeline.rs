//! Per-frame detection pipeline scoped to one detection session.
//!
//! geometry → smoothing → rule table → scoring → stability gate →
//! {feedback, session history}. Only committed results reach feedback and history.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;

use crate::classifier::{ankles_visible, measure, to_percent, JointAngles, PoseClassifier, PoseLabel};
use crate::config::Config;
use crate::feedback::{FeedbackDispatcher, Speaker};
use crate::pose::Frame;
use crate::session::{KeyValueStore, SessionHistory};
use crate::tracker::{GateOutcome, StabilityGate, WindowSmoother};

pub const IDLE_LABEL: &str = "Detecting...";
pub const NO_PERSON_MESSAGE: &str = "No person detected";
pub const BODY_NOT_VISIBLE_MESSAGE: &str = "Body not fully visible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameState {
    /// セッション停止中
    Idle,
    /// ランドマークなし
    NoPerson,
    /// 足首などが見えていないため分類しない
    BodyNotVisible,
    Classified,
}

/// 1フレームごとにUIへ渡す状態
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameStatus {
    pub state: FrameState,
    pub pose_label: String,
    pub accuracy_score: u8,
    pub feedback_message: String,
    /// 安定化ゲートでラベルが確定しているか
    pub committed: bool,
    /// このフレームでセッション記録に追加されたか
    pub recorded: bool,
    /// 平滑化済みの関節角度（分類したフレームのみ）
    pub angles: Option<JointAngles>,
}

impl FrameStatus {
    fn message(state: FrameState, label: &str) -> Self {
        Self {
            state,
            pose_label: label.to_string(),
            accuracy_score: 0,
            feedback_message: String::new(),
            committed: false,
            recorded: false,
            angles: None,
        }
    }
}

/// 1検出セッション分の状態をまとめたコンテキスト
pub struct DetectionSession {
    smoother: WindowSmoother,
    classifier: PoseClassifier,
    gate: StabilityGate<PoseLabel>,
    feedback: FeedbackDispatcher,
    history: SessionHistory,
    time_format: String,
    active: bool,
}

impl DetectionSession {
    pub fn new(config: &Config, speaker: Box<dyn Speaker>, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            smoother: WindowSmoother::from_config(&config.smoothing),
            classifier: PoseClassifier::new(config.classifier.clone()),
            gate: StabilityGate::from_config(&config.stability),
            feedback: FeedbackDispatcher::new(speaker, config.feedback.clone()),
            history: SessionHistory::new(store, config.session.min_accuracy),
            time_format: config.session.time_format.clone(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        self.reset();
        self.active = true;
        log::info!("Detection session started");
    }

    /// 平滑化・安定化・フィードバックの状態を破棄する（記録は残る）
    pub fn stop(&mut self) {
        self.reset();
        self.active = false;
        log::info!("Detection session stopped");
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.gate.reset();
        self.feedback.reset();
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn gate(&self) -> &StabilityGate<PoseLabel> {
        &self.gate
    }

    pub fn process(&mut self, frame: Option<&Frame>) -> FrameStatus {
        self.process_at(frame, Local::now())
    }

    /// `now` を記録時刻として1フレームを処理する
    pub fn process_at(&mut self, frame: Option<&Frame>, now: DateTime<Local>) -> FrameStatus {
        if !self.active {
            return FrameStatus::message(FrameState::Idle, IDLE_LABEL);
        }

        let frame = match frame {
            Some(f) if !f.is_empty() => f,
            _ => return FrameStatus::message(FrameState::NoPerson, NO_PERSON_MESSAGE),
        };

        let config = self.classifier.config();
        if !ankles_visible(frame, config.min_ankle_visibility) {
            return FrameStatus::message(FrameState::BodyNotVisible, BODY_NOT_VISIBLE_MESSAGE);
        }
        let measurements = match measure(frame, &mut self.smoother, config) {
            Some(m) => m,
            None => return FrameStatus::message(FrameState::BodyNotVisible, BODY_NOT_VISIBLE_MESSAGE),
        };

        let candidate = self.classifier.classify(&measurements);
        let score = to_percent(candidate.raw_score);
        let outcome = self.gate.observe(&candidate.label);

        let mut recorded = false;
        if outcome.is_locked_in() {
            self.feedback.dispatch(candidate.advice);
        }
        if outcome == GateOutcome::Committed {
            log::debug!("Committed {} ({}%)", candidate.label, score);
            if candidate.label.is_pose() {
                let time = self.format_time(&now);
                recorded = self.history.append(candidate.label.as_str(), score, &time);
            }
        }

        FrameStatus {
            state: FrameState::Classified,
            pose_label: candidate.label.display_name().to_string(),
            accuracy_score: score,
            feedback_message: candidate.advice.to_string(),
            committed: outcome.is_locked_in(),
            recorded,
            angles: Some(measurements.angles),
        }
    }

    fn format_time(&self, now: &DateTime<Local>) -> String {
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.time_format)).is_err() {
            return now.to_rfc3339();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::test_frames;
    use crate::feedback::tests::RecordingSpeaker;
    use crate::session::MemoryStore;

    fn session(threshold: u32) -> (DetectionSession, RecordingSpeaker) {
        let mut config = Config::default();
        config.stability.threshold = threshold;
        let speaker = RecordingSpeaker::default();
        let mut s = DetectionSession::new(&config, Box::new(speaker.clone()), Box::new(MemoryStore::new()));
        s.start();
        (s, speaker)
    }

    #[test]
    fn test_idle_before_start() {
        let config = Config::default();
        let mut s = DetectionSession::new(&config, Box::new(RecordingSpeaker::default()), Box::new(MemoryStore::new()));
        let status = s.process(Some(&test_frames::t_pose(0.9)));
        assert_eq!(status.state, FrameState::Idle);
        assert_eq!(status.pose_label, IDLE_LABEL);
    }

    #[test]
    fn test_commit_after_threshold_frames() {
        let (mut s, speaker) = session(10);
        let frame = test_frames::warrior_ii();

        for _ in 0..10 {
            let status = s.process(Some(&frame));
            assert_eq!(status.state, FrameState::Classified);
            assert_eq!(status.pose_label, "⚔️ Warrior II");
            assert!(!status.committed);
            assert!(!status.recorded);
        }
        assert!(speaker.spoken().is_empty());

        let status = s.process(Some(&frame));
        assert!(status.committed);
        assert!(status.recorded);
        assert_eq!(status.accuracy_score, 100);
        assert_eq!(speaker.spoken(), vec!["Perfect Warrior Two posture"]);

        // 確定後は記録も発話も繰り返さない
        for _ in 0..5 {
            let status = s.process(Some(&frame));
            assert!(status.committed);
            assert!(!status.recorded);
        }
        assert_eq!(speaker.spoken().len(), 1);
        let entries = s.history().list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pose, "Warrior II");
        assert_eq!(entries[0].accuracy, 100);
    }

    #[test]
    fn test_invisible_ankles_never_classified() {
        let (mut s, speaker) = session(2);
        for _ in 0..20 {
            let status = s.process(Some(&test_frames::t_pose(0.3)));
            assert_eq!(status.state, FrameState::BodyNotVisible);
            assert_eq!(status.pose_label, BODY_NOT_VISIBLE_MESSAGE);
            assert!(!status.committed);
            assert!(status.angles.is_none());
        }
        assert!(speaker.spoken().is_empty());
        assert!(s.history().list().is_empty());
    }

    #[test]
    fn test_no_person_keeps_streak() {
        let (mut s, _speaker) = session(3);
        let frame = test_frames::t_pose(0.9);
        for _ in 0..3 {
            assert!(!s.process(Some(&frame)).committed);
        }
        let status = s.process(None);
        assert_eq!(status.state, FrameState::NoPerson);
        assert_eq!(status.pose_label, NO_PERSON_MESSAGE);
        let status = s.process(Some(&Frame::empty()));
        assert_eq!(status.state, FrameState::NoPerson);

        assert!(s.process(Some(&frame)).committed);
    }

    #[test]
    fn test_different_pose_resets_streak() {
        let (mut s, _speaker) = session(3);
        let t_pose = test_frames::t_pose(0.9);
        for _ in 0..3 {
            s.process(Some(&t_pose));
        }
        s.process(Some(&test_frames::standing()));
        s.process(Some(&test_frames::standing()));
        // 平滑化ウィンドウが残っていても、ラベルが変わった時点でカウントは1から
        for _ in 0..3 {
            s.process(Some(&t_pose));
        }
        assert_eq!(s.gate().committed_label(), None);
    }

    #[test]
    fn test_unclassified_frames_leave_smoothing_untouched() {
        let warrior = test_frames::warrior_ii();
        let (mut control, _) = session(50);
        let mut expected = None;
        for _ in 0..4 {
            expected = control.process(Some(&warrior)).angles;
        }

        let (mut s, _) = session(50);
        for _ in 0..3 {
            s.process(Some(&warrior));
        }
        assert_eq!(s.process(None).state, FrameState::NoPerson);
        // 座標は揃っているが足首の可視度が低い: 膝180°を窓に入れてはいけない
        let status = s.process(Some(&test_frames::t_pose(0.3)));
        assert_eq!(status.state, FrameState::BodyNotVisible);

        let status = s.process(Some(&warrior));
        assert_eq!(status.angles, expected);
        let angles = status.angles.unwrap();
        assert!((angles.left_knee - 90.0).abs() < 1.0);
    }

    #[test]
    fn test_no_pose_commit_is_not_recorded() {
        let (mut s, speaker) = session(1);
        let frame = test_frames::standing();
        s.process(Some(&frame));
        let status = s.process(Some(&frame));
        assert!(status.committed);
        assert!(!status.recorded);
        assert_eq!(status.pose_label, "No pose detected");
        assert_eq!(speaker.spoken(), vec!["Adjust your posture"]);
        assert!(s.history().list().is_empty());
    }

    #[test]
    fn test_stop_resets_session_state() {
        let (mut s, speaker) = session(2);
        let frame = test_frames::tree_pose();
        for _ in 0..3 {
            s.process(Some(&frame));
        }
        assert_eq!(speaker.spoken(), vec!["Excellent balance, hold the pose"]);

        s.stop();
        assert!(!s.is_active());
        assert_eq!(s.process(Some(&frame)).state, FrameState::Idle);

        s.start();
        assert!(!s.process(Some(&frame)).committed);
        assert!(!s.process(Some(&frame)).committed);
        assert!(s.process(Some(&frame)).committed);
        // 直前メッセージも忘れているので再度発話する
        assert_eq!(speaker.spoken().len(), 2);
        // 記録は残る
        assert_eq!(s.history().list().len(), 2);
    }

    #[test]
    fn test_record_uses_time_format() {
        let mut config = Config::default();
        config.stability.threshold = 0;
        config.session.time_format = "%Y-%m-%d".to_string();
        let mut s = DetectionSession::new(&config, Box::new(RecordingSpeaker::default()), Box::new(MemoryStore::new()));
        s.start();
        let now = Local::now();
        let status = s.process_at(Some(&test_frames::t_pose(0.9)), now);
        assert!(status.recorded);
        assert_eq!(s.history().list()[0].time, now.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_invalid_time_format_falls_back_to_rfc3339() {
        let mut config = Config::default();
        config.stability.threshold = 0;
        config.session.time_format = "%Q".to_string();
        let mut s = DetectionSession::new(&config, Box::new(RecordingSpeaker::default()), Box::new(MemoryStore::new()));
        s.start();
        let now = Local::now();
        let status = s.process_at(Some(&test_frames::t_pose(0.9)), now);
        assert!(status.recorded);
        let time = &s.history().list()[0].time;
        assert_eq!(*time, now.to_rfc3339());
        assert!(DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[test]
    fn test_low_score_commit_not_recorded() {
        let mut config = Config::default();
        config.stability.threshold = 0;
        let mut s = DetectionSession::new(&config, Box::new(RecordingSpeaker::default()), Box::new(MemoryStore::new()));
        s.start();

        let mut frame = test_frames::t_pose(0.9);
        // 肘を曲げる（~150°）: Tポーズの範囲内だがスコアは低い
        frame.set(
            crate::pose::LandmarkIndex::LeftElbow,
            crate::pose::Landmark::with_visibility(0.30, 0.27, 0.95),
        );
        frame.set(
            crate::pose::LandmarkIndex::RightElbow,
            crate::pose::Landmark::with_visibility(0.70, 0.27, 0.95),
        );
        let status = s.process(Some(&frame));
        assert_eq!(status.pose_label, "🧍 T-Pose");
        assert!(status.committed);
        assert!(status.accuracy_score <= 80);
        assert!(!status.recorded);
    }
}
