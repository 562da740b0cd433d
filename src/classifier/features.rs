//! Per-frame measurements consumed by the rule table.
//!
//! Angles and the ankle separation are passed through the session smoother;
//! arm levelness is judged on the raw frame.

use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::pose::{angle, is_level, vertical_separation, Frame, Landmark, LandmarkIndex};
use crate::tracker::WindowSmoother;

pub const LEFT_ARM: &str = "leftArmAngle";
pub const RIGHT_ARM: &str = "rightArmAngle";
pub const LEFT_KNEE: &str = "leftKneeAngle";
pub const RIGHT_KNEE: &str = "rightKneeAngle";
pub const ANKLE_SEPARATION: &str = "ankleSeparation";

/// 平滑化済みの関節角度（度）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct JointAngles {
    pub left_arm: f32,
    pub right_arm: f32,
    pub left_knee: f32,
    pub right_knee: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub angles: JointAngles,
    /// 左肩-左手首が水平か
    pub left_arm_level: bool,
    /// 右肩-右手首が水平か
    pub right_arm_level: bool,
    /// 左右足首のY差（平滑化済み）
    pub ankle_separation: f32,
    /// 軸足（画像上で低い方の足首側）の膝角度
    pub standing_knee: f32,
}

impl Measurements {
    /// 両膝のうち、開区間 (min, max) に入っている膝角度
    pub fn bent_knees(&self, config: &ClassifierConfig) -> impl Iterator<Item = f32> + '_ {
        let (min, max) = (config.knee_bend_min, config.knee_bend_max);
        [self.angles.left_knee, self.angles.right_knee]
            .into_iter()
            .filter(move |&k| k > min && k < max)
    }
}

/// 足首が両方とも見えているか
pub fn ankles_visible(frame: &Frame, min_visibility: f32) -> bool {
    [LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle]
        .iter()
        .all(|&idx| frame.get(idx).map_or(false, |l| l.is_visible(min_visibility)))
}

fn body_landmarks(frame: &Frame) -> Option<[Landmark; 12]> {
    let mut out = [Landmark::new(0.0, 0.0); 12];
    for (slot, &idx) in out.iter_mut().zip(LandmarkIndex::BODY.iter()) {
        *slot = *frame.get(idx)?;
    }
    Some(out)
}

/// フレームから計測値を作り、平滑化ウィンドウを更新する
///
/// 必要なランドマークが欠けている場合は None を返し、ウィンドウには触れない。
pub fn measure(
    frame: &Frame,
    smoother: &mut WindowSmoother,
    config: &ClassifierConfig,
) -> Option<Measurements> {
    let [l_shoulder, r_shoulder, l_elbow, r_elbow, l_wrist, r_wrist, l_hip, r_hip, l_knee, r_knee, l_ankle, r_ankle] =
        body_landmarks(frame)?;

    let angles = JointAngles {
        left_arm: smoother.update(LEFT_ARM, angle(&l_shoulder, &l_elbow, &l_wrist)),
        right_arm: smoother.update(RIGHT_ARM, angle(&r_shoulder, &r_elbow, &r_wrist)),
        left_knee: smoother.update(LEFT_KNEE, angle(&l_hip, &l_knee, &l_ankle)),
        right_knee: smoother.update(RIGHT_KNEE, angle(&r_hip, &r_knee, &r_ankle)),
    };
    let ankle_separation = smoother.update(ANKLE_SEPARATION, vertical_separation(&l_ankle, &r_ankle));

    // 画像座標はYが下向き: Yが大きい足首が床側
    let standing_knee = if l_ankle.y >= r_ankle.y {
        angles.left_knee
    } else {
        angles.right_knee
    };

    Some(Measurements {
        angles,
        left_arm_level: is_level(&l_shoulder, &l_wrist, config.level_tolerance),
        right_arm_level: is_level(&r_shoulder, &r_wrist, config.level_tolerance),
        ankle_separation,
        standing_knee,
    })
}
