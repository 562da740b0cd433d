//! Rule-table pose classification.
//!
//! Measurements come from one frame through the session smoother, then the
//! ordered rule table picks the first matching pose.

mod accuracy;
mod features;
mod label;
mod rules;

pub use accuracy::{accuracy, to_percent};
pub use features::{ankles_visible, measure, JointAngles, Measurements};
pub use label::PoseLabel;
pub use rules::{PoseCandidate, PoseClassifier, PoseRule, NO_POSE_ADVICE, RULES};
