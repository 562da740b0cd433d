pub mod geometry;
pub mod keypoint;

pub use geometry::{angle, is_level, vertical_separation, DEFAULT_LEVEL_TOLERANCE};
pub use keypoint::{Frame, Landmark, LandmarkIndex};
