pub mod classifier;
pub mod config;
pub mod feedback;
pub mod pipeline;
pub mod pose;
pub mod session;
pub mod tracker;
