pub mod smooth;
pub mod stability;

pub use smooth::WindowSmoother;
pub use stability::{GateOutcome, GateState, StabilityGate};
