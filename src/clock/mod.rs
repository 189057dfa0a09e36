pub mod controller;
pub mod state;

pub use controller::{Clock, ElapsedTick, ElapsedTicks};
pub use state::ClockState;
