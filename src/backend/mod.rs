//! In-memory collaborators for pipsync
//!
//! Implementations of the engine, floating presentation and device traits
//! that keep their state in memory. The demo binary runs on them and the
//! tests inspect what they recorded.

mod device;
mod engine;
mod floating;

pub use device::SimulatedDevice;
pub use engine::{SimulatedEngine, DEFAULT_DURATION, DEFAULT_PRESENTATION_SIZE};
pub use floating::{FloatingCall, FloatingSnapshot, SimulatedFloating};
