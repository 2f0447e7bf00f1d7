//! pipsync keeps a playback engine, an embedded presentation surface and a
//! floating picture-in-picture presentation consistent with each other.
//!
//! [`player::PlayerController`] is the entry point. It owns the playback
//! session, the surface, the control overlay and the floating presentation
//! coordinator, and handles every asynchronous notification on the caller's
//! thread through [`player::PlayerController::process_events`].

pub mod backend;
pub mod events;
pub mod pip;
pub mod player;
pub mod surface;
pub mod utils;

pub use player::{PlayerController, PlayerControllerBuilder};
pub use utils::error::{PipSyncError, Result};
