//! Integration test utilities for pipsync
//!
//! Provides a fixture that wires a [`PlayerController`] to the simulated
//! engine, floating presentation and device session.

use anyhow::Result;
use pipsync::backend::{SimulatedDevice, SimulatedEngine, SimulatedFloating};
use pipsync::events::EventQueue;
use pipsync::player::{MediaReference, PlayerController};
use pipsync::utils::Config;
use std::sync::Arc;

/// Simulated seconds per step in [`TestFixture::play_for`]
pub const STEP: f64 = 0.25;

/// Test fixture for integration tests
pub struct TestFixture {
    pub controller: PlayerController,
    pub engine: Arc<SimulatedEngine>,
    pub floating: Arc<SimulatedFloating>,
    pub device: Arc<SimulatedDevice>,
}

impl TestFixture {
    /// Controller over `items` with default configuration
    pub fn new(items: &[&str]) -> Result<Self> {
        let mut config = Config::default();
        config.playback.playlist = items.iter().copied().map(MediaReference::new).collect();
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let queue = EventQueue::new();
        let engine = Arc::new(SimulatedEngine::new(queue.sender()));
        let floating = Arc::new(SimulatedFloating::new());
        let device = Arc::new(SimulatedDevice::default());

        let controller = PlayerController::builder()
            .with_engine(engine.clone())
            .with_floating(floating.clone())
            .with_device(device.clone())
            .with_config(config)
            .with_event_queue(queue)
            .build()?;

        Ok(Self {
            controller,
            engine,
            floating,
            device,
        })
    }

    /// Handle everything queued, including follow-up messages
    pub fn pump(&mut self) -> usize {
        self.controller.run_until_idle()
    }

    /// Advance the simulated clock by `seconds`, pumping after each step
    pub fn play_for(&mut self, seconds: f64) {
        let mut remaining = seconds;
        while remaining > 0.0 {
            let dt = remaining.min(STEP);
            self.engine.advance(dt);
            self.pump();
            remaining -= dt;
        }
    }

    /// Play the first item and bring the floating presentation up
    pub fn start_floating(&mut self) -> Result<()> {
        self.controller.play()?;
        self.controller.start()?;
        self.pump();
        Ok(())
    }

    pub fn current(&self) -> Option<String> {
        self.controller
            .state()
            .current_item
            .map(|m| m.as_str().to_string())
    }
}
