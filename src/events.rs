//! Main-thread inbox for pipsync
//!
//! Every asynchronous signal (engine notifications, floating callbacks,
//! overlay commands) is posted here and handled later by
//! `PlayerController::process_events`, never inside the call that caused it.

use crate::pip::PipCallback;
use crate::player::EngineEvent;
use crate::surface::OverlayCommand;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

/// Message handled on the main loop
#[derive(Debug)]
pub enum PlayerMessage {
    /// Notification from the playback engine
    Engine(EngineEvent),

    /// Callback from the floating system, tagged with the floating session
    /// that produced it
    Floating { session: u64, callback: PipCallback },

    /// Floating timeline reset finished
    VideoReset(Result<(), String>),

    /// Button pressed on the control overlay
    Overlay(OverlayCommand),
}

/// Cloneable posting side of the inbox
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<PlayerMessage>,
}

impl EventSender {
    pub fn post(&self, message: PlayerMessage) {
        if let Err(e) = self.tx.send(message) {
            debug!("Dropping message, inbox closed: {:?}", e.into_inner());
        }
    }

    pub fn engine(&self, event: EngineEvent) {
        self.post(PlayerMessage::Engine(event));
    }

    pub fn floating(&self, session: u64, callback: PipCallback) {
        self.post(PlayerMessage::Floating { session, callback });
    }
}

/// Receiving side of the inbox
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<PlayerMessage>,
    rx: Receiver<PlayerMessage>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    /// Take every message queued so far
    pub fn drain(&self) -> Vec<PlayerMessage> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
