//! Auto-hiding playback controls drawn on top of the embedded surface.
//!
//! The overlay keeps no playback state beyond the `paused` flag pushed to
//! it. Button presses are forwarded to the command handler installed by
//! the owner.

use log::debug;
use std::time::{Duration, Instant};

/// Delay before visible controls hide themselves
pub const AUTO_HIDE_DELAY: Duration = Duration::from_secs(3);

/// Buttons on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayButton {
    PlayPause,
    Next,
    Previous,
}

/// User intent forwarded by the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCommand {
    Play,
    Pause,
    Next,
    Previous,
}

/// Command callback installed by the overlay owner
pub type CommandHandler = Box<dyn Fn(OverlayCommand) + Send>;

/// Pending hide, replaced whenever the timer is armed again
#[derive(Debug, Clone, Copy)]
struct HideTimer {
    deadline: Instant,
}

/// Transient play/pause/next/previous controls
pub struct ControlOverlay {
    paused: bool,
    controls_visible: bool,
    enabled: bool,
    floating_rendered: bool,
    hide_timer: Option<HideTimer>,
    on_command: Option<CommandHandler>,
}

impl ControlOverlay {
    /// Create an overlay with hidden controls
    pub fn new(enabled: bool) -> Self {
        Self {
            paused: true,
            controls_visible: false,
            enabled,
            floating_rendered: false,
            hide_timer: None,
            on_command: None,
        }
    }

    pub fn set_command_handler(&mut self, handler: CommandHandler) {
        self.on_command = Some(handler);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Custom controls toggle from the host
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_floating_rendered(&mut self, floating: bool) {
        self.floating_rendered = floating;
    }

    /// Whether the overlay itself is on screen
    pub fn is_shown(&self) -> bool {
        self.enabled && !self.floating_rendered
    }

    /// Whether the buttons are currently revealed
    pub fn controls_visible(&self) -> bool {
        self.is_shown() && self.controls_visible
    }

    pub fn hide_deadline(&self) -> Option<Instant> {
        self.hide_timer.map(|t| t.deadline)
    }

    /// Reveal the controls. A tap on already visible controls does nothing.
    pub fn tap(&mut self, now: Instant) -> bool {
        if !self.is_shown() || self.controls_visible {
            return false;
        }

        self.controls_visible = true;
        self.arm_hide_timer(now);
        true
    }

    /// Fire the hide timer if its deadline passed. Returns true if the controls were hidden.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_timer {
            Some(timer) if now >= timer.deadline => {
                self.hide_timer = None;
                self.controls_visible = false;
                true
            }
            _ => false,
        }
    }

    /// Forward a button press as a command
    pub fn press(&mut self, button: OverlayButton) -> Option<OverlayCommand> {
        if !self.controls_visible() {
            debug!("Ignoring {:?} press on hidden controls", button);
            return None;
        }

        let command = match button {
            OverlayButton::PlayPause if self.paused => OverlayCommand::Play,
            OverlayButton::PlayPause => OverlayCommand::Pause,
            OverlayButton::Next => OverlayCommand::Next,
            OverlayButton::Previous => OverlayCommand::Previous,
        };

        if let Some(handler) = &self.on_command {
            handler(command);
        }
        Some(command)
    }

    fn arm_hide_timer(&mut self, now: Instant) {
        self.hide_timer = Some(HideTimer {
            deadline: now + AUTO_HIDE_DELAY,
        });
    }
}

impl std::fmt::Debug for ControlOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlOverlay")
            .field("paused", &self.paused)
            .field("controls_visible", &self.controls_visible)
            .field("enabled", &self.enabled)
            .field("floating_rendered", &self.floating_rendered)
            .field("hide_timer", &self.hide_timer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_tap_reveals_and_timer_hides() {
        let mut overlay = ControlOverlay::new(true);
        let start = Instant::now();

        assert!(overlay.tap(start));
        assert!(overlay.controls_visible());
        assert_eq!(overlay.hide_deadline(), Some(start + AUTO_HIDE_DELAY));

        assert!(!overlay.tick(start + Duration::from_secs(2)));
        assert!(overlay.controls_visible());

        assert!(overlay.tick(start + AUTO_HIDE_DELAY));
        assert!(!overlay.controls_visible());
        assert_eq!(overlay.hide_deadline(), None);
    }

    #[test]
    fn test_tap_while_visible_keeps_timer() {
        let mut overlay = ControlOverlay::new(true);
        let start = Instant::now();
        overlay.tap(start);

        assert!(!overlay.tap(start + Duration::from_secs(2)));
        assert_eq!(overlay.hide_deadline(), Some(start + AUTO_HIDE_DELAY));
    }

    #[test]
    fn test_play_button_follows_paused_flag() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let mut overlay = ControlOverlay::new(true);
        overlay.set_command_handler(Box::new(move |cmd| sink.lock().unwrap().push(cmd)));
        overlay.tap(Instant::now());

        assert_eq!(overlay.press(OverlayButton::PlayPause), Some(OverlayCommand::Play));
        overlay.set_paused(false);
        assert_eq!(overlay.press(OverlayButton::PlayPause), Some(OverlayCommand::Pause));
        overlay.press(OverlayButton::Next);
        overlay.press(OverlayButton::Previous);

        assert_eq!(
            *received.lock().unwrap(),
            vec![
                OverlayCommand::Play,
                OverlayCommand::Pause,
                OverlayCommand::Next,
                OverlayCommand::Previous
            ]
        );
    }

    #[test]
    fn test_floating_rendering_hides_overlay() {
        let mut overlay = ControlOverlay::new(true);
        overlay.tap(Instant::now());
        overlay.set_floating_rendered(true);

        assert!(!overlay.is_shown());
        assert!(!overlay.controls_visible());
        assert_eq!(overlay.press(OverlayButton::Next), None);

        overlay.set_floating_rendered(false);
        assert!(overlay.is_shown());
    }

    #[test]
    fn test_disabled_overlay_ignores_taps() {
        let mut overlay = ControlOverlay::new(false);
        assert!(!overlay.tap(Instant::now()));
        assert!(!overlay.controls_visible());
    }
}
