//! Simulated device session

use crate::pip::DeviceSession;
use log::debug;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct DeviceInner {
    remote_control_releases: usize,
    audio_exclusive: Option<bool>,
}

/// Records the device-level calls it receives
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    inner: Mutex<DeviceInner>,
}

impl SimulatedDevice {
    /// Number of times remote-control events were released
    pub fn remote_control_releases(&self) -> usize {
        self.inner.lock().remote_control_releases
    }

    /// Last audio exclusivity requested, if any
    pub fn audio_exclusive(&self) -> Option<bool> {
        self.inner.lock().audio_exclusive
    }
}

impl DeviceSession for SimulatedDevice {
    fn end_remote_control_events(&self) {
        debug!("Remote control events released");
        self.inner.lock().remote_control_releases += 1;
    }

    fn set_audio_exclusive(&self, exclusive: bool) {
        debug!("Audio exclusivity set to {}", exclusive);
        self.inner.lock().audio_exclusive = Some(exclusive);
    }
}
