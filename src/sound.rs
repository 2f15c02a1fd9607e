use beep::beep;
use log::warn;
use std::sync::mpsc::{self, TrySendError};
use std::thread;
use std::time::Duration;

/// the interpreter posts here when the sound timer decays to zero
pub trait Sound {
    /// queue one fixed-length beep; must never block the interpreter
    fn beep(&mut self);
}

const BEEP_PITCH: u16 = 2093; // C

/// how long each beep sounds
const BEEP_DURATION: Duration = Duration::from_millis(80);

/// Sound backed by a worker thread that owns the PC speaker. The interpreter
/// posts a beep and moves on; the worker plays them one at a time and winds
/// down when the queue is dropped.
pub struct BeepQueue {
    tx: mpsc::SyncSender<()>,
}

impl BeepQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        thread::spawn(move || {
            for _ in rx {
                if let Err(e) = beep(BEEP_PITCH) {
                    warn!("beep failed: {}", e);
                    continue;
                }
                spin_sleep::sleep(BEEP_DURATION);
                if let Err(e) = beep(0) {
                    warn!("silencing the beeper failed: {}", e);
                }
            }
        });
        BeepQueue { tx }
    }
}

impl Sound for BeepQueue {
    fn beep(&mut self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            // a beep is already pending; one is plenty
            Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => warn!("audio worker is gone; dropping beep"),
        }
    }
}

pub struct Mute {}
impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}
impl Sound for Mute {
    fn beep(&mut self) {}
}
