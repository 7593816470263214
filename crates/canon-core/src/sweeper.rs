//! # Sweeper
//!
//! Background timer driving periodic cache maintenance.
//!
//! The sweeper thread holds only a weak reference to its target, so it never
//! keeps a cache alive. It exits when the target is gone, when stopped, or
//! when its handle is dropped.

use crate::CanonError;
use std::sync::Weak;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Something a sweeper can tick.
pub trait Sweepable: Send + Sync + 'static {
    /// Called once per timer period.
    fn sweep_tick(&self);
}

enum Control {
    Reschedule(Duration),
    Stop,
}

/// Handle to a running sweeper thread.
pub struct Sweeper {
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Start ticking `target` every `interval`.
    pub fn spawn<T: Sweepable>(target: Weak<T>, interval: Duration) -> Result<Self, CanonError> {
        crate::config::validate_interval(interval)?;
        let (control, rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("canon-sweeper".to_string())
            .spawn(move || {
                let mut interval = interval;
                loop {
                    match rx.recv_timeout(interval) {
                        Ok(Control::Reschedule(next)) => {
                            debug!(interval_ms = next.as_millis() as u64, "sweeper rescheduled");
                            interval = next;
                        }
                        Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => match target.upgrade() {
                            Some(target) => target.sweep_tick(),
                            None => break,
                        },
                    }
                }
                debug!("sweeper stopped");
            })
            .map_err(|e| CanonError::IoError(format!("failed to spawn sweeper: {}", e)))?;

        Ok(Self {
            control,
            thread: Some(thread),
        })
    }

    /// Change the period. The next tick is measured from now.
    pub fn reschedule(&self, interval: Duration) -> Result<(), CanonError> {
        crate::config::validate_interval(interval)?;
        if self.control.send(Control::Reschedule(interval)).is_err() {
            warn!("sweeper thread already exited; reschedule ignored");
        }
        Ok(())
    }

    /// Stop the thread and wait for it, unless called from the sweeper
    /// thread itself.
    pub fn stop(mut self) {
        let _ = self.control.send(Control::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        // Detach; the thread exits on the stop message.
        let _ = self.control.send(Control::Stop);
    }
}
