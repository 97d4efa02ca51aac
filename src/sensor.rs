// sensor.rs — motion-sensing service: subscription contract plus two sources

use crate::gaze::AttitudeSample;
use glam::DQuat;
use log::{debug, info};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a tick carried no usable attitude.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("motion sensor unavailable")]
    Unavailable,
    #[error("motion update carried no sample")]
    MissingSample,
    #[error("motion sensor error: {0}")]
    Device(String),
}

pub type MotionEvent = Result<AttitudeSample, SensorError>;
pub type MotionHandler = Box<dyn FnMut(MotionEvent) + Send>;

/// A periodic source of device attitude.
///
/// `subscribe` replaces any existing subscription. After `unsubscribe`
/// returns, the handler is never invoked again.
pub trait MotionService: Send {
    fn subscribe(&mut self, interval: Duration, handler: MotionHandler);
    fn unsubscribe(&mut self);
    fn is_active(&self) -> bool;
}

type HandlerSlot = Arc<Mutex<Option<MotionHandler>>>;

/// Motion source driven by the host: samples are pushed through a [`MotionFeed`].
#[derive(Default)]
pub struct ManualMotion {
    slot: HandlerSlot,
    interval: Option<Duration>,
}

/// Cloneable pusher for a [`ManualMotion`] subscription.
#[derive(Clone)]
pub struct MotionFeed {
    slot: HandlerSlot,
}

impl ManualMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> MotionFeed {
        MotionFeed {
            slot: self.slot.clone(),
        }
    }

    /// Interval requested by the current subscriber, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl MotionFeed {
    /// Deliver one event. Returns `false` when nobody is subscribed.
    pub fn deliver(&self, event: MotionEvent) -> bool {
        let Ok(mut slot) = self.slot.lock() else {
            return false;
        };
        match slot.as_mut() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl MotionService for ManualMotion {
    fn subscribe(&mut self, interval: Duration, handler: MotionHandler) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(handler);
            self.interval = Some(interval);
        }
    }

    fn unsubscribe(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        self.interval = None;
    }

    fn is_active(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

/// Scripted "look around" motion on its own thread, for hosts without a gyroscope.
pub struct SimulatedMotion {
    sweep_deg_per_sec: f64,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl SimulatedMotion {
    pub fn new(sweep_deg_per_sec: f64) -> Self {
        Self {
            sweep_deg_per_sec,
            worker: None,
        }
    }

    /// Attitude at `t` seconds: a steady yaw about the device's long axis with a slow pitch bob.
    pub fn attitude_at(&self, t: f64) -> AttitudeSample {
        let yaw = (self.sweep_deg_per_sec * t).to_radians();
        let pitch = 15f64.to_radians() * (t * 0.25).sin();
        AttitudeSample::from_quat(DQuat::from_rotation_z(yaw) * DQuat::from_rotation_x(pitch))
    }
}

impl MotionService for SimulatedMotion {
    fn subscribe(&mut self, interval: Duration, mut handler: MotionHandler) {
        self.unsubscribe();

        let (stop_tx, stop_rx) = channel::<()>();
        let script = SimulatedMotion::new(self.sweep_deg_per_sec);
        let interval = interval.max(Duration::from_millis(1));

        let handle = thread::spawn(move || {
            let start = Instant::now();
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        handler(Ok(script.attitude_at(start.elapsed().as_secs_f64())));
                    }
                    _ => break,
                }
            }
            debug!("simulated motion thread exiting");
        });

        info!("simulated motion started at {:?} interval", interval);
        self.worker = Some((stop_tx, handle));
    }

    fn unsubscribe(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                debug!("simulated motion thread panicked");
            }
            info!("simulated motion stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SimulatedMotion {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn manual_feed_reaches_subscriber() {
        let mut motion = ManualMotion::new();
        let feed = motion.feed();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        motion.subscribe(
            Duration::from_secs_f64(1.0 / 60.0),
            Box::new(move |event| {
                if event.is_ok() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        assert!(motion.is_active());
        assert!(feed.deliver(Ok(AttitudeSample::identity())));
        assert!(feed.deliver(Err(SensorError::MissingSample)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_feed_after_unsubscribe_is_dropped() {
        let mut motion = ManualMotion::new();
        let feed = motion.feed();
        motion.subscribe(Duration::from_millis(16), Box::new(|_| panic!("must not run")));
        motion.unsubscribe();

        assert!(!motion.is_active());
        assert_eq!(motion.interval(), None);
        assert!(!feed.deliver(Ok(AttitudeSample::identity())));
    }

    #[test]
    fn simulated_motion_ticks_then_stops() {
        let mut motion = SimulatedMotion::new(30.0);
        let (tx, rx) = channel();
        motion.subscribe(
            Duration::from_millis(2),
            Box::new(move |event| {
                let _ = tx.send(event);
            }),
        );

        let first = rx.recv_timeout(Duration::from_secs(2)).expect("no tick delivered");
        assert!(first.is_ok());

        motion.unsubscribe();
        assert!(!motion.is_active());
        // The sender lived in the joined thread; the channel is now closed.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn simulated_attitude_is_unit_length() {
        let motion = SimulatedMotion::new(20.0);
        for t in [0.0, 0.5, 3.0, 47.25] {
            let a = motion.attitude_at(t);
            let len = (a.x * a.x + a.y * a.y + a.z * a.z + a.w * a.w).sqrt();
            assert!((len - 1.0).abs() < 1e-9);
        }
        assert_eq!(motion.attitude_at(0.0), AttitudeSample::identity());
    }
}
