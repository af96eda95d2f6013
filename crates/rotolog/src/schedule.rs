//! Periodic rotation triggers
//!
//! A [`Schedule`] spawns a background thread that invokes a callback at its
//! own cadence; the rotator arms one per instance and stops it on close or
//! reconfiguration. Ticks run concurrently with writers and are serialized
//! by the rotator's lock, never by the trigger itself.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use crossbeam_channel::{bounded, select, Sender};
use rotolog_core::{Error, Result};

/// Strategy deciding when periodic rotations fire.
pub trait Schedule: Send + Sync {
    /// Spawns the trigger. `tick` is invoked at every firing until the
    /// returned handle is stopped.
    fn start(&self, tick: Box<dyn Fn() + Send>) -> ScheduleHandle;
}

/// Stops a running trigger thread.
pub struct ScheduleHandle {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ScheduleHandle {
    fn spawn<F>(run: F) -> Self
    where
        F: FnOnce(crossbeam_channel::Receiver<()>) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let thread = thread::spawn(move || run(stop_rx));
        Self {
            stop_tx,
            thread: Some(thread),
        }
    }

    /// Signals the trigger thread and waits for it to exit. A tick already
    /// in flight runs to completion first.
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Fires at a fixed interval.
#[derive(Debug)]
pub struct Every {
    period: Duration,
}

impl Every {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("schedule period must be non-zero"));
        }
        Ok(Self { period })
    }
}

impl Schedule for Every {
    fn start(&self, tick: Box<dyn Fn() + Send>) -> ScheduleHandle {
        let period = self.period;
        ScheduleHandle::spawn(move |stop_rx| loop {
            select! {
                recv(stop_rx) -> _ => break,
                default(period) => tick(),
            }
        })
    }
}

/// Fires once per day at a fixed local wall-clock time.
///
/// The delay to the next firing is recomputed after every tick, so clock
/// adjustments shift at most one firing.
#[derive(Debug)]
pub struct DailyAt {
    at: NaiveTime,
}

impl DailyAt {
    /// Parses `HH:MM:SS` or `HH:MM` local time.
    pub fn new(at: &str) -> Result<Self> {
        let parsed = NaiveTime::parse_from_str(at, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M"))
            .map_err(|e| Error::config(format!("invalid schedule time '{}': {}", at, e)))?;
        Ok(Self { at: parsed })
    }

    /// Builds from hour, minute, and second components.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            Error::config(format!(
                "invalid schedule time {:02}:{:02}:{:02}",
                hour, minute, second
            ))
        })?;
        Ok(Self { at })
    }
}

impl Schedule for DailyAt {
    fn start(&self, tick: Box<dyn Fn() + Send>) -> ScheduleHandle {
        let at = self.at;
        ScheduleHandle::spawn(move |stop_rx| loop {
            let delay = delay_until(at, Local::now().naive_local());
            select! {
                recv(stop_rx) -> _ => break,
                default(delay) => tick(),
            }
        })
    }
}

/// Time from `now` to the next occurrence of `at`, today or tomorrow.
fn delay_until(at: NaiveTime, now: NaiveDateTime) -> Duration {
    let mut next = now.date().and_time(at);
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
