use log::{debug, trace};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_DURATION_SECS: u32 = 60;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Identifies one run of the countdown; ticks from older runs are ignored
pub type Generation = u64;

/// Handle to a repeating background tick task.
///
/// Dropping the handle cancels the task and joins its worker, so no tick is
/// produced after the drop returns.
#[derive(Debug)]
pub struct TickTask {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TickTask {
    /// A task with no worker; ticks are delivered by hand
    pub fn detached() -> Self {
        Self {
            stop_tx: None,
            worker: None,
        }
    }

    /// Call `on_tick` every `interval` until cancelled or until it returns false
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !on_tick() {
                        break;
                    }
                }
                // sender dropped or explicit stop
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }

    pub fn cancel(self) {
        drop(self)
    }
}

impl Drop for TickTask {
    fn drop(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Produces tick tasks for the clock
pub trait TickScheduler: Send {
    fn schedule(&self, generation: Generation, interval: Duration) -> TickTask;
}

/// Scheduler that never ticks on its own; callers invoke `Clock::tick` directly
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTicks;

impl TickScheduler for ManualTicks {
    fn schedule(&self, _generation: Generation, _interval: Duration) -> TickTask {
        TickTask::detached()
    }
}

/// What a tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// Clock not running or tick from a superseded run
    Ignored,
    Ticked { remaining: u32 },
    /// Remaining time hit zero; emitted once per run
    Expired,
}

/// Countdown of whole time units
pub struct Clock {
    duration: u32,
    remaining: u32,
    interval: Duration,
    generation: Generation,
    scheduler: Box<dyn TickScheduler>,
    task: Option<TickTask>,
}

impl Clock {
    pub fn new(duration: u32, interval: Duration, scheduler: Box<dyn TickScheduler>) -> Self {
        let duration = duration.max(1);
        Self {
            duration,
            remaining: duration,
            interval,
            generation: 0,
            scheduler,
            task: None,
        }
    }

    /// Clock with the default one-second tick that is driven by hand
    pub fn manual(duration: u32) -> Self {
        Self::new(duration, DEFAULT_TICK_INTERVAL, Box::new(ManualTicks))
    }

    /// Begin a fresh countdown, cancelling any run in progress
    pub fn start(&mut self) -> Generation {
        self.stop();
        self.generation += 1;
        self.remaining = self.duration;
        self.task = Some(self.scheduler.schedule(self.generation, self.interval));
        debug!(
            "clock started: {}s, generation {}",
            self.duration, self.generation
        );
        self.generation
    }

    pub fn tick(&mut self, generation: Generation) -> ClockSignal {
        if !self.is_running() || generation != self.generation {
            trace!(
                "ignoring tick for generation {} (current {}, running {})",
                generation,
                self.generation,
                self.is_running()
            );
            return ClockSignal::Ignored;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop();
            debug!("clock expired, generation {}", generation);
            ClockSignal::Expired
        } else {
            ClockSignal::Ticked {
                remaining: self.remaining,
            }
        }
    }

    /// Halt ticking; safe to call repeatedly
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
            debug!("clock stopped, generation {}", self.generation);
        }
    }

    /// Stop and rewind to the full duration
    pub fn rewind(&mut self) {
        self.stop();
        self.remaining = self.duration;
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_new_clock_is_stopped() {
        let clock = Clock::manual(60);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 60);
        assert_eq!(clock.elapsed(), 0);
    }

    #[test]
    fn test_zero_duration_is_clamped() {
        let clock = Clock::manual(0);
        assert_eq!(clock.duration(), 1);
    }

    #[test]
    fn test_tick_decrements_by_one() {
        let mut clock = Clock::manual(3);
        let gen = clock.start();

        assert_eq!(clock.tick(gen), ClockSignal::Ticked { remaining: 2 });
        assert_eq!(clock.tick(gen), ClockSignal::Ticked { remaining: 1 });
        assert_eq!(clock.elapsed(), 2);
    }

    #[test]
    fn test_expires_exactly_once() {
        let mut clock = Clock::manual(2);
        let gen = clock.start();

        clock.tick(gen);
        assert_eq!(clock.tick(gen), ClockSignal::Expired);
        assert!(!clock.is_running());
        assert_eq!(clock.tick(gen), ClockSignal::Ignored);
        assert_eq!(clock.remaining(), 0);
    }

    #[test]
    fn test_tick_when_stopped_is_ignored() {
        let mut clock = Clock::manual(10);
        assert_eq!(clock.tick(0), ClockSignal::Ignored);

        let gen = clock.start();
        clock.stop();
        clock.stop();
        assert_eq!(clock.tick(gen), ClockSignal::Ignored);
        assert_eq!(clock.remaining(), 10);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut clock = Clock::manual(10);
        let old = clock.start();
        let new = clock.start();

        assert_ne!(old, new);
        assert_eq!(clock.tick(old), ClockSignal::Ignored);
        assert_eq!(clock.tick(new), ClockSignal::Ticked { remaining: 9 });
    }

    #[test]
    fn test_rewind_restores_duration() {
        let mut clock = Clock::manual(5);
        let gen = clock.start();
        clock.tick(gen);
        clock.rewind();

        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 5);
    }

    #[test]
    fn test_tick_task_runs_until_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task = TickTask::spawn(Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        thread::sleep(Duration::from_millis(40));
        drop(task);
        let after_drop = count.load(Ordering::SeqCst);
        assert!(after_drop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_tick_task_stops_when_callback_declines() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task = TickTask::spawn(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        });

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        task.cancel();
    }
}
