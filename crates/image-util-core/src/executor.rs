//! Process context, wall timers and the loop that drives them

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

type TimerCallback = Box<dyn FnMut() + Send>;

struct TimerState {
    period: Duration,
    next_due: Mutex<Instant>,
    callback: Mutex<TimerCallback>,
}

impl TimerState {
    fn next_due(&self) -> Instant {
        *self.next_due.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire if due at `now`. Missed periods are skipped rather than replayed.
    fn fire_if_due(&self, now: Instant) -> bool {
        {
            let mut next_due = self.next_due.lock().unwrap_or_else(PoisonError::into_inner);
            if *next_due > now {
                return false;
            }
            *next_due += self.period;
            if *next_due <= now {
                *next_due = now + self.period;
            }
        }

        let mut callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        (*callback)();
        true
    }
}

/// Periodic callback; stops firing once dropped
pub struct Timer {
    state: Arc<TimerState>,
}

impl Timer {
    pub fn period(&self) -> Duration {
        self.state.period
    }
}

#[derive(Default)]
struct ContextState {
    shutdown: AtomicBool,
    timers: Mutex<Vec<Weak<TimerState>>>,
}

/// State shared by every component hosted in one process
#[derive(Clone, Default)]
pub struct Context {
    state: Arc<ContextState>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// False once shutdown has been requested
    pub fn ok(&self) -> bool {
        !self.state.shutdown.load(Ordering::Acquire)
    }

    /// Ask the whole process to stop. Only the first request is logged.
    pub fn shutdown(&self, reason: &str) {
        if !self.state.shutdown.swap(true, Ordering::AcqRel) {
            tracing::info!(reason, "Shutdown requested");
        }
    }

    /// Run `callback` every `period`, starting one period from now
    pub fn create_wall_timer<F>(&self, period: Duration, callback: F) -> Timer
    where
        F: FnMut() + Send + 'static,
    {
        let state = Arc::new(TimerState {
            period,
            next_due: Mutex::new(Instant::now() + period),
            callback: Mutex::new(Box::new(callback)),
        });

        self.state
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&state));

        Timer { state }
    }

    fn live_timers(&self) -> Vec<Arc<TimerState>> {
        let mut timers = self.state.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.retain(|timer| timer.strong_count() > 0);
        timers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Drives the timers registered on a `Context`
pub struct Executor {
    context: Context,
    poll_interval: Duration,
}

impl Executor {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Longest single sleep, which bounds how late a shutdown is noticed
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Wait up to `timeout` for the next timer and fire every timer that is due.
    /// Returns the number of callbacks run.
    pub fn spin_once(&self, timeout: Duration) -> usize {
        let timers = self.context.live_timers();
        let now = Instant::now();

        let wait = timers
            .iter()
            .map(|timer| timer.next_due().saturating_duration_since(now))
            .min()
            .unwrap_or(timeout)
            .min(timeout)
            .min(self.poll_interval);

        if !wait.is_zero() {
            thread::sleep(wait);
        }

        if !self.context.ok() {
            return 0;
        }

        let now = Instant::now();
        timers.iter().filter(|timer| timer.fire_if_due(now)).count()
    }

    /// Spin until shutdown is requested or `duration` has elapsed
    pub fn spin_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut fired = 0;

        while self.context.ok() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            fired += self.spin_once(remaining);
        }

        fired
    }

    /// Spin until shutdown is requested
    pub fn spin(&self) {
        while self.context.ok() {
            self.spin_once(self.poll_interval);
        }
    }
}
