use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Identifies one trigger. Only the most recent pending ticket can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Trailing-edge debounce. Each trigger pushes the deadline out by the full
/// delay and supersedes the previous [`Ticket`].
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            generation: 0,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn trigger(&mut self, now: Duration) -> Ticket {
        self.generation += 1;
        self.deadline = Some(now + self.delay);
        Ticket(self.generation)
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.deadline.map(|_| Ticket(self.generation))
    }

    /// Time left until the pending trigger is due, `None` if nothing is pending.
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_sub(now))
    }

    /// Fires at most once per quiet period.
    pub fn poll(&mut self, now: Duration) -> Option<Ticket> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(Ticket(self.generation))
            }
            _ => None,
        }
    }

    /// Fires if `ticket` is the latest pending one. Stale tickets are ignored.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        if self.deadline.is_some() && ticket.0 == self.generation {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Debouncer::new(DEBOUNCE_DELAY)
    }
}
