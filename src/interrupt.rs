use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Cooperative cancellation, polled once per iteration.
pub trait Interrupt {
    /// Return true to stop the fit before the next step.
    fn is_interrupted(&mut self) -> bool;
}

/// Never interrupts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn is_interrupted(&mut self) -> bool {
        false
    }
}

impl<F: FnMut() -> bool> Interrupt for F {
    fn is_interrupted(&mut self) -> bool {
        self()
    }
}

/// A flag that can be set from another thread to cancel a running fit.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Interrupt for CancelFlag {
    fn is_interrupted(&mut self) -> bool {
        self.is_cancelled()
    }
}

/// Interrupts once a wall clock deadline has passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// `None` if the deadline lies beyond what `Instant` can represent.
    end: Option<Instant>,
}

impl Deadline {
    pub fn at(end: Instant) -> Self {
        Self { end: Some(end) }
    }

    /// A deadline `timeout` from now. Timeouts too large for the clock never fire.
    pub fn after(timeout: Duration) -> Self {
        Self {
            end: Instant::now().checked_add(timeout),
        }
    }
}

impl Interrupt for Deadline {
    fn is_interrupted(&mut self) -> bool {
        self.end.is_some_and(|end| Instant::now() >= end)
    }
}
