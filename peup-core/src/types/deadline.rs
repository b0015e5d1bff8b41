//! Explicit deadlines for collaborator calls.

use std::time::{Duration, Instant};

/// Absolute point in time by which a collaborator call must finish.
///
/// Deadlines are created once by the caller and forwarded unchanged through
/// every layer, so nested calls share one time budget instead of stacking
/// their own timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Creates a deadline at the given instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Creates a deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self::at(Instant::now() + budget)
    }

    /// Creates a deadline `millis` milliseconds from now.
    pub fn after_millis(millis: u64) -> Self {
        Self::after(Duration::from_millis(millis))
    }

    /// Returns the instant of the deadline.
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Returns the time left, zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Returns true once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}
