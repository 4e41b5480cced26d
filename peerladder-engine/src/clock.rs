//! Time source for `last_updated` stamps.
use std::cell::Cell;
use std::rc::Rc;

use crate::record::Timestamp;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock in Unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Rc<Cell<Timestamp>>,
}

impl FixedClock {
    #[must_use]
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.set(self.now.get().saturating_add(seconds));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}
