pub mod cycle;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cycle::{CycleDriver, CycleReport};

/// Label of one cycle, stamped on every persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CycleTag(u64);

impl CycleTag {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reading {}", self.0)
    }
}

/// Hands out strictly increasing tags starting at 1. Owned by the driver.
#[derive(Debug)]
pub struct CycleCounter {
    next: u64,
}

impl Default for CycleCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl CycleCounter {
    pub fn advance(&mut self) -> CycleTag {
        let tag = CycleTag(self.next);
        self.next += 1;
        tag
    }

    /// Number of tags issued so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}
