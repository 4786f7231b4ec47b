//! Tool-call budget for one worker run.
//!
//! Only investigative calls count. The terminal submission never does.

use crate::oracle::prompts::{budget_status, BudgetZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolBudget {
    used: u32,
    limit: u32,
}

impl ToolBudget {
    pub fn new(limit: u32) -> Self {
        Self { used: 0, limit }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn zone(&self) -> BudgetZone {
        BudgetZone::classify(self.used, self.limit)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Record one investigative call. Returns false, without recording,
    /// once the limit is reached.
    pub fn try_consume(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn status_text(&self) -> String {
        budget_status(self.zone(), self.used, self.limit)
    }
}
