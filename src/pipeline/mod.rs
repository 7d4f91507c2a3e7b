//! Per-stage enrichers that advance papers along the status ladder.
//!
//! Each stage pulls its candidates from the store's processing query (every
//! status preceding the stage's target, plus `ERROR`, below the retry bound)
//! and then dispatches on the paper's fields: work already done is skipped,
//! missing prerequisites are skipped without touching the retry budget, and
//! a failed attempt records `ERROR` with the message and a retry increment
//! before moving on to the next paper.

pub mod notes;
pub mod pdf;
pub mod videos;

/// Outcome counts for one stage run over one week.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    /// Papers advanced to the stage's target status.
    pub advanced: usize,
    /// Papers that failed and were marked `ERROR`.
    pub failed: usize,
    /// Papers skipped: work already done or prerequisites missing.
    pub skipped: usize,
}
