//! Per-cycle counters.

use std::fmt;

/// Summary of one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The listing call failed and mail authorization was re-run.
    pub listing_failed: bool,
    pub examined: usize,
    /// Backlog, already seen, or without parts.
    pub skipped: usize,
    /// Messages whose attachments were all handled and that are now seen.
    pub processed: usize,
    /// Messages abandoned on an error; they are retried next cycle.
    pub failed: usize,
    pub uploads: usize,
    pub conversion_failures: usize,
    pub upload_failures: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.processed == 0 && self.failed == 0 && !self.listing_failed
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.listing_failed {
            return write!(f, "listing failed");
        }
        write!(
            f,
            "{} examined, {} skipped, {} processed, {} failed; {} uploaded, {} conversion failures, {} upload failures",
            self.examined,
            self.skipped,
            self.processed,
            self.failed,
            self.uploads,
            self.conversion_failures,
            self.upload_failures
        )
    }
}
