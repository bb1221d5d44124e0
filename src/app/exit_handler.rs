//! Exit code logic for the organizer process.
//!
//! Single responsibility: map batch results to the process exit outcome.

use m3u_organizer_core::BatchSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished batch.
///
/// A batch stopped by Ctrl-C without failures still counts as a success; the
/// files it left behind resume on the next run.
pub(crate) fn determine_exit_outcome(summary: &BatchSummary) -> ProcessExit {
    if summary.failed == 0 {
        ProcessExit::Success
    } else if summary.completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
