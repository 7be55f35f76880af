//! Centralized default constants for the cutover system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// EXTRACTION
// =============================================================================

/// Maximum work item ids returned by the WIQL query step. Keeps the batch
/// detail call and the payload it produces bounded.
pub const WORK_ITEM_BATCH: usize = 200;

/// Maximum artifact records retained in a summary's preview list. The full
/// payload is never stored on the project record.
pub const PREVIEW_ITEMS: usize = 25;

/// Bound on recent commits and pull requests returned by on-demand
/// repository inspection.
pub const REPO_PREVIEW_ITEMS: usize = 25;

/// Hard deadline for a single artifact fetch. A fetch that exceeds this is
/// forced into the job's failed state instead of leaving the job in_progress
/// forever.
pub const FETCH_TIMEOUT_SECS: u64 = 120;

/// Progress reported as soon as a fetch begins.
pub const PROGRESS_STARTED: i32 = 10;

/// Progress reported once the work-items id query has resolved and the batch
/// expansion begins.
pub const PROGRESS_EXPANDING: i32 = 50;

// =============================================================================
// POLLING (consumer side)
// =============================================================================

/// Fixed tick interval for job status polling (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 3000;

/// Absolute ceiling on a polling session (seconds). Past this the poller
/// gives up and reports the job as still unknown, never as failed.
pub const POLL_CEILING_SECS: u64 = 600;

// =============================================================================
// ARTIFACT SOURCE
// =============================================================================

/// Azure DevOps REST api-version pinned for every call.
pub const SOURCE_API_VERSION: &str = "7.0";

/// Per-request timeout against the artifact source (seconds).
pub const SOURCE_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EVENTS
// =============================================================================

/// Capacity of the extraction event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_is_three_seconds() {
        assert_eq!(POLL_INTERVAL_MS, 3000);
    }

    #[test]
    fn test_poll_ceiling_is_ten_minutes() {
        assert_eq!(POLL_CEILING_SECS, 600);
    }

    #[test]
    fn test_fetch_timeout_below_poll_ceiling() {
        // A hung fetch must fail the job before pollers give up on it.
        assert!(FETCH_TIMEOUT_SECS < POLL_CEILING_SECS);
    }

    #[test]
    fn test_preview_bounds_positive() {
        assert!(PREVIEW_ITEMS > 0);
        assert!(REPO_PREVIEW_ITEMS > 0);
        assert!(WORK_ITEM_BATCH > 0);
    }
}
