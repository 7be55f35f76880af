//! Structured logging schema and field name constants for cutover.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "store", "ado", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "manager", "aggregator", "poller", "ado_client"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "start", "fetch", "reconcile", "sync"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Project UUID being operated on.
pub const PROJECT_ID: &str = "project_id";

/// Extraction job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Artifact kind wire tag.
pub const ARTIFACT_KIND: &str = "artifact_kind";

/// Repository identifier on the source instance.
pub const REPO_ID: &str = "repo_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records returned by a source call or held in a summary.
pub const RESULT_COUNT: &str = "result_count";

/// Best-effort progress percentage.
pub const PROGRESS: &str = "progress";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
